//! Page-lifecycle view of the site content and the quote form.
//!
//! A [`ContentSyncClient`] is created per page load. It reads the three
//! portfolio collections once, all or nothing, and submits the quote form.

use std::rc::Rc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    core::data::{Backend, BackendError},
    i18n::{Lang, Translations},
    types::{
        InternalProject, Quote, QuoteForm, Review, SuccessStory, INTERNAL_PROJECTS, QUOTES,
        REVIEWS, SUCCESS_STORIES,
    },
};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Row in \"{collection}\" does not match its schema: {source}")]
    Decode {
        collection: &'static str,
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("Quote form field \"{field}\" is empty")]
    Incomplete { field: &'static str },

    #[error("Error submitting quote: {0}")]
    Backend(#[from] BackendError),
}

/// Content shown on the page.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ViewState {
    pub success_stories: Vec<SuccessStory>,
    pub reviews: Vec<Review>,
    pub internal_projects: Vec<InternalProject>,
    pub loading: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            success_stories: Vec::new(),
            reviews: Vec::new(),
            internal_projects: Vec::new(),
            loading: true,
        }
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum NotificationBody {
    /// Translation key.
    Key(&'static str),
    /// Text shown as is.
    Text(String),
}

impl NotificationBody {
    pub fn text<'a>(&'a self, translations: &'a Translations, lang: Lang) -> &'a str {
        match self {
            NotificationBody::Key(key) => translations.t(lang, key),
            NotificationBody::Text(text) => text,
        }
    }
}

/// Transient toast shown after a submission.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: &'static str,
    pub body: NotificationBody,
}

impl Notification {
    pub fn for_submission<T>(result: &Result<T, SubmissionError>) -> Self {
        match result {
            Ok(_) => Notification {
                kind: NotificationKind::Success,
                title: "toast.success.title",
                body: NotificationBody::Key("toast.success.body"),
            },
            Err(SubmissionError::Incomplete { field }) => Notification {
                kind: NotificationKind::Error,
                title: "toast.invalid.title",
                body: NotificationBody::Key(match *field {
                    "name" => "toast.invalid.name",
                    "email" => "toast.invalid.email",
                    "category" => "toast.invalid.category",
                    "budget" => "toast.invalid.budget",
                    _ => "toast.invalid.message",
                }),
            },
            Err(SubmissionError::Backend(error)) => Notification {
                kind: NotificationKind::Error,
                title: "toast.error.title",
                body: match error.user_message() {
                    Some(message) => NotificationBody::Text(message.to_string()),
                    None => NotificationBody::Key("toast.error.unknown"),
                },
            },
        }
    }
}

pub struct ContentSyncClient {
    backend: Rc<dyn Backend>,
    view: ViewState,
    form: QuoteForm,
}

impl ContentSyncClient {
    pub fn new(backend: Rc<dyn Backend>) -> Self {
        ContentSyncClient::with_form(backend, QuoteForm::default())
    }

    /// Client whose form already holds what the user typed.
    pub fn with_form(backend: Rc<dyn Backend>, form: QuoteForm) -> Self {
        ContentSyncClient {
            backend,
            view: ViewState::default(),
            form,
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn form(&self) -> &QuoteForm {
        &self.form
    }

    /// Loads the three collections. Runs at most once per client; on any
    /// failure every list stays empty. `loading` is false afterwards.
    pub async fn fetch(&mut self) {
        if !self.view.loading {
            debug!("Content already fetched for this page");
            return;
        }
        match self.fetch_all().await {
            Ok((success_stories, reviews, internal_projects)) => {
                info!(
                    success_stories = success_stories.len(),
                    reviews = reviews.len(),
                    internal_projects = internal_projects.len(),
                    "Fetched site content"
                );
                self.view.success_stories = success_stories;
                self.view.reviews = reviews;
                self.view.internal_projects = internal_projects;
            }
            Err(error) => error!(%error, "Error fetching data"),
        }
        self.view.loading = false;
    }

    async fn fetch_all(
        &self,
    ) -> Result<(Vec<SuccessStory>, Vec<Review>, Vec<InternalProject>), SyncError> {
        futures::try_join!(
            self.read::<SuccessStory>(SUCCESS_STORIES),
            self.read::<Review>(REVIEWS),
            self.read::<InternalProject>(INTERNAL_PROJECTS)
        )
    }

    async fn read<T: DeserializeOwned>(
        &self,
        collection: &'static str,
    ) -> Result<Vec<T>, SyncError> {
        let rows = self.backend.select_newest_first(collection).await?;
        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|source| SyncError::Decode { collection, source })
            })
            .collect()
    }

    /// Inserts the form as a new quote. The form is reset only when the
    /// insert succeeds.
    pub async fn submit(&mut self) -> Result<Vec<Quote>, SubmissionError> {
        if let Some(field) = self.form.missing_field() {
            warn!(field, "Quote form is incomplete");
            return Err(SubmissionError::Incomplete { field });
        }
        let row = json!({
            "name": self.form.name,
            "email": self.form.email,
            "category": self.form.category,
            "budget": self.form.budget,
            "message": self.form.message,
        });
        match self.backend.insert(QUOTES, row).await {
            Ok(rows) => {
                // Stored already; reset no matter how the echo decodes.
                let quotes: Vec<Quote> = rows
                    .into_iter()
                    .filter_map(|row| match serde_json::from_value(row) {
                        Ok(quote) => Some(quote),
                        Err(error) => {
                            warn!(%error, "Inserted quote has an unexpected shape");
                            None
                        }
                    })
                    .collect();
                let ids: Vec<_> = quotes.iter().map(|quote| quote.id).collect();
                info!(?ids, "Quote submitted successfully");
                self.form.reset();
                Ok(quotes)
            }
            Err(error) => {
                error!(%error, "Error submitting quote");
                Err(SubmissionError::Backend(error))
            }
        }
    }
}
