use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SUCCESS_STORIES: &str = "success_stories";
pub const REVIEWS: &str = "reviews";
pub const INTERNAL_PROJECTS: &str = "internal_projects";
pub const QUOTES: &str = "quotes";

pub const DEFAULT_CATEGORY: &str = "website";

/// Quote categories offered by the form, as `(value, translation key)`.
pub const CATEGORIES: [(&str, &str); 5] = [
    ("website", "quote.category.website"),
    ("ecommerce", "quote.category.ecommerce"),
    ("automation", "quote.category.automation"),
    ("custom", "quote.category.custom"),
    ("other", "quote.category.other"),
];

/// Monthly budget buckets offered by the form, as `(value, translation key)`.
pub const BUDGETS: [(&str, &str); 4] = [
    ("500-1k", "quote.budget.500_1k"),
    ("1k-2k", "quote.budget.1k_2k"),
    ("2k-5k", "quote.budget.2k_5k"),
    ("5k+", "quote.budget.5k_plus"),
];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SuccessStory {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub tags: Vec<String>,
    pub client_name: String,
    pub industry: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Review {
    pub id: Uuid,
    pub author: String,
    pub company: String,
    pub content: String,
    pub rating: i32,
    pub image_url: String,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct InternalProject {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image_url: String,
    #[serde(default)]
    pub project_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    pub tags: Vec<String>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored quote request. `id` and `created_at` come from the backend.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Quote {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub category: String,
    pub budget: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// The five user-entered fields of the quote form.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct QuoteForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub budget: String,
    #[serde(default)]
    pub message: String,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl Default for QuoteForm {
    fn default() -> Self {
        QuoteForm {
            name: String::new(),
            email: String::new(),
            category: default_category(),
            budget: String::new(),
            message: String::new(),
        }
    }
}

impl QuoteForm {
    /// Name of the first field that is empty or only whitespace.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("email", &self.email),
            ("category", &self.category),
            ("budget", &self.budget),
            ("message", &self.message),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }

    pub fn reset(&mut self) {
        *self = QuoteForm::default();
    }
}
