use async_trait::async_trait;
use awc::{http::StatusCode, Client};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use crate::core::settings::Settings;

/// Largest response body accepted from the backend.
const BODY_LIMIT: usize = 8 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum BackendError {
    /// The request never produced a response.
    #[error("Failed to reach backend for \"{collection}\": {reason}")]
    Transport { collection: String, reason: String },

    /// The backend answered with a non-success status.
    #[error("Backend returned {status} for \"{collection}\"{}", message_suffix(.message))]
    Status {
        collection: String,
        status: u16,
        message: Option<String>,
    },

    /// The response body could not be read or parsed.
    #[error("Backend response for \"{collection}\" is malformed: {reason}")]
    Body { collection: String, reason: String },
}

fn message_suffix(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default()
}

impl BackendError {
    /// Message suitable for showing to the user, when the backend gave one.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            BackendError::Status { message, .. } => message.as_deref(),
            BackendError::Transport { reason, .. } => Some(reason.as_str()),
            BackendError::Body { .. } => None,
        }
    }
}

/// Per-collection access to the hosted data service.
///
/// Rows cross this boundary as JSON; callers decode them into entities.
#[async_trait(?Send)]
pub trait Backend {
    /// All rows of `collection`, newest `created_at` first.
    async fn select_newest_first(&self, collection: &str) -> Result<Vec<Value>, BackendError>;

    /// Inserts one row and returns the inserted representation.
    async fn insert(&self, collection: &str, row: Value) -> Result<Vec<Value>, BackendError>;
}

/// Error body returned by PostgREST.
#[derive(Deserialize, Debug)]
struct PostgrestError {
    message: Option<String>,
}

/// Backend speaking the PostgREST dialect exposed by Supabase.
pub struct PostgrestBackend {
    client: Client,
    rest_url: String,
}

impl PostgrestBackend {
    pub fn new(settings: &Settings) -> Self {
        install_crypto_provider();
        let key = &settings.supabase_anon_key.value;
        let client = Client::builder()
            .add_default_header(("apikey", key.as_str()))
            .add_default_header(("Authorization", format!("Bearer {}", key)))
            .finish();
        PostgrestBackend {
            client,
            rest_url: format!(
                "{}/rest/v1",
                settings.supabase_url.value.trim_end_matches('/')
            ),
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.rest_url, collection)
    }
}

#[async_trait(?Send)]
impl Backend for PostgrestBackend {
    async fn select_newest_first(&self, collection: &str) -> Result<Vec<Value>, BackendError> {
        let url = format!(
            "{}?select=*&order=created_at.desc",
            self.collection_url(collection)
        );
        match self.client.get(&url).send().await {
            Ok(mut response) => {
                let status = response.status();
                match response.body().limit(BODY_LIMIT).await {
                    Ok(body) => {
                        debug!(collection, size = body.len(), "Read collection");
                        decode_rows(collection, status, &body)
                    }
                    Err(reason) => Err(body_error(collection, reason)),
                }
            }
            Err(reason) => Err(transport_error(collection, reason)),
        }
    }

    async fn insert(&self, collection: &str, row: Value) -> Result<Vec<Value>, BackendError> {
        let url = format!("{}?select=*", self.collection_url(collection));
        match self
            .client
            .post(&url)
            .insert_header(("Prefer", "return=representation"))
            .send_json(&row)
            .await
        {
            Ok(mut response) => {
                let status = response.status();
                match response.body().limit(BODY_LIMIT).await {
                    Ok(body) => {
                        debug!(collection, size = body.len(), "Inserted row");
                        decode_rows(collection, status, &body)
                    }
                    Err(reason) => Err(body_error(collection, reason)),
                }
            }
            Err(reason) => Err(transport_error(collection, reason)),
        }
    }
}

/// Installs ring as the process-wide rustls provider used by awc.
fn install_crypto_provider() {
    // Err only means a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();
}

fn decode_rows(
    collection: &str,
    status: StatusCode,
    body: &[u8],
) -> Result<Vec<Value>, BackendError> {
    if !status.is_success() {
        let message = serde_json::from_slice::<PostgrestError>(body)
            .ok()
            .and_then(|error| error.message);
        let error = BackendError::Status {
            collection: collection.to_string(),
            status: status.as_u16(),
            message,
        };
        error!("{}", error);
        return Err(error);
    }
    match serde_json::from_slice::<Vec<Value>>(body) {
        Ok(rows) => Ok(rows),
        Err(reason) => Err(body_error(collection, reason)),
    }
}

fn body_error(collection: &str, reason: impl std::fmt::Display) -> BackendError {
    let error = BackendError::Body {
        collection: collection.to_string(),
        reason: reason.to_string(),
    };
    error!("{}", error);
    error
}

fn transport_error(collection: &str, reason: impl std::fmt::Display) -> BackendError {
    let error = BackendError::Transport {
        collection: collection.to_string(),
        reason: reason.to_string(),
    };
    error!("{}", error);
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{dev::ServerHandle, web, App, HttpRequest, HttpResponse, HttpServer};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// One request as seen by the stand-in PostgREST server.
    #[derive(Clone, Debug)]
    struct Seen {
        method: String,
        path: String,
        query: String,
        apikey: Option<String>,
        authorization: Option<String>,
        prefer: Option<String>,
        content_type: Option<String>,
        body: Vec<u8>,
    }

    fn header(req: &HttpRequest, name: &str) -> Option<String> {
        req.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    /// Starts a local server answering every request with `status` and
    /// `reply`, and returns its base URL.
    fn postgrest_stub(
        status: StatusCode,
        reply: &'static str,
    ) -> (String, Arc<Mutex<Vec<Seen>>>, ServerHandle) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let server = HttpServer::new(move || {
            let recorder = Arc::clone(&recorder);
            App::new().default_service(web::to(move |req: HttpRequest, body: web::Bytes| {
                let recorder = Arc::clone(&recorder);
                async move {
                    recorder.lock().unwrap().push(Seen {
                        method: req.method().to_string(),
                        path: req.path().to_string(),
                        query: req.query_string().to_string(),
                        apikey: header(&req, "apikey"),
                        authorization: header(&req, "authorization"),
                        prefer: header(&req, "prefer"),
                        content_type: header(&req, "content-type"),
                        body: body.to_vec(),
                    });
                    HttpResponse::build(status)
                        .content_type("application/json")
                        .body(reply)
                }
            }))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);
        (format!("http://{}", addr), seen, handle)
    }

    fn backend_for(url: &str) -> PostgrestBackend {
        let mut settings = Settings::new();
        settings.supabase_url.value = url.to_string();
        settings.supabase_anon_key.value = "anon-key".to_string();
        PostgrestBackend::new(&settings)
    }

    #[test]
    fn error_status_keeps_postgrest_message() {
        let body = concat!(
            r#"{"code":"23502","#,
            r#""message":"null value in column \"email\"","details":null}"#
        );
        let error = decode_rows("quotes", StatusCode::BAD_REQUEST, body.as_bytes()).unwrap_err();
        assert_eq!(error.user_message(), Some("null value in column \"email\""));
        assert!(error.to_string().contains("400"));
    }

    #[test]
    fn error_status_without_message() {
        let error = decode_rows("reviews", StatusCode::BAD_GATEWAY, b"<html>").unwrap_err();
        assert!(matches!(
            error,
            BackendError::Status {
                status: 502,
                message: None,
                ..
            }
        ));
        assert_eq!(error.user_message(), None);
    }

    #[test]
    fn success_requires_array_body() {
        let rows = decode_rows("reviews", StatusCode::OK, br#"[{"a":1},{"a":2}]"#).unwrap();
        assert_eq!(rows.len(), 2);

        let error = decode_rows("reviews", StatusCode::OK, br#"{"a":1}"#).unwrap_err();
        assert!(matches!(error, BackendError::Body { .. }));
    }

    #[actix_web::test]
    async fn backend_urls_are_built_from_settings() {
        let mut settings = Settings::new();
        settings.supabase_url.value = "https://abc.supabase.co/".to_string();
        settings.supabase_anon_key.value = "anon".to_string();
        let backend = PostgrestBackend::new(&settings);
        assert_eq!(
            backend.collection_url("quotes"),
            "https://abc.supabase.co/rest/v1/quotes"
        );
    }

    #[actix_web::test]
    async fn select_asks_for_all_rows_newest_first() {
        let (url, seen, handle) = postgrest_stub(StatusCode::OK, r#"[{"id":1},{"id":2}]"#);
        let backend = backend_for(&url);

        let rows = backend.select_newest_first("reviews").await.unwrap();

        assert_eq!(rows, vec![json!({"id": 1}), json!({"id": 2})]);
        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, "GET");
        assert_eq!(seen[0].path, "/rest/v1/reviews");
        assert_eq!(seen[0].query, "select=*&order=created_at.desc");
        assert_eq!(seen[0].apikey.as_deref(), Some("anon-key"));
        assert_eq!(seen[0].authorization.as_deref(), Some("Bearer anon-key"));
        handle.stop(false).await;
    }

    #[actix_web::test]
    async fn insert_posts_json_and_asks_for_representation() {
        let (url, seen, handle) =
            postgrest_stub(StatusCode::CREATED, r#"[{"name":"Acme","id":"x"}]"#);
        let backend = backend_for(&url);
        let row = json!({"name": "Acme", "email": "a@acme.com"});

        let rows = backend.insert("quotes", row.clone()).await.unwrap();

        assert_eq!(rows, vec![json!({"name": "Acme", "id": "x"})]);
        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, "POST");
        assert_eq!(seen[0].path, "/rest/v1/quotes");
        assert_eq!(seen[0].query, "select=*");
        assert_eq!(seen[0].prefer.as_deref(), Some("return=representation"));
        assert_eq!(seen[0].content_type.as_deref(), Some("application/json"));
        assert_eq!(seen[0].apikey.as_deref(), Some("anon-key"));
        assert_eq!(seen[0].authorization.as_deref(), Some("Bearer anon-key"));
        assert_eq!(serde_json::from_slice::<Value>(&seen[0].body).unwrap(), row);
        handle.stop(false).await;
    }

    #[actix_web::test]
    async fn rejected_insert_carries_postgrest_message() {
        let (url, _seen, handle) = postgrest_stub(
            StatusCode::UNAUTHORIZED,
            r#"{"code":"42501","message":"new row violates row-level security policy"}"#,
        );
        let backend = backend_for(&url);

        let error = backend.insert("quotes", json!({"name": "Acme"})).await.unwrap_err();

        assert!(matches!(error, BackendError::Status { status: 401, .. }));
        assert_eq!(
            error.user_message(),
            Some("new row violates row-level security policy")
        );
        handle.stop(false).await;
    }

    #[actix_web::test]
    async fn unreachable_backend_is_a_transport_error() {
        let (url, _seen, handle) = postgrest_stub(StatusCode::OK, "[]");
        handle.stop(false).await;
        let backend = backend_for(&url);

        let error = backend.select_newest_first("reviews").await.unwrap_err();

        assert!(matches!(error, BackendError::Transport { .. }));
        assert!(error.user_message().is_some());
    }
}
