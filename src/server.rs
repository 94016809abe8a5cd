use std::{io::Result, net::SocketAddr, rc::Rc, sync::Arc};

use actix_cors::Cors;
use actix_web::{
    cookie::Cookie,
    http::{header, StatusCode},
    web::{self, resource, scope, Data, Form, Json},
    App, HttpRequest, HttpResponse, HttpServer,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    core::{
        data::{Backend, PostgrestBackend},
        settings::Settings,
        sync::{ContentSyncClient, Notification, NotificationKind, SubmissionError},
    },
    i18n::{Lang, Translations, LANG_COOKIE},
    render::Page,
    types::{Quote, QuoteForm},
};

/// Per-worker state shared by the handlers.
pub struct AppState {
    pub backend: Rc<dyn Backend>,
    pub translations: Arc<Translations>,
    pub fallback_lang: Lang,
    pub analytics_id: Option<String>,
}

#[derive(Deserialize)]
struct LangQuery {
    lng: Option<String>,
}

#[derive(Serialize)]
struct SubmissionReply<'a> {
    kind: NotificationKind,
    title: &'a str,
    message: &'a str,
    quotes: Vec<Quote>,
}

pub async fn start_server(settings: Settings, translations: Translations) -> Result<()> {
    let addr: SocketAddr = settings.addr();
    let translations = Arc::new(translations);
    let server = HttpServer::new(move || {
        let state = AppState {
            backend: Rc::new(PostgrestBackend::new(&settings)),
            translations: Arc::clone(&translations),
            fallback_lang: settings.fallback_lang(),
            analytics_id: settings.analytics_id().map(str::to_string),
        };
        App::new()
            .app_data(Data::new(state))
            .configure(routes)
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_header()
                    .allow_any_method(),
            )
    })
    .bind(addr)?;
    info!(%addr, "Server started");
    server.run().await
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        resource("/")
            .route(web::get().to(page_handler))
            .route(web::post().to(quote_form_handler)),
    )
    .service(
        scope("/v1")
            .service(resource("/content").route(web::get().to(content_handler)))
            .service(resource("/quotes").route(web::post().to(quote_handler)))
            .service(resource("/status").route(web::get().to(status_handler))),
    );
}

fn request_lang(req: &HttpRequest, state: &AppState) -> Lang {
    let query = web::Query::<LangQuery>::from_query(req.query_string()).ok();
    let cookie = req.cookie(LANG_COOKIE);
    let accept_language = req
        .headers()
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok());
    Lang::detect(
        query.as_ref().and_then(|query| query.lng.as_deref()),
        cookie.as_ref().map(|cookie| cookie.value()),
        accept_language,
        state.fallback_lang,
    )
}

fn render_page(
    state: &AppState,
    lang: Lang,
    client: &ContentSyncClient,
    notification: Option<&Notification>,
) -> HttpResponse {
    let html = Page {
        translations: &state.translations,
        lang,
        view: client.view(),
        form: client.form(),
        notification,
        analytics_id: state.analytics_id.as_deref(),
    }
    .render();
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .cookie(Cookie::build(LANG_COOKIE, lang.code()).path("/").finish())
        .body(html)
}

async fn page_handler(req: HttpRequest, state: Data<AppState>) -> HttpResponse {
    let lang = request_lang(&req, &state);
    let mut client = ContentSyncClient::new(Rc::clone(&state.backend));
    client.fetch().await;
    render_page(&state, lang, &client, None)
}

async fn quote_form_handler(
    req: HttpRequest,
    state: Data<AppState>,
    form: Form<QuoteForm>,
) -> HttpResponse {
    let lang = request_lang(&req, &state);
    let mut client = ContentSyncClient::with_form(Rc::clone(&state.backend), form.into_inner());
    let notification = Notification::for_submission(&client.submit().await);
    client.fetch().await;
    render_page(&state, lang, &client, Some(&notification))
}

async fn content_handler(state: Data<AppState>) -> HttpResponse {
    let mut client = ContentSyncClient::new(Rc::clone(&state.backend));
    client.fetch().await;
    HttpResponse::Ok().json(client.view())
}

async fn quote_handler(
    req: HttpRequest,
    state: Data<AppState>,
    form: Json<QuoteForm>,
) -> HttpResponse {
    let lang = request_lang(&req, &state);
    let mut client = ContentSyncClient::with_form(Rc::clone(&state.backend), form.into_inner());
    let result = client.submit().await;
    let notification = Notification::for_submission(&result);
    let status = match &result {
        Ok(_) => StatusCode::CREATED,
        Err(SubmissionError::Incomplete { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
        Err(SubmissionError::Backend(_)) => StatusCode::BAD_GATEWAY,
    };
    HttpResponse::build(status).json(SubmissionReply {
        kind: notification.kind,
        title: state.translations.t(lang, notification.title),
        message: notification.body.text(&state.translations, lang),
        quotes: result.unwrap_or_default(),
    })
}

async fn status_handler() -> HttpResponse {
    HttpResponse::Ok().body("nomadicode is running")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fake::{project, review, story, FakeBackend};
    use crate::types::{INTERNAL_PROJECTS, QUOTES, REVIEWS, SUCCESS_STORIES};
    use actix_web::test;
    use serde_json::{json, Value};

    fn populated() -> FakeBackend {
        FakeBackend::new()
            .with_rows(
                SUCCESS_STORIES,
                vec![
                    story("bakery", "2024-05-02T00:00:00Z"),
                    story("garage", "2024-05-01T00:00:00Z"),
                ],
            )
            .with_rows(REVIEWS, vec![review("Ana", 3, "2024-04-01T00:00:00Z")])
            .with_rows(
                INTERNAL_PROJECTS,
                vec![project(
                    "tide",
                    None,
                    Some("https://github.com/n/tide"),
                    "2024-03-01T00:00:00Z",
                )],
            )
    }

    fn state(backend: Rc<FakeBackend>) -> Data<AppState> {
        Data::new(AppState {
            backend,
            translations: Arc::new(Translations::load().unwrap()),
            fallback_lang: Lang::En,
            analytics_id: None,
        })
    }

    macro_rules! app {
        ($backend:expr) => {
            test::init_service(App::new().app_data(state($backend)).configure(routes)).await
        };
    }

    async fn body_text(resp: actix_web::dev::ServiceResponse) -> String {
        String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
    }

    fn acme() -> Value {
        json!({
            "name": "Acme",
            "email": "a@acme.com",
            "category": "ecommerce",
            "budget": "1k-2k",
            "message": "Need a store",
        })
    }

    #[actix_web::test]
    async fn page_lists_content_newest_first() {
        let app = app!(Rc::new(populated()));
        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let html = body_text(resp).await;
        let bakery = html.find("bakery description").unwrap();
        let garage = html.find("garage description").unwrap();
        assert!(bakery < garage);
        assert!(html.contains("github.com/n/tide"));
        assert_eq!(html.matches("class=\"star\"").count(), 3);
        assert!(!html.contains("Loading..."));
    }

    #[actix_web::test]
    async fn failed_fetch_renders_empty_sections() {
        let app = app!(Rc::new(populated().failing(REVIEWS)));
        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let html = body_text(resp).await;
        assert!(!html.contains("bakery description"));
        assert!(!html.contains("Loading..."));
    }

    #[actix_web::test]
    async fn language_follows_query_then_cookie() {
        let app = app!(Rc::new(populated()));

        let req = test::TestRequest::get().uri("/?lng=es").to_request();
        let resp = test::call_service(&app, req).await;
        let cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("i18next=es"));
        assert!(body_text(resp).await.contains("Casos de éxito"));

        let req = test::TestRequest::get()
            .uri("/")
            .cookie(Cookie::new(LANG_COOKIE, "es"))
            .insert_header((header::ACCEPT_LANGUAGE, "en"))
            .to_request();
        let html = body_text(test::call_service(&app, req).await).await;
        assert!(html.contains("<html lang=\"es\">"));
    }

    #[actix_web::test]
    async fn posted_quote_resets_form_and_shows_success() {
        let backend = Rc::new(populated());
        let app = app!(backend.clone());
        let req = test::TestRequest::post().uri("/").set_form(acme()).to_request();
        let html = body_text(test::call_service(&app, req).await).await;

        assert!(html.contains("toast-success"));
        assert!(html.contains("Quote submitted successfully!"));
        assert!(html.contains("name=\"name\" value=\"\""));
        assert!(html.contains("<option value=\"website\" selected>"));
        assert!(html.contains("bakery description"));

        let inserts = backend.inserts.borrow();
        assert_eq!(inserts.len(), 1);
        assert_eq!(inserts[0], (QUOTES.to_string(), acme()));
    }

    #[actix_web::test]
    async fn posted_incomplete_quote_keeps_input() {
        let backend = Rc::new(populated());
        let app = app!(backend.clone());
        let form = json!({
            "name": "",
            "email": "x@y.com",
            "category": "website",
            "budget": "500-1k",
            "message": "hi",
        });
        let req = test::TestRequest::post().uri("/").set_form(form).to_request();
        let html = body_text(test::call_service(&app, req).await).await;

        assert!(html.contains("toast-error"));
        assert!(html.contains("Business name is required."));
        assert!(html.contains("value=\"x@y.com\""));
        assert!(html.contains("<option value=\"500-1k\" selected>"));
        assert!(backend.inserts.borrow().is_empty());
    }

    #[actix_web::test]
    async fn json_quote_statuses() {
        let backend = Rc::new(FakeBackend::new());
        let app = app!(backend.clone());

        let req = test::TestRequest::post().uri("/v1/quotes").set_json(acme()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let reply: Value = test::read_body_json(resp).await;
        assert_eq!(reply["kind"], "success");
        assert_eq!(reply["quotes"][0]["email"], "a@acme.com");

        let mut incomplete = acme();
        incomplete["message"] = json!("");
        let req = test::TestRequest::post().uri("/v1/quotes").set_json(incomplete).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(backend.inserts.borrow().len(), 1);
    }

    #[actix_web::test]
    async fn json_quote_backend_failure() {
        let app = app!(Rc::new(FakeBackend::new().failing_inserts(Some("permission denied"))));
        let req = test::TestRequest::post().uri("/v1/quotes").set_json(acme()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let reply: Value = test::read_body_json(resp).await;
        assert_eq!(reply["kind"], "error");
        assert_eq!(reply["message"], "permission denied");
        assert_eq!(reply["quotes"], json!([]));
    }

    #[actix_web::test]
    async fn content_and_status_endpoints() {
        let app = app!(Rc::new(populated()));
        let req = test::TestRequest::get().uri("/v1/content").to_request();
        let view: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(view["loading"], false);
        assert_eq!(view["success_stories"].as_array().unwrap().len(), 2);
        assert_eq!(view["reviews"][0]["author"], "Ana");

        let req = test::TestRequest::get().uri("/v1/status").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "nomadicode is running");
    }
}
