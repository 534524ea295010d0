//! End-to-end requests through the application router with an in-memory store.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{
            CONTENT_TYPE, COOKIE, LOCATION, REFERER, SET_COOKIE, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
        Request, StatusCode,
    },
    response::Response,
    Router,
};
use enroll::{
    api::{
        handlers::signup::SIGNUP_SUCCESS,
        router,
        session::{FlashStore, SessionConfig},
    },
    registration::{MemoryUserStore, Registrar, StoreError, UserRecord, UserStore},
};
use std::{path::Path, sync::Arc};
use tower::ServiceExt;

const FORM: &str = "application/x-www-form-urlencoded";
const SIGNUP_PAGE: &str = "http://localhost:3000/cadastro/index";

fn app_with(store: Arc<dyn UserStore>) -> Router {
    router(
        Arc::new(Registrar::new(store)),
        Arc::new(FlashStore::new(SessionConfig::new())),
        Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/public")),
    )
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request")
}

fn post_form(body: &str, referer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/login/cadastro")
        .header(CONTENT_TYPE, FORM);
    if let Some(referer) = referer {
        builder = builder.header(REFERER, referer);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

async fn text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

/// `name=value` pair from the `Set-Cookie` header, ready for a `Cookie` header.
fn cookie_pair(response: &Response) -> String {
    response
        .headers()
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .expect("session cookie")
        .to_string()
}

#[tokio::test]
async fn pages_render_with_security_headers() {
    let app = app_with(Arc::new(MemoryUserStore::new()));

    for (uri, marker) in [
        ("/", "Bem-vindo"),
        ("/login/index", "<h1>Login</h1>"),
        ("/cadastro/index", "action=\"/login/cadastro\""),
    ] {
        let response = app.clone().oneshot(get(uri, None)).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert_eq!(
            response.headers().get(X_CONTENT_TYPE_OPTIONS).map(|v| v.as_bytes()),
            Some(&b"nosniff"[..])
        );
        assert_eq!(
            response.headers().get(X_FRAME_OPTIONS).map(|v| v.as_bytes()),
            Some(&b"SAMEORIGIN"[..])
        );
        assert!(response.headers().contains_key("x-request-id"));
        assert!(text(response).await.contains(marker), "{uri}");
    }
}

#[tokio::test]
async fn request_id_is_propagated() {
    let app = app_with(Arc::new(MemoryUserStore::new()));
    let request = Request::builder()
        .uri("/")
        .header("x-request-id", "01HTESTREQUEST")
        .body(Body::empty())
        .expect("request");

    let response = app.oneshot(request).await.expect("response");
    assert_eq!(
        response.headers().get("x-request-id").map(|v| v.as_bytes()),
        Some(&b"01HTESTREQUEST"[..])
    );
}

#[tokio::test]
async fn successful_signup_flashes_once_and_redirects_home() {
    let store = Arc::new(MemoryUserStore::new());
    let app = app_with(store.clone());

    let response = app
        .clone()
        .oneshot(post_form("email=new%40b.com&password=abc123", None))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(LOCATION).map(|v| v.as_bytes()),
        Some(&b"/"[..])
    );
    let cookie = cookie_pair(&response);
    assert!(cookie.starts_with("enroll.sid="));

    let page = text(app.clone().oneshot(get("/", Some(&cookie))).await.expect("response")).await;
    assert!(page.contains(SIGNUP_SUCCESS));

    let again = text(app.oneshot(get("/", Some(&cookie))).await.expect("response")).await;
    assert!(!again.contains(SIGNUP_SUCCESS));

    let records = store.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].email, "new@b.com");
    assert_ne!(records[0].password_hash, "abc123");
}

#[tokio::test]
async fn invalid_signup_redirects_back_with_errors() {
    let store = Arc::new(MemoryUserStore::new());
    let app = app_with(store.clone());

    let response = app
        .clone()
        .oneshot(post_form("email=not-an-email&password=ab", Some(SIGNUP_PAGE)))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(LOCATION).map(|v| v.as_bytes()),
        Some(SIGNUP_PAGE.as_bytes())
    );
    let cookie = cookie_pair(&response);

    let page = text(
        app.oneshot(get("/cadastro/index", Some(&cookie)))
            .await
            .expect("response"),
    )
    .await;
    let email_at = page.find("<li>E-mail inválido.</li>").expect("email error");
    let password_at = page
        .find("<li>A senha precisa ter entre 3 e 50 caracteres.</li>")
        .expect("password error");
    assert!(email_at < password_at);
    assert!(store.records().await.is_empty());
}

#[tokio::test]
async fn duplicate_signup_is_reported() {
    let store = Arc::new(MemoryUserStore::with_users([UserRecord::new(
        "a@b.com",
        "$argon2id$existing",
    )]));
    let app = app_with(store.clone());

    let response = app
        .clone()
        .oneshot(post_form("email=a%40b.com&password=abc", Some(SIGNUP_PAGE)))
        .await
        .expect("response");
    let cookie = cookie_pair(&response);

    let page = text(
        app.oneshot(get("/cadastro/index", Some(&cookie)))
            .await
            .expect("response"),
    )
    .await;
    assert!(page.contains("O usuário já existe."));
    assert!(!page.contains(SIGNUP_SUCCESS));
    assert_eq!(store.records().await.len(), 1);
}

#[tokio::test]
async fn repeated_form_fields_are_rejected() {
    let store = Arc::new(MemoryUserStore::new());
    let app = app_with(store.clone());

    let response = app
        .oneshot(post_form(
            "email=a%40b.com&email=c%40d.com&password=abc",
            None,
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(store.records().await.is_empty());
}

#[tokio::test]
async fn json_signup_is_accepted() {
    let store = Arc::new(MemoryUserStore::new());
    let app = app_with(store.clone());

    let request = Request::builder()
        .method("POST")
        .uri("/login/cadastro")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"email": "json@b.com", "password": "abc", "admin": true}"#))
        .expect("request");

    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(store.count_email("json@b.com").await, 1);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let store = Arc::new(MemoryUserStore::new());
    let app = app_with(store.clone());

    let request = Request::builder()
        .method("POST")
        .uri("/login/cadastro")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");

    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!response.headers().contains_key(SET_COOKIE));
    assert!(text(response).await.contains("Página não encontrada."));
    assert!(store.records().await.is_empty());
}

#[tokio::test]
async fn store_failure_renders_error_page() {
    struct FailingInsert;

    #[async_trait]
    impl UserStore for FailingInsert {
        async fn find_by_email(&self, _email: &str) -> Result<Option<UserRecord>, StoreError> {
            Ok(None)
        }

        async fn create(&self, _record: UserRecord) -> Result<UserRecord, StoreError> {
            Err(StoreError::Unavailable("disk full".to_string()))
        }
    }

    let app = app_with(Arc::new(FailingInsert));
    let response = app
        .oneshot(post_form("email=a%40b.com&password=abc", Some(SIGNUP_PAGE)))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!response.headers().contains_key(LOCATION));
    assert!(!text(response).await.contains(SIGNUP_SUCCESS));
}

#[tokio::test]
async fn unknown_paths_render_not_found() {
    let app = app_with(Arc::new(MemoryUserStore::new()));

    for request in [
        get("/does/not/exist", None),
        Request::builder()
            .method("POST")
            .uri("/nope")
            .body(Body::empty())
            .expect("request"),
    ] {
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(text(response).await.contains("Página não encontrada."));
    }
}

#[tokio::test]
async fn static_files_are_served() {
    let app = app_with(Arc::new(MemoryUserStore::new()));

    let response = app.oneshot(get("/style.css", None)).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/css")));
}

#[tokio::test]
async fn health_reports_database() {
    let app = app_with(Arc::new(MemoryUserStore::new()));

    let response = app.oneshot(get("/health", None)).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));
    let body: serde_json::Value =
        serde_json::from_str(&text(response).await).expect("json body");
    assert_eq!(body["database"], "ok");
    assert_eq!(body["name"], "enroll");
}
