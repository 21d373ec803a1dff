use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use complaint_box::api::{self, AppState};
use complaint_box::config::Config;
use complaint_box::services::AuthService;
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

const ADMIN_PASSWORD: &str = "letmein-123";

fn test_config() -> Config {
    let path = std::env::temp_dir().join(format!(
        "complaint-box-web-{}.db",
        uuid::Uuid::new_v4()
    ));

    let mut config = Config::default();
    config.general.database_url = format!("sqlite:{}?mode=rwc", path.display());
    config.security.secret_key = Some("test-signing-secret".to_string());
    config.security.bootstrap_password = Some(ADMIN_PASSWORD.to_string());
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

async fn spawn_app(config: Config) -> (Router, Arc<AppState>) {
    let state = api::create_app_state(config)
        .await
        .expect("Failed to create app state");
    (api::router(state.clone()), state)
}

fn form_post(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// `name=value` part of the session cookie.
fn session_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("missing session cookie")
        .to_string()
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn login(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(form_post(
            "/admin-login",
            &format!("pw={ADMIN_PASSWORD}"),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/secret-admin-view");
    session_cookie(&response)
}

#[tokio::test]
async fn test_health_and_index() {
    let (app, _state) = spawn_app(test_config()).await;

    let response = app.clone().oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");

    let response = app.clone().oneshot(get("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("name=\"content\""));

    let response = app.clone().oneshot(get("/favicon.ico", None)).await.unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/static/favicon.svg");
}

#[tokio::test]
async fn test_submit_complaint() {
    let (app, state) = spawn_app(test_config()).await;

    let response = app
        .clone()
        .oneshot(form_post(
            "/",
            "name=&content=%3Cb%3EToo+cold%3C%2Fb%3E&extra_field=",
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    let cookie = session_cookie(&response);

    let complaints = state.store.list_complaints().await.unwrap();
    assert_eq!(complaints.len(), 1);
    assert_eq!(complaints[0].name.as_deref(), Some("Anonymous"));
    assert_eq!(
        complaints[0].content.as_deref(),
        Some("&lt;b&gt;Too cold&lt;/b&gt;")
    );
    assert!(complaints[0].date_posted.is_some());

    // The confirmation is shown once.
    let response = app.clone().oneshot(get("/", Some(&cookie))).await.unwrap();
    assert!(body_text(response).await.contains("Your complaint has been submitted."));
}

#[tokio::test]
async fn test_honeypot_rejects_bots() {
    let (app, state) = spawn_app(test_config()).await;

    let response = app
        .clone()
        .oneshot(form_post(
            "/",
            "name=Bot&content=Buy+now&extra_field=http%3A%2F%2Fspam",
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Bot Detected!");
    assert_eq!(state.store.count_complaints().await.unwrap(), 0);
}

#[tokio::test]
async fn test_invalid_submissions_flash_and_store_nothing() {
    let (app, state) = spawn_app(test_config()).await;

    let long_name = "a".repeat(101);
    for body in [
        "name=Ann&content=+++".to_string(),
        format!("name={long_name}&content=Fine"),
    ] {
        let response = app.clone().oneshot(form_post("/", &body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    assert_eq!(state.store.count_complaints().await.unwrap(), 0);
}

#[tokio::test]
async fn test_submission_rate_limit() {
    let mut config = test_config();
    config.server.submissions_per_minute = 2;
    let (app, state) = spawn_app(config).await;

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(form_post("/", "name=Ann&content=Again", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    let response = app
        .clone()
        .oneshot(form_post("/", "name=Ann&content=Again", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(state.store.count_complaints().await.unwrap(), 2);
}

#[tokio::test]
async fn test_admin_view_requires_login() {
    let (app, _state) = spawn_app(test_config()).await;

    for uri in ["/secret-admin-view", "/admin-change-password"] {
        let response = app.clone().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/admin-login");
    }

    let response = app
        .clone()
        .oneshot(form_post("/admin-login", "pw=wrong", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin-login");
}

#[tokio::test]
async fn test_admin_login_lists_complaints_and_logout() {
    let (app, state) = spawn_app(test_config()).await;
    state
        .store
        .add_complaint("Ann", "The lift is broken")
        .await
        .unwrap();

    let cookie = login(&app).await;

    let response = app
        .clone()
        .oneshot(get("/secret-admin-view", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("The lift is broken"));
    assert!(html.contains("Ann"));

    let response = app
        .clone()
        .oneshot(get("/admin-logout", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = app
        .clone()
        .oneshot(get("/secret-admin-view", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin-login");
}

#[tokio::test]
async fn test_change_password_flow() {
    let (app, state) = spawn_app(test_config()).await;
    let cookie = login(&app).await;

    let response = app
        .clone()
        .oneshot(form_post(
            "/admin-change-password",
            "current=wrong&new=brand-new-pass",
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(location(&response), "/admin-change-password");

    let response = app
        .clone()
        .oneshot(form_post(
            "/admin-change-password",
            &format!("current={ADMIN_PASSWORD}&new=abc"),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(location(&response), "/admin-change-password");

    let response = app
        .clone()
        .oneshot(form_post(
            "/admin-change-password",
            &format!("current={ADMIN_PASSWORD}&new=brand-new-pass"),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(location(&response), "/secret-admin-view");

    assert!(state.auth.check_password("brand-new-pass").await.unwrap());
    assert!(!state.auth.check_password(ADMIN_PASSWORD).await.unwrap());
}
