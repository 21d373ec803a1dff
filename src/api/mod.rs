use axum::{Router, routing::get};
use rand::Rng;
use sha2::{Digest, Sha512};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::{Config, SecurityConfig};
use crate::db::Store;
use crate::services::{AuthService, SeaOrmAuthService};

pub mod auth;
mod complaints;
mod error;
pub mod flash;
mod system;
pub mod throttle;
pub mod validation;
mod views;

pub use error::ApiError;
pub use throttle::SubmissionLimiter;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    pub store: Store,

    pub auth: Arc<dyn AuthService>,

    pub limiter: Arc<SubmissionLimiter>,
}

/// Connects to the database, ensures the schema, and runs the credential
/// bootstrap.
pub async fn create_app_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_url,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    create_app_state_with_store(config, store).await
}

pub async fn create_app_state_with_store(
    config: Config,
    store: Store,
) -> anyhow::Result<Arc<AppState>> {
    let auth: Arc<dyn AuthService> = Arc::new(SeaOrmAuthService::new(
        store.clone(),
        config.security.clone(),
    ));
    auth.bootstrap().await?;

    let limiter = Arc::new(SubmissionLimiter::per_minute(
        config.server.submissions_per_minute,
    ));

    Ok(Arc::new(AppState {
        config: Arc::new(config),
        store,
        auth,
        limiter,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let server = &state.config.server;

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(server.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            server.session_idle_minutes,
        )))
        .with_signed(session_key(&state.config.security));

    let static_files = ServeDir::new(&server.static_dir);

    Router::new()
        .route("/", get(complaints::index).post(complaints::submit))
        .route("/health", get(system::health))
        .route("/favicon.ico", get(system::favicon))
        .route("/admin-login", get(auth::login_page).post(auth::login))
        .route("/secret-admin-view", get(complaints::admin_view))
        .route(
            "/admin-change-password",
            get(auth::change_password_page).post(auth::change_password),
        )
        .route("/admin-logout", get(auth::logout))
        .nest_service("/static", static_files)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(session_layer),
        )
        .with_state(state)
}

/// Cookie signing key derived from `SECRET_KEY`. Without one, a random key is
/// used and sessions do not survive a restart.
fn session_key(security: &SecurityConfig) -> Key {
    match security.secret_key.as_deref() {
        Some(secret) => Key::from(Sha512::digest(secret.as_bytes()).as_slice()),
        None => {
            tracing::warn!("SECRET_KEY is not set; using a random session key");
            let mut bytes = [0u8; 64];
            rand::rng().fill(&mut bytes[..]);
            Key::from(&bytes)
        }
    }
}
