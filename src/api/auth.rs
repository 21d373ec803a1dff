use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::views::{ChangePasswordPage, LoginPage, render_html};
use super::{ApiError, AppState, flash};
use crate::services::AuthError;

const ADMIN_KEY: &str = "is_admin";

pub const LOGIN_PATH: &str = "/admin-login";
pub const ADMIN_VIEW_PATH: &str = "/secret-admin-view";
const CHANGE_PASSWORD_PATH: &str = "/admin-change-password";

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub pw: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordForm {
    #[serde(default)]
    pub current: String,
    #[serde(default)]
    pub new: String,
}

// ============================================================================
// Session helpers
// ============================================================================

pub async fn is_admin(session: &Session) -> Result<bool, ApiError> {
    Ok(session.get::<bool>(ADMIN_KEY).await?.unwrap_or(false))
}

/// Redirect to the login page unless the session belongs to the admin.
pub async fn require_admin(session: &Session) -> Result<Option<Response>, ApiError> {
    if is_admin(session).await? {
        Ok(None)
    } else {
        Ok(Some(Redirect::to(LOGIN_PATH).into_response()))
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /admin-login
pub async fn login_page(session: Session) -> Result<Response, ApiError> {
    render_html(LoginPage {
        flashes: flash::take(&session).await?,
    })
}

/// POST /admin-login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    if !state.auth.check_password(&form.pw).await? {
        tracing::warn!("Failed admin login attempt");
        flash::push(&session, "Incorrect password").await?;
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    }

    session.cycle_id().await?;
    session.insert(ADMIN_KEY, true).await?;
    flash::push(&session, "Logged in").await?;
    tracing::info!("Admin logged in");

    Ok(Redirect::to(ADMIN_VIEW_PATH).into_response())
}

/// GET /admin-logout
pub async fn logout(session: Session) -> Result<Response, ApiError> {
    session.remove::<bool>(ADMIN_KEY).await?;
    flash::push(&session, "Logged out").await?;
    Ok(Redirect::to("/").into_response())
}

/// GET /admin-change-password
pub async fn change_password_page(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Response, ApiError> {
    if let Some(redirect) = require_admin(&session).await? {
        return Ok(redirect);
    }

    render_html(ChangePasswordPage {
        flashes: flash::take(&session).await?,
        min_length: state.config.security.min_password_length,
    })
}

/// POST /admin-change-password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<ChangePasswordForm>,
) -> Result<Response, ApiError> {
    if let Some(redirect) = require_admin(&session).await? {
        return Ok(redirect);
    }

    match state.auth.change_password(&form.current, &form.new).await {
        Ok(()) => {
            flash::push(&session, "Password changed").await?;
            Ok(Redirect::to(ADMIN_VIEW_PATH).into_response())
        }
        Err(AuthError::InvalidCredentials) => {
            flash::push(&session, "Current password is incorrect").await?;
            Ok(Redirect::to(CHANGE_PASSWORD_PATH).into_response())
        }
        Err(AuthError::Validation(msg)) => {
            flash::push(&session, msg).await?;
            Ok(Redirect::to(CHANGE_PASSWORD_PATH).into_response())
        }
        Err(e) => Err(e.into()),
    }
}
