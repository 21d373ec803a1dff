//! Public submission form and the admin listing.

use axum::{
    Form,
    extract::{ConnectInfo, State},
    http::Extensions,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::require_admin;
use super::validation::{is_bot, validate_submission};
use super::views::{AdminViewPage, ComplaintRow, IndexPage, render_html};
use super::{ApiError, AppState, flash};

#[derive(Deserialize)]
pub struct SubmissionForm {
    pub name: Option<String>,
    pub content: Option<String>,
    /// Honeypot, hidden from humans.
    pub extra_field: Option<String>,
}

/// GET /
pub async fn index(session: Session) -> Result<Response, ApiError> {
    render_html(IndexPage {
        flashes: flash::take(&session).await?,
    })
}

/// POST /
pub async fn submit(
    State(state): State<Arc<AppState>>,
    extensions: Extensions,
    session: Session,
    Form(form): Form<SubmissionForm>,
) -> Result<Response, ApiError> {
    if !state.limiter.check(&client_key(&extensions)) {
        return Err(ApiError::TooManyRequests);
    }

    if is_bot(form.extra_field.as_deref()) {
        tracing::info!("Rejected submission with filled honeypot field");
        return Err(ApiError::BotDetected);
    }

    let submission = match validate_submission(
        form.name.as_deref(),
        form.content.as_deref(),
        &state.config.server.anonymous_name,
    ) {
        Ok(submission) => submission,
        Err(ApiError::ValidationError(msg)) => {
            flash::push(&session, msg).await?;
            return Ok(Redirect::to("/").into_response());
        }
        Err(e) => return Err(e),
    };

    let complaint = state
        .store
        .add_complaint(&submission.name, &submission.content)
        .await
        .map_err(|e| ApiError::DatabaseError(format!("{e:#}")))?;
    tracing::info!(complaint_id = complaint.id, "Complaint submitted");

    flash::push(&session, "Your complaint has been submitted.").await?;
    Ok(Redirect::to("/").into_response())
}

/// GET /secret-admin-view
pub async fn admin_view(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Response, ApiError> {
    if let Some(redirect) = require_admin(&session).await? {
        return Ok(redirect);
    }

    let complaints = state
        .store
        .list_complaints()
        .await
        .map_err(|e| ApiError::DatabaseError(format!("{e:#}")))?;

    render_html(AdminViewPage {
        flashes: flash::take(&session).await?,
        complaints: complaints.into_iter().map(ComplaintRow::from).collect(),
    })
}

/// Peer address of the request, when the server was started with connect
/// info.
fn client_key(extensions: &Extensions) -> String {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |ConnectInfo(addr)| addr.ip().to_string())
}
