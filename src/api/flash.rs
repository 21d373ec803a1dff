//! One-shot messages carried in the session until the next rendered page.

use tower_sessions::Session;

use super::ApiError;

const FLASH_KEY: &str = "_flashes";

pub async fn push(session: &Session, message: impl Into<String>) -> Result<(), ApiError> {
    let mut messages: Vec<String> = session.get(FLASH_KEY).await?.unwrap_or_default();
    messages.push(message.into());
    session.insert(FLASH_KEY, messages).await?;
    Ok(())
}

/// Removes and returns every pending message.
pub async fn take(session: &Session) -> Result<Vec<String>, ApiError> {
    Ok(session
        .remove::<Vec<String>>(FLASH_KEY)
        .await?
        .unwrap_or_default())
}
