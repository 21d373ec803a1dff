//! Askama page templates (`templates/`).

use askama::Template;
use axum::response::{Html, IntoResponse, Response};

use super::ApiError;
use crate::db::Complaint;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub flashes: Vec<String>,
}

#[derive(Template)]
#[template(path = "admin_login.html")]
pub struct LoginPage {
    pub flashes: Vec<String>,
}

#[derive(Template)]
#[template(path = "admin_view.html")]
pub struct AdminViewPage {
    pub flashes: Vec<String>,
    pub complaints: Vec<ComplaintRow>,
}

#[derive(Template)]
#[template(path = "admin_change_password.html")]
pub struct ChangePasswordPage {
    pub flashes: Vec<String>,
    pub min_length: usize,
}

/// Display form of a stored complaint. Name and content were escaped on the
/// way in and are rendered as is.
pub struct ComplaintRow {
    pub id: i32,
    pub name: String,
    pub content: String,
    pub posted: String,
}

impl From<Complaint> for ComplaintRow {
    fn from(complaint: Complaint) -> Self {
        Self {
            id: complaint.id,
            name: complaint.name.unwrap_or_default(),
            content: complaint.content.unwrap_or_default(),
            posted: complaint
                .date_posted
                .map(|dt| dt.format(DATE_FORMAT).to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

pub fn render_html<T: Template>(tpl: T) -> Result<Response, ApiError> {
    let html = tpl
        .render()
        .map_err(|e| ApiError::internal(format!("Template rendering failed: {e}")))?;
    Ok(Html(html).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_complaint_row_formats_date() {
        let row = ComplaintRow::from(Complaint {
            id: 3,
            name: None,
            content: Some("Too loud".to_string()),
            date_posted: NaiveDate::from_ymd_opt(2024, 5, 1).and_then(|d| d.and_hms_opt(9, 30, 0)),
        });

        assert_eq!(row.name, "");
        assert_eq!(row.posted, "2024-05-01 09:30");

        let row = ComplaintRow::from(Complaint {
            id: 4,
            name: Some("Ann".to_string()),
            content: None,
            date_posted: None,
        });
        assert_eq!(row.posted, "unknown");
    }

    #[test]
    fn test_index_renders_flashes() {
        let html = IndexPage {
            flashes: vec!["Thanks".to_string()],
        }
        .render()
        .unwrap();
        assert!(html.contains("Thanks"));
        assert!(html.contains("name=\"extra_field\""));
    }
}
