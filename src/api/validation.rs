use super::ApiError;

pub const MAX_NAME_CHARS: usize = 100;

/// A public submission after escaping, ready to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub name: String,
    pub content: String,
}

/// Trims and HTML-escapes user text.
#[must_use]
pub fn sanitize(input: &str) -> String {
    html_escape::encode_text(input.trim()).into_owned()
}

/// True when the hidden honeypot field carries anything.
#[must_use]
pub fn is_bot(extra_field: Option<&str>) -> bool {
    extra_field.is_some_and(|value| !value.trim().is_empty())
}

pub fn validate_submission(
    name: Option<&str>,
    content: Option<&str>,
    anonymous_name: &str,
) -> Result<Submission, ApiError> {
    let content = sanitize(content.unwrap_or_default());
    if content.is_empty() {
        return Err(ApiError::validation("Complaint cannot be empty."));
    }

    let name = sanitize(name.unwrap_or_default());
    let name = if name.is_empty() {
        anonymous_name.to_string()
    } else {
        name
    };

    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ApiError::validation(format!(
            "Name must be {MAX_NAME_CHARS} characters or less."
        )));
    }

    Ok(Submission { name, content })
}
