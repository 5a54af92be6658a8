use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in log messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Bodies longer than this are never shown to the user verbatim
const MAX_DISPLAY_BODY_LENGTH: usize = 50;

const TRUNCATED_MESSAGE: &str = "Error truncated (too long)";
const UNREACHABLE_MESSAGE: &str = "Unable to reach server";

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            400 => ApiError::BadRequest(truncated),
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// True when the failure says nothing about the credential itself:
    /// the backend could not be reached or could not answer.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::NetworkError(_)
                | ApiError::Timeout
                | ApiError::RateLimited
                | ApiError::ServerError(_)
        )
    }

    /// True when the backend looked at the credential and refused it.
    /// Anything else (wrong URL, garbled answer, outage) says nothing about
    /// whether the stored token is still good.
    pub fn rejects_credential(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized | ApiError::BadRequest(_) | ApiError::AccessDenied(_)
        )
    }

    /// The response body the backend sent, if any.
    fn body(&self) -> Option<&str> {
        match self {
            ApiError::BadRequest(body)
            | ApiError::AccessDenied(body)
            | ApiError::NotFound(body)
            | ApiError::ServerError(body) => Some(body.as_str()),
            _ => None,
        }
    }

    /// Text that is safe to show in a notice or inline form message.
    ///
    /// Long bodies are replaced by a placeholder so arbitrary server output
    /// never reaches the screen; short JSON error bodies are flattened into
    /// a readable sentence.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Session expired. Please log in again.".to_string(),
            ApiError::RateLimited => "Too many requests, try again later".to_string(),
            ApiError::NetworkError(_) | ApiError::Timeout => UNREACHABLE_MESSAGE.to_string(),
            _ => match self.body() {
                Some(body) if !body.trim().is_empty() => flatten_error_body(body),
                _ => UNREACHABLE_MESSAGE.to_string(),
            },
        }
    }
}

fn flatten_error_body(body: &str) -> String {
    if body.chars().count() > MAX_DISPLAY_BODY_LENGTH {
        return TRUNCATED_MESSAGE.to_string();
    }
    body.replace("non_field_errors", "")
        .chars()
        .filter_map(|c| match c {
            '{' | '}' | '(' | ')' | '"' => Some(' '),
            '[' | ']' | '.' => None,
            other => Some(other),
        })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_REQUEST, "{}"),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "down"),
            ApiError::ServerError(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::IM_A_TEAPOT, ""),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_truncate_body_for_logs() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.ends_with("(truncated, 520 total bytes)"));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }

    #[test]
    fn test_user_message_flattens_short_body() {
        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"non_field_errors":["Passwords do not match."]}"#,
        );
        assert_eq!(err.user_message(), ": Passwords do not match");
    }

    #[test]
    fn test_user_message_replaces_long_body() {
        let body = format!(r#"{{"detail":"{}"}}"#, "a".repeat(80));
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, &body);
        assert_eq!(err.user_message(), TRUNCATED_MESSAGE);
    }

    #[test]
    fn test_user_message_without_body() {
        assert_eq!(ApiError::Timeout.user_message(), UNREACHABLE_MESSAGE);
        assert_eq!(
            ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "").user_message(),
            UNREACHABLE_MESSAGE
        );
    }

    #[test]
    fn test_is_transient() {
        assert!(ApiError::Timeout.is_transient());
        assert!(ApiError::RateLimited.is_transient());
        assert!(ApiError::ServerError("oops".into()).is_transient());
        assert!(!ApiError::Unauthorized.is_transient());
        assert!(!ApiError::BadRequest("bad".into()).is_transient());
        assert!(!ApiError::InvalidResponse("junk".into()).is_transient());
    }

    #[test]
    fn test_rejects_credential() {
        assert!(ApiError::Unauthorized.rejects_credential());
        assert!(ApiError::from_status(StatusCode::BAD_REQUEST, "{}").rejects_credential());
        assert!(!ApiError::from_status(StatusCode::NOT_FOUND, "<html>").rejects_credential());
        assert!(!ApiError::InvalidResponse("not json".into()).rejects_credential());
        assert!(!ApiError::Timeout.rejects_credential());
    }
}
