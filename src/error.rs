use serde_json::Value as JsonValue;
use thiserror::Error;

/// The primary error type for the client.
///
/// Every backend call, push subscription and local validation reports one of
/// these. A failed call never leaves a state module half-updated; the caller
/// turns the error into a notification via [`ClientError::user_message`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced an HTTP response (DNS, connect, timeout, TLS).
    #[error("Network error: {0}")]
    Network(String),
    /// A non-2xx response that has no more specific variant.
    #[error("HTTP {status}: {message}")]
    Http {
        /// The HTTP status code.
        status: u16,
        /// The message extracted from the response body.
        message: String,
    },
    /// The bearer token is missing, expired or rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// The current user may not perform the action.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// For when a requested resource is not found.
    #[error("Not found: {0}")]
    NotFound(String),
    /// For when the backend throttles the client.
    #[error("Rate limited. Retry after {retry_after_seconds} seconds")]
    RateLimited {
        /// The number of seconds to wait before retrying the request.
        retry_after_seconds: u64,
    },
    /// A response or push body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
    /// For when user input is invalid.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// For when a specific field fails validation.
    #[error("Validation error on field '{field}': {message}")]
    ValidationError {
        /// The name of the field that failed validation.
        field: String,
        /// A message describing the validation error.
        message: String,
    },
    /// No session is active.
    #[error("Not logged in")]
    NotLoggedIn,
    /// Only one upload is tracked at a time.
    #[error("An upload is already in progress")]
    UploadInProgress,
    /// The push channel is closed or the broker reported an error.
    #[error("Push channel error: {0}")]
    Push(String),
    /// For errors related to I/O operations.
    #[error("I/O error: {0}")]
    Io(String),
}

impl ClientError {
    /// Maps a non-2xx status and its raw body onto an error variant.
    ///
    /// The backend answers with either `{"message": ".."}`,
    /// `{"error": {"message": ".."}}` or plain text; all three are understood.
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<JsonValue>(body).ok();
        let message = parsed
            .as_ref()
            .and_then(extract_message)
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    format!("HTTP error {}", status)
                } else {
                    trimmed.to_string()
                }
            });

        match status {
            401 => ClientError::Unauthorized(message),
            403 => ClientError::PermissionDenied(message),
            404 => ClientError::NotFound(message),
            429 => {
                let retry_after_seconds = parsed
                    .as_ref()
                    .and_then(|v| v.get("retry_after_seconds"))
                    .and_then(|x| x.as_u64())
                    .unwrap_or(1);
                ClientError::RateLimited { retry_after_seconds }
            }
            _ => ClientError::Http { status, message },
        }
    }

    /// Text for a transient user notification.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Network(_) => "Network error, please check your connection".to_string(),
            ClientError::Http { message, .. } => message.clone(),
            ClientError::Unauthorized(_) | ClientError::NotLoggedIn => {
                "Your session has expired, please log in again".to_string()
            }
            ClientError::PermissionDenied(_) => {
                "You do not have permission to perform this action".to_string()
            }
            ClientError::NotFound(msg) => msg.clone(),
            ClientError::RateLimited { retry_after_seconds } => {
                format!("Too many requests. Please retry after {} seconds", retry_after_seconds)
            }
            ClientError::ValidationError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether the error means the session must be torn down.
    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_) | ClientError::NotLoggedIn)
    }
}

fn extract_message(v: &JsonValue) -> Option<String> {
    if let Some(msg) = v.get("message").and_then(|m| m.as_str()) {
        return Some(msg.to_string());
    }
    v.get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ClientError::Decode(err.to_string());
        }
        if let Some(status) = err.status() {
            return ClientError::from_status(status.as_u16(), "");
        }
        ClientError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Io(format!("{}: {}", err.kind(), err))
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidInput(format!("Invalid URL: {}", err))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::Push(err.to_string())
    }
}

/// A type alias for `Result<T, ClientError>`, used throughout the crate.
pub type ClientResult<T> = Result<T, ClientError>;

/// An extension trait for `Option` that provides a convenient way to convert
/// an `Option` to a `Result` with a `NotFound` error.
pub trait OptionExt<T> {
    /// Converts an `Option<T>` to a `Result<T, ClientError>`.
    ///
    /// # Arguments
    ///
    /// * `entity` - A string describing the entity that was not found.
    fn ok_or_not_found(self, entity: &str) -> ClientResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &str) -> ClientResult<T> {
        self.ok_or_else(|| ClientError::NotFound(format!("{} not found", entity)))
    }
}

/// Helper functions for validating user input before it is sent.
pub mod validation {
    use super::*;

    /// Validates a document or folder name.
    ///
    /// Names must be non-empty after trimming and must not contain `/` or NUL.
    pub fn validate_item_name(name: &str) -> ClientResult<()> {
        if name.trim().is_empty() {
            return Err(ClientError::ValidationError {
                field: "name".to_string(),
                message: "Name cannot be empty".to_string(),
            });
        }
        if name.contains('/') || name.contains('\0') {
            return Err(ClientError::ValidationError {
                field: "name".to_string(),
                message: "Name must not contain '/' or null characters".to_string(),
            });
        }
        if name.chars().count() > 255 {
            return Err(ClientError::ValidationError {
                field: "name".to_string(),
                message: "Name must be at most 255 characters".to_string(),
            });
        }
        Ok(())
    }

    /// Validates the rough shape of an email address (`local@domain.tld`).
    pub fn validate_email(email: &str) -> ClientResult<()> {
        let email = email.trim();
        let invalid = || ClientError::ValidationError {
            field: "email".to_string(),
            message: format!("'{}' is not a valid email address", email),
        };
        let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
        if local.is_empty() || domain.contains('@') || !domain.contains('.') {
            return Err(invalid());
        }
        if domain.starts_with('.') || domain.ends_with('.') || email.contains(char::is_whitespace) {
            return Err(invalid());
        }
        Ok(())
    }

    /// Validates that a number is positive.
    pub fn validate_positive_number(value: Option<i64>, field: &str) -> ClientResult<()> {
        if let Some(v) = value {
            if v <= 0 {
                return Err(ClientError::ValidationError {
                    field: field.to_string(),
                    message: format!("Value must be positive, got {}", v),
                });
            }
        }
        Ok(())
    }
}
