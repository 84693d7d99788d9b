//! WebDriver transport errors and their mapping onto surface conditions.

use thiserror::Error;

use crate::error::SurfaceError;

#[derive(Debug, Error)]
pub enum WebDriverError {
    /// The remote end answered with a W3C error code.
    #[error("webdriver error (status {status}) {code}: {message}")]
    Protocol {
        status: u16,
        code: String,
        message: String,
    },

    /// Non-success status without a parsable error body.
    #[error("webdriver HTTP error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl WebDriverError {
    /// Whether the condition may clear up on its own.
    pub fn is_transient(&self) -> bool {
        match self {
            WebDriverError::Protocol { code, .. } => matches!(
                code.as_str(),
                "stale element reference"
                    | "element not interactable"
                    | "element click intercepted"
                    | "element not selectable"
                    | "timeout"
                    | "script timeout"
                    | "unexpected alert open"
            ),
            WebDriverError::Http { status, .. } => *status >= 500,
            WebDriverError::Network(_) => true,
            WebDriverError::UnexpectedResponse(_) => false,
        }
    }
}

impl From<WebDriverError> for SurfaceError {
    fn from(error: WebDriverError) -> Self {
        if error.is_transient() {
            SurfaceError::NotReady(error.to_string())
        } else {
            SurfaceError::NotFound(error.to_string())
        }
    }
}
