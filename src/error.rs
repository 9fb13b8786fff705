//! Error taxonomy for the generation pipeline.
//!
//! Parse failures are deliberately absent: malformed model output is
//! reported through [`Parsed::Malformed`](crate::parse::Parsed) and feeds the
//! coverage loop instead of this type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing credential or unusable configuration. Raised before any request.
    #[error("configuration error: {0}")]
    Config(String),

    /// The provider answered with a non-success status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Connection failure or timeout.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response envelope could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Failures that only cost the current call its coverage.
    ///
    /// The orchestrator keeps going after these; everything else aborts the run.
    pub fn is_call_failure(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::InvalidResponse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_and_config_errors_abort() {
        let api = Error::Api {
            status: 401,
            message: "Incorrect API key".to_string(),
        };
        assert!(!api.is_call_failure());
        assert!(!Error::Config("no key".to_string()).is_call_failure());
        assert!(Error::InvalidResponse("missing choices".to_string()).is_call_failure());
    }

    #[test]
    fn api_error_display_includes_provider_message() {
        let err = Error::Api {
            status: 429,
            message: "Rate limit reached".to_string(),
        };
        assert_eq!(err.to_string(), "API error 429: Rate limit reached");
    }
}
