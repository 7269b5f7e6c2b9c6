//! Error types for the preview session manager

/// Result type alias using the preview Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while opening or running a preview session
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resolver returned an error or no usable playback URL
    #[error("Resolution failed: {0}")]
    ResolutionFailed(String),

    /// Execution environment cannot decode the chosen format
    #[error("Unsupported format: {0}")]
    Unsupported(String),

    /// WHEP endpoint answered the signaling POST with a non-2xx status
    #[error("Signaling rejected: HTTP {status}: {body}")]
    SignalingRejected { status: u16, body: String },

    /// Malformed or unapplicable session description, or a failed peer operation
    #[error("Negotiation failed: {0}")]
    NegotiationFailed(String),

    /// Console API returned a non-zero result code
    #[error("API error {code}: {msg}")]
    Api { code: i32, msg: String },

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error came from the signaling exchange
    pub fn is_signaling_rejection(&self) -> bool {
        matches!(self, Error::SignalingRejected { .. })
    }

    /// Check if this error is a capability failure (never worth retrying)
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported(_))
    }

    /// Check if this error is a resolution failure
    pub fn is_resolution_failure(&self) -> bool {
        matches!(self, Error::ResolutionFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ResolutionFailed("no usable URL".to_string());
        assert_eq!(err.to_string(), "Resolution failed: no usable URL");

        let err = Error::SignalingRejected {
            status: 500,
            body: "Internal Server Error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Signaling rejected: HTTP 500: Internal Server Error"
        );
    }

    #[test]
    fn test_error_predicates() {
        assert!(Error::SignalingRejected {
            status: 403,
            body: String::new()
        }
        .is_signaling_rejection());
        assert!(Error::Unsupported("FLV".to_string()).is_unsupported());
        assert!(Error::ResolutionFailed("x".to_string()).is_resolution_failure());
        assert!(!Error::NegotiationFailed("x".to_string()).is_unsupported());
    }
}
