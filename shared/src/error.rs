//! Error types for the tarot reading Lambda functions.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while producing a reading.
///
/// The first four variants are pipeline stage failures and never reach the
/// caller: the pipeline converts them into the fallback reading. The rest are
/// cold-start faults.
#[derive(Error, Debug)]
pub enum Error {
    /// The generation service could not be reached (network failure, timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The generation service answered with a non-success status
    #[error("Upstream error: {status}")]
    Upstream { status: u16, body: String },

    /// No `{ ... }` span in the generated text
    #[error("No structured payload found in generated text")]
    Extraction,

    /// A span was found but it is not a JSON object
    #[error("Malformed payload: {raw}")]
    MalformedPayload { raw: String },

    /// No API credential in the environment or the configured secret
    #[error("No API Key found")]
    MissingApiKey,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_message() {
        assert_eq!(Error::MissingApiKey.to_string(), "No API Key found");
    }

    #[test]
    fn test_upstream_message_omits_body() {
        let err = Error::Upstream {
            status: 503,
            body: "{\"error\":\"busy\"}".to_string(),
        };
        assert_eq!(err.to_string(), "Upstream error: 503");
    }
}
