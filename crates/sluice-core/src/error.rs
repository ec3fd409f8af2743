//! Error types for Sluice Core.

use sluice_abstraction::EventSourceError;
use thiserror::Error;

/// Core error type for Sluice operations.
///
/// Policy violations and hold lifecycle races are not errors: they resolve to
/// ordinary result values (`EnforcementResult`, hold snapshots). This type
/// covers genuinely unexpected failures only.
#[derive(Error, Debug)]
pub enum SluiceError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file parse errors
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Event source errors
    #[error("Event source error: {0}")]
    Source(#[from] EventSourceError),
}

/// Result type alias for Sluice operations.
pub type Result<T> = std::result::Result<T, SluiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_source_conversion() {
        let source_err = EventSourceError::Backend("connection reset".to_string());
        let err: SluiceError = source_err.into();
        match err {
            SluiceError::Source(EventSourceError::Backend(msg)) => {
                assert_eq!(msg, "connection reset");
            }
            _ => panic!("Expected Source error variant"),
        }
    }

    #[test]
    fn test_error_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing config");
        let err: SluiceError = io_err.into();
        match err {
            SluiceError::Io(_) => {}
            _ => panic!("Expected Io error variant"),
        }
    }

    #[test]
    fn test_error_serialization_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: SluiceError = json_err.into();
        match err {
            SluiceError::Serialization(_) => {}
            _ => panic!("Expected Serialization error variant"),
        }
    }

    #[test]
    fn test_error_config_display() {
        let err = SluiceError::Config("missing streamer section".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Configuration error"));
        assert!(msg.contains("missing streamer section"));
    }
}
