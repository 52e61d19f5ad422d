//! Error types for sysbars.
//!
//! Module-level errors ([`SettingsError`], [`ShellError`], [`ActorError`],
//! [`ConfigError`]) convert into the crate-wide [`SysbarsError`], which is
//! what the CLI reports. It serializes with a `kind` tag so `--json`
//! output carries structured failures.

use serde::Serialize;
use thiserror::Error;

use crate::actor::ActorError;
use crate::config::ConfigError;
use crate::display::ShellError;
use crate::settings::SettingsError;

/// Errors that can occur during application execution.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum SysbarsError {
    /// Invalid command arguments.
    #[error("{0}")]
    InvalidArguments(String),
    /// Settings source failure.
    #[error("Settings error: {0}")]
    SettingsError(String),
    /// Windowing shell failure.
    #[error("Shell error: {0}")]
    ShellError(String),
    /// The bar policy actor is unreachable.
    #[error("Actor error: {0}")]
    ActorError(String),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
    /// Generic command error.
    #[error("{0}")]
    CommandError(String),
}

impl From<std::io::Error> for SysbarsError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err.to_string()) }
}

impl From<serde_json::Error> for SysbarsError {
    fn from(err: serde_json::Error) -> Self { Self::CommandError(err.to_string()) }
}

impl From<SettingsError> for SysbarsError {
    fn from(err: SettingsError) -> Self { Self::SettingsError(err.to_string()) }
}

impl From<ShellError> for SysbarsError {
    fn from(err: ShellError) -> Self { Self::ShellError(err.to_string()) }
}

impl From<ActorError> for SysbarsError {
    fn from(err: ActorError) -> Self { Self::ActorError(err.to_string()) }
}

impl From<ConfigError> for SysbarsError {
    fn from(err: ConfigError) -> Self { Self::ConfigError(err.to_string()) }
}

impl From<String> for SysbarsError {
    fn from(msg: String) -> Self { Self::CommandError(msg) }
}

impl From<&str> for SysbarsError {
    fn from(msg: &str) -> Self { Self::CommandError(msg.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_arguments_display() {
        let err = SysbarsError::InvalidArguments("unknown inset type 'foo'".to_string());
        assert_eq!(err.to_string(), "unknown inset type 'foo'");
    }

    #[test]
    fn test_settings_error_from_conversion() {
        let err: SysbarsError = SettingsError::InvalidValue("key".to_string()).into();
        assert!(matches!(err, SysbarsError::SettingsError(_)));
        assert!(err.to_string().contains("Settings error"));
        assert!(err.to_string().contains("key"));
    }

    #[test]
    fn test_shell_error_from_conversion() {
        let err: SysbarsError =
            ShellError::Rpc { display_id: 2, message: "dead object".to_string() }.into();
        let msg = err.to_string();
        assert!(msg.contains("Shell error"));
        assert!(msg.contains("display 2"));
    }

    #[test]
    fn test_actor_error_from_conversion() {
        let err: SysbarsError = ActorError::SendFailed.into();
        assert!(matches!(err, SysbarsError::ActorError(_)));
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err: SysbarsError = io_err.into();
        assert!(matches!(err, SysbarsError::IoError(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_from_string() {
        let err: SysbarsError = "test error".into();
        assert!(matches!(err, SysbarsError::CommandError(_)));
        assert_eq!(err.to_string(), "test error");
    }

    #[test]
    fn test_error_serializes_with_kind() {
        let err = SysbarsError::ConfigError("Invalid JSON".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "ConfigError");
        assert_eq!(json["message"], "Invalid JSON");
    }
}
