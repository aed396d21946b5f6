// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Core error type for Portgate data model operations
#[derive(Error, Debug, Diagnostic)]
pub enum CoreError {
    /// A host port or port range could not be parsed
    #[error("Invalid port range '{input}': {reason}")]
    #[diagnostic(
        code(portgate::invalid_port_range),
        help("Use a single port like '8080' or an ascending range like '8000-8010' (0-65535)")
    )]
    InvalidPortRange {
        #[allow(unused)]
        input: String,
        #[allow(unused)]
        reason: String,
    },

    /// A container port key could not be parsed
    #[error("Invalid port spec '{input}': {reason}")]
    #[diagnostic(
        code(portgate::invalid_port_spec),
        help("Container ports are written as '<port>[/<protocol>]', e.g. '80/tcp' or '53/udp'")
    )]
    InvalidPortSpec {
        #[allow(unused)]
        input: String,
        #[allow(unused)]
        reason: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(
        code(portgate::serialization_error),
        help("Ensure the document is valid JSON or YAML")
    )]
    SerializationError {
        #[allow(unused)]
        message: String,
        #[source]
        #[allow(unused)]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for Portgate core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create an InvalidPortRange error
    pub fn invalid_port_range(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPortRange {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidPortSpec error
    pub fn invalid_port_spec(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPortSpec {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source,
        }
    }
}
