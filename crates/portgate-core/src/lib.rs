//! Portgate Core - Data model for port-aware container placement
//!
//! This crate provides:
//! - Host port ranges and the range parser
//! - Container port specs and host bindings
//! - Read-only views of candidate nodes and their containers
//! - Error types with miette diagnostics
//! - Serialization helpers

pub mod container;
pub mod error;
pub mod node;
pub mod port;

// Re-export commonly used types
pub use container::{Container, ContainerConfig, NetworkMode};
pub use error::{CoreError, Result};
pub use node::Node;
pub use port::{binds_all_interfaces, PortBinding, PortMap, PortRange, PortSpec, Protocol};

/// Serialize a value to pretty JSON
pub fn to_json_pretty<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| {
        CoreError::serialization_error(
            format!("Failed to serialize to JSON: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Deserialize a value from JSON
pub fn from_json<T: for<'de> serde::Deserialize<'de>>(data: &str) -> Result<T> {
    serde_json::from_str(data).map_err(|e| {
        CoreError::serialization_error(
            format!("Failed to deserialize from JSON: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Deserialize a value from YAML
pub fn from_yaml<T: for<'de> serde::Deserialize<'de>>(data: &str) -> Result<T> {
    serde_yaml::from_str(data).map_err(|e| {
        CoreError::serialization_error(
            format!("Failed to deserialize from YAML: {}", e),
            Some(Box::new(e)),
        )
    })
}
