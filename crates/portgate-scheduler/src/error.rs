// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Scheduler error type
#[derive(Error, Debug, Diagnostic)]
pub enum SchedulerError {
    /// No candidate node can expose the port in host mode
    #[error("unable to find a node with port {port} available in the Host mode")]
    #[diagnostic(
        code(scheduler::host_port_unavailable),
        help("Another host-mode container already exposes this port on every candidate node")
    )]
    HostPortUnavailable {
        #[allow(unused)]
        port: String,
    },

    /// No candidate node can publish the requested host port
    #[error("unable to find a node with port {port} available")]
    #[diagnostic(
        code(scheduler::port_unavailable),
        help("Pick another host port, bind a specific address, or leave the host port empty to let the runtime choose")
    )]
    PortUnavailable {
        #[allow(unused)]
        port: String,
    },

    /// Core error
    #[error(transparent)]
    #[diagnostic(transparent)]
    Core(#[from] portgate_core::CoreError),
}

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;

impl SchedulerError {
    /// Create a HostPortUnavailable error
    pub fn host_port_unavailable(port: impl Into<String>) -> Self {
        Self::HostPortUnavailable { port: port.into() }
    }

    /// Create a PortUnavailable error
    pub fn port_unavailable(port: impl Into<String>) -> Self {
        Self::PortUnavailable { port: port.into() }
    }
}
