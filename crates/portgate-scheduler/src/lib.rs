//! Portgate Scheduler - Port eligibility filtering for container placement
//!
//! This crate provides:
//! - The placement filter contract shared by node filters
//! - A port filter for host-mode and bridge-mode containers
//! - Scheduling snapshots of a container and its candidate nodes

pub mod error;
pub mod filter;
pub mod port;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SchedulerError};
pub use filter::Filter;
pub use port::PortFilter;
pub use types::SchedulingContext;
