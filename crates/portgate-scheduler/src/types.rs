use portgate_core::{ContainerConfig, Node};
use serde::{Deserialize, Serialize};

/// Scheduling context containing a container and its candidate nodes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingContext {
    /// Container to be placed
    pub config: ContainerConfig,
    /// Candidate nodes
    pub nodes: Vec<Node>,
}

impl SchedulingContext {
    /// Borrow the candidate nodes in the form filters expect
    pub fn candidates(&self) -> Vec<&Node> {
        self.nodes.iter().collect()
    }
}
