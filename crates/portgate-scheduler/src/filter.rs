use crate::Result;
use portgate_core::{ContainerConfig, Node};

/// Placement filter trait
///
/// A filter receives the full candidate list and returns the nodes that
/// remain eligible, in their original order. Filters never mutate nodes.
pub trait Filter: Send + Sync {
    /// Narrow `nodes` to those eligible for `config`
    fn filter<'a>(&self, config: &ContainerConfig, nodes: &[&'a Node]) -> Result<Vec<&'a Node>>;

    /// Name of the filter
    fn name(&self) -> &str;
}
