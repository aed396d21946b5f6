use crate::container::Container;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A candidate execution node and the containers it hosts
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Node {
    pub id: String,
    pub name: String,
    /// Resident containers, running or stopped
    pub containers: Vec<Container>,
}

impl Node {
    /// Create an empty node
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            containers: Vec::new(),
        }
    }

    /// Add a resident container
    pub fn with_container(mut self, container: Container) -> Self {
        self.containers.push(container);
        self
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            f.write_str(&self.id)
        } else {
            f.write_str(&self.name)
        }
    }
}
