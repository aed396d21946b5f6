use crate::port::{
    deserialize_optional_port_map, deserialize_port_map, PortBinding, PortMap, PortSpec,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Network isolation mode of a container
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NetworkMode {
    /// Private namespace behind the default bridge
    #[default]
    Bridge,
    /// Shares the node's network namespace
    Host,
    /// Loopback only
    None,
    /// Joins another container's namespace (`container:<id>`)
    Container(String),
    /// User-defined network
    Custom(String),
}

impl NetworkMode {
    /// Only host mode shares the node's ports directly
    pub fn is_host(&self) -> bool {
        matches!(self, NetworkMode::Host)
    }
}

impl From<&str> for NetworkMode {
    fn from(value: &str) -> Self {
        match value {
            "" | "default" | "bridge" => NetworkMode::Bridge,
            "host" => NetworkMode::Host,
            "none" => NetworkMode::None,
            other => match other.strip_prefix("container:") {
                Some(id) => NetworkMode::Container(id.to_string()),
                None => NetworkMode::Custom(other.to_string()),
            },
        }
    }
}

impl From<String> for NetworkMode {
    fn from(value: String) -> Self {
        NetworkMode::from(value.as_str())
    }
}

impl From<NetworkMode> for String {
    fn from(mode: NetworkMode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkMode::Bridge => f.write_str("bridge"),
            NetworkMode::Host => f.write_str("host"),
            NetworkMode::None => f.write_str("none"),
            NetworkMode::Container(id) => write!(f, "container:{}", id),
            NetworkMode::Custom(name) => f.write_str(name),
        }
    }
}

/// A container resident on a node, running or stopped
///
/// Port usage comes from two sources that are each complete only in part
/// of the lifecycle: `port_bindings` holds what was requested at creation
/// (and survives a stop), `network_ports` holds what the runtime actually
/// allocated (and is only present while running, including dynamically
/// chosen host ports).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Container {
    pub id: String,
    pub name: String,
    pub network_mode: NetworkMode,
    /// Ports exposed by the image or run configuration
    pub exposed_ports: BTreeSet<PortSpec>,
    /// Declared bindings
    #[serde(deserialize_with = "deserialize_port_map")]
    pub port_bindings: PortMap,
    /// Realized bindings, `None` while stopped
    #[serde(deserialize_with = "deserialize_optional_port_map")]
    pub network_ports: Option<PortMap>,
}

impl Container {
    /// Create a stopped bridge-mode container with no ports
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_network_mode(mut self, mode: NetworkMode) -> Self {
        self.network_mode = mode;
        self
    }

    pub fn expose(mut self, port: PortSpec) -> Self {
        self.exposed_ports.insert(port);
        self
    }

    /// Add a declared binding
    pub fn bind(mut self, port: PortSpec, binding: PortBinding) -> Self {
        self.port_bindings.entry(port).or_default().push(binding);
        self
    }

    /// Add a realized binding
    pub fn realize(mut self, port: PortSpec, binding: PortBinding) -> Self {
        self.network_ports
            .get_or_insert_with(PortMap::new)
            .entry(port)
            .or_default()
            .push(binding);
        self
    }

    /// Declared bindings followed by realized bindings
    pub fn effective_bindings(&self) -> impl Iterator<Item = &PortBinding> {
        self.port_bindings
            .values()
            .chain(self.network_ports.iter().flat_map(|ports| ports.values()))
            .flatten()
    }
}

/// Configuration of a container that is about to be placed
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerConfig {
    pub name: String,
    pub network_mode: NetworkMode,
    /// Ports checked in host mode
    pub exposed_ports: BTreeSet<PortSpec>,
    /// Bindings checked in every other mode
    #[serde(deserialize_with = "deserialize_port_map")]
    pub port_bindings: PortMap,
}

impl ContainerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_network_mode(mut self, mode: NetworkMode) -> Self {
        self.network_mode = mode;
        self
    }

    pub fn expose(mut self, port: PortSpec) -> Self {
        self.exposed_ports.insert(port);
        self
    }

    pub fn bind(mut self, port: PortSpec, binding: PortBinding) -> Self {
        self.port_bindings.entry(port).or_default().push(binding);
        self
    }

    /// Every requested binding, flattened across container ports
    pub fn requested_bindings(&self) -> impl Iterator<Item = (&PortSpec, &PortBinding)> {
        self.port_bindings
            .iter()
            .flat_map(|(port, bindings)| bindings.iter().map(move |binding| (port, binding)))
    }
}
