use crate::error::{CoreError, Result};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// IPv4 address that binds every interface on a host
pub const ALL_INTERFACES: &str = "0.0.0.0";

/// Returns true when `host_ip` binds all interfaces (empty or `0.0.0.0`)
pub fn binds_all_interfaces(host_ip: &str) -> bool {
    host_ip.is_empty() || host_ip == ALL_INTERFACES
}

/// An inclusive range of host ports
///
/// `(0, 0)` means no host port was requested and the runtime picks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    /// The unspecified, dynamically allocated range
    pub const UNSPECIFIED: PortRange = PortRange { start: 0, end: 0 };

    /// Create a range covering exactly one port
    pub fn single(port: u16) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    /// Parse a host port specification
    ///
    /// Accepts `""` (unspecified), `"N"` and `"A-B"`.
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Ok(Self::UNSPECIFIED);
        }

        let (start, end) = match input.split_once('-') {
            Some((start, end)) => (parse_port(input, start)?, parse_port(input, end)?),
            None => {
                let port = parse_port(input, input)?;
                (port, port)
            }
        };

        if end < start {
            return Err(CoreError::invalid_port_range(
                input,
                "end of range is below its start",
            ));
        }

        Ok(Self { start, end })
    }

    /// True for `(0, 0)`
    pub fn is_unspecified(&self) -> bool {
        self.start == 0 && self.end == 0
    }

    /// True when the range covers a single port
    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    /// Number of ports covered by the range
    pub fn len(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    /// Check whether `port` falls inside the range
    pub fn contains(&self, port: u16) -> bool {
        port >= self.start && port <= self.end
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

impl FromStr for PortRange {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn parse_port(input: &str, part: &str) -> Result<u16> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::invalid_port_range(
            input,
            format!("'{}' is not a port number", part),
        ));
    }
    part.parse::<u16>()
        .map_err(|e| CoreError::invalid_port_range(input, e.to_string()))
}

/// Transport protocol of a container port
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    Sctp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Sctp => "sctp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("tcp") {
            Ok(Protocol::Tcp)
        } else if s.eq_ignore_ascii_case("udp") {
            Ok(Protocol::Udp)
        } else if s.eq_ignore_ascii_case("sctp") {
            Ok(Protocol::Sctp)
        } else {
            Err(CoreError::invalid_port_spec(
                s,
                format!("unknown protocol '{}'", s),
            ))
        }
    }
}

/// A container-facing port such as `80/tcp` or `6000-6010/udp`
///
/// Serialized as its string form so it can key a JSON map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PortSpec {
    pub port: PortRange,
    pub protocol: Protocol,
}

impl PortSpec {
    /// Create a TCP port spec
    pub fn tcp(port: u16) -> Self {
        Self {
            port: PortRange::single(port),
            protocol: Protocol::Tcp,
        }
    }

    /// Create a UDP port spec
    pub fn udp(port: u16) -> Self {
        Self {
            port: PortRange::single(port),
            protocol: Protocol::Udp,
        }
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.port, self.protocol)
    }
}

impl FromStr for PortSpec {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let (port, protocol) = match s.split_once('/') {
            Some((port, proto)) => (port, proto.parse::<Protocol>()?),
            None => (s, Protocol::Tcp),
        };

        if port.is_empty() {
            return Err(CoreError::invalid_port_spec(s, "missing port number"));
        }

        let port = PortRange::parse(port).map_err(|e| match e {
            CoreError::InvalidPortRange { reason, .. } => CoreError::invalid_port_spec(s, reason),
            other => other,
        })?;

        Ok(Self { port, protocol })
    }
}

impl TryFrom<String> for PortSpec {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PortSpec> for String {
    fn from(spec: PortSpec) -> Self {
        spec.to_string()
    }
}

/// A host address and port a container port is published on
///
/// The host port stays as written so malformed values are reported when
/// the binding is evaluated, not when it is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortBinding {
    /// Host address; empty binds all interfaces
    pub host_ip: String,
    /// Host port or range; empty lets the runtime choose
    pub host_port: String,
}

impl PortBinding {
    /// Create a binding on a specific address
    pub fn new(host_ip: impl Into<String>, host_port: impl Into<String>) -> Self {
        Self {
            host_ip: host_ip.into(),
            host_port: host_port.into(),
        }
    }

    /// Create a binding on every interface
    pub fn all_interfaces(host_port: impl Into<String>) -> Self {
        Self::new(ALL_INTERFACES, host_port)
    }

    /// Parse the host port of this binding
    pub fn host_range(&self) -> Result<PortRange> {
        PortRange::parse(&self.host_port)
    }

    /// True when this binding listens on every interface
    pub fn binds_all_interfaces(&self) -> bool {
        binds_all_interfaces(&self.host_ip)
    }

    /// Whether this binding and `host_ip` can claim the same socket address
    pub fn shares_address(&self, host_ip: &str) -> bool {
        self.host_ip == host_ip || self.binds_all_interfaces() || binds_all_interfaces(host_ip)
    }
}

/// Container port to host bindings
pub type PortMap = BTreeMap<PortSpec, Vec<PortBinding>>;

/// Deserialize a [`PortMap`], merging the bindings of keys that name the
/// same container port (`"80"`, `"080"` and `"80/tcp"`)
pub fn deserialize_port_map<'de, D>(deserializer: D) -> std::result::Result<PortMap, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_map(PortMapVisitor)
}

/// Optional variant of [`deserialize_port_map`]
pub fn deserialize_optional_port_map<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<PortMap>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Merged(#[serde(deserialize_with = "deserialize_port_map")] PortMap);

    Ok(Option::<Merged>::deserialize(deserializer)?.map(|merged| merged.0))
}

struct PortMapVisitor;

impl<'de> Visitor<'de> for PortMapVisitor {
    type Value = PortMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of container ports to host bindings")
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<PortMap, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut ports = PortMap::new();
        while let Some((port, bindings)) = access.next_entry::<PortSpec, Vec<PortBinding>>()? {
            ports.entry(port).or_default().extend(bindings);
        }
        Ok(ports)
    }
}
