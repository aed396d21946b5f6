use crate::filter::Filter;
use crate::{Result, SchedulerError};
use portgate_core::{ContainerConfig, Node, PortBinding, PortRange, PortSpec};
use std::collections::HashSet;
use std::fmt::Display;
use tracing::{debug, info, warn};

/// Filter for host port collisions
///
/// Host-mode containers are checked against the ports other host-mode
/// containers expose. Every other mode is checked against the host
/// bindings, declared or realized, of all containers on the node.
pub struct PortFilter;

impl Filter for PortFilter {
    fn filter<'a>(&self, config: &ContainerConfig, nodes: &[&'a Node]) -> Result<Vec<&'a Node>> {
        let eligible = if config.network_mode.is_host() {
            debug!("Container {} uses host networking", config.name);
            self.filter_host(config, nodes)?
        } else {
            debug!(
                "Container {} uses {} networking",
                config.name, config.network_mode
            );
            self.filter_bridge(config, nodes)?
        };

        info!(
            "{} of {} nodes have the ports of container {} available",
            eligible.len(),
            nodes.len(),
            config.name
        );

        Ok(eligible)
    }

    fn name(&self) -> &str {
        "port"
    }
}

impl PortFilter {
    fn filter_host<'a>(&self, config: &ContainerConfig, nodes: &[&'a Node]) -> Result<Vec<&'a Node>> {
        let mut nodes = nodes.to_vec();

        for port in &config.exposed_ports {
            let candidates = narrow(&nodes, port, |node| Ok(port_already_exposed(node, port)))?;

            if candidates.is_empty() {
                warn!("No node has port {} available in host mode", port);
                return Err(SchedulerError::host_port_unavailable(port.to_string()));
            }

            nodes = candidates;
        }

        Ok(nodes)
    }

    fn filter_bridge<'a>(
        &self,
        config: &ContainerConfig,
        nodes: &[&'a Node],
    ) -> Result<Vec<&'a Node>> {
        let mut nodes = nodes.to_vec();

        for (container_port, binding) in config.requested_bindings() {
            let requested = binding.host_range()?;

            if requested.is_unspecified() {
                debug!(
                    "Container port {} has no host port, runtime will allocate one",
                    container_port
                );
            }

            let candidates = narrow(&nodes, &requested, |node| {
                port_in_use(node, &binding.host_ip, requested)
            })?;

            if candidates.is_empty() {
                warn!("No node has port {} available", binding.host_port);
                return Err(SchedulerError::port_unavailable(binding.host_port.as_str()));
            }

            nodes = candidates;
        }

        Ok(nodes)
    }
}

/// Keep the nodes on which `in_use` reports no collision, preserving order
fn narrow<'a, F>(nodes: &[&'a Node], port: &dyn Display, mut in_use: F) -> Result<Vec<&'a Node>>
where
    F: FnMut(&Node) -> Result<bool>,
{
    let mut candidates = Vec::with_capacity(nodes.len());

    for &node in nodes {
        if in_use(node)? {
            debug!("Node {} filtered out: port {} already in use", node, port);
        } else {
            candidates.push(node);
        }
    }

    Ok(candidates)
}

/// Whether a host-mode container on the node already exposes `port`
fn port_already_exposed(node: &Node, port: &PortSpec) -> bool {
    node.containers
        .iter()
        .any(|c| c.network_mode.is_host() && c.exposed_ports.contains(port))
}

/// Whether every port of `requested` on `host_ip` is taken on the node
fn port_in_use(node: &Node, host_ip: &str, requested: PortRange) -> Result<bool> {
    if requested.is_unspecified() {
        return Ok(false);
    }

    let mut coverage = RangeCoverage::new(host_ip, requested);

    for container in &node.containers {
        // Declared bindings cover stopped containers, realized bindings
        // cover ports the runtime picked dynamically.
        for binding in container.effective_bindings() {
            if coverage.record(binding)? {
                return Ok(true);
            }
        }
    }

    Ok(false)
}

/// Ports of one requested range confirmed as taken on a single node
struct RangeCoverage<'r> {
    host_ip: &'r str,
    requested: PortRange,
    taken: HashSet<u16>,
}

impl<'r> RangeCoverage<'r> {
    fn new(host_ip: &'r str, requested: PortRange) -> Self {
        Self {
            host_ip,
            requested,
            taken: HashSet::new(),
        }
    }

    /// Record an existing binding, returning true once the whole range is taken
    fn record(&mut self, binding: &PortBinding) -> Result<bool> {
        let existing = binding.host_range()?;

        // Existing ranges are only matched through their realized single ports.
        if existing.is_unspecified() || !existing.is_single() {
            return Ok(false);
        }

        if self.requested.contains(existing.start) && binding.shares_address(self.host_ip) {
            self.taken.insert(existing.start);
            if self.taken.len() >= self.requested.len() {
                return Ok(true);
            }
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portgate_core::{Container, CoreError, NetworkMode};

    fn create_test_node(name: &str, containers: Vec<Container>) -> Node {
        containers
            .into_iter()
            .fold(Node::new(format!("id-{}", name), name), Node::with_container)
    }

    fn host_container(id: &str, ports: &[u16]) -> Container {
        ports.iter().fold(
            Container::new(id, id).with_network_mode(NetworkMode::Host),
            |c, &p| c.expose(PortSpec::tcp(p)),
        )
    }

    /// Stopped container with one declared binding
    fn declared_container(id: &str, host_ip: &str, host_port: &str) -> Container {
        Container::new(id, id).bind(PortSpec::tcp(80), PortBinding::new(host_ip, host_port))
    }

    /// Running container whose host port was chosen by the runtime
    fn realized_container(id: &str, host_ip: &str, host_port: &str) -> Container {
        Container::new(id, id)
            .bind(PortSpec::tcp(80), PortBinding::new(host_ip, ""))
            .realize(PortSpec::tcp(80), PortBinding::new(host_ip, host_port))
    }

    fn host_request(ports: &[u16]) -> ContainerConfig {
        ports.iter().fold(
            ContainerConfig::new("test").with_network_mode(NetworkMode::Host),
            |c, &p| c.expose(PortSpec::tcp(p)),
        )
    }

    fn bridge_request(host_ip: &str, host_port: &str) -> ContainerConfig {
        ContainerConfig::new("test").bind(PortSpec::tcp(80), PortBinding::new(host_ip, host_port))
    }

    fn run(config: &ContainerConfig, nodes: &[Node]) -> Result<Vec<String>> {
        let candidates: Vec<&Node> = nodes.iter().collect();
        let eligible = PortFilter.filter(config, &candidates)?;
        Ok(eligible.into_iter().map(|n| n.name.clone()).collect())
    }

    #[test]
    fn test_filter_name() {
        assert_eq!(PortFilter.name(), "port");
    }

    #[test]
    fn test_host_mode_collision() {
        let nodes = vec![
            create_test_node("node1", vec![host_container("web", &[80])]),
            create_test_node("node2", vec![]),
        ];

        assert_eq!(run(&host_request(&[80]), &nodes).unwrap(), vec!["node2"]);
        assert_eq!(
            run(&host_request(&[81]), &nodes).unwrap(),
            vec!["node1", "node2"]
        );
    }

    #[test]
    fn test_host_mode_no_eligible_node() {
        let nodes = vec![
            create_test_node("node1", vec![host_container("web", &[80])]),
            create_test_node("node2", vec![host_container("proxy", &[80, 443])]),
        ];

        let err = run(&host_request(&[80]), &nodes).unwrap_err();
        assert!(matches!(err, SchedulerError::HostPortUnavailable { .. }));
        assert_eq!(
            err.to_string(),
            "unable to find a node with port 80/tcp available in the Host mode"
        );
    }

    #[test]
    fn test_host_mode_narrows_per_port() {
        let nodes = vec![
            create_test_node("node1", vec![host_container("a", &[80])]),
            create_test_node("node2", vec![host_container("b", &[443])]),
            create_test_node("node3", vec![]),
        ];

        assert_eq!(run(&host_request(&[80, 443]), &nodes).unwrap(), vec!["node3"]);
    }

    #[test]
    fn test_host_mode_ignores_bridge_containers() {
        let bridged = Container::new("web", "web")
            .expose(PortSpec::tcp(80))
            .bind(PortSpec::tcp(80), PortBinding::all_interfaces("80"));
        let nodes = vec![create_test_node("node1", vec![bridged])];

        assert_eq!(run(&host_request(&[80]), &nodes).unwrap(), vec!["node1"]);
    }

    #[test]
    fn test_host_mode_matches_protocol() {
        let dns = Container::new("dns", "dns")
            .with_network_mode(NetworkMode::Host)
            .expose(PortSpec::udp(53));
        let nodes = vec![create_test_node("node1", vec![dns])];

        let tcp = ContainerConfig::new("test")
            .with_network_mode(NetworkMode::Host)
            .expose(PortSpec::tcp(53));
        assert_eq!(run(&tcp, &nodes).unwrap(), vec!["node1"]);

        let udp = ContainerConfig::new("test")
            .with_network_mode(NetworkMode::Host)
            .expose(PortSpec::udp(53));
        assert!(run(&udp, &nodes).is_err());
    }

    #[test]
    fn test_host_mode_normalizes_exposed_port_keys() {
        let json = r#"{"id": "web", "networkMode": "host", "exposedPorts": ["80"]}"#;
        let web: Container = serde_json::from_str(json).unwrap();
        let nodes = vec![create_test_node("node1", vec![web])];

        assert!(run(&host_request(&[80]), &nodes).is_err());
    }

    #[test]
    fn test_host_mode_ignores_requested_bindings() {
        let config = host_request(&[80]).bind(PortSpec::tcp(80), PortBinding::new("", "abc"));
        let nodes = vec![create_test_node("node1", vec![])];

        assert_eq!(run(&config, &nodes).unwrap(), vec!["node1"]);
    }

    #[test]
    fn test_bridge_mode_exact_overlap() {
        let nodes = vec![
            create_test_node("node1", vec![declared_container("web", "0.0.0.0", "8080")]),
            create_test_node("node2", vec![]),
        ];

        assert_eq!(
            run(&bridge_request("0.0.0.0", "8080-8080"), &nodes).unwrap(),
            vec!["node2"]
        );
        assert_eq!(
            run(&bridge_request("0.0.0.0", "8081-8081"), &nodes).unwrap(),
            vec!["node1", "node2"]
        );
    }

    #[test]
    fn test_bridge_mode_no_eligible_node() {
        let nodes = vec![create_test_node(
            "node1",
            vec![declared_container("web", "0.0.0.0", "8080")],
        )];

        let err = run(&bridge_request("", "8080"), &nodes).unwrap_err();
        assert!(matches!(err, SchedulerError::PortUnavailable { .. }));
        assert_eq!(err.to_string(), "unable to find a node with port 8080 available");
    }

    #[test]
    fn test_wildcard_address_overlap() {
        let nodes = vec![create_test_node(
            "node1",
            vec![declared_container("web", "0.0.0.0", "9000")],
        )];

        assert!(run(&bridge_request("192.168.1.5", "9000"), &nodes).is_err());
        assert_eq!(
            run(&bridge_request("192.168.1.5", "9001"), &nodes).unwrap(),
            vec!["node1"]
        );
        assert_eq!(
            run(&bridge_request("", "9001"), &nodes).unwrap(),
            vec!["node1"]
        );
    }

    #[test]
    fn test_distinct_addresses_do_not_overlap() {
        let nodes = vec![create_test_node(
            "node1",
            vec![declared_container("web", "10.0.0.1", "9000")],
        )];

        assert_eq!(
            run(&bridge_request("10.0.0.2", "9000"), &nodes).unwrap(),
            vec!["node1"]
        );
        assert!(run(&bridge_request("10.0.0.1", "9000"), &nodes).is_err());
        assert!(run(&bridge_request("", "9000"), &nodes).is_err());
        assert!(run(&bridge_request("0.0.0.0", "9000"), &nodes).is_err());
    }

    #[test]
    fn test_range_blocked_only_when_fully_covered() {
        let nodes = vec![create_test_node(
            "node1",
            vec![
                declared_container("a", "10.0.0.1", "7000"),
                declared_container("b", "10.0.0.1", "7001"),
            ],
        )];

        assert!(run(&bridge_request("10.0.0.1", "7000-7001"), &nodes).is_err());
        assert_eq!(
            run(&bridge_request("10.0.0.1", "7000-7002"), &nodes).unwrap(),
            vec!["node1"]
        );
    }

    #[test]
    fn test_range_coverage_counts_distinct_ports() {
        // 7000 is both declared and realized; it must only count once
        let web = Container::new("web", "web")
            .bind(PortSpec::tcp(80), PortBinding::all_interfaces("7000"))
            .realize(PortSpec::tcp(80), PortBinding::all_interfaces("7000"));
        let nodes = vec![create_test_node("node1", vec![web])];

        assert_eq!(
            run(&bridge_request("", "7000-7001"), &nodes).unwrap(),
            vec!["node1"]
        );
    }

    #[test]
    fn test_dynamic_port_pass_through() {
        let nodes = vec![
            create_test_node("node1", vec![declared_container("a", "", "8080")]),
            create_test_node("node2", vec![realized_container("b", "0.0.0.0", "32768")]),
        ];

        assert_eq!(
            run(&bridge_request("", ""), &nodes).unwrap(),
            vec!["node1", "node2"]
        );
        assert_eq!(
            run(&bridge_request("0.0.0.0", "0"), &nodes).unwrap(),
            vec!["node1", "node2"]
        );
    }

    #[test]
    fn test_existing_ranges_are_skipped() {
        let ranged = Container::new("ranged", "ranged")
            .bind(PortSpec::tcp(80), PortBinding::all_interfaces("7000-7010"));
        let nodes = vec![create_test_node("node1", vec![ranged.clone()])];

        assert_eq!(
            run(&bridge_request("", "7005"), &nodes).unwrap(),
            vec!["node1"]
        );

        let running = ranged.realize(PortSpec::tcp(80), PortBinding::all_interfaces("7005"));
        let nodes = vec![create_test_node("node1", vec![running])];
        assert!(run(&bridge_request("", "7005"), &nodes).is_err());
    }

    #[test]
    fn test_declared_and_realized_bindings_both_block() {
        let nodes = vec![
            create_test_node("stopped", vec![declared_container("db", "", "6000")]),
            create_test_node("running", vec![realized_container("api", "", "6001")]),
            create_test_node("empty", vec![]),
        ];

        assert_eq!(
            run(&bridge_request("", "6000"), &nodes).unwrap(),
            vec!["running", "empty"]
        );
        assert_eq!(
            run(&bridge_request("", "6001"), &nodes).unwrap(),
            vec!["stopped", "empty"]
        );
    }

    #[test]
    fn test_bridge_mode_checks_every_network_mode() {
        let custom = declared_container("web", "", "8080")
            .with_network_mode(NetworkMode::Custom("backend".to_string()));
        let nodes = vec![create_test_node("node1", vec![custom])];

        let config = bridge_request("", "8080")
            .with_network_mode(NetworkMode::Custom("frontend".to_string()));
        assert!(run(&config, &nodes).is_err());
    }

    #[test]
    fn test_malformed_requested_port() {
        let nodes = vec![create_test_node("node1", vec![])];

        let err = run(&bridge_request("", "abc"), &nodes).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Core(CoreError::InvalidPortRange { .. })
        ));
    }

    #[test]
    fn test_malformed_existing_port() {
        let nodes = vec![create_test_node(
            "node1",
            vec![declared_container("web", "", "80-abc")],
        )];

        let err = run(&bridge_request("", "8080"), &nodes).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Core(CoreError::InvalidPortRange { .. })
        ));
    }

    #[test]
    fn test_fail_fast_on_first_unsatisfiable_binding() {
        let nodes = vec![create_test_node(
            "node1",
            vec![declared_container("web", "", "8080")],
        )];

        // 80/tcp sorts before 443/tcp, so the malformed binding is never parsed
        let config = ContainerConfig::new("test")
            .bind(PortSpec::tcp(80), PortBinding::new("", "8080"))
            .bind(PortSpec::tcp(443), PortBinding::new("", "abc"));

        let err = run(&config, &nodes).unwrap_err();
        assert!(matches!(err, SchedulerError::PortUnavailable { ref port } if port == "8080"));
    }

    #[test]
    fn test_narrowing_is_monotonic_and_idempotent() {
        let nodes = vec![
            create_test_node("node1", vec![declared_container("a", "", "8080")]),
            create_test_node("node2", vec![realized_container("b", "", "8443")]),
            create_test_node("node3", vec![declared_container("c", "10.0.0.9", "8080")]),
            create_test_node("node4", vec![]),
        ];
        let config = ContainerConfig::new("test")
            .bind(PortSpec::tcp(80), PortBinding::new("10.0.0.1", "8080"))
            .bind(PortSpec::tcp(443), PortBinding::new("", "8443"));

        let first = run(&config, &nodes).unwrap();
        let second = run(&config, &nodes).unwrap();
        assert_eq!(first, vec!["node3", "node4"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_requirements_returns_candidates() {
        let nodes = vec![
            create_test_node("node1", vec![host_container("web", &[80])]),
            create_test_node("node2", vec![declared_container("db", "", "5432")]),
        ];

        assert_eq!(
            run(&ContainerConfig::new("test"), &nodes).unwrap(),
            vec!["node1", "node2"]
        );
        assert_eq!(run(&host_request(&[]), &nodes).unwrap(), vec!["node1", "node2"]);
    }

    #[test]
    fn test_bindings_under_equivalent_port_keys_all_block() {
        let json = r#"{
            "id": "n-1",
            "name": "node1",
            "containers": [{
                "id": "web",
                "portBindings": {
                    "80": [{"hostPort": "8080"}],
                    "80/tcp": [{"hostPort": "9090"}]
                }
            }]
        }"#;
        let nodes = vec![serde_json::from_str::<Node>(json).unwrap()];

        assert!(run(&bridge_request("", "8080"), &nodes).is_err());
        assert!(run(&bridge_request("", "9090"), &nodes).is_err());
        assert_eq!(run(&bridge_request("", "8081"), &nodes).unwrap(), vec!["node1"]);
    }

    #[test]
    fn test_empty_candidate_list() {
        let err = run(&bridge_request("", "8080"), &[]).unwrap_err();
        assert!(matches!(err, SchedulerError::PortUnavailable { .. }));
    }
}
