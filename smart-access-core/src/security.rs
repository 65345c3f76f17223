//! Firewall rule sets guarding resources inside the network.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::cidr::{Ipv4Cidr, ANY_IPV4};
use crate::error::CoreError;
use crate::id::LogicalId;

/// Transport protocol matched by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Protocol {
    Tcp,
    /// Every protocol and port.
    All,
}

impl Protocol {
    /// Provider protocol code (`tcp`, or `-1` for all traffic).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::All => "-1",
        }
    }
}

/// Inclusive port range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub struct PortRange {
    pub from: u16,
    pub to: u16,
}

impl PortRange {
    #[must_use]
    pub const fn single(port: u16) -> Self {
        Self { from: port, to: port }
    }

    #[must_use]
    pub fn contains(self, port: u16) -> bool {
        (self.from..=self.to).contains(&port)
    }
}

/// Traffic source of an ingress rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Peer {
    AnyIpv4,
    Cidr(Ipv4Cidr),
}

impl Peer {
    #[must_use]
    pub fn cidr(self) -> Ipv4Cidr {
        match self {
            Self::AnyIpv4 => ANY_IPV4,
            Self::Cidr(cidr) => cidr,
        }
    }
}

/// Permits inbound traffic from `peer` on `ports`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct IngressRule {
    pub peer: Peer,
    pub protocol: Protocol,
    pub ports: PortRange,
    pub description: String,
}

impl IngressRule {
    /// Allows TCP on a single port from `peer`.
    pub fn tcp(peer: Peer, port: u16, description: impl Into<String>) -> Self {
        Self {
            peer,
            protocol: Protocol::Tcp,
            ports: PortRange::single(port),
            description: description.into(),
        }
    }

    fn matches(&self, protocol: Protocol, port: u16, source: Ipv4Addr) -> bool {
        let protocol_ok = self.protocol == Protocol::All || self.protocol == protocol;
        let port_ok = self.protocol == Protocol::All || self.ports.contains(port);
        protocol_ok && port_ok && self.peer.cidr().contains(source)
    }
}

/// Named inbound/outbound traffic policy attached to one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct FirewallRuleSet {
    pub id: LogicalId,
    pub network: LogicalId,
    pub description: String,
    pub allow_all_outbound: bool,
    pub ingress: Vec<IngressRule>,
}

impl FirewallRuleSet {
    /// Creates an empty rule set in `network`.
    pub fn new(
        id: LogicalId,
        network: LogicalId,
        description: impl Into<String>,
        allow_all_outbound: bool,
    ) -> Self {
        Self {
            id,
            network,
            description: description.into(),
            allow_all_outbound,
            ingress: Vec::new(),
        }
    }

    /// Adds an ingress rule.
    ///
    /// # Errors
    /// Returns [`CoreError::Validation`] for an inverted port range or a
    /// rule without description.
    pub fn add_ingress_rule(&mut self, rule: IngressRule) -> Result<(), CoreError> {
        if rule.ports.from > rule.ports.to {
            return Err(CoreError::validation(
                self.id.as_str(),
                "ingress.ports",
                format!("inverted range {}-{}", rule.ports.from, rule.ports.to),
            ));
        }
        if rule.description.trim().is_empty() {
            return Err(CoreError::validation(
                self.id.as_str(),
                "ingress.description",
                "must not be empty",
            ));
        }
        self.ingress.push(rule);
        Ok(())
    }

    /// Returns `true` if any ingress rule admits the given traffic.
    #[must_use]
    pub fn permits_ingress(&self, protocol: Protocol, port: u16, source: Ipv4Addr) -> bool {
        self.ingress.iter().any(|rule| rule.matches(protocol, port, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn postgres_rule_set() -> FirewallRuleSet {
        let (id, network) = match (LogicalId::new("MySecurityGroup"), LogicalId::new("MyVPC")) {
            (Ok(a), Ok(b)) => (a, b),
            _ => panic!("test ids must be valid"),
        };
        let mut set = FirewallRuleSet::new(id, network, "db access", true);
        if let Err(e) = set.add_ingress_rule(IngressRule::tcp(Peer::AnyIpv4, 5432, "allow postgresql traffic")) {
            panic!("unexpected error: {e}");
        }
        set
    }

    #[test]
    fn permits_only_the_database_port() {
        let set = postgres_rule_set();
        let anywhere = Ipv4Addr::new(198, 51, 100, 23);
        assert!(set.permits_ingress(Protocol::Tcp, 5432, anywhere));
        assert!(!set.permits_ingress(Protocol::Tcp, 22, anywhere));
        assert!(!set.permits_ingress(Protocol::Tcp, 5433, anywhere));
        assert!(!set.permits_ingress(Protocol::All, 0, anywhere), "no all-traffic rule exists");
    }

    #[test]
    fn cidr_peer_limits_sources() {
        let mut set = postgres_rule_set();
        set.ingress.clear();
        let office: Ipv4Cidr = match "192.0.2.0/24".parse() {
            Ok(c) => c,
            Err(e) => panic!("bad cidr: {e}"),
        };
        if let Err(e) = set.add_ingress_rule(IngressRule::tcp(Peer::Cidr(office), 5432, "office")) {
            panic!("unexpected error: {e}");
        }
        assert!(set.permits_ingress(Protocol::Tcp, 5432, Ipv4Addr::new(192, 0, 2, 10)));
        assert!(!set.permits_ingress(Protocol::Tcp, 5432, Ipv4Addr::new(192, 0, 3, 10)));
    }

    #[test]
    fn inverted_port_range_is_rejected() {
        let mut set = postgres_rule_set();
        let rule = IngressRule {
            peer: Peer::AnyIpv4,
            protocol: Protocol::Tcp,
            ports: PortRange { from: 10, to: 5 },
            description: "broken".to_owned(),
        };
        assert!(matches!(set.add_ingress_rule(rule), Err(CoreError::Validation { .. })));
    }
}
