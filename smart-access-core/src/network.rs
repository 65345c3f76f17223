//! Isolated virtual network spanning several availability zones.

use serde::{Deserialize, Serialize};

use crate::cidr::Ipv4Cidr;
use crate::error::CoreError;
use crate::id::{LogicalId, Region};

/// Address block used when no other is configured.
pub const DEFAULT_NETWORK_CIDR: &str = "10.0.0.0/16";

/// Whether a subnet routes directly to the internet or egresses through NAT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SubnetKind {
    /// Internet-routable; hosts the NAT gateway of its zone.
    Public,
    /// Outbound-only through the NAT gateway of the same zone.
    Private,
}

impl SubnetKind {
    fn label(self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::Private => "Private",
        }
    }
}

/// One subnet of the network, pinned to a single zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Subnet {
    pub id: LogicalId,
    pub kind: SubnetKind,
    pub availability_zone: String,
    pub cidr: Ipv4Cidr,
}

/// The isolated address space every other resource is placed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Network {
    pub id: LogicalId,
    pub cidr: Ipv4Cidr,
    pub max_azs: u8,
    /// Public subnets first, then private; each group in zone order.
    pub subnets: Vec<Subnet>,
}

impl Network {
    /// Lays out one public and one private subnet per zone.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidNetwork`] if `max_azs` is zero, and
    /// [`CoreError::InvalidCidr`] if `cidr` is too small for the subnets.
    pub fn new(
        id: LogicalId,
        cidr: Ipv4Cidr,
        region: &Region,
        max_azs: u8,
    ) -> Result<Self, CoreError> {
        if max_azs == 0 {
            return Err(CoreError::InvalidNetwork {
                reason: "network must span at least one availability zone".to_owned(),
            });
        }
        let zones = region.availability_zones(max_azs)?;
        let kinds = [SubnetKind::Public, SubnetKind::Private];
        let blocks = cidr.split(zones.len() * kinds.len())?;

        let mut subnets = Vec::with_capacity(blocks.len());
        let mut blocks = blocks.into_iter();
        for kind in kinds {
            for (index, zone) in zones.iter().enumerate() {
                let Some(block) = blocks.next() else {
                    return Err(CoreError::InvalidNetwork {
                        reason: "subnet allocation ran out of blocks".to_owned(),
                    });
                };
                subnets.push(Subnet {
                    id: id.child(&format!("{}Subnet{}", kind.label(), index + 1))?,
                    kind,
                    availability_zone: zone.clone(),
                    cidr: block,
                });
            }
        }

        tracing::debug!(network = %id, %cidr, zones = zones.len(), "laid out network subnets");

        Ok(Self { id, cidr, max_azs, subnets })
    }

    /// Subnets of the given kind, in zone order.
    pub fn subnets_of(&self, kind: SubnetKind) -> impl Iterator<Item = &Subnet> {
        self.subnets.iter().filter(move |s| s.kind == kind)
    }

    /// Distinct availability zones the network spans, in order.
    #[must_use]
    pub fn availability_zones(&self) -> Vec<&str> {
        self.subnets_of(SubnetKind::Public)
            .map(|s| s.availability_zone.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vpc(max_azs: u8) -> Result<Network, CoreError> {
        let id = LogicalId::new("MyVPC")?;
        let cidr: Ipv4Cidr = DEFAULT_NETWORK_CIDR.parse()?;
        Network::new(id, cidr, &Region::default(), max_azs)
    }

    #[test]
    fn three_zones_produce_six_subnets() {
        let network = match vpc(3) {
            Ok(n) => n,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(network.subnets.len(), 6);
        assert_eq!(network.availability_zones(), vec!["us-east-1a", "us-east-1b", "us-east-1c"]);
        assert_eq!(network.subnets_of(SubnetKind::Private).count(), 3);

        let first_private = network.subnets_of(SubnetKind::Private).next();
        match first_private {
            Some(s) => {
                assert_eq!(s.id.as_str(), "MyVPCPrivateSubnet1");
                assert_eq!(s.cidr.to_string(), "10.0.96.0/19");
                assert_eq!(s.availability_zone, "us-east-1a");
            }
            None => panic!("expected a private subnet"),
        }
    }

    #[test]
    fn zero_zones_is_rejected() {
        assert!(matches!(vpc(0), Err(CoreError::InvalidNetwork { .. })));
    }

    #[test]
    fn subnets_lie_inside_the_network() {
        let network = match vpc(2) {
            Ok(n) => n,
            Err(e) => panic!("unexpected error: {e}"),
        };
        for subnet in &network.subnets {
            assert!(network.cidr.contains(subnet.cidr.address()), "{} outside vpc", subnet.cidr);
        }
    }
}
