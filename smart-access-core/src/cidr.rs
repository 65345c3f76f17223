//! IPv4 CIDR blocks and even subnet allocation.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// An IPv4 network block such as `10.0.0.0/16`.
///
/// Host bits below the prefix are always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[non_exhaustive]
pub struct Ipv4Cidr {
    address: Ipv4Addr,
    prefix: u8,
}

/// Every IPv4 address.
pub const ANY_IPV4: Ipv4Cidr = Ipv4Cidr {
    address: Ipv4Addr::UNSPECIFIED,
    prefix: 0,
};

impl Ipv4Cidr {
    /// Creates a block from a network address and prefix length.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidCidr`] if the prefix exceeds 32 or the
    /// address has host bits set.
    pub fn new(address: Ipv4Addr, prefix: u8) -> Result<Self, CoreError> {
        if prefix > 32 {
            return Err(CoreError::InvalidCidr {
                value: format!("{address}/{prefix}"),
                reason: "prefix must be at most 32".to_owned(),
            });
        }
        if u32::from(address) & !mask(prefix) != 0 {
            return Err(CoreError::InvalidCidr {
                value: format!("{address}/{prefix}"),
                reason: "host bits must be zero".to_owned(),
            });
        }
        Ok(Self { address, prefix })
    }

    #[must_use]
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    #[must_use]
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Number of addresses in the block.
    #[must_use]
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix))
    }

    /// Returns `true` if `ip` falls inside this block.
    #[must_use]
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        u32::from(ip) & mask(self.prefix) == u32::from(self.address)
    }

    /// Splits the block into `count` equally sized consecutive sub-blocks.
    ///
    /// The slot count is rounded up to the next power of two, so six subnets
    /// of a `/16` are `/19` blocks and the last two `/19` slots stay free.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidCidr`] if `count` is zero or the block is
    /// too small to hold `count` sub-blocks.
    pub fn split(&self, count: usize) -> Result<Vec<Self>, CoreError> {
        if count == 0 {
            return Err(CoreError::InvalidCidr {
                value: self.to_string(),
                reason: "cannot split into zero blocks".to_owned(),
            });
        }
        let extra_bits = count.next_power_of_two().trailing_zeros();
        let new_prefix = u32::from(self.prefix) + extra_bits;
        if new_prefix > 32 {
            return Err(CoreError::InvalidCidr {
                value: self.to_string(),
                reason: format!("too small for {count} sub-blocks"),
            });
        }
        let step = 1u64 << (32 - new_prefix);
        let base = u64::from(u32::from(self.address));
        #[expect(clippy::cast_possible_truncation, reason = "new_prefix <= 32 checked above")]
        let prefix = new_prefix as u8;

        (0..count as u64)
            .map(|i| {
                let start = u32::try_from(base + i * step).map_err(|_| CoreError::InvalidCidr {
                    value: self.to_string(),
                    reason: "sub-block exceeds the IPv4 address space".to_owned(),
                })?;
                Self::new(Ipv4Addr::from(start), prefix)
            })
            .collect()
    }
}

fn mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CoreError::InvalidCidr {
            value: s.to_owned(),
            reason: reason.to_owned(),
        };
        let (addr, prefix) = s.split_once('/').ok_or_else(|| invalid("missing '/prefix'"))?;
        let address: Ipv4Addr = addr.parse().map_err(|_| invalid("malformed address"))?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid("malformed prefix"))?;
        Self::new(address, prefix)
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ipv4Cidr> for String {
    fn from(cidr: Ipv4Cidr) -> Self {
        cidr.to_string()
    }
}
