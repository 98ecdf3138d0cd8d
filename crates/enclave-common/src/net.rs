//! Outbound network rule model.
//!
//! Callers describe rules with any [`RuleSpec`] variant or the convenience
//! constructors on [`NetworkRange`], [`PortRange`] and [`IcmpControl`].
//! Every variant normalizes into one canonical [`NetOutRule`], which is the
//! only shape that goes on the wire.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EnclaveError, Result};

/// Transport protocol a rule applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// TCP traffic.
    #[default]
    Tcp,
    /// UDP traffic.
    Udp,
    /// ICMP traffic.
    Icmp,
    /// Every protocol.
    All,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
            Self::Icmp => write!(f, "icmp"),
            Self::All => write!(f, "all"),
        }
    }
}

/// Inclusive range of IP addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkRange {
    /// First address.
    pub start: IpAddr,
    /// Last address.
    pub end: IpAddr,
}

impl NetworkRange {
    /// Every IPv4 address.
    #[must_use]
    pub const fn all() -> Self {
        Self::range(
            IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpAddr::V4(Ipv4Addr::BROADCAST),
        )
    }

    /// Addresses from `start` to `end`, inclusive.
    #[must_use]
    pub const fn range(start: IpAddr, end: IpAddr) -> Self {
        Self { start, end }
    }

    /// A single address.
    #[must_use]
    pub const fn ip(ip: IpAddr) -> Self {
        Self::range(ip, ip)
    }

    /// Every address in a CIDR block such as `10.0.0.0/8`.
    ///
    /// # Errors
    ///
    /// Returns an error if the block is malformed or the prefix is too long.
    pub fn cidr(block: &str) -> Result<Self> {
        let (addr, prefix) = block
            .split_once('/')
            .ok_or_else(|| invalid(block, "missing prefix length"))?;
        let ip: IpAddr = addr
            .trim()
            .parse()
            .map_err(|_| invalid(block, "bad address"))?;
        let prefix: u32 = prefix
            .trim()
            .parse()
            .map_err(|_| invalid(block, "bad prefix length"))?;

        match ip {
            IpAddr::V4(v4) => {
                if prefix > 32 {
                    return Err(invalid(block, "prefix length exceeds 32"));
                }
                let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
                let start = u32::from(v4) & mask;
                Ok(Self::range(
                    IpAddr::V4(Ipv4Addr::from(start)),
                    IpAddr::V4(Ipv4Addr::from(start | !mask)),
                ))
            }
            IpAddr::V6(v6) => {
                if prefix > 128 {
                    return Err(invalid(block, "prefix length exceeds 128"));
                }
                let mask = u128::MAX.checked_shl(128 - prefix).unwrap_or(0);
                let start = u128::from(v6) & mask;
                Ok(Self::range(
                    IpAddr::V6(Ipv6Addr::from(start)),
                    IpAddr::V6(Ipv6Addr::from(start | !mask)),
                ))
            }
        }
    }
}

impl Default for NetworkRange {
    fn default() -> Self {
        Self::all()
    }
}

impl FromStr for NetworkRange {
    type Err = EnclaveError;

    /// Accepts `1.2.3.4`, `1.2.3.0/24`, or `1.2.3.4-1.2.3.9`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.contains('/') {
            return Self::cidr(s);
        }
        if let Some((start, end)) = s.split_once('-') {
            let start = start
                .trim()
                .parse()
                .map_err(|_| invalid(s, "bad range start"))?;
            let end = end.trim().parse().map_err(|_| invalid(s, "bad range end"))?;
            return Ok(Self::range(start, end));
        }
        s.parse()
            .map(Self::ip)
            .map_err(|_| invalid(s, "bad address"))
    }
}

impl fmt::Display for NetworkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

fn invalid(network: &str, reason: &'static str) -> EnclaveError {
    EnclaveError::InvalidNetwork {
        network: network.to_string(),
        reason,
    }
}

/// Inclusive range of ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRange {
    /// First port.
    pub start: u16,
    /// Last port.
    pub end: u16,
}

impl PortRange {
    /// A single port.
    #[must_use]
    pub const fn port(port: u16) -> Self {
        Self::range(port, port)
    }

    /// Ports from `start` to `end`, inclusive.
    #[must_use]
    pub const fn range(start: u16, end: u16) -> Self {
        Self { start, end }
    }
}

/// ICMP type and code selector. `None` matches every value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IcmpControl {
    /// ICMP type.
    pub kind: Option<u8>,
    /// ICMP code; only meaningful together with `kind`.
    pub code: Option<u8>,
}

impl IcmpControl {
    /// Every ICMP type and code.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            kind: None,
            code: None,
        }
    }

    /// One ICMP type, every code.
    #[must_use]
    pub const fn of_type(kind: u8) -> Self {
        Self {
            kind: Some(kind),
            code: None,
        }
    }

    /// One ICMP type and code.
    #[must_use]
    pub const fn with_code(kind: u8, code: u8) -> Self {
        Self {
            kind: Some(kind),
            code: Some(code),
        }
    }
}

/// Canonical outbound rule, the single internal representation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetOutRule {
    /// Protocol matched.
    pub protocol: Protocol,
    /// Destination addresses.
    pub network: NetworkRange,
    /// Destination ports; every port when unset.
    pub ports: Option<PortRange>,
    /// ICMP selector; only set for ICMP rules.
    pub icmp: Option<IcmpControl>,
    /// Log matching connections. Only honoured for TCP.
    pub log: bool,
}

/// Surface syntaxes accepted for an outbound rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSpec {
    /// Every protocol to a network.
    All {
        /// Destination addresses.
        network: NetworkRange,
        /// Log matching connections.
        log: bool,
    },
    /// TCP to a network, optionally restricted to ports.
    Tcp {
        /// Destination addresses.
        network: NetworkRange,
        /// Destination ports.
        ports: Option<PortRange>,
        /// Log matching connections.
        log: bool,
    },
    /// UDP to a network, optionally restricted to ports.
    Udp {
        /// Destination addresses.
        network: NetworkRange,
        /// Destination ports.
        ports: Option<PortRange>,
    },
    /// ICMP to a network, optionally restricted by type and code.
    Icmp {
        /// Destination addresses.
        network: NetworkRange,
        /// Type and code selector.
        icmp: IcmpControl,
    },
}

impl From<RuleSpec> for NetOutRule {
    fn from(spec: RuleSpec) -> Self {
        match spec {
            RuleSpec::All { network, log } => Self {
                protocol: Protocol::All,
                network,
                ports: None,
                icmp: None,
                log,
            },
            RuleSpec::Tcp {
                network,
                ports,
                log,
            } => Self {
                protocol: Protocol::Tcp,
                network,
                ports,
                icmp: None,
                log,
            },
            RuleSpec::Udp { network, ports } => Self {
                protocol: Protocol::Udp,
                network,
                ports,
                icmp: None,
                log: false,
            },
            RuleSpec::Icmp { network, icmp } => Self {
                protocol: Protocol::Icmp,
                network,
                ports: None,
                icmp: Some(icmp),
                log: false,
            },
        }
    }
}
