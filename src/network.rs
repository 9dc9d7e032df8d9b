use std::{fmt, net::IpAddr, str::FromStr};

use crate::error::Error;

pub(crate) const VALID_NETWORKS: [&str; 12] = [
    "tcp",
    "tcp4",
    "tcp6",
    "udp",
    "udp4",
    "udp6",
    "ip",
    "ip4",
    "ip6",
    "unix",
    "unixgram",
    "unixpacket",
];

/// Network kind a scan probes with, named the way socket APIs usually spell it
/// (`tcp4`, `udp6`, `unixgram`, ...).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Network {
    Tcp,
    Tcp4,
    Tcp6,
    Udp,
    Udp4,
    Udp6,
    Ip,
    Ip4,
    Ip6,
    Unix,
    UnixGram,
    UnixPacket,
}

/// Socket type used to open a probe connection.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Transport {
    Tcp,
    Udp,
    Ip,
    Unix,
    UnixGram,
    UnixPacket,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Tcp => "tcp",
            Network::Tcp4 => "tcp4",
            Network::Tcp6 => "tcp6",
            Network::Udp => "udp",
            Network::Udp4 => "udp4",
            Network::Udp6 => "udp6",
            Network::Ip => "ip",
            Network::Ip4 => "ip4",
            Network::Ip6 => "ip6",
            Network::Unix => "unix",
            Network::UnixGram => "unixgram",
            Network::UnixPacket => "unixpacket",
        }
    }

    pub fn transport(&self) -> Transport {
        match self {
            Network::Tcp | Network::Tcp4 | Network::Tcp6 => Transport::Tcp,
            Network::Udp | Network::Udp4 | Network::Udp6 => Transport::Udp,
            Network::Ip | Network::Ip4 | Network::Ip6 => Transport::Ip,
            Network::Unix => Transport::Unix,
            Network::UnixGram => Transport::UnixGram,
            Network::UnixPacket => Transport::UnixPacket,
        }
    }

    /// Whether a local address of this family is worth scanning around.
    ///
    /// `4` networks need a 4-byte form of the address (plain IPv4 or IPv4-mapped IPv6).
    /// `6` networks need a 16-byte form, which every address has.
    pub fn accepts(&self, addr: &IpAddr) -> bool {
        match self {
            Network::Tcp4 | Network::Udp4 | Network::Ip4 => match addr {
                IpAddr::V4(_) => true,
                IpAddr::V6(v6) => v6.to_ipv4_mapped().is_some(),
            },
            _ => true,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let network = match s {
            "tcp" => Network::Tcp,
            "tcp4" => Network::Tcp4,
            "tcp6" => Network::Tcp6,
            "udp" => Network::Udp,
            "udp4" => Network::Udp4,
            "udp6" => Network::Udp6,
            "ip" => Network::Ip,
            "ip4" => Network::Ip4,
            "ip6" => Network::Ip6,
            "unix" => Network::Unix,
            "unixgram" => Network::UnixGram,
            "unixpacket" => Network::UnixPacket,
            other => return Err(Error::InvalidNetwork(other.to_string())),
        };
        Ok(network)
    }
}
