use std::{
    io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use log::{debug, warn};
use pnet::datalink;

use crate::network::Network;

/// Private and link-local prefixes a local address must fall into to be scanned around.
const LINK_LOCAL_NETS: [IpNet; 6] = [
    IpNet::V4(Ipv4Net::new_assert(Ipv4Addr::new(10, 0, 0, 0), 8)),
    IpNet::V4(Ipv4Net::new_assert(Ipv4Addr::new(172, 16, 0, 0), 12)),
    IpNet::V4(Ipv4Net::new_assert(Ipv4Addr::new(192, 168, 0, 0), 16)),
    IpNet::V4(Ipv4Net::new_assert(Ipv4Addr::new(169, 254, 0, 0), 16)),
    IpNet::V6(Ipv6Net::new_assert(Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7)),
    IpNet::V6(Ipv6Net::new_assert(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 64)),
];

/// Source of the addresses configured on the local network interfaces.
///
/// Addresses are reported in CIDR notation (`192.168.1.10/24`), so the prefix length
/// survives up to the point where the subnet gets enumerated.
pub trait InterfaceSource: Send + Sync + 'static {
    fn interface_addresses(&self) -> io::Result<Vec<String>>;
}

/// Reads the interfaces of the running machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn interface_addresses(&self) -> io::Result<Vec<String>> {
        Ok(datalink::interfaces()
            .into_iter()
            .flat_map(|iface| iface.ips.into_iter().map(|net| net.to_string()))
            .collect())
    }
}

pub fn is_link_local(addr: &IpAddr) -> bool {
    !addr.is_loopback() && LINK_LOCAL_NETS.iter().any(|net| net.contains(addr))
}

/// Returns the private and link-local addresses of the machine usable with `network`.
///
/// A failing source counts as a machine without such addresses, and entries that do not
/// parse as CIDR are skipped.
pub fn link_local_addresses<S: InterfaceSource + ?Sized>(
    source: &S,
    network: Network,
) -> Vec<IpNet> {
    let addresses = match source.interface_addresses() {
        Ok(addresses) => addresses,
        Err(err) => {
            warn!("failed to list network interfaces, reason: {}", err);
            return Vec::new();
        }
    };

    addresses
        .iter()
        .filter_map(|cidr| match cidr.parse::<IpNet>() {
            Ok(net) => Some(net),
            Err(err) => {
                debug!("skipping interface address {}, reason: {}", cidr, err);
                None
            }
        })
        .filter(|net| network.accepts(&net.addr()) && is_link_local(&net.addr()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedInterfaces(&'static [&'static str]);

    impl InterfaceSource for FixedInterfaces {
        fn interface_addresses(&self) -> io::Result<Vec<String>> {
            Ok(self.0.iter().map(|cidr| cidr.to_string()).collect())
        }
    }

    struct BrokenInterfaces;

    impl InterfaceSource for BrokenInterfaces {
        fn interface_addresses(&self) -> io::Result<Vec<String>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "no netlink"))
        }
    }

    fn nets(cidrs: &[&str]) -> Vec<IpNet> {
        cidrs.iter().map(|cidr| cidr.parse().unwrap()).collect()
    }

    const MACHINE: &[&str] = &[
        "127.0.0.1/8",
        "::1/128",
        "192.168.1.10/24",
        "8.8.4.4/24",
        "fe80::1c2a:3bff:fe4d:5e6f/64",
        "2001:db8::5/64",
        "10.20.30.40/16",
        "not-an-address",
        "192.168.2.1/33",
    ];

    #[test]
    fn test_v4_scan_keeps_private_v4_only() {
        assert_eq!(
            link_local_addresses(&FixedInterfaces(MACHINE), Network::Tcp4),
            nets(&["192.168.1.10/24", "10.20.30.40/16"])
        );
    }

    #[test]
    fn test_unsuffixed_and_v6_scans_keep_both_families() {
        let expected = nets(&[
            "192.168.1.10/24",
            "fe80::1c2a:3bff:fe4d:5e6f/64",
            "10.20.30.40/16",
        ]);
        assert_eq!(link_local_addresses(&FixedInterfaces(MACHINE), Network::Tcp), expected);
        assert_eq!(link_local_addresses(&FixedInterfaces(MACHINE), Network::Udp6), expected);
    }

    #[test]
    fn test_link_local_prefixes() {
        for addr in ["10.255.0.1", "172.31.255.254", "169.254.3.3", "fd12::1", "fe80::9"] {
            assert!(is_link_local(&addr.parse().unwrap()), "{}", addr);
        }
        for addr in ["172.32.0.1", "127.0.0.1", "::1", "fe80:0:0:1::9", "1.1.1.1"] {
            assert!(!is_link_local(&addr.parse().unwrap()), "{}", addr);
        }
    }

    #[test]
    fn test_source_failure_means_no_addresses() {
        assert!(link_local_addresses(&BrokenInterfaces, Network::Tcp).is_empty());
    }
}
