use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::IpNet;

/// Lists the host addresses of `subnet` in ascending order, at most `max_addresses` of them.
///
/// The network address is always left out. The broadcast address is left out as well
/// when the whole subnet fits under the cap; otherwise the walk stops before reaching it.
/// A single-address subnet yields that address.
pub fn enumerate(subnet: &IpNet, max_addresses: usize) -> Vec<IpAddr> {
    let network = subnet.network();
    let base = to_u128(network);
    let span = to_u128(subnet.broadcast()) - base;

    if span == 0 {
        return vec![network];
    }

    let cap = max_addresses as u128;
    let (first, last) = if span <= cap {
        (base + 1, base + span - 1)
    } else {
        (base + 1, base + cap)
    };

    (first..=last).map(|n| from_u128(n, &network)).collect()
}

/// Orders `candidates` outward from `local`: the address right after it, the one right
/// before it, two after, two before, and so on.
///
/// `local` itself is left out. When it is not among the candidates they are returned in
/// their original order.
pub fn radial_order(candidates: &[IpAddr], local: &IpAddr) -> Vec<IpAddr> {
    let Some(center) = candidates.iter().position(|addr| addr == local) else {
        return candidates.to_vec();
    };

    let mut ordered = Vec::with_capacity(candidates.len().saturating_sub(1));
    for distance in 1..candidates.len() {
        let after = center + distance;
        let before = center.checked_sub(distance);
        if after >= candidates.len() && before.is_none() {
            break;
        }
        if let Some(addr) = candidates.get(after) {
            ordered.push(*addr);
        }
        if let Some(index) = before {
            ordered.push(candidates[index]);
        }
    }
    ordered
}

fn to_u128(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u32::from(v4) as u128,
        IpAddr::V6(v6) => u128::from(v6),
    }
}

// `n` always stays inside the subnet of `like`, so the V4 narrowing cannot truncate
fn from_u128(n: u128, like: &IpAddr) -> IpAddr {
    match like {
        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::from(n as u32)),
        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::from(n)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn net(cidr: &str) -> IpNet {
        cidr.parse().unwrap()
    }

    fn v4(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(a, b, c, d))
    }

    #[test]
    fn test_full_subnet_drops_network_and_broadcast() {
        let hosts = enumerate(&net("192.168.1.10/24"), 1000);
        assert_eq!(hosts.len(), 254);
        assert_eq!(hosts[0], v4(192, 168, 1, 1));
        assert_eq!(hosts[253], v4(192, 168, 1, 254));
        assert!(hosts.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_capped_subnet_never_reaches_broadcast() {
        let hosts = enumerate(&net("10.1.2.3/16"), 1000);
        assert_eq!(hosts.len(), 1000);
        assert_eq!(hosts[0], v4(10, 1, 0, 1));
        assert_eq!(hosts[999], v4(10, 1, 3, 232));
        assert!(!hosts.contains(&v4(10, 1, 255, 255)));
    }

    #[test]
    fn test_cap_one_short_of_subnet_still_skips_broadcast() {
        // 1024 addresses in a /22: 1022 hosts once both ends are stripped
        let hosts = enumerate(&net("172.16.4.0/22"), 1023);
        assert_eq!(hosts.len(), 1022);
        assert_eq!(*hosts.last().unwrap(), v4(172, 16, 7, 254));

        let hosts = enumerate(&net("172.16.4.0/22"), 1022);
        assert_eq!(hosts.len(), 1022);
        assert_eq!(*hosts.last().unwrap(), v4(172, 16, 7, 254));
    }

    #[test]
    fn test_tiny_subnets() {
        assert_eq!(enumerate(&net("192.168.0.7/32"), 1000), vec![v4(192, 168, 0, 7)]);
        assert!(enumerate(&net("192.168.0.6/31"), 1000).is_empty());
        assert_eq!(
            enumerate(&net("192.168.0.5/30"), 1000),
            vec![v4(192, 168, 0, 5), v4(192, 168, 0, 6)]
        );
    }

    #[test]
    fn test_ipv6_walk_carries_across_bytes() {
        let hosts = enumerate(&net("fe80::1/64"), 300);
        assert_eq!(hosts.len(), 300);
        assert_eq!(hosts[0], "fe80::1".parse::<IpAddr>().unwrap());
        assert_eq!(hosts[255], "fe80::100".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_radial_order_alternates_after_then_before() {
        let candidates: Vec<IpAddr> = (1..=9).map(|d| v4(10, 0, 0, d)).collect();
        let ordered = radial_order(&candidates, &v4(10, 0, 0, 4));
        let last_octets: Vec<u8> = ordered
            .iter()
            .map(|addr| match addr {
                IpAddr::V4(v4) => v4.octets()[3],
                IpAddr::V6(_) => unreachable!(),
            })
            .collect();
        assert_eq!(last_octets, vec![5, 3, 6, 2, 7, 1, 8, 9]);
    }

    #[test]
    fn test_radial_order_covers_every_candidate_once() {
        let candidates = enumerate(&net("192.168.1.10/24"), 1000);
        for local in [v4(192, 168, 1, 1), v4(192, 168, 1, 10), v4(192, 168, 1, 254)] {
            let ordered = radial_order(&candidates, &local);
            assert_eq!(ordered.len(), candidates.len() - 1);
            let unique: HashSet<_> = ordered.iter().collect();
            assert_eq!(unique.len(), ordered.len());
            assert!(!unique.contains(&local));
        }
    }

    #[test]
    fn test_radial_order_from_last_walks_backwards() {
        let candidates: Vec<IpAddr> = (1..=4).map(|d| v4(10, 0, 0, d)).collect();
        let ordered = radial_order(&candidates, &v4(10, 0, 0, 4));
        assert_eq!(ordered, vec![v4(10, 0, 0, 3), v4(10, 0, 0, 2), v4(10, 0, 0, 1)]);
    }

    #[test]
    fn test_radial_order_without_local_keeps_ascending() {
        let candidates: Vec<IpAddr> = (1..=4).map(|d| v4(10, 0, 0, d)).collect();
        assert_eq!(radial_order(&candidates, &v4(10, 0, 9, 9)), candidates);
        assert!(radial_order(&[], &v4(10, 0, 0, 1)).is_empty());
    }
}
