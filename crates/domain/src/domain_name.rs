use smallvec::SmallVec;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// A domain followed by each of its parents, most specific first.
pub type DomainHierarchy<'a> = SmallVec<[&'a str; 8]>;

const IPV4_ARPA: &str = ".in-addr.arpa";
const IPV6_ARPA: &str = ".ip6.arpa";

/// Lowercase the name and drop the trailing root dot.
pub fn normalize_domain(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Expand a domain into its hierarchy.
///
/// `a.b.example.com` becomes `[a.b.example.com, b.example.com, example.com, com]`.
/// The input is expected to be normalized already; a trailing dot is ignored.
pub fn domain_hierarchy(domain: &str) -> DomainHierarchy<'_> {
    let mut hierarchy = SmallVec::new();
    let mut rest = domain.trim_end_matches('.');

    while !rest.is_empty() {
        hierarchy.push(rest);
        match rest.find('.') {
            Some(idx) => rest = &rest[idx + 1..],
            None => break,
        }
    }

    hierarchy
}

/// The domain with its leftmost label removed, or `None` for a single label.
pub fn parent_domain(domain: &str) -> Option<&str> {
    domain
        .find('.')
        .map(|idx| &domain[idx + 1..])
        .filter(|parent| !parent.is_empty())
}

/// Cut everything from the first `#` or `//` onward.
pub fn trim_comments(line: &str) -> &str {
    let cut = [line.find('#'), line.find("//")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(line.len());
    &line[..cut]
}

/// Reverse-lookup (PTR) name for an address, without the trailing root dot.
pub fn reverse_lookup_domain(ip: &IpAddr) -> String {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            format!(
                "{}.{}.{}.{}{}",
                octets[3], octets[2], octets[1], octets[0], IPV4_ARPA
            )
        }
        IpAddr::V6(ipv6) => {
            let mut nibbles = Vec::with_capacity(32);
            for byte in ipv6.octets().iter().rev() {
                nibbles.push(format!("{:x}", byte & 0x0f));
                nibbles.push(format!("{:x}", (byte >> 4) & 0x0f));
            }
            format!("{}{}", nibbles.join("."), IPV6_ARPA)
        }
    }
}

/// Inverse of [`reverse_lookup_domain`]; accepts a trailing dot and any case.
pub fn ip_from_reverse_domain(name: &str) -> Option<IpAddr> {
    let name = normalize_domain(name);

    if let Some(prefix) = name.strip_suffix(IPV4_ARPA) {
        let mut octets = [0u8; 4];
        let parts: Vec<&str> = prefix.split('.').collect();
        if parts.len() != 4 {
            return None;
        }
        for (idx, part) in parts.iter().rev().enumerate() {
            octets[idx] = part.parse().ok()?;
        }
        return Some(IpAddr::V4(Ipv4Addr::from(octets)));
    }

    if let Some(prefix) = name.strip_suffix(IPV6_ARPA) {
        let nibbles: Vec<&str> = prefix.split('.').collect();
        if nibbles.len() != 32 {
            return None;
        }
        let mut octets = [0u8; 16];
        for (idx, pair) in nibbles.rchunks(2).enumerate() {
            // pairs come out as [low, high] starting from the first octet
            let low = u8::from_str_radix(pair[0], 16).ok()?;
            let high = u8::from_str_radix(pair[1], 16).ok()?;
            octets[idx] = (high << 4) | low;
        }
        return Some(IpAddr::V6(Ipv6Addr::from(octets)));
    }

    None
}
