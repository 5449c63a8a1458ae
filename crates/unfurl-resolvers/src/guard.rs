//! Host filter protecting internal addresses from being fetched.

use std::collections::HashSet;
use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Rejects URLs whose host is explicitly ignored or is a non-public IP
/// literal.
#[derive(Debug, Clone, Default)]
pub struct UrlGuard {
    ignored_hosts: HashSet<String>,
}

impl UrlGuard {
    pub fn new<I, S>(ignored_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            ignored_hosts: ignored_hosts
                .into_iter()
                .map(|host| host.as_ref().trim_end_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Whether the URL may be fetched.
    pub fn allows(&self, url: &Url) -> bool {
        match url.host() {
            Some(Host::Domain(domain)) => {
                let domain = domain.trim_end_matches('.').to_ascii_lowercase();
                !self.ignored_hosts.contains(&domain)
            }
            Some(Host::Ipv4(ip)) => is_public_v4(ip),
            Some(Host::Ipv6(ip)) => is_public_v6(ip),
            None => false,
        }
    }
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    let shared = a == 100 && (64..128).contains(&b);
    !(ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || shared)
}

fn is_public_v6(ip: Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_public_v4(mapped);
    }
    let first = ip.segments()[0];
    let unique_local = (first & 0xfe00) == 0xfc00;
    let link_local = (first & 0xffc0) == 0xfe80;
    !(ip.is_loopback() || ip.is_unspecified() || unique_local || link_local)
}
