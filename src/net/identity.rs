//! Cached host interface addresses for network-origin classification.
//!
//! # Responsibilities
//! - Enumerate local network interfaces once at startup
//! - Answer "is this remote address one of ours?" per request
//! - Degrade gracefully when enumeration is not permitted
//!
//! # Design Decisions
//! - Built once, immutable afterwards; shared via Arc, lock-free reads
//! - Loopback always classifies as loopback, independent of table contents
//! - An empty table classifies every non-loopback address as external

use std::collections::HashMap;
use std::net::IpAddr;

/// Network origin class of a remote address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkOrigin {
    /// The address is a loopback address.
    Loopback,
    /// The address matches a local interface exactly, by subnet, or by
    /// broadcast address.
    LocalNetwork,
    /// Anything else, including addresses we could not classify.
    External,
}

#[derive(Debug, Clone, Copy)]
struct Ipv4Entry {
    netmask: [u8; 4],
    broadcast: Option<[u8; 4]>,
}

/// Snapshot of the host's own interface addresses.
///
/// Constructed once at process start and never mutated afterwards, so it is
/// safe to share across concurrent requests without synchronization.
#[derive(Debug, Default)]
pub struct NetworkAddressTable {
    v4: HashMap<[u8; 4], Ipv4Entry>,
    v6: Vec<[u8; 16]>,
}

impl NetworkAddressTable {
    /// An empty table. Every non-loopback address classifies as external.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the table from the host's network interfaces.
    ///
    /// Enumeration failure (e.g. missing permissions) is logged as a warning
    /// and yields an empty table rather than an error: classification then
    /// conservatively reports external, but requests keep flowing.
    pub fn from_interfaces() -> Self {
        match if_addrs::get_if_addrs() {
            Ok(interfaces) => {
                let mut table = Self::empty();
                for interface in &interfaces {
                    match &interface.addr {
                        if_addrs::IfAddr::V4(v4) => {
                            table.insert_v4(
                                v4.ip.octets(),
                                v4.netmask.octets(),
                                v4.broadcast.map(|b| b.octets()),
                            );
                        }
                        if_addrs::IfAddr::V6(v6) => {
                            table.insert_v6(v6.ip.octets());
                        }
                    }
                }
                tracing::debug!(
                    v4_count = table.v4.len(),
                    v6_count = table.v6.len(),
                    "Network address table built"
                );
                table
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Failed to enumerate network interfaces; remote addresses will classify as external"
                );
                Self::empty()
            }
        }
    }

    /// Record an IPv4 interface address with its netmask and broadcast bytes.
    pub fn insert_v4(&mut self, ip: [u8; 4], netmask: [u8; 4], broadcast: Option<[u8; 4]>) {
        self.v4.insert(ip, Ipv4Entry { netmask, broadcast });
    }

    /// Record an IPv6 interface address.
    pub fn insert_v6(&mut self, ip: [u8; 16]) {
        self.v6.push(ip);
    }

    /// Number of cached addresses across both families.
    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }

    /// Classify a remote address against the cached interface addresses.
    ///
    /// Loopback wins unconditionally. IPv4 matches exactly, by shared subnet
    /// (netmask), or by broadcast address; IPv6 matches exactly. IPv4-mapped
    /// IPv6 addresses are classified as their embedded IPv4 address.
    pub fn classify(&self, addr: &IpAddr) -> NetworkOrigin {
        if addr.is_loopback() {
            return NetworkOrigin::Loopback;
        }
        match addr {
            IpAddr::V4(v4) => self.classify_v4(v4.octets()),
            IpAddr::V6(v6) => {
                if let Some(mapped) = v6.to_ipv4_mapped() {
                    if mapped.is_loopback() {
                        return NetworkOrigin::Loopback;
                    }
                    return self.classify_v4(mapped.octets());
                }
                if self.v6.contains(&v6.octets()) {
                    NetworkOrigin::LocalNetwork
                } else {
                    NetworkOrigin::External
                }
            }
        }
    }

    fn classify_v4(&self, octets: [u8; 4]) -> NetworkOrigin {
        if self.v4.contains_key(&octets) {
            return NetworkOrigin::LocalNetwork;
        }
        for (local, entry) in &self.v4 {
            if entry.broadcast == Some(octets) {
                return NetworkOrigin::LocalNetwork;
            }
            // A zero netmask would match the entire address space.
            if entry.netmask != [0, 0, 0, 0]
                && mask(octets, entry.netmask) == mask(*local, entry.netmask)
            {
                return NetworkOrigin::LocalNetwork;
            }
        }
        NetworkOrigin::External
    }
}

fn mask(addr: [u8; 4], netmask: [u8; 4]) -> [u8; 4] {
    [
        addr[0] & netmask[0],
        addr[1] & netmask[1],
        addr[2] & netmask[2],
        addr[3] & netmask[3],
    ]
}
