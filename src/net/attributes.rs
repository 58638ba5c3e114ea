//! Per-request classification attributes.
//!
//! Attributes are orthogonal flags combined with bitwise OR from independent
//! classifiers (network origin, transport, HTTP verb). They are computed once
//! per request, never persisted, and never shared across requests.

use std::net::IpAddr;

use axum::http::Method;
use bitflags::bitflags;

use crate::net::identity::{NetworkAddressTable, NetworkOrigin};

bitflags! {
    /// Security-relevant classification of a single request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RequestAttributes: u32 {
        const LOOPBACK      = 1 << 0;
        const LOCAL_NETWORK = 1 << 1;
        const EXTERNAL      = 1 << 2;

        const SECURE        = 1 << 3;
        const INSECURE      = 1 << 4;

        const HTTP_GET      = 1 << 5;
        const HTTP_POST     = 1 << 6;
        const HTTP_PUT      = 1 << 7;
        const HTTP_DELETE   = 1 << 8;
        const HTTP_PATCH    = 1 << 9;
        const HTTP_HEAD     = 1 << 10;
        const HTTP_OPTIONS  = 1 << 11;
        const HTTP_OTHER    = 1 << 12;
    }
}

impl RequestAttributes {
    /// All network-origin flags, for masking out the other categories.
    pub const ANY_NETWORK: RequestAttributes = RequestAttributes::LOOPBACK
        .union(RequestAttributes::LOCAL_NETWORK)
        .union(RequestAttributes::EXTERNAL);

    /// The network-origin portion of this attribute set.
    pub fn network(self) -> RequestAttributes {
        self & Self::ANY_NETWORK
    }
}

impl From<NetworkOrigin> for RequestAttributes {
    fn from(origin: NetworkOrigin) -> Self {
        match origin {
            NetworkOrigin::Loopback => RequestAttributes::LOOPBACK,
            NetworkOrigin::LocalNetwork => RequestAttributes::LOCAL_NETWORK,
            NetworkOrigin::External => RequestAttributes::EXTERNAL,
        }
    }
}

/// Compute the attribute set for one request.
///
/// A missing remote address classifies as external.
pub fn compute_request_attributes(
    remote: Option<IpAddr>,
    method: &Method,
    secure: bool,
    table: &NetworkAddressTable,
) -> RequestAttributes {
    let origin = match remote {
        Some(addr) => RequestAttributes::from(table.classify(&addr)),
        None => RequestAttributes::EXTERNAL,
    };

    let transport = if secure {
        RequestAttributes::SECURE
    } else {
        RequestAttributes::INSECURE
    };

    let verb = if *method == Method::GET {
        RequestAttributes::HTTP_GET
    } else if *method == Method::POST {
        RequestAttributes::HTTP_POST
    } else if *method == Method::PUT {
        RequestAttributes::HTTP_PUT
    } else if *method == Method::DELETE {
        RequestAttributes::HTTP_DELETE
    } else if *method == Method::PATCH {
        RequestAttributes::HTTP_PATCH
    } else if *method == Method::HEAD {
        RequestAttributes::HTTP_HEAD
    } else if *method == Method::OPTIONS {
        RequestAttributes::HTTP_OPTIONS
    } else {
        RequestAttributes::HTTP_OTHER
    };

    origin | transport | verb
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn combines_orthogonal_flags() {
        let table = NetworkAddressTable::empty();
        let attrs = compute_request_attributes(
            Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            &Method::POST,
            false,
            &table,
        );
        assert!(attrs.contains(RequestAttributes::LOOPBACK));
        assert!(attrs.contains(RequestAttributes::INSECURE));
        assert!(attrs.contains(RequestAttributes::HTTP_POST));
        assert!(!attrs.contains(RequestAttributes::EXTERNAL));
    }

    #[test]
    fn missing_remote_is_external() {
        let table = NetworkAddressTable::empty();
        let attrs = compute_request_attributes(None, &Method::GET, true, &table);
        assert_eq!(attrs.network(), RequestAttributes::EXTERNAL);
        assert!(attrs.contains(RequestAttributes::SECURE));
        assert!(attrs.contains(RequestAttributes::HTTP_GET));
    }

    #[test]
    fn unusual_verb_maps_to_other() {
        let table = NetworkAddressTable::empty();
        let method = Method::from_bytes(b"PROPFIND").unwrap();
        let attrs = compute_request_attributes(None, &method, false, &table);
        assert!(attrs.contains(RequestAttributes::HTTP_OTHER));
    }
}
