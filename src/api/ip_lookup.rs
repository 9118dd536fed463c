use std::net::IpAddr;

use crate::client::Client;
use crate::error::IntiError;
use crate::types::IpLookup;

const IP_LOOKUP_PATH: &[&str] = &["company", "v2", "iplookup"];
const IP_LOOKUP_PARAM: &str = "ipAddress";

/// Addresses that can never belong to a platform account.
pub fn is_faulty_ip(ip: &IpAddr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() || ip.is_multicast() {
        return true;
    }
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_link_local() || v4.is_broadcast(),
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            // fc00::/7 unique local, fe80::/10 link local
            (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
        }
    }
}

impl Client {
    /// Whether `ip` is linked to a researcher or company account on the platform.
    pub async fn is_known_ip(&self, ip: IpAddr) -> Result<bool, IntiError> {
        let ip = ip.to_string();
        let lookup: IpLookup = self
            .get_json(IP_LOOKUP_PATH, &[(IP_LOOKUP_PARAM, ip.as_str())], "ip lookup")
            .await?;
        Ok(lookup.exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn public_addresses_are_not_faulty() {
        assert!(!is_faulty_ip(&ip("8.8.8.8")));
        assert!(!is_faulty_ip(&ip("2001:4860:4860::8888")));
    }

    #[test]
    fn private_and_local_addresses_are_faulty() {
        for addr in [
            "10.0.0.1",
            "192.168.1.1",
            "172.16.0.5",
            "127.0.0.1",
            "169.254.1.1",
            "0.0.0.0",
            "224.0.0.1",
            "::1",
            "fe80::1",
            "fd00::1",
        ] {
            assert!(is_faulty_ip(&ip(addr)), "{addr}");
        }
    }
}
