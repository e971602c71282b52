//! Shared property-value validators used by setting verification

use std::net::IpAddr;

/// Maximum SSID length in bytes (802.11 limit)
const MAX_SSID_LEN: usize = 32;

/// Validate a MAC address in XX:XX:XX:XX:XX:XX form
pub fn validate_mac_address(mac: &str) -> Result<(), String> {
    if mac.len() != 17 {
        return Err("MAC address must be in format XX:XX:XX:XX:XX:XX".to_string());
    }

    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 {
        return Err("MAC address must have 6 octets separated by colons".to_string());
    }

    for part in parts {
        if part.len() != 2 {
            return Err("each MAC address octet must be 2 hex digits".to_string());
        }
        if !part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("invalid hex digit in MAC address: {}", part));
        }
    }

    Ok(())
}

/// Validate an IPv4 or IPv6 address string
pub fn validate_ip_address(addr: &str) -> Result<IpAddr, String> {
    addr.parse::<IpAddr>()
        .map_err(|_| format!("invalid IP address: {}", addr))
}

/// Validate a prefix length for IPv4 or IPv6
pub fn validate_prefix_len(prefix: u32, is_ipv6: bool) -> Result<(), String> {
    let max = if is_ipv6 { 128 } else { 32 };
    if prefix == 0 || prefix > max {
        return Err(format!("prefix length {} out of range 1..={}", prefix, max));
    }
    Ok(())
}

/// Validate an MTU value
pub fn validate_mtu(mtu: u32) -> Result<(), String> {
    // Ethernet minimum is 68, jumbo frames top out around 9000
    if mtu < 68 {
        return Err("MTU must be at least 68 bytes".to_string());
    }
    if mtu > 9000 {
        return Err("MTU must not exceed 9000 bytes".to_string());
    }
    Ok(())
}

/// Validate an SSID (1..=32 bytes)
pub fn validate_ssid(ssid: &str) -> Result<(), String> {
    if ssid.is_empty() {
        return Err("SSID cannot be empty".to_string());
    }
    if ssid.len() > MAX_SSID_LEN {
        return Err(format!("SSID too long (max {} bytes)", MAX_SSID_LEN));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_validation() {
        assert!(validate_mac_address("00:11:22:33:44:55").is_ok());
        assert!(validate_mac_address("AA:BB:CC:DD:EE:FF").is_ok());

        assert!(validate_mac_address("00:11:22:33:44").is_err());
        assert!(validate_mac_address("00-11-22-33-44-55").is_err());
        assert!(validate_mac_address("00:11:22:33:44:GG").is_err());
        assert!(validate_mac_address("invalid").is_err());
    }

    #[test]
    fn test_ip_validation() {
        assert!(validate_ip_address("192.168.1.1").is_ok());
        assert!(validate_ip_address("::1").is_ok());
        assert!(validate_ip_address("fe80::1").is_ok());

        assert!(validate_ip_address("256.1.1.1").is_err());
        assert!(validate_ip_address("not_an_ip").is_err());
    }

    #[test]
    fn test_prefix_validation() {
        assert!(validate_prefix_len(24, false).is_ok());
        assert!(validate_prefix_len(64, true).is_ok());

        assert!(validate_prefix_len(0, false).is_err());
        assert!(validate_prefix_len(33, false).is_err());
        assert!(validate_prefix_len(129, true).is_err());
    }

    #[test]
    fn test_mtu_validation() {
        assert!(validate_mtu(1500).is_ok());
        assert!(validate_mtu(9000).is_ok());

        assert!(validate_mtu(67).is_err());
        assert!(validate_mtu(9001).is_err());
    }

    #[test]
    fn test_ssid_validation() {
        assert!(validate_ssid("MyNetwork").is_ok());

        assert!(validate_ssid("").is_err());
        assert!(validate_ssid(&"a".repeat(33)).is_err());
    }
}
