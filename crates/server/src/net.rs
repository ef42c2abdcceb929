//! Request network helpers: client IP resolution, IP anonymization and
//! bot detection.

use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use axum::http::HeaderMap;

/// User-agent fragments that mark a request as automated.
const BOT_UA_FRAGMENTS: &[&str] = &["bot", "spider", "crawler", "headless", "lighthouse"];

/// Resolve the real client IP behind CDN / platform proxies.
///
/// Checks `CF-Connecting-IP` first (Cloudflare's real client IP), then
/// the standard proxy headers, then the platform header, and finally
/// falls back to the socket peer address.
#[must_use]
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    if let Some(ip) = headers
        .get("cf-connecting-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    // X-Forwarded-For carries a chain; the first entry is the client.
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    if let Some(ip) = headers
        .get("fly-client-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    peer.map(|addr| addr.ip())
}

/// Anonymize an IP before it is stored.
///
/// IPv4 zeroes the final octet; IPv6 keeps only the first three segments
/// (a /48). Only the anonymized form ever reaches the event log.
#[must_use]
pub fn anonymize_ip(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            format!("{a}.{b}.{c}.0")
        }
        IpAddr::V6(v6) => {
            let [a, b, c, ..] = v6.segments();
            Ipv6Addr::new(a, b, c, 0, 0, 0, 0, 0).to_string()
        }
    }
}

/// Whether a user agent looks automated.
///
/// Case-insensitive substring match; bot traffic never increments view
/// counts even when tracking is requested.
#[must_use]
pub fn is_bot_user_agent(ua: &str) -> bool {
    let lower = ua.to_ascii_lowercase();
    BOT_UA_FRAGMENTS.iter().any(|frag| lower.contains(frag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip_prefers_cloudflare_header() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("203.0.113.7"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1"));
        let ip = client_ip(&headers, None);
        assert_eq!(ip, Some("203.0.113.7".parse().expect("ip")));
    }

    #[test]
    fn test_client_ip_takes_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.4, 10.0.0.1"),
        );
        let ip = client_ip(&headers, None);
        assert_eq!(ip, Some("198.51.100.4".parse().expect("ip")));
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let headers = HeaderMap::new();
        let peer: SocketAddr = "192.0.2.9:443".parse().expect("addr");
        assert_eq!(client_ip(&headers, Some(peer)), Some(peer.ip()));
        assert_eq!(client_ip(&headers, None), None);
    }

    #[test]
    fn test_anonymize_ipv4_zeroes_last_octet() {
        let ip: IpAddr = "203.0.113.77".parse().expect("ip");
        assert_eq!(anonymize_ip(ip), "203.0.113.0");
    }

    #[test]
    fn test_anonymize_ipv6_truncates_to_48() {
        let ip: IpAddr = "2001:db8:abcd:1234::1".parse().expect("ip");
        assert_eq!(anonymize_ip(ip), "2001:db8:abcd::");
    }

    #[test]
    fn test_bot_detection_is_substring_and_case_insensitive() {
        assert!(is_bot_user_agent("Mozilla/5.0 (compatible; Googlebot/2.1)"));
        assert!(is_bot_user_agent("SCREAMING-SPIDER"));
        assert!(is_bot_user_agent("HeadlessChrome/120.0"));
        assert!(is_bot_user_agent("Chrome-Lighthouse"));
        assert!(!is_bot_user_agent("Mozilla/5.0 (iPhone; like Mac OS X)"));
    }
}
