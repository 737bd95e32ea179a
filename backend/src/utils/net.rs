//! Request metadata extraction for session records and audit entries.

use axum::http::{header::USER_AGENT, HeaderMap};

const MAX_DEVICE_NAME_LEN: usize = 120;

pub fn extract_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        return value
            .split(',')
            .next()
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty());
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|agent| agent.trim().to_string())
        .filter(|agent| !agent.is_empty())
}

/// Short device label derived from the user agent, truncated for storage.
pub fn derive_device_name(headers: &HeaderMap) -> Option<String> {
    extract_user_agent(headers).map(|agent| agent.chars().take(MAX_DEVICE_NAME_LEN).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(extract_ip(&headers).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn real_ip_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(extract_ip(&headers).as_deref(), Some("198.51.100.4"));
    }

    #[test]
    fn missing_headers_yield_none() {
        let headers = HeaderMap::new();
        assert_eq!(extract_ip(&headers), None);
        assert_eq!(extract_user_agent(&headers), None);
    }

    #[test]
    fn device_name_is_truncated() {
        let mut headers = HeaderMap::new();
        let long = "a".repeat(500);
        headers.insert(USER_AGENT, HeaderValue::from_str(&long).unwrap());
        let name = derive_device_name(&headers).unwrap();
        assert_eq!(name.len(), MAX_DEVICE_NAME_LEN);
    }
}
