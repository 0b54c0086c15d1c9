use std::{net::SocketAddr, sync::LazyLock};

use axum::http::{
    HeaderMap,
    header::{AUTHORIZATION, USER_AGENT},
};
use regex::Regex;
use subtle::ConstantTimeEq;

use crate::{
    error::AppError,
    models::{DEFAULT_SOURCE, UNKNOWN},
};

const BEARER: &str = "Bearer ";
const MAX_SOURCE_LEN: usize = 64;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

/// Checks `local@domain.tld` on the raw input and lower-cases. The result is the deduplication key.
pub fn normalize_email(input: &str) -> Result<String, AppError> {
    if !EMAIL.is_match(input) {
        return Err(AppError::InvalidEmail);
    }

    Ok(input.to_lowercase())
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Constant-time check of a presented token. An unset secret never matches.
pub fn token_matches(presented: Option<&str>, secret: Option<&str>) -> bool {
    match (presented, secret) {
        (Some(presented), Some(secret)) if !secret.is_empty() => {
            presented.as_bytes().ct_eq(secret.as_bytes()).into()
        }
        _ => false,
    }
}

pub fn user_agent(headers: &HeaderMap) -> String {
    header_str(headers, USER_AGENT.as_str())
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    header_str(headers, "x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .or_else(|| header_str(headers, "x-real-ip"))
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

pub fn signup_source(source: Option<&str>) -> String {
    match source.map(str::trim) {
        Some(source) if !source.is_empty() => source.chars().take(MAX_SOURCE_LEN).collect(),
        _ => DEFAULT_SOURCE.to_string(),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_valid_emails() {
        assert_eq!(normalize_email("user@example.com").unwrap(), "user@example.com");
        assert_eq!(normalize_email("User@Example.COM").unwrap(), "user@example.com");
        assert_eq!(
            normalize_email("a.b+c@sub.domain.io").unwrap(),
            "a.b+c@sub.domain.io"
        );
    }

    #[test]
    fn test_invalid_emails() {
        let inputs = [
            "not-an-email",
            "",
            "a@b",
            "@example.com",
            "a@.",
            "a b@example.com",
            "a@@b.co",
            " a@b.co ",
            "a@b.co\n",
            "\ta@b.co",
        ];

        for input in inputs {
            assert!(
                matches!(normalize_email(input), Err(AppError::InvalidEmail)),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(
            bearer_token(&headers(&[("authorization", "Bearer s3cret")])),
            Some("s3cret")
        );
        assert_eq!(bearer_token(&headers(&[("authorization", "Basic s3cret")])), None);
        assert_eq!(bearer_token(&headers(&[("authorization", "Bearer ")])), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_token_matches() {
        assert!(token_matches(Some("s3cret"), Some("s3cret")));
        assert!(!token_matches(Some("s3cre"), Some("s3cret")));
        assert!(!token_matches(None, Some("s3cret")));
        assert!(!token_matches(Some(""), Some("")));
        assert!(!token_matches(Some("anything"), None));
    }

    #[test]
    fn test_client_ip_precedence() {
        let peer: SocketAddr = "192.168.1.9:4000".parse().unwrap();

        let forwarded = headers(&[
            ("x-forwarded-for", "203.0.113.5, 10.0.0.1"),
            ("x-real-ip", "10.0.0.2"),
        ]);
        assert_eq!(client_ip(&forwarded, Some(peer)), "203.0.113.5");

        let real = headers(&[("x-real-ip", "10.0.0.2")]);
        assert_eq!(client_ip(&real, Some(peer)), "10.0.0.2");

        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)), "192.168.1.9");
        assert_eq!(client_ip(&HeaderMap::new(), None), UNKNOWN);
    }

    #[test]
    fn test_provenance_defaults() {
        assert_eq!(user_agent(&HeaderMap::new()), UNKNOWN);
        assert_eq!(user_agent(&headers(&[("user-agent", "curl/8.0")])), "curl/8.0");

        assert_eq!(signup_source(None), DEFAULT_SOURCE);
        assert_eq!(signup_source(Some("  ")), DEFAULT_SOURCE);
        assert_eq!(signup_source(Some("twitter")), "twitter");
        assert_eq!(signup_source(Some(&"x".repeat(100))).len(), MAX_SOURCE_LEN);
    }
}
