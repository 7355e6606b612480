//! Request guards: the admin shared secret and the client details stored with
//! each answer.

use std::net::IpAddr;

use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use tracing::{error, warn};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::submission::ClientInfo;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Proof that the request carried the configured admin key, either as the
/// `key` query parameter or the `x-admin-key` header.
#[derive(Debug)]
pub struct AdminKey(());

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminKey {
    type Error = ApiError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(config) = req.rocket().state::<AppConfig>() else {
            error!("admin key guard used without AppConfig");
            return Outcome::Error((Status::InternalServerError, ApiError::Unauthorized));
        };

        let supplied = req
            .query_value::<&str>("key")
            .and_then(Result::ok)
            .filter(|k| !k.is_empty())
            .or_else(|| req.headers().get_one(ADMIN_KEY_HEADER));

        match supplied {
            Some(key) if keys_match(key, &config.admin_key) => Outcome::Success(AdminKey(())),
            _ => {
                warn!(uri = %req.uri(), "rejected admin request");
                Outcome::Error((Status::Unauthorized, ApiError::Unauthorized))
            }
        }
    }
}

/// Byte comparison that does not stop at the first mismatch.
pub fn keys_match(supplied: &str, expected: &str) -> bool {
    let (supplied, expected) = (supplied.as_bytes(), expected.as_bytes());
    if supplied.is_empty() || supplied.len() != expected.len() {
        return false;
    }
    supplied
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientInfo {
    type Error = std::convert::Infallible;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let headers = req.headers();
        let user_agent = headers
            .get_one("User-Agent")
            .map(str::to_string)
            .filter(|ua| !ua.is_empty());
        let ip = headers
            .get_one(FORWARDED_FOR_HEADER)
            .and_then(first_forwarded)
            .or_else(|| req.remote().map(|addr| display_ip(addr.ip())));

        Outcome::Success(ClientInfo { user_agent, ip })
    }
}

/// First hop of an `X-Forwarded-For` list.
pub fn first_forwarded(header: &str) -> Option<String> {
    header
        .split(',')
        .next()
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

fn display_ip(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(ip4) => ip4.to_string(),
        IpAddr::V6(ip6) => match ip6.to_ipv4_mapped() {
            Some(ip4) => ip4.to_string(),
            None => ip6.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn keys_must_match_exactly() {
        assert!(keys_match("s3cret", "s3cret"));
        assert!(!keys_match("s3cret ", "s3cret"));
        assert!(!keys_match("S3cret", "s3cret"));
        assert!(!keys_match("s3cre", "s3cret"));
        assert!(!keys_match("", "s3cret"));
    }

    #[test]
    fn empty_key_never_matches() {
        assert!(!keys_match("", ""));
    }

    #[test]
    fn forwarded_for_uses_first_hop() {
        assert_eq!(
            first_forwarded("203.0.113.7, 10.0.0.1, 10.0.0.2"),
            Some("203.0.113.7".into())
        );
        assert_eq!(first_forwarded(" 198.51.100.4 "), Some("198.51.100.4".into()));
        assert_eq!(first_forwarded(""), None);
        assert_eq!(first_forwarded(" , 10.0.0.1"), None);
    }

    #[test]
    fn mapped_v6_addresses_display_as_v4() {
        let mapped = IpAddr::V6(Ipv4Addr::new(192, 0, 2, 1).to_ipv6_mapped());
        assert_eq!(display_ip(mapped), "192.0.2.1");
        assert_eq!(display_ip(IpAddr::V6(Ipv6Addr::LOCALHOST)), "::1");
    }
}
