//! Scan target parsing and resolution.
//!
//! A target is a single host: an IPv4/IPv6 literal or a hostname. Hostnames
//! are resolved once per scan with `trust-dns-resolver`, and the first
//! address returned is the one probed.

use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use tokio_util::sync::CancellationToken;
use trust_dns_resolver::TokioAsyncResolver;

/// A target that has been resolved to an IP address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanTarget {
    /// The original input (hostname or IP string).
    pub original: String,
    /// The resolved IP address.
    pub ip: IpAddr,
}

impl ScanTarget {
    pub fn new(original: impl Into<String>, ip: IpAddr) -> Self {
        Self {
            original: original.into(),
            ip,
        }
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.original == self.ip.to_string() {
            write!(f, "{}", self.ip)
        } else {
            write!(f, "{} ({})", self.original, self.ip)
        }
    }
}

/// Error type for target parsing and resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("empty target")]
    Empty,
    #[error("invalid target format: {0}")]
    InvalidFormat(String),
    #[error("failed to resolve hostname '{0}': {1}")]
    DnsResolutionFailed(String, String),
    #[error("no IP addresses found for hostname '{0}'")]
    NoAddressesFound(String),
}

/// An unresolved target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// An IP literal, usable without resolution.
    Single(IpAddr),
    /// A hostname to be resolved.
    Hostname(String),
}

impl TargetSpec {
    pub fn parse(s: &str) -> Result<Self, TargetError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TargetError::Empty);
        }

        let unbracketed = s
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(s);
        if let Ok(ip) = unbracketed.parse::<IpAddr>() {
            return Ok(Self::Single(ip));
        }

        if is_valid_hostname(s) {
            return Ok(Self::Hostname(s.to_ascii_lowercase()));
        }

        Err(TargetError::InvalidFormat(s.to_string()))
    }

    /// Resolve to a single scan target.
    pub async fn resolve(&self) -> Result<ScanTarget, TargetError> {
        match self {
            Self::Single(ip) => Ok(ScanTarget::new(ip.to_string(), *ip)),
            Self::Hostname(hostname) => {
                let resolver = TokioAsyncResolver::tokio(
                    ResolverConfig::default(),
                    ResolverOpts::default(),
                );

                let response = resolver.lookup_ip(hostname.as_str()).await.map_err(|e| {
                    TargetError::DnsResolutionFailed(hostname.clone(), e.to_string())
                })?;

                let ip = response
                    .iter()
                    .next()
                    .ok_or_else(|| TargetError::NoAddressesFound(hostname.clone()))?;
                Ok(ScanTarget::new(hostname.clone(), ip))
            }
        }
    }
}

impl TargetSpec {
    /// Resolve, giving up with [`ScanError::Cancelled`] if `cancel` fires first.
    pub async fn resolve_until(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ScanTarget, ScanError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScanError::Cancelled),
            resolved = self.resolve() => Ok(resolved?),
        }
    }
}

impl FromStr for TargetSpec {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(ip) => write!(f, "{}", ip),
            Self::Hostname(hostname) => write!(f, "{}", hostname),
        }
    }
}

/// Pull the host out of either a URL (`https://user@example.com:8443/path`)
/// or a bare host (`example.com`, `10.0.0.1`, `[::1]`).
pub fn host_from_input(input: &str) -> &str {
    let input = input.trim();
    let rest = match input.split_once("://") {
        Some((_, rest)) => rest,
        None => input,
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);

    if let Some(bracketed) = host_port.strip_prefix('[') {
        return bracketed.split(']').next().unwrap_or(bracketed);
    }
    // A bare IPv6 literal has several colons and no port.
    if host_port.matches(':').count() > 1 {
        return host_port;
    }
    host_port.split(':').next().unwrap_or(host_port)
}

/// Check if a string is a valid hostname.
fn is_valid_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }

    let s = s.strip_suffix('.').unwrap_or(s);
    s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label.starts_with(|c: char| c.is_ascii_alphanumeric())
            && label.ends_with(|c: char| c.is_ascii_alphanumeric())
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_parse_ip_literals() {
        assert_eq!(
            TargetSpec::parse("192.168.1.1").unwrap(),
            TargetSpec::Single(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)))
        );
        assert_eq!(
            TargetSpec::parse("::1").unwrap(),
            TargetSpec::Single(IpAddr::V6(Ipv6Addr::LOCALHOST))
        );
        assert_eq!(
            TargetSpec::parse("[::1]").unwrap(),
            TargetSpec::Single(IpAddr::V6(Ipv6Addr::LOCALHOST))
        );
    }

    #[test]
    fn test_parse_hostname() {
        assert_eq!(
            TargetSpec::parse("Example.COM").unwrap(),
            TargetSpec::Hostname("example.com".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(TargetSpec::parse(""), Err(TargetError::Empty));
        assert_eq!(TargetSpec::parse("   "), Err(TargetError::Empty));
        assert!(matches!(
            TargetSpec::parse("bad host!"),
            Err(TargetError::InvalidFormat(_))
        ));
        assert!(matches!(
            TargetSpec::parse("-invalid.com"),
            Err(TargetError::InvalidFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_ip_literal_skips_dns() {
        let target = TargetSpec::parse("127.0.0.1").unwrap().resolve().await.unwrap();
        assert_eq!(target.ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(target.to_string(), "127.0.0.1");
    }

    #[test]
    fn test_parse_underscore_hostname() {
        assert_eq!(
            TargetSpec::parse("DC_01.corp.local").unwrap(),
            TargetSpec::Hostname("dc_01.corp.local".to_string())
        );
    }

    #[tokio::test]
    async fn test_resolve_until_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let spec = TargetSpec::parse("127.0.0.1").unwrap();
        assert_eq!(spec.resolve_until(&cancel).await, Err(ScanError::Cancelled));
    }

    #[tokio::test]
    async fn test_resolve_until_live_token() {
        let spec = TargetSpec::parse("127.0.0.1").unwrap();
        let target = spec.resolve_until(&CancellationToken::new()).await.unwrap();
        assert_eq!(target.ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_host_from_input() {
        assert_eq!(host_from_input("http://example.com"), "example.com");
        assert_eq!(host_from_input("https://example.com:8443/a/b?q=1"), "example.com");
        assert_eq!(host_from_input("ftp://user:pw@files.example.org/"), "files.example.org");
        assert_eq!(host_from_input("example.com"), "example.com");
        assert_eq!(host_from_input("10.0.0.1:22"), "10.0.0.1");
        assert_eq!(host_from_input("http://[::1]:8080/"), "::1");
        assert_eq!(host_from_input("fe80::1"), "fe80::1");
    }

    #[test]
    fn test_valid_hostname() {
        assert!(is_valid_hostname("example.com"));
        assert!(is_valid_hostname("example.com."));
        assert!(is_valid_hostname("my-server"));
        assert!(!is_valid_hostname(""));
        assert!(is_valid_hostname("dc_01.corp.local"));
        assert!(!is_valid_hostname("trailing_.com"));
        assert!(!is_valid_hostname("a..b"));
    }
}
