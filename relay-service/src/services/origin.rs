//! Origin allow-list for browser callers.
//!
//! Entries are matched against the host of the caller's `Origin` (or
//! `Referer`) URL. Matching is anchored on label boundaries, so an entry for
//! `.example.com` never accepts `example.com.attacker.io` or
//! `notexample.com`.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid allowed origin '{entry}': {reason}")]
pub struct InvalidOriginRule {
    pub entry: String,
    pub reason: &'static str,
}

/// A single allow-list entry: `[.]host[:port]`.
///
/// A leading dot accepts any subdomain of `host` but not `host` itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginRule {
    host: String,
    subdomains_only: bool,
    port: Option<u16>,
}

impl FromStr for OriginRule {
    type Err = InvalidOriginRule;

    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| InvalidOriginRule {
            entry: entry.to_string(),
            reason,
        };

        let mut rest = entry.trim();
        if let Some((_, after_scheme)) = rest.split_once("://") {
            rest = after_scheme;
        }
        let rest = rest.trim_end_matches('/');

        let (subdomains_only, rest) = match rest.strip_prefix('.') {
            Some(stripped) => (true, stripped),
            None => (false, rest),
        };

        // Bracketed IPv6 literals carry colons of their own.
        let (host, port) = match rest.find(']').filter(|_| rest.starts_with('[')) {
            Some(end) => {
                let (host, after) = rest.split_at(end + 1);
                match after.strip_prefix(':') {
                    Some(port) => (host, Some(port)),
                    None if after.is_empty() => (host, None),
                    None => return Err(invalid("unexpected text after IPv6 address")),
                }
            }
            None => match rest.rsplit_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (rest, None),
            },
        };
        let port = port
            .map(|port| port.parse::<u16>().map_err(|_| invalid("port is not a number")))
            .transpose()?;

        if host.is_empty() {
            return Err(invalid("host is empty"));
        }
        if host.contains(['/', '?', '#', '@', ' ']) {
            return Err(invalid("host contains URL delimiters"));
        }

        Ok(OriginRule {
            host: host.to_ascii_lowercase(),
            subdomains_only,
            port,
        })
    }
}

impl fmt::Display for OriginRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.subdomains_only {
            write!(f, ".")?;
        }
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

impl OriginRule {
    fn matches(&self, host: &str, port: Option<u16>) -> bool {
        if let Some(expected) = self.port {
            if port != Some(expected) {
                return false;
            }
        }

        if self.subdomains_only {
            host.len() > self.host.len() + 1
                && host.ends_with(&self.host)
                && host.as_bytes()[host.len() - self.host.len() - 1] == b'.'
        } else {
            host == self.host
        }
    }
}

/// Outcome of checking a caller's declared origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginCheck {
    /// No origin or referer was sent; treated as a direct call.
    Anonymous,
    Allowed,
    Denied,
}

impl OriginCheck {
    pub fn is_denied(self) -> bool {
        self == OriginCheck::Denied
    }
}

/// Immutable allow-list built once at startup.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    rules: Vec<OriginRule>,
}

impl OriginPolicy {
    pub fn new<I, S>(entries: I) -> Result<Self, InvalidOriginRule>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = entries
            .into_iter()
            .map(|entry| entry.as_ref().parse())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Check an `Origin` header value or a full `Referer` URL.
    pub fn check(&self, origin: &str) -> OriginCheck {
        let origin = origin.trim();
        if origin.is_empty() {
            return OriginCheck::Anonymous;
        }

        let Some((host, port)) = parse_host(origin) else {
            return OriginCheck::Denied;
        };

        if self.rules.iter().any(|rule| rule.matches(&host, port)) {
            OriginCheck::Allowed
        } else {
            OriginCheck::Denied
        }
    }
}

fn parse_host(value: &str) -> Option<(String, Option<u16>)> {
    let url = Url::parse(value)
        .ok()
        .filter(|url| url.has_host())
        .or_else(|| Url::parse(&format!("http://{}", value)).ok())?;

    let host = url.host_str()?.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() {
        return None;
    }
    Some((host, url.port_or_known_default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_policy() -> OriginPolicy {
        OriginPolicy::new([".dialogedu.com", "localhost:3000", "localhost:5173"]).unwrap()
    }

    #[test]
    fn test_rule_parsing() {
        let rule: OriginRule = ".DialogEdu.com".parse().unwrap();
        assert_eq!(rule.to_string(), ".dialogedu.com");

        let rule: OriginRule = "https://localhost:3000/".parse().unwrap();
        assert_eq!(rule.to_string(), "localhost:3000");

        assert!("localhost:http".parse::<OriginRule>().is_err());
        assert!(".".parse::<OriginRule>().is_err());
        assert!("example.com/path".parse::<OriginRule>().is_err());
    }

    #[test]
    fn test_empty_origin_is_anonymous() {
        let policy = default_policy();
        assert_eq!(policy.check(""), OriginCheck::Anonymous);
        assert_eq!(policy.check("   "), OriginCheck::Anonymous);
    }

    #[test]
    fn test_subdomain_rule() {
        let policy = default_policy();
        assert_eq!(policy.check("https://app.dialogedu.com"), OriginCheck::Allowed);
        assert_eq!(policy.check("https://a.b.dialogedu.com"), OriginCheck::Allowed);
        assert_eq!(
            policy.check("https://www.dialogedu.com/courses/12?tab=quiz"),
            OriginCheck::Allowed
        );
        assert_eq!(policy.check("https://dialogedu.com"), OriginCheck::Denied);
    }

    #[test]
    fn test_suffix_spoofing_rejected() {
        let policy = default_policy();
        assert_eq!(policy.check("https://dialogedu.com.evil.io"), OriginCheck::Denied);
        assert_eq!(policy.check("https://evil-dialogedu.com"), OriginCheck::Denied);
        assert_eq!(policy.check("https://evil.io/?r=.dialogedu.com"), OriginCheck::Denied);
        assert_eq!(policy.check("http://notlocalhost:3000"), OriginCheck::Denied);
        assert_eq!(policy.check("http://localhost.evil.io:3000"), OriginCheck::Denied);
    }

    #[test]
    fn test_port_must_match() {
        let policy = default_policy();
        assert_eq!(policy.check("http://localhost:3000"), OriginCheck::Allowed);
        assert_eq!(policy.check("http://localhost:5173/quiz"), OriginCheck::Allowed);
        assert_eq!(policy.check("http://localhost:8080"), OriginCheck::Denied);
        assert_eq!(policy.check("http://localhost"), OriginCheck::Denied);
    }

    #[test]
    fn test_exact_host_rule_uses_default_port() {
        let policy = OriginPolicy::new(["example.org:443"]).unwrap();
        assert_eq!(policy.check("https://example.org"), OriginCheck::Allowed);
        assert_eq!(policy.check("http://example.org"), OriginCheck::Denied);
    }

    #[test]
    fn test_unparseable_origin_denied() {
        let policy = default_policy();
        assert_eq!(policy.check("null"), OriginCheck::Denied);
        assert_eq!(policy.check("http://"), OriginCheck::Denied);
    }

    #[test]
    fn test_ipv6_entries() {
        let rule: OriginRule = "[::1]".parse().unwrap();
        assert_eq!(rule.to_string(), "[::1]");

        let rule: OriginRule = "[::1]:5173".parse().unwrap();
        assert_eq!(rule.to_string(), "[::1]:5173");

        assert!("[::1]x".parse::<OriginRule>().is_err());
        assert!("[::1]:http".parse::<OriginRule>().is_err());

        let policy = OriginPolicy::new(["[::1]:5173"]).unwrap();
        assert_eq!(policy.check("http://[::1]:5173"), OriginCheck::Allowed);
        assert_eq!(policy.check("http://[::1]:3000"), OriginCheck::Denied);

        let policy = OriginPolicy::new(["[::1]"]).unwrap();
        assert_eq!(policy.check("http://[::1]:8080/page"), OriginCheck::Allowed);
    }

    #[test]
    fn test_invalid_entry_rejected() {
        let err = OriginPolicy::new(["localhost:99999"]).unwrap_err();
        assert_eq!(err.entry, "localhost:99999");
    }
}
