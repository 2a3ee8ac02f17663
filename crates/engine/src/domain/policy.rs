// crates/engine/src/domain/policy.rs

//! Verification policy: kind, hostname requirement and verification instant.

use std::net::IpAddr;
use std::time::SystemTime;

use once_cell::unsync::OnceCell;
use url::Host;

use super::certificate::Certificate;
use super::error::{EngineError, EngineResult};
use super::types::PolicyKind;

/// A validated hostname for SSL policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyHost {
    Dns(String),
    Ip(IpAddr),
}

impl PolicyHost {
    /// Whether the certificate names this host. DNS hosts match SAN dNSNames,
    /// falling back to the common name only when there are none. IP hosts
    /// match SAN iPAddress entries.
    pub fn matches(&self, certificate: &Certificate) -> bool {
        match self {
            PolicyHost::Ip(ip) => certificate.ip_addresses().contains(ip),
            PolicyHost::Dns(name) => {
                let sans = certificate.dns_names();
                if sans.is_empty() {
                    certificate
                        .common_name()
                        .is_some_and(|cn| dns_name_matches(&cn, name))
                } else {
                    sans.iter().any(|pattern| dns_name_matches(pattern, name))
                }
            }
        }
    }
}

/// `*.` covers exactly one leftmost label and never a bare public suffix.
fn dns_name_matches(pattern: &str, host: &str) -> bool {
    let pattern = pattern.trim_end_matches('.');
    match pattern.strip_prefix("*.") {
        Some(base) => {
            base.contains('.')
                && host
                    .split_once('.')
                    .is_some_and(|(label, rest)| !label.is_empty() && rest.eq_ignore_ascii_case(base))
        }
        None => pattern.eq_ignore_ascii_case(host),
    }
}

#[derive(Debug, Clone)]
pub struct Policy {
    kind: PolicyKind,
    hostname: Option<String>,
    verify_date: OnceCell<SystemTime>,
}

impl Policy {
    pub fn basic_x509() -> Self {
        Self::new(PolicyKind::BasicX509, None)
    }

    pub fn ssl_server(hostname: impl Into<String>) -> Self {
        Self::new(PolicyKind::SslServer, Some(hostname.into()))
    }

    pub fn ssl_client(hostname: impl Into<String>) -> Self {
        Self::new(PolicyKind::SslClient, Some(hostname.into()))
    }

    fn new(kind: PolicyKind, hostname: Option<String>) -> Self {
        Self {
            kind,
            hostname,
            verify_date: OnceCell::new(),
        }
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    /// Hostname as supplied; ignored for the basic X.509 policy.
    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    /// The verification instant. Defaults to "now", fixed at first read.
    pub fn verify_date(&self) -> SystemTime {
        *self.verify_date.get_or_init(SystemTime::now)
    }

    /// `None` goes back to "now at next read".
    pub fn set_verify_date(&mut self, date: Option<SystemTime>) {
        self.verify_date = match date {
            Some(d) => OnceCell::from(d),
            None => OnceCell::new(),
        };
    }

    /// Check the policy parameters, parsing the hostname for SSL policies.
    pub fn validate(&self) -> EngineResult<Option<PolicyHost>> {
        if !self.kind.requires_hostname() {
            return Ok(None);
        }
        let raw = self
            .hostname
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                EngineError::MalformedInput(format!("{} policy requires a hostname", self.kind.as_str()))
            })?;

        if let Ok(ip) = raw.parse::<IpAddr>() {
            return Ok(Some(PolicyHost::Ip(ip)));
        }
        let host = Host::parse(raw)
            .map_err(|e| EngineError::MalformedInput(format!("invalid hostname {raw:?}: {e}")))?;
        Ok(Some(match host {
            Host::Domain(d) => PolicyHost::Dns(d.trim_end_matches('.').to_string()),
            Host::Ipv4(a) => PolicyHost::Ip(IpAddr::V4(a)),
            Host::Ipv6(a) => PolicyHost::Ip(IpAddr::V6(a)),
        }))
    }
}
