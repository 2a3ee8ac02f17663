#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use keyhold_engine::{Certificate, Platform};
use rcgen::{BasicConstraints, CertificateParams, CustomExtension, DistinguishedName, DnType, IsCa};

/// A generated certificate and its DER, serialized exactly once.
pub struct Issued {
    pub cert: rcgen::Certificate,
    pub der: Vec<u8>,
}

impl Issued {
    pub fn certificate(&self) -> Certificate {
        Certificate::from_der(&self.der).expect("parse generated cert")
    }

    pub fn key_pem(&self) -> String {
        self.cert.serialize_private_key_pem()
    }
}

fn params(common_name: &str, dns: &[&str]) -> CertificateParams {
    let mut params = CertificateParams::new(dns.iter().map(|d| d.to_string()).collect::<Vec<_>>());
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    dn.push(DnType::OrganizationName, "Keyhold Tests");
    params.distinguished_name = dn;
    params
}

fn finish(params: CertificateParams, issuer: Option<&Issued>) -> Issued {
    let cert = rcgen::Certificate::from_params(params).expect("cert");
    let der = match issuer {
        Some(ca) => cert.serialize_der_with_signer(&ca.cert).expect("sign"),
        None => cert.serialize_der().expect("self-sign"),
    };
    Issued { cert, der }
}

/// Self-signed root CA.
pub fn root_ca(common_name: &str) -> Issued {
    let mut p = params(common_name, &[]);
    p.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    finish(p, None)
}

/// CA certificate signed by `issuer`.
pub fn intermediate_ca(common_name: &str, issuer: &Issued) -> Issued {
    let mut p = params(common_name, &[]);
    p.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    finish(p, Some(issuer))
}

/// CA certificate signed by `issuer`, valid only inside the given window.
pub fn intermediate_valid(
    common_name: &str,
    issuer: &Issued,
    not_before: (i32, u8, u8),
    not_after: (i32, u8, u8),
) -> Issued {
    let mut p = params(common_name, &[]);
    p.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    p.not_before = rcgen::date_time_ymd(not_before.0, not_before.1, not_before.2);
    p.not_after = rcgen::date_time_ymd(not_after.0, not_after.1, not_after.2);
    finish(p, Some(issuer))
}

/// End-entity certificate for `dns`, signed by `issuer`, valid 2020-2040.
pub fn leaf(common_name: &str, dns: &[&str], issuer: &Issued) -> Issued {
    leaf_valid(common_name, dns, issuer, (2020, 1, 1), (2040, 1, 1))
}

pub fn leaf_valid(
    common_name: &str,
    dns: &[&str],
    issuer: &Issued,
    not_before: (i32, u8, u8),
    not_after: (i32, u8, u8),
) -> Issued {
    let mut p = params(common_name, dns);
    p.not_before = rcgen::date_time_ymd(not_before.0, not_before.1, not_before.2);
    p.not_after = rcgen::date_time_ymd(not_after.0, not_after.1, not_after.2);
    finish(p, Some(issuer))
}

/// Leaf carrying a critical extension no verifier understands.
pub fn leaf_with_unknown_critical_extension(common_name: &str, dns: &[&str], issuer: &Issued) -> Issued {
    let mut p = params(common_name, dns);
    p.not_before = rcgen::date_time_ymd(2020, 1, 1);
    p.not_after = rcgen::date_time_ymd(2040, 1, 1);
    let mut ext = CustomExtension::from_oid_content(&[1, 3, 6, 1, 4, 1, 55555, 7], vec![0x05, 0x00]);
    ext.set_criticality(true);
    p.custom_extensions.push(ext);
    finish(p, Some(issuer))
}

/// Self-signed end-entity certificate.
pub fn self_signed_leaf(common_name: &str, dns: &[&str]) -> Issued {
    finish(params(common_name, dns), None)
}

/// Midnight UTC on the given day.
pub fn at(year: i32, month: u8, day: u8) -> SystemTime {
    let secs = rcgen::date_time_ymd(year, month, day).unix_timestamp();
    UNIX_EPOCH + Duration::from_secs(secs as u64)
}

/// A date inside every `leaf` validity window.
pub fn inside_window() -> SystemTime {
    at(2030, 6, 1)
}

/// Flip the last byte of the DER, breaking the signature but not the encoding.
pub fn tampered(der: &[u8]) -> Vec<u8> {
    let mut out = der.to_vec();
    if let Some(last) = out.last_mut() {
        *last ^= 0x01;
    }
    out
}

/// No system anchors, keychains or trust settings.
pub fn isolated() -> Arc<Platform> {
    Arc::new(Platform::isolated())
}
