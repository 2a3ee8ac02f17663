// crates/engine/src/domain/certificate.rs

//! Immutable view over a DER-encoded certificate plus its identifying fields.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::x509::{X509, X509NameRef};
use serde::Serialize;

use crate::crypto::key::{self, Key};
use crate::domain::error::{EngineError, EngineResult};
use crate::domain::types::{CertificateEncoding, CertificateType};
use crate::store::item::{Attributes, Item, ItemClass, KeychainItem, Overlay};

/// Identity of a certificate within a store: issuer + serial + type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CertificateIdentity {
    pub issuer: Vec<u8>,
    pub serial_number: Vec<u8>,
    pub certificate_type: CertificateType,
}

#[derive(Debug, Clone, Default)]
pub struct CertificateAttributes {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CertificateChanges {
    pub label: Option<String>,
}

impl Attributes for CertificateAttributes {
    type Changes = CertificateChanges;

    fn apply(&mut self, changes: &CertificateChanges) {
        if let Some(label) = &changes.label {
            self.label = Some(label.clone());
        }
    }
}

struct CertificateData {
    x509: X509,
    der: Vec<u8>,
    subject: Vec<u8>,
    issuer: Vec<u8>,
    serial_number: Vec<u8>,
    subject_key_id: Option<Vec<u8>>,
    public_key_hash: Vec<u8>,
    fingerprint: Vec<u8>,
    certificate_type: CertificateType,
}

/// An X.509 certificate. Cloning is cheap; the decoded data is shared.
#[derive(Clone)]
pub struct Certificate {
    data: Arc<CertificateData>,
    attrs: Overlay<CertificateAttributes>,
}

impl Certificate {
    /// Decode a certificate from DER bytes.
    pub fn from_der(der: &[u8]) -> EngineResult<Self> {
        let x509 = X509::from_der(der)
            .map_err(|e| EngineError::MalformedCertificate(e.to_string()))?;
        Self::from_x509(x509)
    }

    /// Decode the first certificate of a PEM document.
    pub fn from_pem(pem: &[u8]) -> EngineResult<Self> {
        let x509 = X509::from_pem(pem)
            .map_err(|e| EngineError::MalformedCertificate(e.to_string()))?;
        Self::from_x509(x509)
    }

    /// Decode every certificate of a PEM bundle.
    pub fn stack_from_pem(pem: &[u8]) -> EngineResult<Vec<Self>> {
        X509::stack_from_pem(pem)
            .map_err(|e| EngineError::MalformedCertificate(e.to_string()))?
            .into_iter()
            .map(Self::from_x509)
            .collect()
    }

    pub fn from_x509(x509: X509) -> EngineResult<Self> {
        let malformed = |e: openssl::error::ErrorStack| EngineError::MalformedCertificate(e.to_string());

        let der = x509.to_der().map_err(malformed)?;
        let subject = x509.subject_name().to_der().map_err(malformed)?;
        let issuer = x509.issuer_name().to_der().map_err(malformed)?;
        let serial_number = x509
            .serial_number()
            .to_bn()
            .map_err(malformed)?
            .to_vec();
        let subject_key_id = x509.subject_key_id().map(|id| id.as_slice().to_vec());
        let public_key = x509.public_key().map_err(malformed)?;
        let public_key_hash = key::public_key_hash(&public_key).map_err(malformed)?;
        let fingerprint = x509.digest(MessageDigest::sha256()).map_err(malformed)?.to_vec();
        let certificate_type = CertificateType::from_version(x509.version());

        Ok(Self {
            data: Arc::new(CertificateData {
                x509,
                der,
                subject,
                issuer,
                serial_number,
                subject_key_id,
                public_key_hash,
                fingerprint,
                certificate_type,
            }),
            attrs: Overlay::new(CertificateAttributes::default()),
        })
    }

    pub fn x509(&self) -> &X509 {
        &self.data.x509
    }

    /// Certificate data in DER format.
    pub fn der(&self) -> &[u8] {
        &self.data.der
    }

    pub fn to_pem(&self) -> EngineResult<String> {
        let pem = self.data.x509.to_pem()?;
        String::from_utf8(pem).map_err(|e| EngineError::MalformedCertificate(e.to_string()))
    }

    /// Subject name, DER encoded with its outer SEQUENCE.
    pub fn subject(&self) -> &[u8] {
        &self.data.subject
    }

    /// Issuer name, DER encoded with its outer SEQUENCE.
    pub fn issuer(&self) -> &[u8] {
        &self.data.issuer
    }

    /// Serial number as unsigned big-endian bytes.
    pub fn serial_number(&self) -> &[u8] {
        &self.data.serial_number
    }

    pub fn serial_number_hex(&self) -> String {
        hex(&self.data.serial_number)
    }

    pub fn subject_key_id(&self) -> Option<&[u8]> {
        self.data.subject_key_id.as_deref()
    }

    /// SHA-1 of the subject public key bits.
    pub fn public_key_hash(&self) -> &[u8] {
        &self.data.public_key_hash
    }

    pub fn fingerprint_sha256(&self) -> &[u8] {
        &self.data.fingerprint
    }

    pub fn fingerprint_hex(&self) -> String {
        hex(&self.data.fingerprint)
    }

    pub fn certificate_type(&self) -> CertificateType {
        self.data.certificate_type
    }

    pub fn certificate_encoding(&self) -> CertificateEncoding {
        CertificateEncoding::Der
    }

    pub fn identity(&self) -> CertificateIdentity {
        CertificateIdentity {
            issuer: self.data.issuer.clone(),
            serial_number: self.data.serial_number.clone(),
            certificate_type: self.data.certificate_type,
        }
    }

    pub fn same_identity(&self, other: &Certificate) -> bool {
        self.data.certificate_type == other.data.certificate_type
            && self.data.serial_number == other.data.serial_number
            && self.data.issuer == other.data.issuer
    }

    /// Issuer and subject are the same name.
    pub fn is_self_issued(&self) -> bool {
        self.data.subject == self.data.issuer
    }

    pub fn common_name(&self) -> Option<String> {
        first_entry(self.data.x509.subject_name(), Nid::COMMONNAME)
    }

    /// Human-readable summary of the subject.
    pub fn subject_summary(&self) -> String {
        self.common_name()
            .or_else(|| self.email_addresses().into_iter().next())
            .or_else(|| first_entry(self.data.x509.subject_name(), Nid::ORGANIZATIONALUNITNAME))
            .or_else(|| first_entry(self.data.x509.subject_name(), Nid::ORGANIZATIONNAME))
            .unwrap_or_else(|| self.subject_string())
    }

    /// Email addresses from the subject name and the SAN extension.
    pub fn email_addresses(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .data
            .x509
            .subject_name()
            .entries_by_nid(Nid::PKCS9_EMAILADDRESS)
            .filter_map(|e| e.data().as_utf8().ok().map(|s| s.to_string()))
            .collect();
        if let Some(names) = self.data.x509.subject_alt_names() {
            for name in names.iter() {
                if let Some(email) = name.email() {
                    if !out.iter().any(|e| e.eq_ignore_ascii_case(email)) {
                        out.push(email.to_string());
                    }
                }
            }
        }
        out
    }

    pub fn dns_names(&self) -> Vec<String> {
        self.data
            .x509
            .subject_alt_names()
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| n.dnsname().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// SAN iPAddress entries; malformed lengths are skipped.
    pub fn ip_addresses(&self) -> Vec<IpAddr> {
        self.data
            .x509
            .subject_alt_names()
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| n.ipaddress())
                    .filter_map(|raw| match raw.len() {
                        4 => <[u8; 4]>::try_from(raw).ok().map(|o| IpAddr::V4(Ipv4Addr::from(o))),
                        16 => <[u8; 16]>::try_from(raw).ok().map(|o| IpAddr::V6(Ipv6Addr::from(o))),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// One-line `CN=..., O=...` rendering of the subject.
    pub fn subject_string(&self) -> String {
        name_to_string(self.data.x509.subject_name())
    }

    pub fn issuer_string(&self) -> String {
        name_to_string(self.data.x509.issuer_name())
    }

    pub fn not_before_unix(&self) -> EngineResult<i64> {
        unix_time(self.data.x509.not_before())
    }

    pub fn not_after_unix(&self) -> EngineResult<i64> {
        unix_time(self.data.x509.not_after())
    }

    pub fn public_key(&self) -> EngineResult<Key> {
        let pkey = self.data.x509.public_key()?;
        Key::from_public(pkey)
    }

    /// Store-visible name. Only set for certificates held in a keychain.
    pub fn label(&self) -> Option<&str> {
        self.attrs.read(|c| c.label.as_deref(), |b| b.label.as_deref())
    }

    /// Stage a new label; persisted by saving the certificate to its keychain.
    pub fn set_label(&mut self, label: impl Into<String>) -> EngineResult<()> {
        if !self.attrs.is_stored() {
            return Err(EngineError::NotPersisted);
        }
        let label = label.into();
        self.attrs.stage(|c| c.label = Some(label));
        Ok(())
    }
}

impl KeychainItem for Certificate {
    type Attributes = CertificateAttributes;
    const CLASS: ItemClass = ItemClass::Certificate;

    fn overlay(&self) -> &Overlay<CertificateAttributes> {
        &self.attrs
    }

    fn overlay_mut(&mut self) -> &mut Overlay<CertificateAttributes> {
        &mut self.attrs
    }

    fn into_item(self) -> Item {
        Item::Certificate(self)
    }

    fn from_item(item: Item) -> Option<Self> {
        match item {
            Item::Certificate(c) => Some(c),
            _ => None,
        }
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.data.der == other.data.der
    }
}

impl Eq for Certificate {}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject_string())
            .field("issuer", &self.issuer_string())
            .field("serial", &self.serial_number_hex())
            .field("state", &self.attrs.state())
            .finish()
    }
}

fn first_entry(name: &X509NameRef, nid: Nid) -> Option<String> {
    name.entries_by_nid(nid)
        .next()
        .and_then(|e| e.data().as_utf8().ok().map(|s| s.to_string()))
}

fn name_to_string(name: &X509NameRef) -> String {
    name.entries()
        .map(|e| {
            let key = e.object().nid().short_name().unwrap_or("?");
            let value = e
                .data()
                .as_utf8()
                .map(|s| s.to_string())
                .unwrap_or_default();
            format!("{key}={value}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn unix_time(t: &Asn1TimeRef) -> EngineResult<i64> {
    let epoch = Asn1Time::from_unix(0)?;
    let diff = epoch.diff(t)?;
    Ok(i64::from(diff.days) * 86_400 + i64::from(diff.secs))
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
