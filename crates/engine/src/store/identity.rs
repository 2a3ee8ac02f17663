//! Identity items: a certificate paired with its private key.

use crate::crypto::key::Key;
use crate::domain::certificate::{Certificate, CertificateAttributes};
use crate::domain::error::{EngineError, EngineResult};

use super::item::{Item, ItemClass, KeychainItem, Overlay};

#[derive(Debug, Clone)]
pub struct Identity {
    certificate: Certificate,
    private_key: Key,
}

impl Identity {
    /// Pair a certificate with its private key. Fails if the key does not
    /// match the certificate's public key.
    pub fn new(certificate: Certificate, private_key: Key) -> EngineResult<Self> {
        if private_key.application_label() != Some(certificate.public_key_hash()) {
            return Err(EngineError::MalformedInput(
                "private key does not match the certificate".into(),
            ));
        }
        Ok(Self { certificate, private_key })
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn private_key(&self) -> &Key {
        &self.private_key
    }

    /// Mirrors the certificate label.
    pub fn label(&self) -> Option<&str> {
        self.certificate.label()
    }
}

impl KeychainItem for Identity {
    type Attributes = CertificateAttributes;
    const CLASS: ItemClass = ItemClass::Identity;

    fn overlay(&self) -> &Overlay<CertificateAttributes> {
        self.certificate.overlay()
    }

    fn overlay_mut(&mut self) -> &mut Overlay<CertificateAttributes> {
        self.certificate.overlay_mut()
    }

    fn into_item(self) -> Item {
        Item::Identity(self)
    }

    fn from_item(item: Item) -> Option<Self> {
        match item {
            Item::Identity(i) => Some(i),
            _ => None,
        }
    }
}
