//! Key items. Keys are opaque handles over OpenSSL key material; raw
//! cryptographic operations are left to the platform primitives.

use std::fmt;

use openssl::bn::BigNumContext;
use openssl::ec::PointConversionForm;
use openssl::error::ErrorStack;
use openssl::hash::{hash, MessageDigest};
use openssl::pkey::{Id, PKey, PKeyRef, Private, Public};
use serde::Serialize;
use zeroize::Zeroizing;

use crate::domain::error::{EngineError, EngineResult};
use crate::store::item::{Attributes, Item, ItemClass, KeychainItem, Overlay};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyClass {
    Public,
    Private,
    Symmetric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyAlgorithm {
    Rsa,
    Dsa,
    Ec,
    Ed25519,
    Ed448,
    Aes,
    Other,
}

impl KeyAlgorithm {
    fn from_id(id: Id) -> Self {
        match id {
            Id::RSA => KeyAlgorithm::Rsa,
            Id::DSA => KeyAlgorithm::Dsa,
            Id::EC => KeyAlgorithm::Ec,
            Id::ED25519 => KeyAlgorithm::Ed25519,
            Id::ED448 => KeyAlgorithm::Ed448,
            _ => KeyAlgorithm::Other,
        }
    }
}

/// Key usage flags, mirroring the store's capability attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KeyCapabilities {
    pub encrypt: bool,
    pub decrypt: bool,
    pub derive: bool,
    pub sign: bool,
    pub verify: bool,
    pub wrap: bool,
    pub unwrap: bool,
}

#[derive(Debug, Clone, Default)]
pub struct KeyAttributes {
    pub label: Option<String>,
    /// For asymmetric keys, the SHA-1 hash of the public key.
    pub application_label: Option<Vec<u8>>,
    pub application_tag: Option<Vec<u8>>,
    pub permanent: bool,
    pub capabilities: KeyCapabilities,
}

#[derive(Debug, Clone, Default)]
pub struct KeyChanges {
    pub label: Option<String>,
    pub application_tag: Option<Vec<u8>>,
}

impl Attributes for KeyAttributes {
    type Changes = KeyChanges;

    fn apply(&mut self, changes: &KeyChanges) {
        if let Some(label) = &changes.label {
            self.label = Some(label.clone());
        }
        if let Some(tag) = &changes.application_tag {
            self.application_tag = Some(tag.clone());
        }
    }
}

#[derive(Clone)]
enum KeyMaterial {
    Public(PKey<Public>),
    Private(PKey<Private>),
    Symmetric(Zeroizing<Vec<u8>>),
}

#[derive(Clone)]
pub struct Key {
    material: KeyMaterial,
    algorithm: KeyAlgorithm,
    size_bits: u32,
    attrs: Overlay<KeyAttributes>,
}

impl Key {
    pub fn from_public(pkey: PKey<Public>) -> EngineResult<Self> {
        let algorithm = KeyAlgorithm::from_id(pkey.id());
        let attrs = KeyAttributes {
            application_label: Some(public_key_hash(&pkey)?),
            capabilities: KeyCapabilities {
                encrypt: algorithm == KeyAlgorithm::Rsa,
                verify: true,
                wrap: algorithm == KeyAlgorithm::Rsa,
                ..KeyCapabilities::default()
            },
            ..KeyAttributes::default()
        };
        Ok(Self {
            size_bits: pkey.bits(),
            algorithm,
            material: KeyMaterial::Public(pkey),
            attrs: Overlay::new(attrs),
        })
    }

    pub fn from_private(pkey: PKey<Private>) -> EngineResult<Self> {
        let algorithm = KeyAlgorithm::from_id(pkey.id());
        let attrs = KeyAttributes {
            application_label: Some(public_key_hash(&pkey)?),
            permanent: true,
            capabilities: KeyCapabilities {
                decrypt: algorithm == KeyAlgorithm::Rsa,
                derive: algorithm == KeyAlgorithm::Ec,
                sign: true,
                unwrap: algorithm == KeyAlgorithm::Rsa,
                ..KeyCapabilities::default()
            },
            ..KeyAttributes::default()
        };
        Ok(Self {
            size_bits: pkey.bits(),
            algorithm,
            material: KeyMaterial::Private(pkey),
            attrs: Overlay::new(attrs),
        })
    }

    /// Wrap existing symmetric key bytes (AES sizes only).
    pub fn symmetric(bytes: Vec<u8>) -> EngineResult<Self> {
        if !matches!(bytes.len(), 16 | 24 | 32) {
            return Err(EngineError::MalformedInput(format!(
                "unsupported symmetric key length {}",
                bytes.len()
            )));
        }
        let attrs = KeyAttributes {
            permanent: true,
            capabilities: KeyCapabilities {
                encrypt: true,
                decrypt: true,
                wrap: true,
                unwrap: true,
                ..KeyCapabilities::default()
            },
            ..KeyAttributes::default()
        };
        Ok(Self {
            size_bits: (bytes.len() * 8) as u32,
            algorithm: KeyAlgorithm::Aes,
            material: KeyMaterial::Symmetric(Zeroizing::new(bytes)),
            attrs: Overlay::new(attrs),
        })
    }

    pub fn key_class(&self) -> KeyClass {
        match self.material {
            KeyMaterial::Public(_) => KeyClass::Public,
            KeyMaterial::Private(_) => KeyClass::Private,
            KeyMaterial::Symmetric(_) => KeyClass::Symmetric,
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    pub fn size_bits(&self) -> u32 {
        self.size_bits
    }

    pub fn capabilities(&self) -> KeyCapabilities {
        self.attrs.base().capabilities
    }

    pub fn is_permanent(&self) -> bool {
        self.attrs.base().permanent
    }

    pub fn label(&self) -> Option<&str> {
        self.attrs.read(|c| c.label.as_deref(), |b| b.label.as_deref())
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        self.attrs.stage(|c| c.label = Some(label));
    }

    pub fn application_label(&self) -> Option<&[u8]> {
        self.attrs.base().application_label.as_deref()
    }

    pub fn application_tag(&self) -> Option<&[u8]> {
        self.attrs
            .read(|c| c.application_tag.as_deref(), |b| b.application_tag.as_deref())
    }

    pub fn set_application_tag(&mut self, tag: Vec<u8>) {
        self.attrs.stage(|c| c.application_tag = Some(tag));
    }

    /// SubjectPublicKeyInfo DER for asymmetric keys.
    pub fn public_key_der(&self) -> EngineResult<Vec<u8>> {
        match &self.material {
            KeyMaterial::Public(p) => Ok(p.public_key_to_der()?),
            KeyMaterial::Private(p) => Ok(p.public_key_to_der()?),
            KeyMaterial::Symmetric(_) => Err(EngineError::MalformedInput(
                "symmetric keys have no public half".into(),
            )),
        }
    }

    pub fn public_pkey(&self) -> Option<&PKey<Public>> {
        match &self.material {
            KeyMaterial::Public(p) => Some(p),
            _ => None,
        }
    }

    pub fn private_pkey(&self) -> Option<&PKey<Private>> {
        match &self.material {
            KeyMaterial::Private(p) => Some(p),
            _ => None,
        }
    }
}

impl KeychainItem for Key {
    type Attributes = KeyAttributes;
    const CLASS: ItemClass = ItemClass::Key;

    fn overlay(&self) -> &Overlay<KeyAttributes> {
        &self.attrs
    }

    fn overlay_mut(&mut self) -> &mut Overlay<KeyAttributes> {
        &mut self.attrs
    }

    fn into_item(self) -> Item {
        Item::Key(self)
    }

    fn from_item(item: Item) -> Option<Self> {
        match item {
            Item::Key(k) => Some(k),
            _ => None,
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("class", &self.key_class())
            .field("algorithm", &self.algorithm)
            .field("size_bits", &self.size_bits)
            .field("label", &self.label())
            .finish()
    }
}

/// SHA-1 over the subjectPublicKey bits, the value stores index keys by.
pub fn public_key_hash<T: openssl::pkey::HasPublic>(pkey: &PKeyRef<T>) -> Result<Vec<u8>, ErrorStack> {
    let bits = public_key_bits(pkey)?;
    Ok(hash(MessageDigest::sha1(), &bits)?.to_vec())
}

fn public_key_bits<T: openssl::pkey::HasPublic>(pkey: &PKeyRef<T>) -> Result<Vec<u8>, ErrorStack> {
    match pkey.id() {
        Id::RSA => pkey.rsa()?.public_key_to_der_pkcs1(),
        Id::EC => {
            let ec = pkey.ec_key()?;
            let mut ctx = BigNumContext::new()?;
            ec.public_key()
                .to_bytes(ec.group(), PointConversionForm::UNCOMPRESSED, &mut ctx)
        }
        Id::ED25519 | Id::ED448 | Id::X25519 | Id::X448 => pkey.raw_public_key(),
        _ => pkey.public_key_to_der(),
    }
}
