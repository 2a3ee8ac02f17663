use serde::{Deserialize, Serialize};

/// Verification policies supported by the trust evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    BasicX509,
    SslServer,
    SslClient,
}

impl PolicyKind {
    /// SSL policies additionally match a hostname against the leaf.
    pub fn requires_hostname(self) -> bool {
        matches!(self, PolicyKind::SslServer | PolicyKind::SslClient)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKind::BasicX509 => "basic_x509",
            PolicyKind::SslServer => "ssl_server",
            PolicyKind::SslClient => "ssl_client",
        }
    }
}

/// X.509 version tag of a certificate (kSecAttrCertificateType).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CertificateType {
    X509v1,
    X509v2,
    X509v3,
}

impl CertificateType {
    /// Map OpenSSL's zero-based version field.
    pub fn from_version(version: i32) -> Self {
        match version {
            0 => CertificateType::X509v1,
            1 => CertificateType::X509v2,
            _ => CertificateType::X509v3,
        }
    }
}

/// Encoding tag of a certificate (kSecAttrCertificateEncoding).
/// Certificates are only ever constructed from DER.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CertificateEncoding {
    Der,
}
