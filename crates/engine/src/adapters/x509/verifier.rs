//! `ChainVerifier` backed by OpenSSL's X509 store verification.

use std::time::{SystemTime, UNIX_EPOCH};

use openssl::stack::Stack;
use openssl::x509::store::{X509Store, X509StoreBuilder};
use openssl::x509::verify::{X509VerifyFlags, X509VerifyParam};
use openssl::x509::{X509PurposeId, X509StoreContext, X509VerifyResult, X509};
use openssl_sys as ffi;
use tracing::debug;

use super::guard::catch_panics;
use crate::domain::certificate::Certificate;
use crate::domain::error::{EngineError, EngineResult};
use crate::domain::policy::PolicyHost;
use crate::domain::trust_engine::{ChainVerifier, VerifyRequest};
use crate::domain::types::PolicyKind;
use crate::domain::verify::{FailureKind, VerifyOutcome};

#[derive(Debug, Default, Clone, Copy)]
pub struct OpenSslVerifier;

impl OpenSslVerifier {
  pub fn new() -> Self {
    Self
  }
}

impl ChainVerifier for OpenSslVerifier {
  fn verify(&self, request: &VerifyRequest<'_>) -> EngineResult<VerifyOutcome> {
    let leaf = request
      .chain
      .first()
      .ok_or_else(|| EngineError::MalformedInput("certificate chain is empty".into()))?;

    catch_panics("openssl verifier", || {
      let mut outcome = VerifyOutcome::passed();
      chain_pass(request, &mut outcome)?;
      if let Some(host) = request.host {
        hostname_pass(leaf, host, &mut outcome);
      }
      Ok(outcome)
    })
    .map_err(|e| match e {
      EngineError::OpenSsl(stack) => EngineError::PlatformVerification(stack.to_string()),
      other => other,
    })
  }
}

/// Checks lifted after a recoverable failure so the remaining checks still run.
#[derive(Debug, Default, Clone, Copy)]
struct Relaxed {
  ignore_time: bool,
  trust_top: bool,
  any_purpose: bool,
}

impl Relaxed {
  /// Lift the check behind `kind`. False when nothing is left to lift.
  fn lift(&mut self, kind: FailureKind) -> bool {
    let flag = match kind {
      FailureKind::Expired | FailureKind::NotYetValid => &mut self.ignore_time,
      FailureKind::IssuerNotFound | FailureKind::UntrustedRoot | FailureKind::SelfSignedLeaf => {
        &mut self.trust_top
      }
      FailureKind::InvalidPurpose => &mut self.any_purpose,
      _ => return false,
    };
    !std::mem::replace(flag, true)
  }
}

/// Full path validation against the anchors at the requested instant.
///
/// OpenSSL stops at the first error, so each recoverable failure is recorded
/// and the pass repeated with that check lifted until the chain verifies or a
/// failure nothing can lift is found.
fn chain_pass(request: &VerifyRequest<'_>, outcome: &mut VerifyOutcome) -> EngineResult<()> {
  let (leaf, rest) = match request.chain.split_first() {
    Some(parts) => parts,
    None => return Ok(()),
  };
  let mut relaxed = Relaxed::default();
  loop {
    let store = chain_store(request, relaxed)?;
    let (ok, code, depth) = run(&store, leaf.x509(), rest)?;
    if ok {
      return Ok(());
    }
    let kind = failure_kind(code);
    debug!(code = code.as_raw(), depth, ?kind, ?relaxed, "chain verification failed");
    outcome.push(kind, depth as usize, code.error_string());
    if !relaxed.lift(kind) {
      return Ok(());
    }
  }
}

fn chain_store(request: &VerifyRequest<'_>, relaxed: Relaxed) -> EngineResult<X509Store> {
  let mut builder = X509StoreBuilder::new()?;
  for anchor in request.anchors {
    builder.add_cert(anchor.x509().clone())?;
  }
  if relaxed.trust_top {
    if let Some(top) = request.chain.last().filter(|c| !request.anchors.contains(c)) {
      builder.add_cert(top.x509().clone())?;
    }
  }

  let mut param = X509VerifyParam::new()?;
  param.set_depth(i32::try_from(request.max_depth).unwrap_or(i32::MAX));
  // Anchors need not be self-signed.
  let mut flags = X509VerifyFlags::PARTIAL_CHAIN;
  if relaxed.ignore_time {
    // An explicit check time would override NO_CHECK_TIME.
    flags |= X509VerifyFlags::NO_CHECK_TIME;
  } else {
    param.set_time(unix_seconds(request.at) as _);
  }
  param.set_flags(flags)?;
  builder.set_param(&param)?;

  if !relaxed.any_purpose {
    match request.kind {
      PolicyKind::SslServer => builder.set_purpose(X509PurposeId::SSL_SERVER)?,
      PolicyKind::SslClient => builder.set_purpose(X509PurposeId::SSL_CLIENT)?,
      PolicyKind::BasicX509 => {}
    }
  }
  Ok(builder.build())
}

/// Name check on the leaf alone, independent of chain validity.
fn hostname_pass(leaf: &Certificate, host: &PolicyHost, outcome: &mut VerifyOutcome) {
  if host.matches(leaf) {
    return;
  }
  debug!(?host, "hostname does not match leaf");
  let message = match host {
    PolicyHost::Dns(_) => "hostname mismatch",
    PolicyHost::Ip(_) => "IP address mismatch",
  };
  outcome.push(FailureKind::HostnameMismatch, 0, message);
}

fn run(store: &X509Store, leaf: &X509, untrusted: &[Certificate]) -> EngineResult<(bool, X509VerifyResult, u32)> {
  let mut stack = Stack::new()?;
  for cert in untrusted {
    stack.push(cert.x509().clone())?;
  }
  let mut ctx = X509StoreContext::new()?;
  let out = ctx.init(store, leaf, &stack, |c| {
    let ok = c.verify_cert()?;
    Ok((ok, c.error(), c.error_depth()))
  })?;
  Ok(out)
}

fn unix_seconds(at: SystemTime) -> i64 {
  match at.duration_since(UNIX_EPOCH) {
    Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
    Err(before) => -i64::try_from(before.duration().as_secs()).unwrap_or(i64::MAX),
  }
}

/// Map a raw OpenSSL verify code onto the engine's failure kinds.
pub fn failure_kind(code: X509VerifyResult) -> FailureKind {
  match code.as_raw() {
    ffi::X509_V_ERR_CERT_HAS_EXPIRED => FailureKind::Expired,
    ffi::X509_V_ERR_CERT_NOT_YET_VALID => FailureKind::NotYetValid,
    ffi::X509_V_ERR_HOSTNAME_MISMATCH | ffi::X509_V_ERR_IP_ADDRESS_MISMATCH => FailureKind::HostnameMismatch,
    ffi::X509_V_ERR_UNABLE_TO_GET_ISSUER_CERT
    | ffi::X509_V_ERR_UNABLE_TO_GET_ISSUER_CERT_LOCALLY
    | ffi::X509_V_ERR_UNABLE_TO_VERIFY_LEAF_SIGNATURE => FailureKind::IssuerNotFound,
    ffi::X509_V_ERR_SELF_SIGNED_CERT_IN_CHAIN
    | ffi::X509_V_ERR_CERT_UNTRUSTED
    | ffi::X509_V_ERR_CERT_REJECTED => FailureKind::UntrustedRoot,
    ffi::X509_V_ERR_DEPTH_ZERO_SELF_SIGNED_CERT => FailureKind::SelfSignedLeaf,
    ffi::X509_V_ERR_INVALID_PURPOSE => FailureKind::InvalidPurpose,
    ffi::X509_V_ERR_UNABLE_TO_GET_CRL
    | ffi::X509_V_ERR_CRL_HAS_EXPIRED
    | ffi::X509_V_ERR_CRL_NOT_YET_VALID => FailureKind::RevocationUnavailable,
    ffi::X509_V_ERR_CERT_CHAIN_TOO_LONG => FailureKind::ChainUnresolvable,
    ffi::X509_V_ERR_CERT_SIGNATURE_FAILURE | ffi::X509_V_ERR_CRL_SIGNATURE_FAILURE => {
      FailureKind::SignatureFailure
    }
    ffi::X509_V_ERR_CERT_REVOKED => FailureKind::Revoked,
    ffi::X509_V_ERR_INVALID_CA => FailureKind::InvalidCa,
    ffi::X509_V_ERR_PATH_LENGTH_EXCEEDED => FailureKind::PathLengthExceeded,
    ffi::X509_V_ERR_PERMITTED_VIOLATION | ffi::X509_V_ERR_EXCLUDED_VIOLATION => {
      FailureKind::NameConstraintViolation
    }
    ffi::X509_V_ERR_UNHANDLED_CRITICAL_EXTENSION => FailureKind::UnhandledCriticalExtension,
    ffi::X509_V_ERR_UNABLE_TO_DECRYPT_CERT_SIGNATURE
    | ffi::X509_V_ERR_UNABLE_TO_DECODE_ISSUER_PUBLIC_KEY
    | ffi::X509_V_ERR_ERROR_IN_CERT_NOT_BEFORE_FIELD
    | ffi::X509_V_ERR_ERROR_IN_CERT_NOT_AFTER_FIELD => FailureKind::Malformed,
    _ => FailureKind::Unknown,
  }
}
