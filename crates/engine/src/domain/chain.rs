// crates/engine/src/domain/chain.rs

//! Chain assembly: connect a leaf to an anchor by searching the candidate
//! chain, the anchor set and the configured keychains.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::anchors::AnchorSet;
use super::certificate::Certificate;
use super::error::{EngineError, EngineResult};
use crate::store::Keychain;

/// Why assembly stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStatus {
    /// Reached a self-signed certificate.
    Anchored,
    /// No issuer found for the last certificate.
    Partial,
    /// The next issuer is already on the chain.
    Cycle,
    /// Hit the configured depth limit.
    DepthExceeded,
}

impl ChainStatus {
    pub fn is_resolved(self) -> bool {
        self == ChainStatus::Anchored
    }
}

/// A keychain that could not be searched during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreFailure {
    pub store: String,
    pub reason: String,
}

/// Best-effort chain from the leaf (index 0) towards an anchor.
#[derive(Debug, Clone)]
pub struct AssembledChain {
    pub certificates: Vec<Certificate>,
    pub status: ChainStatus,
    pub store_failures: Vec<StoreFailure>,
}

impl AssembledChain {
    /// `assemble` never yields an empty chain.
    pub fn leaf(&self) -> &Certificate {
        &self.certificates[0]
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Error describing a cycle or depth stop. Partial chains are left to the
    /// verifier, which reports the missing issuer itself.
    pub fn unresolved(&self) -> Option<EngineError> {
        let top = self.certificates.last()?.subject_summary();
        match self.status {
            ChainStatus::Cycle => Some(EngineError::ChainUnresolvable(format!("issuer cycle above {top}"))),
            ChainStatus::DepthExceeded => Some(EngineError::ChainUnresolvable(format!(
                "depth limit reached at {top} after {} certificates",
                self.len()
            ))),
            ChainStatus::Anchored | ChainStatus::Partial => None,
        }
    }
}

/// Where an issuer was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Candidates,
    Anchors,
    Keychain(usize),
}

pub struct ChainAssembler<'a> {
    anchors: &'a AnchorSet,
    keychains: &'a [Arc<dyn Keychain>],
    max_depth: usize,
}

impl<'a> ChainAssembler<'a> {
    pub fn new(anchors: &'a AnchorSet, keychains: &'a [Arc<dyn Keychain>], max_depth: usize) -> Self {
        Self {
            anchors,
            keychains,
            max_depth: max_depth.max(1),
        }
    }

    /// Assemble from `candidates[0]` (the leaf). Later candidates may be in any
    /// order and need not all belong to the chain.
    pub fn assemble(&self, candidates: &[Certificate]) -> EngineResult<AssembledChain> {
        let (leaf, rest) = candidates
            .split_first()
            .ok_or_else(|| EngineError::MalformedInput("certificate chain is empty".into()))?;

        let mut remaining: Vec<Certificate> = rest.to_vec();
        let mut chain = vec![leaf.clone()];
        let mut store_failures = Vec::new();

        let status = loop {
            let tail = &chain[chain.len() - 1];
            if tail.is_self_issued() {
                break ChainStatus::Anchored;
            }
            if chain.len() >= self.max_depth {
                warn!(max_depth = self.max_depth, "chain assembly hit depth limit");
                break ChainStatus::DepthExceeded;
            }

            let issuer = tail.issuer().to_vec();
            let Some((next, source)) = self.find_issuer(&issuer, &mut remaining, &mut store_failures)
            else {
                debug!(depth = chain.len(), issuer = %tail.issuer_string(), "no issuer found");
                break ChainStatus::Partial;
            };

            if chain.iter().any(|c| c.same_identity(&next)) {
                warn!(subject = %next.subject_string(), "certificate chain loops back on itself");
                break ChainStatus::Cycle;
            }
            debug!(depth = chain.len(), subject = %next.subject_string(), ?source, "issuer found");
            chain.push(next);
        };

        Ok(AssembledChain {
            certificates: chain,
            status,
            store_failures,
        })
    }

    fn find_issuer(
        &self,
        issuer: &[u8],
        remaining: &mut Vec<Certificate>,
        failures: &mut Vec<StoreFailure>,
    ) -> Option<(Certificate, Source)> {
        if let Some(pos) = remaining.iter().position(|c| c.subject() == issuer) {
            return Some((remaining.remove(pos), Source::Candidates));
        }
        if let Some(anchor) = self.anchors.find_by_subject(issuer) {
            return Some((anchor.clone(), Source::Anchors));
        }
        for (i, keychain) in self.keychains.iter().enumerate() {
            match keychain.find_certificate(issuer) {
                Ok(Some(found)) => return Some((found, Source::Keychain(i))),
                Ok(None) => {}
                Err(e) => {
                    warn!(store = keychain.name(), error = %e, "keychain search failed, skipping");
                    let failure = StoreFailure {
                        store: keychain.name().to_string(),
                        reason: e.to_string(),
                    };
                    if !failures.contains(&failure) {
                        failures.push(failure);
                    }
                }
            }
        }
        None
    }
}
