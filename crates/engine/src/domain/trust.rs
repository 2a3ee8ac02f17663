// crates/engine/src/domain/trust.rs

//! The trust evaluator: assemble a chain, verify it under a policy, and
//! classify the outcome.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use super::anchors::{AnchorSelection, AnchorSet};
use super::certificate::Certificate;
use super::chain::{AssembledChain, ChainAssembler};
use super::error::{EngineError, EngineResult};
use super::policy::Policy;
use super::trust_engine::VerifyRequest;
use super::types::{TrustResult, TrustSetting};
use super::verify::{classify, CertInfo, DecisionInfo, FailureKind, TrustReport, VerifyOutcome};
use crate::crypto::key::Key;
use crate::platform::Platform;
use crate::store::SearchList;

/// Result of a successful `evaluate` call.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub result: TrustResult,
    pub chain: AssembledChain,
    pub outcome: VerifyOutcome,
    /// Chain index and value of the explicit decision applied, if any.
    pub decision: Option<(usize, TrustSetting)>,
    pub verify_time: SystemTime,
    pub public_key: Option<Key>,
}

#[derive(Debug, Clone, Default)]
pub enum TrustState {
    #[default]
    Unevaluated,
    Evaluated(Evaluation),
    /// Evaluation could not run. `result` is the status the error maps to.
    EvaluationFailed { result: TrustResult, reason: String },
}

/// A trust evaluation request for one candidate chain under one policy.
///
/// Changing anchors, keychains or the verify date discards any previous
/// evaluation.
#[derive(Debug)]
pub struct Trust {
    platform: Arc<Platform>,
    candidates: Vec<Certificate>,
    policy: Policy,
    anchors: AnchorSelection,
    search_list: SearchList,
    state: TrustState,
}

impl Trust {
    pub fn new(candidates: Vec<Certificate>, policy: Policy) -> Self {
        Self {
            platform: Platform::shared(),
            candidates,
            policy,
            anchors: AnchorSelection::default(),
            search_list: SearchList::Default,
            state: TrustState::Unevaluated,
        }
    }

    pub fn for_basic_x509(candidates: Vec<Certificate>) -> Self {
        Self::new(candidates, Policy::basic_x509())
    }

    pub fn for_ssl_server(candidates: Vec<Certificate>, hostname: impl Into<String>) -> Self {
        Self::new(candidates, Policy::ssl_server(hostname))
    }

    pub fn for_ssl_client(candidates: Vec<Certificate>, hostname: impl Into<String>) -> Self {
        Self::new(candidates, Policy::ssl_client(hostname))
    }

    /// Evaluate against `platform` instead of the shared one.
    pub fn with_platform(mut self, platform: Arc<Platform>) -> Self {
        self.platform = platform;
        self.state = TrustState::Unevaluated;
        self
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn candidates(&self) -> &[Certificate] {
        &self.candidates
    }

    /// Snapshot of the platform's system anchors.
    pub fn system_anchors(&self) -> AnchorSet {
        self.platform.system_anchors().clone()
    }

    /// The effective anchor set.
    pub fn anchors(&self) -> AnchorSet {
        self.anchors.effective(self.platform.system_anchors())
    }

    /// Replace the effective anchors. `Some` stops trusting the system
    /// anchors; `None` goes back to them.
    pub fn set_anchors(&mut self, anchors: Option<Vec<Certificate>>) {
        self.anchors.replace(anchors);
        self.invalidate();
    }

    pub fn add_custom_anchors(&mut self, anchors: impl IntoIterator<Item = Certificate>) {
        self.anchors.add_custom(anchors);
        self.invalidate();
    }

    pub fn search_list(&self) -> &SearchList {
        &self.search_list
    }

    pub fn set_keychains(&mut self, search_list: SearchList) {
        self.search_list = search_list;
        self.invalidate();
    }

    /// Verification instant. Reading it fixes "now" for this request.
    pub fn verify_date(&self) -> SystemTime {
        self.policy.verify_date()
    }

    pub fn set_verify_date(&mut self, date: Option<SystemTime>) {
        self.policy.set_verify_date(date);
        self.invalidate();
    }

    /// Run chain assembly and verification from scratch.
    ///
    /// Trust failures are returned as `Ok` results. `Err` means evaluation
    /// could not run (malformed input, verifier breakdown); the state then
    /// moves to [`TrustState::EvaluationFailed`].
    pub fn evaluate(&mut self) -> EngineResult<TrustResult> {
        match self.run() {
            Ok(evaluation) => {
                let result = evaluation.result;
                self.state = TrustState::Evaluated(evaluation);
                Ok(result)
            }
            Err(e) => {
                warn!(error = %e, policy = self.policy.kind().as_str(), "trust evaluation failed");
                self.state = TrustState::EvaluationFailed {
                    result: e.trust_result(),
                    reason: e.to_string(),
                };
                Err(e)
            }
        }
    }

    fn run(&self) -> EngineResult<Evaluation> {
        if self.candidates.is_empty() {
            return Err(EngineError::MalformedInput("certificate chain is empty".into()));
        }
        let host = self.policy.validate()?;
        let at = self.policy.verify_date();
        let anchors = self.anchors();
        let keychains = self.search_list.resolve(self.platform.default_search_list());
        let max_depth = self.platform.limits().max_chain_depth;

        let chain = ChainAssembler::new(&anchors, keychains, max_depth).assemble(&self.candidates)?;
        debug!(
            length = chain.len(),
            status = ?chain.status,
            anchors = anchors.len(),
            keychains = keychains.len(),
            "chain assembled"
        );

        let request = VerifyRequest {
            chain: &chain.certificates,
            anchors: &anchors,
            kind: self.policy.kind(),
            host: host.as_ref(),
            at,
            max_depth,
        };
        let mut outcome = self.platform.verifier().verify(&request)?;

        if let Some(err) = chain.unresolved() {
            debug!(error = %err, "chain unresolvable");
            outcome.push(FailureKind::ChainUnresolvable, chain.len() - 1, err.to_string());
        }

        let decision = self
            .platform
            .trust_settings()
            .closest_decision(&chain.certificates, self.policy.kind());
        let result = classify(decision.map(|(_, s)| s), &outcome);

        let public_key = match chain.leaf().public_key() {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(error = %e, "leaf public key unavailable");
                None
            }
        };

        info!(
            policy = self.policy.kind().as_str(),
            result = ?result,
            chain_length = chain.len(),
            failures = outcome.failures.len(),
            "trust evaluated"
        );

        Ok(Evaluation {
            result,
            chain,
            outcome,
            decision,
            verify_time: at,
            public_key,
        })
    }

    fn invalidate(&mut self) {
        self.state = TrustState::Unevaluated;
    }

    pub fn state(&self) -> &TrustState {
        &self.state
    }

    pub fn result(&self) -> Option<TrustResult> {
        match &self.state {
            TrustState::Evaluated(e) => Some(e.result),
            TrustState::EvaluationFailed { result, .. } => Some(*result),
            TrustState::Unevaluated => None,
        }
    }

    fn evaluation(&self) -> Option<&Evaluation> {
        match &self.state {
            TrustState::Evaluated(e) => Some(e),
            _ => None,
        }
    }

    /// The resolved chain; empty unless evaluated.
    pub fn certificate_chain(&self) -> &[Certificate] {
        self.evaluation()
            .map(|e| e.chain.certificates.as_slice())
            .unwrap_or(&[])
    }

    /// The leaf's public key; `None` unless evaluated.
    pub fn public_key(&self) -> Option<&Key> {
        self.evaluation().and_then(|e| e.public_key.as_ref())
    }

    pub fn report(&self) -> Option<TrustReport> {
        let e = self.evaluation()?;
        let verify_time = match e.verify_time.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(before) => -(before.duration().as_secs() as i64),
        };
        Some(TrustReport {
            policy: self.policy.kind(),
            hostname: self.policy.hostname().map(str::to_string),
            result: e.result,
            verify_time,
            chain_status: e.chain.status,
            chain: e.chain.certificates.iter().map(CertInfo::from).collect(),
            failures: e.outcome.failures.clone(),
            store_failures: e.chain.store_failures.clone(),
            decision: e.decision.map(|(depth, setting)| DecisionInfo { depth, setting }),
        })
    }
}
