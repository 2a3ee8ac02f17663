mod common;

use std::sync::Arc;

use common::*;
use keyhold_engine::{
    AnchorSet, ChainStatus, ChainVerifier, EngineError, FailureKind, Keychain, MemoryKeychain, Platform,
    PolicyKind, SearchList, Trust, TrustResult, TrustSetting, TrustSettings, TrustState,
    VerifyOutcome, VerifyRequest,
};

/// Trust over `chain` on an isolated platform, anchored at `anchors`, searching nothing.
fn basic(chain: &[&Issued], anchors: &[&Issued]) -> Trust {
    let mut trust = Trust::for_basic_x509(chain.iter().map(|i| i.certificate()).collect())
        .with_platform(isolated());
    trust.set_anchors(Some(anchors.iter().map(|i| i.certificate()).collect()));
    trust.set_keychains(SearchList::disabled());
    trust.set_verify_date(Some(inside_window()));
    trust
}

fn failure_kinds(trust: &Trust) -> Vec<FailureKind> {
    trust
        .report()
        .expect("report")
        .failures
        .iter()
        .map(|f| f.kind)
        .collect()
}

#[test]
fn self_signed_leaf_without_anchors_is_not_trusted() {
    let ss = self_signed_leaf("lonely.example", &["lonely.example"]);
    let mut trust = basic(&[&ss], &[]);

    let result = trust.evaluate().expect("evaluate");
    assert_eq!(result, TrustResult::RecoverableTrustFailure);
    assert_eq!(trust.certificate_chain().len(), 1);
    assert_eq!(failure_kinds(&trust), vec![FailureKind::SelfSignedLeaf]);
}

#[test]
fn leaf_signed_by_anchor_resolves_to_two_certificates() {
    let root = root_ca("Root A");
    let leaf = leaf("leaf", &["leaf.example"], &root);
    let mut trust = basic(&[&leaf], &[&root]);

    let result = trust.evaluate().expect("evaluate");
    assert_eq!(result, TrustResult::Unspecified);

    let chain = trust.certificate_chain();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0], leaf.certificate());
    assert_eq!(chain[1], root.certificate());
    assert_eq!(trust.report().unwrap().chain_status, ChainStatus::Anchored);
}

#[test]
fn validity_window_is_checked_at_the_verify_date() {
    let root = root_ca("Root A");
    let leaf = leaf_valid("leaf", &["leaf.example"], &root, (2024, 1, 1), (2025, 1, 1));

    let mut trust = basic(&[&leaf], &[&root]);
    trust.set_verify_date(Some(at(2023, 6, 1)));
    assert_eq!(trust.evaluate().unwrap(), TrustResult::RecoverableTrustFailure);
    assert_eq!(failure_kinds(&trust), vec![FailureKind::NotYetValid]);

    trust.set_verify_date(Some(at(2026, 6, 1)));
    assert_eq!(trust.evaluate().unwrap(), TrustResult::RecoverableTrustFailure);
    assert_eq!(failure_kinds(&trust), vec![FailureKind::Expired]);

    trust.set_verify_date(Some(at(2024, 6, 1)));
    assert_eq!(trust.evaluate().unwrap(), TrustResult::Unspecified);
}

#[test]
fn ssl_server_hostname_must_match() {
    let root = root_ca("Root A");
    let leaf = leaf("www", &["www.example.com"], &root);

    let run = |host: &str| {
        let mut trust = Trust::for_ssl_server(vec![leaf.certificate()], host).with_platform(isolated());
        trust.set_anchors(Some(vec![root.certificate()]));
        trust.set_verify_date(Some(inside_window()));
        trust.evaluate().expect("evaluate")
    };

    assert_eq!(run("www.example.com"), TrustResult::Unspecified);
    assert_eq!(run("WWW.EXAMPLE.COM"), TrustResult::Unspecified);
    assert_eq!(run("mail.example.com"), TrustResult::RecoverableTrustFailure);
    assert_eq!(run("10.0.0.1"), TrustResult::RecoverableTrustFailure);
}

#[test]
fn hostname_mismatch_is_recoverable_even_when_chain_is_broken() {
    let root = root_ca("Root A");
    let leaf = leaf("www", &["www.example.com"], &root);
    let broken = keyhold_engine::Certificate::from_der(&tampered(&leaf.der)).unwrap();

    let mut trust = Trust::for_ssl_server(vec![broken], "elsewhere.example.com").with_platform(isolated());
    trust.set_anchors(Some(vec![root.certificate()]));
    trust.set_verify_date(Some(inside_window()));

    assert_eq!(trust.evaluate().unwrap(), TrustResult::RecoverableTrustFailure);
    let kinds = failure_kinds(&trust);
    assert!(kinds.contains(&FailureKind::HostnameMismatch));
    assert!(kinds.contains(&FailureKind::SignatureFailure));
}

#[test]
fn hostname_mismatch_is_reported_when_leaf_extensions_are_rejected() {
    let root = root_ca("Root A");
    let leaf = leaf_with_unknown_critical_extension("www", &["www.example.com"], &root);

    let run = |host: &str| {
        let mut trust = Trust::for_ssl_server(vec![leaf.certificate()], host).with_platform(isolated());
        trust.set_anchors(Some(vec![root.certificate()]));
        trust.set_verify_date(Some(inside_window()));
        let result = trust.evaluate().expect("evaluate");
        (result, failure_kinds(&trust))
    };

    let (result, kinds) = run("mail.other.org");
    assert_eq!(result, TrustResult::RecoverableTrustFailure);
    assert!(kinds.contains(&FailureKind::HostnameMismatch));
    assert!(kinds.contains(&FailureKind::UnhandledCriticalExtension));

    let (result, kinds) = run("www.example.com");
    assert_eq!(result, TrustResult::FatalTrustFailure);
    assert_eq!(kinds, vec![FailureKind::UnhandledCriticalExtension]);
}

#[test]
fn wildcard_names_cover_exactly_one_label() {
    let root = root_ca("Root A");
    let leaf = leaf("wild", &["*.example.com"], &root);

    let run = |host: &str| {
        let mut trust = Trust::for_ssl_server(vec![leaf.certificate()], host).with_platform(isolated());
        trust.set_anchors(Some(vec![root.certificate()]));
        trust.set_verify_date(Some(inside_window()));
        trust.evaluate().expect("evaluate")
    };

    assert_eq!(run("api.example.com"), TrustResult::Unspecified);
    assert_eq!(run("example.com"), TrustResult::RecoverableTrustFailure);
    assert_eq!(run("a.b.example.com"), TrustResult::RecoverableTrustFailure);
}

#[test]
fn ssl_client_policy_checks_hostname_too() {
    let root = root_ca("Root A");
    let leaf = leaf("client", &["client.example.com"], &root);
    let mut trust = Trust::for_ssl_client(vec![leaf.certificate()], "other.example.com").with_platform(isolated());
    trust.set_anchors(Some(vec![root.certificate()]));
    trust.set_verify_date(Some(inside_window()));
    assert_eq!(trust.evaluate().unwrap(), TrustResult::RecoverableTrustFailure);
    assert_eq!(trust.report().unwrap().policy, PolicyKind::SslClient);
}

#[test]
fn broken_signature_is_fatal() {
    let root = root_ca("Root A");
    let leaf = leaf("leaf", &["leaf.example"], &root);
    let broken = keyhold_engine::Certificate::from_der(&tampered(&leaf.der)).unwrap();

    let mut trust = Trust::for_basic_x509(vec![broken]).with_platform(isolated());
    trust.set_anchors(Some(vec![root.certificate()]));
    trust.set_verify_date(Some(inside_window()));

    assert_eq!(trust.evaluate().unwrap(), TrustResult::FatalTrustFailure);
    assert_eq!(failure_kinds(&trust), vec![FailureKind::SignatureFailure]);
}

#[test]
fn fatal_failure_below_a_recoverable_one_is_still_found() {
    let root = root_ca("Root A");
    let inter = intermediate_valid("Intermediate A", &root, (2020, 1, 1), (2021, 1, 1));
    let leaf = leaf("leaf", &["leaf.example"], &inter);
    let broken = keyhold_engine::Certificate::from_der(&tampered(&leaf.der)).unwrap();

    let mut trust = Trust::for_basic_x509(vec![broken, inter.certificate()]).with_platform(isolated());
    trust.set_anchors(Some(vec![root.certificate()]));
    trust.set_keychains(SearchList::disabled());
    trust.set_verify_date(Some(inside_window()));

    assert_eq!(trust.evaluate().unwrap(), TrustResult::FatalTrustFailure);
    assert_eq!(
        failure_kinds(&trust),
        vec![FailureKind::Expired, FailureKind::SignatureFailure]
    );
    let report = trust.report().unwrap();
    assert_eq!(report.failures[0].depth, 1);
    assert_eq!(report.failures[1].depth, 0);
}

#[test]
fn recoverable_failures_accumulate_without_turning_fatal() {
    let root = root_ca("Root A");
    let inter = intermediate_valid("Intermediate A", &root, (2020, 1, 1), (2021, 1, 1));
    let leaf = leaf("leaf", &["leaf.example"], &inter);
    let mut trust = basic(&[&leaf, &inter], &[&root]);

    assert_eq!(trust.evaluate().unwrap(), TrustResult::RecoverableTrustFailure);
    assert_eq!(failure_kinds(&trust), vec![FailureKind::Expired]);

    trust.set_verify_date(Some(at(2020, 6, 1)));
    assert_eq!(trust.evaluate().unwrap(), TrustResult::Unspecified);
}

#[test]
fn identical_inputs_give_identical_results() {
    let root = root_ca("Root A");
    let good = leaf("good", &["good.example"], &root);
    let expired = leaf_valid("old", &["old.example"], &root, (2000, 1, 1), (2001, 1, 1));

    for issued in [&good, &expired] {
        let mut a = basic(&[issued], &[&root]);
        let mut b = basic(&[issued], &[&root]);
        assert_eq!(a.evaluate().unwrap(), b.evaluate().unwrap());
        assert_eq!(a.certificate_chain(), b.certificate_chain());
    }
}

#[test]
fn evaluate_recomputes_from_scratch() {
    let root = root_ca("Root A");
    let leaf = leaf("leaf", &["leaf.example"], &root);
    let mut trust = basic(&[&leaf], &[&root]);

    assert_eq!(trust.evaluate().unwrap(), TrustResult::Unspecified);
    assert_eq!(trust.evaluate().unwrap(), TrustResult::Unspecified);

    trust.set_anchors(Some(Vec::new()));
    assert_eq!(trust.evaluate().unwrap(), TrustResult::RecoverableTrustFailure);
    assert_eq!(trust.certificate_chain().len(), 1);
}

#[test]
fn system_anchors_are_used_by_default() {
    let root = root_ca("System Root");
    let leaf = leaf("leaf", &["leaf.example"], &root);
    let platform = Platform::isolated().with_system_anchors([root.certificate()].into_iter().collect());

    let mut trust = Trust::for_basic_x509(vec![leaf.certificate()]).with_platform(Arc::new(platform));
    trust.set_verify_date(Some(inside_window()));
    assert_eq!(trust.system_anchors().len(), 1);
    assert_eq!(trust.anchors().len(), 1);
    assert_eq!(trust.evaluate().unwrap(), TrustResult::Unspecified);
}

#[test]
fn add_custom_anchors_only_adds() {
    let system_root = root_ca("System Root");
    let custom_root = root_ca("Custom Root");
    let system_leaf = leaf("s", &["s.example"], &system_root);
    let custom_leaf = leaf("c", &["c.example"], &custom_root);
    let platform = Arc::new(
        Platform::isolated().with_system_anchors([system_root.certificate()].into_iter().collect()),
    );

    let evaluate = |issued: &Issued, extra: Option<&Issued>| {
        let mut trust = Trust::for_basic_x509(vec![issued.certificate()]).with_platform(platform.clone());
        trust.set_verify_date(Some(inside_window()));
        if let Some(extra) = extra {
            trust.add_custom_anchors([extra.certificate()]);
        }
        (trust.evaluate().unwrap(), trust.certificate_chain().len(), trust.anchors().len())
    };

    assert_eq!(evaluate(&system_leaf, None), (TrustResult::Unspecified, 2, 1));
    assert_eq!(evaluate(&system_leaf, Some(&custom_root)), (TrustResult::Unspecified, 2, 2));
    assert_eq!(evaluate(&custom_leaf, None), (TrustResult::RecoverableTrustFailure, 1, 1));
    assert_eq!(evaluate(&custom_leaf, Some(&custom_root)), (TrustResult::Unspecified, 2, 2));
    // Duplicates collapse by identity.
    assert_eq!(evaluate(&system_leaf, Some(&system_root)).2, 1);
}

#[test]
fn replacing_anchors_drops_system_trust() {
    let system_root = root_ca("System Root");
    let custom_root = root_ca("Custom Root");
    let system_leaf = leaf("s", &["s.example"], &system_root);
    let platform = Arc::new(
        Platform::isolated().with_system_anchors([system_root.certificate()].into_iter().collect()),
    );

    let mut trust = Trust::for_basic_x509(vec![system_leaf.certificate()]).with_platform(platform);
    trust.set_verify_date(Some(inside_window()));
    trust.set_anchors(Some(vec![custom_root.certificate()]));
    assert_eq!(trust.evaluate().unwrap(), TrustResult::RecoverableTrustFailure);

    // Copy the system set and layer onto it.
    let mut layered: Vec<_> = trust.system_anchors().iter().cloned().collect();
    layered.push(custom_root.certificate());
    trust.set_anchors(Some(layered));
    assert_eq!(trust.evaluate().unwrap(), TrustResult::Unspecified);

    trust.set_anchors(None);
    assert_eq!(trust.anchors().len(), 1);
    assert_eq!(trust.evaluate().unwrap(), TrustResult::Unspecified);
}

#[test]
fn closest_explicit_decision_wins() {
    let root = root_ca("Root A");
    let leaf = leaf("leaf", &["leaf.example"], &root);

    let mut settings = TrustSettings::new();
    settings.set(&root.certificate(), TrustSetting::AlwaysTrust, None);
    settings.set(&leaf.certificate(), TrustSetting::NeverTrust, None);
    let platform = Arc::new(Platform::isolated().with_trust_settings(settings));

    let mut trust = Trust::for_basic_x509(vec![leaf.certificate()]).with_platform(platform);
    trust.set_anchors(Some(vec![root.certificate()]));
    trust.set_verify_date(Some(inside_window()));

    assert_eq!(trust.evaluate().unwrap(), TrustResult::Deny);
    let decision = trust.report().unwrap().decision.expect("decision");
    assert_eq!(decision.depth, 0);
    assert_eq!(decision.setting, TrustSetting::NeverTrust);
}

#[test]
fn explicit_decision_overrides_trust_failures() {
    let root = root_ca("Root A");
    let expired = leaf_valid("old", &["old.example"], &root, (2000, 1, 1), (2001, 1, 1));

    let mut settings = TrustSettings::new();
    settings.set(&root.certificate(), TrustSetting::AlwaysTrust, None);
    let platform = Arc::new(Platform::isolated().with_trust_settings(settings));

    let mut trust = Trust::for_basic_x509(vec![expired.certificate()]).with_platform(platform.clone());
    trust.set_anchors(Some(vec![root.certificate()]));
    trust.set_verify_date(Some(inside_window()));
    assert_eq!(trust.evaluate().unwrap(), TrustResult::Proceed);
    assert_eq!(failure_kinds(&trust), vec![FailureKind::Expired]);

    let mut confirm = TrustSettings::new();
    confirm.set(&expired.certificate(), TrustSetting::Confirm, None);
    let mut trust = Trust::for_basic_x509(vec![expired.certificate()])
        .with_platform(Arc::new(Platform::isolated().with_trust_settings(confirm)));
    trust.set_anchors(Some(vec![root.certificate()]));
    trust.set_verify_date(Some(inside_window()));
    assert_eq!(trust.evaluate().unwrap(), TrustResult::Confirm);
}

#[test]
fn decisions_scoped_to_other_policies_are_ignored() {
    let root = root_ca("Root A");
    let leaf = leaf("leaf", &["leaf.example"], &root);

    let mut settings = TrustSettings::new();
    settings.set(&leaf.certificate(), TrustSetting::NeverTrust, Some(vec![PolicyKind::SslServer]));
    let platform = Arc::new(Platform::isolated().with_trust_settings(settings));

    let mut basic = Trust::for_basic_x509(vec![leaf.certificate()]).with_platform(platform.clone());
    basic.set_anchors(Some(vec![root.certificate()]));
    basic.set_verify_date(Some(inside_window()));
    assert_eq!(basic.evaluate().unwrap(), TrustResult::Unspecified);

    let mut ssl = Trust::for_ssl_server(vec![leaf.certificate()], "leaf.example").with_platform(platform);
    ssl.set_anchors(Some(vec![root.certificate()]));
    ssl.set_verify_date(Some(inside_window()));
    assert_eq!(ssl.evaluate().unwrap(), TrustResult::Deny);
}

#[test]
fn empty_chain_fails_evaluation() {
    let mut trust = Trust::for_basic_x509(Vec::new()).with_platform(isolated());
    let err = trust.evaluate().unwrap_err();
    assert!(matches!(err, EngineError::MalformedInput(_)));
    assert_eq!(err.trust_result(), TrustResult::Invalid);
    match trust.state() {
        TrustState::EvaluationFailed { result, .. } => assert_eq!(*result, TrustResult::Invalid),
        other => panic!("unexpected state {other:?}"),
    }
    assert!(trust.certificate_chain().is_empty());
    assert!(trust.public_key().is_none());
    assert!(trust.report().is_none());
}

#[test]
fn ssl_policy_without_hostname_fails_evaluation() {
    let root = root_ca("Root A");
    let leaf = leaf("leaf", &["leaf.example"], &root);
    let mut trust = Trust::for_ssl_server(vec![leaf.certificate()], "").with_platform(isolated());

    assert!(matches!(trust.evaluate(), Err(EngineError::MalformedInput(_))));
    assert!(matches!(trust.state(), TrustState::EvaluationFailed { .. }));
    assert_eq!(trust.result(), Some(TrustResult::Invalid));
}

#[test]
fn accessors_are_empty_until_evaluated_and_after_reconfiguration() {
    let root = root_ca("Root A");
    let leaf = leaf("leaf", &["leaf.example"], &root);
    let mut trust = basic(&[&leaf], &[&root]);

    assert!(matches!(trust.state(), TrustState::Unevaluated));
    assert!(trust.certificate_chain().is_empty());
    assert!(trust.public_key().is_none());
    assert_eq!(trust.result(), None);

    trust.evaluate().unwrap();
    let key = trust.public_key().expect("public key");
    assert_eq!(key.application_label(), Some(leaf.certificate().public_key_hash()));

    trust.set_keychains(SearchList::disabled());
    assert!(matches!(trust.state(), TrustState::Unevaluated));
    assert!(trust.certificate_chain().is_empty());
}

#[test]
fn verify_date_is_frozen_once_read() {
    let root = root_ca("Root A");
    let leaf = leaf("leaf", &["leaf.example"], &root);
    let trust = Trust::for_basic_x509(vec![leaf.certificate()]).with_platform(isolated());
    let first = trust.verify_date();
    std::thread::sleep(std::time::Duration::from_millis(5));
    assert_eq!(trust.verify_date(), first);
}

#[test]
fn missing_intermediate_is_found_in_keychain() {
    let root = root_ca("Root A");
    let inter = intermediate_ca("Intermediate A", &root);
    let leaf = leaf("leaf", &["leaf.example"], &inter);
    let keychain: Arc<dyn Keychain> =
        Arc::new(MemoryKeychain::with_certificates("login", [inter.certificate()]).unwrap());

    let mut trust = basic(&[&leaf], &[&root]);
    assert_eq!(trust.evaluate().unwrap(), TrustResult::RecoverableTrustFailure);
    assert_eq!(trust.report().unwrap().chain_status, ChainStatus::Partial);

    trust.set_keychains(SearchList::Explicit(vec![keychain.clone()]));
    assert_eq!(trust.evaluate().unwrap(), TrustResult::Unspecified);
    assert_eq!(trust.certificate_chain().len(), 3);

    // The platform default search list is used when nothing explicit is set.
    let platform = Platform::isolated().with_default_search_list(vec![keychain]);
    let mut trust = Trust::for_basic_x509(vec![leaf.certificate()]).with_platform(Arc::new(platform));
    trust.set_anchors(Some(vec![root.certificate()]));
    trust.set_verify_date(Some(inside_window()));
    assert_eq!(trust.evaluate().unwrap(), TrustResult::Unspecified);
}

#[test]
fn report_serializes_to_json() {
    let root = root_ca("Root A");
    let leaf = leaf("leaf", &["leaf.example"], &root);
    let mut trust = basic(&[&leaf], &[&root]);
    trust.evaluate().unwrap();

    let json: serde_json::Value = serde_json::from_str(&trust.report().unwrap().to_json().unwrap()).unwrap();
    assert_eq!(json["result"], "Unspecified");
    assert_eq!(json["policy"], "basic_x509");
    assert_eq!(json["chain_status"], "anchored");
    assert_eq!(json["chain"].as_array().unwrap().len(), 2);
    assert_eq!(json["chain"][0]["subject"], "leaf");
}

#[derive(Debug)]
struct BrokenVerifier;

impl ChainVerifier for BrokenVerifier {
    fn verify(&self, _request: &VerifyRequest<'_>) -> Result<VerifyOutcome, EngineError> {
        Err(EngineError::PlatformVerification("backend unavailable".into()))
    }
}

#[test]
fn verifier_breakdown_is_other_error() {
    let root = root_ca("Root A");
    let leaf = leaf("leaf", &["leaf.example"], &root);
    let platform = Platform::isolated()
        .with_system_anchors(AnchorSet::new())
        .with_verifier(Arc::new(BrokenVerifier));

    let mut trust = Trust::for_basic_x509(vec![leaf.certificate()]).with_platform(Arc::new(platform));
    let err = trust.evaluate().unwrap_err();
    assert_eq!(err.trust_result(), TrustResult::OtherError);
    assert_eq!(trust.result(), Some(TrustResult::OtherError));
}
