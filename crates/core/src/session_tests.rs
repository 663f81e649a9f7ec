// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn new_session(now_ms: u64, ttl_ms: Option<u64>) -> Session {
    Session::new(SessionId::new(), PathBuf::from("/tmp/ws"), now_ms, ttl_ms)
}

#[test]
fn zero_ttl_never_expires() {
    let s = new_session(1_000, Some(0));
    assert_eq!(s.expiration_ms, NEVER_EXPIRES_MS);
    assert!(!s.is_expired(u64::MAX - 1));
}

#[test]
fn none_ttl_never_expires() {
    let s = new_session(1_000, None);
    assert!(!s.is_expired(u64::MAX - 1));
}

#[test]
fn positive_ttl_expires_after_deadline() {
    let s = new_session(1_000, Some(500));
    assert!(!s.is_expired(1_499));
    assert!(s.is_expired(1_501));
}

#[test]
fn stage_transitions_follow_normal_path() {
    let mut s = new_session(0, None);
    assert!(s.transition_stage(Stage::Preflight).is_ok());
    assert!(s.transition_stage(Stage::Analyze).is_ok());
    // Skipping ahead is illegal.
    let mut s2 = new_session(0, None);
    assert_eq!(
        s2.transition_stage(Stage::Build),
        Err(SessionError::IllegalStageTransition { from: Stage::Init, to: Stage::Build })
    );
}

#[test]
fn any_stage_can_jump_to_failed() {
    let mut s = new_session(0, None);
    s.transition_stage(Stage::Preflight).unwrap();
    s.transition_stage(Stage::Analyze).unwrap();
    assert!(s.transition_stage(Stage::Failed).is_ok());
}

#[test]
fn adding_duplicate_label_is_noop() {
    let mut s = new_session(0, None);
    s.add_label("app.name".to_string()).unwrap();
    s.add_label("app.name".to_string()).unwrap();
    assert_eq!(s.labels.len(), 1);
}

#[test]
fn reserved_prefix_label_is_rejected() {
    let mut s = new_session(0, None);
    assert!(s.add_label("kubernetes.io/app".to_string()).is_err());
}

#[test]
fn invariants_reject_expiration_before_creation() {
    let mut s = new_session(1_000, None);
    s.expiration_ms = 500;
    assert!(matches!(s.validate_invariants(), Err(SessionError::ExpirationBeforeCreation { .. })));
}
