// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

crate::define_id! {
    pub struct TestId("tid-");
}

#[test]
fn new_ids_carry_prefix_and_are_unique() {
    let a = TestId::new();
    let b = TestId::new();
    assert!(a.as_str().starts_with("tid-"));
    assert_ne!(a.as_str(), b.as_str());
    assert!(a.as_str().len() <= ID_MAX_LEN);
}

#[test]
fn from_string_round_trips() {
    let id = TestId::from_string("tid-custom123");
    assert_eq!(id.as_str(), "tid-custom123");
    assert_eq!(id, "tid-custom123");
}

#[test]
fn empty_id_is_empty() {
    let buf = IdBuf::empty();
    assert!(buf.is_empty());
    assert_eq!(buf.as_str(), "");
}

#[test]
fn serde_round_trip() {
    let id = TestId::from_string("tid-abc");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"tid-abc\"");
    let back: TestId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
