// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Label grammar: human labels from a fixed allowed-prefix
//! set, and Kubernetes-style key/value pairs validated against the
//! Kubernetes label regex.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

pub const MAX_LABEL_LEN: usize = 63;

const ALLOWED_PREFIXES: &[&str] =
    &["workflow.", "app.", "env.", "repo.", "tool.", "progress.", "status."];

const RESERVED_PREFIXES: &[&str] = &["kubernetes.io/", "k8s.io/"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelError {
    #[error("label exceeds {MAX_LABEL_LEN} characters: {0:?}")]
    TooLong(String),
    #[error("label {0:?} does not start with an allowed prefix")]
    DisallowedPrefix(String),
    #[error("label {0:?} uses a reserved prefix")]
    ReservedPrefix(String),
    #[error("kubernetes-style key {0:?} is invalid")]
    InvalidKey(String),
    #[error("kubernetes-style value {0:?} is invalid")]
    InvalidValue(String),
}

/// Validate a free-form human label against the allowed-prefix grammar.
pub fn validate_label(label: &str) -> Result<(), LabelError> {
    if label.len() > MAX_LABEL_LEN {
        return Err(LabelError::TooLong(label.to_string()));
    }
    if RESERVED_PREFIXES.iter().any(|p| label.starts_with(p)) {
        return Err(LabelError::ReservedPrefix(label.to_string()));
    }
    if !ALLOWED_PREFIXES.iter().any(|p| label.starts_with(p)) {
        return Err(LabelError::DisallowedPrefix(label.to_string()));
    }
    Ok(())
}

fn k8s_value_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"^([A-Za-z0-9]([A-Za-z0-9._-]*[A-Za-z0-9])?)?$")
            .expect("label regex is a fixed, valid pattern")
    })
}

/// Validate a Kubernetes-style key: `[prefix/]name`, prefix is a DNS
/// subdomain (not validated beyond reserved-prefix rejection here), name
/// matches the Kubernetes label-value grammar and is ≤ 63 chars.
pub fn validate_k8s_key(key: &str) -> Result<(), LabelError> {
    let name = key.rsplit('/').next().unwrap_or(key);
    if name.len() > MAX_LABEL_LEN || !k8s_value_regex().is_match(name) {
        return Err(LabelError::InvalidKey(key.to_string()));
    }
    if RESERVED_PREFIXES.iter().any(|p| key.starts_with(p)) {
        return Err(LabelError::ReservedPrefix(key.to_string()));
    }
    Ok(())
}

/// Validate a Kubernetes-style label value.
pub fn validate_k8s_value(value: &str) -> Result<(), LabelError> {
    if value.len() > MAX_LABEL_LEN || !k8s_value_regex().is_match(value) {
        return Err(LabelError::InvalidValue(value.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod tests;
