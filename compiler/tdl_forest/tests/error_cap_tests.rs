//! Deferred error limit in batch construction.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;
use tdl_forest::{ErrorCode, ForestConfig, Scope, MEQ};

#[test]
fn test_hundred_and_first_error_aborts_construction() {
    let ns = Scope::with_config(None, ForestConfig::batch());
    for i in 0..100 {
        let result = ns.node(&format!("n{i}")) << MEQ.class("Negate").child("missing");
        assert!(result.is_ok(), "error {i} should be deferred");
    }
    assert_eq!(ns.errors().len(), 100);

    let error = (ns.node("n100") << MEQ.class("Negate").child("missing")).unwrap_err();
    assert!(error.is_aggregate());
    assert_eq!(error.code(), ErrorCode::T0007);
    assert_eq!(error.errors().len(), 101);
    assert_eq!(error.to_string(), "101 error(s) in forest definition");
}

#[test]
fn test_notes_do_not_count_toward_the_limit() {
    let ns = Scope::with_config(None, ForestConfig::batch().with_error_limit(3));
    (ns.node("a") << 1).unwrap();
    for _ in 0..3 {
        (ns.node("a") << 2).unwrap();
    }
    assert_eq!(ns.errors().len(), 6);
    assert_eq!(ns.repository().lock().num_errors(), 3);

    let error = (ns.node("a") << 3).unwrap_err();
    assert_eq!(error.errors().len(), 8);
}

#[test]
fn test_zero_limit_is_unlimited() {
    let ns = Scope::with_config(None, ForestConfig::batch().with_error_limit(0));
    for i in 0..250 {
        (ns.node(&format!("n{i}")) << MEQ.class("")).unwrap();
    }
    assert_eq!(ns.repository().lock().num_errors(), 250);
}
