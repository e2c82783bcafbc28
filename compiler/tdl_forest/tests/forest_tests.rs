//! End-to-end forest construction and resolution.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;
use tdl_forest::{
    ClassTag, ConstructionMode, ErrorCode, ForestConfig, ForestError, Quals, Scope, SlotId, MEQ,
};

fn interactive() -> Scope {
    Scope::with_config(None, ForestConfig::interactive())
}

#[test]
fn test_three_node_forest_has_one_root() {
    tdl_forest::init_tracing();
    let ns = interactive();
    let a = (ns.node("a") << MEQ.class("Constant").attr("value", 1)).unwrap();
    let b = (ns.node("b") << MEQ.class("Constant").attr("value", 2)).unwrap();
    let c = (ns.node("c") << &a + &b).unwrap();

    ns.resolve().unwrap();

    let repo = ns.repository().lock();
    assert_eq!(repo.len(), 3);
    assert!(repo.is_root("c"));
    assert!(!repo.is_root("a"));
    assert!(!repo.is_root("b"));
    drop(repo);

    let record = c.finalized().expect("c is finalized");
    assert_eq!(record.class, "MeqAdd");
    assert_eq!(
        record.children,
        vec![
            (SlotId::Index(0), "a".to_owned()),
            (SlotId::Index(1), "b".to_owned()),
        ]
    );
    assert_eq!(a.parents(), vec![c.clone()]);
    assert_eq!(b.parents(), vec![c]);
}

#[test]
fn test_qualification_is_deterministic() {
    let ns = interactive();
    let quals = Quals::new().pos("xx").kw("station", 4).kw("freq", "lo");
    let first = ns.node_with("gain", &quals);
    let second = ns.node("gain").qualify(&quals);
    assert_eq!(first.name(), "gain:xx:freq=lo:station=4");
    assert_eq!(first, second);
    assert_eq!(ns.repository().lock().len(), 2);
}

#[test]
fn test_identical_rebind_is_silent() {
    let ns = interactive();
    let x = (ns.node("x") << 1.0).unwrap();
    let y = (ns.node("y") << 2.0).unwrap();
    let def = || MEQ.class("Add").children([&x, &y]).attr("weight", 0.5);

    let z = (ns.node("z") << def()).unwrap();
    let defined_at = z.defined_at();
    (ns.node("z") << def()).unwrap();

    assert_eq!(z.defined_at(), defined_at);
    assert_eq!(z.children().len(), 2);
    assert_eq!(x.num_parents(), 1);
}

#[test]
fn test_redefinition_keeps_original_state() {
    let ns = interactive();
    let x = (ns.node("x") << 1.0).unwrap();
    let y = (ns.node("y") << 2.0).unwrap();
    let z = (ns.node("z") << MEQ.class("Add").child(&x).child(&y)).unwrap();

    for def in [
        MEQ.class("Add").child(&y).child(&x),
        MEQ.class("Add").child(&x).child(&y).attr("weight", 2),
        MEQ.class("Subtract").child(&x).child(&y),
    ] {
        let error = (ns.node("z") << def).unwrap_err();
        assert_eq!(error.code(), ErrorCode::T0001, "{error}");
    }

    assert_eq!(z.class_tag(), Some(ClassTag::meq("Add")));
    assert!(z.attributes().is_empty());
    assert_eq!(
        z.children().into_iter().map(|(_, n)| n).collect::<Vec<_>>(),
        vec![x, y]
    );
}

#[test]
fn test_anonymous_expressions_fold() {
    let ns = interactive();
    let a = (ns.node("a") << 1).unwrap();
    let b = (ns.node("b") << 2).unwrap();
    let left = (ns.node("left") << (&a * &b) + 1.0).unwrap();
    let right = (ns.node("right") << (&a * &b) - 1.0).unwrap();

    let product = ns.lookup("Multiply(a,b)").expect("product was auto-bound");
    assert_eq!(left.children()[0].1, product);
    assert_eq!(right.children()[0].1, product);
    assert_eq!(product.parents(), vec![left, right]);
}

#[test]
fn test_orphan_chain_is_pruned() {
    let ns = Scope::with_config(None, ForestConfig::interactive().with_prune_orphans(true));
    let leaf = (ns.node("leaf") << 1).unwrap();
    let mid = (ns.node("mid") << MEQ.class("Negate").child(&leaf)).unwrap();
    let root = (ns.node("root") << MEQ.class("Negate").child(&mid)).unwrap();

    ns.resolve().unwrap();

    assert!(!root.is_alive());
    assert!(!mid.is_alive());
    assert!(!leaf.is_alive());
    assert!(ns.roots().is_empty());
}

#[test]
fn test_leaf_with_surviving_parent_is_kept() {
    let ns = Scope::with_config(None, ForestConfig::interactive().with_prune_orphans(true));
    let leaf = (ns.node("leaf") << 1).unwrap();
    let mid = (ns.node("mid") << MEQ.class("Negate").child(&leaf)).unwrap();
    let root = (ns.node("root") << MEQ.class("Negate").child(&mid)).unwrap();
    let sink = (ns.node("sink") << MEQ.class("Sqr").child(&leaf)).unwrap();
    ns.add_root(&sink);

    ns.resolve().unwrap();

    assert!(!root.is_alive());
    assert!(!mid.is_alive());
    assert!(leaf.is_alive());
    assert_eq!(leaf.parents(), vec![sink.clone()]);
    assert_eq!(ns.roots(), vec![sink]);
}

#[test]
fn test_unpruned_forest_keeps_every_parentless_node() {
    let ns = interactive();
    let a = (ns.node("a") << 1).unwrap();
    let b = (ns.node("b") << 2).unwrap();
    ns.resolve().unwrap();
    assert_eq!(ns.roots(), vec![a, b]);
}

#[test]
fn test_never_bound_child_fails_resolve() {
    let ns = interactive();
    let ghost = ns.node("ghost");
    let a = (ns.node("a") << 1).unwrap();
    let user = (ns.node("user") << MEQ.class("Add").child(&a).child(&ghost)).unwrap();

    let error = ns.resolve().unwrap_err();
    assert!(error.is_aggregate());
    assert_eq!(error.errors()[0].code(), ErrorCode::T0002);
    assert_eq!(error.errors()[1].code(), ErrorCode::T0006);
    assert!(error.errors()[1]
        .error
        .to_string()
        .starts_with("child referenced here"));

    assert!(!ghost.is_alive());
    assert!(!user.is_alive());
    assert!(a.is_alive());
    assert!(a.parents().is_empty());
    assert_eq!(ns.roots(), vec![a]);
}

#[test]
fn test_batch_mode_reports_every_error_at_resolve() {
    let ns = Scope::with_config(None, ForestConfig::batch());
    assert_eq!(ns.config().mode, ConstructionMode::Batch);

    let a = (ns.node("a") << 1).unwrap();
    (ns.node("a") << 2).unwrap();
    let b = (ns.node("b") << MEQ.class("Negate").child("missing")).unwrap();
    assert!(!b.is_initialized());

    let error = ns.resolve().unwrap_err();
    let codes: Vec<ErrorCode> = error.errors().iter().map(|e| e.code()).collect();
    assert_eq!(codes, vec![ErrorCode::T0001, ErrorCode::T0006, ErrorCode::T0004]);
    assert!(a.is_alive());
    assert!(!b.is_alive());
}

#[test]
fn test_interactive_mode_raises_immediately() {
    let ns = interactive();
    (ns.node("a") << 1).unwrap();
    let error = (ns.node("a") << 2).unwrap_err();
    assert!(matches!(error, ForestError::Redefined { ref name, .. } if name == "a"));
    assert!(ns.errors().is_empty());
    ns.resolve().unwrap();
}

#[test]
fn test_mode_can_switch_mid_construction() {
    let ns = interactive();
    (ns.node("a") << 1).unwrap();
    ns.repository().lock().set_mode(ConstructionMode::Batch);
    assert!((ns.node("a") << 2).is_ok());
    assert_eq!(ns.repository().lock().num_errors(), 1);
}

#[test]
fn test_resolve_twice_is_a_no_op_and_binding_after_is_closed() {
    let ns = Scope::with_config(None, ForestConfig::batch());
    let a = (ns.node("a") << 1).unwrap();
    ns.resolve().unwrap();
    ns.resolve_with(true).unwrap();
    assert!(a.is_alive());

    let error = (ns.node("b") << 2).unwrap_err();
    assert_eq!(error.code(), ErrorCode::T0008);
}

#[test]
fn test_subscopes_share_one_forest() {
    let ns = Scope::with_config(None, ForestConfig::interactive());
    let sky = ns.subscope("sky");
    let src = (sky.node("flux") << 2.5).unwrap();
    let total = (ns.node("total") << MEQ.class("Sqr").child("sky.flux")).unwrap();
    assert_eq!(src.name(), "sky.flux");
    assert_eq!(total.children()[0].1, src);

    ns.resolve().unwrap();
    assert_eq!(ns.roots(), vec![total]);
}

#[test]
fn test_cycle_is_rejected_and_pruning_still_empties_the_forest() {
    let ns = Scope::with_config(None, ForestConfig::batch().with_prune_orphans(true));
    let a = ns.node("a");
    let b = ns.node("b");
    (a.clone() << MEQ.class("Negate").child(&b)).unwrap();
    (b.clone() << MEQ.class("Negate").child(&a)).unwrap();

    let errors = ns.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code(), ErrorCode::T0004);
    assert!(!b.is_initialized());

    let error = ns.resolve().unwrap_err();
    assert!(error.is_aggregate());
    assert!(!a.is_alive());
    assert!(!b.is_alive());
    assert!(ns.roots().is_empty());
}
