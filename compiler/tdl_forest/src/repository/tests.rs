#![allow(clippy::unwrap_used)]

use super::*;
use crate::child::SlotId;
use crate::class::ClassTag;
use crate::value::{Attributes, Value};
use pretty_assertions::assert_eq;
use tdl_diagnostic::ErrorCode;

const HERE: SourceLoc = SourceLoc::new("script.tdl", 10, 1);
const THERE: SourceLoc = SourceLoc::new("script.tdl", 20, 1);

fn node(repo: &mut Repository, name: &str) -> NodeId {
    repo.intern(name.to_owned(), Quals::new(), HERE).0
}

fn def(class: &str, children: &[NodeId]) -> Committed {
    Committed {
        class: ClassTag::meq(class),
        attrs: Attributes::new(),
        children: children
            .iter()
            .enumerate()
            .map(|(i, id)| (SlotId::Index(i), *id))
            .collect(),
        step_children: Vec::new(),
    }
}

fn leaf(value: i64) -> Committed {
    let mut committed = def("Constant", &[]);
    committed.attrs.insert("value".into(), Value::Int(value));
    committed
}

fn no_roots() -> FxHashSet<NodeId> {
    FxHashSet::default()
}

#[test]
fn test_intern_returns_existing_node() {
    let mut repo = Repository::default();
    let (a, ident) = repo.intern("a".into(), Quals::new().pos(1), HERE);
    let (again, _) = repo.intern("a".into(), Quals::new().pos(1), THERE);
    assert_eq!(a, again);
    assert_eq!(ident.name, "a:1");
    assert_eq!(repo.len(), 1);
    assert_eq!(repo.lookup("a:1"), Some(a));
    assert_eq!(repo.get(a).map(|d| d.created_at), Some(HERE));
}

#[test]
fn test_commit_registers_parents() {
    let mut repo = Repository::default();
    let a = node(&mut repo, "a");
    let b = node(&mut repo, "b");
    let c = node(&mut repo, "c");
    repo.commit(a, leaf(1), HERE).unwrap();
    repo.commit(b, leaf(2), HERE).unwrap();
    repo.commit(c, def("Add", &[a, b]), THERE).unwrap();

    assert!(repo.get(a).unwrap().parents.contains(&c));
    assert!(repo.get(b).unwrap().parents.contains(&c));
    assert!(repo.get(c).unwrap().parents.is_empty());
    assert_eq!(repo.get(c).unwrap().defined_at, THERE);
}

#[test]
fn test_identical_rebind_is_a_no_op() {
    let mut repo = Repository::default();
    let a = node(&mut repo, "a");
    repo.commit(a, leaf(1), HERE).unwrap();
    repo.commit(a, leaf(1), THERE).unwrap();
    assert_eq!(repo.committed(a), Some(&leaf(1)));
    assert_eq!(repo.get(a).unwrap().defined_at, HERE);
}

#[test]
fn test_redefinition_keeps_original_state() {
    let mut repo = Repository::default();
    let a = node(&mut repo, "a");
    repo.commit(a, leaf(1), HERE).unwrap();
    let error = repo.commit(a, leaf(2), THERE).unwrap_err();
    assert_eq!(
        error,
        ForestError::Redefined {
            name: "a".into(),
            what: "attributes",
            new: THERE,
            original: HERE,
        }
    );
    assert_eq!(repo.committed(a), Some(&leaf(1)));
}

#[test]
fn test_child_order_matters_for_redefinition() {
    let mut repo = Repository::default();
    let a = node(&mut repo, "a");
    let b = node(&mut repo, "b");
    let c = node(&mut repo, "c");
    repo.commit(c, def("Add", &[a, b]), HERE).unwrap();
    let error = repo.commit(c, def("Add", &[b, a]), THERE).unwrap_err();
    assert!(matches!(error, ForestError::Redefined { what: "children", .. }));
}

#[test]
fn test_self_child_is_rejected() {
    let mut repo = Repository::default();
    let a = node(&mut repo, "a");
    let error = repo.commit(a, def("Add", &[a]), HERE).unwrap_err();
    assert_eq!(error.code(), ErrorCode::T0004);
    assert!(repo.committed(a).is_none());
}

#[test]
fn test_defer_in_batch_mode_records() {
    let mut repo = Repository::default();
    let result = repo.defer(ForestError::child("bad child"), HERE);
    assert!(result.is_ok());
    assert_eq!(repo.num_errors(), 1);
    assert_eq!(repo.errors()[0].location, HERE);
}

#[test]
fn test_defer_in_interactive_mode_returns_error() {
    let mut repo = Repository::new(&ForestConfig::interactive());
    let result = repo.defer(ForestError::child("bad child"), HERE);
    assert_eq!(result, Err(ForestError::child("bad child")));
    assert!(repo.errors().is_empty());
}

#[test]
fn test_defer_never_records_closed() {
    let mut repo = Repository::default();
    let closed = ForestError::Closed { action: "bind a node" };
    assert_eq!(repo.defer(closed.clone(), HERE), Err(closed));
    assert_eq!(repo.num_errors(), 0);
}

#[test]
fn test_error_limit_overflow_returns_aggregate() {
    let mut repo = Repository::new(&ForestConfig::default().with_error_limit(2));
    assert!(repo.defer(ForestError::child("one"), HERE).is_ok());
    assert!(repo.defer(ForestError::child("two"), HERE).is_ok());
    let error = repo.defer(ForestError::child("three"), HERE).unwrap_err();
    assert!(error.is_aggregate());
    assert_eq!(error.errors().len(), 3);
}

#[test]
fn test_resolve_without_pruning_keeps_all_parentless_nodes() {
    let mut repo = Repository::default();
    let a = node(&mut repo, "a");
    let b = node(&mut repo, "b");
    let c = node(&mut repo, "c");
    let stray = node(&mut repo, "stray");
    repo.commit(a, leaf(1), HERE).unwrap();
    repo.commit(b, leaf(2), HERE).unwrap();
    repo.commit(c, def("Add", &[a, b]), HERE).unwrap();
    repo.commit(stray, leaf(3), HERE).unwrap();

    assert_eq!(repo.resolve(false, &no_roots()), Ok(()));
    assert_eq!(repo.state(), RepositoryState::Resolved);
    assert_eq!(
        repo.roots().keys().cloned().collect::<Vec<_>>(),
        vec!["c".to_owned(), "stray".to_owned()]
    );
    assert_eq!(repo.len(), 4);
}

#[test]
fn test_uninitialized_sweep_deletes_dependents_upward() {
    let mut repo = Repository::default();
    let missing = node(&mut repo, "missing");
    let mid = node(&mut repo, "mid");
    let top = node(&mut repo, "top");
    let other = node(&mut repo, "other");
    repo.commit(other, leaf(1), HERE).unwrap();
    repo.commit(mid, def("Add", &[missing, other]), THERE).unwrap();
    repo.commit(top, def("Negate", &[mid]), HERE).unwrap();

    let error = repo.resolve(false, &no_roots()).unwrap_err();
    assert!(error.is_aggregate());

    let codes: Vec<ErrorCode> = error.errors().iter().map(RecordedError::code).collect();
    assert_eq!(codes, vec![ErrorCode::T0002, ErrorCode::T0006]);
    assert_eq!(
        error.errors()[0].error,
        ForestError::Uninitialized {
            name: "missing".into(),
            parent: "mid".into(),
            referenced_at: THERE,
        }
    );

    assert!(!repo.is_alive(missing));
    assert!(!repo.is_alive(mid));
    assert!(!repo.is_alive(top));
    assert!(repo.is_alive(other));
    assert!(repo.get(other).unwrap().parents.is_empty());
    assert_eq!(repo.names(), vec!["other".to_owned()]);
    assert!(repo.is_root("other"));
}

#[test]
fn test_prune_deletes_orphan_chain() {
    let mut repo = Repository::default();
    let leaf_id = node(&mut repo, "leaf");
    let mid = node(&mut repo, "mid");
    let root = node(&mut repo, "root");
    repo.commit(leaf_id, leaf(1), HERE).unwrap();
    repo.commit(mid, def("Negate", &[leaf_id]), HERE).unwrap();
    repo.commit(root, def("Negate", &[mid]), HERE).unwrap();

    assert_eq!(repo.resolve(true, &no_roots()), Ok(()));
    assert!(repo.is_empty());
    assert!(repo.roots().is_empty());
}

#[test]
fn test_prune_keeps_root_group_and_shared_children() {
    let mut repo = Repository::default();
    let shared = node(&mut repo, "shared");
    let mid = node(&mut repo, "mid");
    let orphan = node(&mut repo, "orphan");
    let kept = node(&mut repo, "kept");
    repo.commit(shared, leaf(1), HERE).unwrap();
    repo.commit(mid, def("Negate", &[shared]), HERE).unwrap();
    repo.commit(orphan, def("Negate", &[mid]), HERE).unwrap();
    repo.commit(kept, def("Sqrt", &[shared]), HERE).unwrap();

    let group: FxHashSet<NodeId> = [kept].into_iter().collect();
    assert_eq!(repo.resolve(true, &group), Ok(()));
    assert_eq!(repo.names(), vec!["kept".to_owned(), "shared".to_owned()]);
    assert_eq!(repo.roots().keys().collect::<Vec<_>>(), vec!["kept"]);
    let parents = &repo.get(shared).unwrap().parents;
    assert_eq!(parents.len(), 1);
    assert!(parents.contains(&kept));
}

#[test]
fn test_pruning_orphans_a_root_group_child_makes_it_a_root() {
    let mut repo = Repository::default();
    let child = node(&mut repo, "child");
    let parent = node(&mut repo, "parent");
    repo.commit(child, leaf(1), HERE).unwrap();
    repo.commit(parent, def("Negate", &[child]), HERE).unwrap();

    let group: FxHashSet<NodeId> = [child].into_iter().collect();
    assert_eq!(repo.resolve(true, &group), Ok(()));
    assert!(!repo.is_alive(parent));
    assert!(repo.is_root("child"));
}

#[test]
fn test_finalize_records_names_of_children() {
    let mut repo = Repository::default();
    let a = node(&mut repo, "a");
    let b = node(&mut repo, "b");
    let flush = node(&mut repo, "flush");
    let c = node(&mut repo, "c");
    repo.commit(a, leaf(1), HERE).unwrap();
    repo.commit(b, leaf(2), HERE).unwrap();
    repo.commit(flush, leaf(3), HERE).unwrap();
    let mut sum = def("Add", &[a, b]);
    sum.step_children.push(flush);
    repo.commit(c, sum, HERE).unwrap();

    repo.resolve(false, &no_roots()).unwrap();
    assert_eq!(
        repo.get(c).unwrap().finalized,
        Some(FinalizedRecord {
            name: "c".into(),
            class: "MeqAdd".into(),
            attributes: Attributes::new(),
            children: vec![
                (SlotId::Index(0), "a".into()),
                (SlotId::Index(1), "b".into()),
            ],
            step_children: vec!["flush".into()],
        })
    );
}

#[test]
fn test_second_resolve_is_a_no_op() {
    let mut repo = Repository::default();
    let a = node(&mut repo, "a");
    repo.commit(a, leaf(1), HERE).unwrap();
    repo.resolve(false, &no_roots()).unwrap();
    let roots = repo.roots().clone();

    assert_eq!(repo.resolve(true, &no_roots()), Ok(()));
    assert_eq!(repo.roots(), &roots);
    assert!(repo.is_alive(a));
}

#[test]
fn test_commit_after_resolve_is_closed() {
    let mut repo = Repository::default();
    let a = node(&mut repo, "a");
    repo.commit(a, leaf(1), HERE).unwrap();
    repo.resolve(false, &no_roots()).unwrap();
    let error = repo.commit(a, leaf(1), HERE).unwrap_err();
    assert_eq!(error.code(), ErrorCode::T0008);
}

#[test]
fn test_shared_repository_identity() {
    let shared = SharedRepository::default();
    let alias = shared.clone();
    assert!(shared.ptr_eq(&alias));
    assert!(!shared.ptr_eq(&SharedRepository::default()));
    alias.lock().intern("x".into(), Quals::new(), HERE);
    assert!(shared.lock().contains("x"));
}

#[test]
fn test_two_node_cycle_is_rejected() {
    let mut repo = Repository::default();
    let a = node(&mut repo, "a");
    let b = node(&mut repo, "b");
    repo.commit(a, def("Negate", &[b]), HERE).unwrap();
    let error = repo.commit(b, def("Negate", &[a]), THERE).unwrap_err();

    assert_eq!(error.code(), ErrorCode::T0004);
    assert!(error.to_string().contains("cycle"), "{error}");
    assert!(repo.committed(b).is_none());
    assert!(repo.get(a).unwrap().parents.is_empty());
}

#[test]
fn test_longer_cycle_is_rejected_through_step_children() {
    let mut repo = Repository::default();
    let a = node(&mut repo, "a");
    let b = node(&mut repo, "b");
    let c = node(&mut repo, "c");
    repo.commit(a, def("Negate", &[b]), HERE).unwrap();
    repo.commit(b, def("Negate", &[c]), HERE).unwrap();

    let mut closing = def("Sink", &[]);
    closing.step_children.push(a);
    let error = repo.commit(c, closing, THERE).unwrap_err();
    assert_eq!(
        error,
        ForestError::child("binding 'c' would create a cycle through 'a'")
    );
}

#[test]
fn test_shared_descendants_are_not_a_cycle() {
    let mut repo = Repository::default();
    let x = node(&mut repo, "x");
    let left = node(&mut repo, "left");
    let right = node(&mut repo, "right");
    let top = node(&mut repo, "top");
    repo.commit(x, leaf(1), HERE).unwrap();
    repo.commit(left, def("Negate", &[x]), HERE).unwrap();
    repo.commit(right, def("Sqr", &[x]), HERE).unwrap();
    assert!(repo.commit(top, def("Add", &[left, right]), HERE).is_ok());
}

#[test]
fn test_names_after_resolve_do_not_grow_the_forest() {
    let mut repo = Repository::default();
    let a = node(&mut repo, "a");
    repo.commit(a, leaf(1), HERE).unwrap();
    repo.resolve(false, &no_roots()).unwrap();

    let (existing, _) = repo.intern("a".into(), Quals::new(), THERE);
    assert_eq!(existing, a);

    let (late, ident) = repo.intern("late".into(), Quals::new(), THERE);
    assert_eq!(ident.name, "late");
    assert!(!repo.is_alive(late));
    assert_eq!(repo.len(), 1);
    assert!(!repo.contains("late"));
}
