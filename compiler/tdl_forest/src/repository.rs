//! Node repository: the forest of one compile unit.
//!
//! The repository owns every node (an arena of [`NodeData`] indexed by
//! [`NodeId`]), maps canonical names to ids, accumulates deferred errors and
//! runs the one-time resolution pass.
//!
//! # Resolution
//!
//! `open -> resolving -> resolved`. [`Repository::resolve`] runs:
//!
//! 1. **Uninitialized sweep**: every node never bound is deleted, with an
//!    error recorded against each parent that references it. Those parents
//!    (and everything above them) are deleted too, so no node is left with a
//!    dangling child.
//! 2. **Finalize**: every remaining node gets a [`FinalizedRecord`].
//! 3. **Roots**: parentless nodes become roots. When pruning, a parentless
//!    node outside the root group is deleted instead, and deletion continues
//!    into children left without parents.
//! 4. If any error was recorded, the whole list is returned as an aggregate.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rustc_hash::{FxHashMap, FxHashSet};
use tdl_diagnostic::{ErrorQueue, ForestError, QueueStatus, RecordedError, SourceLoc};

use crate::config::{ConstructionMode, ForestConfig};
use crate::node::{Committed, FinalizedRecord, NodeData, NodeId, NodeIdent};
use crate::qualifier::{qualified_name, Quals};

/// Lifecycle of a repository.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RepositoryState {
    /// Accepting binds.
    Open,
    Resolving,
    /// Terminal.
    Resolved,
}

/// Store of all nodes of one forest.
#[derive(Debug)]
pub struct Repository {
    /// Node arena; `None` marks a deleted node.
    nodes: Vec<Option<NodeData>>,
    names: FxHashMap<String, NodeId>,
    errors: ErrorQueue,
    mode: ConstructionMode,
    state: RepositoryState,
    /// Populated by `resolve()`.
    roots: BTreeMap<String, NodeId>,
}

impl Default for Repository {
    fn default() -> Self {
        Self::new(&ForestConfig::default())
    }
}

impl Repository {
    pub fn new(config: &ForestConfig) -> Self {
        Repository {
            nodes: Vec::new(),
            names: FxHashMap::default(),
            errors: ErrorQueue::with_limit(config.error_limit),
            mode: config.mode,
            state: RepositoryState::Open,
            roots: BTreeMap::new(),
        }
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Names of all live nodes, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.names.keys().cloned().collect();
        names.sort();
        names
    }

    /// Roots found by the last resolution, keyed by name.
    pub fn roots(&self) -> &BTreeMap<String, NodeId> {
        &self.roots
    }

    pub fn is_root(&self, name: &str) -> bool {
        self.roots.contains_key(name)
    }

    pub fn state(&self) -> RepositoryState {
        self.state
    }

    pub fn is_resolved(&self) -> bool {
        self.state == RepositoryState::Resolved
    }

    pub fn mode(&self) -> ConstructionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ConstructionMode) {
        self.mode = mode;
    }

    /// Deferred errors recorded so far, notes included.
    pub fn errors(&self) -> &[RecordedError] {
        self.errors.as_slice()
    }

    /// Number of deferred primary errors.
    pub fn num_errors(&self) -> usize {
        self.errors.primary_count()
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    fn name_of(&self, id: NodeId) -> String {
        self.get(id)
            .map_or_else(|| format!("{id:?}"), |d| d.ident.name.clone())
    }

    /// Live node ids in name order, so passes over the forest are deterministic.
    fn live_ids(&self) -> Vec<NodeId> {
        let mut named: Vec<(&str, NodeId)> = self
            .names
            .iter()
            .map(|(name, id)| (name.as_str(), *id))
            .collect();
        named.sort_unstable();
        named.into_iter().map(|(_, id)| id).collect()
    }

    /// Id of the node named by `basename` and `quals`, creating it if needed.
    ///
    /// Lookup and insertion happen under the same borrow, so two callers
    /// can never create two nodes with one name. Once resolution has started
    /// an unknown name gets a detached id: the handle works, but the node is
    /// never alive and the forest does not grow.
    pub(crate) fn intern(
        &mut self,
        basename: String,
        quals: Quals,
        loc: SourceLoc,
    ) -> (NodeId, Arc<NodeIdent>) {
        let name = qualified_name(&basename, &quals);
        if let Some(&id) = self.names.get(&name) {
            if let Some(data) = self.get(id) {
                return (id, Arc::clone(&data.ident));
            }
        }

        #[expect(
            clippy::cast_possible_truncation,
            reason = "a forest never holds more than u32::MAX nodes"
        )]
        let id = NodeId::new(self.nodes.len() as u32);
        let ident = Arc::new(NodeIdent {
            name: name.clone(),
            basename,
            quals,
        });
        if self.state != RepositoryState::Open {
            tracing::debug!(node = %name, "name referenced after resolution");
            self.nodes.push(None);
            return (id, ident);
        }
        tracing::trace!(node = %name, "created node");
        self.nodes
            .push(Some(NodeData::new(Arc::clone(&ident), loc)));
        self.names.insert(name, id);
        (id, ident)
    }

    /// Identity of a live node.
    pub(crate) fn ident(&self, id: NodeId) -> Result<Arc<NodeIdent>, ForestError> {
        self.get(id)
            .map(|d| Arc::clone(&d.ident))
            .ok_or_else(|| ForestError::child(format!("{id:?} no longer exists")))
    }

    pub(crate) fn committed(&self, id: NodeId) -> Option<&Committed> {
        self.get(id).and_then(|d| d.committed.as_ref())
    }

    /// The first of `children` from which `target` can be reached, if any.
    fn descendant_path_to(
        &self,
        target: NodeId,
        children: impl Iterator<Item = NodeId>,
    ) -> Option<NodeId> {
        let mut visited = FxHashSet::default();
        for child in children {
            let mut stack = vec![child];
            while let Some(id) = stack.pop() {
                if id == target {
                    return Some(child);
                }
                if visited.insert(id) {
                    stack.extend(self.get(id).map(NodeData::child_ids).unwrap_or_default());
                }
            }
        }
        None
    }

    pub(crate) fn ensure_open(&self, action: &'static str) -> Result<(), ForestError> {
        match self.state {
            RepositoryState::Open => Ok(()),
            RepositoryState::Resolving | RepositoryState::Resolved => {
                Err(ForestError::Closed { action })
            }
        }
    }

    /// Commit `committed` onto node `id`.
    ///
    /// A second commit must be identical to the first; anything else is a
    /// redefinition and leaves the node untouched.
    pub(crate) fn commit(
        &mut self,
        id: NodeId,
        committed: Committed,
        loc: SourceLoc,
    ) -> Result<(), ForestError> {
        self.ensure_open("bind a node")?;
        let Some(data) = self.get(id) else {
            return Err(ForestError::child(format!("{id:?} no longer exists")));
        };
        if let Some(existing) = &data.committed {
            if let Some(what) = existing.mismatch(&committed) {
                return Err(ForestError::Redefined {
                    name: data.ident.name.clone(),
                    what,
                    new: loc,
                    original: data.defined_at,
                });
            }
            tracing::debug!(node = %data.ident.name, "identical rebind");
            return Ok(());
        }

        for child in committed.child_ids() {
            if child == id {
                return Err(ForestError::child(format!(
                    "node '{}' cannot be its own child",
                    data.ident.name
                )));
            }
            if !self.is_alive(child) {
                return Err(ForestError::child(format!(
                    "child {child:?} of '{}' no longer exists",
                    data.ident.name
                )));
            }
        }
        if let Some(via) = self.descendant_path_to(id, committed.child_ids()) {
            return Err(ForestError::child(format!(
                "binding '{}' would create a cycle through '{}'",
                data.ident.name,
                self.name_of(via)
            )));
        }

        for child in committed.child_ids() {
            if let Some(child_data) = self.get_mut(child) {
                child_data.parents.insert(id);
            }
        }
        if let Some(data) = self.get_mut(id) {
            tracing::debug!(
                node = %data.ident.name,
                class = %committed.class,
                children = committed.children.len(),
                "committed node"
            );
            data.committed = Some(committed);
            data.defined_at = loc;
        }
        Ok(())
    }

    /// Handle an error at a bind call boundary.
    ///
    /// Interactive mode returns the error. Batch mode records it and
    /// returns `Ok`, unless the error limit is now exceeded, in which case
    /// all recorded errors are returned as an aggregate. Aggregate and
    /// closed-repository errors are never deferred.
    pub(crate) fn defer(&mut self, error: ForestError, loc: SourceLoc) -> Result<(), ForestError> {
        if self.mode == ConstructionMode::Interactive
            || matches!(error, ForestError::Aggregate(_) | ForestError::Closed { .. })
        {
            return Err(error);
        }
        tracing::warn!(code = %error.code(), location = %loc, "{error}");
        match self.errors.push(error, loc) {
            QueueStatus::Accepted => Ok(()),
            QueueStatus::Overflow => Err(self.errors.to_aggregate()),
        }
    }

    /// Resolve the forest once.
    ///
    /// Resolving an already resolved repository changes nothing and
    /// reports the same errors again.
    pub fn resolve(
        &mut self,
        prune_orphans: bool,
        root_group: &FxHashSet<NodeId>,
    ) -> Result<(), ForestError> {
        if self.state == RepositoryState::Resolved {
            tracing::debug!("repository already resolved");
            return self.error_result();
        }
        self.state = RepositoryState::Resolving;

        let removed = self.sweep_uninitialized();
        self.finalize();
        let pruned = self.classify_roots(prune_orphans, root_group);

        self.state = RepositoryState::Resolved;
        tracing::debug!(
            nodes = self.len(),
            roots = self.roots.len(),
            removed,
            pruned,
            errors = self.errors.primary_count(),
            "resolved forest"
        );
        self.error_result()
    }

    fn error_result(&self) -> Result<(), ForestError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors.to_aggregate())
        }
    }

    /// Delete a node from the arena and the name table.
    fn remove(&mut self, id: NodeId) -> Option<NodeData> {
        let data = self.nodes.get_mut(id.index())?.take()?;
        self.names.remove(&data.ident.name);
        Some(data)
    }

    /// Step 1: delete uninitialized nodes and everything that depends on them.
    ///
    /// Returns the number of deleted nodes.
    fn sweep_uninitialized(&mut self) -> usize {
        let uninitialized: Vec<NodeId> = self
            .live_ids()
            .into_iter()
            .filter(|id| self.get(*id).is_some_and(|d| !d.is_initialized()))
            .collect();

        let mut removed = 0;
        let mut dependents = Vec::new();
        for id in uninitialized {
            let Some(data) = self.remove(id) else {
                continue;
            };
            removed += 1;
            let mut parents: Vec<NodeId> = data.parents.into_iter().collect();
            parents.sort_by_key(|p| self.name_of(*p));
            for parent in parents {
                let Some(parent_data) = self.get(parent) else {
                    continue;
                };
                let error = ForestError::Uninitialized {
                    name: data.ident.name.clone(),
                    parent: parent_data.ident.name.clone(),
                    referenced_at: parent_data.defined_at,
                };
                self.errors.push(error, data.created_at);
                dependents.push(parent);
            }
            tracing::debug!(node = %data.ident.name, "deleted uninitialized node");
        }

        while let Some(id) = dependents.pop() {
            let Some(data) = self.remove(id) else {
                continue;
            };
            removed += 1;
            tracing::debug!(node = %data.ident.name, "deleted node with undefined child");
            dependents.extend(data.parents.iter().copied());
            for child in data.child_ids() {
                if let Some(child_data) = self.get_mut(child) {
                    child_data.parents.remove(&id);
                }
            }
        }
        removed
    }

    /// Step 2: freeze the hand-off record of every remaining node.
    fn finalize(&mut self) {
        let mut records = Vec::with_capacity(self.names.len());
        for id in self.live_ids() {
            let Some(data) = self.get(id) else {
                continue;
            };
            let Some(committed) = &data.committed else {
                continue;
            };
            let record = FinalizedRecord {
                name: data.ident.name.clone(),
                class: committed.class.to_string(),
                attributes: committed.attrs.clone(),
                children: committed
                    .children
                    .iter()
                    .map(|(slot, child)| (slot.clone(), self.name_of(*child)))
                    .collect(),
                step_children: committed
                    .step_children
                    .iter()
                    .map(|child| self.name_of(*child))
                    .collect(),
            };
            records.push((id, record));
        }
        for (id, record) in records {
            if let Some(data) = self.get_mut(id) {
                data.finalized = Some(record);
            }
        }
    }

    /// Step 3: pick roots among parentless nodes, pruning if asked.
    ///
    /// Returns the number of pruned nodes.
    fn classify_roots(&mut self, prune_orphans: bool, root_group: &FxHashSet<NodeId>) -> usize {
        self.roots.clear();
        let candidates: Vec<NodeId> = self
            .live_ids()
            .into_iter()
            .filter(|id| self.get(*id).is_some_and(|d| d.parents.is_empty()))
            .collect();

        let mut pruned = 0;
        for id in candidates {
            if !self.is_alive(id) {
                continue;
            }
            if !prune_orphans || root_group.contains(&id) {
                let name = self.name_of(id);
                self.roots.insert(name, id);
            } else {
                pruned += self.prune(id, root_group);
            }
        }
        pruned
    }

    /// Delete an orphan and every descendant left without parents.
    ///
    /// A descendant in the root group is kept and becomes a root instead.
    fn prune(&mut self, orphan: NodeId, root_group: &FxHashSet<NodeId>) -> usize {
        let mut pruned = 0;
        let mut stack = vec![orphan];
        while let Some(id) = stack.pop() {
            let Some(data) = self.remove(id) else {
                continue;
            };
            pruned += 1;
            tracing::debug!(node = %data.ident.name, "pruned orphan");
            for child in data.child_ids() {
                let Some(child_data) = self.get_mut(child) else {
                    continue;
                };
                child_data.parents.remove(&id);
                if !child_data.parents.is_empty() {
                    continue;
                }
                if root_group.contains(&child) {
                    let name = child_data.ident.name.clone();
                    self.roots.insert(name, child);
                } else {
                    stack.push(child);
                }
            }
        }
        pruned
    }
}

/// A repository shared by several scopes.
///
/// All mutation goes through one lock, which makes name lookup-then-insert
/// atomic.
#[derive(Clone, Debug, Default)]
pub struct SharedRepository(Arc<Mutex<Repository>>);

impl SharedRepository {
    pub fn new(repo: Repository) -> Self {
        SharedRepository(Arc::new(Mutex::new(repo)))
    }

    pub fn lock(&self) -> MutexGuard<'_, Repository> {
        self.0.lock()
    }

    /// Whether both handles refer to the same repository.
    pub fn ptr_eq(&self, other: &SharedRepository) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests;
