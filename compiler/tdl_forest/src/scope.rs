//! Scopes: hierarchical namespaces over a shared repository.
//!
//! A scope hands out node handles by name, creating uninitialized nodes on
//! first reference. Subscopes prefix their node names with the dotted scope
//! path; qualified scopes add qualifiers to every node they name. All scopes
//! derived from one root share its repository, configuration, constants
//! cache and root group, but each keeps its own auto-naming counters.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tdl_diagnostic::{ForestError, RecordedError, SourceLoc};

use crate::config::ForestConfig;
use crate::definition::Definition;
use crate::node::{Node, NodeId};
use crate::qualifier::{qualified_name, Quals};
use crate::repository::{Repository, SharedRepository};
use crate::value::Literal;

/// State shared by every scope over one repository.
#[derive(Debug)]
struct ScopeShared {
    config: ForestConfig,
    /// Literal -> constant node; non-owning, revalidated on lookup.
    constants: Mutex<FxHashMap<Literal, NodeId>>,
    /// Nodes exempt from orphan pruning.
    root_group: Mutex<FxHashSet<NodeId>>,
    /// Counters for names shared by the whole scope tree.
    counters: Mutex<FxHashMap<String, u32>>,
}

#[derive(Debug)]
struct ScopeInner {
    name: Option<String>,
    /// `""` for a root scope, otherwise the dotted path plus a trailing dot.
    prefix: String,
    quals: Quals,
    repo: SharedRepository,
    shared: Arc<ScopeShared>,
    /// Per-basename counters for unique names.
    counters: Mutex<FxHashMap<String, u32>>,
}

/// A namespace producing node handles.
#[derive(Clone, Debug)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl Scope {
    /// Root scope over a fresh repository configured from the environment.
    pub fn new(name: Option<&str>) -> Self {
        Self::with_config(name, ForestConfig::from_env())
    }

    /// Root scope over a fresh repository.
    pub fn with_config(name: Option<&str>, config: ForestConfig) -> Self {
        let repo = SharedRepository::new(Repository::new(&config));
        let shared = Arc::new(ScopeShared {
            config,
            constants: Mutex::new(FxHashMap::default()),
            root_group: Mutex::new(FxHashSet::default()),
            counters: Mutex::new(FxHashMap::default()),
        });
        let prefix = name.map(|n| format!("{n}.")).unwrap_or_default();
        Scope::from_parts(name.map(str::to_owned), prefix, Quals::new(), repo, shared)
    }

    fn from_parts(
        name: Option<String>,
        prefix: String,
        quals: Quals,
        repo: SharedRepository,
        shared: Arc<ScopeShared>,
    ) -> Self {
        Scope {
            inner: Arc::new(ScopeInner {
                name,
                prefix,
                quals,
                repo,
                shared,
                counters: Mutex::new(FxHashMap::default()),
            }),
        }
    }

    /// Child scope whose node names are prefixed with `outer.name.`.
    pub fn subscope(&self, name: &str) -> Scope {
        let path = format!("{}{name}", self.inner.prefix);
        let prefix = format!("{path}.");
        Scope::from_parts(
            Some(path),
            prefix,
            self.inner.quals.clone(),
            self.inner.repo.clone(),
            Arc::clone(&self.inner.shared),
        )
    }

    /// Scope over the same names whose nodes all carry `quals` as well.
    pub fn qual_scope(&self, quals: &Quals) -> Scope {
        Scope::from_parts(
            self.inner.name.clone(),
            self.inner.prefix.clone(),
            self.inner.quals.extended(quals),
            self.inner.repo.clone(),
            Arc::clone(&self.inner.shared),
        )
    }

    /// Another unprefixed scope over the same repository.
    pub fn sibling(&self, name: Option<&str>) -> Scope {
        let prefix = name.map(|n| format!("{n}.")).unwrap_or_default();
        Scope::from_parts(
            name.map(str::to_owned),
            prefix,
            Quals::new(),
            self.inner.repo.clone(),
            Arc::clone(&self.inner.shared),
        )
    }

    /// Dotted scope path; `None` for an anonymous root.
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Qualifiers added to every node named through this scope.
    pub fn quals(&self) -> &Quals {
        &self.inner.quals
    }

    pub fn config(&self) -> &ForestConfig {
        &self.inner.shared.config
    }

    pub fn repository(&self) -> &SharedRepository {
        &self.inner.repo
    }

    pub(crate) fn shares_repository(&self, other: &Scope) -> bool {
        self.inner.repo.ptr_eq(&other.inner.repo)
    }

    /// Handle to the node `basename` of this scope, created if needed.
    #[track_caller]
    pub fn node(&self, basename: &str) -> Node {
        self.node_with(basename, &Quals::new())
    }

    /// Handle to `basename` qualified by the scope's qualifiers and `quals`.
    #[track_caller]
    pub fn node_with(&self, basename: &str, quals: &Quals) -> Node {
        self.intern(
            self.prefixed(basename),
            self.inner.quals.extended(quals),
            SourceLoc::caller(),
        )
    }

    /// `basename` with this scope's path in front.
    pub(crate) fn prefixed(&self, basename: &str) -> String {
        format!("{}{basename}", self.inner.prefix)
    }

    /// Existing node with the canonical name `name`, if any.
    ///
    /// The scope prefix is tried first, then the bare name.
    pub fn lookup(&self, name: &str) -> Option<Node> {
        let id = self.lookup_id(name)?;
        self.handle(id).ok()
    }

    pub(crate) fn lookup_id(&self, name: &str) -> Option<NodeId> {
        let repo = self.inner.repo.lock();
        if !self.inner.prefix.is_empty() {
            if let Some(id) = repo.lookup(&self.prefixed(name)) {
                return Some(id);
            }
        }
        repo.lookup(name)
    }

    /// Handle for a node id of this scope's repository.
    pub(crate) fn handle(&self, id: NodeId) -> Result<Node, ForestError> {
        let ident = self.inner.repo.lock().ident(id)?;
        Ok(Node::new(id, ident, self.clone()))
    }

    pub(crate) fn intern(&self, basename: String, quals: Quals, loc: SourceLoc) -> Node {
        let (id, ident) = self.inner.repo.lock().intern(basename, quals, loc);
        Node::new(id, ident, self.clone())
    }

    /// `base0`, `base1`, ...: the first name not yet used in the repository.
    ///
    /// The result is a basename relative to this scope.
    pub fn make_unique_name(&self, base: &str) -> String {
        let mut counters = self.inner.counters.lock();
        let counter = counters.entry(base.to_owned()).or_insert(0);
        let repo = self.inner.repo.lock();
        loop {
            let candidate = format!("{base}{counter}");
            *counter += 1;
            if !repo.contains(&qualified_name(&self.prefixed(&candidate), &self.inner.quals)) {
                return candidate;
            }
        }
    }

    /// Like [`Scope::make_unique_name`], but unprefixed, unqualified and
    /// counted once for the whole scope tree.
    pub(crate) fn make_shared_unique_name(&self, base: &str) -> String {
        let mut counters = self.inner.shared.counters.lock();
        let counter = counters.entry(base.to_owned()).or_insert(0);
        let repo = self.inner.repo.lock();
        loop {
            let candidate = format!("{base}{counter}");
            *counter += 1;
            if !repo.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// Bind an anonymous definition under a synthesized name.
    ///
    /// Errors are handled as in [`Node::bind`]; on a deferred error the
    /// result is `Ok(None)`, since there is no node to return.
    #[track_caller]
    pub fn bind(&self, def: impl Into<Definition>) -> Result<Option<Node>, ForestError> {
        let loc = SourceLoc::caller();
        match self.auto_bind(def.into(), loc) {
            Ok(id) => Ok(Some(self.handle(id)?)),
            Err(error) => {
                self.defer(error, loc)?;
                Ok(None)
            }
        }
    }

    /// The shared constant node for `lit`.
    #[track_caller]
    pub fn constant(&self, lit: impl Into<Literal>) -> Result<Node, ForestError> {
        let id = self.constant_id(lit.into(), SourceLoc::caller())?;
        self.handle(id)
    }

    pub(crate) fn constant_id(&self, lit: Literal, loc: SourceLoc) -> Result<NodeId, ForestError> {
        let cached = self.inner.shared.constants.lock().get(&lit).copied();
        if let Some(id) = cached {
            if self.inner.repo.lock().is_alive(id) {
                return Ok(id);
            }
        }
        let id = self.bind_constant(lit, loc)?;
        self.inner.shared.constants.lock().insert(lit, id);
        Ok(id)
    }

    /// Protect `node` from orphan pruning.
    pub fn add_root(&self, node: &Node) {
        self.inner.shared.root_group.lock().insert(node.id());
    }

    pub fn is_root(&self, node: &Node) -> bool {
        self.inner.shared.root_group.lock().contains(&node.id())
    }

    /// Resolve the forest, pruning orphans if the configuration says so.
    pub fn resolve(&self) -> Result<(), ForestError> {
        self.resolve_with(self.inner.shared.config.prune_orphans)
    }

    /// Resolve the forest with an explicit pruning policy.
    pub fn resolve_with(&self, prune_orphans: bool) -> Result<(), ForestError> {
        let root_group = self.inner.shared.root_group.lock().clone();
        self.inner.repo.lock().resolve(prune_orphans, &root_group)
    }

    /// Roots of the resolved forest, in name order.
    pub fn roots(&self) -> Vec<Node> {
        let ids: Vec<NodeId> = self.inner.repo.lock().roots().values().copied().collect();
        ids.into_iter().filter_map(|id| self.handle(id).ok()).collect()
    }

    /// Deferred errors recorded so far.
    pub fn errors(&self) -> Vec<RecordedError> {
        self.inner.repo.lock().errors().to_vec()
    }

    /// Record an error at a call boundary; see [`Repository::defer`].
    pub(crate) fn defer(&self, error: ForestError, loc: SourceLoc) -> Result<(), ForestError> {
        self.inner.repo.lock().defer(error, loc)
    }
}
