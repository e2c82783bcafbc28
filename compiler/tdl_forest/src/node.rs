//! Nodes: identity, committed state and back-references.
//!
//! The repository owns every node in an arena indexed by [`NodeId`]. Parent
//! back-references are plain ids in a set, so a child never keeps a parent
//! alive and a parent never keeps a child alive through them; a node lives
//! exactly as long as its arena slot.
//!
//! [`Node`] is the handle scripts hold: an id plus the scope it was obtained
//! from. Its identity (name, basename, qualifiers) never changes and is
//! readable without touching the repository.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHashSet;
use tdl_diagnostic::{ForestError, SourceLoc};

use crate::child::SlotId;
use crate::class::ClassTag;
use crate::definition::{Definition, DefinitionBuilder};
use crate::qualifier::Quals;
use crate::scope::Scope;
use crate::value::{Attributes, Literal, Value};

/// Index into the repository's node arena.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        NodeId(index)
    }

    /// Get the index into the arena.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl Hash for NodeId {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// The immutable naming components of a node.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct NodeIdent {
    /// Canonical qualified name, unique within a repository.
    pub name: String,
    pub basename: String,
    pub quals: Quals,
}

/// State committed by the first successful bind.
#[derive(Clone, Eq, PartialEq, Debug)]
pub(crate) struct Committed {
    pub(crate) class: ClassTag,
    pub(crate) attrs: Attributes,
    pub(crate) children: Vec<(SlotId, NodeId)>,
    pub(crate) step_children: Vec<NodeId>,
}

impl Committed {
    /// What differs between two committed states, if anything.
    pub(crate) fn mismatch(&self, other: &Committed) -> Option<&'static str> {
        if self.class != other.class {
            Some("class")
        } else if self.attrs != other.attrs {
            Some("attributes")
        } else if self.children != other.children {
            Some("children")
        } else if self.step_children != other.step_children {
            Some("step-children")
        } else {
            None
        }
    }

    /// Children followed by step-children.
    pub(crate) fn child_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children
            .iter()
            .map(|(_, id)| *id)
            .chain(self.step_children.iter().copied())
    }
}

/// Attribute record handed to an execution layer after resolution.
///
/// Carries the node's own name and its children by name only.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FinalizedRecord {
    pub name: String,
    pub class: String,
    pub attributes: Attributes,
    pub children: Vec<(SlotId, String)>,
    pub step_children: Vec<String>,
}

/// Arena entry for one node.
#[derive(Clone, Debug)]
pub(crate) struct NodeData {
    pub(crate) ident: Arc<NodeIdent>,
    pub(crate) committed: Option<Committed>,
    /// Non-owning back-references.
    pub(crate) parents: FxHashSet<NodeId>,
    /// Where the node was first referenced.
    pub(crate) created_at: SourceLoc,
    /// Where the node was committed.
    pub(crate) defined_at: SourceLoc,
    pub(crate) finalized: Option<FinalizedRecord>,
}

impl NodeData {
    pub(crate) fn new(ident: Arc<NodeIdent>, created_at: SourceLoc) -> Self {
        NodeData {
            ident,
            committed: None,
            parents: FxHashSet::default(),
            created_at,
            defined_at: SourceLoc::UNKNOWN,
            finalized: None,
        }
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.committed.is_some()
    }

    pub(crate) fn child_ids(&self) -> Vec<NodeId> {
        self.committed
            .as_ref()
            .map(|c| c.child_ids().collect())
            .unwrap_or_default()
    }
}

/// What a node can be bound from.
#[derive(Clone, Debug)]
pub enum BindSource {
    Definition(Definition),
    /// Copy the committed state of another, already bound node.
    Node(Node),
    /// Bind the constant definition of a literal.
    Literal(Literal),
}

impl From<Definition> for BindSource {
    fn from(def: Definition) -> Self {
        BindSource::Definition(def)
    }
}

impl From<DefinitionBuilder> for BindSource {
    fn from(builder: DefinitionBuilder) -> Self {
        BindSource::Definition(builder.finish())
    }
}

impl From<Node> for BindSource {
    fn from(node: Node) -> Self {
        BindSource::Node(node)
    }
}

impl From<&Node> for BindSource {
    fn from(node: &Node) -> Self {
        BindSource::Node(node.clone())
    }
}

impl From<Literal> for BindSource {
    fn from(lit: Literal) -> Self {
        BindSource::Literal(lit)
    }
}

macro_rules! bind_from_literal {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for BindSource {
                fn from(v: $ty) -> Self {
                    BindSource::Literal(Literal::from(v))
                }
            }
        )*
    };
}

bind_from_literal!(bool, i32, i64, f64);

/// Handle to a node of a repository.
///
/// Two handles are equal when they refer to the same node of the same
/// repository.
#[derive(Clone)]
pub struct Node {
    id: NodeId,
    ident: Arc<NodeIdent>,
    scope: Scope,
}

impl Node {
    pub(crate) fn new(id: NodeId, ident: Arc<NodeIdent>, scope: Scope) -> Self {
        Node { id, ident, scope }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Scope the handle was obtained from; binds resolve children against it.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn name(&self) -> &str {
        &self.ident.name
    }

    pub fn basename(&self) -> &str {
        &self.ident.basename
    }

    pub fn quals(&self) -> &Quals {
        &self.ident.quals
    }

    pub fn ident(&self) -> &NodeIdent {
        &self.ident
    }

    /// Same node of the same repository.
    pub fn same_as(&self, other: &Node) -> bool {
        self.id == other.id && self.scope.shares_repository(&other.scope)
    }

    /// Bind this node to a definition, literal or other node.
    ///
    /// In batch mode a failed bind is recorded in the repository and the
    /// handle is returned anyway, so construction can go on; only exceeding
    /// the error limit fails the call. In interactive mode failures are
    /// returned immediately.
    #[track_caller]
    pub fn bind(&self, source: impl Into<BindSource>) -> Result<Node, ForestError> {
        let loc = SourceLoc::caller();
        if let Err(error) = self.scope.bind_node(self.id, source.into(), loc) {
            self.scope.defer(error, loc)?;
        }
        Ok(self.clone())
    }

    /// The node named by this node's qualifiers extended with `quals`.
    ///
    /// Returns the existing node if one has that name, otherwise a new
    /// uninitialized one.
    #[track_caller]
    pub fn qualify(&self, quals: &Quals) -> Node {
        let merged = self.ident.quals.extended(quals);
        self.scope
            .intern(self.ident.basename.clone(), merged, SourceLoc::caller())
    }

    /// Whether the node still exists; resolution may delete it.
    pub fn is_alive(&self) -> bool {
        self.with_data(|_| ()).is_some()
    }

    pub fn is_initialized(&self) -> bool {
        self.with_data(NodeData::is_initialized).unwrap_or(false)
    }

    pub fn class_tag(&self) -> Option<ClassTag> {
        self.with_data(|d| d.committed.as_ref().map(|c| c.class.clone()))
            .flatten()
    }

    /// Committed attributes; empty for an uninitialized node.
    pub fn attributes(&self) -> Attributes {
        self.with_data(|d| d.committed.as_ref().map(|c| c.attrs.clone()))
            .flatten()
            .unwrap_or_default()
    }

    pub fn attribute(&self, key: &str) -> Option<Value> {
        self.with_data(|d| d.committed.as_ref().and_then(|c| c.attrs.get(key).cloned()))
            .flatten()
    }

    /// Committed children with their slots.
    pub fn children(&self) -> Vec<(SlotId, Node)> {
        let ids = self
            .with_data(|d| d.committed.as_ref().map(|c| c.children.clone()))
            .flatten()
            .unwrap_or_default();
        ids.into_iter()
            .filter_map(|(slot, id)| self.scope.handle(id).ok().map(|node| (slot, node)))
            .collect()
    }

    pub fn step_children(&self) -> Vec<Node> {
        let ids = self
            .with_data(|d| d.committed.as_ref().map(|c| c.step_children.clone()))
            .flatten()
            .unwrap_or_default();
        self.handles(ids)
    }

    /// Nodes that list this node as a child or step-child, sorted by name.
    pub fn parents(&self) -> Vec<Node> {
        let ids: Vec<NodeId> = self
            .with_data(|d| d.parents.iter().copied().collect())
            .unwrap_or_default();
        let mut parents = self.handles(ids);
        parents.sort_by(|a, b| a.name().cmp(b.name()));
        parents
    }

    pub fn num_parents(&self) -> usize {
        self.with_data(|d| d.parents.len()).unwrap_or(0)
    }

    /// Where the node was committed, if it is initialized.
    pub fn defined_at(&self) -> Option<SourceLoc> {
        self.with_data(|d| d.is_initialized().then_some(d.defined_at))
            .flatten()
    }

    /// Where the node was first referenced.
    pub fn created_at(&self) -> Option<SourceLoc> {
        self.with_data(|d| d.created_at)
    }

    /// Record produced by the finalize pass of resolution.
    pub fn finalized(&self) -> Option<FinalizedRecord> {
        self.with_data(|d| d.finalized.clone()).flatten()
    }

    fn with_data<R>(&self, f: impl FnOnce(&NodeData) -> R) -> Option<R> {
        let repo = self.scope.repository().lock();
        repo.get(self.id).map(f)
    }

    fn handles(&self, ids: Vec<NodeId>) -> Vec<Node> {
        ids.into_iter()
            .filter_map(|id| self.scope.handle(id).ok())
            .collect()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.ident.name)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ident.name)
    }
}
