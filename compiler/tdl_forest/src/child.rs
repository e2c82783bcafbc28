//! Child references and child lists.
//!
//! A child may be given as a bound node, the name of an existing node, a
//! numeric literal, an unbound definition, or a closure producing one of
//! those. Resolution turns every entry into a bound node, auto-binding
//! anonymous definitions and literal constants along the way.

use std::fmt;
use std::sync::Arc;

use tdl_diagnostic::{ForestError, SourceLoc};

use crate::definition::{Definition, DefinitionBuilder};
use crate::node::{Node, NodeId};
use crate::scope::Scope;
use crate::value::Literal;

/// How many closure invocations resolution follows before giving up.
pub const MAX_INVOKE_DEPTH: usize = 8;

/// Position or label of a child within its parent.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SlotId {
    Index(usize),
    Label(String),
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotId::Index(i) => write!(f, "{i}"),
            SlotId::Label(label) => f.write_str(label),
        }
    }
}

/// A deferred child: invoked at resolution time to produce the real reference.
#[derive(Clone)]
pub struct Invokable(Arc<dyn Fn() -> ChildRef + Send + Sync>);

impl Invokable {
    pub fn new(f: impl Fn() -> ChildRef + Send + Sync + 'static) -> Self {
        Invokable(Arc::new(f))
    }

    pub fn invoke(&self) -> ChildRef {
        (self.0)()
    }
}

impl fmt::Debug for Invokable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Invokable(..)")
    }
}

/// Anything that can stand for a child node.
#[derive(Clone, Debug)]
pub enum ChildRef {
    Node(Node),
    Name(String),
    Literal(Literal),
    Definition(Box<Definition>),
    Invokable(Invokable),
}

impl ChildRef {
    /// A child produced by calling `f` when the parent is bound.
    pub fn invoke(f: impl Fn() -> ChildRef + Send + Sync + 'static) -> Self {
        ChildRef::Invokable(Invokable::new(f))
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            ChildRef::Node(node) => Some(node),
            _ => None,
        }
    }
}

impl From<Node> for ChildRef {
    fn from(node: Node) -> Self {
        ChildRef::Node(node)
    }
}

impl From<&Node> for ChildRef {
    fn from(node: &Node) -> Self {
        ChildRef::Node(node.clone())
    }
}

impl From<&str> for ChildRef {
    fn from(name: &str) -> Self {
        ChildRef::Name(name.to_owned())
    }
}

impl From<String> for ChildRef {
    fn from(name: String) -> Self {
        ChildRef::Name(name)
    }
}

impl From<Definition> for ChildRef {
    fn from(def: Definition) -> Self {
        ChildRef::Definition(Box::new(def))
    }
}

impl From<DefinitionBuilder> for ChildRef {
    fn from(builder: DefinitionBuilder) -> Self {
        ChildRef::Definition(Box::new(builder.finish()))
    }
}

impl From<Literal> for ChildRef {
    fn from(lit: Literal) -> Self {
        ChildRef::Literal(lit)
    }
}

macro_rules! child_from_literal {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ChildRef {
                fn from(v: $ty) -> Self {
                    ChildRef::Literal(Literal::from(v))
                }
            }
        )*
    };
}

child_from_literal!(bool, i32, i64, f64);

/// Ordered `(slot, child)` pairs in source form.
///
/// Built from a sequence (slots are positions), a mapping (slots are labels)
/// or a single child (slot 0).
#[derive(Clone, Debug, Default)]
pub struct ChildList {
    entries: Vec<(SlotId, ChildRef)>,
}

impl ChildList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Children indexed by position.
    pub fn from_seq<C: Into<ChildRef>>(children: impl IntoIterator<Item = C>) -> Self {
        let entries = children
            .into_iter()
            .enumerate()
            .map(|(i, child)| (SlotId::Index(i), child.into()))
            .collect();
        ChildList { entries }
    }

    /// Children indexed by label.
    pub fn from_map<K: Into<String>, C: Into<ChildRef>>(
        children: impl IntoIterator<Item = (K, C)>,
    ) -> Self {
        let entries = children
            .into_iter()
            .map(|(label, child)| (SlotId::Label(label.into()), child.into()))
            .collect();
        ChildList { entries }
    }

    /// A single child at position 0.
    pub fn single(child: impl Into<ChildRef>) -> Self {
        ChildList {
            entries: vec![(SlotId::Index(0), child.into())],
        }
    }

    pub(crate) fn push_positional(&mut self, child: ChildRef) {
        let slot = SlotId::Index(self.entries.len());
        self.entries.push((slot, child));
    }

    pub(crate) fn push_labeled(&mut self, label: String, child: ChildRef) {
        self.entries.push((SlotId::Label(label), child));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(SlotId, ChildRef)> {
        self.entries.iter()
    }

    /// Whether every entry is already a bound node handle.
    pub fn is_resolved(&self) -> bool {
        self.entries.iter().all(|(_, child)| child.as_node().is_some())
    }

    /// Resolve every entry to a node of `scope`'s repository.
    ///
    /// Resolving an already resolved list returns an equal list.
    #[track_caller]
    pub fn resolve(&self, scope: &Scope) -> Result<ChildList, ForestError> {
        let loc = SourceLoc::caller();
        let ids = self.clone().resolve_ids(scope, loc)?;
        let entries = ids
            .into_iter()
            .map(|(slot, id)| -> Result<_, ForestError> {
                Ok((slot, ChildRef::Node(scope.handle(id)?)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ChildList { entries })
    }

    /// Resolve into `(slot, id)` pairs, in order.
    pub(crate) fn resolve_ids(
        self,
        scope: &Scope,
        loc: SourceLoc,
    ) -> Result<Vec<(SlotId, NodeId)>, ForestError> {
        self.entries
            .into_iter()
            .map(|(slot, child)| -> Result<_, ForestError> {
                let id = scope.resolve_child(child, &slot, loc)?;
                Ok((slot, id))
            })
            .collect()
    }
}

impl<C: Into<ChildRef>> From<Vec<C>> for ChildList {
    fn from(children: Vec<C>) -> Self {
        ChildList::from_seq(children)
    }
}

impl<C: Into<ChildRef>, const N: usize> From<[C; N]> for ChildList {
    fn from(children: [C; N]) -> Self {
        ChildList::from_seq(children)
    }
}
