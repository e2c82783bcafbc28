//! Binding: committing definitions onto nodes.
//!
//! Binding a definition resolves its children first (recursively binding
//! anonymous definitions and literals), then commits class, attributes and
//! children onto the target node. Nothing in here defers errors; that
//! happens once, at the public call boundary (`Node::bind`, `Scope::bind`).
//!
//! # Auto-naming
//!
//! A definition bound without a target is named after its contents, inside
//! the binding scope's path:
//! - no children: the lowercased class name made unique (`parm0`), with
//!   the scope's qualifiers
//! - children: `Class(child1,child2,...)` qualified by the unique-merge of
//!   the children's qualifiers
//!
//! so the same expression over the same children always names the same node.
//! Literal constants are the exception: one node per value for the whole
//! scope tree, named `constant0`, `constant1`, ... without path or qualifiers.

use tdl_diagnostic::{ForestError, SourceLoc};

use crate::child::{ChildRef, SlotId, MAX_INVOKE_DEPTH};
use crate::class::ClassTag;
use crate::definition::{Definition, DefinitionBuilder};
use crate::node::{BindSource, Committed, Node, NodeId};
use crate::qualifier::Quals;
use crate::scope::Scope;
use crate::value::Literal;

/// The `MeqConstant` definition holding a literal value.
fn constant_definition(lit: Literal, origin: SourceLoc) -> Definition {
    DefinitionBuilder::new(ClassTag::meq("Constant"), origin)
        .attr("value", lit)
        .finish()
}

impl Scope {
    /// Bind `source` onto node `target`.
    pub(crate) fn bind_node(
        &self,
        target: NodeId,
        source: BindSource,
        loc: SourceLoc,
    ) -> Result<(), ForestError> {
        self.repository().lock().ensure_open("bind a node")?;
        let committed = match source {
            BindSource::Definition(def) => self.resolve_definition(def, loc)?,
            BindSource::Literal(lit) => {
                self.resolve_definition(constant_definition(lit, loc), loc)?
            }
            BindSource::Node(node) => self.committed_of(&node)?,
        };
        self.repository().lock().commit(target, committed, loc)
    }

    /// Committed state of another node, for aliasing binds.
    fn committed_of(&self, node: &Node) -> Result<Committed, ForestError> {
        if !self.shares_repository(node.scope()) {
            return Err(ForestError::definition(format!(
                "node '{}' belongs to another repository",
                node.name()
            )));
        }
        self.repository()
            .lock()
            .committed(node.id())
            .cloned()
            .ok_or_else(|| ForestError::Unbound {
                name: node.name().to_owned(),
            })
    }

    /// Check a definition and resolve its children.
    fn resolve_definition(&self, def: Definition, loc: SourceLoc) -> Result<Committed, ForestError> {
        let parts = def.into_parts()?;
        let children = parts.children.resolve_ids(self, loc)?;
        let step_children = parts
            .step_children
            .resolve_ids(self, loc)?
            .into_iter()
            .map(|(_, id)| id)
            .collect();
        Ok(Committed {
            class: parts.class,
            attrs: parts.attrs,
            children,
            step_children,
        })
    }

    /// Bind an anonymous definition under a synthesized name.
    pub(crate) fn auto_bind(&self, def: Definition, loc: SourceLoc) -> Result<NodeId, ForestError> {
        self.repository().lock().ensure_open("bind a node")?;
        let committed = self.resolve_definition(def, loc)?;
        let (basename, quals) = self.synthesize_name(&committed)?;
        self.commit_named(basename, quals, committed, loc)
    }

    /// Bind the constant node for a new literal.
    ///
    /// Constants are shared by the whole scope tree, so their names carry
    /// neither a scope path nor scope qualifiers.
    pub(crate) fn bind_constant(&self, lit: Literal, loc: SourceLoc) -> Result<NodeId, ForestError> {
        self.repository().lock().ensure_open("bind a node")?;
        let committed = self.resolve_definition(constant_definition(lit, loc), loc)?;
        let basename = self.make_shared_unique_name("constant");
        self.commit_named(basename, Quals::new(), committed, loc)
    }

    fn commit_named(
        &self,
        basename: String,
        quals: Quals,
        committed: Committed,
        loc: SourceLoc,
    ) -> Result<NodeId, ForestError> {
        let node = self.intern(basename, quals, loc);
        tracing::trace!(node = %node.name(), "auto-named definition");
        self.repository().lock().commit(node.id(), committed, loc)?;
        Ok(node.id())
    }

    fn synthesize_name(&self, committed: &Committed) -> Result<(String, Quals), ForestError> {
        let class_name = committed.class.name();
        if committed.children.is_empty() {
            let base = self.make_unique_name(&class_name.to_lowercase());
            return Ok((self.prefixed(&base), self.quals().clone()));
        }

        let repo = self.repository().lock();
        let mut basenames = Vec::with_capacity(committed.children.len());
        let mut quals = Quals::new();
        for (_, child) in &committed.children {
            let ident = repo.ident(*child)?;
            basenames.push(ident.basename.clone());
            quals.merge_unique(&ident.quals);
        }
        let basename = format!("{class_name}({})", basenames.join(","));
        Ok((self.prefixed(&basename), quals))
    }

    /// Resolve one child reference to a node id.
    pub(crate) fn resolve_child(
        &self,
        child: ChildRef,
        slot: &SlotId,
        loc: SourceLoc,
    ) -> Result<NodeId, ForestError> {
        let mut current = child;
        let mut invocations = 0;
        loop {
            current = match current {
                ChildRef::Node(node) => {
                    if !self.shares_repository(node.scope()) {
                        return Err(ForestError::child(format!(
                            "child {slot}: node '{}' belongs to another repository",
                            node.name()
                        )));
                    }
                    return Ok(node.id());
                }
                ChildRef::Name(name) => {
                    return self.lookup_id(&name).ok_or_else(|| {
                        ForestError::child(format!("child {slot}: no node named '{name}'"))
                    });
                }
                ChildRef::Literal(lit) => return self.constant_id(lit, loc),
                ChildRef::Definition(def) => return self.auto_bind(*def, loc),
                ChildRef::Invokable(f) => {
                    if invocations == MAX_INVOKE_DEPTH {
                        return Err(ForestError::child(format!(
                            "child {slot}: still not a node after {MAX_INVOKE_DEPTH} invocations"
                        )));
                    }
                    invocations += 1;
                    tracing::trace!(%slot, invocations, "invoking deferred child");
                    f.invoke()
                }
            };
        }
    }
}
