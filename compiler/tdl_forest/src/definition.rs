//! Unbound node definitions.
//!
//! A [`Definition`] describes what a node should become: its class, its
//! attributes, its children and its step-children. Building one never
//! touches the repository. Problems found while building (children given
//! two ways, an empty class name) are captured in the definition and raised
//! when it is bound, so they are attributed to the bind site.

use tdl_diagnostic::{ForestError, SourceLoc};

use crate::child::{ChildList, ChildRef};
use crate::class::ClassTag;
use crate::value::{Attributes, Value};

/// An immutable description of a node, consumed by binding.
#[derive(Clone, Debug)]
pub struct Definition {
    class: Option<ClassTag>,
    attrs: Attributes,
    children: ChildList,
    step_children: ChildList,
    error: Option<ForestError>,
    origin: SourceLoc,
}

/// The checked contents of a definition.
pub(crate) struct DefinitionParts {
    pub(crate) class: ClassTag,
    pub(crate) attrs: Attributes,
    pub(crate) children: ChildList,
    pub(crate) step_children: ChildList,
}

impl Definition {
    /// Start a definition with no class; set one with [`DefinitionBuilder::class`].
    #[track_caller]
    pub fn build() -> DefinitionBuilder {
        DefinitionBuilder::untyped(SourceLoc::caller())
    }

    pub fn class_tag(&self) -> Option<&ClassTag> {
        self.class.as_ref()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attrs
    }

    pub fn children(&self) -> &ChildList {
        &self.children
    }

    pub fn step_children(&self) -> &ChildList {
        &self.step_children
    }

    /// Error captured while building, raised at bind time.
    pub fn error(&self) -> Option<&ForestError> {
        self.error.as_ref()
    }

    /// Where the definition was built.
    pub fn origin(&self) -> SourceLoc {
        self.origin
    }

    /// Raise the captured error, or check mandatory fields.
    pub(crate) fn into_parts(self) -> Result<DefinitionParts, ForestError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let Some(class) = self.class else {
            return Err(ForestError::definition(format!(
                "definition built at {} has no class",
                self.origin
            )));
        };
        Ok(DefinitionParts {
            class,
            attrs: self.attrs,
            children: self.children,
            step_children: self.step_children,
        })
    }
}

/// How the children of a definition were specified.
#[derive(Clone, Debug, Default)]
enum ChildSpec {
    #[default]
    None,
    /// One `child()` call per child.
    Positional(ChildList),
    /// A single `children()` call.
    Explicit(ChildList),
    /// `labeled()` calls.
    Keyword(ChildList),
}

impl ChildSpec {
    fn kind(&self) -> &'static str {
        match self {
            ChildSpec::None => "none",
            ChildSpec::Positional(_) => "positionally",
            ChildSpec::Explicit(_) => "as a child list",
            ChildSpec::Keyword(_) => "by label",
        }
    }

    fn into_list(self) -> ChildList {
        match self {
            ChildSpec::None => ChildList::new(),
            ChildSpec::Positional(list) | ChildSpec::Explicit(list) | ChildSpec::Keyword(list) => {
                list
            }
        }
    }
}

/// Incrementally builds a [`Definition`].
#[derive(Clone, Debug)]
#[must_use = "a definition builder does nothing until finished and bound"]
pub struct DefinitionBuilder {
    class: Option<ClassTag>,
    attrs: Attributes,
    children: ChildSpec,
    step_children: ChildList,
    error: Option<ForestError>,
    origin: SourceLoc,
}

impl DefinitionBuilder {
    pub(crate) fn new(class: ClassTag, origin: SourceLoc) -> Self {
        DefinitionBuilder {
            class: Some(class),
            ..Self::untyped(origin)
        }
    }

    pub(crate) fn untyped(origin: SourceLoc) -> Self {
        DefinitionBuilder {
            class: None,
            attrs: Attributes::new(),
            children: ChildSpec::None,
            step_children: ChildList::new(),
            error: None,
            origin,
        }
    }

    /// Capture an error; only the first one is kept.
    pub(crate) fn fail(mut self, error: ForestError) -> Self {
        if self.error.is_none() {
            self.error = Some(error);
        }
        self
    }

    fn conflicting_children(self, attempted: &'static str) -> Self {
        let message = format!(
            "children specified {} and {attempted} in definition built at {}",
            self.children.kind(),
            self.origin
        );
        self.fail(ForestError::child(message))
    }

    pub fn class(mut self, class: ClassTag) -> Self {
        self.class = Some(class);
        self
    }

    /// Append a positional child.
    pub fn child(mut self, child: impl Into<ChildRef>) -> Self {
        match self.children {
            ChildSpec::None => self.children = ChildSpec::Positional(ChildList::new()),
            ChildSpec::Positional(_) => {}
            ChildSpec::Explicit(_) | ChildSpec::Keyword(_) => {
                return self.conflicting_children("positionally");
            }
        }
        if let ChildSpec::Positional(list) = &mut self.children {
            list.push_positional(child.into());
        }
        self
    }

    /// Set the whole child list at once.
    pub fn children(mut self, children: impl Into<ChildList>) -> Self {
        match self.children {
            ChildSpec::None => {
                self.children = ChildSpec::Explicit(children.into());
                self
            }
            _ => self.conflicting_children("as a child list"),
        }
    }

    /// Add a child under a label.
    pub fn labeled(mut self, label: impl Into<String>, child: impl Into<ChildRef>) -> Self {
        match self.children {
            ChildSpec::None => self.children = ChildSpec::Keyword(ChildList::new()),
            ChildSpec::Keyword(_) => {}
            ChildSpec::Positional(_) | ChildSpec::Explicit(_) => {
                return self.conflicting_children("by label");
            }
        }
        if let ChildSpec::Keyword(list) = &mut self.children {
            list.push_labeled(label.into(), child.into());
        }
        self
    }

    /// Append a step-child.
    pub fn step_child(mut self, child: impl Into<ChildRef>) -> Self {
        self.step_children.push_positional(child.into());
        self
    }

    /// Append several step-children.
    pub fn step_children<C: Into<ChildRef>>(mut self, children: impl IntoIterator<Item = C>) -> Self {
        for child in children {
            self.step_children.push_positional(child.into());
        }
        self
    }

    /// Set an attribute; a later value for the same key replaces the earlier one.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn finish(self) -> Definition {
        Definition {
            class: self.class,
            attrs: self.attrs,
            children: self.children.into_list(),
            step_children: self.step_children,
            error: self.error,
            origin: self.origin,
        }
    }
}

impl From<DefinitionBuilder> for Definition {
    fn from(builder: DefinitionBuilder) -> Self {
        builder.finish()
    }
}
