//! Node classes and class factories.
//!
//! A class tag names the computational type of a node. Tags belong to a
//! family: the `Meq` family's `Constant` class renders as `MeqConstant`.
//! Scripts build definitions by calling a class on a factory:
//!
//! ```text
//! MEQ.class("Constant").attr("value", 2).finish()
//! ```

use std::fmt;

use tdl_diagnostic::SourceLoc;

use crate::definition::DefinitionBuilder;

/// Computational type of a node.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ClassTag {
    family: String,
    name: String,
}

impl ClassTag {
    pub fn new(family: impl Into<String>, name: impl Into<String>) -> Self {
        ClassTag {
            family: family.into(),
            name: name.into(),
        }
    }

    /// A class of the `Meq` family.
    pub fn meq(name: impl Into<String>) -> Self {
        Self::new(MEQ.family, name)
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    /// Short class name, used when synthesizing node names.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ClassTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.family, self.name)
    }
}

/// Produces definition builders for the classes of one family.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ClassFactory {
    family: &'static str,
}

/// Factory for the standard `Meq` node classes.
pub const MEQ: ClassFactory = ClassFactory::new("Meq");

impl ClassFactory {
    pub const fn new(family: &'static str) -> Self {
        ClassFactory { family }
    }

    pub fn family(&self) -> &'static str {
        self.family
    }

    /// Start a definition of class `name`.
    ///
    /// An empty class name is not rejected here; the builder captures the
    /// error and it surfaces when the definition is bound.
    #[track_caller]
    pub fn class(&self, name: &str) -> DefinitionBuilder {
        let origin = SourceLoc::caller();
        if name.is_empty() {
            return DefinitionBuilder::untyped(origin).fail(tdl_diagnostic::ForestError::definition(
                format!("empty class name in family '{}'", self.family),
            ));
        }
        DefinitionBuilder::new(ClassTag::new(self.family, name), origin)
    }
}
