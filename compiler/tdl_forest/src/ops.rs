//! Arithmetic and bind sugar.
//!
//! `a + b` on nodes or definitions builds an unbound two-child definition
//! of the matching `Meq` class (`Add`, `Subtract`, `Multiply`, `Divide`);
//! it is named and bound like any other anonymous definition once used as
//! a child or bound through a scope. `node << source` is [`Node::bind`].

use std::ops::{Add, Div, Mul, Shl, Sub};

use tdl_diagnostic::{ForestError, SourceLoc};

use crate::child::ChildRef;
use crate::class::ClassTag;
use crate::definition::{Definition, DefinitionBuilder};
use crate::node::{BindSource, Node};

fn binary(class: &str, lhs: ChildRef, rhs: ChildRef, origin: SourceLoc) -> Definition {
    DefinitionBuilder::new(ClassTag::meq(class), origin)
        .child(lhs)
        .child(rhs)
        .finish()
}

/// `MeqAdd(lhs, rhs)`, unbound.
#[track_caller]
pub fn add(lhs: impl Into<ChildRef>, rhs: impl Into<ChildRef>) -> Definition {
    binary("Add", lhs.into(), rhs.into(), SourceLoc::caller())
}

/// `MeqSubtract(lhs, rhs)`, unbound.
#[track_caller]
pub fn subtract(lhs: impl Into<ChildRef>, rhs: impl Into<ChildRef>) -> Definition {
    binary("Subtract", lhs.into(), rhs.into(), SourceLoc::caller())
}

/// `MeqMultiply(lhs, rhs)`, unbound.
#[track_caller]
pub fn multiply(lhs: impl Into<ChildRef>, rhs: impl Into<ChildRef>) -> Definition {
    binary("Multiply", lhs.into(), rhs.into(), SourceLoc::caller())
}

/// `MeqDivide(lhs, rhs)`, unbound.
#[track_caller]
pub fn divide(lhs: impl Into<ChildRef>, rhs: impl Into<ChildRef>) -> Definition {
    binary("Divide", lhs.into(), rhs.into(), SourceLoc::caller())
}

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $class:literal: $($lhs:ty),*) => {
        $(
            impl<R: Into<ChildRef>> $trait<R> for $lhs {
                type Output = Definition;

                #[track_caller]
                fn $method(self, rhs: R) -> Definition {
                    binary($class, self.into(), rhs.into(), SourceLoc::caller())
                }
            }
        )*
    };
}

binary_operator!(Add, add, "Add": Node, &Node, Definition);
binary_operator!(Sub, sub, "Subtract": Node, &Node, Definition);
binary_operator!(Mul, mul, "Multiply": Node, &Node, Definition);
binary_operator!(Div, div, "Divide": Node, &Node, Definition);

impl<S: Into<BindSource>> Shl<S> for &Node {
    type Output = Result<Node, ForestError>;

    #[track_caller]
    fn shl(self, source: S) -> Self::Output {
        self.bind(source)
    }
}

impl<S: Into<BindSource>> Shl<S> for Node {
    type Output = Result<Node, ForestError>;

    #[track_caller]
    fn shl(self, source: S) -> Self::Output {
        self.bind(source)
    }
}
