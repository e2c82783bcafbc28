//! Node-graph construction and resolution for TDL forests.
//!
//! Scripts describe a forest of computation nodes: they obtain node handles
//! from a [`Scope`], build [`Definition`]s with a class factory, and bind
//! definitions onto nodes. Nothing is validated globally until the scope is
//! resolved, which deletes nodes that were never bound, freezes the
//! hand-off record of every survivor, and picks the roots of the forest.
//!
//! ```text
//! let ns = Scope::with_config(None, ForestConfig::interactive());
//! let a = ns.node("a").bind(MEQ.class("Constant").attr("value", 1))?;
//! let b = ns.node("b").bind(2.0)?;
//! ns.node("c").bind(&a + &b)?;
//! ns.resolve()?;
//! ```
//!
//! # Identity
//!
//! Every node has one canonical name, `basename[:qual]*[:key=v1,v2]*`,
//! unique within its repository. Asking for the same name twice returns the
//! same node, and anonymous definitions are named after their class and
//! children so identical sub-expressions fold onto one node.
//!
//! # Errors
//!
//! In [`ConstructionMode::Batch`] a failed bind is recorded and construction
//! goes on; `resolve()` then reports everything at once. In
//! [`ConstructionMode::Interactive`] every failure is returned immediately.

mod bind;
pub mod child;
pub mod class;
pub mod config;
pub mod definition;
pub mod node;
mod ops;
pub mod qualifier;
pub mod repository;
pub mod scope;
pub mod value;

use std::sync::Once;

pub use child::{ChildList, ChildRef, Invokable, SlotId, MAX_INVOKE_DEPTH};
pub use class::{ClassFactory, ClassTag, MEQ};
pub use config::{ConstructionMode, ForestConfig};
pub use definition::{Definition, DefinitionBuilder};
pub use node::{BindSource, FinalizedRecord, Node, NodeId, NodeIdent};
pub use ops::{add, divide, multiply, subtract};
pub use qualifier::{qualified_name, Qual, Quals};
pub use repository::{Repository, RepositoryState, SharedRepository};
pub use scope::Scope;
pub use value::{Attributes, Literal, Value};

pub use tdl_diagnostic::{ErrorCode, ForestError, RecordedError, SourceLoc};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing with an environment filter.
///
/// Does nothing unless `RUST_LOG` is set, e.g. `RUST_LOG=tdl_forest=debug`.
/// Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
