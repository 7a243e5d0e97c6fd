//! Invariant derivation and checking
//!
//! - `path`: derive path expressions from document nodes
//! - `tree`: the tab-indented baseline as a checkable tree
//! - `fuzzy`: attribute-similarity scoring for re-matching
//! - `report`: structured failure reporting

pub mod fuzzy;
pub mod path;
pub mod report;
pub mod tree;

pub use path::{derive_all, derive_path};
pub use report::{CheckReport, Failure, FailureKind};
pub use tree::{InvariantNode, InvariantTree, MatchConfig, NodeIdx};
