//! # dom-invariants
//!
//! Derives structural invariants from DOM snapshots and re-checks them
//! against later versions of the same page. Invariants are path
//! expressions (`//tag[n][@k="v" and ...]`) arranged in a tree that
//! mirrors the document hierarchy; checking tolerates drift through
//! fuzzy attribute matching and parent promotion.
//!
//! The crate has three layers:
//!
//! - [`dom`]: arena documents parsed leniently from markup snapshots
//! - [`query`]: the path-expression language and its cached evaluator
//! - [`invariant`] + [`store`]: derivation, tree checking and the
//!   per-click-path baseline store
//!
//! ## Example
//!
//! ```
//! use dom_invariants::{Document, InvariantStore, StoreConfig};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = InvariantStore::new(StoreConfig::new(dir.path()));
//!
//! // First visit learns the baseline
//! let doc = Document::parse("<html><body><div id=\"main\"/></body></html>");
//! let outcome = store.check_state(&["click #start"], &doc).unwrap();
//! assert!(outcome.fresh_baseline);
//!
//! // Later visits prune whatever stopped holding
//! let doc = Document::parse("<html><body/></html>");
//! let outcome = store.check_state(&["click #start"], &doc).unwrap();
//! assert_eq!(outcome.surviving.len(), 2);
//! ```

pub mod dom;
pub mod error;
pub mod invariant;
pub mod query;
pub mod store;

pub use dom::{Document, DomAccess, NodeId};
pub use error::{Error, QueryError};
pub use invariant::{CheckReport, Failure, FailureKind, InvariantTree, MatchConfig};
pub use store::{identity_hash, CheckOutcome, InvariantStore, StoreConfig};
