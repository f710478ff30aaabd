//! # prepdiff
//!
//! A diff/preview execution engine and filter expression adapter for
//! data-preparation grids: diff an annotated snapshot against the displayed
//! data into a minimal instruction set, apply it revertibly, and translate
//! column filters to and from the backend query grammar.

pub mod cancel;
pub mod diff;
pub mod error;
pub mod filter;
pub mod grid;
pub mod model;
pub mod preview;
pub mod store;
pub mod text;
pub mod tree;

pub use cancel::CancellationToken;
pub use diff::compute_diff;
pub use error::{PrepdiffError, Result};
pub use filter::{Filter, FilterKind, FilterList};
pub use grid::GridService;
pub use model::{DatasetSnapshot, Instruction, InstructionSet, Row};
pub use preview::{PreviewProvider, PreviewService};
pub use store::{InMemoryRowStore, RowStore};
pub use tree::{from_tree, to_tree, FilterEnvelope, FilterTree};
