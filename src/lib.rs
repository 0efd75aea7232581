//! Column-oriented tables for tree sequences, plus the sorting
//! and simplification routines that reduce them to the minimal
//! ancestry of a set of samples.
//!
//! A tree sequence encodes the genealogy of sampled chromosomes
//! as tables of nodes (ancestors) and edgesets (parent →
//! children transmissions over genomic intervals). The typical
//! workflow is:
//!
//! 1. populate a [`NodeTable`] and [`EdgesetTable`] (and
//!    optionally [`SiteTable`] / [`MutationTable`]),
//! 2. [`sort_tables`] to establish the required row order,
//! 3. [`simplify`] to restrict the tables to the ancestry of a
//!    list of sample nodes.
//!
//! Serialization, simulation, and statistics live elsewhere;
//! this crate is only the table data model and the
//! simplification core.

pub mod avl;
mod error;
pub mod object_arena;
mod simplify;
mod sort;
mod tables;
mod tsdef;

pub use error::{TreeSeqError, TreeSeqResult};
pub use simplify::{simplify, Simplifier};
pub use sort::sort_tables;
pub use tables::*;
pub use tsdef::*;

/// Get the crate version number.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
