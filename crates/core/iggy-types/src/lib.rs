//! Core types for iggy enrichment.
//!
//! This crate defines the vocabulary shared by the package reader and the
//! enrichment engine:
//!
//! - [`Boundary`] - the closed set of boundary types a package can carry
//! - [`Selection`] - which boundaries and features to load
//! - [`IdentifierColumns`] / [`EnrichOptions`] - how input rows are resolved

pub mod boundary;
pub mod options;
pub mod selection;

pub use boundary::Boundary;
pub use options::{EnrichOptions, IdentifierColumns, DEFAULT_ZOOM};
pub use selection::Selection;
