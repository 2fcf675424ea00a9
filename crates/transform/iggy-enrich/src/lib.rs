//! Tabular enrichment against a boundary data package.
//!
//! The entry point is [`Enricher`]: open a package, load a selection of
//! boundary features into memory, then join those features onto any
//! `RecordBatch` that carries coordinates or boundary codes.
//!
//! ```ignore
//! let mut enricher = Enricher::open(spec, &StoreConfig::default()).await?;
//! enricher.load(&Selection::all()).await?;
//! let enriched = enricher.enrich(&batch, &EnrichOptions::default())?;
//! ```

pub mod catalog;
pub mod crosswalk;
pub mod engine;
pub mod quadkey;
pub mod table;

mod resolver;

pub use catalog::FeatureCatalog;
pub use crosswalk::CrosswalkIndex;
pub use engine::{Enricher, QK_COLUMN};
pub use table::FeatureTable;

/// Key column shared by the crosswalk and every feature dataset.
pub const ID_COLUMN: &str = "id";
