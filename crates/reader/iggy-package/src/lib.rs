//! Data package location and reading.
//!
//! An iggy data package is a directory tree of partitioned Parquet datasets:
//! one quadkey crosswalk plus one feature table per boundary type, laid out
//! under a versioned root. This crate resolves package coordinates into
//! concrete store paths and reads whole datasets (all partitions, optionally
//! column-projected) into Arrow record batches.
//!
//! Local directories and `s3://` URIs share one code path through
//! `object_store`.
//!
//! # Example
//!
//! ```ignore
//! use iggy_package::{DataPackage, PackageSpec, StoreConfig};
//!
//! let spec = PackageSpec::new(
//!     "s3://iggy-packages",
//!     "20211110214810",
//!     "fl_pinellas_quadkeys_crosswalk",
//! );
//! let package = DataPackage::open(spec, &StoreConfig::default()).await?;
//! let crosswalk = package.read_dataset(&package.crosswalk_path(), None).await?;
//! ```

pub mod dataset;
pub mod layout;
pub mod store;

pub use dataset::{DataPackage, PARTITION_SUFFIX};
pub use layout::{GeomType, PackageSpec, DEFAULT_PREFIX};
pub use store::StoreConfig;
