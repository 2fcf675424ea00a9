//! Package directory-naming conventions.

use iggy_types::Boundary;
use serde::{Deserialize, Serialize};

/// The data prefix that elides the root directory-name suffix.
pub const DEFAULT_PREFIX: &str = "unified";

/// Geometry encoding of a package, selecting the root-name infix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeomType {
    /// Well-known-text geometries (`iggy-package-wkt-...` roots)
    #[default]
    Wkt,
    /// JSON geometries (`iggy-package-...` roots)
    Json,
}

/// Coordinates of a data package.
///
/// The fields jointly resolve to one versioned root directory:
///
/// ```text
/// <base_location>/iggy-package[-wkt]-<version_id>[_<prefix>]/
///     <crosswalk_prefix>_<version_id>/        one partitioned crosswalk
///     <prefix>_<boundary>_<version_id>/       one dataset per boundary
/// ```
///
/// The `_<prefix>` suffix is omitted when the prefix is `unified`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageSpec {
    /// Local directory or `s3://` URI the package root lives under.
    pub base_location: String,

    /// Package version identifier (a release timestamp in practice).
    pub version_id: String,

    /// Data prefix shared by the root and the boundary dataset directories.
    pub prefix: String,

    /// Crosswalk directory prefix.
    pub crosswalk_prefix: String,

    /// Geometry encoding of the package.
    pub geom_type: GeomType,
}

impl PackageSpec {
    /// Create a spec with the default prefix and WKT geometries.
    pub fn new(
        base_location: impl Into<String>,
        version_id: impl Into<String>,
        crosswalk_prefix: impl Into<String>,
    ) -> Self {
        Self {
            base_location: base_location.into(),
            version_id: version_id.into(),
            prefix: DEFAULT_PREFIX.to_string(),
            crosswalk_prefix: crosswalk_prefix.into(),
            geom_type: GeomType::default(),
        }
    }

    /// Set the data prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the geometry encoding.
    pub fn with_geom_type(mut self, geom_type: GeomType) -> Self {
        self.geom_type = geom_type;
        self
    }

    /// Validate the spec.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_location.is_empty() {
            return Err("base_location must not be empty".to_string());
        }
        if self.version_id.is_empty() {
            return Err("version_id must not be empty".to_string());
        }
        if self.prefix.is_empty() {
            return Err("prefix must not be empty".to_string());
        }
        if self.crosswalk_prefix.is_empty() {
            return Err("crosswalk_prefix must not be empty".to_string());
        }
        Ok(())
    }

    /// Root directory name under the base location.
    pub fn root_dir_name(&self) -> String {
        let infix = match self.geom_type {
            GeomType::Wkt => "-wkt",
            GeomType::Json => "",
        };
        if self.prefix == DEFAULT_PREFIX {
            format!("iggy-package{}-{}", infix, self.version_id)
        } else {
            format!("iggy-package{}-{}_{}", infix, self.version_id, self.prefix)
        }
    }

    /// Crosswalk directory name under the root.
    pub fn crosswalk_dir_name(&self) -> String {
        format!("{}_{}", self.crosswalk_prefix, self.version_id)
    }

    /// Boundary dataset directory name under the root.
    pub fn boundary_dir_name(&self, boundary: Boundary) -> String {
        format!("{}_{}_{}", self.prefix, boundary, self.version_id)
    }
}
