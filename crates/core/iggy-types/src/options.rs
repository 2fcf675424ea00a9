//! Per-enrich configuration: identifier columns and join behavior.

use crate::Boundary;
use serde::{Deserialize, Serialize};

/// Default tile zoom level for point-to-quadkey mapping.
///
/// Crosswalks are built at zoom 19, where a tile spans roughly 75 meters at
/// the equator.
pub const DEFAULT_ZOOM: u8 = 19;

/// Maximum tile zoom level the quadkey scheme supports.
pub const MAX_ZOOM: u8 = 23;

/// An input-column mapping used to resolve rows to boundary identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdentifierColumns {
    /// Geographic point columns, resolved through the quadkey crosswalk.
    Point { latitude: String, longitude: String },

    /// An explicit boundary-code column, used directly as the join key.
    Code { boundary: Boundary, column: String },
}

impl IdentifierColumns {
    /// Short human-readable description, used in error messages.
    pub fn describe(&self) -> String {
        match self {
            IdentifierColumns::Point {
                latitude,
                longitude,
            } => format!("{}/{}", latitude, longitude),
            IdentifierColumns::Code { boundary, column } => format!("{}={}", boundary, column),
        }
    }
}

/// Options controlling how a batch is resolved and joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichOptions {
    /// Identifier column mappings, tried against the input schema.
    ///
    /// A mapping whose columns are all absent is skipped; a partial match
    /// (latitude present, longitude missing) is an error. When a code column
    /// and a point both cover the same boundary the code wins, with per-row
    /// fallback to the point-derived identifier where the code cell is null.
    pub identifiers: Vec<IdentifierColumns>,

    /// Tile zoom level for point-to-quadkey mapping.
    pub zoom: u8,

    /// Keep the computed quadkey as a `qk` output column.
    ///
    /// Only emitted when a point identifier was actually used.
    pub keep_quadkey: bool,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            identifiers: vec![IdentifierColumns::Point {
                latitude: "latitude".to_string(),
                longitude: "longitude".to_string(),
            }],
            zoom: DEFAULT_ZOOM,
            keep_quadkey: false,
        }
    }
}

impl EnrichOptions {
    /// Create options with the default point columns and zoom.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the latitude/longitude column names, replacing any existing point
    /// mapping.
    pub fn with_point_columns(
        mut self,
        latitude: impl Into<String>,
        longitude: impl Into<String>,
    ) -> Self {
        self.identifiers
            .retain(|i| !matches!(i, IdentifierColumns::Point { .. }));
        self.identifiers.push(IdentifierColumns::Point {
            latitude: latitude.into(),
            longitude: longitude.into(),
        });
        self
    }

    /// Add a boundary-code column, replacing any existing mapping for the
    /// same boundary.
    pub fn with_code_column(mut self, boundary: Boundary, column: impl Into<String>) -> Self {
        self.identifiers
            .retain(|i| !matches!(i, IdentifierColumns::Code { boundary: b, .. } if *b == boundary));
        self.identifiers.push(IdentifierColumns::Code {
            boundary,
            column: column.into(),
        });
        self
    }

    /// Drop the point mapping entirely (code columns only).
    pub fn without_point_columns(mut self) -> Self {
        self.identifiers
            .retain(|i| !matches!(i, IdentifierColumns::Point { .. }));
        self
    }

    /// Set the tile zoom level.
    pub fn with_zoom(mut self, zoom: u8) -> Self {
        self.zoom = zoom;
        self
    }

    /// Keep or drop the computed quadkey column.
    pub fn with_keep_quadkey(mut self, keep: bool) -> Self {
        self.keep_quadkey = keep;
        self
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<(), String> {
        if self.identifiers.is_empty() {
            return Err("at least one identifier column mapping is required".to_string());
        }
        if self.zoom == 0 || self.zoom > MAX_ZOOM {
            return Err(format!("zoom must be in 1..={}", MAX_ZOOM));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options = EnrichOptions::new();

        assert_eq!(options.zoom, DEFAULT_ZOOM);
        assert!(!options.keep_quadkey);
        assert_eq!(
            options.identifiers,
            vec![IdentifierColumns::Point {
                latitude: "latitude".to_string(),
                longitude: "longitude".to_string(),
            }]
        );
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_options_builders() {
        let options = EnrichOptions::new()
            .with_point_columns("lat", "lng")
            .with_code_column(Boundary::Cbg, "block_group")
            .with_code_column(Boundary::Cbg, "bg_code")
            .with_zoom(16)
            .with_keep_quadkey(true);

        assert_eq!(options.zoom, 16);
        assert!(options.keep_quadkey);
        // Point replaced, second cbg mapping replaced the first.
        assert_eq!(options.identifiers.len(), 2);
        assert_eq!(
            options.identifiers[1],
            IdentifierColumns::Code {
                boundary: Boundary::Cbg,
                column: "bg_code".to_string(),
            }
        );
    }

    #[test]
    fn test_options_without_point() {
        let options = EnrichOptions::new()
            .with_code_column(Boundary::Zipcode, "zip")
            .without_point_columns();

        assert_eq!(options.identifiers.len(), 1);
        assert!(options.validate().is_ok());

        let empty = EnrichOptions::new().without_point_columns();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_options_validate_zoom() {
        assert!(EnrichOptions::new().with_zoom(0).validate().is_err());
        assert!(EnrichOptions::new().with_zoom(24).validate().is_err());
        assert!(EnrichOptions::new().with_zoom(23).validate().is_ok());
    }

    #[test]
    fn test_options_serde() {
        let options = EnrichOptions::new()
            .with_code_column(Boundary::Zipcode, "zip")
            .with_keep_quadkey(true);

        let json = serde_json::to_string(&options).unwrap();
        let parsed: EnrichOptions = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, options);
        assert!(json.contains("\"kind\":\"code\""));
    }

    #[test]
    fn test_identifier_describe() {
        let point = IdentifierColumns::Point {
            latitude: "lat".to_string(),
            longitude: "lng".to_string(),
        };
        assert_eq!(point.describe(), "lat/lng");

        let code = IdentifierColumns::Code {
            boundary: Boundary::County,
            column: "fips".to_string(),
        };
        assert_eq!(code.describe(), "county=fips");
    }
}
