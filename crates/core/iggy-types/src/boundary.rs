//! The closed set of boundary types found in iggy data packages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A boundary type a data package can carry features for.
///
/// Each boundary names a crosswalk identifier column (`<boundary>_id`) and,
/// for the census-derived types, a fixed GEOID digit width used to normalize
/// codes before joining (a county GEOID is always 5 digits, so the integer
/// 1001 joins as "01001").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// 10-minute walk isochrone, quadkey-referenced
    #[serde(rename = "qk_isochrone_walk_10m")]
    QkIsochroneWalk10m,
    /// Census block group
    Cbg,
    /// Census tract
    CensusTract,
    /// County
    County,
    /// Locality (census place)
    Locality,
    /// Metro area (CBSA)
    Metro,
    /// ZIP code
    Zipcode,
}

impl Boundary {
    /// Every boundary type, in canonical order.
    pub const ALL: [Boundary; 7] = [
        Boundary::QkIsochroneWalk10m,
        Boundary::Cbg,
        Boundary::CensusTract,
        Boundary::County,
        Boundary::Locality,
        Boundary::Metro,
        Boundary::Zipcode,
    ];

    /// Canonical dataset name, as it appears in directory and column names.
    pub fn name(&self) -> &'static str {
        match self {
            Boundary::QkIsochroneWalk10m => "qk_isochrone_walk_10m",
            Boundary::Cbg => "cbg",
            Boundary::CensusTract => "census_tract",
            Boundary::County => "county",
            Boundary::Locality => "locality",
            Boundary::Metro => "metro",
            Boundary::Zipcode => "zipcode",
        }
    }

    /// Identifier column name in the crosswalk schema.
    pub fn id_column(&self) -> &'static str {
        match self {
            Boundary::QkIsochroneWalk10m => "qk_isochrone_walk_10m_id",
            Boundary::Cbg => "cbg_id",
            Boundary::CensusTract => "census_tract_id",
            Boundary::County => "county_id",
            Boundary::Locality => "locality_id",
            Boundary::Metro => "metro_id",
            Boundary::Zipcode => "zipcode_id",
        }
    }

    /// Fixed GEOID digit width for code normalization, where one applies.
    ///
    /// Isochrone identifiers are quadkey-derived strings and are never
    /// zero-padded.
    pub fn code_width(&self) -> Option<usize> {
        match self {
            Boundary::QkIsochroneWalk10m => None,
            Boundary::Cbg => Some(12),
            Boundary::CensusTract => Some(11),
            Boundary::County => Some(5),
            Boundary::Locality => Some(7),
            Boundary::Metro => Some(5),
            Boundary::Zipcode => Some(5),
        }
    }

    /// Parse a canonical boundary name.
    pub fn from_name(name: &str) -> Option<Boundary> {
        Boundary::ALL.iter().copied().find(|b| b.name() == name)
    }

    /// Match a boundary-suffixed column name, returning the boundary and the
    /// unsuffixed base name.
    ///
    /// Feature columns are suffixed `_<boundary>` when a table is loaded, so
    /// `population_qk_cbg` resolves to (`Cbg`, `population_qk`).
    pub fn suffix_of(column: &str) -> Option<(Boundary, &str)> {
        for boundary in Boundary::ALL {
            if let Some(base) = column
                .strip_suffix(boundary.name())
                .and_then(|rest| rest.strip_suffix('_'))
            {
                if !base.is_empty() {
                    return Some((boundary, base));
                }
            }
        }
        None
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_roundtrip() {
        for boundary in Boundary::ALL {
            assert_eq!(Boundary::from_name(boundary.name()), Some(boundary));
        }
        assert_eq!(Boundary::from_name("parcel"), None);
    }

    #[test]
    fn test_id_columns() {
        assert_eq!(Boundary::Cbg.id_column(), "cbg_id");
        assert_eq!(
            Boundary::QkIsochroneWalk10m.id_column(),
            "qk_isochrone_walk_10m_id"
        );
    }

    #[test]
    fn test_code_widths() {
        assert_eq!(Boundary::Cbg.code_width(), Some(12));
        assert_eq!(Boundary::CensusTract.code_width(), Some(11));
        assert_eq!(Boundary::County.code_width(), Some(5));
        assert_eq!(Boundary::Zipcode.code_width(), Some(5));
        assert_eq!(Boundary::QkIsochroneWalk10m.code_width(), None);
    }

    #[test]
    fn test_suffix_of() {
        assert_eq!(
            Boundary::suffix_of("population_qk_cbg"),
            Some((Boundary::Cbg, "population_qk"))
        );
        assert_eq!(
            Boundary::suffix_of("area_sqkm_census_tract"),
            Some((Boundary::CensusTract, "area_sqkm"))
        );
        assert_eq!(
            Boundary::suffix_of("coffee_shops_qk_isochrone_walk_10m"),
            Some((Boundary::QkIsochroneWalk10m, "coffee_shops"))
        );

        // A bare boundary name carries no base and matches nothing.
        assert_eq!(Boundary::suffix_of("cbg"), None);
        assert_eq!(Boundary::suffix_of("_cbg"), None);
        assert_eq!(Boundary::suffix_of("population"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Boundary::CensusTract.to_string(), "census_tract");
        assert_eq!(Boundary::Zipcode.to_string(), "zipcode");
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Boundary::QkIsochroneWalk10m).unwrap();
        assert_eq!(json, "\"qk_isochrone_walk_10m\"");

        let parsed: Boundary = serde_json::from_str("\"census_tract\"").unwrap();
        assert_eq!(parsed, Boundary::CensusTract);
    }
}
