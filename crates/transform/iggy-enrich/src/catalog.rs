//! Discovery of the boundary feature datasets a package ships.

use iggy_error::{PackageError, Result, ValidationError};
use iggy_package::DataPackage;
use iggy_types::{Boundary, Selection};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// The feature columns available per boundary, under their suffixed names.
///
/// A dataset column `population_qk` in the cbg dataset is cataloged as
/// `population_qk_cbg`, which is also its name in enriched output. Every
/// schema column is cataloged, the `id` key included, in dataset column
/// order; default selections suppress the bookkeeping columns.
pub struct FeatureCatalog {
    available: BTreeMap<Boundary, Vec<String>>,
}

impl FeatureCatalog {
    /// Check the package for each known boundary's dataset and record its
    /// feature columns. Only schemas are read, no row data.
    pub async fn scan(package: &DataPackage) -> Result<Self> {
        let mut available = BTreeMap::new();
        for boundary in Boundary::ALL {
            let dir = package.boundary_path(boundary);
            if !package.dataset_exists(&dir).await? {
                debug!(boundary = %boundary, "No dataset for boundary");
                continue;
            }
            let schema = package.dataset_schema(&dir).await?;
            let features: Vec<String> = schema
                .fields()
                .iter()
                .map(|field| format!("{}_{}", field.name(), boundary.name()))
                .collect();
            available.insert(boundary, features);
        }

        if available.is_empty() {
            return Err(
                PackageError::NotFound("no boundary datasets in package".to_string()).into(),
            );
        }
        info!(boundaries = available.len(), "Scanned feature catalog");
        Ok(Self { available })
    }

    /// Boundaries with a dataset in the package, in [`Boundary::ALL`] order.
    pub fn boundaries(&self) -> Vec<Boundary> {
        self.available.keys().copied().collect()
    }

    pub fn contains(&self, boundary: Boundary) -> bool {
        self.available.contains_key(&boundary)
    }

    /// Suffixed feature names of one boundary, in dataset column order.
    pub fn features(&self, boundary: Boundary) -> Result<&[String]> {
        self.available
            .get(&boundary)
            .map(|features| features.as_slice())
            .ok_or_else(|| ValidationError::UnknownBoundary(boundary.to_string()).into())
    }

    /// Expand a selection into concrete per-boundary feature lists.
    ///
    /// Explicit boundaries come first in request order, then boundaries
    /// inferred from feature names; an empty selection means every cataloged
    /// boundary. A boundary with named features loads exactly those, in
    /// catalog order. A boundary without named features loads its default
    /// set, which leaves out the `id`, `name`, and `geometry` bookkeeping
    /// columns unless they were selected by name.
    pub fn resolve_selection(
        &self,
        selection: &Selection,
    ) -> Result<Vec<(Boundary, Vec<String>)>> {
        let mut requested: Vec<Boundary> = Vec::new();
        for &boundary in &selection.boundaries {
            if !self.contains(boundary) {
                return Err(ValidationError::UnknownBoundary(boundary.to_string()).into());
            }
            if !requested.contains(&boundary) {
                requested.push(boundary);
            }
        }

        let mut named: BTreeMap<Boundary, Vec<String>> = BTreeMap::new();
        for feature in &selection.features {
            let (boundary, _) = Boundary::suffix_of(feature)
                .ok_or_else(|| ValidationError::UnknownFeature(feature.clone()))?;
            let columns = self
                .available
                .get(&boundary)
                .ok_or_else(|| ValidationError::UnknownFeature(feature.clone()))?;
            if !columns.iter().any(|column| column == feature) {
                return Err(ValidationError::UnknownFeature(feature.clone()).into());
            }
            named.entry(boundary).or_default().push(feature.clone());
            if !requested.contains(&boundary) {
                requested.push(boundary);
            }
        }

        if requested.is_empty() {
            requested = self.boundaries();
        }

        let mut resolved = Vec::with_capacity(requested.len());
        for boundary in requested {
            let columns = self.features(boundary)?;
            let features: Vec<String> = match named.get(&boundary) {
                Some(wanted) => columns
                    .iter()
                    .filter(|column| wanted.iter().any(|w| w == *column))
                    .cloned()
                    .collect(),
                None => columns
                    .iter()
                    .filter(|column| !is_bookkeeping(column, boundary))
                    .cloned()
                    .collect(),
            };
            resolved.push((boundary, features));
        }
        Ok(resolved)
    }
}

/// True for the `id`, `name`, and `geometry` columns of the boundary itself.
fn is_bookkeeping(feature: &str, boundary: Boundary) -> bool {
    match Boundary::suffix_of(feature) {
        Some((b, base)) if b == boundary => matches!(base, "id" | "name" | "geometry"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iggy_error::IggyError;

    fn test_catalog() -> FeatureCatalog {
        let mut available = BTreeMap::new();
        available.insert(
            Boundary::Cbg,
            vec![
                "id_cbg".to_string(),
                "population_qk_cbg".to_string(),
                "households_qk_cbg".to_string(),
                "name_cbg".to_string(),
                "geometry_cbg".to_string(),
            ],
        );
        available.insert(
            Boundary::Zipcode,
            vec!["population_qk_zipcode".to_string()],
        );
        FeatureCatalog { available }
    }

    #[test]
    fn test_resolve_empty_selection_defaults() {
        let resolved = test_catalog().resolve_selection(&Selection::all()).unwrap();

        assert_eq!(resolved.len(), 2);
        let (boundary, features) = &resolved[0];
        assert_eq!(*boundary, Boundary::Cbg);
        // Bookkeeping columns stay out of the default set.
        assert_eq!(features, &vec!["population_qk_cbg", "households_qk_cbg"]);
        let (boundary, features) = &resolved[1];
        assert_eq!(*boundary, Boundary::Zipcode);
        assert_eq!(features, &vec!["population_qk_zipcode"]);
    }

    #[test]
    fn test_resolve_explicit_boundary() {
        let selection = Selection::default().with_boundary(Boundary::Zipcode);
        let resolved = test_catalog().resolve_selection(&selection).unwrap();

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0, Boundary::Zipcode);
    }

    #[test]
    fn test_resolve_named_features_in_catalog_order() {
        let selection = Selection::default()
            .with_feature("households_qk_cbg")
            .with_feature("population_qk_cbg");
        let resolved = test_catalog().resolve_selection(&selection).unwrap();

        assert_eq!(resolved.len(), 1);
        let (boundary, features) = &resolved[0];
        assert_eq!(*boundary, Boundary::Cbg);
        // Catalog order, not request order.
        assert_eq!(features, &vec!["population_qk_cbg", "households_qk_cbg"]);
    }

    #[test]
    fn test_resolve_bookkeeping_by_name() {
        let selection = Selection::default().with_feature("name_cbg");
        let resolved = test_catalog().resolve_selection(&selection).unwrap();

        assert_eq!(resolved[0].1, vec!["name_cbg"]);
    }

    #[test]
    fn test_resolve_id_by_name() {
        let selection = Selection::default().with_feature("id_cbg");
        let resolved = test_catalog().resolve_selection(&selection).unwrap();

        assert_eq!(resolved[0].1, vec!["id_cbg"]);
    }

    #[test]
    fn test_resolve_boundaries_before_inferred() {
        let selection = Selection::default()
            .with_boundary(Boundary::Zipcode)
            .with_feature("population_qk_cbg");
        let resolved = test_catalog().resolve_selection(&selection).unwrap();

        let order: Vec<Boundary> = resolved.iter().map(|(b, _)| *b).collect();
        assert_eq!(order, vec![Boundary::Zipcode, Boundary::Cbg]);
    }

    #[test]
    fn test_resolve_unknown_boundary() {
        let selection = Selection::default().with_boundary(Boundary::Metro);
        let result = test_catalog().resolve_selection(&selection);

        match result {
            Err(IggyError::Validation(ValidationError::UnknownBoundary(name))) => {
                assert_eq!(name, "metro")
            }
            other => panic!("Expected UnknownBoundary error, got: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_unknown_feature() {
        for feature in ["population", "popcount_cbg", "population_qk_metro"] {
            let selection = Selection::default().with_feature(feature);
            let result = test_catalog().resolve_selection(&selection);
            match result {
                Err(IggyError::Validation(ValidationError::UnknownFeature(name))) => {
                    assert_eq!(name, feature)
                }
                other => panic!("Expected UnknownFeature error, got: {:?}", other),
            }
        }
    }

    #[test]
    fn test_features_unknown_boundary() {
        let catalog = test_catalog();
        let result = catalog.features(Boundary::County);
        assert!(matches!(
            result,
            Err(IggyError::Validation(ValidationError::UnknownBoundary(_)))
        ));
    }
}
