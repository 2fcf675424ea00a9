//! Boundary and feature selection for package loading.

use crate::Boundary;
use serde::{Deserialize, Serialize};

/// Which boundaries and features to load from a package.
///
/// Naming a feature implicitly selects its owning boundary (inferred from the
/// `_<boundary>` suffix). An empty selection means "everything the package
/// has". Selections are validated against the package catalog before any
/// data is read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Boundary types to load with their full default feature set.
    pub boundaries: Vec<Boundary>,

    /// Boundary-suffixed feature names to load.
    pub features: Vec<String>,
}

impl Selection {
    /// Select everything the package has.
    pub fn all() -> Self {
        Self::default()
    }

    /// Add a boundary to the selection.
    pub fn with_boundary(mut self, boundary: Boundary) -> Self {
        if !self.boundaries.contains(&boundary) {
            self.boundaries.push(boundary);
        }
        self
    }

    /// Add several boundaries to the selection.
    pub fn with_boundaries(mut self, boundaries: impl IntoIterator<Item = Boundary>) -> Self {
        for boundary in boundaries {
            self = self.with_boundary(boundary);
        }
        self
    }

    /// Add a boundary-suffixed feature name to the selection.
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        let feature = feature.into();
        if !self.features.contains(&feature) {
            self.features.push(feature);
        }
        self
    }

    /// Add several feature names to the selection.
    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for feature in features {
            self = self.with_feature(feature);
        }
        self
    }

    /// Returns true if nothing is named, i.e. "select everything".
    pub fn is_all(&self) -> bool {
        self.boundaries.is_empty() && self.features.is_empty()
    }
}
