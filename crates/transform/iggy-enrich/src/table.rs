//! One boundary's feature columns, keyed by boundary code.

use crate::{resolver, ID_COLUMN};
use ahash::RandomState;
use arrow::array::{ArrayRef, RecordBatchOptions};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use hashbrown::HashMap;
use iggy_error::{Result, SchemaError, ValidationError};
use iggy_package::DataPackage;
use iggy_types::Boundary;
use std::sync::Arc;
use tracing::{info, warn};

/// An in-memory feature table for one boundary.
///
/// Columns carry their suffixed output names and sit in selection order;
/// the index maps normalized boundary codes to row ordinals for `take`
/// style gathers. Boolean columns are widened to Float64 so missing rows
/// can join as null.
#[derive(Debug)]
pub struct FeatureTable {
    boundary: Boundary,
    features: Vec<String>,
    batch: RecordBatch,
    index: HashMap<String, u32, RandomState>,
}

impl FeatureTable {
    /// Read the boundary's dataset with only the key and the selected
    /// feature columns, then index it.
    pub async fn materialize(
        package: &DataPackage,
        boundary: Boundary,
        features: &[String],
    ) -> Result<Self> {
        let dir = package.boundary_path(boundary);
        let mut projection = Vec::with_capacity(features.len() + 1);
        projection.push(ID_COLUMN.to_string());
        for feature in features {
            projection.push(base_column(feature, boundary)?.to_string());
        }
        let batch = package.read_dataset(&dir, Some(&projection)).await?;
        Self::from_batch(boundary, features, &batch, &dir.to_string())
    }

    pub(crate) fn from_batch(
        boundary: Boundary,
        features: &[String],
        batch: &RecordBatch,
        source: &str,
    ) -> Result<Self> {
        let schema = batch.schema();
        let id_index = schema.index_of(ID_COLUMN).map_err(|_| SchemaError::MissingColumn {
            column: ID_COLUMN.to_string(),
            dataset: source.to_string(),
        })?;
        let codes =
            resolver::column_codes(batch.column(id_index).as_ref(), ID_COLUMN, boundary)?;

        let mut index = HashMap::with_capacity_and_hasher(codes.len(), RandomState::new());
        let mut duplicates = 0usize;
        for (row, code) in codes.into_iter().enumerate() {
            if let Some(code) = code {
                if index.insert(code, row as u32).is_some() {
                    duplicates += 1;
                }
            }
        }
        if duplicates > 0 {
            warn!(
                boundary = %boundary,
                duplicates,
                "Duplicate ids in feature dataset, keeping the last row of each"
            );
        }

        let mut fields = Vec::with_capacity(features.len());
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(features.len());
        for feature in features {
            let base = base_column(feature, boundary)?;
            let column_index = schema.index_of(base).map_err(|_| SchemaError::MissingColumn {
                column: base.to_string(),
                dataset: source.to_string(),
            })?;
            let column = batch.column(column_index);
            let column = if column.data_type() == &DataType::Boolean {
                cast(column.as_ref(), &DataType::Float64).map_err(|e| {
                    SchemaError::Decode(format!(
                        "Failed to cast column '{}' to Float64: {}",
                        base, e
                    ))
                })?
            } else {
                Arc::clone(column)
            };
            fields.push(Field::new(feature.as_str(), column.data_type().clone(), true));
            columns.push(column);
        }

        let options = RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
        let table =
            RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), columns, &options)
                .map_err(|e| {
                    SchemaError::Decode(format!(
                        "Failed to assemble feature table for '{}': {}",
                        boundary, e
                    ))
                })?;

        info!(
            boundary = %boundary,
            rows = table.num_rows(),
            features = features.len(),
            "Loaded feature table"
        );
        Ok(Self {
            boundary,
            features: features.to_vec(),
            batch: table,
            index,
        })
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    /// Suffixed output names, in the same order as [`Self::batch`] columns.
    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn len(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// Row ordinal of a boundary code, if the table has it.
    pub fn ordinal(&self, code: &str) -> Option<u32> {
        self.index.get(code).copied()
    }
}

/// Strip the boundary suffix off a feature name to get its dataset column.
fn base_column(feature: &str, boundary: Boundary) -> Result<&str> {
    match Boundary::suffix_of(feature) {
        Some((b, base)) if b == boundary => Ok(base),
        _ => Err(ValidationError::UnknownFeature(feature.to_string()).into()),
    }
}
