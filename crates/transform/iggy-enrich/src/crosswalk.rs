//! The quadkey-to-boundary crosswalk.

use crate::{resolver, ID_COLUMN};
use ahash::RandomState;
use arrow::array::{Array, StringArray};
use arrow::record_batch::RecordBatch;
use hashbrown::HashMap;
use iggy_error::{Result, SchemaError};
use iggy_package::DataPackage;
use iggy_types::Boundary;
use tracing::{info, warn};

/// In-memory crosswalk from quadkey cells to boundary codes.
///
/// Each cell maps to one code slot per boundary the crosswalk covers, in
/// [`Boundary::ALL`] order. A slot is null where the cell falls outside
/// that boundary's coverage.
#[derive(Debug)]
pub struct CrosswalkIndex {
    boundaries: Vec<Boundary>,
    cells: HashMap<String, Box<[Option<String>]>, RandomState>,
}

impl CrosswalkIndex {
    /// Read the package's crosswalk dataset and index it by quadkey.
    pub async fn load(package: &DataPackage) -> Result<Self> {
        let dir = package.crosswalk_path();
        let batch = package.read_dataset(&dir, None).await?;
        Self::from_batch(&batch, &dir.to_string())
    }

    pub(crate) fn from_batch(batch: &RecordBatch, source: &str) -> Result<Self> {
        let schema = batch.schema();
        let index = schema.index_of(ID_COLUMN).map_err(|_| SchemaError::MissingColumn {
            column: ID_COLUMN.to_string(),
            dataset: source.to_string(),
        })?;
        let quadkeys = batch
            .column(index)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| SchemaError::Type {
                column: ID_COLUMN.to_string(),
                expected: "Utf8".to_string(),
                actual: batch.column(index).data_type().to_string(),
            })?;

        let mut boundaries = Vec::new();
        let mut columns: Vec<Vec<Option<String>>> = Vec::new();
        for boundary in Boundary::ALL {
            if let Ok(index) = schema.index_of(boundary.id_column()) {
                let codes = resolver::column_codes(
                    batch.column(index).as_ref(),
                    boundary.id_column(),
                    boundary,
                )?;
                boundaries.push(boundary);
                columns.push(codes);
            }
        }
        if boundaries.is_empty() {
            return Err(SchemaError::MissingColumn {
                column: "<boundary>_id".to_string(),
                dataset: source.to_string(),
            }
            .into());
        }

        let mut cells =
            HashMap::with_capacity_and_hasher(batch.num_rows(), RandomState::new());
        let mut duplicates = 0usize;
        for row in 0..batch.num_rows() {
            if quadkeys.is_null(row) {
                continue;
            }
            let quadkey = quadkeys.value(row).trim();
            if quadkey.is_empty() {
                continue;
            }
            let codes: Box<[Option<String>]> =
                columns.iter().map(|column| column[row].clone()).collect();
            if cells.insert(quadkey.to_string(), codes).is_some() {
                duplicates += 1;
            }
        }
        if duplicates > 0 {
            warn!(
                source = %source,
                duplicates,
                "Duplicate quadkeys in crosswalk, keeping the last row of each"
            );
        }

        info!(
            source = %source,
            cells = cells.len(),
            boundaries = boundaries.len(),
            "Loaded crosswalk index"
        );
        Ok(Self { boundaries, cells })
    }

    /// Boundaries the crosswalk carries codes for, in [`Boundary::ALL`] order.
    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    /// Slot of a boundary within each cell's code array.
    pub fn position(&self, boundary: Boundary) -> Option<usize> {
        self.boundaries.iter().position(|&b| b == boundary)
    }

    /// Codes of one cell, one slot per covered boundary.
    pub fn get(&self, quadkey: &str) -> Option<&[Option<String>]> {
        self.cells.get(quadkey).map(|codes| codes.as_ref())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
