//! The enrichment engine: load feature tables, join them onto batches.

use crate::catalog::FeatureCatalog;
use crate::crosswalk::CrosswalkIndex;
use crate::resolver;
use crate::table::FeatureTable;
use arrow::array::{ArrayRef, Float64Array, RecordBatchOptions, StringArray, UInt32Array};
use arrow::compute::take;
use arrow::datatypes::{DataType, Field, FieldRef, Schema};
use arrow::record_batch::RecordBatch;
use iggy_error::{IggyError, Result, SchemaError, ValidationError};
use iggy_package::{DataPackage, PackageSpec, StoreConfig};
use iggy_types::{Boundary, EnrichOptions, Selection};
use std::collections::HashSet;
use std::mem;
use std::sync::Arc;
use tracing::{debug, info};

/// Output column holding each row's quadkey when
/// [`EnrichOptions::keep_quadkey`] is set.
pub const QK_COLUMN: &str = "qk";

/// Enrichment engine over one data package.
///
/// `open` locates the package and scans its catalog, `load` pulls the
/// crosswalk and the selected feature tables into memory, and `enrich`
/// left-joins those features onto an input batch. Loading takes `&mut
/// self`; enrichment is read-only and can run from several threads at
/// once.
pub struct Enricher {
    package: DataPackage,
    catalog: FeatureCatalog,
    crosswalk: Option<CrosswalkIndex>,
    tables: Vec<FeatureTable>,
}

impl Enricher {
    /// Open a package and scan its feature catalog. No row data is read.
    pub async fn open(spec: PackageSpec, config: &StoreConfig) -> Result<Self> {
        let package = DataPackage::open(spec, config).await?;
        let catalog = FeatureCatalog::scan(&package).await?;
        Ok(Self {
            package,
            catalog,
            crosswalk: None,
            tables: Vec::new(),
        })
    }

    pub fn package(&self) -> &DataPackage {
        &self.package
    }

    pub fn spec(&self) -> &PackageSpec {
        self.package.spec()
    }

    pub fn catalog(&self) -> &FeatureCatalog {
        &self.catalog
    }

    /// The loaded feature table of a boundary, if any.
    pub fn table(&self, boundary: Boundary) -> Option<&FeatureTable> {
        self.tables.iter().find(|t| t.boundary() == boundary)
    }

    /// Boundaries with a loaded feature table, in load order.
    pub fn loaded_boundaries(&self) -> Vec<Boundary> {
        self.tables.iter().map(|t| t.boundary()).collect()
    }

    pub fn is_loaded(&self) -> bool {
        !self.tables.is_empty()
    }

    /// Load the crosswalk and the selected feature tables.
    ///
    /// Repeat calls are incremental: the crosswalk is read once per engine,
    /// a table whose boundary and feature list are unchanged is kept, and
    /// deselected tables are dropped. On error the engine holds no loaded
    /// state at all and `load` must succeed before the next `enrich`.
    pub async fn load(&mut self, selection: &Selection) -> Result<()> {
        match self.load_inner(selection).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.crosswalk = None;
                self.tables.clear();
                Err(e)
            }
        }
    }

    async fn load_inner(&mut self, selection: &Selection) -> Result<()> {
        let resolved = self.catalog.resolve_selection(selection)?;

        if self.crosswalk.is_none() {
            self.crosswalk = Some(CrosswalkIndex::load(&self.package).await?);
        }

        let mut previous = mem::take(&mut self.tables);
        let mut tables = Vec::with_capacity(resolved.len());
        for (boundary, features) in resolved {
            let unchanged = previous
                .iter()
                .position(|t| t.boundary() == boundary && t.features() == features.as_slice());
            match unchanged {
                Some(position) => {
                    debug!(boundary = %boundary, "Feature table unchanged, keeping");
                    tables.push(previous.swap_remove(position));
                }
                None => {
                    tables.push(
                        FeatureTable::materialize(&self.package, boundary, &features).await?,
                    );
                }
            }
        }
        for dropped in &previous {
            debug!(boundary = %dropped.boundary(), "Dropping deselected feature table");
        }
        self.tables = tables;

        info!(
            boundaries = self.tables.len(),
            features = self.tables.iter().map(|t| t.features().len()).sum::<usize>(),
            "Loaded feature tables"
        );
        Ok(())
    }

    /// Join every loaded feature table onto `batch`, in load order.
    pub fn enrich(&self, batch: &RecordBatch, options: &EnrichOptions) -> Result<RecordBatch> {
        if self.tables.is_empty() {
            return Err(IggyError::Config(
                "no feature tables loaded; call load() before enrich()".to_string(),
            ));
        }
        let boundaries = self.loaded_boundaries();
        self.enrich_boundaries(batch, &boundaries, options)
    }

    /// Join the named boundaries' feature tables onto `batch`.
    ///
    /// The output keeps every input column and row, in order, and appends
    /// one column per selected feature under its suffixed name. Rows whose
    /// identifiers match nothing get nulls.
    pub fn enrich_boundaries(
        &self,
        batch: &RecordBatch,
        boundaries: &[Boundary],
        options: &EnrichOptions,
    ) -> Result<RecordBatch> {
        options.validate().map_err(IggyError::Config)?;

        let mut requested: Vec<Boundary> = Vec::new();
        for &boundary in boundaries {
            if !requested.contains(&boundary) {
                requested.push(boundary);
            }
        }

        let mut tables = Vec::with_capacity(requested.len());
        for &boundary in &requested {
            let table = self
                .table(boundary)
                .ok_or_else(|| ValidationError::BoundaryNotLoaded(boundary.to_string()))?;
            tables.push(table);
        }
        let crosswalk = self.crosswalk.as_ref().ok_or_else(|| {
            IggyError::Config("no crosswalk loaded; call load() before enrich()".to_string())
        })?;

        let resolution = resolver::resolve(batch, options, &requested, crosswalk)?;

        let mut taken: HashSet<String> = batch
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect();
        let mut fields: Vec<FieldRef> = batch.schema().fields().to_vec();
        let mut columns: Vec<ArrayRef> = batch.columns().to_vec();

        if options.keep_quadkey {
            if let Some(quadkeys) = &resolution.quadkeys {
                if !taken.insert(QK_COLUMN.to_string()) {
                    return Err(ValidationError::ColumnCollision {
                        column: QK_COLUMN.to_string(),
                    }
                    .into());
                }
                fields.push(Arc::new(Field::new(QK_COLUMN, DataType::Utf8, true)));
                columns.push(Arc::new(StringArray::from(quadkeys.clone())) as ArrayRef);
            }
        }

        for (table, (_, keys)) in tables.iter().zip(&resolution.keys) {
            let ordinals: UInt32Array = keys
                .iter()
                .map(|key| key.as_deref().and_then(|k| table.ordinal(k)))
                .collect();
            for (position, feature) in table.features().iter().enumerate() {
                if !taken.insert(feature.clone()) {
                    return Err(ValidationError::ColumnCollision {
                        column: feature.clone(),
                    }
                    .into());
                }
                let column = table.batch().column(position);
                let gathered = take(column.as_ref(), &ordinals, None).map_err(|e| {
                    SchemaError::Decode(format!("Failed to gather column '{}': {}", feature, e))
                })?;
                fields.push(Arc::new(Field::new(
                    feature.as_str(),
                    gathered.data_type().clone(),
                    true,
                )));
                columns.push(gathered);
            }
        }

        let schema = Arc::new(Schema::new(fields));
        let row_count = RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
        RecordBatch::try_new_with_options(schema, columns, &row_count).map_err(|e| {
            SchemaError::Decode(format!("Failed to assemble enriched batch: {}", e)).into()
        })
    }

    /// Enrich bare coordinate pairs with every loaded feature table.
    ///
    /// The pairs become a two-column batch named `latitude` and `longitude`,
    /// the names the default options resolve, so `options` only needs to
    /// depart from [`EnrichOptions::default`] for zoom or output tweaks.
    pub fn enrich_points(
        &self,
        points: &[(f64, f64)],
        options: &EnrichOptions,
    ) -> Result<RecordBatch> {
        let (latitudes, longitudes): (Vec<f64>, Vec<f64>) = points.iter().copied().unzip();
        let schema = Arc::new(Schema::new(vec![
            Field::new("latitude", DataType::Float64, false),
            Field::new("longitude", DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Float64Array::from(latitudes)) as ArrayRef,
                Arc::new(Float64Array::from(longitudes)) as ArrayRef,
            ],
        )
        .map_err(|e| SchemaError::Decode(format!("Failed to build point batch: {}", e)))?;
        self.enrich(&batch, options)
    }
}
