//! A located data package and its partitioned datasets.

use crate::layout::PackageSpec;
use crate::store::{build_store, StoreConfig};
use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use futures::stream::{self, StreamExt, TryStreamExt};
use iggy_error::{IggyError, PackageError, Result, SchemaError};
use iggy_types::Boundary;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore};
use parquet::arrow::async_reader::{ParquetObjectReader, ParquetRecordBatchStreamBuilder};
use parquet::arrow::ProjectionMask;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Partition files are recognized by this suffix (`.snappy.parquet` in
/// practice, but any Parquet compression is accepted).
pub const PARTITION_SUFFIX: &str = ".parquet";

/// Number of partition files fetched concurrently per dataset read.
const READ_CONCURRENCY: usize = 4;

/// A located, read-only data package.
///
/// Datasets are directories of Parquet partition files; a read concatenates
/// every partition, in lexicographic filename order, into one logical
/// `RecordBatch`. Partitions are fetched concurrently with bounded
/// parallelism; order is preserved.
#[derive(Debug)]
pub struct DataPackage {
    spec: PackageSpec,
    store: Arc<dyn ObjectStore>,
    root: ObjectPath,
    batch_size: usize,
}

impl DataPackage {
    /// Locate and open a package.
    ///
    /// Returns `NotFound` if the resolved root directory does not exist.
    pub async fn open(spec: PackageSpec, config: &StoreConfig) -> Result<Self> {
        spec.validate().map_err(IggyError::Config)?;

        let (store, base) = build_store(&spec.base_location, config)?;
        let root = base.child(spec.root_dir_name());

        let listing = store
            .list_with_delimiter(Some(&root))
            .await
            .map_err(|e| PackageError::Storage(format!("Failed to list '{}': {}", root, e)))?;
        if listing.objects.is_empty() && listing.common_prefixes.is_empty() {
            return Err(PackageError::NotFound(format!("package root '{}'", root)).into());
        }

        info!(root = %root, "Opened data package");
        Ok(Self {
            spec,
            store,
            root,
            batch_size: config.batch_size,
        })
    }

    /// The package coordinates this instance was opened with.
    pub fn spec(&self) -> &PackageSpec {
        &self.spec
    }

    /// The resolved package root within the store.
    pub fn root(&self) -> &ObjectPath {
        &self.root
    }

    /// Path of the crosswalk dataset directory.
    pub fn crosswalk_path(&self) -> ObjectPath {
        self.root.child(self.spec.crosswalk_dir_name())
    }

    /// Path of a boundary's feature dataset directory.
    pub fn boundary_path(&self, boundary: Boundary) -> ObjectPath {
        self.root.child(self.spec.boundary_dir_name(boundary))
    }

    /// List a dataset's partition files, sorted by path.
    pub async fn list_partitions(&self, dir: &ObjectPath) -> Result<Vec<ObjectMeta>> {
        let mut entries = self.store.list(Some(dir));
        let mut partitions = Vec::new();

        while let Some(entry) = entries.next().await {
            let meta = entry
                .map_err(|e| PackageError::Storage(format!("Failed to list '{}': {}", dir, e)))?;
            if meta
                .location
                .filename()
                .is_some_and(|name| name.ends_with(PARTITION_SUFFIX))
            {
                partitions.push(meta);
            }
        }

        partitions.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(partitions)
    }

    /// Returns true if the dataset directory holds at least one partition.
    pub async fn dataset_exists(&self, dir: &ObjectPath) -> Result<bool> {
        Ok(!self.list_partitions(dir).await?.is_empty())
    }

    /// Read a dataset's Arrow schema from the Parquet footer of its first
    /// partition. No row data is fetched.
    pub async fn dataset_schema(&self, dir: &ObjectPath) -> Result<SchemaRef> {
        let partitions = self.require_partitions(dir).await?;
        let meta = partitions.into_iter().next().ok_or_else(|| {
            PackageError::NotFound(format!("no partition files under '{}'", dir))
        })?;

        let reader = ParquetObjectReader::new(Arc::clone(&self.store), meta);
        let builder = ParquetRecordBatchStreamBuilder::new(reader)
            .await
            .map_err(|e| {
                SchemaError::Decode(format!("Failed to read Parquet footer under '{}': {}", dir, e))
            })?;

        Ok(builder.schema().clone())
    }

    /// Read a whole dataset into one `RecordBatch`.
    ///
    /// With a projection, only the named columns are read; a name absent
    /// from a partition's schema is a `MissingColumn` error. Partition row
    /// order is preserved and partitions are concatenated in filename order.
    pub async fn read_dataset(
        &self,
        dir: &ObjectPath,
        projection: Option<&[String]>,
    ) -> Result<RecordBatch> {
        let partitions = self.require_partitions(dir).await?;
        let count = partitions.len();

        let reads = partitions
            .into_iter()
            .map(|meta| self.read_partition(meta, dir, projection));
        let parts: Vec<(SchemaRef, Vec<RecordBatch>)> = stream::iter(reads)
            .buffered(READ_CONCURRENCY)
            .try_collect()
            .await?;

        let schema = match parts.first() {
            Some((schema, _)) => Arc::clone(schema),
            None => {
                return Err(
                    PackageError::NotFound(format!("no partition files under '{}'", dir)).into(),
                )
            }
        };
        let batches: Vec<RecordBatch> = parts.into_iter().flat_map(|(_, b)| b).collect();
        let dataset = concat_batches(&schema, &batches).map_err(|e| {
            SchemaError::Decode(format!("Failed to concatenate partitions of '{}': {}", dir, e))
        })?;

        debug!(
            dir = %dir,
            partitions = count,
            rows = dataset.num_rows(),
            columns = dataset.num_columns(),
            "Read dataset"
        );
        Ok(dataset)
    }

    async fn require_partitions(&self, dir: &ObjectPath) -> Result<Vec<ObjectMeta>> {
        let partitions = self.list_partitions(dir).await?;
        if partitions.is_empty() {
            return Err(
                PackageError::NotFound(format!("no partition files under '{}'", dir)).into(),
            );
        }
        Ok(partitions)
    }

    async fn read_partition(
        &self,
        meta: ObjectMeta,
        dir: &ObjectPath,
        projection: Option<&[String]>,
    ) -> Result<(SchemaRef, Vec<RecordBatch>)> {
        let location = meta.location.clone();
        let reader = ParquetObjectReader::new(Arc::clone(&self.store), meta);

        let builder = ParquetRecordBatchStreamBuilder::new(reader)
            .await
            .map_err(|e| {
                SchemaError::Decode(format!("Failed to open partition '{}': {}", location, e))
            })?;

        let builder = match projection {
            Some(columns) => {
                let arrow_schema = builder.schema();
                let mut indices = Vec::with_capacity(columns.len());
                for column in columns {
                    let index = arrow_schema
                        .fields()
                        .iter()
                        .position(|f| f.name() == column)
                        .ok_or_else(|| SchemaError::MissingColumn {
                            column: column.clone(),
                            dataset: dir.to_string(),
                        })?;
                    indices.push(index);
                }
                let mask = ProjectionMask::roots(builder.parquet_schema(), indices);
                builder.with_projection(mask)
            }
            None => builder,
        };

        let stream = builder
            .with_batch_size(self.batch_size)
            .build()
            .map_err(|e| {
                SchemaError::Decode(format!("Failed to read partition '{}': {}", location, e))
            })?;
        let schema = stream.schema().clone();
        let batches: Vec<RecordBatch> = stream.try_collect().await.map_err(|e| {
            SchemaError::Decode(format!("Failed to decode partition '{}': {}", location, e))
        })?;

        trace!(partition = %location, batches = batches.len(), "Read partition");
        Ok((schema, batches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use parquet::arrow::ArrowWriter;
    use parquet::basic::Compression;
    use parquet::file::properties::WriterProperties;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn test_batch(ids: &[&str], values: &[i64]) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("population_qk", DataType::Int64, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(ids.to_vec())),
                Arc::new(Int64Array::from(values.to_vec())),
            ],
        )
        .unwrap()
    }

    fn write_partition(dir: &Path, name: &str, batch: &RecordBatch) {
        fs::create_dir_all(dir).unwrap();
        let file = fs::File::create(dir.join(name)).unwrap();
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props)).unwrap();
        writer.write(batch).unwrap();
        writer.close().unwrap();
    }

    fn test_spec(base: &Path) -> PackageSpec {
        PackageSpec::new(base.to_str().unwrap(), "20211110214810", "quadkeys_crosswalk")
    }

    /// Creates a package root with one cbg dataset of two partitions.
    fn test_package() -> (TempDir, PackageSpec) {
        let base = TempDir::new().unwrap();
        let spec = test_spec(base.path());
        let dataset = base
            .path()
            .join(spec.root_dir_name())
            .join(spec.boundary_dir_name(Boundary::Cbg));

        write_partition(
            &dataset,
            "000000000000.snappy.parquet",
            &test_batch(&["a", "b"], &[1, 2]),
        );
        write_partition(
            &dataset,
            "000000000001.snappy.parquet",
            &test_batch(&["c"], &[3]),
        );
        // A stray non-partition file that listing must skip.
        fs::write(dataset.join("_SUCCESS"), b"").unwrap();

        (base, spec)
    }

    #[tokio::test]
    async fn test_open_package() {
        let (_base, spec) = test_package();
        let package = DataPackage::open(spec.clone(), &StoreConfig::default())
            .await
            .unwrap();

        assert_eq!(package.spec().version_id, spec.version_id);
    }

    #[tokio::test]
    async fn test_open_missing_root() {
        let base = TempDir::new().unwrap();
        let spec = test_spec(base.path());
        let result = DataPackage::open(spec, &StoreConfig::default()).await;

        match result {
            Err(IggyError::Package(PackageError::NotFound(_))) => {}
            other => panic!("Expected NotFound error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_open_invalid_spec() {
        let base = TempDir::new().unwrap();
        let spec = test_spec(base.path()).with_prefix("");
        let result = DataPackage::open(spec, &StoreConfig::default()).await;

        match result {
            Err(IggyError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_partitions_sorted_and_filtered() {
        let (_base, spec) = test_package();
        let package = DataPackage::open(spec, &StoreConfig::default()).await.unwrap();
        let dir = package.boundary_path(Boundary::Cbg);

        let partitions = package.list_partitions(&dir).await.unwrap();
        let names: Vec<_> = partitions
            .iter()
            .map(|m| m.location.filename().unwrap().to_string())
            .collect();

        assert_eq!(
            names,
            vec!["000000000000.snappy.parquet", "000000000001.snappy.parquet"]
        );
    }

    #[tokio::test]
    async fn test_dataset_exists() {
        let (_base, spec) = test_package();
        let package = DataPackage::open(spec, &StoreConfig::default()).await.unwrap();

        assert!(package
            .dataset_exists(&package.boundary_path(Boundary::Cbg))
            .await
            .unwrap());
        assert!(!package
            .dataset_exists(&package.boundary_path(Boundary::Zipcode))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_dataset_schema() {
        let (_base, spec) = test_package();
        let package = DataPackage::open(spec, &StoreConfig::default()).await.unwrap();

        let schema = package
            .dataset_schema(&package.boundary_path(Boundary::Cbg))
            .await
            .unwrap();

        let names: Vec<_> = schema.fields().iter().map(|f| f.name().clone()).collect();
        assert_eq!(names, vec!["id", "population_qk"]);
    }

    #[tokio::test]
    async fn test_read_dataset_concatenates_partitions() {
        let (_base, spec) = test_package();
        let package = DataPackage::open(spec, &StoreConfig::default()).await.unwrap();

        let dataset = package
            .read_dataset(&package.boundary_path(Boundary::Cbg), None)
            .await
            .unwrap();

        assert_eq!(dataset.num_rows(), 3);
        let ids = dataset
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(ids.value(0), "a");
        assert_eq!(ids.value(2), "c");
    }

    #[tokio::test]
    async fn test_read_dataset_projection() {
        let (_base, spec) = test_package();
        let package = DataPackage::open(spec, &StoreConfig::default()).await.unwrap();

        let dataset = package
            .read_dataset(
                &package.boundary_path(Boundary::Cbg),
                Some(&["population_qk".to_string()]),
            )
            .await
            .unwrap();

        assert_eq!(dataset.num_columns(), 1);
        assert_eq!(dataset.schema().field(0).name(), "population_qk");
        assert_eq!(dataset.num_rows(), 3);
    }

    #[tokio::test]
    async fn test_read_dataset_missing_column() {
        let (_base, spec) = test_package();
        let package = DataPackage::open(spec, &StoreConfig::default()).await.unwrap();

        let result = package
            .read_dataset(
                &package.boundary_path(Boundary::Cbg),
                Some(&["no_such_column".to_string()]),
            )
            .await;

        match result {
            Err(IggyError::Schema(SchemaError::MissingColumn { column, .. })) => {
                assert_eq!(column, "no_such_column")
            }
            other => panic!("Expected MissingColumn error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_dataset_empty_dir() {
        let (base, spec) = test_package();
        let empty = base
            .path()
            .join(spec.root_dir_name())
            .join(spec.boundary_dir_name(Boundary::Zipcode));
        fs::create_dir_all(&empty).unwrap();

        let package = DataPackage::open(spec, &StoreConfig::default()).await.unwrap();
        let result = package
            .read_dataset(&package.boundary_path(Boundary::Zipcode), None)
            .await;

        match result {
            Err(IggyError::Package(PackageError::NotFound(_))) => {}
            other => panic!("Expected NotFound error, got: {:?}", other),
        }
    }
}
