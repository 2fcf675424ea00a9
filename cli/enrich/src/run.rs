//! Main execution logic for the iggy-enrich CLI.

use anyhow::{Context, Result};
use arrow::compute::concat_batches;
use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::record_batch::RecordBatch;
use iggy_enrich::Enricher;
use iggy_package::{PackageSpec, StoreConfig};
use iggy_types::{Boundary, EnrichOptions, Selection};
use std::fs::File;
use std::io::Seek;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::fmt;

use crate::args::{Cli, LogLevel};

/// Initialize logging.
pub fn init_logging(level: LogLevel) -> Result<()> {
    let level: Level = level.into();

    let subscriber = fmt::Subscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr); // Log to stderr so stdout is clean for output

    subscriber.init();

    Ok(())
}

/// What one run did, for the end-of-run report.
pub struct RunSummary {
    pub rows: usize,
    pub input_columns: usize,
    pub output_columns: usize,
    pub boundaries: Vec<Boundary>,
    pub output_path: PathBuf,
}

/// Execute one enrichment run with the provided arguments.
pub async fn execute(args: Cli) -> Result<RunSummary> {
    let spec = PackageSpec::new(&args.base_loc, &args.version_id, &args.crosswalk_prefix)
        .with_prefix(&args.data_prefix);

    let config = StoreConfig::new(&args.region);
    let config = match args.s3_endpoint.as_deref() {
        Some(endpoint) => config.with_endpoint(endpoint),
        None => config,
    };
    let config = match (args.access_key.as_deref(), args.secret_key.as_deref()) {
        (Some(access), Some(secret)) => {
            config.with_credentials(access, secret, args.session_token.clone())
        }
        _ => config,
    };

    let mut selection = Selection::default();
    for name in &args.boundaries {
        let boundary = Boundary::from_name(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown boundary: {}", name))?;
        selection = selection.with_boundary(boundary);
    }
    selection = selection.with_features(args.features.iter().cloned());

    let mut options = EnrichOptions::default()
        .with_point_columns(&args.latitude_col, &args.longitude_col)
        .with_zoom(args.zoom)
        .with_keep_quadkey(args.keep_quadkey);
    for (boundary, column) in args.code_columns() {
        options = options.with_code_column(boundary, column);
    }

    let batch = read_csv(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    info!(
        path = %args.input.display(),
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        "Read input CSV"
    );

    let mut enricher = Enricher::open(spec, &config).await?;
    enricher.load(&selection).await?;
    let enriched = enricher.enrich(&batch, &options)?;

    let output_path = match args.output {
        Some(path) => path,
        None => default_output_path(&args.input),
    };
    write_csv(&output_path, &enriched)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    info!(path = %output_path.display(), rows = enriched.num_rows(), "Wrote enriched CSV");

    Ok(RunSummary {
        rows: enriched.num_rows(),
        input_columns: batch.num_columns(),
        output_columns: enriched.num_columns(),
        boundaries: enricher.loaded_boundaries(),
        output_path,
    })
}

/// Read a whole CSV file into one batch, inferring column types.
fn read_csv(path: &Path) -> Result<RecordBatch> {
    let mut file = File::open(path)?;
    let format = Format::default().with_header(true);
    let (schema, _) = format.infer_schema(&mut file, None)?;
    file.rewind()?;

    let reader = ReaderBuilder::new(Arc::new(schema))
        .with_header(true)
        .build(file)?;
    let schema = reader.schema();
    let batches: Vec<RecordBatch> = reader.collect::<Result<_, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

fn write_csv(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(batch)?;
    Ok(())
}

/// `enriched_<input name>` beside the input file.
fn default_output_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    input.with_file_name(format!("enriched_{}", name))
}
