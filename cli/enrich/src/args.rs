//! CLI argument definitions for iggy-enrich.

use clap::{Parser, ValueEnum};
use iggy_types::options::MAX_ZOOM;
use iggy_types::Boundary;
use std::path::PathBuf;
use tracing::Level;

/// Enrich a CSV of points or boundary codes with package features.
///
/// Reads a CSV, joins the selected boundary features onto every row, and
/// writes the enriched CSV beside the input (or to --output).
///
/// ## Examples
///
/// Enrich a CSV of lat/lng points with every available feature:
///   iggy-enrich -i geos.csv -b s3://iggy-packages -v 20211110214810 -c quadkeys_crosswalk
///
/// Load two boundaries and keep each row's quadkey:
///   iggy-enrich -i geos.csv -b ./packages -v 20211110214810 -c quadkeys_crosswalk \
///     --boundaries cbg,zipcode --keep-quadkey
///
/// Join by explicit county FIPS codes instead of coordinates:
///   iggy-enrich -i stores.csv -b ./packages -v 20211110214810 -c quadkeys_crosswalk \
///     --boundaries county --county-col fips
#[derive(Parser, Debug)]
#[command(name = "iggy-enrich")]
#[command(version, about, long_about = None)]
pub struct Cli {
    // === Input / Output ===
    /// Input CSV file
    #[arg(short = 'i', long)]
    pub input: PathBuf,

    /// Output CSV file (default: enriched_<input name> beside the input)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    // === Package ===
    /// Package base location (s3://bucket/prefix or a local directory)
    #[arg(short = 'b', long, env = "IGGY_BASE_LOC")]
    pub base_loc: String,

    /// Package version id, e.g. 20211110214810
    #[arg(short = 'v', long, env = "IGGY_VERSION_ID")]
    pub version_id: String,

    /// Crosswalk dataset prefix
    #[arg(short = 'c', long, env = "IGGY_CROSSWALK_PREFIX")]
    pub crosswalk_prefix: String,

    /// Package data prefix
    #[arg(long, env = "IGGY_DATA_PREFIX", default_value = "unified")]
    pub data_prefix: String,

    // === Selection ===
    /// Boundaries to load (comma separated, e.g. cbg,zipcode); default all
    #[arg(long, value_delimiter = ',')]
    pub boundaries: Vec<String>,

    /// Features to load under their suffixed names (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub features: Vec<String>,

    // === Identifiers ===
    /// Latitude column
    #[arg(long, default_value = "latitude")]
    pub latitude_col: String,

    /// Longitude column
    #[arg(long, default_value = "longitude")]
    pub longitude_col: String,

    /// Column holding cbg codes
    #[arg(long)]
    pub cbg_col: Option<String>,

    /// Column holding census tract codes
    #[arg(long)]
    pub census_tract_col: Option<String>,

    /// Column holding county FIPS codes
    #[arg(long)]
    pub county_col: Option<String>,

    /// Column holding locality codes
    #[arg(long)]
    pub locality_col: Option<String>,

    /// Column holding metro codes
    #[arg(long)]
    pub metro_col: Option<String>,

    /// Column holding zipcodes
    #[arg(long)]
    pub zipcode_col: Option<String>,

    /// Column holding walk-isochrone cell ids
    #[arg(long)]
    pub qk_isochrone_walk_10m_col: Option<String>,

    /// Tile zoom for point lookups (must match the package crosswalk)
    #[arg(long, default_value = "19", value_parser = parse_zoom)]
    pub zoom: u8,

    /// Keep each row's quadkey as a "qk" output column
    #[arg(long)]
    pub keep_quadkey: bool,

    // === AWS Configuration ===
    /// AWS region
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Custom S3 endpoint URL (for LocalStack or MinIO)
    #[arg(long, env = "IGGY_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS access key ID
    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    pub access_key: Option<String>,

    /// AWS secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY")]
    pub secret_key: Option<String>,

    /// AWS session token
    #[arg(long, env = "AWS_SESSION_TOKEN")]
    pub session_token: Option<String>,

    // === Logging ===
    /// Log level
    #[arg(short = 'l', long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

impl Cli {
    /// Code identifier columns given on the command line.
    pub fn code_columns(&self) -> Vec<(Boundary, &str)> {
        let pairs = [
            (Boundary::QkIsochroneWalk10m, &self.qk_isochrone_walk_10m_col),
            (Boundary::Cbg, &self.cbg_col),
            (Boundary::CensusTract, &self.census_tract_col),
            (Boundary::County, &self.county_col),
            (Boundary::Locality, &self.locality_col),
            (Boundary::Metro, &self.metro_col),
            (Boundary::Zipcode, &self.zipcode_col),
        ];
        pairs
            .into_iter()
            .filter_map(|(boundary, column)| column.as_deref().map(|c| (boundary, c)))
            .collect()
    }
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Parse a zoom level (1-23).
fn parse_zoom(s: &str) -> Result<u8, String> {
    let value: u8 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if !(1..=MAX_ZOOM).contains(&value) {
        return Err(format!("{} is not in 1..={}", value, MAX_ZOOM));
    }
    Ok(value)
}
