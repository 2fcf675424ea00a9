//! Resolution of input rows to boundary keys.
//!
//! Each row can carry identifiers of two kinds: a latitude/longitude pair
//! (resolved to a quadkey and then through the crosswalk) and explicit
//! boundary code columns. An explicit code wins over the point-derived one
//! for the same boundary; a null code cell falls back to the point.

use crate::crosswalk::CrosswalkIndex;
use crate::quadkey;
use arrow::array::{Array, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use iggy_error::{Result, SchemaError, ValidationError};
use iggy_types::{Boundary, EnrichOptions, IdentifierColumns};
use tracing::warn;

/// Per-row boundary keys resolved from one input batch.
#[derive(Debug)]
pub(crate) struct Resolution {
    /// One key vector per requested boundary, in request order.
    pub keys: Vec<(Boundary, Vec<Option<String>>)>,
    /// Row quadkeys, present when a point identifier was usable.
    pub quadkeys: Option<Vec<Option<String>>>,
}

/// Resolve every row of `batch` to one key per requested boundary.
///
/// At least one configured identifier must be present in the batch. A point
/// identifier whose columns are only partially present is an error; a fully
/// absent identifier is skipped.
pub(crate) fn resolve(
    batch: &RecordBatch,
    options: &EnrichOptions,
    boundaries: &[Boundary],
    crosswalk: &CrosswalkIndex,
) -> Result<Resolution> {
    let schema = batch.schema();

    let mut point_columns: Option<(usize, usize)> = None;
    let mut code_columns: Vec<(Boundary, usize)> = Vec::new();
    for identifier in &options.identifiers {
        match identifier {
            IdentifierColumns::Point {
                latitude,
                longitude,
            } => {
                if point_columns.is_some() {
                    continue;
                }
                match (schema.index_of(latitude).ok(), schema.index_of(longitude).ok()) {
                    (Some(lat), Some(lng)) => point_columns = Some((lat, lng)),
                    (Some(_), None) => {
                        return Err(ValidationError::MissingColumn {
                            column: longitude.clone(),
                        }
                        .into())
                    }
                    (None, Some(_)) => {
                        return Err(ValidationError::MissingColumn {
                            column: latitude.clone(),
                        }
                        .into())
                    }
                    (None, None) => {}
                }
            }
            IdentifierColumns::Code { boundary, column } => {
                if code_columns.iter().any(|(b, _)| b == boundary) {
                    continue;
                }
                if let Ok(index) = schema.index_of(column) {
                    code_columns.push((*boundary, index));
                }
            }
        }
    }

    if point_columns.is_none() && code_columns.is_empty() {
        let configured = options
            .identifiers
            .iter()
            .map(|i| i.describe())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(ValidationError::NoIdentifier(configured).into());
    }

    let quadkeys = match point_columns {
        Some((lat_index, lng_index)) => {
            let latitudes =
                numeric_f64(batch.column(lat_index).as_ref(), schema.field(lat_index).name())?;
            let longitudes =
                numeric_f64(batch.column(lng_index).as_ref(), schema.field(lng_index).name())?;
            let cells: Vec<Option<String>> = (0..batch.num_rows())
                .map(|row| {
                    if latitudes.is_null(row) || longitudes.is_null(row) {
                        None
                    } else {
                        quadkey::quadkey_for(
                            latitudes.value(row),
                            longitudes.value(row),
                            options.zoom,
                        )
                    }
                })
                .collect();
            Some(cells)
        }
        None => None,
    };

    let mut keys = Vec::with_capacity(boundaries.len());
    for &boundary in boundaries {
        let code_keys = match code_columns.iter().find(|(b, _)| *b == boundary) {
            Some(&(_, index)) => Some(column_codes(
                batch.column(index).as_ref(),
                schema.field(index).name(),
                boundary,
            )?),
            None => None,
        };

        let point_keys: Option<Vec<Option<String>>> = match &quadkeys {
            Some(cells) => match crosswalk.position(boundary) {
                Some(position) => Some(
                    cells
                        .iter()
                        .map(|cell| {
                            cell.as_deref()
                                .and_then(|qk| crosswalk.get(qk))
                                .and_then(|codes| codes[position].clone())
                        })
                        .collect(),
                ),
                None => {
                    warn!(boundary = %boundary, "Boundary absent from crosswalk, point lookups yield no codes");
                    None
                }
            },
            None => None,
        };

        let merged = match (code_keys, point_keys) {
            (Some(codes), Some(points)) => codes
                .into_iter()
                .zip(points)
                .map(|(code, point)| code.or(point))
                .collect(),
            (Some(codes), None) => codes,
            (None, Some(points)) => points,
            (None, None) => {
                warn!(boundary = %boundary, "No identifier source for boundary, rows will not match");
                vec![None; batch.num_rows()]
            }
        };
        keys.push((boundary, merged));
    }

    Ok(Resolution { keys, quadkeys })
}

/// Normalize one column of boundary codes.
///
/// String codes are trimmed, with empty cells treated as null. Integer
/// codes are rendered in decimal. Codes shorter than the boundary's fixed
/// width are left-padded with zeros, so integer FIPS codes line up with
/// their zero-padded string form.
pub(crate) fn column_codes(
    column: &dyn Array,
    name: &str,
    boundary: Boundary,
) -> Result<Vec<Option<String>>> {
    let width = boundary.code_width();
    match column.data_type() {
        DataType::Utf8 => {
            let strings = column
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| SchemaError::Decode(format!(
                    "Failed to read column '{}' as Utf8",
                    name
                )))?;
            Ok((0..strings.len())
                .map(|row| {
                    if strings.is_null(row) {
                        return None;
                    }
                    let code = strings.value(row).trim();
                    if code.is_empty() {
                        None
                    } else {
                        Some(pad(code, width))
                    }
                })
                .collect())
        }
        numeric if numeric.is_numeric() => {
            let ints = cast(column, &DataType::Int64).map_err(|e| {
                SchemaError::Decode(format!("Failed to cast column '{}' to Int64: {}", name, e))
            })?;
            let ints = ints
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| SchemaError::Decode(format!(
                    "Failed to read column '{}' as Int64",
                    name
                )))?;
            Ok((0..ints.len())
                .map(|row| {
                    if ints.is_null(row) {
                        None
                    } else {
                        Some(pad(&ints.value(row).to_string(), width))
                    }
                })
                .collect())
        }
        other => Err(SchemaError::Type {
            column: name.to_string(),
            expected: "string or integer".to_string(),
            actual: other.to_string(),
        }
        .into()),
    }
}

fn numeric_f64(column: &dyn Array, name: &str) -> Result<Float64Array> {
    if !column.data_type().is_numeric() {
        return Err(SchemaError::Type {
            column: name.to_string(),
            expected: "numeric".to_string(),
            actual: column.data_type().to_string(),
        }
        .into());
    }
    let floats = cast(column, &DataType::Float64).map_err(|e| {
        SchemaError::Decode(format!("Failed to cast column '{}' to Float64: {}", name, e))
    })?;
    floats
        .as_any()
        .downcast_ref::<Float64Array>()
        .cloned()
        .ok_or_else(|| {
            SchemaError::Decode(format!("Failed to read column '{}' as Float64", name)).into()
        })
}

fn pad(code: &str, width: Option<usize>) -> String {
    match width {
        Some(width) if code.len() < width => format!("{:0>width$}", code),
        _ => code.to_string(),
    }
}
