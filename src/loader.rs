use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info, instrument, trace};

use crate::domain::{CVError, TABLE_FILE_EXTENSION};
use crate::table::{CellValue, Column, Table};

/// Textual markers that are read as missing values, next to empty cells.
const NA_MARKERS: [&str; 10] = [
    "NA", "N/A", "NaN", "nan", "null", "NULL", "None", "#N/A", "<NA>", "n/a",
];

fn is_table_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(TABLE_FILE_EXTENSION))
}

/// Names of all csv files in `dir`, sorted case-insensitively.
#[instrument(level = "debug")]
pub fn list_files(dir: &Path) -> Result<Vec<String>, CVError> {
    let entries = fs::read_dir(dir).map_err(|e| match e.kind() {
        ErrorKind::NotFound => CVError::DirectoryNotFound(dir.to_path_buf()),
        ErrorKind::PermissionDenied => CVError::PermissionDenied(dir.to_path_buf()),
        _ => CVError::IoError(e),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_table_file(&path) {
            if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                files.push(name.to_string());
            }
        } else {
            trace!("Skipping {}", path.display());
        }
    }

    if files.is_empty() {
        return Err(CVError::NoFilesFound(dir.to_path_buf()));
    }
    files.sort_by_cached_key(|name| name.to_lowercase());
    debug!("Found {} files", files.len());
    Ok(files)
}

/// Parses the csv file at `path` into a [`Table`].
#[instrument(level = "info")]
pub fn load_table(path: &Path) -> Result<Table, CVError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => CVError::FileNotFound(path.to_path_buf()),
        ErrorKind::PermissionDenied => CVError::PermissionDenied(path.to_path_buf()),
        _ => CVError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(CVError::LoadingFailed(format!(
            "{} is not a file!",
            path.display()
        )));
    }
    if !is_table_file(path) {
        return Err(CVError::UnknownFileType(path.to_path_buf()));
    }

    let start_time = Instant::now();
    let df = read_csv(path)?.collect()?;

    // Every column is converted in its own rayon task.
    let columns = df
        .get_column_names()
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect::<Result<Vec<Column>, PolarsError>>()?;

    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("???")
        .to_string();
    let table = Table::new(name, columns)?;
    info!(
        "Loaded {} columns x {} rows in {}ms",
        table.ncolumns(),
        table.nrows(),
        start_time.elapsed().as_millis()
    );
    Ok(table)
}

fn read_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    let na_markers = NA_MARKERS.iter().map(|&m| m.into()).collect();
    LazyCsvReader::new(PlPath::Local(Arc::from(path)))
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_null_values(Some(NullValues::AllColumns(na_markers)))
        .finish()
}

fn is_float_type(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

fn is_signed_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
    )
}

fn is_unsigned_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64
    )
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<Column, PolarsError> {
    let column = df.column(col_name)?;
    let dtype = column.dtype();
    // Integers are read natively, an f64 cannot hold every i64 or u64.
    let values = if is_signed_type(dtype) {
        let cast = column.cast(&DataType::Int64)?;
        cast.i64()?.into_iter().map(CellValue::from).collect()
    } else if is_unsigned_type(dtype) {
        let cast = column.cast(&DataType::UInt64)?;
        cast.u64()?.into_iter().map(CellValue::from).collect()
    } else if is_float_type(dtype) {
        let cast = column.cast(&DataType::Float64)?;
        cast.f64()?.into_iter().map(CellValue::from).collect()
    } else {
        let cast = column.cast(&DataType::String)?;
        cast.str()?.into_iter().map(CellValue::from).collect()
    };
    trace!("Column \"{col_name}\": {:?}", column.dtype());
    Ok(Column::new(col_name, values))
}

/// Resolves the directory the explorer reads from. `~` and environment variables are
/// expanded. Without an explicit directory the default is taken relative to the executable.
pub fn resolve_data_dir(dir: Option<&str>, default: &str) -> Result<PathBuf, CVError> {
    let path = match dir {
        Some(dir) => {
            let expanded = shellexpand::full(dir)
                .map_err(|e| CVError::LoadingFailed(format!("Cannot expand {dir}: {e}")))?;
            PathBuf::from(expanded.as_ref())
        }
        None => {
            let exe = std::env::current_exe()?;
            let base = exe.parent().map(Path::to_path_buf).unwrap_or_default();
            base.join(default)
        }
    };
    Ok(std::path::absolute(path)?)
}
