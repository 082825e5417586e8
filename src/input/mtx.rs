use std::path::{Path, PathBuf};

use crate::input::gz::for_each_line;
use crate::input::{GeneIndex, InputError};

pub fn find_matrix_path(input_dir: &Path) -> Result<PathBuf, InputError> {
    for name in ["matrix.mtx", "matrix.mtx.gz"] {
        let path = input_dir.join(name);
        if path.exists() {
            return Ok(path);
        }
    }
    Err(InputError::MissingInput(
        "missing matrix.mtx or matrix.mtx.gz".to_string(),
    ))
}

pub fn read_mtx_columns(
    path: &Path,
    n_features_raw: usize,
    n_cells: usize,
    gene_index: &GeneIndex,
) -> Result<Vec<Vec<(u32, f64)>>, InputError> {
    let mut header_seen = false;
    let mut size: Option<(usize, usize)> = None;
    let mut columns: Vec<Vec<(u32, f64)>> = vec![Vec::new(); n_cells];

    for_each_line(path, |line_no, line| {
        if !header_seen {
            if !line.starts_with("%%MatrixMarket") {
                return Err(InputError::Parse("missing MatrixMarket header".to_string()));
            }
            if line.contains("complex") || line.contains("pattern") {
                return Err(InputError::InvalidInput(format!(
                    "unsupported MatrixMarket field in header: {line}"
                )));
            }
            header_seen = true;
            return Ok(());
        }
        if line.starts_with('%') {
            return Ok(());
        }
        let mut parts = line.split_whitespace();
        let Some((rows, cols)) = size else {
            let rows = parse_field::<usize>(parts.next(), "row count", line_no)?;
            let cols = parse_field::<usize>(parts.next(), "column count", line_no)?;
            parse_field::<usize>(parts.next(), "nnz count", line_no)?;
            if rows != n_features_raw {
                return Err(InputError::InvalidInput(format!(
                    "matrix row count {} does not match features {}",
                    rows, n_features_raw
                )));
            }
            if cols != n_cells {
                return Err(InputError::InvalidInput(format!(
                    "matrix column count {} does not match barcodes {}",
                    cols, n_cells
                )));
            }
            size = Some((rows, cols));
            return Ok(());
        };

        let row = parse_field::<usize>(parts.next(), "row index", line_no)?;
        let col = parse_field::<usize>(parts.next(), "column index", line_no)?;
        let val = parse_field::<f64>(parts.next(), "value", line_no)?;
        if row == 0 || row > rows || col == 0 || col > cols {
            return Err(InputError::Parse(format!(
                "matrix entry out of bounds at line {}",
                line_no
            )));
        }
        if !val.is_finite() || val < 0.0 {
            return Err(InputError::Parse(format!(
                "negative or non-finite count {} at line {}",
                val, line_no
            )));
        }
        if val == 0.0 {
            return Ok(());
        }
        if let Some(gene_id) = gene_index
            .gene_id_by_feature
            .get(row - 1)
            .copied()
            .flatten()
        {
            columns[col - 1].push((gene_id as u32, val));
        }
        Ok(())
    })?;

    if !header_seen {
        return Err(InputError::Parse("matrix.mtx is empty".to_string()));
    }
    if size.is_none() {
        return Err(InputError::Parse("missing matrix size line".to_string()));
    }
    Ok(columns)
}

fn parse_field<T: std::str::FromStr>(
    raw: Option<&str>,
    what: &str,
    line_no: usize,
) -> Result<T, InputError> {
    raw.and_then(|s| s.parse().ok())
        .ok_or_else(|| InputError::Parse(format!("invalid {what} at line {line_no}")))
}
