use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

pub mod barcodes;
pub mod coords;
pub mod features;
pub mod gz;
pub mod mtx;
pub mod reference;

use barcodes::parse_barcodes;
use coords::{find_coords_path, load_coords};
use features::parse_features;
use mtx::{find_matrix_path, read_mtx_columns};

use crate::model::dataset::{DatasetError, SparseCounts, SpatialDataset};

#[derive(Debug, Clone)]
pub struct GeneIndex {
    pub gene_id_by_feature: Vec<Option<usize>>,
    pub symbols_by_gene_id: Vec<String>,
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("missing input: {0}")]
    MissingInput(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

#[derive(Debug, Clone)]
pub struct InputFiles {
    pub mtx_path: PathBuf,
    pub features_path: PathBuf,
    pub barcodes_path: PathBuf,
    pub coords_path: PathBuf,
}

pub fn discover_input(input_dir: &Path) -> Result<InputFiles, InputError> {
    Ok(InputFiles {
        mtx_path: find_matrix_path(input_dir)?,
        features_path: find_features_path(input_dir)?,
        barcodes_path: find_barcodes_path(input_dir)?,
        coords_path: find_coords_path(input_dir)?,
    })
}

pub fn load_spatial_dataset(input_dir: &Path) -> Result<SpatialDataset, InputError> {
    let files = discover_input(input_dir)?;
    info!(
        mtx = %files.mtx_path.display(),
        features = %files.features_path.display(),
        barcodes = %files.barcodes_path.display(),
        coords = %files.coords_path.display(),
        "discovered input files"
    );

    let features = parse_features(&files.features_path)?;
    let gene_index = build_gene_index(&features);
    let barcodes = parse_barcodes(&files.barcodes_path)?;
    let columns = read_mtx_columns(&files.mtx_path, features.len(), barcodes.len(), &gene_index)?;
    let coords = load_coords(&files.coords_path, &barcodes)?;

    let n_genes = gene_index.symbols_by_gene_id.len();
    let counts = SparseCounts::from_columns(n_genes, columns);
    let dataset =
        SpatialDataset::from_counts(gene_index.symbols_by_gene_id, barcodes, counts, coords)?;
    info!(
        features = features.len(),
        genes = dataset.n_genes(),
        pixels = dataset.n_pixels(),
        nnz = dataset.counts().nnz(),
        "spatial dataset loaded"
    );
    Ok(dataset)
}

// Duplicate symbols share the first gene id so their counts are summed.
pub fn build_gene_index(symbols: &[String]) -> GeneIndex {
    let mut symbols_by_gene_id: Vec<String> = Vec::new();
    let mut symbol_to_gene_id: HashMap<String, usize> = HashMap::new();
    let mut gene_id_by_feature: Vec<Option<usize>> = Vec::with_capacity(symbols.len());

    for (idx, symbol) in symbols.iter().enumerate() {
        if symbol.is_empty() {
            gene_id_by_feature.push(None);
            continue;
        }
        if let Some(existing) = symbol_to_gene_id.get(symbol.as_str()) {
            warn!(
                feature_index = idx,
                symbol = %symbol,
                "duplicate gene symbol; counts summed into the first occurrence"
            );
            gene_id_by_feature.push(Some(*existing));
            continue;
        }
        let gene_id = symbols_by_gene_id.len();
        symbols_by_gene_id.push(symbol.clone());
        symbol_to_gene_id.insert(symbol.clone(), gene_id);
        gene_id_by_feature.push(Some(gene_id));
    }

    GeneIndex {
        gene_id_by_feature,
        symbols_by_gene_id,
    }
}

fn find_features_path(input_dir: &Path) -> Result<PathBuf, InputError> {
    let candidates = [
        "features.tsv",
        "features.tsv.gz",
        "genes.tsv",
        "genes.tsv.gz",
    ];
    for name in candidates {
        let path = input_dir.join(name);
        if path.exists() {
            return Ok(path);
        }
    }
    Err(InputError::MissingInput(
        "missing features.tsv(.gz) or genes.tsv".to_string(),
    ))
}

fn find_barcodes_path(input_dir: &Path) -> Result<PathBuf, InputError> {
    let candidates = ["barcodes.tsv", "barcodes.tsv.gz"];
    for name in candidates {
        let path = input_dir.join(name);
        if path.exists() {
            return Ok(path);
        }
    }
    Err(InputError::MissingInput(
        "missing barcodes.tsv or barcodes.tsv.gz".to_string(),
    ))
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/tests.rs"]
mod tests;
