use std::collections::HashMap;

use thiserror::Error;

use crate::simd;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("malformed input: {0}")]
    Malformed(String),
    #[error("gene {gene} is missing from the {table}")]
    MissingGene { gene: String, table: &'static str },
    #[error("invalid count {value} at gene index {gene}, pixel {pixel}")]
    InvalidCount { gene: usize, pixel: usize, value: f64 },
    #[error("pixel {barcode}: nUMI {stored} does not match column sum {sum}")]
    UmiMismatch {
        barcode: String,
        stored: f64,
        sum: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

// One column per pixel, row indices ascending within a column.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseCounts {
    n_genes: usize,
    col_ptr: Vec<usize>,
    row_idx: Vec<u32>,
    values: Vec<f64>,
}

impl SparseCounts {
    pub fn from_columns(n_genes: usize, columns: Vec<Vec<(u32, f64)>>) -> Self {
        let nnz_hint = columns.iter().map(|c| c.len()).sum();
        let mut col_ptr = Vec::with_capacity(columns.len() + 1);
        let mut row_idx = Vec::with_capacity(nnz_hint);
        let mut values = Vec::with_capacity(nnz_hint);
        col_ptr.push(0);
        for mut col in columns {
            col.sort_by_key(|&(gene, _)| gene);
            let start = row_idx.len();
            for (gene, value) in col {
                if value == 0.0 {
                    continue;
                }
                if row_idx.len() > start && row_idx.last() == Some(&gene) {
                    if let Some(last) = values.last_mut() {
                        *last += value;
                    }
                    continue;
                }
                row_idx.push(gene);
                values.push(value);
            }
            col_ptr.push(row_idx.len());
        }
        Self {
            n_genes,
            col_ptr,
            row_idx,
            values,
        }
    }

    pub fn n_genes(&self) -> usize {
        self.n_genes
    }

    pub fn n_pixels(&self) -> usize {
        self.col_ptr.len().saturating_sub(1)
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn column(&self, pixel: usize) -> (&[u32], &[f64]) {
        let start = self.col_ptr[pixel];
        let end = self.col_ptr[pixel + 1];
        (&self.row_idx[start..end], &self.values[start..end])
    }

    pub fn column_sum(&self, pixel: usize) -> f64 {
        let (_, values) = self.column(pixel);
        simd::sum_f64(values)
    }

    pub fn get(&self, gene: usize, pixel: usize) -> f64 {
        let (rows, values) = self.column(pixel);
        match rows.binary_search(&(gene as u32)) {
            Ok(pos) => values[pos],
            Err(_) => 0.0,
        }
    }

    fn validate(&self) -> Result<(), DatasetError> {
        for pixel in 0..self.n_pixels() {
            let (rows, values) = self.column(pixel);
            for (&gene, &value) in rows.iter().zip(values) {
                if gene as usize >= self.n_genes {
                    return Err(DatasetError::Malformed(format!(
                        "gene index {gene} out of bounds for pixel {pixel}"
                    )));
                }
                if !value.is_finite() || value < 0.0 {
                    return Err(DatasetError::InvalidCount {
                        gene: gene as usize,
                        pixel,
                        value,
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SpatialDataset {
    genes: Vec<String>,
    gene_index: HashMap<String, usize>,
    barcodes: Vec<String>,
    barcode_index: HashMap<String, usize>,
    counts: SparseCounts,
    coords: Vec<Coord>,
    n_umi: Vec<f64>,
    cell_labels: Option<Vec<String>>,
}

impl SpatialDataset {
    pub fn from_counts(
        genes: Vec<String>,
        barcodes: Vec<String>,
        counts: SparseCounts,
        coords: Vec<Coord>,
    ) -> Result<Self, DatasetError> {
        let n_umi = (0..counts.n_pixels())
            .map(|pixel| counts.column_sum(pixel))
            .collect();
        Self::build(genes, barcodes, counts, coords, n_umi, None)
    }

    pub fn derived(
        genes: Vec<String>,
        barcodes: Vec<String>,
        counts: SparseCounts,
        coords: Vec<Coord>,
        n_umi: Vec<f64>,
        cell_labels: Vec<String>,
    ) -> Result<Self, DatasetError> {
        if cell_labels.len() != barcodes.len() {
            return Err(DatasetError::Malformed(format!(
                "{} cell labels for {} records",
                cell_labels.len(),
                barcodes.len()
            )));
        }
        Self::build(genes, barcodes, counts, coords, n_umi, Some(cell_labels))
    }

    fn build(
        genes: Vec<String>,
        barcodes: Vec<String>,
        counts: SparseCounts,
        coords: Vec<Coord>,
        n_umi: Vec<f64>,
        cell_labels: Option<Vec<String>>,
    ) -> Result<Self, DatasetError> {
        if counts.n_genes() != genes.len() {
            return Err(DatasetError::Malformed(format!(
                "count matrix has {} genes but {} gene names were given",
                counts.n_genes(),
                genes.len()
            )));
        }
        if counts.n_pixels() != barcodes.len() {
            return Err(DatasetError::Malformed(format!(
                "count matrix has {} pixels but {} barcodes were given",
                counts.n_pixels(),
                barcodes.len()
            )));
        }
        if coords.len() != barcodes.len() {
            return Err(DatasetError::Malformed(format!(
                "{} coordinates for {} pixels",
                coords.len(),
                barcodes.len()
            )));
        }
        if n_umi.len() != barcodes.len() {
            return Err(DatasetError::Malformed(format!(
                "{} nUMI values for {} pixels",
                n_umi.len(),
                barcodes.len()
            )));
        }

        let gene_index = index_unique(&genes, "gene")?;
        let barcode_index = index_unique(&barcodes, "barcode")?;
        counts.validate()?;

        for (pixel, c) in coords.iter().enumerate() {
            if !c.x.is_finite() || !c.y.is_finite() {
                return Err(DatasetError::Malformed(format!(
                    "non-finite coordinate for pixel {}",
                    barcodes[pixel]
                )));
            }
        }
        for (pixel, &umi) in n_umi.iter().enumerate() {
            if !umi.is_finite() || umi < 0.0 {
                return Err(DatasetError::Malformed(format!(
                    "invalid nUMI {umi} for pixel {}",
                    barcodes[pixel]
                )));
            }
        }

        Ok(Self {
            genes,
            gene_index,
            barcodes,
            barcode_index,
            counts,
            coords,
            n_umi,
            cell_labels,
        })
    }

    pub fn check_umi_invariant(&self) -> Result<(), DatasetError> {
        for pixel in 0..self.n_pixels() {
            let sum = self.counts.column_sum(pixel);
            let stored = self.n_umi[pixel];
            if (sum - stored).abs() > 1e-6 * stored.max(1.0) {
                return Err(DatasetError::UmiMismatch {
                    barcode: self.barcodes[pixel].clone(),
                    stored,
                    sum,
                });
            }
        }
        Ok(())
    }

    pub fn n_pixels(&self) -> usize {
        self.barcodes.len()
    }

    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn gene_position(&self, gene: &str) -> Option<usize> {
        self.gene_index.get(gene).copied()
    }

    pub fn barcodes(&self) -> &[String] {
        &self.barcodes
    }

    pub fn pixel_position(&self, barcode: &str) -> Option<usize> {
        self.barcode_index.get(barcode).copied()
    }

    pub fn counts(&self) -> &SparseCounts {
        &self.counts
    }

    pub fn coords(&self) -> &[Coord] {
        &self.coords
    }

    pub fn n_umi(&self) -> &[f64] {
        &self.n_umi
    }

    pub fn cell_labels(&self) -> Option<&[String]> {
        self.cell_labels.as_deref()
    }
}

fn index_unique(names: &[String], what: &str) -> Result<HashMap<String, usize>, DatasetError> {
    let mut index = HashMap::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        if index.insert(name.clone(), i).is_some() {
            return Err(DatasetError::Malformed(format!("duplicate {what}: {name}")));
        }
    }
    Ok(index)
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/dataset.rs"]
mod tests;
