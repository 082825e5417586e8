use std::collections::HashMap;

use crate::model::cell_types::{CellTypeId, CellTypeSet};
use crate::model::spot_class::SpotClass;

#[derive(Debug, Clone, PartialEq)]
pub struct PixelFitResult {
    pub pixel: usize,
    pub barcode: String,
    pub n_umi: f64,
    pub spot_class: SpotClass,
    pub first_type: CellTypeId,
    pub second_type: Option<CellTypeId>,
    pub first_class: bool,
    pub second_class: bool,
    pub min_score: f64,
    pub singlet_score: f64,
    pub conv_all: bool,
    pub conv_doublet: bool,
    pub all_weights: Vec<f64>,
    // Ordered as (first_type, second_type). Set only when the doublet search
    // ran and the pixel was not rejected; singlets carry `[w, 0]`.
    pub doublet_weights: Option<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub spot_class: SpotClass,
    pub first_type: CellTypeId,
    pub second_type: Option<CellTypeId>,
    pub first_class: bool,
    pub second_class: bool,
    pub min_score: f64,
    pub singlet_score: f64,
    pub conv_all: bool,
    pub conv_doublet: bool,
    pub n_umi: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoubletWeights {
    barcodes: Vec<String>,
    index: HashMap<String, usize>,
    values: Vec<[f64; 2]>,
    present: Vec<bool>,
}

impl DoubletWeights {
    pub fn with_barcodes(barcodes: Vec<String>) -> Self {
        let index = barcodes
            .iter()
            .enumerate()
            .map(|(i, b)| (b.clone(), i))
            .collect();
        let n = barcodes.len();
        Self {
            barcodes,
            index,
            values: vec![[0.0, 0.0]; n],
            present: vec![false; n],
        }
    }

    pub(crate) fn set(&mut self, row: usize, weights: [f64; 2]) {
        self.values[row] = weights;
        self.present[row] = true;
    }

    pub fn get(&self, barcode: &str) -> Option<[f64; 2]> {
        let row = *self.index.get(barcode)?;
        self.present[row].then_some(self.values[row])
    }

    pub fn row(&self, row: usize) -> Option<[f64; 2]> {
        self.present[row].then_some(self.values[row])
    }

    pub fn barcodes(&self) -> &[String] {
        &self.barcodes
    }

    pub fn len(&self) -> usize {
        self.barcodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.barcodes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsTable {
    pub(crate) barcodes: Vec<String>,
    pub(crate) cell_types: CellTypeSet,
    pub(crate) weights: Vec<f64>,
    pub(crate) doublet_weights: DoubletWeights,
    pub(crate) rows: Vec<ResultRow>,
}

impl ResultsTable {
    pub fn n_pixels(&self) -> usize {
        self.barcodes.len()
    }

    pub fn barcodes(&self) -> &[String] {
        &self.barcodes
    }

    pub fn cell_types(&self) -> &CellTypeSet {
        &self.cell_types
    }

    pub fn weights(&self, row: usize) -> &[f64] {
        let k = self.cell_types.len();
        &self.weights[row * k..(row + 1) * k]
    }

    pub fn doublet_weights(&self) -> &DoubletWeights {
        &self.doublet_weights
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn row(&self, row: usize) -> &ResultRow {
        &self.rows[row]
    }

    pub fn class_counts(&self) -> [usize; 4] {
        let mut counts = [0usize; 4];
        for row in &self.rows {
            let idx = match row.spot_class {
                SpotClass::Reject => 0,
                SpotClass::Singlet => 1,
                SpotClass::DoubletCertain => 2,
                SpotClass::DoubletUncertain => 3,
            };
            counts[idx] += 1;
        }
        counts
    }
}
