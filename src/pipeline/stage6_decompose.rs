use std::collections::HashSet;

use thiserror::Error;
use tracing::warn;

use crate::model::dataset::{Coord, DatasetError, SparseCounts, SpatialDataset};
use crate::model::genes::GeneList;
use crate::model::profiles::ReferenceProfiles;
use crate::model::results::{DoubletWeights, ResultsTable};
use crate::model::spot_class::SpotClass;

#[derive(Debug, Error)]
pub enum DecomposeError {
    #[error("doublet_certain pixel {barcode} has no doublet weights")]
    MissingWeights { barcode: String },
    #[error("pixel {barcode} is not in the spatial dataset")]
    MissingPixel { barcode: String },
    #[error("doublet_certain pixel {barcode} has no second cell type")]
    MissingSecondType { barcode: String },
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

pub fn decompose_doublets(
    table: &ResultsTable,
    gene_list: &GeneList,
    dataset: &SpatialDataset,
    doublet_weights: &DoubletWeights,
    profiles: &ReferenceProfiles,
) -> Result<SpatialDataset, DecomposeError> {
    let matrix = profiles.restrict(gene_list)?;
    let rows = gene_list.dataset_positions(dataset)?;
    let mut list_position = vec![None; dataset.n_genes()];
    for (pos, &row) in rows.iter().enumerate() {
        list_position[row] = Some(pos as u32);
    }
    let cell_types = table.cell_types();
    let mut taken: HashSet<String> = dataset.barcodes().iter().cloned().collect();

    let mut barcodes = Vec::new();
    let mut columns: Vec<Vec<(u32, f64)>> = Vec::new();
    let mut coords: Vec<Coord> = Vec::new();
    let mut n_umi = Vec::new();
    let mut labels = Vec::new();

    for (row_idx, row) in table.rows().iter().enumerate() {
        if !matches!(row.spot_class, SpotClass::Singlet | SpotClass::DoubletCertain) {
            continue;
        }
        let barcode = &table.barcodes()[row_idx];
        let pixel = dataset
            .pixel_position(barcode)
            .ok_or_else(|| DecomposeError::MissingPixel {
                barcode: barcode.clone(),
            })?;
        let (gene_rows, values) = dataset.counts().column(pixel);
        let restricted = gene_rows
            .iter()
            .zip(values)
            .filter_map(|(&g, &v)| list_position[g as usize].map(|pos| (pos, v)));
        let coord = dataset.coords()[pixel];
        let pixel_umi = dataset.n_umi()[pixel];

        if row.spot_class == SpotClass::Singlet {
            barcodes.push(barcode.clone());
            columns.push(restricted.collect());
            coords.push(coord);
            n_umi.push(pixel_umi);
            labels.push(cell_types.name(row.first_type).to_string());
            continue;
        }

        let [w1, w2] = doublet_weights
            .get(barcode)
            .ok_or_else(|| DecomposeError::MissingWeights {
                barcode: barcode.clone(),
            })?;
        let second = row
            .second_type
            .ok_or_else(|| DecomposeError::MissingSecondType {
                barcode: barcode.clone(),
            })?;
        let (t1, t2) = (row.first_type.index(), second.index());
        let w_total = w1 + w2;
        let share1 = if w_total > 0.0 { w1 / w_total } else { 0.5 };

        let mut first = Vec::new();
        let mut second_col = Vec::new();
        for (pos, count) in restricted {
            let a = w1 * matrix.rate(pos as usize, t1);
            let b = w2 * matrix.rate(pos as usize, t2);
            let frac = if a + b > 0.0 { a / (a + b) } else { share1 };
            let e1 = count * frac;
            first.push((pos, e1));
            second_col.push((pos, count - e1));
        }

        barcodes.push(record_name(barcode, 1, &mut taken));
        columns.push(first);
        coords.push(coord);
        n_umi.push(pixel_umi * share1);
        labels.push(cell_types.name(row.first_type).to_string());

        barcodes.push(record_name(barcode, 2, &mut taken));
        columns.push(second_col);
        coords.push(coord);
        n_umi.push(pixel_umi * (1.0 - share1));
        labels.push(cell_types.name(second).to_string());
    }

    let counts = SparseCounts::from_columns(gene_list.len(), columns);
    Ok(SpatialDataset::derived(
        gene_list.genes().to_vec(),
        barcodes,
        counts,
        coords,
        n_umi,
        labels,
    )?)
}

// Input barcodes are reserved up front, so a derived name never shadows a
// copied singlet.
fn record_name(barcode: &str, part: u8, taken: &mut HashSet<String>) -> String {
    let base = format!("{barcode}_{part}");
    if taken.insert(base.clone()) {
        return base;
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{base}_{n}");
        if taken.insert(candidate.clone()) {
            warn!(barcode, name = %candidate, "derived record name already in use; renamed");
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage6_decompose.rs"]
mod tests;
