use thiserror::Error;

use crate::model::cell_types::CellTypeSet;
use crate::model::results::{DoubletWeights, PixelFitResult, ResultRow, ResultsTable};

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("pixel {pixel} appears more than once")]
    DuplicatePixel { pixel: usize },
    #[error("no result for pixel {pixel}")]
    MissingPixel { pixel: usize },
    #[error("pixel {pixel} has {got} weights, expected {expected}")]
    WeightWidth {
        pixel: usize,
        got: usize,
        expected: usize,
    },
    #[error("pixel {pixel} names cell type {index} outside the reference")]
    UnknownCellType { pixel: usize, index: usize },
}

pub fn aggregate(
    results: &[PixelFitResult],
    cell_types: &CellTypeSet,
) -> Result<ResultsTable, AggregateError> {
    let n_types = cell_types.len();
    let n_pixels = results.iter().map(|r| r.pixel + 1).max().unwrap_or(0);

    let mut slots: Vec<Option<&PixelFitResult>> = vec![None; n_pixels];
    for result in results {
        if result.all_weights.len() != n_types {
            return Err(AggregateError::WeightWidth {
                pixel: result.pixel,
                got: result.all_weights.len(),
                expected: n_types,
            });
        }
        let out_of_range = std::iter::once(result.first_type)
            .chain(result.second_type)
            .find(|t| t.index() >= n_types);
        if let Some(t) = out_of_range {
            return Err(AggregateError::UnknownCellType {
                pixel: result.pixel,
                index: t.index(),
            });
        }
        let slot = &mut slots[result.pixel];
        if slot.is_some() {
            return Err(AggregateError::DuplicatePixel {
                pixel: result.pixel,
            });
        }
        *slot = Some(result);
    }

    let mut barcodes = Vec::with_capacity(n_pixels);
    let mut weights = Vec::with_capacity(n_pixels * n_types);
    let mut rows = Vec::with_capacity(n_pixels);
    let mut doublet_values = Vec::with_capacity(n_pixels);
    for (pixel, slot) in slots.iter().enumerate() {
        let result = slot.ok_or(AggregateError::MissingPixel { pixel })?;
        barcodes.push(result.barcode.clone());
        weights.extend_from_slice(&result.all_weights);
        doublet_values.push(result.doublet_weights);
        rows.push(ResultRow {
            spot_class: result.spot_class,
            first_type: result.first_type,
            second_type: result.second_type,
            first_class: result.first_class,
            second_class: result.second_class,
            min_score: result.min_score,
            singlet_score: result.singlet_score,
            conv_all: result.conv_all,
            conv_doublet: result.conv_doublet,
            n_umi: result.n_umi,
        });
    }

    let mut doublet_weights = DoubletWeights::with_barcodes(barcodes.clone());
    for (row, value) in doublet_values.into_iter().enumerate() {
        if let Some(w) = value {
            doublet_weights.set(row, w);
        }
    }

    Ok(ResultsTable {
        barcodes,
        cell_types: cell_types.clone(),
        weights,
        doublet_weights,
        rows,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage5_aggregate.rs"]
mod tests;
