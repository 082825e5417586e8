use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use thiserror::Error;
use tracing::info;

use crate::math::likelihood::LikelihoodCache;
use crate::math::solver::{PixelProblem, SolverParams};
use crate::model::cell_types::{CellTypeId, CellTypeSet};
use crate::model::config::{DecompConfig, FitMode, FitParams};
use crate::model::dataset::{DatasetError, SpatialDataset};
use crate::model::genes::GeneList;
use crate::model::profiles::{ProfileMatrix, ReferenceProfiles};
use crate::model::results::PixelFitResult;
use crate::pipeline::stage4_classify::{
    FitSummary, PairFit, SingletFit, classify, umi_in_range,
};

#[derive(Debug, Error)]
pub enum FitError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

// Called from worker threads.
pub trait FitObserver: Sync {
    fn pixel_done(&self, done: usize, total: usize);
}

pub struct TracingProgress {
    every: usize,
}

impl TracingProgress {
    pub fn new(every: usize) -> Self {
        Self { every }
    }
}

impl FitObserver for TracingProgress {
    fn pixel_done(&self, done: usize, total: usize) {
        if self.every > 0 && (done % self.every == 0 || done == total) {
            info!(done, total, "pixels fitted");
        }
    }
}

pub struct NoProgress;

impl FitObserver for NoProgress {
    fn pixel_done(&self, _done: usize, _total: usize) {}
}

struct FitContext<'a> {
    dataset: &'a SpatialDataset,
    matrix: ProfileMatrix,
    cache: &'a LikelihoodCache,
    cell_types: &'a CellTypeSet,
    list_position: Vec<Option<usize>>,
    mode: FitMode,
    config: &'a DecompConfig,
    solver: SolverParams,
}

pub fn fit_pixels(
    dataset: &SpatialDataset,
    profiles: &ReferenceProfiles,
    cache: &LikelihoodCache,
    gene_list: &GeneList,
    mode: FitMode,
    config: &DecompConfig,
    observer: &dyn FitObserver,
) -> Result<Vec<PixelFitResult>, FitError> {
    let matrix = profiles.restrict(gene_list)?;
    let rows = gene_list.dataset_positions(dataset)?;
    let mut list_position = vec![None; dataset.n_genes()];
    for (pos, &row) in rows.iter().enumerate() {
        list_position[row] = Some(pos);
    }

    let ctx = FitContext {
        dataset,
        matrix,
        cache,
        cell_types: profiles.cell_types(),
        list_position,
        mode,
        config,
        solver: SolverParams::from(&config.fit),
    };

    let total = dataset.n_pixels();
    let done = AtomicUsize::new(0);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.fit.threads)
        .build()?;
    let results = pool.install(|| {
        (0..total)
            .into_par_iter()
            .map(|pixel| {
                let result = fit_pixel(&ctx, pixel);
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                observer.pixel_done(n, total);
                result
            })
            .collect::<Vec<_>>()
    });
    Ok(results)
}

fn fit_pixel(ctx: &FitContext<'_>, pixel: usize) -> PixelFitResult {
    let n_umi = ctx.dataset.n_umi()[pixel];
    let summary = if umi_in_range(n_umi, &ctx.config.classify) {
        let counts = pixel_counts(ctx, pixel);
        let problem = PixelProblem::new(&counts, n_umi, &ctx.matrix, ctx.cache);
        summarize(&problem, n_umi, ctx.mode, &ctx.config.fit, &ctx.solver)
    } else {
        FitSummary {
            n_umi,
            all_weights: vec![0.0; ctx.cell_types.len()],
            all_nll: 0.0,
            conv_all: false,
            singlets: Vec::new(),
            pairs: Vec::new(),
        }
    };
    let class = classify(&summary, ctx.mode, &ctx.config.classify);

    PixelFitResult {
        pixel,
        barcode: ctx.dataset.barcodes()[pixel].clone(),
        n_umi,
        spot_class: class.spot_class,
        first_type: class.first_type,
        second_type: class.second_type,
        first_class: class.first_class,
        second_class: class.second_class,
        min_score: class.min_score,
        singlet_score: class.singlet_score,
        conv_all: summary.conv_all,
        conv_doublet: class.conv_doublet,
        all_weights: summary.all_weights,
        doublet_weights: class.doublet_weights,
    }
}

fn pixel_counts(ctx: &FitContext<'_>, pixel: usize) -> Vec<f64> {
    let mut counts = vec![0f64; ctx.matrix.n_genes()];
    let (rows, values) = ctx.dataset.counts().column(pixel);
    for (&row, &value) in rows.iter().zip(values) {
        if let Some(pos) = ctx.list_position[row as usize] {
            counts[pos] = value;
        }
    }
    counts
}

pub(crate) fn summarize(
    problem: &PixelProblem<'_>,
    n_umi: f64,
    mode: FitMode,
    fit: &FitParams,
    solver: &SolverParams,
) -> FitSummary {
    let n_types = problem.n_types();
    let all: Vec<usize> = (0..n_types).collect();
    let full = problem.solve(&all, solver);

    let mut summary = FitSummary {
        n_umi,
        all_weights: full.weights,
        all_nll: full.nll,
        conv_all: full.converged,
        singlets: Vec::new(),
        pairs: Vec::new(),
    };
    if mode == FitMode::Full {
        return summary;
    }

    let candidates = candidate_types(&summary.all_weights, fit.candidate_weight_min);
    summary.singlets = candidates
        .iter()
        .map(|&t| {
            let f = problem.solve(&[t], solver);
            SingletFit {
                cell_type: CellTypeId(t as u32),
                weight: f.weights[0],
                nll: f.nll,
                converged: f.converged,
            }
        })
        .collect();
    for (i, &a) in candidates.iter().enumerate() {
        for &b in &candidates[i + 1..] {
            let f = problem.solve(&[a, b], solver);
            summary.pairs.push(PairFit {
                types: [CellTypeId(a as u32), CellTypeId(b as u32)],
                weights: [f.weights[0], f.weights[1]],
                nll: f.nll,
                converged: f.converged,
            });
        }
    }
    summary
}

pub(crate) fn candidate_types(all_weights: &[f64], weight_min: f64) -> Vec<usize> {
    let n_types = all_weights.len();
    if weight_min <= 0.0 {
        return (0..n_types).collect();
    }
    let mut candidates: Vec<usize> = (0..n_types)
        .filter(|&t| all_weights[t] > weight_min)
        .collect();
    if candidates.is_empty() {
        candidates = (0..n_types.min(3)).collect();
    } else if candidates.len() == 1 && n_types > 1 {
        let only = candidates[0];
        let other = if only == 0 { 1 } else { 0 };
        candidates.push(other);
        candidates.sort_unstable();
    }
    candidates
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_fit.rs"]
mod tests;
