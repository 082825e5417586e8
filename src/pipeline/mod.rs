use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::input::load_spatial_dataset;
use crate::input::reference::{load_gene_list, load_platform_effects, load_reference};
use crate::math::likelihood::LikelihoodCache;
use crate::model::config::{DecompConfig, FitMode};
use crate::model::dataset::SpatialDataset;
use crate::model::results::ResultsTable;

pub mod stage2_prepare;
pub mod stage3_fit;
pub mod stage4_classify;
pub mod stage5_aggregate;
pub mod stage6_decompose;
pub mod stage7_report;

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/fixtures.rs"]
pub(crate) mod fixtures;

pub use stage3_fit::{FitObserver, NoProgress, TracingProgress, fit_pixels};
pub use stage5_aggregate::aggregate;
pub use stage6_decompose::decompose_doublets;

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    pub reference_path: PathBuf,
    pub platform_effects_path: Option<PathBuf>,
    pub genes_path: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub config: DecompConfig,
    pub decompose: bool,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub table: ResultsTable,
    pub derived: Option<SpatialDataset>,
}

fn timed<T>(stage: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let start = Instant::now();
    info!(stage, "stage started");
    match f() {
        Ok(value) => {
            info!(
                stage,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "stage finished"
            );
            Ok(value)
        }
        Err(err) => {
            warn!(
                stage,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "stage failed"
            );
            Err(err)
        }
    }
}

pub fn run_pipeline(run: &RunConfig) -> Result<RunOutcome> {
    info!(
        simd_backend = %crate::simd::backend_name(),
        mode = run.config.mode.as_str(),
        "compute backend selected"
    );
    run.config.validate().context("invalid configuration")?;

    let (dataset, reference, requested_genes) = timed("input", || {
        let dataset = load_spatial_dataset(&run.input_dir).with_context(|| {
            format!("failed to load spatial data from {}", run.input_dir.display())
        })?;
        let mut reference = load_reference(&run.reference_path).with_context(|| {
            format!("failed to load reference {}", run.reference_path.display())
        })?;
        if let Some(path) = &run.platform_effects_path {
            let effects = load_platform_effects(path)
                .with_context(|| format!("failed to load platform effects {}", path.display()))?;
            reference = reference.with_platform_effects(&effects)?;
        }
        let genes = match &run.genes_path {
            Some(path) => Some(
                load_gene_list(path)
                    .with_context(|| format!("failed to load gene list {}", path.display()))?,
            ),
            None => None,
        };
        Ok((dataset, reference, genes))
    })?;

    let prepared = timed("prepare", || {
        Ok(stage2_prepare::prepare(&dataset, &reference, requested_genes)?)
    })?;

    let cache = timed("likelihood", || {
        Ok(LikelihoodCache::build(&run.config.likelihood)?)
    })?;

    let mode = run.config.mode;
    let results = timed("fit", || {
        let progress = TracingProgress::new(run.config.fit.progress_every);
        Ok(fit_pixels(
            &dataset,
            &prepared.profiles,
            &cache,
            &prepared.gene_list,
            mode,
            &run.config,
            &progress,
        )?)
    })?;

    let table = timed("aggregate", || {
        Ok(aggregate(&results, prepared.profiles.cell_types())?)
    })?;
    let [reject, singlet, certain, uncertain] = table.class_counts();
    info!(reject, singlet, certain, uncertain, "pixels classified");

    let derived = if mode == FitMode::Doublet && run.decompose {
        Some(timed("decompose", || {
            Ok(decompose_doublets(
                &table,
                &prepared.gene_list,
                &dataset,
                table.doublet_weights(),
                &prepared.profiles,
            )?)
        })?)
    } else {
        None
    };

    timed("report", || {
        let input = stage7_report::ReportInput {
            table: &table,
            config: &run.config,
            n_genes_dataset: dataset.n_genes(),
            n_genes_fitted: prepared.gene_list.len(),
            derived: derived.as_ref(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        };
        stage7_report::write_reports(&input, &run.out_dir)
            .with_context(|| format!("failed to write reports to {}", run.out_dir.display()))
    })?;

    Ok(RunOutcome { table, derived })
}
