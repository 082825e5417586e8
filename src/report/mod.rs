pub mod json;
pub mod text;

use serde::Serialize;

use crate::model::config::DecompConfig;

#[derive(Debug, Clone, Serialize)]
pub struct ToolMeta {
    pub name: String,
    pub version: String,
    pub simd_backend: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputStats {
    pub n_pixels: usize,
    pub n_genes_dataset: usize,
    pub n_genes_fitted: usize,
    pub n_cell_types: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassStat {
    pub name: &'static str,
    pub count: usize,
    pub fraction: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CellTypeStat {
    pub name: String,
    pub first_type_count: usize,
    pub mean_weight: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionStats {
    pub median: f64,
    pub p10: f64,
    pub p90: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvergenceStats {
    pub conv_all_fraction: f64,
    pub conv_doublet_fraction: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DerivedStats {
    pub n_records: usize,
    pub n_split_pixels: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryData {
    pub tool: ToolMeta,
    pub input: InputStats,
    pub config: DecompConfig,
    pub classes: Vec<ClassStat>,
    pub cell_types: Vec<CellTypeStat>,
    pub convergence: ConvergenceStats,
    pub n_umi: DistributionStats,
    pub derived: Option<DerivedStats>,
}

pub fn format_f64_6(v: f64) -> String {
    format!("{:.6}", v)
}

pub fn quantile_indexed(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    let idx = ((n - 1) as f64 * p).ceil() as usize;
    sorted[idx]
}

pub fn median(values: &[f64]) -> f64 {
    quantile_indexed(values, 0.5)
}

pub fn p10(values: &[f64]) -> f64 {
    quantile_indexed(values, 0.10)
}

pub fn p90(values: &[f64]) -> f64 {
    quantile_indexed(values, 0.90)
}

pub fn bool_fraction(values: impl IntoIterator<Item = bool>) -> f64 {
    let mut total = 0usize;
    let mut count = 0usize;
    for v in values {
        total += 1;
        if v {
            count += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64
}

pub fn distribution(values: &[f64]) -> DistributionStats {
    DistributionStats {
        median: median(values),
        p10: p10(values),
        p90: p90(values),
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/mod.rs"]
mod tests;
