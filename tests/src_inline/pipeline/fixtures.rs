//! Three cell types with disjoint ten-gene marker blocks and four pixels:
//! pure A, an even A/B mixture, a 5-UMI pixel and a 0.6 C / 0.4 A mixture.

use crate::math::likelihood::LikelihoodCache;
use crate::model::cell_types::CellTypeSet;
use crate::model::config::{DecompConfig, LikelihoodParams};
use crate::model::dataset::{Coord, SparseCounts, SpatialDataset};
use crate::model::genes::GeneList;
use crate::model::profiles::ReferenceProfiles;

pub(crate) const N_GENES: usize = 30;
pub(crate) const PURE_A: usize = 0;
pub(crate) const MIX_AB: usize = 1;
pub(crate) const LOW_UMI: usize = 2;
pub(crate) const MIX_CA: usize = 3;

pub(crate) fn gene_names() -> Vec<String> {
    (0..N_GENES).map(|g| format!("G{g:02}")).collect()
}

fn rate(gene: usize, cell_type: usize) -> f64 {
    if gene / 10 == cell_type { 0.08 } else { 0.01 }
}

pub(crate) fn reference() -> ReferenceProfiles {
    let types = CellTypeSet::new(vec!["A".to_string(), "B".to_string(), "C".to_string()]).unwrap();
    let mut rates = Vec::with_capacity(N_GENES * 3);
    for g in 0..N_GENES {
        for t in 0..3 {
            rates.push(rate(g, t));
        }
    }
    ReferenceProfiles::new(gene_names(), types, rates).unwrap()
}

fn mixture_column(weights: [f64; 3], n_umi: f64) -> Vec<(u32, f64)> {
    (0..N_GENES)
        .map(|g| {
            let lambda: f64 = (0..3).map(|t| weights[t] * rate(g, t)).sum();
            (g as u32, (n_umi * lambda).round())
        })
        .collect()
}

pub(crate) fn dataset() -> SpatialDataset {
    let columns = vec![
        mixture_column([1.0, 0.0, 0.0], 1000.0),
        mixture_column([0.5, 0.5, 0.0], 1000.0),
        vec![(0, 3.0), (10, 2.0)],
        mixture_column([0.4, 0.0, 0.6], 1000.0),
    ];
    let barcodes = vec![
        "pureA".to_string(),
        "mixAB".to_string(),
        "low".to_string(),
        "mixCA".to_string(),
    ];
    let coords = (0..4)
        .map(|i| Coord {
            x: i as f64,
            y: 10.0 + i as f64,
        })
        .collect();
    let counts = SparseCounts::from_columns(N_GENES, columns);
    SpatialDataset::from_counts(gene_names(), barcodes, counts, coords).unwrap()
}

/// Pure A and an even A/B mixture at spatial sequencing depth.
pub(crate) fn deep_dataset(n_umi: f64) -> SpatialDataset {
    let columns = vec![
        mixture_column([1.0, 0.0, 0.0], n_umi),
        mixture_column([0.5, 0.5, 0.0], n_umi),
    ];
    let barcodes = vec!["deepA".to_string(), "deepAB".to_string()];
    let coords = vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }];
    let counts = SparseCounts::from_columns(N_GENES, columns);
    SpatialDataset::from_counts(gene_names(), barcodes, counts, coords).unwrap()
}

pub(crate) fn gene_list() -> GeneList {
    GeneList::new(gene_names()).unwrap()
}

pub(crate) fn config() -> DecompConfig {
    let mut config = DecompConfig::default_v1();
    config.likelihood = LikelihoodParams {
        sigma: 0.3,
        max_count: 150,
        n_lambda_bins: 200,
        lambda_min: 1e-3,
        lambda_max: 500.0,
        n_quadrature: 61,
    };
    config
}

pub(crate) fn cache(config: &DecompConfig) -> LikelihoodCache {
    LikelihoodCache::build(&config.likelihood).unwrap()
}
