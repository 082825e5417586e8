use crate::model::cell_types::CellTypeId;
use crate::model::config::{ClassifyThresholds, FitMode};
use crate::model::spot_class::SpotClass;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SingletFit {
    pub cell_type: CellTypeId,
    pub weight: f64,
    pub nll: f64,
    pub converged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairFit {
    pub types: [CellTypeId; 2],
    pub weights: [f64; 2],
    pub nll: f64,
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitSummary {
    pub n_umi: f64,
    pub all_weights: Vec<f64>,
    pub all_nll: f64,
    pub conv_all: bool,
    pub singlets: Vec<SingletFit>,
    pub pairs: Vec<PairFit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub spot_class: SpotClass,
    pub first_type: CellTypeId,
    pub second_type: Option<CellTypeId>,
    pub first_class: bool,
    pub second_class: bool,
    pub min_score: f64,
    pub singlet_score: f64,
    pub conv_doublet: bool,
    pub doublet_weights: Option<[f64; 2]>,
}

#[inline]
pub fn umi_in_range(n_umi: f64, thresholds: &ClassifyThresholds) -> bool {
    n_umi >= thresholds.umi_min && n_umi <= thresholds.umi_max
}

pub fn classify(
    summary: &FitSummary,
    mode: FitMode,
    thresholds: &ClassifyThresholds,
) -> Classification {
    if !umi_in_range(summary.n_umi, thresholds) {
        return reject(CellTypeId(0), 0.0, 0.0, false);
    }
    match mode {
        FitMode::Full => classify_full(summary),
        FitMode::Doublet => classify_doublet(summary, thresholds),
    }
}

fn reject(first_type: CellTypeId, min_score: f64, singlet_score: f64, conv_doublet: bool) -> Classification {
    Classification {
        spot_class: SpotClass::Reject,
        first_type,
        second_type: None,
        first_class: false,
        second_class: false,
        min_score,
        singlet_score,
        conv_doublet,
        doublet_weights: None,
    }
}

fn classify_full(summary: &FitSummary) -> Classification {
    let first_type = argmax_type(&summary.all_weights);
    if !summary.conv_all {
        return reject(first_type, summary.all_nll, summary.all_nll, false);
    }
    Classification {
        spot_class: SpotClass::Singlet,
        first_type,
        second_type: None,
        first_class: true,
        second_class: false,
        min_score: summary.all_nll,
        singlet_score: summary.all_nll,
        conv_doublet: false,
        doublet_weights: None,
    }
}

fn classify_doublet(summary: &FitSummary, thresholds: &ClassifyThresholds) -> Classification {
    let Some(best_singlet) = best_by_nll(&summary.singlets, |s| s.nll) else {
        return reject(argmax_type(&summary.all_weights), 0.0, 0.0, false);
    };
    let singlet_score = best_singlet.nll;

    let Some(best_pair) = best_by_nll(&summary.pairs, |p| p.nll) else {
        // One cell type only: no pair hypothesis exists.
        if !best_singlet.converged {
            return reject(best_singlet.cell_type, singlet_score, singlet_score, false);
        }
        return singlet(best_singlet, singlet_score, singlet_score, true);
    };
    let min_score = best_pair.nll;

    if !best_pair.converged {
        return reject(best_singlet.cell_type, min_score, singlet_score, false);
    }

    if singlet_score - min_score < thresholds.doublet_margin {
        return singlet(best_singlet, min_score, singlet_score, true);
    }

    let [a, b] = best_pair.types;
    let [wa, wb] = best_pair.weights;
    let (first, second, w1, w2) = if wa >= wb { (a, b, wa, wb) } else { (b, a, wb, wa) };

    let cutoff = min_score + thresholds.confidence_margin;
    let certain = w1 >= thresholds.min_doublet_weight
        && w2 >= thresholds.min_doublet_weight
        && well_separated(summary, first, cutoff)
        && well_separated(summary, second, cutoff);

    Classification {
        spot_class: if certain {
            SpotClass::DoubletCertain
        } else {
            SpotClass::DoubletUncertain
        },
        first_type: first,
        second_type: Some(second),
        first_class: true,
        second_class: certain,
        min_score,
        singlet_score,
        conv_doublet: true,
        doublet_weights: Some([w1, w2]),
    }
}

fn singlet(fit: &SingletFit, min_score: f64, singlet_score: f64, conv_doublet: bool) -> Classification {
    Classification {
        spot_class: SpotClass::Singlet,
        first_type: fit.cell_type,
        second_type: None,
        first_class: true,
        second_class: false,
        min_score,
        singlet_score,
        conv_doublet,
        doublet_weights: Some([fit.weight, 0.0]),
    }
}

// A type is well separated when every hypothesis without it scores at
// least `cutoff`.
fn well_separated(summary: &FitSummary, cell_type: CellTypeId, cutoff: f64) -> bool {
    let pairs_ok = summary
        .pairs
        .iter()
        .filter(|p| !p.types.contains(&cell_type))
        .all(|p| p.nll >= cutoff);
    let singlets_ok = summary
        .singlets
        .iter()
        .filter(|s| s.cell_type != cell_type)
        .all(|s| s.nll >= cutoff);
    pairs_ok && singlets_ok
}

// First in canonical order wins ties.
fn best_by_nll<T>(items: &[T], nll: impl Fn(&T) -> f64) -> Option<&T> {
    let mut best: Option<&T> = None;
    for item in items {
        match best {
            Some(current) if !(nll(item) < nll(current)) => {}
            _ => best = Some(item),
        }
    }
    best
}

fn argmax_type(weights: &[f64]) -> CellTypeId {
    let mut best = 0usize;
    for (i, &w) in weights.iter().enumerate() {
        if w > weights[best] {
            best = i;
        }
    }
    CellTypeId(best as u32)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage4_classify.rs"]
mod tests;
