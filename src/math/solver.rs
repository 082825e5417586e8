use nalgebra::{DMatrix, DVector};

use crate::math::likelihood::LikelihoodCache;
use crate::math::simplex::project_weights;
use crate::model::config::FitParams;
use crate::model::profiles::ProfileMatrix;
use crate::simd;

const ARMIJO: f64 = 1e-4;
const MAX_BACKTRACK: usize = 30;
const RIDGE: f64 = 1e-8;
const ZERO_WEIGHT: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverParams {
    pub max_iter: usize,
    pub min_change: f64,
    pub constrain: bool,
}

impl From<&FitParams> for SolverParams {
    fn from(p: &FitParams) -> Self {
        Self {
            max_iter: p.max_iter,
            min_change: p.min_change,
            constrain: p.constrain,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightFit {
    pub weights: Vec<f64>,
    pub nll: f64,
    pub converged: bool,
    pub iterations: usize,
}

pub struct PixelProblem<'a> {
    counts: Vec<u32>,
    profiles: &'a ProfileMatrix,
    cache: &'a LikelihoodCache,
    n_umi: f64,
}

// Profile columns of a type subset, gene-major, pre-scaled by nUMI.
struct SubsetProfile {
    k: usize,
    rows: Vec<f64>,
}

impl SubsetProfile {
    #[inline]
    fn row(&self, gene: usize) -> &[f64] {
        &self.rows[gene * self.k..(gene + 1) * self.k]
    }
}

impl<'a> PixelProblem<'a> {
    pub fn new(
        counts: &[f64],
        n_umi: f64,
        profiles: &'a ProfileMatrix,
        cache: &'a LikelihoodCache,
    ) -> Self {
        debug_assert_eq!(counts.len(), profiles.n_genes());
        Self {
            counts: counts.iter().map(|&c| cache.to_count(c)).collect(),
            profiles,
            cache,
            n_umi,
        }
    }

    pub fn n_types(&self) -> usize {
        self.profiles.n_types()
    }

    fn subset_profile(&self, subset: &[usize]) -> SubsetProfile {
        let k = subset.len();
        let mut rows = Vec::with_capacity(self.profiles.n_genes() * k);
        for g in 0..self.profiles.n_genes() {
            let row = self.profiles.row(g);
            for &t in subset {
                rows.push(self.n_umi * row[t]);
            }
        }
        SubsetProfile { k, rows }
    }

    fn nll_with(&self, sub: &SubsetProfile, weights: &[f64]) -> f64 {
        let mut total = 0f64;
        for (g, &count) in self.counts.iter().enumerate() {
            let lambda = simd::dot_f64(sub.row(g), weights);
            total -= self.cache.log_prob(count, lambda);
        }
        total
    }

    pub fn nll(&self, subset: &[usize], weights: &[f64]) -> f64 {
        let sub = self.subset_profile(subset);
        self.nll_with(&sub, weights)
    }

    fn grad_hess(&self, sub: &SubsetProfile, weights: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let k = sub.k;
        let mut grad = vec![0f64; k];
        let mut hess = vec![0f64; k * k];
        for (g, &count) in self.counts.iter().enumerate() {
            let row = sub.row(g);
            let lambda = simd::dot_f64(row, weights);
            let term = self.cache.term(count, lambda);
            let d1 = -term.d1;
            let curv = (-term.d2).max(0.0);
            for s in 0..k {
                grad[s] += d1 * row[s];
                if curv > 0.0 {
                    let a = curv * row[s];
                    for t in s..k {
                        hess[s * k + t] += a * row[t];
                    }
                }
            }
        }
        for s in 0..k {
            for t in 0..s {
                hess[s * k + t] = hess[t * k + s];
            }
        }
        (grad, hess)
    }

    pub fn solve(&self, subset: &[usize], params: &SolverParams) -> WeightFit {
        let k = subset.len();
        if k == 0 {
            return WeightFit {
                weights: Vec::new(),
                nll: f64::INFINITY,
                converged: false,
                iterations: 0,
            };
        }
        let sub = self.subset_profile(subset);
        let (mut w, mut f) = self.best_start(&sub);

        if k == 1 && params.constrain {
            return WeightFit {
                weights: w,
                nll: f,
                converged: true,
                iterations: 0,
            };
        }

        let mut converged = false;
        let mut iterations = 0usize;
        while iterations < params.max_iter {
            iterations += 1;
            let (grad, hess) = self.grad_hess(&sub, &w);
            let newton = newton_direction(&grad, &hess, k);
            let scale = max_diagonal(&hess, k);
            let gradient_step = if scale > 0.0 { 1.0 / scale } else { 1.0 };

            let mut step = self.line_search(&sub, &w, f, &grad, &newton, 1.0, params.constrain);
            if step.is_none() {
                let gradient_dir: Vec<f64> = grad.iter().map(|g| -g).collect();
                step = self.line_search(
                    &sub,
                    &w,
                    f,
                    &grad,
                    &gradient_dir,
                    gradient_step,
                    params.constrain,
                );
            }
            let Some((next, f_next)) = step else {
                converged =
                    projected_residual(&w, &grad, gradient_step, params.constrain) < params.min_change;
                break;
            };

            let change: f64 = next.iter().zip(&w).map(|(a, b)| (a - b).abs()).sum();
            w = next;
            f = f_next;
            if change < params.min_change {
                converged = true;
                break;
            }
        }

        if w.iter().all(|&v| v <= ZERO_WEIGHT) {
            converged = false;
        }

        WeightFit {
            weights: w,
            nll: f,
            converged,
            iterations,
        }
    }

    // Vertices are feasible in both modes, so the fit never ends above the
    // best single-type hypothesis inside the subset.
    fn best_start(&self, sub: &SubsetProfile) -> (Vec<f64>, f64) {
        let k = sub.k;
        let mut best = vec![1.0 / k as f64; k];
        let mut best_f = self.nll_with(sub, &best);
        if k == 1 {
            return (best, best_f);
        }
        let mut vertex = vec![0f64; k];
        for i in 0..k {
            vertex.fill(0.0);
            vertex[i] = 1.0;
            let f = self.nll_with(sub, &vertex);
            if f < best_f {
                best_f = f;
                best.copy_from_slice(&vertex);
            }
        }
        (best, best_f)
    }

    #[allow(clippy::too_many_arguments)]
    fn line_search(
        &self,
        sub: &SubsetProfile,
        w: &[f64],
        f: f64,
        grad: &[f64],
        direction: &[f64],
        initial_step: f64,
        constrain: bool,
    ) -> Option<(Vec<f64>, f64)> {
        let mut step = initial_step;
        let mut candidate = vec![0f64; w.len()];
        for _ in 0..MAX_BACKTRACK {
            for i in 0..w.len() {
                candidate[i] = w[i] + step * direction[i];
            }
            project_weights(&mut candidate, constrain);
            let predicted: f64 = grad
                .iter()
                .zip(candidate.iter().zip(w))
                .map(|(g, (c, x))| g * (c - x))
                .sum();
            let f_candidate = self.nll_with(sub, &candidate);
            if f_candidate < f && f_candidate <= f + ARMIJO * predicted.min(0.0) {
                return Some((candidate, f_candidate));
            }
            step *= 0.5;
        }
        None
    }
}

fn newton_direction(grad: &[f64], hess: &[f64], k: usize) -> Vec<f64> {
    let trace: f64 = (0..k).map(|i| hess[i * k + i]).sum();
    let ridge = RIDGE * (trace / k as f64).max(1.0);
    let h = DMatrix::<f64>::from_fn(k, k, |i, j| {
        hess[i * k + j] + if i == j { ridge } else { 0.0 }
    });
    let neg_grad = DVector::<f64>::from_iterator(k, grad.iter().map(|g| -g));
    match h.cholesky() {
        Some(chol) => chol.solve(&neg_grad).iter().copied().collect(),
        None => neg_grad.iter().copied().collect(),
    }
}

// L1 length of one projected-gradient step; zero exactly at a KKT point.
fn projected_residual(w: &[f64], grad: &[f64], step: f64, constrain: bool) -> f64 {
    let mut moved: Vec<f64> = w.iter().zip(grad).map(|(x, g)| x - step * g).collect();
    project_weights(&mut moved, constrain);
    moved.iter().zip(w).map(|(a, b)| (a - b).abs()).sum()
}

fn max_diagonal(hess: &[f64], k: usize) -> f64 {
    let diag: Vec<f64> = (0..k).map(|i| hess[i * k + i]).collect();
    simd::max_f64(&diag).max(0.0)
}

#[cfg(test)]
#[path = "../../tests/src_inline/math/solver.rs"]
mod tests;
