// Y | λ ~ Poisson(λ · e^ε), ε ~ N(0, σ²). Rows are counts 0..=max_count,
// columns a log-spaced λ grid; values are log P and its λ-derivatives.
// Terms beyond the grid use the Laplace approximation of the ε integral.

use rayon::prelude::*;
use statrs::distribution::{Continuous, Normal};
use statrs::function::factorial::ln_factorial;
use thiserror::Error;

use crate::model::config::LikelihoodParams;

#[derive(Debug, Error)]
pub enum LikelihoodError {
    #[error("invalid noise model parameters: {0}")]
    InvalidParams(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogLikTerm {
    pub value: f64,
    pub d1: f64,
    pub d2: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LikelihoodCache {
    sigma: f64,
    max_count: u32,
    n_bins: usize,
    lambda_min: f64,
    lambda_max: f64,
    ln_lambda_min: f64,
    ln_step: f64,
    values: Vec<f64>,
    d1: Vec<f64>,
    d2: Vec<f64>,
}

struct Quadrature {
    eps: Vec<f64>,
    exp_eps: Vec<f64>,
    log_weight: Vec<f64>,
}

impl LikelihoodCache {
    pub fn build(params: &LikelihoodParams) -> Result<Self, LikelihoodError> {
        if !(params.sigma.is_finite() && params.sigma > 0.0) {
            return Err(LikelihoodError::InvalidParams(format!(
                "sigma must be positive, got {}",
                params.sigma
            )));
        }
        if params.n_lambda_bins < 2 {
            return Err(LikelihoodError::InvalidParams(
                "lambda grid needs at least 2 nodes".to_string(),
            ));
        }
        if !(params.lambda_min > 0.0
            && params.lambda_max > params.lambda_min
            && params.lambda_max.is_finite())
        {
            return Err(LikelihoodError::InvalidParams(format!(
                "lambda range [{}, {}] is not positive and increasing",
                params.lambda_min, params.lambda_max
            )));
        }
        if params.n_quadrature < 3 {
            return Err(LikelihoodError::InvalidParams(
                "quadrature needs at least 3 nodes".to_string(),
            ));
        }

        let quad = build_quadrature(params.sigma, params.n_quadrature)?;
        let n_bins = params.n_lambda_bins;
        let ln_lambda_min = params.lambda_min.ln();
        let ln_step = (params.lambda_max.ln() - ln_lambda_min) / (n_bins - 1) as f64;
        let n_counts = params.max_count as usize + 1;

        let mut values = vec![0f64; n_counts * n_bins];
        let mut d1 = vec![0f64; n_counts * n_bins];
        let mut d2 = vec![0f64; n_counts * n_bins];

        // Rows are independent, so the parallel fill is bit-identical to a
        // sequential one.
        values
            .par_chunks_mut(n_bins)
            .zip(d1.par_chunks_mut(n_bins))
            .zip(d2.par_chunks_mut(n_bins))
            .enumerate()
            .for_each(|(k, ((v_row, d1_row), d2_row))| {
                let ln_k_fact = ln_factorial(k as u64);
                let mut scratch = vec![0f64; quad.eps.len()];
                for j in 0..n_bins {
                    let lambda = (ln_lambda_min + j as f64 * ln_step).exp();
                    let term = marginal_term(k as f64, lambda, ln_k_fact, &quad, &mut scratch);
                    v_row[j] = term.value;
                    d1_row[j] = term.d1;
                    d2_row[j] = term.d2;
                }
            });

        Ok(Self {
            sigma: params.sigma,
            max_count: params.max_count,
            n_bins,
            lambda_min: params.lambda_min,
            lambda_max: params.lambda_max,
            ln_lambda_min,
            ln_step,
            values,
            d1,
            d2,
        })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn max_count(&self) -> u32 {
        self.max_count
    }

    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    pub fn lambda_range(&self) -> (f64, f64) {
        (self.lambda_min, self.lambda_max)
    }

    pub fn node(&self, j: usize) -> f64 {
        (self.ln_lambda_min + j as f64 * self.ln_step).exp()
    }

    #[inline]
    pub fn to_count(&self, count: f64) -> u32 {
        if !(count > 0.0) {
            return 0;
        }
        count.round() as u32
    }

    #[inline]
    fn in_grid(&self, count: u32, lambda: f64) -> bool {
        count <= self.max_count && lambda <= self.lambda_max
    }

    #[inline]
    fn locate(&self, lambda: f64) -> (usize, f64) {
        if !(lambda > self.lambda_min) {
            return (0, 0.0);
        }
        if lambda >= self.lambda_max {
            return (self.n_bins - 2, 1.0);
        }
        let pos = (lambda.ln() - self.ln_lambda_min) / self.ln_step;
        let j = (pos.floor() as usize).min(self.n_bins - 2);
        let t = (pos - j as f64).clamp(0.0, 1.0);
        (j, t)
    }

    #[inline]
    pub fn log_prob(&self, count: u32, lambda: f64) -> f64 {
        if !self.in_grid(count, lambda) {
            return laplace_term(count, lambda, self.sigma).value;
        }
        let k = count as usize;
        let (j, t) = self.locate(lambda);
        let base = k * self.n_bins + j;
        lerp(self.values[base], self.values[base + 1], t)
    }

    #[inline]
    pub fn term(&self, count: u32, lambda: f64) -> LogLikTerm {
        if !self.in_grid(count, lambda) {
            return laplace_term(count, lambda, self.sigma);
        }
        let k = count as usize;
        let (j, t) = self.locate(lambda);
        let base = k * self.n_bins + j;
        LogLikTerm {
            value: lerp(self.values[base], self.values[base + 1], t),
            d1: lerp(self.d1[base], self.d1[base + 1], t),
            d2: lerp(self.d2[base], self.d2[base + 1], t),
        }
    }

    pub fn node_term(&self, count: u32, j: usize) -> LogLikTerm {
        let base = count.min(self.max_count) as usize * self.n_bins + j;
        LogLikTerm {
            value: self.values[base],
            d1: self.d1[base],
            d2: self.d2[base],
        }
    }
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn build_quadrature(sigma: f64, n: usize) -> Result<Quadrature, LikelihoodError> {
    let normal =
        Normal::new(0.0, sigma).map_err(|e| LikelihoodError::InvalidParams(e.to_string()))?;
    let half_width = 6.0 * sigma;
    let h = 2.0 * half_width / (n - 1) as f64;
    let simpson = n % 2 == 1;

    let mut eps = Vec::with_capacity(n);
    let mut weights = Vec::with_capacity(n);
    for i in 0..n {
        let e = -half_width + i as f64 * h;
        let coef = if i == 0 || i == n - 1 {
            1.0
        } else if simpson {
            if i % 2 == 1 { 4.0 } else { 2.0 }
        } else {
            2.0
        };
        eps.push(e);
        weights.push(coef * normal.pdf(e));
    }
    let total: f64 = weights.iter().sum();
    let log_weight = weights.iter().map(|w| (w / total).ln()).collect();
    let exp_eps = eps.iter().map(|e: &f64| e.exp()).collect();
    Ok(Quadrature {
        eps,
        exp_eps,
        log_weight,
    })
}

// d1 = k/λ - E[e^ε], d2 = Var[e^ε] - k/λ² under the node posterior.
fn marginal_term(
    k: f64,
    lambda: f64,
    ln_k_fact: f64,
    quad: &Quadrature,
    scratch: &mut [f64],
) -> LogLikTerm {
    let ln_lambda = lambda.ln();
    let mut max = f64::NEG_INFINITY;
    for i in 0..quad.eps.len() {
        let mu = lambda * quad.exp_eps[i];
        let a = quad.log_weight[i] + k * (ln_lambda + quad.eps[i]) - mu - ln_k_fact;
        scratch[i] = a;
        if a > max {
            max = a;
        }
    }
    let mut sum = 0f64;
    for a in scratch.iter_mut() {
        *a = (*a - max).exp();
        sum += *a;
    }
    let value = max + sum.ln();

    let mut mean = 0f64;
    for i in 0..quad.eps.len() {
        mean += scratch[i] / sum * quad.exp_eps[i];
    }
    let mut var = 0f64;
    for i in 0..quad.eps.len() {
        let dev = quad.exp_eps[i] - mean;
        var += scratch[i] / sum * dev * dev;
    }

    LogLikTerm {
        value,
        d1: k / lambda - mean,
        d2: var - k / (lambda * lambda),
    }
}

// Laplace approximation around the posterior mode ε̂ of the ε integral.
// With `u = e^ε̂` and `H = λu + 1/σ²`:
// `log P ≈ k(ln λ + ε̂) - λu - ln k! - ε̂²/2σ² - ½ ln(σ²H)`.
fn laplace_term(count: u32, lambda: f64, sigma: f64) -> LogLikTerm {
    let k = count as f64;
    let s2 = sigma * sigma;
    let eps = laplace_mode(k, lambda, s2);
    let u = eps.exp();
    let lu = lambda * u;
    let h = lu + 1.0 / s2;
    let value = k * (lambda.ln() + eps) - lu - ln_factorial(count as u64) - eps * eps / (2.0 * s2)
        - 0.5 * (s2 * lu).ln_1p();
    LogLikTerm {
        value,
        d1: k / lambda - u - u / (2.0 * s2 * h * h),
        d2: u * u / h - k / (lambda * lambda),
    }
}

// Root of k - λe^ε - ε/σ², strictly decreasing in ε. Newton inside a
// bisection bracket.
fn laplace_mode(k: f64, lambda: f64, s2: f64) -> f64 {
    let (mut lo, mut hi) = if k > 0.0 {
        let t = (k / lambda).ln();
        (t.min(0.0), t.max(0.0))
    } else {
        (-lambda * s2, 0.0)
    };
    let mut eps = 0.5 * (lo + hi);
    for _ in 0..100 {
        let u = eps.exp();
        let f = k - lambda * u - eps / s2;
        if f > 0.0 {
            lo = eps;
        } else {
            hi = eps;
        }
        let mut next = eps + f / (lambda * u + 1.0 / s2);
        if !(next > lo && next < hi) {
            next = 0.5 * (lo + hi);
        }
        if (next - eps).abs() <= 1e-12 * (1.0 + eps.abs()) {
            return next;
        }
        eps = next;
    }
    eps
}

#[cfg(test)]
#[path = "../../tests/src_inline/math/likelihood.rs"]
mod tests;
