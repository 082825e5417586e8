use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    Full,
    Doublet,
}

impl FitMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FitMode::Full => "full",
            FitMode::Doublet => "doublet",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LikelihoodParams {
    pub sigma: f64,
    pub max_count: u32,
    pub n_lambda_bins: usize,
    pub lambda_min: f64,
    pub lambda_max: f64,
    pub n_quadrature: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitParams {
    pub max_iter: usize,
    pub min_change: f64,
    // Weights sum to exactly 1 when set, to at most 1 otherwise.
    pub constrain: bool,
    pub candidate_weight_min: f64,
    pub threads: usize,
    pub progress_every: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyThresholds {
    pub umi_min: f64,
    pub umi_max: f64,
    pub doublet_margin: f64,
    pub confidence_margin: f64,
    pub min_doublet_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompConfig {
    pub mode: FitMode,
    pub likelihood: LikelihoodParams,
    pub fit: FitParams,
    pub classify: ClassifyThresholds,
}

impl Default for LikelihoodParams {
    fn default() -> Self {
        Self {
            sigma: 1.0,
            max_count: 100,
            n_lambda_bins: 400,
            lambda_min: 1e-4,
            lambda_max: 1000.0,
            n_quadrature: 121,
        }
    }
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            max_iter: 50,
            min_change: 0.001,
            constrain: true,
            candidate_weight_min: 0.0,
            threads: 0,
            progress_every: 1000,
        }
    }
}

impl Default for ClassifyThresholds {
    fn default() -> Self {
        Self {
            umi_min: 100.0,
            umi_max: 20_000_000.0,
            doublet_margin: 25.0,
            confidence_margin: 10.0,
            min_doublet_weight: 0.25,
        }
    }
}

impl Default for DecompConfig {
    fn default() -> Self {
        Self::default_v1()
    }
}

impl DecompConfig {
    pub fn default_v1() -> Self {
        Self {
            mode: FitMode::Doublet,
            likelihood: LikelihoodParams::default(),
            fit: FitParams::default(),
            classify: ClassifyThresholds::default(),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: DecompConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let lk = &self.likelihood;
        if !(lk.sigma.is_finite() && lk.sigma > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "likelihood.sigma must be positive, got {}",
                lk.sigma
            )));
        }
        if lk.n_lambda_bins < 2 {
            return Err(ConfigError::Invalid(
                "likelihood.n_lambda_bins must be at least 2".to_string(),
            ));
        }
        if !(lk.lambda_min > 0.0 && lk.lambda_max > lk.lambda_min && lk.lambda_max.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "likelihood lambda range [{}, {}] is not a positive increasing range",
                lk.lambda_min, lk.lambda_max
            )));
        }
        if lk.n_quadrature < 3 {
            return Err(ConfigError::Invalid(
                "likelihood.n_quadrature must be at least 3".to_string(),
            ));
        }
        if self.fit.max_iter == 0 {
            return Err(ConfigError::Invalid("fit.max_iter must be positive".to_string()));
        }
        if !(self.fit.min_change > 0.0) {
            return Err(ConfigError::Invalid("fit.min_change must be positive".to_string()));
        }
        if !(0.0..1.0).contains(&self.fit.candidate_weight_min) {
            return Err(ConfigError::Invalid(
                "fit.candidate_weight_min must be in [0, 1)".to_string(),
            ));
        }
        let c = &self.classify;
        if !(c.umi_min >= 0.0 && c.umi_max >= c.umi_min) {
            return Err(ConfigError::Invalid(format!(
                "classify UMI bounds [{}, {}] are not ordered",
                c.umi_min, c.umi_max
            )));
        }
        if c.doublet_margin < 0.0 || c.confidence_margin < 0.0 {
            return Err(ConfigError::Invalid(
                "classify margins must be non-negative".to_string(),
            ));
        }
        if !(0.0..=0.5).contains(&c.min_doublet_weight) {
            return Err(ConfigError::Invalid(
                "classify.min_doublet_weight must be in [0, 0.5]".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/config.rs"]
mod tests;
