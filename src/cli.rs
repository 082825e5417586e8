use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::model::config::{ConfigError, DecompConfig, FitMode};
use crate::pipeline::RunConfig;

#[derive(Debug, Parser)]
#[command(
    name = "kira-spotdecon",
    version,
    about = "Cell-type decomposition of spatial transcriptomics pixels"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[arg(long, help = "Spatial input directory (10x MTX plus coords.tsv)")]
    pub input: PathBuf,

    #[arg(long, help = "Reference profile TSV (gene x cell type mean rates)")]
    pub reference: PathBuf,

    #[arg(long)]
    pub out: PathBuf,

    #[arg(long, help = "Per-gene platform effect TSV")]
    pub platform_effects: Option<PathBuf>,

    #[arg(long, help = "Restrict fitting to the genes listed one per line")]
    pub genes: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    #[arg(long, help = "JSON config overlay")]
    pub config: Option<PathBuf>,

    #[arg(long, default_value_t = false, help = "Skip the derived single-type dataset")]
    pub no_decompose: bool,

    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,

    #[arg(long)]
    pub sigma: Option<f64>,

    #[arg(long)]
    pub umi_min: Option<f64>,

    #[arg(long)]
    pub umi_max: Option<f64>,

    #[arg(long, help = "Number of threads (0 = auto)")]
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Full,
    Doublet,
}

impl From<ModeArg> for FitMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Full => FitMode::Full,
            ModeArg::Doublet => FitMode::Doublet,
        }
    }
}

impl RunArgs {
    // Defaults, then the JSON overlay, then flags.
    pub fn decomp_config(&self) -> Result<DecompConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => DecompConfig::from_json_file(path)?,
            None => DecompConfig::default_v1(),
        };
        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }
        if let Some(sigma) = self.sigma {
            config.likelihood.sigma = sigma;
        }
        if let Some(umi_min) = self.umi_min {
            config.classify.umi_min = umi_min;
        }
        if let Some(umi_max) = self.umi_max {
            config.classify.umi_max = umi_max;
        }
        if let Some(threads) = self.threads {
            config.fit.threads = threads;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn run_config(&self) -> Result<RunConfig, ConfigError> {
        Ok(RunConfig {
            input_dir: self.input.clone(),
            reference_path: self.reference.clone(),
            platform_effects_path: self.platform_effects.clone(),
            genes_path: self.genes.clone(),
            out_dir: self.out.clone(),
            config: self.decomp_config()?,
            decompose: !self.no_decompose,
        })
    }
}

#[cfg(test)]
#[path = "../tests/src_inline/cli.rs"]
mod tests;
