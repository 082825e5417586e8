use anyhow::Result;
use clap::Parser;
use tracing::info;

use kira_spotdecon::cli::{Cli, Commands};
use kira_spotdecon::logging::init_logging;
use kira_spotdecon::pipeline::run_pipeline;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            init_logging(args.verbose);
            let run = args.run_config()?;
            let outcome = run_pipeline(&run)?;
            let [reject, singlet, certain, uncertain] = outcome.table.class_counts();
            info!(
                out_dir = %run.out_dir.display(),
                pixels = outcome.table.n_pixels(),
                "run complete"
            );
            println!("kira-spotdecon run ok");
            println!("pixels: {}", outcome.table.n_pixels());
            println!("reject: {reject}");
            println!("singlet: {singlet}");
            println!("doublet_certain: {certain}");
            println!("doublet_uncertain: {uncertain}");
            if let Some(derived) = &outcome.derived {
                println!("derived records: {}", derived.n_pixels());
            }
        }
    }

    Ok(())
}
