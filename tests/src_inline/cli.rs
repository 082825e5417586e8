use super::*;

fn parse(extra: &[&str]) -> RunArgs {
    let mut argv = vec![
        "kira-spotdecon",
        "run",
        "--input",
        "data",
        "--reference",
        "ref.tsv",
        "--out",
        "out",
    ];
    argv.extend_from_slice(extra);
    match Cli::try_parse_from(argv).unwrap().command {
        Commands::Run(args) => args,
    }
}

#[test]
fn test_run_defaults() {
    let args = parse(&[]);
    assert_eq!(args.input, PathBuf::from("data"));
    assert!(args.mode.is_none());
    assert!(!args.no_decompose);
    let run = args.run_config().unwrap();
    assert_eq!(run.config, DecompConfig::default_v1());
    assert!(run.decompose);
    assert!(run.platform_effects_path.is_none());
}

#[test]
fn test_flags_override_defaults() {
    let args = parse(&[
        "--mode",
        "full",
        "--sigma",
        "0.6",
        "--umi-min",
        "20",
        "--threads",
        "2",
        "--no-decompose",
    ]);
    let run = args.run_config().unwrap();
    assert_eq!(run.config.mode, FitMode::Full);
    assert_eq!(run.config.likelihood.sigma, 0.6);
    assert_eq!(run.config.classify.umi_min, 20.0);
    assert_eq!(run.config.fit.threads, 2);
    assert!(!run.decompose);
}

#[test]
fn test_invalid_override_rejected() {
    let args = parse(&["--umi-min", "50", "--umi-max", "10"]);
    assert!(matches!(args.run_config(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_missing_reference_is_parse_error() {
    let result = Cli::try_parse_from(["kira-spotdecon", "run", "--input", "d", "--out", "o"]);
    assert!(result.is_err());
}

#[test]
fn test_unknown_mode_is_parse_error() {
    let result = Cli::try_parse_from([
        "kira-spotdecon",
        "run",
        "--input",
        "d",
        "--reference",
        "r",
        "--out",
        "o",
        "--mode",
        "triplet",
    ]);
    assert!(result.is_err());
}
