use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::model::cell_types::CellTypeId;
use crate::model::results::PixelFitResult;
use crate::pipeline::fixtures;
use crate::pipeline::stage5_aggregate::aggregate;

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> std::path::PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("kira_spotdecon_report_{}_{}", std::process::id(), id));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn build_table() -> ResultsTable {
    let singlet = PixelFitResult {
        pixel: 0,
        barcode: "c1".to_string(),
        n_umi: 500.0,
        spot_class: SpotClass::Singlet,
        first_type: CellTypeId(1),
        second_type: None,
        first_class: true,
        second_class: false,
        min_score: 12.5,
        singlet_score: 20.0,
        conv_all: true,
        conv_doublet: true,
        all_weights: vec![0.1, 0.8, 0.1],
        doublet_weights: Some([0.9, 0.0]),
    };
    let reject = PixelFitResult {
        pixel: 1,
        barcode: "c2".to_string(),
        n_umi: 4.0,
        spot_class: SpotClass::Reject,
        first_type: CellTypeId(0),
        second_type: None,
        first_class: false,
        second_class: false,
        min_score: 0.0,
        singlet_score: 0.0,
        conv_all: false,
        conv_doublet: false,
        all_weights: vec![0.0; 3],
        doublet_weights: None,
    };
    aggregate(&[singlet, reject], fixtures::reference().cell_types()).unwrap()
}

#[test]
fn test_write_reports_outputs() {
    let dir = make_temp_dir();
    let table = build_table();
    let config = fixtures::config();
    let input = ReportInput {
        table: &table,
        config: &config,
        n_genes_dataset: 40,
        n_genes_fitted: 30,
        derived: None,
        tool_version: "0.0.0-test".to_string(),
    };
    write_reports(&input, &dir).unwrap();

    let results = std::fs::read_to_string(dir.join("results.tsv")).unwrap();
    let lines: Vec<&str> = results.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("barcode\tspot_class\tfirst_type"));
    assert!(lines[1].starts_with("c1\tsinglet\tB\tNA\ttrue\tfalse\t12.500000"));
    assert!(lines[2].starts_with("c2\treject\tNA\tNA"));

    let weights = std::fs::read_to_string(dir.join("weights.tsv")).unwrap();
    assert_eq!(weights.lines().next(), Some("barcode\tA\tB\tC"));
    assert_eq!(weights.lines().nth(1), Some("c1\t0.100000\t0.800000\t0.100000"));

    let doublet = std::fs::read_to_string(dir.join("weights_doublet.tsv")).unwrap();
    assert_eq!(doublet.lines().count(), 2);

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary["tool"]["name"], "kira-spotdecon");
    assert_eq!(summary["input"]["n_pixels"], 2);
    assert_eq!(summary["classes"][0]["name"], "reject");
    assert_eq!(summary["classes"][0]["count"], 1);
    assert_eq!(summary["config"]["mode"], "doublet");

    let report = std::fs::read_to_string(dir.join("report.txt")).unwrap();
    assert!(report.contains("Genes fitted: 30 of 40"));
    assert!(!dir.join("derived").exists());
}

#[test]
fn test_derived_dataset_layout() {
    let dir = make_temp_dir();
    let dataset = fixtures::dataset();
    write_dataset(&dataset, &dir).unwrap();

    let mtx = std::fs::read_to_string(dir.join("matrix.mtx")).unwrap();
    let mut lines = mtx.lines();
    assert_eq!(
        lines.next(),
        Some("%%MatrixMarket matrix coordinate real general")
    );
    assert_eq!(
        lines.next(),
        Some(format!("30 4 {}", dataset.counts().nnz()).as_str())
    );
    let barcodes = std::fs::read_to_string(dir.join("barcodes.tsv")).unwrap();
    assert_eq!(barcodes.lines().count(), 4);
    assert!(!dir.join("cell_labels.tsv").exists());
}
