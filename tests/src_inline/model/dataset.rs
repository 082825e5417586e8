use super::*;

fn genes(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("G{i}")).collect()
}

fn barcodes(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("px{i}")).collect()
}

fn coords(n: usize) -> Vec<Coord> {
    (0..n)
        .map(|i| Coord {
            x: i as f64,
            y: 2.0 * i as f64,
        })
        .collect()
}

#[test]
fn test_from_columns_merges_and_sorts() {
    let counts = SparseCounts::from_columns(
        4,
        vec![vec![(3, 1.0), (0, 2.0), (3, 4.0), (1, 0.0)], vec![]],
    );
    assert_eq!(counts.n_pixels(), 2);
    assert_eq!(counts.nnz(), 2);
    let (rows, values) = counts.column(0);
    assert_eq!(rows, &[0, 3]);
    assert_eq!(values, &[2.0, 5.0]);
    assert_eq!(counts.get(3, 0), 5.0);
    assert_eq!(counts.get(2, 0), 0.0);
    assert_eq!(counts.column_sum(1), 0.0);
}

#[test]
fn test_raw_dataset_umi_is_column_sum() {
    let counts = SparseCounts::from_columns(3, vec![vec![(0, 3.0), (2, 7.0)], vec![(1, 1.0)]]);
    let ds = SpatialDataset::from_counts(genes(3), barcodes(2), counts, coords(2)).unwrap();
    assert_eq!(ds.n_umi(), &[10.0, 1.0]);
    assert!(ds.check_umi_invariant().is_ok());
    assert_eq!(ds.pixel_position("px1"), Some(1));
    assert_eq!(ds.gene_position("G2"), Some(2));
    assert!(ds.cell_labels().is_none());
}

#[test]
fn test_malformed_datasets_rejected() {
    let counts = SparseCounts::from_columns(2, vec![vec![(0, 1.0)]]);
    // coordinate count mismatch
    assert!(SpatialDataset::from_counts(genes(2), barcodes(1), counts.clone(), coords(2)).is_err());
    // duplicate gene names
    let dup = vec!["A".to_string(), "A".to_string()];
    assert!(SpatialDataset::from_counts(dup, barcodes(1), counts.clone(), coords(1)).is_err());

    let negative = SparseCounts::from_columns(2, vec![vec![(1, -2.0)]]);
    let err = SpatialDataset::from_counts(genes(2), barcodes(1), negative, coords(1)).unwrap_err();
    assert!(matches!(err, DatasetError::InvalidCount { gene: 1, pixel: 0, .. }));

    let out_of_range = SparseCounts::from_columns(2, vec![vec![(5, 1.0)]]);
    assert!(SpatialDataset::from_counts(genes(2), barcodes(1), out_of_range, coords(1)).is_err());
}

#[test]
fn test_derived_dataset_keeps_explicit_umi() {
    let counts = SparseCounts::from_columns(2, vec![vec![(0, 1.5)], vec![(1, 0.5)]]);
    let ds = SpatialDataset::derived(
        genes(2),
        vec!["a_1".to_string(), "a_2".to_string()],
        counts,
        coords(2),
        vec![60.0, 40.0],
        vec!["T1".to_string(), "T2".to_string()],
    )
    .unwrap();
    assert_eq!(ds.n_umi(), &[60.0, 40.0]);
    assert_eq!(ds.cell_labels().unwrap()[1], "T2");
    assert!(matches!(
        ds.check_umi_invariant(),
        Err(DatasetError::UmiMismatch { .. })
    ));
}
