use super::*;
use crate::model::cell_types::{CellTypeId, CellTypeSet};
use crate::model::dataset::{Coord, SparseCounts};
use crate::pipeline::fixtures;

#[test]
fn test_default_gene_list_is_shared_in_reference_order() {
    let types = CellTypeSet::new(vec!["A".to_string(), "B".to_string()]).unwrap();
    let reference = ReferenceProfiles::new(
        vec!["Z".to_string(), "Y".to_string(), "X".to_string()],
        types,
        vec![1.0, 2.0, 1.0, 2.0, 2.0, 0.0],
    )
    .unwrap();
    let counts = SparseCounts::from_columns(3, vec![vec![(0, 1.0), (2, 4.0)]]);
    let dataset = SpatialDataset::from_counts(
        vec!["X".to_string(), "W".to_string(), "Z".to_string()],
        vec!["p".to_string()],
        counts,
        vec![Coord { x: 0.0, y: 0.0 }],
    )
    .unwrap();

    let prepared = prepare(&dataset, &reference, None).unwrap();
    assert_eq!(prepared.gene_list.genes(), &["Z".to_string(), "X".to_string()]);
    // column B is 2, 2, 0 before renormalisation
    let b = prepared.profiles.rate(0, CellTypeId(1));
    assert!((b - 0.5).abs() < 1e-12);
}

#[test]
fn test_requested_gene_must_exist_in_both_tables() {
    let dataset = fixtures::dataset();
    let reference = fixtures::reference();

    let ok = GeneList::new(vec!["G05".to_string(), "G15".to_string()]).unwrap();
    let prepared = prepare(&dataset, &reference, Some(ok)).unwrap();
    assert_eq!(prepared.gene_list.len(), 2);

    let missing = GeneList::new(vec!["G05".to_string(), "G99".to_string()]).unwrap();
    assert!(matches!(
        prepare(&dataset, &reference, Some(missing)),
        Err(DatasetError::MissingGene { .. })
    ));
}
