use super::*;

fn three_gene_profiles() -> ReferenceProfiles {
    let types = CellTypeSet::new(vec!["A".to_string(), "B".to_string()]).unwrap();
    ReferenceProfiles::new(
        vec!["G1".to_string(), "G2".to_string(), "G3".to_string()],
        types,
        vec![
            2.0, 1.0, //
            2.0, 1.0, //
            4.0, 2.0,
        ],
    )
    .unwrap()
}

#[test]
fn test_renormalized_columns_sum_to_one() {
    let renorm = three_gene_profiles().renormalized();
    let mut totals = [0f64; 2];
    for g in 0..renorm.n_genes() {
        for (t, total) in totals.iter_mut().enumerate() {
            *total += renorm.row(g)[t];
        }
    }
    assert!((totals[0] - 1.0).abs() < 1e-12);
    assert!((totals[1] - 1.0).abs() < 1e-12);
    assert!((renorm.rate(2, CellTypeId(0)) - 0.5).abs() < 1e-12);
}

#[test]
fn test_platform_effect_applied_before_renormalization() {
    let profiles = three_gene_profiles()
        .with_platform_effects(&[("G3".to_string(), 0.5), ("UNKNOWN".to_string(), 3.0)])
        .unwrap();
    assert_eq!(profiles.platform_effect(), &[1.0, 1.0, 0.5]);
    let renorm = profiles.renormalized();
    // column A: 2, 2, 2 after the effect
    for g in 0..3 {
        assert!((renorm.rate(g, CellTypeId(0)) - 1.0 / 3.0).abs() < 1e-12);
    }
    assert!(renorm.platform_effect().iter().all(|&e| e == 1.0));
}

#[test]
fn test_invalid_platform_effect_rejected() {
    let err = three_gene_profiles().with_platform_effects(&[("G1".to_string(), 0.0)]);
    assert!(err.is_err());
}

#[test]
fn test_invalid_reference_rejected() {
    let types = || CellTypeSet::new(vec!["A".to_string(), "B".to_string()]).unwrap();
    let genes = || vec!["G1".to_string(), "G2".to_string()];
    assert!(ReferenceProfiles::new(genes(), types(), vec![1.0, 1.0, 1.0]).is_err());
    assert!(ReferenceProfiles::new(genes(), types(), vec![1.0, -1.0, 1.0, 1.0]).is_err());
    assert!(ReferenceProfiles::new(genes(), types(), vec![1.0, 0.0, 1.0, 0.0]).is_err());
}

#[test]
fn test_restrict_follows_gene_list_order() {
    let profiles = three_gene_profiles();
    let list = GeneList::new(vec!["G3".to_string(), "G1".to_string()]).unwrap();
    let matrix = profiles.restrict(&list).unwrap();
    assert_eq!(matrix.n_genes(), 2);
    assert_eq!(matrix.n_types(), 2);
    assert_eq!(matrix.row(0), &[4.0, 2.0]);
    assert_eq!(matrix.rate(1, 1), 1.0);

    let missing = GeneList::new(vec!["G9".to_string()]).unwrap();
    assert!(matches!(
        profiles.restrict(&missing),
        Err(DatasetError::MissingGene { .. })
    ));
}
