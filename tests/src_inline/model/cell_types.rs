use super::*;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_canonical_order_and_lookup() {
    let set = CellTypeSet::new(names(&["Bergmann", "Purkinje", "Granule"])).unwrap();
    assert_eq!(set.len(), 3);
    assert_eq!(set.get("Purkinje"), Some(CellTypeId(1)));
    assert_eq!(set.name(CellTypeId(2)), "Granule");
    let ids: Vec<_> = set.ids().collect();
    assert_eq!(ids, vec![CellTypeId(0), CellTypeId(1), CellTypeId(2)]);
    assert!(set.get("Oligo").is_none());
}

#[test]
fn test_duplicate_names_rejected() {
    assert!(CellTypeSet::new(names(&["A", "B", "A"])).is_err());
    assert!(CellTypeSet::new(names(&["A", ""])).is_err());
    assert!(CellTypeSet::new(Vec::new()).is_err());
}
