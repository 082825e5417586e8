use super::*;

#[test]
fn test_quantiles() {
    let v = vec![1.0f64, 2.0, 3.0, 4.0, 5.0];
    assert_eq!(median(&v), 3.0);
    assert_eq!(p90(&v), 5.0);
    assert_eq!(p10(&v), 2.0);
    assert_eq!(median(&[]), 0.0);
}

#[test]
fn test_bool_fraction() {
    assert_eq!(bool_fraction([true, false, true, true]), 0.75);
    assert_eq!(bool_fraction(Vec::<bool>::new()), 0.0);
}
