use super::*;
use crate::simd::scalar;

#[test]
fn test_sum_equiv() {
    let v = [0.1f64, 0.2, 0.3, 0.4, 0.5, 0.6, 1.1];
    assert_eq!(sum_f64(&v).to_bits(), scalar::sum_f64(&v).to_bits());
}

#[test]
fn test_dot_equiv() {
    let a = [0.1f64, 2.0, 0.3, -4.0, 0.7];
    let b = [3.0f64, 0.5, 0.25, 1.0, 9.0];
    assert_eq!(dot_f64(&a, &b).to_bits(), scalar::dot_f64(&a, &b).to_bits());
}

#[test]
fn test_max_equiv() {
    let v = [0.1f64, 2.0, 0.3, -4.0];
    assert_eq!(max_f64(&v), scalar::max_f64(&v));
}
