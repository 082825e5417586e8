use super::*;

#[test]
fn test_backend_name() {
    let name = backend_name();
    #[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
    assert_eq!(name, "avx2");
    #[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
    assert_eq!(name, "neon");
    #[cfg(not(any(
        all(target_arch = "x86_64", target_feature = "avx2"),
        all(target_arch = "aarch64", target_feature = "neon"),
    )))]
    assert_eq!(name, "scalar");
}

#[test]
fn test_sum_determinism() {
    let values = [0.1f64, 0.2, 0.3, 0.4, 0.5, 0.6];
    let a = sum_f64(&values);
    let b = sum_f64(&values);
    assert!(a.to_bits() == b.to_bits());
}

#[test]
fn test_backend_equiv_scalar() {
    let a = [0.1f64, 0.2, 0.3, 0.4, 0.5, 0.6, 1.5];
    let b = [1.0f64, 3.0, 0.25, 7.0, 0.5, 2.0, 0.1];
    assert_eq!(sum_f64(&a).to_bits(), scalar::sum_f64(&a).to_bits());
    assert_eq!(dot_f64(&a, &b).to_bits(), scalar::dot_f64(&a, &b).to_bits());
    assert_eq!(max_f64(&a), scalar::max_f64(&a));
}
