use super::*;

fn small_params() -> LikelihoodParams {
    LikelihoodParams {
        sigma: 0.5,
        max_count: 60,
        n_lambda_bins: 200,
        lambda_min: 1e-3,
        lambda_max: 500.0,
        n_quadrature: 61,
    }
}

fn ln_poisson(k: u32, lambda: f64) -> f64 {
    k as f64 * lambda.ln() - lambda - ln_factorial(k as u64)
}

#[test]
fn test_rebuild_is_bit_identical() {
    let a = LikelihoodCache::build(&small_params()).unwrap();
    let b = LikelihoodCache::build(&small_params()).unwrap();
    assert_eq!(a.values.len(), b.values.len());
    for (x, y) in a.values.iter().zip(&b.values) {
        assert_eq!(x.to_bits(), y.to_bits());
    }
    for (x, y) in a.d2.iter().zip(&b.d2) {
        assert_eq!(x.to_bits(), y.to_bits());
    }
}

#[test]
fn test_invalid_params_rejected() {
    let mut p = small_params();
    p.sigma = 0.0;
    assert!(LikelihoodCache::build(&p).is_err());

    let mut p = small_params();
    p.lambda_max = p.lambda_min;
    assert!(LikelihoodCache::build(&p).is_err());

    let mut p = small_params();
    p.n_lambda_bins = 1;
    assert!(LikelihoodCache::build(&p).is_err());
}

#[test]
fn test_small_sigma_matches_poisson() {
    let mut p = small_params();
    p.sigma = 0.01;
    let cache = LikelihoodCache::build(&p).unwrap();
    for &(k, lambda) in &[(0u32, 0.5f64), (3, 2.0), (10, 12.0)] {
        let got = cache.log_prob(k, lambda);
        let want = ln_poisson(k, lambda);
        assert!((got - want).abs() < 2e-2, "k={k} lambda={lambda}: {got} vs {want}");
    }
}

#[test]
fn test_probabilities_sum_to_one() {
    let cache = LikelihoodCache::build(&small_params()).unwrap();
    let total: f64 = (0..=cache.max_count())
        .map(|k| cache.log_prob(k, 2.0).exp())
        .sum();
    assert!((total - 1.0).abs() < 1e-2, "total = {total}");
}

#[test]
fn test_first_derivative_matches_finite_difference() {
    let cache = LikelihoodCache::build(&small_params()).unwrap();
    let k = 5u32;
    for j in [60usize, 100, 140] {
        let lo = cache.node_term(k, j - 1);
        let hi = cache.node_term(k, j + 1);
        let numeric = (hi.value - lo.value) / (cache.node(j + 1) - cache.node(j - 1));
        let analytic = cache.node_term(k, j).d1;
        assert!(
            (numeric - analytic).abs() < 2e-2 * analytic.abs().max(1.0),
            "j={j}: {numeric} vs {analytic}"
        );
    }
}

#[test]
fn test_lookup_at_node_is_exact() {
    let cache = LikelihoodCache::build(&small_params()).unwrap();
    let j = 77;
    let lambda = cache.node(j);
    let term = cache.term(4, lambda);
    let node = cache.node_term(4, j);
    assert!((term.value - node.value).abs() < 1e-9);
    assert!((term.d1 - node.d1).abs() < 1e-6);
}

#[test]
fn test_count_rounding_and_low_lambda_clip() {
    let cache = LikelihoodCache::build(&small_params()).unwrap();
    assert_eq!(cache.to_count(-1.0), 0);
    assert_eq!(cache.to_count(f64::NAN), 0);
    assert_eq!(cache.to_count(2.6), 3);
    assert_eq!(cache.to_count(1e6), 1_000_000);

    let (lo, _) = cache.lambda_range();
    assert_eq!(cache.log_prob(2, 0.0), cache.log_prob(2, lo));
}

fn wide_params() -> LikelihoodParams {
    LikelihoodParams {
        sigma: 0.5,
        max_count: 200,
        n_lambda_bins: 400,
        lambda_min: 1e-3,
        lambda_max: 2000.0,
        n_quadrature: 121,
    }
}

#[test]
fn test_out_of_grid_terms_match_wider_table() {
    let small = LikelihoodCache::build(&LikelihoodParams {
        lambda_max: 100.0,
        ..small_params()
    })
    .unwrap();
    let wide = LikelihoodCache::build(&wide_params()).unwrap();
    // count above the small grid, rate above it, and both
    for &(k, lambda) in &[(120u32, 90.0f64), (30, 150.0), (150, 160.0), (40, 120.0)] {
        let got = small.log_prob(k, lambda);
        let want = wide.log_prob(k, lambda);
        assert!((got - want).abs() < 1e-2, "k={k} lambda={lambda}: {got} vs {want}");
    }
}

#[test]
fn test_out_of_grid_terms_keep_their_shape() {
    let cache = LikelihoodCache::build(&small_params()).unwrap();
    let k = 1600u32;
    // the likelihood still peaks near the observed count
    let at = cache.log_prob(k, 1600.0);
    assert!(at > cache.log_prob(k, 1000.0));
    assert!(at > cache.log_prob(k, 2500.0));
    assert!(cache.log_prob(k, 1000.0) != cache.log_prob(k, 1200.0));

    for &lambda in &[800.0f64, 1600.0, 2400.0] {
        let h = 1e-3 * lambda;
        let numeric = (cache.log_prob(k, lambda + h) - cache.log_prob(k, lambda - h)) / (2.0 * h);
        let term = cache.term(k, lambda);
        assert!(
            (numeric - term.d1).abs() < 1e-4 + 1e-3 * term.d1.abs(),
            "lambda={lambda}: {numeric} vs {}",
            term.d1
        );
        assert!(term.d2 < 0.0);
    }
}
