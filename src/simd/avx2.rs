#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

pub fn sum_f64(values: &[f64]) -> f64 {
    // Lanes are drained in index order to keep the scalar summation order.
    let mut sum = 0f64;
    let mut i = 0usize;
    let n = values.len();
    unsafe {
        while i + 4 <= n {
            let v = _mm256_loadu_pd(values.as_ptr().add(i));
            let mut lanes = [0f64; 4];
            _mm256_storeu_pd(lanes.as_mut_ptr(), v);
            for lane in &lanes {
                sum += *lane;
            }
            i += 4;
        }
    }
    while i < n {
        sum += values[i];
        i += 1;
    }
    sum
}

pub fn dot_f64(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    let mut sum = 0f64;
    let mut i = 0usize;
    unsafe {
        while i + 4 <= n {
            let va = _mm256_loadu_pd(a.as_ptr().add(i));
            let vb = _mm256_loadu_pd(b.as_ptr().add(i));
            let prod = _mm256_mul_pd(va, vb);
            let mut lanes = [0f64; 4];
            _mm256_storeu_pd(lanes.as_mut_ptr(), prod);
            for lane in &lanes {
                sum += *lane;
            }
            i += 4;
        }
    }
    while i < n {
        sum += a[i] * b[i];
        i += 1;
    }
    sum
}

pub fn max_f64(values: &[f64]) -> f64 {
    let mut max = f64::NEG_INFINITY;
    let mut i = 0usize;
    let n = values.len();
    unsafe {
        while i + 4 <= n {
            let v = _mm256_loadu_pd(values.as_ptr().add(i));
            let mut lanes = [0f64; 4];
            _mm256_storeu_pd(lanes.as_mut_ptr(), v);
            for lane in &lanes {
                if *lane > max {
                    max = *lane;
                }
            }
            i += 4;
        }
    }
    while i < n {
        let v = values[i];
        if v > max {
            max = v;
        }
        i += 1;
    }
    if max.is_finite() { max } else { 0.0 }
}

pub fn backend_name() -> &'static str {
    "avx2"
}

#[cfg(test)]
#[path = "../../tests/src_inline/simd/avx2.rs"]
mod tests;
