#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::*;

pub fn sum_f64(values: &[f64]) -> f64 {
    let mut sum = 0f64;
    let mut i = 0usize;
    let n = values.len();
    unsafe {
        while i + 2 <= n {
            let v = vld1q_f64(values.as_ptr().add(i));
            let mut lanes = [0f64; 2];
            vst1q_f64(lanes.as_mut_ptr(), v);
            for lane in &lanes {
                sum += *lane;
            }
            i += 2;
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
        while i + 2 <= n {
            let va = vld1q_f64(a.as_ptr().add(i));
            let vb = vld1q_f64(b.as_ptr().add(i));
            let prod = vmulq_f64(va, vb);
            let mut lanes = [0f64; 2];
            vst1q_f64(lanes.as_mut_ptr(), prod);
            for lane in &lanes {
                sum += *lane;
            }
            i += 2;
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
        while i + 2 <= n {
            let v = vld1q_f64(values.as_ptr().add(i));
            let mut lanes = [0f64; 2];
            vst1q_f64(lanes.as_mut_ptr(), v);
            for lane in &lanes {
                if *lane > max {
                    max = *lane;
                }
            }
            i += 2;
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
    "neon"
}

#[cfg(test)]
#[path = "../../tests/src_inline/simd/neon.rs"]
mod tests;
