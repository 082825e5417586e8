// Euclidean projection onto `{w >= 0, sum(w) = total}` (sort-based).
pub fn project_simplex(w: &mut [f64], total: f64) {
    if w.is_empty() {
        return;
    }
    let mut sorted = w.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let mut cumulative = 0f64;
    let mut theta = 0f64;
    for (j, &u) in sorted.iter().enumerate() {
        cumulative += u;
        let candidate = (cumulative - total) / (j + 1) as f64;
        if u - candidate > 0.0 {
            theta = candidate;
        }
    }
    for v in w.iter_mut() {
        *v = (*v - theta).max(0.0);
    }
}

pub fn project_capped_simplex(w: &mut [f64], cap: f64) {
    let clamped_sum: f64 = w.iter().map(|v| v.max(0.0)).sum();
    if clamped_sum <= cap {
        for v in w.iter_mut() {
            *v = v.max(0.0);
        }
    } else {
        project_simplex(w, cap);
    }
}

#[inline]
pub fn project_weights(w: &mut [f64], constrain: bool) {
    if constrain {
        project_simplex(w, 1.0);
    } else {
        project_capped_simplex(w, 1.0);
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/math/simplex.rs"]
mod tests;
