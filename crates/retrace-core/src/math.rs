//! Shared math utilities.

/// Scale non-negative weights in place so they sum to 1.
///
/// All-zero (or non-finite) input becomes uniform weights.
pub fn normalize_weights_in_place(w: &mut [f64]) {
    let total: f64 = w.iter().sum();
    if total.is_finite() && total > f64::EPSILON {
        for x in w.iter_mut() {
            *x /= total;
        }
    } else if !w.is_empty() {
        let uniform = 1.0 / w.len() as f64;
        w.iter_mut().for_each(|x| *x = uniform);
    }
}

/// Normalize a slice of weights, returning a new vector summing to 1.
pub fn normalize_weights(w: &[f64]) -> Vec<f64> {
    let mut result = w.to_vec();
    normalize_weights_in_place(&mut result);
    result
}

/// Mean of `values` under `weights` (renormalized). `None` for empty input.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> Option<f64> {
    if values.is_empty() || values.len() != weights.len() {
        return None;
    }
    let weights = normalize_weights(weights);
    Some(values.iter().zip(weights.iter()).map(|(v, w)| v * w).sum())
}
