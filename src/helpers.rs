//! Shared constants and small slice statistics.

/// Small epsilon for numerical comparisons (e.g., avoiding division by zero).
pub const NUMERICAL_EPS: f64 = 1e-10;

/// Default convergence tolerance of the IAAFT refinement loop.
pub const DEFAULT_CONVERGENCE_TOL: f64 = 1e-6;

/// Default cap on IAAFT refinement rounds.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Whether a sequence holds at least one NaN sample.
///
/// A single NaN marks the whole node invalid.
#[inline]
pub fn contains_nan(values: &[f64]) -> bool {
    values.iter().any(|v| v.is_nan())
}

/// Arithmetic mean of a slice (NaN for an empty slice).
#[inline]
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sort a copy of `values` ascending.
///
/// NaN-free input is assumed; `total_cmp` keeps the order well defined anyway.
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}
