//! Reduction of p-value diagrams to efficiency curves.
//!
//! The efficiency of a time-scale is the fraction of its window positions
//! whose p-value falls below the significance level α. The onset time-scale
//! of a node pair is the narrowest window width whose efficiency exceeds a
//! threshold η.

use crate::grid::PValueDiagram;

/// Number of steps of the α and η sweeps (101 thresholds each).
pub const SWEEP_STEPS: usize = 100;

/// Efficiency curve of a p-value diagram.
///
/// # Arguments
/// * `pdiagram` - P-value diagram, one row per time-scale
/// * `alpha` - Significance level; a cell counts when `p < alpha`
/// * `avoid_overlap` - Test only every `(l+1)`-th position of row `l`, so the
///   windows of that time-scale do not overlap
///
/// # Returns
/// One value per row. A row without columns, or with a NaN among its tested
/// cells, gives NaN.
pub fn compute_efficiency(pdiagram: &PValueDiagram, alpha: f64, avoid_overlap: bool) -> Vec<f64> {
    (0..pdiagram.nrows())
        .map(|l| {
            let stride = if avoid_overlap { l + 1 } else { 1 };
            row_efficiency(pdiagram.row(l), alpha, stride)
        })
        .collect()
}

fn row_efficiency(row: &[f64], alpha: f64, stride: usize) -> f64 {
    if row.is_empty() {
        return f64::NAN;
    }
    let mut tested = 0usize;
    let mut significant = 0usize;
    for &p in row.iter().step_by(stride) {
        if p.is_nan() {
            return f64::NAN;
        }
        tested += 1;
        if p < alpha {
            significant += 1;
        }
    }
    significant as f64 / tested as f64
}

/// Onset width of one efficiency curve.
///
/// Scans time-scales from the narrowest and returns the width of the first
/// one whose efficiency is strictly above `eta`; `-1` if there is none, NaN if
/// the curve holds NaN.
pub fn wmatrix_element(efficiency: &[f64], widths: &[f64], eta: f64) -> f64 {
    if efficiency.iter().any(|e| e.is_nan()) {
        return f64::NAN;
    }
    efficiency
        .iter()
        .zip(widths.iter())
        .find(|&(&e, _)| e > eta)
        .map_or(-1.0, |(_, &w)| w)
}

/// Window widths `(l+1)·L·T` of the `num_scales` time-scales.
///
/// With `sampling_period = 1` the widths are in samples.
pub fn window_widths(base_width: usize, num_scales: usize, sampling_period: f64) -> Vec<f64> {
    (1..=num_scales)
        .map(|l| (l * base_width) as f64 * sampling_period)
        .collect()
}

/// Significance levels of the α sweep: `k/1000` for `k = 0..=100`.
pub fn alpha_sweep_thresholds() -> Vec<f64> {
    (0..=SWEEP_STEPS).map(|k| k as f64 / 1000.0).collect()
}

/// Efficiency thresholds of the η sweep: `k/100` for `k = 0..=100`.
pub fn eta_sweep_thresholds() -> Vec<f64> {
    (0..=SWEEP_STEPS).map(|k| k as f64 / 100.0).collect()
}

/// Efficiency curves of one diagram for every α of [`alpha_sweep_thresholds`].
pub fn efficiency_alpha_sweep(pdiagram: &PValueDiagram, avoid_overlap: bool) -> Vec<Vec<f64>> {
    alpha_sweep_thresholds()
        .into_iter()
        .map(|alpha| compute_efficiency(pdiagram, alpha, avoid_overlap))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    fn sample_diagram() -> Grid {
        Grid::from_rows(&[
            vec![0.001, 0.2, 0.004, 0.5, 0.0, 0.3],
            vec![0.001, 0.002, 0.3, 0.003, 0.6, 0.004],
        ])
        .unwrap()
    }

    #[test]
    fn test_compute_efficiency() {
        let eff = compute_efficiency(&sample_diagram(), 0.01, false);
        assert!((eff[0] - 0.5).abs() < 1e-12);
        assert!((eff[1] - 4.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_is_strict() {
        let d = Grid::from_rows(&[vec![0.01, 0.01]]).unwrap();
        assert_eq!(compute_efficiency(&d, 0.01, false), vec![0.0]);
    }

    #[test]
    fn test_avoid_overlap_stride() {
        // Row 1 tests columns 0, 2, 4 only
        let eff = compute_efficiency(&sample_diagram(), 0.01, true);
        assert!((eff[0] - 0.5).abs() < 1e-12);
        assert!((eff[1] - 1.0 / 3.0).abs() < 1e-12);

        // Stride longer than the row still tests column 0
        let d = Grid::from_rows(&[vec![0.5], vec![0.001], vec![0.2]]).unwrap();
        assert_eq!(compute_efficiency(&d, 0.01, true), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_efficiency_nan() {
        let mut d = sample_diagram();
        d[(1, 1)] = f64::NAN;
        let eff = compute_efficiency(&d, 0.01, false);
        assert!(!eff[0].is_nan());
        assert!(eff[1].is_nan());
        // The NaN column is skipped by the stride
        let eff = compute_efficiency(&d, 0.01, true);
        assert!(!eff[1].is_nan());

        let empty = Grid::zeros(2, 0);
        let eff = compute_efficiency(&empty, 0.01, false);
        assert_eq!(eff.len(), 2);
        assert!(eff.iter().all(|e| e.is_nan()));
    }

    #[test]
    fn test_efficiency_monotone_in_alpha() {
        let curves = efficiency_alpha_sweep(&sample_diagram(), false);
        assert_eq!(curves.len(), 101);
        for pair in curves.windows(2) {
            for (a, b) in pair[0].iter().zip(pair[1].iter()) {
                assert!(a <= b);
            }
        }
    }

    #[test]
    fn test_wmatrix_element() {
        let widths = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(wmatrix_element(&[0.1, 0.3, 0.6, 0.9], &widths, 0.5), 30.0);
        assert_eq!(wmatrix_element(&[0.1, 0.3, 0.5, 0.5], &widths, 0.5), -1.0);
        assert_eq!(wmatrix_element(&[0.9, 0.3, 0.6, 0.9], &widths, 0.5), 10.0);
        assert!(wmatrix_element(&[0.1, f64::NAN, 0.6, 0.9], &widths, 0.5).is_nan());
    }

    #[test]
    fn test_window_widths() {
        assert_eq!(window_widths(20, 3, 1.0), vec![20.0, 40.0, 60.0]);
        assert_eq!(window_widths(4, 2, 0.5), vec![2.0, 4.0]);
    }

    #[test]
    fn test_sweep_thresholds() {
        let alphas = alpha_sweep_thresholds();
        assert_eq!(alphas.len(), 101);
        assert_eq!(alphas[0], 0.0);
        assert!((alphas[100] - 0.1).abs() < 1e-15);
        let etas = eta_sweep_thresholds();
        assert_eq!(etas.len(), 101);
        assert_eq!(etas[100], 1.0);
    }
}
