//! Windowed cross-correlation diagrams.
//!
//! A correlation diagram holds one row per time-scale and one column per
//! window position. Row `l` correlates windows of `(l+1)·L` samples centred on
//! positions advancing by `L` samples, so coarser time-scales average over
//! longer stretches of the two sequences.
//!
//! With a shift `τ` the zero-lag coefficient is replaced by the average of the
//! `+τ` and `-τ` lagged coefficients, which suppresses spurious zero-lag
//! correlation caused by a common source leaking into both sequences.

use crate::error::{Error, Result};
use crate::grid::{CorrelationDiagram, Grid, PValueDiagram};
use crate::helpers::{contains_nan, mean};
use crate::special::f_distribution_survival;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Pearson correlation
// ============================================================================

/// Pearson correlation coefficient of two slices.
///
/// Each slice is centred on its own mean and scaled by its own norm; the
/// cross product runs over the first `min(a.len(), b.len())` samples.
///
/// Both slices must have nonzero variance: a constant slice gives a
/// non-finite result.
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> f64 {
    let mean_a = mean(a);
    let mean_b = mean(b);

    let norm_a = a.iter().map(|&x| (x - mean_a) * (x - mean_a)).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|&x| (x - mean_b) * (x - mean_b)).sum::<f64>().sqrt();

    let cross: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x - mean_a) * (y - mean_b))
        .sum();

    cross / (norm_a * norm_b)
}

// ============================================================================
// Diagram layout
// ============================================================================

/// Shape shared by every diagram of one experiment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiagramLayout {
    sequence_len: usize,
    base_width: usize,
    num_scales: usize,
    shift: Option<usize>,
    centers: Vec<usize>,
}

impl DiagramLayout {
    /// Enumerate the window centres for sequences of `sequence_len` samples.
    ///
    /// # Arguments
    /// * `sequence_len` - Number of samples per sequence (N)
    /// * `base_width` - Smallest window width and centre stride (L), even and >= 4
    /// * `num_scales` - Number of time-scales (W)
    /// * `shift` - Optional lag τ of the shift-symmetrised coefficient
    ///
    /// Centres run `W·L/2 - 1, W·L/2 - 1 + L, ...` while
    /// `k < N - W·L/2 - τ`, so even the widest window stays inside the
    /// sequence.
    ///
    /// # Errors
    /// [`Error::InvalidConfig`] for an unusable width or scale count, or when
    /// not a single window position fits.
    pub fn new(
        sequence_len: usize,
        base_width: usize,
        num_scales: usize,
        shift: Option<usize>,
    ) -> Result<Self> {
        if base_width < 4 || base_width % 2 != 0 {
            return Err(Error::InvalidConfig(format!(
                "window base width must be even and at least 4, got {base_width}"
            )));
        }
        if num_scales == 0 {
            return Err(Error::InvalidConfig(
                "number of time-scales must be at least 1".to_string(),
            ));
        }

        let tau = shift.unwrap_or(0);
        let reach = num_scales
            .checked_mul(base_width)
            .map(|span| span / 2)
            .and_then(|half| half.checked_add(tau).map(|reach| (half, reach)));
        let Some((half, reach)) = reach else {
            return Err(Error::InvalidConfig(format!(
                "{num_scales} windows of base width {base_width} with shift {tau} overflow"
            )));
        };
        let end = sequence_len.checked_sub(reach).unwrap_or(0);
        let centers: Vec<usize> = (half - 1..end).step_by(base_width).collect();

        if centers.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "{num_scales} windows of base width {base_width} (shift {tau}) do not fit \
                 in sequences of {sequence_len} samples"
            )));
        }

        Ok(Self {
            sequence_len,
            base_width,
            num_scales,
            shift,
            centers,
        })
    }

    /// Number of samples per sequence.
    pub fn sequence_len(&self) -> usize {
        self.sequence_len
    }

    /// Base window width L.
    pub fn base_width(&self) -> usize {
        self.base_width
    }

    /// Number of time-scales W (diagram rows).
    pub fn num_scales(&self) -> usize {
        self.num_scales
    }

    /// Shift τ, if any.
    pub fn shift(&self) -> Option<usize> {
        self.shift
    }

    /// Window centres (diagram columns).
    pub fn centers(&self) -> &[usize] {
        &self.centers
    }

    /// Number of window positions.
    pub fn num_positions(&self) -> usize {
        self.centers.len()
    }

    /// Diagram shape `(W, positions)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.num_scales, self.centers.len())
    }

    /// Window width in samples of time-scale `scale`.
    pub fn window_width(&self, scale: usize) -> usize {
        (scale + 1) * self.base_width
    }

    fn effective_shift(&self) -> usize {
        self.shift.filter(|&t| t > 0).unwrap_or(0)
    }

    pub(crate) fn check_lengths(&self, a: &[f64], b: &[f64]) -> Result<()> {
        if a.len() != self.sequence_len || b.len() != self.sequence_len {
            return Err(Error::DimensionMismatch(format!(
                "layout expects sequences of {} samples, got {} and {}",
                self.sequence_len,
                a.len(),
                b.len()
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Diagrams
// ============================================================================

/// Correlation diagram and its analytic (Fisher F-test) p-value diagram.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CorrelationDiagrams {
    pub correlation: CorrelationDiagram,
    pub fisher_pvalue: PValueDiagram,
}

/// Correlation coefficient of the windows of width `ws` centred on `k`.
#[inline]
fn window_correlation(a: &[f64], b: &[f64], k: usize, ws: usize, tau: usize) -> f64 {
    let lo = k + 1 - ws / 2;
    let hi = k + ws / 2;
    if tau == 0 {
        pearson_correlation(&a[lo..=hi], &b[lo..=hi])
    } else {
        0.5 * pearson_correlation(&a[lo + tau..=hi + tau], &b[lo..=hi])
            + 0.5 * pearson_correlation(&a[lo..=hi], &b[lo + tau..=hi + tau])
    }
}

/// Two-sided F-test p-value of a correlation `r` estimated from `n` samples.
///
/// `F = n / (1/r² - 1)` with `(1, n - 2)` degrees of freedom.
fn fisher_pvalue(r: f64, n: f64) -> Result<f64> {
    let r2 = r * r;
    // |r| may round to just above 1 for perfectly coupled windows
    if r2 >= 1.0 {
        return Ok(0.0);
    }
    f_distribution_survival(n * r2 / (1.0 - r2), 1.0, n - 2.0)
}

/// Build the correlation diagram of `a` and `b` and its F-test p-values.
///
/// If either sequence holds NaN both diagrams are NaN-filled.
///
/// # Errors
/// [`Error::DimensionMismatch`] if a sequence length differs from the layout.
pub fn build_diagram(a: &[f64], b: &[f64], layout: &DiagramLayout) -> Result<CorrelationDiagrams> {
    layout.check_lengths(a, b)?;
    let (nrows, ncols) = layout.shape();

    if contains_nan(a) || contains_nan(b) {
        return Ok(CorrelationDiagrams {
            correlation: Grid::nan(nrows, ncols),
            fisher_pvalue: Grid::nan(nrows, ncols),
        });
    }

    let tau = layout.effective_shift();
    let mut correlation = Grid::zeros(nrows, ncols);
    let mut fisher = Grid::zeros(nrows, ncols);

    for l in 0..nrows {
        let ws = layout.window_width(l);
        for (j, &k) in layout.centers().iter().enumerate() {
            let r = window_correlation(a, b, k, ws, tau);
            correlation[(l, j)] = r;
            fisher[(l, j)] = fisher_pvalue(r, ws as f64)?;
        }
    }

    Ok(CorrelationDiagrams {
        correlation,
        fisher_pvalue: fisher,
    })
}

/// Correlation diagram only, without the F-test.
///
/// Used on surrogate pairs, which are NaN-free and of layout length.
///
/// # Panics
/// Panics if a sequence is shorter than the layout's sequence length.
pub fn correlation_diagram(a: &[f64], b: &[f64], layout: &DiagramLayout) -> CorrelationDiagram {
    let (nrows, ncols) = layout.shape();
    let tau = layout.effective_shift();
    let mut correlation = Grid::zeros(nrows, ncols);
    for l in 0..nrows {
        let ws = layout.window_width(l);
        for (j, &k) in layout.centers().iter().enumerate() {
            correlation[(l, j)] = window_correlation(a, b, k, ws, tau);
        }
    }
    correlation
}

// ============================================================================
// Whole-sequence correlation
// ============================================================================

/// Correlation between two whole sequences.
///
/// With a shift τ > 0 this is the average of `corr(A[τ..], B[..N-τ])` and
/// `corr(A[..N-τ], B[τ..])`. A shift at least as long as the sequences gives
/// NaN.
pub fn whole_sequence_correlation(a: &[f64], b: &[f64], shift: Option<usize>) -> f64 {
    let n = a.len().min(b.len());
    match shift.filter(|&t| t > 0) {
        None => pearson_correlation(&a[..n], &b[..n]),
        Some(tau) if tau >= n => f64::NAN,
        Some(tau) => {
            0.5 * pearson_correlation(&a[tau..n], &b[..n - tau])
                + 0.5 * pearson_correlation(&a[..n - tau], &b[tau..n])
        }
    }
}

/// F-test p-value of a whole-sequence correlation.
///
/// The effective sample count is `N - τ`.
///
/// # Errors
/// [`Error::Domain`] if fewer than three effective samples remain.
pub fn whole_sequence_fisher_pvalue(r: f64, sequence_len: usize, shift: Option<usize>) -> Result<f64> {
    let n_eff = sequence_len.saturating_sub(shift.unwrap_or(0));
    fisher_pvalue(r, n_eff as f64)
}

/// All-pairs whole-sequence correlation matrix.
///
/// The diagonal is 1 for valid nodes and NaN for invalid ones; any entry
/// involving an invalid node is NaN.
///
/// # Errors
/// [`Error::DimensionMismatch`] if `validity` does not hold one flag per
/// sequence.
pub fn whole_sequence_matrix(
    sequences: &[Vec<f64>],
    validity: &[bool],
    shift: Option<usize>,
) -> Result<Grid> {
    let n = sequences.len();
    if validity.len() != n {
        return Err(Error::DimensionMismatch(format!(
            "{n} sequences but {} validity flags",
            validity.len()
        )));
    }
    let mut matrix = Grid::zeros(n, n);
    for i in 0..n {
        matrix[(i, i)] = if validity[i] { 1.0 } else { f64::NAN };
        for j in (i + 1)..n {
            let r = if validity[i] && validity[j] {
                whole_sequence_correlation(&sequences[i], &sequences[j], shift)
            } else {
                f64::NAN
            };
            matrix[(i, j)] = r;
            matrix[(j, i)] = r;
        }
    }
    Ok(matrix)
}
