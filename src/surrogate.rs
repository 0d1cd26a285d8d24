//! IAAFT surrogate generation.
//!
//! An Iterative Amplitude-Adjusted Fourier Transform surrogate is a
//! permutation of the original samples whose Fourier amplitude spectrum
//! closely matches the original. It destroys any coupling with other
//! sequences while keeping the marginal distribution and the linear
//! autocorrelation of the sequence itself.
//!
//! A [`SurrogateTemplate`] holds everything that only depends on the source
//! sequence (sorted sample values, target amplitudes, FFT plans) so many
//! surrogates can be drawn from it concurrently.

use crate::error::{Error, Result};
use crate::helpers::{contains_nan, sorted_copy, DEFAULT_CONVERGENCE_TOL, DEFAULT_MAX_ITERATIONS};
use num_complex::Complex;
use rand::prelude::*;
use rustfft::{Fft, FftPlanner};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Stopping rule of the IAAFT refinement loop.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IaaftOptions {
    /// Maximum number of refinement rounds.
    pub max_iterations: usize,
    /// Relative change `sum((x_new - x_prev)^2) / sum(x_new^2)` at which the
    /// loop stops.
    pub tolerance: f64,
}

impl Default for IaaftOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_CONVERGENCE_TOL,
        }
    }
}

/// A surrogate together with diagnostics of the refinement loop.
#[derive(Debug, Clone, PartialEq)]
pub struct IaaftResult {
    /// The surrogate sequence.
    pub values: Vec<f64>,
    /// Refinement rounds performed.
    pub iterations: usize,
    /// Whether the tolerance was reached before the iteration cap.
    pub converged: bool,
}

/// Per-sequence data shared by every surrogate of that sequence.
///
/// Cheap to share across threads: the buffers are read-only and the FFT
/// plans are `Arc`-held.
#[derive(Clone)]
pub struct SurrogateTemplate {
    sorted_values: Vec<f64>,
    target_amplitudes: Vec<f64>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for SurrogateTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurrogateTemplate")
            .field("len", &self.sorted_values.len())
            .field("sorted_values", &self.sorted_values)
            .field("target_amplitudes", &self.target_amplitudes)
            .finish()
    }
}

impl SurrogateTemplate {
    /// Precompute the value distribution and Fourier amplitudes of `sequence`.
    ///
    /// # Errors
    /// [`Error::InvalidSequence`] if the sequence is empty or holds NaN.
    pub fn new(sequence: &[f64]) -> Result<Self> {
        if sequence.is_empty() {
            return Err(Error::InvalidSequence(
                "cannot build surrogates of an empty sequence".to_string(),
            ));
        }
        if contains_nan(sequence) {
            return Err(Error::InvalidSequence(
                "cannot build surrogates of a sequence holding NaN".to_string(),
            ));
        }

        let n = sequence.len();
        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(n);
        let inverse = planner.plan_fft_inverse(n);

        let mut spectrum: Vec<Complex<f64>> =
            sequence.iter().map(|&x| Complex::new(x, 0.0)).collect();
        forward.process(&mut spectrum);

        Ok(Self {
            sorted_values: sorted_copy(sequence),
            target_amplitudes: half_spectrum_amplitudes(&spectrum),
            forward,
            inverse,
        })
    }

    /// Length of the source sequence.
    pub fn len(&self) -> usize {
        self.sorted_values.len()
    }

    /// Always false: empty sequences are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.sorted_values.is_empty()
    }

    /// Source samples in ascending order.
    pub fn sorted_values(&self) -> &[f64] {
        &self.sorted_values
    }

    /// Target amplitudes of bins `0..=N/2`.
    pub fn target_amplitudes(&self) -> &[f64] {
        &self.target_amplitudes
    }

    /// Generate one surrogate with the default stopping rule.
    pub fn generate(&self, seed: u64) -> Vec<f64> {
        self.generate_with(seed, &IaaftOptions::default()).values
    }

    /// Generate one surrogate.
    ///
    /// # Arguments
    /// * `seed` - Seed of the initial random permutation
    /// * `options` - Iteration cap and convergence tolerance
    ///
    /// # Returns
    /// The surrogate and the loop diagnostics. The same seed always gives the
    /// same surrogate.
    pub fn generate_with(&self, seed: u64, options: &IaaftOptions) -> IaaftResult {
        let n = self.len();
        let mut rng = StdRng::seed_from_u64(seed);

        let mut values = self.sorted_values.clone();
        values.shuffle(&mut rng);

        let mut previous = values.clone();
        let mut spectrum = vec![Complex::new(0.0, 0.0); n];
        let mut order: Vec<usize> = (0..n).collect();
        let mut iterations = 0;
        let mut converged = false;

        while iterations < options.max_iterations {
            iterations += 1;

            for (c, &x) in spectrum.iter_mut().zip(values.iter()) {
                *c = Complex::new(x, 0.0);
            }
            self.forward.process(&mut spectrum);
            self.impose_amplitudes(&mut spectrum);
            self.inverse.process(&mut spectrum);

            let scale = 1.0 / n as f64;
            for (x, c) in values.iter_mut().zip(spectrum.iter()) {
                *x = c.re * scale;
            }
            self.impose_distribution(&mut values, &mut order);

            let mut change = 0.0;
            let mut energy = 0.0;
            for (&x, &p) in values.iter().zip(previous.iter()) {
                change += (x - p) * (x - p);
                energy += x * x;
            }
            previous.copy_from_slice(&values);

            if change <= options.tolerance * energy {
                converged = true;
                break;
            }
        }

        if converged {
            debug!(seed, iterations, "IAAFT surrogate converged");
        } else {
            warn!(
                seed,
                iterations,
                tolerance = options.tolerance,
                "IAAFT surrogate did not converge"
            );
        }

        IaaftResult {
            values,
            iterations,
            converged,
        }
    }

    /// Replace bin magnitudes with the target amplitudes, keeping phases.
    fn impose_amplitudes(&self, spectrum: &mut [Complex<f64>]) {
        let n = spectrum.len();
        let amps = &self.target_amplitudes;

        // DC is real-only
        spectrum[0] = Complex::new(amps[0] * sign(spectrum[0].re), 0.0);

        for k in 1..=(n - 1) / 2 {
            let phase = spectrum[k].im.atan2(spectrum[k].re);
            spectrum[k] = Complex::from_polar(amps[k], phase);
            spectrum[n - k] = spectrum[k].conj();
        }

        if n % 2 == 0 && n > 1 {
            let half = n / 2;
            spectrum[half] = Complex::new(amps[half] * sign(spectrum[half].re), 0.0);
        }
    }

    /// Rewrite every sample with the source order statistic of the same rank.
    fn impose_distribution(&self, values: &mut [f64], order: &mut [usize]) {
        for (i, o) in order.iter_mut().enumerate() {
            *o = i;
        }
        order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));
        for (&idx, &v) in order.iter().zip(self.sorted_values.iter()) {
            values[idx] = v;
        }
    }
}

/// Generate one IAAFT surrogate of `sequence`.
///
/// Convenience wrapper building a throwaway [`SurrogateTemplate`]; reuse a
/// template when drawing many surrogates of the same sequence.
///
/// # Errors
/// [`Error::InvalidSequence`] if the sequence is empty or holds NaN.
pub fn generate_surrogate(sequence: &[f64], seed: u64) -> Result<Vec<f64>> {
    Ok(SurrogateTemplate::new(sequence)?.generate(seed))
}

/// Fourier amplitudes of bins `0..=N/2` of a real sequence.
pub fn amplitude_spectrum(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(values.len());
    let mut spectrum: Vec<Complex<f64>> = values.iter().map(|&x| Complex::new(x, 0.0)).collect();
    fft.process(&mut spectrum);
    half_spectrum_amplitudes(&spectrum)
}

fn half_spectrum_amplitudes(spectrum: &[Complex<f64>]) -> Vec<f64> {
    let n = spectrum.len();
    let half = n / 2;
    (0..=half)
        .map(|k| {
            if k == 0 || (n % 2 == 0 && k == half) {
                spectrum[k].re.abs()
            } else {
                spectrum[k].norm()
            }
        })
        .collect()
}

#[inline]
fn sign(x: f64) -> f64 {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}
