//! Analysis configuration.
//!
//! [`AnalysisConfig`] gathers every scalar of a run. It is validated once
//! against the sequence length before any computation starts; validation
//! returns the effective configuration, which may differ from the requested
//! one (an odd base width is rounded down to the next even value).

use crate::correlation::DiagramLayout;
use crate::efficiency::window_widths;
use crate::error::{Error, Result};
use crate::significance::{PValueMethod, SurrogateTest};
use crate::surrogate::IaaftOptions;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Last stage of the pipeline a run goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AnalysisTarget {
    /// Correlation diagrams (with their F-test p-values).
    CorrelationDiagrams,
    /// P-value diagrams by the configured method.
    PValueDiagrams,
    /// Efficiency curves.
    Efficiencies,
    /// Onset time-scale matrix.
    #[default]
    TimescaleMatrix,
}

/// Parameters of one analysis run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AnalysisConfig {
    /// Base window width L in samples (even, at least 4).
    pub base_width: usize,
    /// Number of time-scales W.
    pub num_scales: usize,
    /// Number of surrogate pairs M.
    pub trials: usize,
    /// Shift τ of the shift-symmetrised coefficient.
    pub shift: Option<usize>,
    /// Significance level α.
    pub alpha: f64,
    /// Efficiency threshold η.
    pub eta: f64,
    /// Count only non-overlapping windows in efficiencies.
    pub avoid_overlap: bool,
    /// Worker threads; `None` uses the global rayon pool.
    pub threads: Option<usize>,
    /// How p-value diagrams are computed.
    pub method: PValueMethod,
    /// Sampling period T; window widths are reported as `(l+1)·L·T`.
    pub sampling_period: f64,
    /// Base seed of the surrogate trials.
    pub seed: Option<u64>,
    /// Stage at which the run stops.
    pub target: AnalysisTarget,
    /// Stopping rule of surrogate generation.
    pub iaaft: IaaftOptions,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            base_width: 20,
            num_scales: 5,
            trials: 100,
            shift: None,
            alpha: 0.01,
            eta: 0.5,
            avoid_overlap: false,
            threads: None,
            method: PValueMethod::Surrogate,
            sampling_period: 1.0,
            seed: None,
            target: AnalysisTarget::TimescaleMatrix,
            iaaft: IaaftOptions::default(),
        }
    }
}

impl AnalysisConfig {
    /// Whether this run draws surrogates.
    pub fn uses_surrogates(&self) -> bool {
        self.method == PValueMethod::Surrogate && self.target > AnalysisTarget::CorrelationDiagrams
    }

    /// Check the configuration against sequences of `sequence_len` samples.
    ///
    /// # Returns
    /// The effective configuration. An odd base width is decremented by one
    /// with a warning.
    ///
    /// # Errors
    /// [`Error::InvalidConfig`] naming the first offending parameter.
    pub fn validate(&self, sequence_len: usize) -> Result<AnalysisConfig> {
        let mut cfg = self.clone();

        if cfg.base_width % 2 == 1 {
            warn!(
                requested = cfg.base_width,
                used = cfg.base_width - 1,
                "base window width must be even, rounding down"
            );
            cfg.base_width -= 1;
        }
        if cfg.base_width < 4 {
            return Err(Error::InvalidConfig(format!(
                "base window width must be at least 4, got {}",
                cfg.base_width
            )));
        }
        if cfg.num_scales == 0 {
            return Err(Error::InvalidConfig(
                "number of time-scales must be at least 1".to_string(),
            ));
        }
        if cfg.uses_surrogates() && cfg.trials == 0 {
            return Err(Error::InvalidConfig(
                "surrogate p-values need at least one trial".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&cfg.alpha) {
            return Err(Error::InvalidConfig(format!(
                "significance level must lie in [0, 1], got {}",
                cfg.alpha
            )));
        }
        if !(0.0..=1.0).contains(&cfg.eta) {
            return Err(Error::InvalidConfig(format!(
                "efficiency threshold must lie in [0, 1], got {}",
                cfg.eta
            )));
        }
        if !(cfg.sampling_period > 0.0 && cfg.sampling_period.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "sampling period must be positive, got {}",
                cfg.sampling_period
            )));
        }
        if cfg.threads == Some(0) {
            return Err(Error::InvalidConfig(
                "thread count must be at least 1".to_string(),
            ));
        }
        if !(cfg.iaaft.tolerance >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "IAAFT tolerance must be non-negative, got {}",
                cfg.iaaft.tolerance
            )));
        }

        cfg.layout(sequence_len)?;
        Ok(cfg)
    }

    /// Diagram layout of this configuration.
    pub fn layout(&self, sequence_len: usize) -> Result<DiagramLayout> {
        DiagramLayout::new(sequence_len, self.base_width, self.num_scales, self.shift)
    }

    /// Window widths `(l+1)·L·T`.
    pub fn window_widths(&self) -> Vec<f64> {
        window_widths(self.base_width, self.num_scales, self.sampling_period)
    }

    /// Surrogate test parameters of this configuration.
    pub fn surrogate_test(&self) -> SurrogateTest {
        SurrogateTest {
            trials: self.trials,
            threads: self.threads,
            seed: self.seed,
            iaaft: self.iaaft,
        }
    }
}
