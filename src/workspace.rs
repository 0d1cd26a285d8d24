//! Computation context and end-to-end pipeline.
//!
//! A [`Workspace`] owns the labelled sequences of one experiment. Running it
//! with an [`AnalysisConfig`] goes through correlation diagrams, p-value
//! diagrams, efficiency curves and the onset matrix, stopping after the
//! configured target. Invalid nodes (sequences holding NaN) only poison the
//! outputs of their own pairs.

use crate::config::{AnalysisConfig, AnalysisTarget};
use crate::correlation::{
    build_diagram, whole_sequence_matrix, CorrelationDiagrams, DiagramLayout,
};
use crate::efficiency::compute_efficiency;
use crate::error::{Error, Result};
use crate::grid::{CorrelationDiagram, Grid, OnsetMatrix, PValueDiagram};
use crate::helpers::contains_nan;
use crate::{iter_maybe_parallel, slice_maybe_parallel};
use crate::monitor::{percent, Monitor, Outcome, Subtask};
use crate::parallel::with_pool;
use crate::significance::{empirical_pvalue_diagram, whole_sequence_pvalue_matrix, PValueMethod};
use crate::timescale::{all_pairs, build_matrix, validate_label, EfficiencyTable, NodePair};
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Labelled, equal-length sequences of one experiment.
#[derive(Debug, Clone)]
pub struct Workspace {
    labels: Vec<String>,
    sequences: Vec<Vec<f64>>,
    validity: Vec<bool>,
}

/// Everything a run produced, up to its target.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnalysisReport {
    /// Effective configuration (after validation).
    pub config: AnalysisConfig,
    pub labels: Vec<String>,
    pub validity: Vec<bool>,
    /// Node pairs, in the order of every per-pair list below.
    pub pairs: Vec<NodePair>,
    pub layout: DiagramLayout,
    /// Window width of each time-scale, `(l+1)·L·T`.
    pub widths: Vec<f64>,
    pub correlation: Vec<CorrelationDiagram>,
    /// F-test p-values, computed alongside the correlation diagrams.
    pub fisher_pvalue: Vec<PValueDiagram>,
    /// P-value diagrams by the configured method.
    pub pvalue: Option<Vec<PValueDiagram>>,
    pub efficiencies: Option<Vec<Vec<f64>>>,
    pub onset: Option<OnsetMatrix>,
}

impl AnalysisReport {
    /// Position of the pair `{a, b}` in the per-pair lists.
    pub fn pair_index(&self, a: &str, b: &str) -> Option<usize> {
        let pair = NodePair::new(a, b).ok()?;
        self.pairs.iter().position(|p| *p == pair)
    }
}

/// Whole-sequence correlation and p-value matrices.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WholeSequenceReport {
    pub labels: Vec<String>,
    pub correlation: Grid,
    pub pvalue: Option<Grid>,
}

impl Workspace {
    /// Create a workspace.
    ///
    /// # Errors
    /// * [`Error::DimensionMismatch`] if labels and sequences differ in count
    /// * [`Error::InvalidSequence`] for fewer than two sequences or empty ones
    /// * [`Error::InvalidLabel`] / [`Error::DuplicateLabel`] for bad labels
    /// * [`Error::LengthMismatch`] if sequence lengths differ
    pub fn new(labels: Vec<String>, sequences: Vec<Vec<f64>>) -> Result<Self> {
        if labels.len() != sequences.len() {
            return Err(Error::DimensionMismatch(format!(
                "{} labels for {} sequences",
                labels.len(),
                sequences.len()
            )));
        }
        if sequences.len() < 2 {
            return Err(Error::InvalidSequence(
                "at least two sequences are needed".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for label in &labels {
            validate_label(label)?;
            if !seen.insert(label.as_str()) {
                return Err(Error::DuplicateLabel(label.clone()));
            }
        }

        let expected = sequences[0].len();
        if expected == 0 {
            return Err(Error::InvalidSequence("sequences are empty".to_string()));
        }
        for (label, seq) in labels.iter().zip(sequences.iter()) {
            if seq.len() != expected {
                return Err(Error::LengthMismatch {
                    label: label.clone(),
                    expected,
                    found: seq.len(),
                });
            }
        }

        let validity: Vec<bool> = labels
            .iter()
            .zip(sequences.iter())
            .map(|(label, seq)| {
                let valid = !contains_nan(seq);
                if !valid {
                    warn!(node = %label, "sequence holds NaN, node marked invalid");
                }
                valid
            })
            .collect();

        Ok(Self {
            labels,
            sequences,
            validity,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn validity(&self) -> &[bool] {
        &self.validity
    }

    pub fn sequences(&self) -> &[Vec<f64>] {
        &self.sequences
    }

    /// Number of samples per sequence.
    pub fn sequence_len(&self) -> usize {
        self.sequences[0].len()
    }

    /// Sequence of a node.
    pub fn sequence(&self, label: &str) -> Option<&[f64]> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.sequences[i].as_slice())
    }

    /// `(i, j)` node indices of every pair, `i < j`, in [`all_pairs`] order.
    fn pair_indices(&self) -> Vec<(usize, usize)> {
        let n = self.labels.len();
        (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect()
    }

    /// Run the pipeline up to `config.target`.
    ///
    /// # Errors
    /// Configuration errors are reported before any computation; numeric
    /// errors abort the run.
    pub fn run<M>(&self, config: &AnalysisConfig, monitor: &M) -> Result<Outcome<AnalysisReport>>
    where
        M: Monitor + ?Sized,
    {
        let cfg = config.validate(self.sequence_len())?;
        let layout = cfg.layout(self.sequence_len())?;
        let pairs = all_pairs(&self.labels)?;
        let indices = self.pair_indices();
        info!(
            nodes = self.labels.len(),
            pairs = pairs.len(),
            positions = layout.num_positions(),
            scales = layout.num_scales(),
            "starting analysis"
        );

        // Correlation diagrams
        monitor.progress(0, "correlation diagrams");
        let diagrams: Vec<CorrelationDiagrams> = with_pool(cfg.threads, || {
            iter_maybe_parallel!(indices.clone())
                .map(|(i, j)| build_diagram(&self.sequences[i], &self.sequences[j], &layout))
                .collect::<Result<Vec<_>>>()
        })??;
        let (correlation, fisher_pvalue): (Vec<_>, Vec<_>) = diagrams
            .into_iter()
            .map(|d| (d.correlation, d.fisher_pvalue))
            .unzip();

        let mut report = AnalysisReport {
            config: cfg.clone(),
            labels: self.labels.clone(),
            validity: self.validity.clone(),
            pairs,
            layout,
            widths: cfg.window_widths(),
            correlation,
            fisher_pvalue,
            pvalue: None,
            efficiencies: None,
            onset: None,
        };
        if cfg.target == AnalysisTarget::CorrelationDiagrams {
            return Ok(Outcome::Complete(report));
        }
        if monitor.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }

        // P-value diagrams
        let pvalue = match cfg.method {
            PValueMethod::FTest => report.fisher_pvalue.clone(),
            PValueMethod::Surrogate => {
                let mut test = cfg.surrogate_test();
                test.seed = Some(test.base_seed());
                let mut pvalue = Vec::with_capacity(indices.len());
                for (p, &(i, j)) in indices.iter().enumerate() {
                    let phase = format!("p-values {}", report.pairs[p]);
                    monitor.progress(percent(p, indices.len()), &phase);
                    debug!(pair = %report.pairs[p], "surrogate test");
                    let pair_monitor = Subtask::new(monitor, &phase, p, indices.len());
                    let outcome = empirical_pvalue_diagram(
                        &report.correlation[p],
                        &self.sequences[i],
                        &self.sequences[j],
                        &report.layout,
                        &test,
                        &pair_monitor,
                    )?;
                    match outcome {
                        Outcome::Complete(diagram) => pvalue.push(diagram),
                        Outcome::Cancelled => return Ok(Outcome::Cancelled),
                    }
                }
                pvalue
            }
        };
        report.pvalue = Some(pvalue);
        if cfg.target == AnalysisTarget::PValueDiagrams {
            return Ok(Outcome::Complete(report));
        }
        if monitor.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }

        // Efficiencies
        monitor.progress(0, "efficiencies");
        let pvalues = report.pvalue.as_deref().unwrap_or_default();
        let efficiencies: Vec<Vec<f64>> = slice_maybe_parallel!(pvalues)
            .map(|p| compute_efficiency(p, cfg.alpha, cfg.avoid_overlap))
            .collect();
        report.efficiencies = Some(efficiencies.clone());
        if cfg.target == AnalysisTarget::Efficiencies {
            return Ok(Outcome::Complete(report));
        }

        // Onset matrix
        monitor.progress(0, "time-scale matrix");
        let table = EfficiencyTable::new(
            report.labels.clone(),
            report.validity.clone(),
            report.pairs.clone(),
            efficiencies,
        )?;
        report.onset = Some(build_matrix(&table, &report.widths, cfg.eta)?);
        info!("analysis complete");

        Ok(Outcome::Complete(report))
    }

    /// Whole-sequence correlation matrix and, unless the target is
    /// [`AnalysisTarget::CorrelationDiagrams`], its p-value matrix.
    ///
    /// Window parameters of `config` are ignored.
    pub fn whole_sequence<M>(
        &self,
        config: &AnalysisConfig,
        monitor: &M,
    ) -> Result<Outcome<WholeSequenceReport>>
    where
        M: Monitor + ?Sized,
    {
        if config.threads == Some(0) {
            return Err(Error::InvalidConfig(
                "thread count must be at least 1".to_string(),
            ));
        }
        let len = self.sequence_len();
        let needed = config.shift.unwrap_or(0).checked_add(3);
        if needed.map_or(true, |needed| needed > len) {
            return Err(Error::InvalidConfig(format!(
                "shift {:?} leaves fewer than 3 samples of {len}",
                config.shift
            )));
        }

        let correlation = whole_sequence_matrix(&self.sequences, &self.validity, config.shift)?;
        let pvalue = if config.target == AnalysisTarget::CorrelationDiagrams {
            None
        } else {
            let outcome = whole_sequence_pvalue_matrix(
                &self.sequences,
                &self.validity,
                config.shift,
                config.method,
                &config.surrogate_test(),
                monitor,
            )?;
            match outcome {
                Outcome::Complete(p) => Some(p),
                Outcome::Cancelled => return Ok(Outcome::Cancelled),
            }
        };

        Ok(Outcome::Complete(WholeSequenceReport {
            labels: self.labels.clone(),
            correlation,
            pvalue,
        }))
    }
}
