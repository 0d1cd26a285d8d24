//! Node pairs, efficiency tables and onset time-scale matrices.
//!
//! A network of `n` nodes has `n(n-1)/2` node pairs, each with one efficiency
//! curve. The onset matrix collects, for every pair, the narrowest window
//! width at which the pair's correlation becomes consistently significant.
//!
//! Onset matrices of repeated recordings, and of several systems each with
//! its own recordings, are combined entry by entry with a rank-k order
//! statistic in which "never significant" (`-1`) ranks above every width.

use crate::efficiency::{
    alpha_sweep_thresholds, compute_efficiency, eta_sweep_thresholds, wmatrix_element,
};
use crate::error::{Error, Result};
use crate::grid::{Grid, OnsetMatrix, PValueDiagram};
use crate::iter_maybe_parallel;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

// ============================================================================
// Labels and pairs
// ============================================================================

/// Check that a node label is non-empty and ASCII alphanumeric.
pub fn validate_label(label: &str) -> Result<()> {
    if label.is_empty() || !label.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::InvalidLabel(label.to_string()));
    }
    Ok(())
}

/// Unordered pair of distinct node labels.
///
/// The labels are stored in ascending order, so `NodePair::new("b", "a")`
/// and `NodePair::new("a", "b")` are equal and hash alike.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodePair {
    first: String,
    second: String,
}

impl NodePair {
    /// Build a pair from two labels in any order.
    ///
    /// # Errors
    /// [`Error::InvalidLabel`] for a label that is empty or not alphanumeric,
    /// or when both labels are the same.
    pub fn new(a: &str, b: &str) -> Result<Self> {
        validate_label(a)?;
        validate_label(b)?;
        if a == b {
            return Err(Error::InvalidLabel(format!("{a} (paired with itself)")));
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        Ok(Self {
            first: first.to_string(),
            second: second.to_string(),
        })
    }

    /// The smaller label.
    pub fn first(&self) -> &str {
        &self.first
    }

    /// The larger label.
    pub fn second(&self) -> &str {
        &self.second
    }

    /// Whether `label` is one of the two nodes.
    pub fn contains(&self, label: &str) -> bool {
        self.first == label || self.second == label
    }
}

impl fmt::Display for NodePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.second)
    }
}

/// Every pair `(labels[i], labels[j])` with `i < j`, in label order.
pub fn all_pairs(labels: &[String]) -> Result<Vec<NodePair>> {
    let mut pairs = Vec::with_capacity(labels.len() * labels.len().saturating_sub(1) / 2);
    for i in 0..labels.len() {
        for j in (i + 1)..labels.len() {
            pairs.push(NodePair::new(&labels[i], &labels[j])?);
        }
    }
    Ok(pairs)
}

/// Unique labels of a pair list, in the order they first appear.
pub fn labels_from_pairs(pairs: &[NodePair]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut labels = Vec::new();
    for pair in pairs {
        for label in [pair.first(), pair.second()] {
            if seen.insert(label) {
                labels.push(label.to_string());
            }
        }
    }
    labels
}

// ============================================================================
// Efficiency table
// ============================================================================

/// Efficiency curves of every node pair of an experiment.
#[derive(Debug, Clone)]
pub struct EfficiencyTable {
    labels: Vec<String>,
    validity: Vec<bool>,
    pairs: Vec<NodePair>,
    curves: Vec<Vec<f64>>,
    index: HashMap<NodePair, usize>,
}

impl EfficiencyTable {
    /// Assemble a table.
    ///
    /// # Arguments
    /// * `labels` - Node labels, unique and alphanumeric
    /// * `validity` - One flag per label; invalid nodes produce NaN entries
    /// * `pairs` - Node pairs, each naming two of `labels`
    /// * `curves` - One efficiency curve per pair, all of the same length
    pub fn new(
        labels: Vec<String>,
        validity: Vec<bool>,
        pairs: Vec<NodePair>,
        curves: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let mut known = HashSet::new();
        for label in &labels {
            validate_label(label)?;
            if !known.insert(label.as_str()) {
                return Err(Error::DuplicateLabel(label.clone()));
            }
        }
        if validity.len() != labels.len() {
            return Err(Error::DimensionMismatch(format!(
                "{} labels but {} validity flags",
                labels.len(),
                validity.len()
            )));
        }
        if curves.len() != pairs.len() {
            return Err(Error::DimensionMismatch(format!(
                "{} node pairs but {} efficiency curves",
                pairs.len(),
                curves.len()
            )));
        }
        if let Some(first) = curves.first() {
            if let Some(bad) = curves.iter().find(|c| c.len() != first.len()) {
                return Err(Error::DimensionMismatch(format!(
                    "efficiency curves of {} and {} time-scales",
                    first.len(),
                    bad.len()
                )));
            }
        }

        let mut index = HashMap::with_capacity(pairs.len());
        for (i, pair) in pairs.iter().enumerate() {
            for label in [pair.first(), pair.second()] {
                if !known.contains(label) {
                    return Err(Error::UnknownLabel(label.to_string()));
                }
            }
            if index.insert(pair.clone(), i).is_some() {
                return Err(Error::InvalidConfig(format!("node pair {pair} listed twice")));
            }
        }

        Ok(Self {
            labels,
            validity,
            pairs,
            curves,
            index,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn validity(&self) -> &[bool] {
        &self.validity
    }

    pub fn pairs(&self) -> &[NodePair] {
        &self.pairs
    }

    pub fn curves(&self) -> &[Vec<f64>] {
        &self.curves
    }

    /// Number of time-scales per curve (0 for a table without pairs).
    pub fn num_scales(&self) -> usize {
        self.curves.first().map_or(0, Vec::len)
    }

    /// Efficiency curve of the pair `{a, b}`, in either order.
    ///
    /// # Errors
    /// [`Error::UnknownPair`] if the table holds no such pair.
    pub fn curve(&self, a: &str, b: &str) -> Result<&[f64]> {
        let pair = NodePair::new(a, b)?;
        self.index
            .get(&pair)
            .map(|&i| self.curves[i].as_slice())
            .ok_or_else(|| Error::UnknownPair(a.to_string(), b.to_string()))
    }
}

// ============================================================================
// Onset matrices
// ============================================================================

/// Onset time-scale matrix at efficiency threshold `eta`.
///
/// Symmetric. The diagonal is 0 for valid nodes and NaN for invalid ones;
/// an off-diagonal entry is the [`wmatrix_element`] of the pair's curve when
/// both nodes are valid and NaN otherwise.
///
/// # Errors
/// [`Error::UnknownPair`] if a pair of labels has no curve,
/// [`Error::DimensionMismatch`] if `widths` does not match the curves.
pub fn build_matrix(table: &EfficiencyTable, widths: &[f64], eta: f64) -> Result<OnsetMatrix> {
    if !table.curves.is_empty() && widths.len() != table.num_scales() {
        return Err(Error::DimensionMismatch(format!(
            "{} window widths for curves of {} time-scales",
            widths.len(),
            table.num_scales()
        )));
    }

    let labels = table.labels();
    let valid = table.validity();
    let n = labels.len();
    let mut matrix = Grid::zeros(n, n);

    for i in 0..n {
        matrix[(i, i)] = if valid[i] { 0.0 } else { f64::NAN };
        for j in (i + 1)..n {
            let curve = table.curve(&labels[i], &labels[j])?;
            let onset = if valid[i] && valid[j] {
                wmatrix_element(curve, widths, eta)
            } else {
                f64::NAN
            };
            matrix[(i, j)] = onset;
            matrix[(j, i)] = onset;
        }
    }

    Ok(matrix)
}

/// Onset matrices for every η of [`eta_sweep_thresholds`] (101 matrices).
pub fn sweep_eta(table: &EfficiencyTable, widths: &[f64]) -> Result<Vec<OnsetMatrix>> {
    eta_sweep_thresholds()
        .into_iter()
        .map(|eta| build_matrix(table, widths, eta))
        .collect()
}

/// Onset matrices crossing the α sweep with the η sweep.
///
/// `result[a][e]` is the matrix at the `a`-th significance level of
/// [`alpha_sweep_thresholds`] and the `e`-th efficiency threshold.
pub fn sweep_alpha_eta(
    labels: &[String],
    validity: &[bool],
    pairs: &[NodePair],
    pdiagrams: &[PValueDiagram],
    widths: &[f64],
    avoid_overlap: bool,
) -> Result<Vec<Vec<OnsetMatrix>>> {
    if pdiagrams.len() != pairs.len() {
        return Err(Error::DimensionMismatch(format!(
            "{} node pairs but {} p-value diagrams",
            pairs.len(),
            pdiagrams.len()
        )));
    }

    let alphas = alpha_sweep_thresholds();
    iter_maybe_parallel!(alphas)
        .map(|alpha| {
            let curves = pdiagrams
                .iter()
                .map(|p| compute_efficiency(p, alpha, avoid_overlap))
                .collect();
            let table =
                EfficiencyTable::new(labels.to_vec(), validity.to_vec(), pairs.to_vec(), curves)?;
            sweep_eta(&table, widths)
        })
        .collect()
}

// ============================================================================
// Merging across recordings and systems
// ============================================================================

/// Rank-`rank` smallest onset among `values`.
///
/// `-1` (never significant) ranks above every width. NaN ranks above
/// everything, so it is only returned when fewer than `rank` finite or
/// never-significant entries exist. A never-significant result is returned as
/// `+inf` so it can be ranked again.
fn ranked_onset(values: &mut [f64], rank: usize) -> f64 {
    for v in values.iter_mut() {
        if *v == -1.0 {
            *v = f64::INFINITY;
        }
    }
    let (_, kth, _) = values.select_nth_unstable_by(rank - 1, |a, b| a.total_cmp(b));
    *kth
}

fn check_rank(rank: usize, count: usize, what: &str) -> Result<()> {
    if rank == 0 || rank > count {
        return Err(Error::InvalidConfig(format!(
            "rank must lie in 1..={count} for {count} {what}, got {rank}"
        )));
    }
    Ok(())
}

fn check_square_stack(matrices: &[OnsetMatrix]) -> Result<usize> {
    let n = matrices.first().map_or(0, Grid::nrows);
    for m in matrices {
        if m.shape() != (n, n) {
            return Err(Error::DimensionMismatch(format!(
                "onset matrices must all be {n}x{n}, got {}x{}",
                m.nrows(),
                m.ncols()
            )));
        }
    }
    Ok(n)
}

/// Entry-wise rank-`rank` merge keeping never-significant entries as `+inf`.
fn merge_ranked(matrices: &[OnsetMatrix], rank: usize, what: &str) -> Result<Grid> {
    check_rank(rank, matrices.len(), what)?;
    let n = check_square_stack(matrices)?;

    let mut merged = Grid::zeros(n, n);
    let mut values = Vec::with_capacity(matrices.len());
    for i in 0..n {
        for j in (i + 1)..n {
            values.clear();
            values.extend(matrices.iter().map(|m| m[(i, j)]));
            let onset = ranked_onset(&mut values, rank);
            merged[(i, j)] = onset;
            merged[(j, i)] = onset;
        }
    }
    Ok(merged)
}

fn restore_never_significant(mut matrix: Grid) -> Grid {
    let n = matrix.nrows();
    for i in 0..n {
        for j in 0..n {
            if matrix[(i, j)] == f64::INFINITY {
                matrix[(i, j)] = -1.0;
            }
        }
    }
    matrix
}

/// Merge the onset matrices of several recordings of one system.
///
/// Every off-diagonal entry becomes the `rank`-th smallest onset width among
/// the recordings, where `-1` counts as larger than any width. With `rank = 1`
/// a pair is connected at the narrowest width seen in any recording; with
/// `rank` equal to the number of recordings it must be connected in all of
/// them. The diagonal is 0.
///
/// # Errors
/// [`Error::InvalidConfig`] if `rank` is not in `1..=matrices.len()`,
/// [`Error::DimensionMismatch`] if the matrices are not square and of one size.
pub fn merge_recordings(matrices: &[OnsetMatrix], rank: usize) -> Result<OnsetMatrix> {
    merge_ranked(matrices, rank, "recordings").map(restore_never_significant)
}

/// Merge several systems, each given as the onset matrices of its recordings.
///
/// Recordings are first merged per system with `rank_recordings`, then the
/// per-system results are merged with `rank_systems`. Never-significant
/// entries keep ranking above every width through both stages.
pub fn merge_systems(
    systems: &[Vec<OnsetMatrix>],
    rank_recordings: usize,
    rank_systems: usize,
) -> Result<OnsetMatrix> {
    let per_system = systems
        .iter()
        .map(|recordings| merge_ranked(recordings, rank_recordings, "recordings"))
        .collect::<Result<Vec<_>>>()?;
    merge_ranked(&per_system, rank_systems, "systems").map(restore_never_significant)
}

/// Transpose `[item][eta]` sweeps into `[eta][item]` stacks.
fn sweep_stacks(sweeps: &[Vec<OnsetMatrix>]) -> Result<Vec<Vec<OnsetMatrix>>> {
    let steps = sweeps.first().map_or(0, Vec::len);
    if let Some(bad) = sweeps.iter().find(|s| s.len() != steps) {
        return Err(Error::DimensionMismatch(format!(
            "η sweeps of {steps} and {} matrices",
            bad.len()
        )));
    }
    Ok((0..steps)
        .map(|e| sweeps.iter().map(|s| s[e].clone()).collect())
        .collect())
}

/// [`merge_recordings`] at every η of a sweep.
///
/// `sweeps[r]` is the [`sweep_eta`] output of recording `r`; the result holds
/// one merged matrix per η.
pub fn merge_recordings_sweep(
    sweeps: &[Vec<OnsetMatrix>],
    rank: usize,
) -> Result<Vec<OnsetMatrix>> {
    check_rank(rank, sweeps.len(), "recordings")?;
    sweep_stacks(sweeps)?
        .iter()
        .map(|stack| merge_recordings(stack, rank))
        .collect()
}

/// [`merge_systems`] at every η of a sweep.
///
/// `systems[s][r]` is the [`sweep_eta`] output of recording `r` of system `s`.
pub fn merge_systems_sweep(
    systems: &[Vec<Vec<OnsetMatrix>>],
    rank_recordings: usize,
    rank_systems: usize,
) -> Result<Vec<OnsetMatrix>> {
    check_rank(rank_systems, systems.len(), "systems")?;
    let per_system = systems
        .iter()
        .map(|s| sweep_stacks(s))
        .collect::<Result<Vec<_>>>()?;
    let steps = per_system.first().map_or(0, Vec::len);
    if let Some(bad) = per_system.iter().find(|s| s.len() != steps) {
        return Err(Error::DimensionMismatch(format!(
            "η sweeps of {steps} and {} matrices",
            bad.len()
        )));
    }
    (0..steps)
        .map(|e| {
            let stacked: Vec<Vec<OnsetMatrix>> =
                per_system.iter().map(|s| s[e].clone()).collect();
            merge_systems(&stacked, rank_recordings, rank_systems)
        })
        .collect()
}
