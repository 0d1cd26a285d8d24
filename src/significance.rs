//! Significance of correlation diagrams by surrogate testing.
//!
//! The empirical p-value of a cell is the fraction of surrogate pairs whose
//! correlation at that cell exceeds the observed one. Surrogates keep the
//! amplitude distribution and spectrum of each sequence but destroy any
//! coupling between the two, so they sample the null hypothesis of
//! independent sequences with the same linear structure.
//!
//! Trials run in batches of concurrent work. Cancellation is polled before
//! every batch and progress is reported after it. Exceedances are counted as
//! integers and reduced per batch, so the result is the same for any thread
//! count.

use crate::correlation::{
    correlation_diagram, whole_sequence_correlation, whole_sequence_fisher_pvalue,
    whole_sequence_matrix, DiagramLayout,
};
use crate::error::{Error, Result};
use crate::grid::{Grid, PValueDiagram};
use crate::helpers::contains_nan;
use crate::iter_maybe_parallel;
use crate::monitor::{percent, Monitor, Outcome, Subtask};
use crate::parallel::{concurrency, with_pool};
use crate::surrogate::{IaaftOptions, SurrogateTemplate};
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// How p-values are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PValueMethod {
    /// Empirical p-values from IAAFT surrogate pairs.
    #[default]
    Surrogate,
    /// Analytic Fisher F-test; no randomness involved.
    FTest,
}

/// Parameters of a surrogate test.
#[derive(Debug, Clone, PartialEq)]
pub struct SurrogateTest {
    /// Number of surrogate pairs (M).
    pub trials: usize,
    /// Worker threads; `None` uses the global rayon pool.
    pub threads: Option<usize>,
    /// Base seed; `None` derives one from the system clock.
    pub seed: Option<u64>,
    /// Stopping rule of surrogate generation.
    pub iaaft: IaaftOptions,
}

impl Default for SurrogateTest {
    fn default() -> Self {
        Self {
            trials: 100,
            threads: None,
            seed: None,
            iaaft: IaaftOptions::default(),
        }
    }
}

impl SurrogateTest {
    /// Base seed of this test. A clock-derived seed is logged so the run can
    /// be reproduced.
    pub fn base_seed(&self) -> u64 {
        match self.seed {
            Some(seed) => seed,
            None => {
                let seed = clock_seed();
                info!(seed, "no seed supplied, using clock-derived base seed");
                seed
            }
        }
    }

    /// Copy of this test with the base seed fixed.
    fn resolved(&self) -> Self {
        Self {
            seed: Some(self.base_seed()),
            ..self.clone()
        }
    }

    fn check(&self) -> Result<()> {
        if self.trials == 0 {
            return Err(Error::InvalidConfig(
                "surrogate test needs at least one trial".to_string(),
            ));
        }
        Ok(())
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Seeds of the two surrogates of trial `trial`.
#[inline]
fn trial_seeds(base: u64, trial: usize) -> (u64, u64) {
    let a = base.wrapping_add(2 * trial as u64);
    (a, a.wrapping_add(1))
}

/// Run `trials` surrogate trials in batches, accumulating per-cell exceedances.
///
/// `trial_marks(i)` returns one flag per cell for trial `i`.
fn count_exceedances<M, F>(
    cells: usize,
    test: &SurrogateTest,
    monitor: &M,
    phase: &str,
    trial_marks: F,
) -> Result<Outcome<Vec<u32>>>
where
    M: Monitor + ?Sized,
    F: Fn(usize) -> Vec<bool> + Sync + Send,
{
    let batch = concurrency(test.threads);
    let trials = test.trials;

    with_pool(test.threads, || {
        let mut counts = vec![0u32; cells];
        let mut start = 0;
        while start < trials {
            if monitor.is_cancelled() {
                info!(completed = start, trials, "surrogate test cancelled");
                return Outcome::Cancelled;
            }
            let end = (start + batch).min(trials);

            let marks: Vec<Vec<bool>> = iter_maybe_parallel!(start..end)
                .map(|i| trial_marks(i))
                .collect();
            for trial in &marks {
                for (c, &exceeded) in counts.iter_mut().zip(trial.iter()) {
                    *c += u32::from(exceeded);
                }
            }

            debug!(start, end, trials, "surrogate batch done");
            monitor.progress(percent(end, trials), phase);
            start = end;
        }
        Outcome::Complete(counts)
    })
}

/// Empirical p-value diagram of an observed correlation diagram.
///
/// # Arguments
/// * `observed` - Correlation diagram of `a` and `b` under `layout`
/// * `a`, `b` - The source sequences
/// * `layout` - Shared diagram layout
/// * `test` - Trial count, threads, seed and IAAFT options
/// * `monitor` - Progress sink and cancellation source
///
/// # Returns
/// `p[l][k] = #{trials : observed[l][k] < surrogate[l][k]} / M`. NaN cells of
/// the observed diagram stay NaN; sequences holding NaN give an all-NaN
/// diagram without running any trial.
///
/// # Errors
/// [`Error::DimensionMismatch`] if the observed diagram or the sequences do
/// not match the layout, [`Error::InvalidConfig`] for zero trials or threads.
pub fn empirical_pvalue_diagram<M>(
    observed: &Grid,
    a: &[f64],
    b: &[f64],
    layout: &DiagramLayout,
    test: &SurrogateTest,
    monitor: &M,
) -> Result<Outcome<PValueDiagram>>
where
    M: Monitor + ?Sized,
{
    test.check()?;
    let (nrows, ncols) = layout.shape();
    if observed.shape() != (nrows, ncols) {
        return Err(Error::DimensionMismatch(format!(
            "observed diagram is {}x{}, layout is {nrows}x{ncols}",
            observed.nrows(),
            observed.ncols()
        )));
    }
    layout.check_lengths(a, b)?;

    if contains_nan(a) || contains_nan(b) || observed.is_all_nan() {
        return Ok(Outcome::Complete(Grid::nan(nrows, ncols)));
    }

    let template_a = SurrogateTemplate::new(a)?;
    let template_b = SurrogateTemplate::new(b)?;
    let base = test.base_seed();
    debug!(base, trials = test.trials, "starting surrogate diagram test");

    let outcome = count_exceedances(observed.len(), test, monitor, "surrogate trials", |i| {
        let (seed_a, seed_b) = trial_seeds(base, i);
        let sa = template_a.generate_with(seed_a, &test.iaaft).values;
        let sb = template_b.generate_with(seed_b, &test.iaaft).values;
        let surrogate = correlation_diagram(&sa, &sb, layout);
        observed
            .as_slice()
            .iter()
            .zip(surrogate.as_slice())
            .map(|(&o, &s)| o < s)
            .collect()
    })?;

    let m = test.trials as f64;
    Ok(outcome.map(|counts| {
        let data = observed
            .as_slice()
            .iter()
            .zip(counts)
            .map(|(&o, c)| if o.is_nan() { f64::NAN } else { c as f64 / m })
            .collect();
        Grid::from_row_major(data, nrows, ncols).unwrap_or_else(|| Grid::nan(nrows, ncols))
    }))
}

/// Empirical p-value of a whole-sequence correlation.
///
/// Counts the surrogate pairs whose whole-sequence correlation exceeds
/// `observed_r`. A NaN observation or NaN-holding sequences give NaN.
pub fn whole_sequence_pvalue<M>(
    observed_r: f64,
    a: &[f64],
    b: &[f64],
    shift: Option<usize>,
    test: &SurrogateTest,
    monitor: &M,
) -> Result<Outcome<f64>>
where
    M: Monitor + ?Sized,
{
    test.check()?;
    if observed_r.is_nan() || contains_nan(a) || contains_nan(b) {
        return Ok(Outcome::Complete(f64::NAN));
    }

    let template_a = SurrogateTemplate::new(a)?;
    let template_b = SurrogateTemplate::new(b)?;
    let base = test.base_seed();

    let outcome = count_exceedances(1, test, monitor, "whole-sequence trials", |i| {
        let (seed_a, seed_b) = trial_seeds(base, i);
        let sa = template_a.generate_with(seed_a, &test.iaaft).values;
        let sb = template_b.generate_with(seed_b, &test.iaaft).values;
        vec![whole_sequence_correlation(&sa, &sb, shift) > observed_r]
    })?;

    let m = test.trials as f64;
    Ok(outcome.map(|counts| counts[0] as f64 / m))
}

const PAIRS_PHASE: &str = "whole-sequence p-values";

/// All-pairs whole-sequence p-value matrix.
///
/// The diagonal is 0 for valid nodes and NaN for invalid ones; entries
/// involving an invalid node are NaN. With [`PValueMethod::FTest`] the
/// matrix is analytic and `test` is unused; with [`PValueMethod::Surrogate`]
/// every pair shares the same base seed.
pub fn whole_sequence_pvalue_matrix<M>(
    sequences: &[Vec<f64>],
    validity: &[bool],
    shift: Option<usize>,
    method: PValueMethod,
    test: &SurrogateTest,
    monitor: &M,
) -> Result<Outcome<Grid>>
where
    M: Monitor + ?Sized,
{
    let correlation = whole_sequence_matrix(sequences, validity, shift)?;
    let n = sequences.len();
    let len = sequences.first().map_or(0, Vec::len);
    let test = match method {
        PValueMethod::Surrogate => {
            test.check()?;
            test.resolved()
        }
        PValueMethod::FTest => test.clone(),
    };

    let total_pairs = n * n.saturating_sub(1) / 2;
    let mut done = 0;
    let mut pvalues = Grid::zeros(n, n);
    for i in 0..n {
        pvalues[(i, i)] = if validity[i] { 0.0 } else { f64::NAN };
        for j in (i + 1)..n {
            let r = correlation[(i, j)];
            let p = if !(validity[i] && validity[j]) {
                f64::NAN
            } else {
                match method {
                    PValueMethod::FTest => whole_sequence_fisher_pvalue(r, len, shift)?,
                    PValueMethod::Surrogate => {
                        let a = &sequences[i];
                        let b = &sequences[j];
                        let pair = Subtask::new(monitor, PAIRS_PHASE, done, total_pairs);
                        match whole_sequence_pvalue(r, a, b, shift, &test, &pair)? {
                            Outcome::Complete(p) => p,
                            Outcome::Cancelled => return Ok(Outcome::Cancelled),
                        }
                    }
                }
            };
            pvalues[(i, j)] = p;
            pvalues[(j, i)] = p;
            done += 1;
            monitor.progress(percent(done, total_pairs), PAIRS_PHASE);
        }
    }

    Ok(Outcome::Complete(pvalues))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::build_diagram;
    use crate::monitor::Controller;
    use crate::simulation::{correlated_pair, white_noise};
    use std::sync::{Arc, Mutex};

    fn small_test(seed: u64, threads: Option<usize>) -> SurrogateTest {
        SurrogateTest {
            trials: 20,
            threads,
            seed: Some(seed),
            iaaft: IaaftOptions::default(),
        }
    }

    #[test]
    fn test_trial_seeds() {
        assert_eq!(trial_seeds(10, 0), (10, 11));
        assert_eq!(trial_seeds(10, 3), (16, 17));
        assert_eq!(trial_seeds(u64::MAX, 0), (u64::MAX, 0));
    }

    #[test]
    fn test_pvalues_are_trial_fractions() {
        let a = white_noise(200, Some(1));
        let b = white_noise(200, Some(2));
        let layout = DiagramLayout::new(200, 10, 3, None).unwrap();
        let observed = build_diagram(&a, &b, &layout).unwrap().correlation;
        let p = empirical_pvalue_diagram(&observed, &a, &b, &layout, &small_test(5, None), &())
            .unwrap()
            .complete()
            .unwrap();
        assert_eq!(p.shape(), layout.shape());
        for &v in p.as_slice() {
            assert!((0.0..=1.0).contains(&v));
            let scaled = v * 20.0;
            assert!((scaled - scaled.round()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_independent_of_thread_count() {
        let (a, b) = correlated_pair(160, 0.3, Some(3));
        let layout = DiagramLayout::new(160, 8, 2, Some(2)).unwrap();
        let observed = build_diagram(&a, &b, &layout).unwrap().correlation;
        let p1 = empirical_pvalue_diagram(&observed, &a, &b, &layout, &small_test(9, Some(1)), &())
            .unwrap();
        let p4 = empirical_pvalue_diagram(&observed, &a, &b, &layout, &small_test(9, Some(4)), &())
            .unwrap();
        assert_eq!(p1, p4);
    }

    #[test]
    fn test_strong_coupling_is_significant() {
        let (a, b) = correlated_pair(200, 0.95, Some(4));
        let layout = DiagramLayout::new(200, 20, 2, None).unwrap();
        let observed = build_diagram(&a, &b, &layout).unwrap().correlation;
        let p = empirical_pvalue_diagram(&observed, &a, &b, &layout, &small_test(1, None), &())
            .unwrap()
            .complete()
            .unwrap();
        assert!(p.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_nan_sequences() {
        let a = white_noise(100, Some(5));
        let mut b = white_noise(100, Some(6));
        b[0] = f64::NAN;
        let layout = DiagramLayout::new(100, 10, 2, None).unwrap();
        let observed = build_diagram(&a, &b, &layout).unwrap().correlation;
        let p = empirical_pvalue_diagram(&observed, &a, &b, &layout, &small_test(1, None), &())
            .unwrap()
            .complete()
            .unwrap();
        assert!(p.is_all_nan());
    }

    #[test]
    fn test_cancelled_before_start() {
        let a = white_noise(100, Some(7));
        let b = white_noise(100, Some(8));
        let layout = DiagramLayout::new(100, 10, 2, None).unwrap();
        let observed = build_diagram(&a, &b, &layout).unwrap().correlation;
        let controller = Controller::new();
        controller.cancel();
        let outcome =
            empirical_pvalue_diagram(&observed, &a, &b, &layout, &small_test(1, None), &controller)
                .unwrap();
        assert!(outcome.is_cancelled());
    }

    #[test]
    fn test_rejects_bad_input() {
        let a = white_noise(100, Some(9));
        let layout = DiagramLayout::new(100, 10, 2, None).unwrap();
        let observed = build_diagram(&a, &a, &layout).unwrap().correlation;
        let zero = SurrogateTest {
            trials: 0,
            ..small_test(1, None)
        };
        assert!(empirical_pvalue_diagram(&observed, &a, &a, &layout, &zero, &()).is_err());

        let wrong = Grid::zeros(1, 1);
        assert!(matches!(
            empirical_pvalue_diagram(&wrong, &a, &a, &layout, &small_test(1, None), &()),
            Err(Error::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_whole_sequence_pvalue() {
        let (a, b) = correlated_pair(256, 0.8, Some(10));
        let r = whole_sequence_correlation(&a, &b, None);
        let p = whole_sequence_pvalue(r, &a, &b, None, &small_test(2, None), &())
            .unwrap()
            .complete()
            .unwrap();
        assert_eq!(p, 0.0);
        let nan = whole_sequence_pvalue(f64::NAN, &a, &b, None, &small_test(2, None), &())
            .unwrap()
            .complete()
            .unwrap();
        assert!(nan.is_nan());
    }

    #[test]
    fn test_whole_sequence_pvalue_matrix() {
        let (a, b) = correlated_pair(128, 0.9, Some(11));
        let seqs = vec![a, b, vec![f64::NAN; 128]];
        let validity = [true, true, false];
        for method in [PValueMethod::FTest, PValueMethod::Surrogate] {
            let test = small_test(3, None);
            let m = whole_sequence_pvalue_matrix(&seqs, &validity, None, method, &test, &())
                .unwrap()
                .complete()
                .unwrap();
            assert_eq!(m[(0, 0)], 0.0);
            assert!(m[(2, 2)].is_nan());
            assert!(m[(0, 2)].is_nan());
            assert_eq!(m[(0, 1)], m[(1, 0)]);
            assert!(m[(0, 1)] < 0.01);
        }
    }

    #[test]
    fn test_whole_sequence_progress_never_decreases() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let controller = Controller::with_callback(move |p, phase| {
            sink.lock().unwrap().push((p, phase.to_string()));
        });
        let seqs: Vec<Vec<f64>> = (0..4).map(|k| white_noise(96, Some(20 + k))).collect();
        let test = SurrogateTest {
            trials: 8,
            threads: Some(2),
            ..small_test(4, None)
        };
        let outcome = whole_sequence_pvalue_matrix(
            &seqs,
            &[true; 4],
            Some(1),
            PValueMethod::Surrogate,
            &test,
            &controller,
        )
        .unwrap();
        assert!(!outcome.is_cancelled());

        let seen = seen.lock().unwrap();
        // Trial batches of every pair plus one event per finished pair
        assert!(seen.len() > 12, "{} events", seen.len());
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0), "{seen:?}");
        assert!(seen.iter().all(|(_, phase)| phase == PAIRS_PHASE));
    }

    #[test]
    fn test_clock_seed_logged_path() {
        let test = SurrogateTest::default();
        let resolved = test.resolved();
        assert!(resolved.seed.is_some());
        assert_eq!(resolved.base_seed(), resolved.seed.unwrap());
    }
}
