//! Statistical properties of IAAFT surrogates.
//!
//! A surrogate must be a permutation of its source with nearly the same
//! Fourier amplitude spectrum, and surrogates of two coupled sequences must
//! be uncoupled.
//!
//! Run: cargo test --test surrogate_properties

use xcorr_timescale::correlation::{pearson_correlation, whole_sequence_correlation};
use xcorr_timescale::simulation::{ar1_sequence, correlated_pair, delayed_copy, white_noise};
use xcorr_timescale::surrogate::amplitude_spectrum;
use xcorr_timescale::{IaaftOptions, SurrogateTemplate};

// ─── Helpers ────────────────────────────────────────────────────────────────

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

fn relative_spectrum_error(source: &[f64], surrogate: &[f64]) -> f64 {
    let target = amplitude_spectrum(source);
    let got = amplitude_spectrum(surrogate);
    let num: f64 = target
        .iter()
        .zip(got.iter())
        .map(|(t, g)| (t - g) * (t - g))
        .sum();
    let den: f64 = target.iter().map(|t| t * t).sum();
    (num / den).sqrt()
}

fn autocorrelation(x: &[f64], lag: usize) -> f64 {
    pearson_correlation(&x[lag..], &x[..x.len() - lag])
}

// ─── Marginal distribution ──────────────────────────────────────────────────

#[test]
fn test_surrogate_is_permutation() {
    let x: Vec<f64> = ar1_sequence(500, 0.6, Some(1))
        .iter()
        .map(|v| v.exp())
        .collect();
    let template = SurrogateTemplate::new(&x).unwrap();
    for seed in 0..5 {
        let s = template.generate(seed);
        assert_eq!(sorted(&s), sorted(&x));
    }
}

#[test]
fn test_surrogate_odd_length_and_ties() {
    let mut x = white_noise(257, Some(2));
    for v in x.iter_mut().take(40) {
        *v = 0.5;
    }
    let s = SurrogateTemplate::new(&x).unwrap().generate(3);
    assert_eq!(sorted(&s), sorted(&x));
}

// ─── Spectrum ───────────────────────────────────────────────────────────────

#[test]
fn test_spectrum_preserved_for_correlated_noise() {
    let x = ar1_sequence(1024, 0.8, Some(4));
    let template = SurrogateTemplate::new(&x).unwrap();
    let s = template.generate(5);

    assert!(relative_spectrum_error(&x, &s) < 0.2);
    for lag in 1..=3 {
        let expected = autocorrelation(&x, lag);
        let got = autocorrelation(&s, lag);
        assert!(
            (expected - got).abs() < 0.1,
            "lag {lag}: source {expected}, surrogate {got}"
        );
    }
}

#[test]
fn test_more_iterations_do_not_hurt_spectrum() {
    let x = ar1_sequence(512, 0.7, Some(6));
    let template = SurrogateTemplate::new(&x).unwrap();
    let short = template.generate_with(
        7,
        &IaaftOptions {
            max_iterations: 1,
            tolerance: 0.0,
        },
    );
    let long = template.generate_with(7, &IaaftOptions::default());
    assert_eq!(short.iterations, 1);
    assert!(long.iterations >= short.iterations);
    let short_err = relative_spectrum_error(&x, &short.values);
    let long_err = relative_spectrum_error(&x, &long.values);
    assert!(long_err <= short_err + 0.01);
}

// ─── Decoupling ─────────────────────────────────────────────────────────────

#[test]
fn test_surrogates_destroy_coupling() {
    let (a, b) = correlated_pair(1000, 0.9, Some(8));
    assert!(whole_sequence_correlation(&a, &b, None) > 0.85);

    let ta = SurrogateTemplate::new(&a).unwrap();
    let tb = SurrogateTemplate::new(&b).unwrap();
    let mut sum = 0.0;
    let trials = 20;
    for i in 0..trials {
        let sa = ta.generate(2 * i);
        let sb = tb.generate(2 * i + 1);
        let r = whole_sequence_correlation(&sa, &sb, None);
        assert!(r.abs() < 0.2, "surrogate pair {i} still coupled: r = {r}");
        sum += r;
    }
    assert!((sum / trials as f64).abs() < 0.05);
}

#[test]
fn test_delayed_coupling_seen_with_shift() {
    let a = white_noise(2000, Some(9));
    let b = delayed_copy(&a, 3, 0.5, Some(10));
    let zero_lag = whole_sequence_correlation(&a, &b, None);
    let shifted = whole_sequence_correlation(&a, &b, Some(3));
    assert!(zero_lag.abs() < 0.1);
    // Only the b-lags-a half of the symmetrised coefficient sees the coupling
    assert!(shifted > 0.3 && shifted < 0.5);
}

#[test]
fn test_template_rejects_bad_sequences() {
    assert!(SurrogateTemplate::new(&[]).is_err());
    assert!(SurrogateTemplate::new(&[1.0, f64::NAN, 2.0]).is_err());
}
