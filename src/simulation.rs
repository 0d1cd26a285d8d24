//! Synthetic sequences for tests, benchmarks and demos.
//!
//! Every generator takes an optional seed: `Some(s)` gives a reproducible
//! sequence, `None` draws from entropy.

use rand::prelude::*;
use rand_distr::StandardNormal;

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

#[inline]
fn normal(rng: &mut StdRng) -> f64 {
    rng.sample::<f64, _>(StandardNormal)
}

/// Independent standard normal samples.
pub fn white_noise(n: usize, seed: Option<u64>) -> Vec<f64> {
    let mut rng = make_rng(seed);
    (0..n).map(|_| normal(&mut rng)).collect()
}

/// First-order autoregressive sequence `x[t] = phi * x[t-1] + e[t]`.
///
/// For `|phi| < 1` the first sample is drawn from the stationary
/// distribution, so the sequence has no burn-in transient.
///
/// # Arguments
/// * `n` - Number of samples
/// * `phi` - Autoregressive coefficient
/// * `seed` - Optional random seed
pub fn ar1_sequence(n: usize, phi: f64, seed: Option<u64>) -> Vec<f64> {
    let mut rng = make_rng(seed);
    let mut out = Vec::with_capacity(n);
    if n == 0 {
        return out;
    }
    let stationary_sd = if phi.abs() < 1.0 {
        (1.0 / (1.0 - phi * phi)).sqrt()
    } else {
        1.0
    };
    let mut x = normal(&mut rng) * stationary_sd;
    out.push(x);
    for _ in 1..n {
        x = phi * x + normal(&mut rng);
        out.push(x);
    }
    out
}

/// Two standard normal sequences with correlation `rho` (clamped to [-1, 1]).
pub fn correlated_pair(n: usize, rho: f64, seed: Option<u64>) -> (Vec<f64>, Vec<f64>) {
    let mut rng = make_rng(seed);
    let rho = rho.clamp(-1.0, 1.0);
    let residual = (1.0 - rho * rho).sqrt();
    let mut a = Vec::with_capacity(n);
    let mut b = Vec::with_capacity(n);
    for _ in 0..n {
        let z1 = normal(&mut rng);
        let z2 = normal(&mut rng);
        a.push(z1);
        b.push(rho * z1 + residual * z2);
    }
    (a, b)
}

/// Copy of `source` delayed by `lag` samples, plus Gaussian noise.
///
/// `out[t] = source[t - lag] + noise_sd * e[t]`; the first `lag` samples,
/// which have no source counterpart, are fresh standard normal draws.
pub fn delayed_copy(source: &[f64], lag: usize, noise_sd: f64, seed: Option<u64>) -> Vec<f64> {
    let mut rng = make_rng(seed);
    (0..source.len())
        .map(|t| {
            let base = if t >= lag {
                source[t - lag]
            } else {
                normal(&mut rng)
            };
            base + noise_sd * normal(&mut rng)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::pearson_correlation;
    use crate::helpers::mean;

    #[test]
    fn test_seeded_reproducible() {
        assert_eq!(white_noise(20, Some(1)), white_noise(20, Some(1)));
        assert_ne!(white_noise(20, Some(1)), white_noise(20, Some(2)));
        assert_eq!(ar1_sequence(20, 0.5, Some(3)), ar1_sequence(20, 0.5, Some(3)));
        assert!(ar1_sequence(0, 0.5, Some(3)).is_empty());
    }

    #[test]
    fn test_white_noise_moments() {
        let x = white_noise(20_000, Some(4));
        let m = mean(&x);
        let var = x.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / x.len() as f64;
        assert!(m.abs() < 0.05);
        assert!((var - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_ar1_lag_one_correlation() {
        let x = ar1_sequence(20_000, 0.7, Some(5));
        let r = pearson_correlation(&x[1..], &x[..x.len() - 1]);
        assert!((r - 0.7).abs() < 0.03);
    }

    #[test]
    fn test_correlated_pair() {
        let (a, b) = correlated_pair(20_000, 0.6, Some(6));
        assert!((pearson_correlation(&a, &b) - 0.6).abs() < 0.03);
        let (c, d) = correlated_pair(100, 1.5, Some(7));
        assert!((pearson_correlation(&c, &d) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_delayed_copy() {
        let a = white_noise(100, Some(8));
        let b = delayed_copy(&a, 5, 0.0, Some(9));
        assert_eq!(&b[5..], &a[..95]);
        assert_eq!(b.len(), 100);
    }
}
