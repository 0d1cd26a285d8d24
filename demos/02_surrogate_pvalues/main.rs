//! Demo 02: Surrogate P-Values
//!
//! Draws IAAFT surrogates, compares empirical p-values with the analytic
//! F-test and reports progress through a [`Controller`] callback.
//!
//! Set `RUST_LOG=xcorr_timescale=debug` to see the surrogate batches.

use tracing_subscriber::EnvFilter;
use xcorr_timescale::correlation::{build_diagram, DiagramLayout};
use xcorr_timescale::significance::{empirical_pvalue_diagram, SurrogateTest};
use xcorr_timescale::simulation::{ar1_sequence, correlated_pair};
use xcorr_timescale::surrogate::{amplitude_spectrum, SurrogateTemplate};
use xcorr_timescale::{Controller, IaaftOptions, Outcome, Result};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Demo 02: Surrogate P-Values ===\n");

    // --- Section 1: One surrogate ---
    println!("--- IAAFT surrogate of an AR(1) sequence ---");
    let x = ar1_sequence(512, 0.8, Some(1));
    let template = SurrogateTemplate::new(&x)?;
    let result = template.generate_with(3, &IaaftOptions::default());
    println!(
        "  iterations={}, converged={}",
        result.iterations, result.converged
    );
    let target = amplitude_spectrum(&x);
    let got = amplitude_spectrum(&result.values);
    let err: f64 = target
        .iter()
        .zip(got.iter())
        .map(|(t, g)| (t - g).abs())
        .sum::<f64>()
        / target.iter().sum::<f64>();
    println!("  relative amplitude error: {err:.4}");

    // --- Section 2: P-value diagram ---
    println!("\n--- Empirical vs analytic p-values (rho = 0.25) ---");
    let n = 800;
    let (a, b) = correlated_pair(n, 0.25, Some(5));
    let layout = DiagramLayout::new(n, 20, 4, None)?;
    let diagrams = build_diagram(&a, &b, &layout)?;

    let controller = Controller::with_callback(|percent, phase| {
        if percent % 25 == 0 {
            println!("  [{percent:>2}%] {phase}");
        }
    });
    let test = SurrogateTest {
        trials: 100,
        seed: Some(2024),
        ..Default::default()
    };
    let outcome = empirical_pvalue_diagram(&diagrams.correlation, &a, &b, &layout, &test, &controller)?;
    let pvalues = match outcome {
        Outcome::Complete(p) => p,
        Outcome::Cancelled => {
            println!("  cancelled");
            return Ok(());
        }
    };

    for l in 0..layout.num_scales() {
        let emp = pvalues.row(l);
        let fisher = diagrams.fisher_pvalue.row(l);
        let sig_emp = emp.iter().filter(|&&p| p < 0.01).count();
        let sig_f = fisher.iter().filter(|&&p| p < 0.01).count();
        println!(
            "  width {:>3}: surrogate {sig_emp:>2}/{n_pos}, F-test {sig_f:>2}/{n_pos}",
            layout.window_width(l),
            n_pos = emp.len()
        );
    }

    // --- Section 3: Cancellation ---
    println!("\n--- Cancelled test ---");
    let cancelled = Controller::new();
    cancelled.cancel();
    let outcome = empirical_pvalue_diagram(&diagrams.correlation, &a, &b, &layout, &test, &cancelled)?;
    println!("  cancelled: {}", outcome.is_cancelled());

    println!("\n=== Done ===");
    Ok(())
}
