//! Demo 04: Whole-Sequence Correlation
//!
//! Correlation and p-value matrices over entire sequences, with and without
//! the shift, including a node holding NaN.

use std::io;
use xcorr_timescale::format::{write_grid, Separator};
use xcorr_timescale::simulation::{delayed_copy, white_noise};
use xcorr_timescale::{AnalysisConfig, PValueMethod, Result, Workspace};

fn main() -> Result<()> {
    println!("=== Demo 04: Whole-Sequence Correlation ===\n");

    let n = 500;
    let x = white_noise(n, Some(11));
    let y = delayed_copy(&x, 2, 0.7, Some(12));
    let mut z = white_noise(n, Some(13));
    z[100] = f64::NAN;
    let labels: Vec<String> = ["x", "y", "z"].iter().map(|s| s.to_string()).collect();
    let workspace = Workspace::new(labels, vec![x, y, z])?;
    println!("  validity: {:?}", workspace.validity());

    for (shift, method) in [
        (None, PValueMethod::FTest),
        (Some(2), PValueMethod::FTest),
        (Some(2), PValueMethod::Surrogate),
    ] {
        let config = AnalysisConfig {
            shift,
            method,
            trials: 200,
            seed: Some(3),
            ..Default::default()
        };
        println!("\n--- shift={shift:?}, method={method:?} ---");
        let Some(report) = workspace.whole_sequence(&config, &())?.complete() else {
            continue;
        };
        println!("  correlation:");
        write_grid(&mut io::stdout().lock(), &report.correlation, Separator::Space)?;
        if let Some(p) = &report.pvalue {
            println!("  p-values:");
            write_grid(&mut io::stdout().lock(), p, Separator::Space)?;
        }
    }

    println!("\n=== Done ===");
    Ok(())
}
