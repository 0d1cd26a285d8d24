//! # xcorr-timescale
//!
//! Time-scale resolved cross-correlation with surrogate significance testing.
//!
//! The crate infers functional connectivity between the nodes of a network
//! (one time series per node) at several temporal resolutions:
//! - Windowed correlation diagrams over a range of window widths
//! - IAAFT surrogates preserving amplitude distribution and power spectrum
//! - Empirical (surrogate) and analytic (F-test) p-value diagrams
//! - Efficiency curves and onset time-scale matrices
//!
//! ## Data Layout
//!
//! Diagrams are row-major [`Grid`]s indexed `[time-scale][window position]`:
//! row `l` uses windows of `(l+1)·L` samples, and window centres advance by
//! `L` samples from column to column.
//!
//! ## Example
//!
//! ```
//! use xcorr_timescale::{simulation, AnalysisConfig, PValueMethod, Workspace};
//!
//! let (a, b) = simulation::correlated_pair(400, 0.8, Some(1));
//! let c = simulation::white_noise(400, Some(2));
//! let labels = vec!["a".to_string(), "b".to_string(), "c".to_string()];
//! let workspace = Workspace::new(labels, vec![a, b, c]).unwrap();
//!
//! let config = AnalysisConfig {
//!     base_width: 10,
//!     num_scales: 4,
//!     method: PValueMethod::FTest,
//!     ..Default::default()
//! };
//! let report = workspace.run(&config, &()).unwrap().complete().unwrap();
//! let onset = report.onset.unwrap();
//! assert_eq!(onset.shape(), (3, 3));
//! ```

#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

pub mod parallel;

pub mod config;
pub mod correlation;
pub mod efficiency;
pub mod error;
pub mod format;
pub mod grid;
pub mod helpers;
pub mod monitor;
pub mod significance;
pub mod simulation;
pub mod special;
pub mod surrogate;
pub mod timescale;
pub mod workspace;

pub use error::{Error, Result};
pub use grid::{CorrelationDiagram, Grid, OnsetMatrix, PValueDiagram};
pub use helpers::{DEFAULT_CONVERGENCE_TOL, DEFAULT_MAX_ITERATIONS, NUMERICAL_EPS};

// Re-export the pipeline types
pub use config::{AnalysisConfig, AnalysisTarget};
pub use monitor::{Controller, Monitor, Outcome};
pub use workspace::{AnalysisReport, WholeSequenceReport, Workspace};

// Re-export building blocks
pub use correlation::{build_diagram, correlation_diagram, CorrelationDiagrams, DiagramLayout};
pub use efficiency::{compute_efficiency, window_widths, wmatrix_element};
pub use significance::{empirical_pvalue_diagram, PValueMethod, SurrogateTest};
pub use surrogate::{generate_surrogate, IaaftOptions, IaaftResult, SurrogateTemplate};
pub use timescale::{build_matrix, merge_recordings, merge_systems, EfficiencyTable, NodePair};
