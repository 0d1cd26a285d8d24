//! Parallel iteration and bounded thread pools.
//!
//! With the `parallel` feature (default) independent units of work, such as
//! surrogate trials or node pairs, run on rayon. Without it every helper here
//! falls back to sequential iteration on the calling thread, so results are
//! identical either way.
//!
//! # Usage
//!
//! ```ignore
//! use crate::iter_maybe_parallel;
//!
//! let results: Vec<_> = iter_maybe_parallel!((0..n))
//!     .map(|i| expensive_computation(i))
//!     .collect();
//! ```

use crate::error::{Error, Result};

/// Macro for conditionally parallel iteration over ranges and owned collections.
///
/// When the `parallel` feature is enabled, uses `into_par_iter()`.
/// Otherwise, uses `into_iter()` for sequential execution.
#[macro_export]
macro_rules! iter_maybe_parallel {
    ($expr:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::iter::IntoParallelIterator;

            IntoParallelIterator::into_par_iter($expr)
        }
        #[cfg(not(feature = "parallel"))]
        {
            IntoIterator::into_iter($expr)
        }
    }};
}

/// Macro for conditionally parallel reference iteration over slices.
#[macro_export]
macro_rules! slice_maybe_parallel {
    ($expr:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            $expr.par_iter()
        }
        #[cfg(not(feature = "parallel"))]
        {
            $expr.iter()
        }
    }};
}

/// Number of units of work that run concurrently for a thread request.
///
/// `None` means "whatever the global pool offers"; without the `parallel`
/// feature the answer is always 1.
pub fn concurrency(threads: Option<usize>) -> usize {
    #[cfg(feature = "parallel")]
    {
        threads.unwrap_or_else(rayon::current_num_threads).max(1)
    }
    #[cfg(not(feature = "parallel"))]
    {
        let _ = threads;
        1
    }
}

/// Run `op` on a pool bounded to `threads` workers.
///
/// `None` runs on the global pool. A pool that cannot be created is reported
/// as a configuration error.
#[cfg(feature = "parallel")]
pub fn with_pool<R, F>(threads: Option<usize>, op: F) -> Result<R>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    match threads {
        None => Ok(op()),
        Some(0) => Err(Error::InvalidConfig(
            "thread count must be at least 1".to_string(),
        )),
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| Error::InvalidConfig(format!("cannot build thread pool: {e}")))?;
            Ok(pool.install(op))
        }
    }
}

/// Sequential fallback: `op` runs on the calling thread.
#[cfg(not(feature = "parallel"))]
pub fn with_pool<R, F>(threads: Option<usize>, op: F) -> Result<R>
where
    F: FnOnce() -> R,
{
    if threads == Some(0) {
        return Err(Error::InvalidConfig(
            "thread count must be at least 1".to_string(),
        ));
    }
    Ok(op())
}
