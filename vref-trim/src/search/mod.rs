//! Bisection search for the trim level that puts the reference on a target voltage.
//!
//! The search walks an integer bracket `[a, b]` with floor midpoints. The measurement
//! is noisy, so the sign at `a` is sampled again on every iteration instead of being
//! cached from the first pass. Each narrowing decision compares two fresh readings.
//!
//! Because the midpoint floors, the bracket can stall at two adjacent levels. The
//! search stops when the midpoint is within tolerance or when the bracket has
//! collapsed to a single level, and fails once the iteration budget is spent.

use core::fmt;

use crate::diag::{DiagnosticSink, IterationRecord};
use crate::measure::Measure;
use crate::trim::{midpoint, TrimLevel, TrimRange};

/// Search configuration. Fixed for the duration of one search.
#[non_exhaustive]
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Trim levels the search may use.
    pub range: TrimRange,
    /// Target voltage, in volts.
    pub target_v: f32,
    /// Accept a midpoint whose error is at most this many millivolts.
    pub tolerance_mv: f32,
    /// Give up after this many iterations.
    pub max_iterations: u32,
}

impl Config {
    /// Default range, 1 mV tolerance and 20 iterations around `target_v`.
    pub fn new(target_v: f32) -> Self {
        Self {
            target_v,
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            range: TrimRange::DEFAULT,
            target_v: 3.3,
            tolerance_mv: 1.0,
            max_iterations: 20,
        }
    }
}

/// Search error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The iteration budget ran out before the midpoint came within tolerance or the
    /// bracket collapsed.
    SearchExhausted { iterations: u32 },
}

impl Error {
    /// Numeric stand-in for hosts that report the result as a single integer.
    /// Never a valid trim level.
    pub const SENTINEL: i16 = -1;

    pub fn sentinel(&self) -> i16 {
        Self::SENTINEL
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SearchExhausted { iterations } => {
                write!(f, "no convergence after {} iterations", iterations)
            }
        }
    }
}

/// Find the trim level whose measured output is closest to `config.target_v`.
///
/// Every iteration is reported to `sink` after the midpoint is measured and before
/// the bracket is narrowed. The sink never influences the result.
///
/// The initial bracket is the whole of `config.range`; no sign change across it is
/// checked. Since the midpoint floors, `config.range.max()` itself is never probed.
pub fn find_optimum_trim<M, S>(
    oracle: &mut M,
    config: &Config,
    sink: &mut S,
) -> Result<TrimLevel, Error>
where
    M: Measure + ?Sized,
    S: DiagnosticSink,
{
    let mut a = config.range.min();
    let mut b = config.range.max();

    // Get the reference moving toward the first midpoint before the loop starts.
    oracle.prime(midpoint(a, b));
    sink.begin();

    for iteration in 0..config.max_iterations {
        let mid = midpoint(a, b);
        let diff_mid = diff_mv(oracle.measure(mid), config.target_v);

        sink.record(&IterationRecord {
            iteration,
            a,
            b,
            midpoint: mid,
            diff_mv: diff_mid,
        });

        if diff_mid.abs() <= config.tolerance_mv || b.value() - a.value() < 1 {
            debug!("trim search done: trim={} after {} iterations", mid.value(), iteration + 1);
            return Ok(mid);
        }

        let diff_a = diff_mv(oracle.measure(a), config.target_v);
        if same_sign(diff_mid, diff_a) {
            a = mid;
        } else {
            b = mid;
        }
    }

    warn!("trim search exhausted after {} iterations", config.max_iterations);
    Err(Error::SearchExhausted {
        iterations: config.max_iterations,
    })
}

fn diff_mv(measured_v: f32, target_v: f32) -> f32 {
    (measured_v - target_v) * 1000.0
}

/// Strictly both negative or both positive. A zero on either side is not a match.
fn same_sign(x: f32, y: f32) -> bool {
    (x < 0.0 && y < 0.0) || (x > 0.0 && y > 0.0)
}
