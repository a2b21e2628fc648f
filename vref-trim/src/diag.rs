//! Per-iteration diagnostic records.
//!
//! Sinks only observe the search; whether anything is attached never changes the
//! result.

use core::fmt;

use crate::trim::TrimLevel;

/// Column names, in record field order.
pub const HEADER: &str = "iteration,a,b,midpoint,diff_mv";

/// Search state at one iteration, captured after measuring the midpoint and before
/// the bracket is narrowed.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IterationRecord {
    /// 0-based iteration index.
    pub iteration: u32,
    pub a: TrimLevel,
    pub b: TrimLevel,
    pub midpoint: TrimLevel,
    /// `measure(midpoint) - target`, in millivolts.
    pub diff_mv: f32,
}

impl fmt::Display for IterationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{:.2}",
            self.iteration, self.a, self.b, self.midpoint, self.diff_mv
        )
    }
}

/// Receiver for the diagnostic stream.
pub trait DiagnosticSink {
    /// Called once before the first record.
    fn begin(&mut self) {}

    fn record(&mut self, record: &IterationRecord);
}

impl<F> DiagnosticSink for F
where
    F: FnMut(&IterationRecord),
{
    fn record(&mut self, record: &IterationRecord) {
        self(record)
    }
}

/// Discards everything.
#[derive(Clone, Copy, Default, Debug)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn record(&mut self, _record: &IterationRecord) {}
}

/// Writes the header and every record through the crate's logger at `info` level.
#[derive(Clone, Copy, Default, Debug)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn begin(&mut self) {
        info!("{}", HEADER);
    }

    fn record(&mut self, r: &IterationRecord) {
        info!(
            "{},{},{},{},{}",
            r.iteration,
            r.a.value(),
            r.b.value(),
            r.midpoint.value(),
            r.diff_mv
        );
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::string::ToString;

    use super::*;

    #[test]
    fn record_renders_as_csv_line() {
        let r = IterationRecord {
            iteration: 4,
            a: TrimLevel::new(51),
            b: TrimLevel::new(55),
            midpoint: TrimLevel::new(53),
            diff_mv: -0.8412,
        };
        assert_eq!(r.to_string(), "4,51,55,53,-0.84");
        assert_eq!(HEADER.split(',').count(), r.to_string().split(',').count());
    }
}
