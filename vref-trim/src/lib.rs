#![no_std]
#![doc = include_str!("../README.md")]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod trim;
pub mod adc;
pub mod measure;
pub mod diag;
pub mod search;
pub mod report;

// Reexports
pub use diag::{DiagnosticSink, IterationRecord, LogSink, NoopSink};
pub use measure::{Measure, Measurement, VrefHardware};
pub use search::find_optimum_trim;
pub use trim::{TrimLevel, TrimRange};

/// Calibration configuration for one run.
pub mod config {
    use crate::{measure, report, search};

    /// Everything a host needs to set up the adapter, run one search and check the result.
    #[non_exhaustive]
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct Config {
        pub measure: measure::Config,
        pub search: search::Config,
        pub bandgap: report::BandgapWindow,
    }

    impl Default for Config {
        fn default() -> Self {
            Self {
                measure: measure::Config::default(),
                search: search::Config::default(),
                bandgap: report::BandgapWindow::default(),
            }
        }
    }
}
pub use config::Config;

/// Run a complete calibration on `hw`.
///
/// Configures the ADC, searches for the trim that brings the reference onto
/// `config.search.target_v`, then reprograms that trim and re-measures it for the
/// final report. Diagnostics go to `sink`.
///
/// Returns the hardware and delay back along with the outcome so the caller can keep
/// using the reference afterwards.
pub fn calibrate<H, D, S>(
    hw: H,
    delay: D,
    config: Config,
    sink: &mut S,
) -> (Result<report::CalibrationReport, search::Error>, H, D)
where
    H: VrefHardware,
    D: embedded_hal_1::delay::DelayNs,
    S: DiagnosticSink,
{
    let mut adapter = Measurement::new(hw, delay, config.measure);

    let outcome = find_optimum_trim(&mut adapter, &config.search, sink)
        .map(|trim| report::finish(&mut adapter, trim, &config.bandgap));

    match &outcome {
        Ok(r) => info!(
            "calibrated: trim={} vref={}V bandgap={}V ok={}",
            r.trim.value(),
            r.voltage_v,
            r.bandgap_v,
            r.bandgap_ok
        ),
        Err(e) => error!("calibration failed: {}", e),
    }

    let (hw, delay) = adapter.release();
    (outcome, hw, delay)
}
