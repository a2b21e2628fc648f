//! Final check after a search: reprogram the chosen trim, re-measure, and read the
//! bandgap channel as an independent sanity check.

use embedded_hal_1::delay::DelayNs;

use crate::measure::{Measurement, VrefHardware};
use crate::trim::TrimLevel;

/// Acceptable bandgap voltage, inclusive.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BandgapWindow {
    pub min_v: f32,
    pub max_v: f32,
}

impl BandgapWindow {
    pub fn contains(&self, v: f32) -> bool {
        self.min_v <= v && v <= self.max_v
    }
}

impl Default for BandgapWindow {
    fn default() -> Self {
        // 1.00 V nominal, +-3%.
        Self {
            min_v: 0.97,
            max_v: 1.03,
        }
    }
}

/// State of the reference after calibration.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationReport {
    pub trim: TrimLevel,
    /// Reference voltage re-measured at `trim`.
    pub voltage_v: f32,
    /// Bandgap channel converted against `voltage_v`.
    pub bandgap_v: f32,
    pub bandgap_ok: bool,
}

/// Leave the hardware at `trim` and measure what it produces.
pub fn finish<H, D>(
    adapter: &mut Measurement<H, D>,
    trim: TrimLevel,
    window: &BandgapWindow,
) -> CalibrationReport
where
    H: VrefHardware,
    D: DelayNs,
{
    adapter.set_trim_and_wait(trim);
    let voltage_v = adapter.read_voltage();
    let full_scale = adapter.full_scale();
    let bandgap_v = adapter.read_bandgap().to_volts(voltage_v, full_scale);
    let bandgap_ok = window.contains(bandgap_v);

    if !bandgap_ok {
        warn!(
            "bandgap {}V outside {}..={}V at trim {}",
            bandgap_v,
            window.min_v,
            window.max_v,
            trim.value()
        );
    }

    CalibrationReport {
        trim,
        voltage_v,
        bandgap_v,
        bandgap_ok,
    }
}
