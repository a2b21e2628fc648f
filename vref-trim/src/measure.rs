//! Measurement adapter: turns "program trim, wait, sample" into a voltage.
//!
//! The trim register is shared hardware state. Every [`Measure::measure`] call leaves
//! the hardware at the trim it was asked about, so two calls in sequence leave the
//! reference at the second trim.

use embedded_hal_1::delay::DelayNs;

use crate::adc::{self, Sample};
use crate::trim::TrimLevel;

/// A (possibly noisy) oracle from trim level to output voltage.
pub trait Measure {
    /// Program `trim`, let it settle, and return the measured voltage in volts.
    ///
    /// Repeated calls with the same trim may return different values.
    fn measure(&mut self, trim: TrimLevel) -> f32;

    /// Start moving toward `trim` without waiting for it to settle.
    fn prime(&mut self, _trim: TrimLevel) {}
}

impl<F> Measure for F
where
    F: FnMut(TrimLevel) -> f32,
{
    fn measure(&mut self, trim: TrimLevel) -> f32 {
        self(trim)
    }
}

/// Hardware primitives for the reference peripheral and its ADC channel.
pub trait VrefHardware {
    /// Apply the ADC configuration. Called once before any measurement.
    fn configure_adc(&mut self, config: &adc::Config);

    /// Write the trim register.
    fn set_trim(&mut self, level: TrimLevel);

    /// Whether the reference reports its output as settled.
    fn is_stable(&mut self) -> bool;

    /// Take one (averaged) conversion of the internal reference channel.
    fn read_stabilized_sample(&mut self) -> u16;

    /// Take one conversion of the bandgap channel.
    fn read_bandgap_sample(&mut self) -> u16;
}

/// Measurement adapter configuration.
#[non_exhaustive]
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub adc: adc::Config,
    /// Nominal internal reference voltage the ADC reads, in volts.
    pub reference_v: f32,
    /// Delay between `is_stable` polls.
    pub settle_poll_us: u32,
    /// Give up waiting for `is_stable` after this long and sample anyway.
    pub settle_timeout_us: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            adc: adc::Config::default(),
            reference_v: 1.20,
            settle_poll_us: 100,
            settle_timeout_us: 100_000,
        }
    }
}

/// [`Measure`] implementation on top of real (or simulated) reference hardware.
pub struct Measurement<H, D> {
    hw: H,
    delay: D,
    config: Config,
}

impl<H: VrefHardware, D: DelayNs> Measurement<H, D> {
    /// Wrap `hw`, applying `config.adc` once.
    pub fn new(mut hw: H, delay: D, config: Config) -> Self {
        hw.configure_adc(&config.adc);
        debug!(
            "adc configured: {} bits, {}x averaging",
            config.adc.resolution.bits(),
            config.adc.averaging.samples()
        );
        Self { hw, delay, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Full-scale code of the configured resolution.
    pub fn full_scale(&self) -> u16 {
        self.config.adc.resolution.full_scale()
    }

    /// Program `level` and block until the reference reports stable.
    ///
    /// The wait is bounded by `settle_timeout_us`; on timeout a warning is logged and
    /// the caller proceeds with whatever the output is.
    pub fn set_trim_and_wait(&mut self, level: TrimLevel) {
        self.hw.set_trim(level);
        self.wait_stable(level);
    }

    fn wait_stable(&mut self, level: TrimLevel) {
        let poll = self.config.settle_poll_us.max(1);
        let mut waited: u32 = 0;
        while !self.hw.is_stable() {
            if waited >= self.config.settle_timeout_us {
                warn!("vref not stable after {}us at trim {}", waited, level.value());
                return;
            }
            self.delay.delay_us(poll);
            waited = waited.saturating_add(poll);
        }
        trace!("vref stable after {}us at trim {}", waited, level.value());
    }

    /// Sample the internal reference channel at the current trim and convert.
    pub fn read_voltage(&mut self) -> f32 {
        let sample = Sample::new(self.hw.read_stabilized_sample());
        sample.to_reference_volts(self.config.reference_v, self.full_scale())
    }

    /// Sample the bandgap channel.
    pub fn read_bandgap(&mut self) -> Sample {
        Sample::new(self.hw.read_bandgap_sample())
    }

    /// Give back the hardware handle and delay.
    pub fn release(self) -> (H, D) {
        (self.hw, self.delay)
    }
}

impl<H: VrefHardware, D: DelayNs> Measure for Measurement<H, D> {
    fn measure(&mut self, trim: TrimLevel) -> f32 {
        self.set_trim_and_wait(trim);
        self.read_voltage()
    }

    fn prime(&mut self, trim: TrimLevel) {
        self.hw.set_trim(trim);
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;

    /// Linear reference with a settle counter and 16-bit quantisation.
    pub struct FakeVref {
        pub base_v: f32,
        pub step_v: f32,
        pub bandgap_v: f32,
        pub settle_polls: u32,
        pub trim: TrimLevel,
        pub trim_writes: u32,
        pub adc_configs: u32,
        pub full_scale: u16,
        pending: u32,
    }

    impl FakeVref {
        pub fn new(base_v: f32, step_v: f32) -> Self {
            Self {
                base_v,
                step_v,
                bandgap_v: 1.0,
                settle_polls: 0,
                trim: TrimLevel::default(),
                trim_writes: 0,
                adc_configs: 0,
                full_scale: 65535,
                pending: 0,
            }
        }

        pub fn output_v(&self) -> f32 {
            self.base_v + self.step_v * self.trim.value() as f32
        }
    }

    impl VrefHardware for FakeVref {
        fn configure_adc(&mut self, config: &adc::Config) {
            self.adc_configs += 1;
            self.full_scale = config.resolution.full_scale();
        }

        fn set_trim(&mut self, level: TrimLevel) {
            self.trim = level;
            self.trim_writes += 1;
            self.pending = self.settle_polls;
        }

        fn is_stable(&mut self) -> bool {
            if self.pending == 0 {
                true
            } else {
                self.pending -= 1;
                false
            }
        }

        fn read_stabilized_sample(&mut self) -> u16 {
            (1.20 / self.output_v() * self.full_scale as f32 + 0.5) as u16
        }

        fn read_bandgap_sample(&mut self) -> u16 {
            (self.bandgap_v / self.output_v() * self.full_scale as f32 + 0.5) as u16
        }
    }

    /// Counts requested delay instead of sleeping.
    #[derive(Default)]
    pub struct CountingDelay {
        pub total_ns: u64,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += ns as u64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{CountingDelay, FakeVref};
    use super::*;

    #[test]
    fn configures_adc_once() {
        let mut m = Measurement::new(FakeVref::new(3.0, 0.01), CountingDelay::default(), Config::default());
        m.measure(TrimLevel::new(1));
        m.measure(TrimLevel::new(2));
        let (hw, _) = m.release();
        assert_eq!(hw.adc_configs, 1);
    }

    #[test]
    fn measure_leaves_hardware_at_last_trim() {
        let mut m = Measurement::new(FakeVref::new(3.0, 0.01), CountingDelay::default(), Config::default());
        m.measure(TrimLevel::new(40));
        m.measure(TrimLevel::new(7));
        let (hw, _) = m.release();
        assert_eq!(hw.trim, TrimLevel::new(7));
    }

    #[test]
    fn measure_recovers_output_voltage() {
        let mut m = Measurement::new(FakeVref::new(3.0, 0.01), CountingDelay::default(), Config::default());
        let v = m.measure(TrimLevel::new(30));
        assert!((v - 3.3).abs() < 0.001, "got {v}");
    }

    #[test]
    fn waits_for_settle() {
        let mut hw = FakeVref::new(3.0, 0.01);
        hw.settle_polls = 5;
        let config = Config::default();
        let mut m = Measurement::new(hw, CountingDelay::default(), config);
        m.set_trim_and_wait(TrimLevel::new(3));
        let (_, delay) = m.release();
        assert_eq!(delay.total_ns, 5 * config.settle_poll_us as u64 * 1_000);
    }

    #[test]
    fn settle_wait_is_bounded() {
        let mut hw = FakeVref::new(3.0, 0.01);
        hw.settle_polls = u32::MAX;
        let mut config = Config::default();
        config.settle_poll_us = 10;
        config.settle_timeout_us = 50;
        let mut m = Measurement::new(hw, CountingDelay::default(), config);
        let v = m.measure(TrimLevel::new(0));
        let (_, delay) = m.release();
        assert_eq!(delay.total_ns, 50_000);
        assert!((v - 3.0).abs() < 0.001);
    }

    #[test]
    fn prime_writes_without_waiting() {
        let mut hw = FakeVref::new(3.0, 0.01);
        hw.settle_polls = 3;
        let mut m = Measurement::new(hw, CountingDelay::default(), Config::default());
        m.prime(TrimLevel::new(31));
        let (hw, delay) = m.release();
        assert_eq!(hw.trim, TrimLevel::new(31));
        assert_eq!(hw.trim_writes, 1);
        assert_eq!(delay.total_ns, 0);
    }

    #[test]
    fn closures_are_oracles() {
        let mut calls = 0;
        let mut oracle = |t: TrimLevel| {
            calls += 1;
            t.value() as f32
        };
        assert_eq!(oracle.measure(TrimLevel::new(4)), 4.0);
        oracle.prime(TrimLevel::new(9));
        assert_eq!(calls, 1);
    }
}
