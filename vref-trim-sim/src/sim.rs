//! Simulated reference peripheral and the host-side plumbing around it.

use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use embedded_hal_1::delay::DelayNs;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vref_trim::adc;
use vref_trim::diag::HEADER;
use vref_trim::{DiagnosticSink, IterationRecord, TrimLevel, VrefHardware};

use crate::config::ModelConfig;

/// Reference with a linear trim response, uniform noise and a settle delay.
///
/// The ADC reads a fixed internal reference (`reference_v`) against the trimmed
/// output, so codes fall as the output rises.
pub struct SimulatedVref {
    model: ModelConfig,
    reference_v: f32,
    rng: StdRng,
    full_scale: u16,
    averaging: u8,
    trim: TrimLevel,
    pending_polls: u32,
    trim_writes: u32,
}

impl SimulatedVref {
    pub fn new(model: ModelConfig, reference_v: f32, seed: u64) -> Self {
        Self {
            model,
            reference_v,
            rng: StdRng::seed_from_u64(seed),
            full_scale: adc::Resolution::Bits16.full_scale(),
            averaging: 1,
            trim: TrimLevel::default(),
            pending_polls: 0,
            trim_writes: 0,
        }
    }

    pub fn trim(&self) -> TrimLevel {
        self.trim
    }

    pub fn trim_writes(&self) -> u32 {
        self.trim_writes
    }

    /// Noise-free output at the current trim.
    pub fn ideal_output_v(&self) -> f32 {
        self.model.base_v + self.model.slope_mv / 1000.0 * self.trim.value() as f32
    }

    fn noisy_output_v(&mut self) -> f32 {
        let noise_v = if self.model.noise_mv > 0.0 {
            self.rng.gen_range(-self.model.noise_mv..=self.model.noise_mv) / 1000.0
        } else {
            0.0
        };
        self.ideal_output_v() + noise_v
    }

    /// Averaged conversion of `input_v` against the (noisy) output.
    fn convert(&mut self, input_v: f32) -> u16 {
        let n = self.averaging.max(1) as u32;
        let mut sum = 0u32;
        for _ in 0..n {
            let full_scale = self.full_scale as f32;
            let code = (input_v / self.noisy_output_v() * full_scale).round();
            sum += code.clamp(0.0, full_scale) as u32;
        }
        (sum / n) as u16
    }
}

impl VrefHardware for SimulatedVref {
    fn configure_adc(&mut self, config: &adc::Config) {
        self.full_scale = config.resolution.full_scale();
        self.averaging = config.averaging.samples();
    }

    fn set_trim(&mut self, level: TrimLevel) {
        self.trim = level;
        self.trim_writes += 1;
        self.pending_polls = self.model.settle_polls;
    }

    fn is_stable(&mut self) -> bool {
        if self.pending_polls == 0 {
            return true;
        }
        self.pending_polls -= 1;
        false
    }

    fn read_stabilized_sample(&mut self) -> u16 {
        self.convert(self.reference_v)
    }

    fn read_bandgap_sample(&mut self) -> u16 {
        self.convert(self.model.bandgap_v)
    }
}

/// `DelayNs` backed by `thread::sleep`.
#[derive(Clone, Copy, Default, Debug)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns as u64));
    }
}

/// Writes the diagnostic stream as CSV. The first write error is kept and reported by
/// [`CsvSink::finish`]; later records are dropped.
pub struct CsvSink<W: Write> {
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, error: None }
    }

    pub fn finish(mut self) -> io::Result<W> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn line(&mut self, args: std::fmt::Arguments<'_>) {
        if self.error.is_none() {
            if let Err(e) = self.out.write_fmt(args) {
                self.error = Some(e);
            }
        }
    }
}

impl<W: Write> DiagnosticSink for CsvSink<W> {
    fn begin(&mut self) {
        self.line(format_args!("{}\n", HEADER));
    }

    fn record(&mut self, record: &IterationRecord) {
        self.line(format_args!("{}\n", record));
    }
}
