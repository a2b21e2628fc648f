//! Simulator configuration: HJSON file, overlaid by command-line flags.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use vref_trim::adc::{Averaging, Resolution};
use vref_trim::{Config, TrimRange};

/// Simulated reference behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Output at trim 0, in volts.
    pub base_v: f32,
    /// Output change per trim step, in millivolts. May be negative.
    pub slope_mv: f32,
    /// Peak uniform noise added to each conversion, in millivolts.
    pub noise_mv: f32,
    /// True bandgap voltage.
    pub bandgap_v: f32,
    /// `is_stable` polls that report "not yet" after each trim write.
    pub settle_polls: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            // Roughly the bench part: output falls ~1.3 mV per trim step.
            base_v: 3.37,
            slope_mv: -1.3,
            noise_mv: 0.3,
            bandgap_v: 1.0,
            settle_polls: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    pub target_v: f32,
    pub tolerance_mv: f32,
    pub max_iterations: u32,
    pub trim_min: u8,
    pub trim_max: u8,
    pub reference_v: f32,
    pub resolution_bits: u8,
    pub averaging: u8,
    pub bandgap_min_v: f32,
    pub bandgap_max_v: f32,
    pub seed: u64,
    pub runs: u32,
    pub model: ModelConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        let lib = Config::default();
        Self {
            target_v: lib.search.target_v,
            tolerance_mv: lib.search.tolerance_mv,
            max_iterations: lib.search.max_iterations,
            trim_min: lib.search.range.min().value(),
            trim_max: lib.search.range.max().value(),
            reference_v: lib.measure.reference_v,
            resolution_bits: lib.measure.adc.resolution.bits(),
            averaging: lib.measure.adc.averaging.samples(),
            bandgap_min_v: lib.bandgap.min_v,
            bandgap_max_v: lib.bandgap.max_v,
            seed: 0,
            runs: 1,
            model: ModelConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_hjson::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Library configuration for one calibration run.
    pub fn calibration(&self) -> Result<Config> {
        let Some(range) = TrimRange::new(self.trim_min, self.trim_max) else {
            bail!("trim_min {} is above trim_max {}", self.trim_min, self.trim_max);
        };
        let resolution = match self.resolution_bits {
            8 => Resolution::Bits8,
            10 => Resolution::Bits10,
            12 => Resolution::Bits12,
            16 => Resolution::Bits16,
            other => bail!("unsupported resolution: {other} bits"),
        };
        let averaging = match self.averaging {
            1 => Averaging::None,
            4 => Averaging::X4,
            8 => Averaging::X8,
            16 => Averaging::X16,
            32 => Averaging::X32,
            other => bail!("unsupported averaging: {other} samples"),
        };
        if self.runs == 0 {
            bail!("runs must be at least 1");
        }

        let mut config = Config::default();
        config.search.range = range;
        config.search.target_v = self.target_v;
        config.search.tolerance_mv = self.tolerance_mv;
        config.search.max_iterations = self.max_iterations;
        config.measure.reference_v = self.reference_v;
        config.measure.adc.resolution = resolution;
        config.measure.adc.averaging = averaging;
        config.bandgap.min_v = self.bandgap_min_v;
        config.bandgap.max_v = self.bandgap_max_v;
        Ok(config)
    }
}
