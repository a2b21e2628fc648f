//! ADC (Analog-to-Digital Converter) settings used while measuring the reference.
//!
//! The settings are applied once, before any search starts, and are never changed
//! mid-search.

/// Number of hardware samples averaged into one conversion result.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Averaging {
    None,
    X4,
    X8,
    X16,
    X32,
}

impl Averaging {
    pub fn samples(&self) -> u8 {
        match self {
            Averaging::None => 1,
            Averaging::X4 => 4,
            Averaging::X8 => 8,
            Averaging::X16 => 16,
            Averaging::X32 => 32,
        }
    }
}

/// Conversion result width.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    Bits8,
    Bits10,
    Bits12,
    Bits16,
}

impl Resolution {
    pub fn bits(&self) -> u8 {
        match self {
            Resolution::Bits8 => 8,
            Resolution::Bits10 => 10,
            Resolution::Bits12 => 12,
            Resolution::Bits16 => 16,
        }
    }

    /// Largest code the converter can return at this resolution.
    pub fn full_scale(&self) -> u16 {
        ((1u32 << self.bits()) - 1) as u16
    }
}

/// Conversion clock speed. Slower conversions are quieter.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConversionSpeed {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

/// Sample-and-hold time. Longer sampling suits high-impedance sources.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SamplingSpeed {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

/// ADC configuration.
#[non_exhaustive]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub averaging: Averaging,
    pub resolution: Resolution,
    pub conversion_speed: ConversionSpeed,
    pub sampling_speed: SamplingSpeed,
}

impl Default for Config {
    fn default() -> Self {
        // Slowest, most heavily averaged setup; the reference is DC.
        Self {
            averaging: Averaging::X32,
            resolution: Resolution::Bits16,
            conversion_speed: ConversionSpeed::VeryLow,
            sampling_speed: SamplingSpeed::VeryLow,
        }
    }
}

/// Raw ADC conversion result.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct Sample(u16);

impl Sample {
    pub fn new(code: u16) -> Self {
        Self(code)
    }

    /// Get the raw sample value.
    pub fn value(&self) -> u16 {
        self.0
    }

    /// Convert a reading of the internal reference into the voltage the converter is
    /// referenced to: `reference_v / code * full_scale`.
    ///
    /// A zero code gives `f32::INFINITY`.
    pub fn to_reference_volts(&self, reference_v: f32, full_scale: u16) -> f32 {
        reference_v / self.0 as f32 * full_scale as f32
    }

    /// Convert the sample to volts against a known converter reference.
    pub fn to_volts(&self, reference_v: f32, full_scale: u16) -> f32 {
        self.0 as f32 / full_scale as f32 * reference_v
    }
}
