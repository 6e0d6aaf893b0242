//! The parameter set a host edits and the engine reads.

use polyvox_core::{BiquadKind, Waveform};
use serde::{Deserialize, Serialize};

/// Oscillator shape selected for every voice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveformKind {
    /// Pure tone.
    #[default]
    Sine,
    /// Hollow, odd harmonics.
    Square,
    /// Soft, odd harmonics.
    Triangle,
    /// Bright, all harmonics.
    Sawtooth,
}

impl From<WaveformKind> for Waveform {
    fn from(kind: WaveformKind) -> Self {
        match kind {
            WaveformKind::Sine => Waveform::Sine,
            WaveformKind::Square => Waveform::Square,
            WaveformKind::Triangle => Waveform::Triangle,
            WaveformKind::Sawtooth => Waveform::Sawtooth,
        }
    }
}

/// Response of the per-voice filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Low-pass.
    #[default]
    Lowpass,
    /// Band-pass.
    Bandpass,
    /// High-pass.
    Highpass,
}

impl From<FilterKind> for BiquadKind {
    fn from(kind: FilterKind) -> Self {
        match kind {
            FilterKind::Lowpass => BiquadKind::Lowpass,
            FilterKind::Bandpass => BiquadKind::Bandpass,
            FilterKind::Highpass => BiquadKind::Highpass,
        }
    }
}

/// Every knob of the synth.
///
/// Values are stored as given; the engine tolerates out-of-range input
/// (voice count below one is treated as one, non-positive envelope times
/// as a minimal ramp).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthParams {
    /// Oscillator waveform.
    pub waveform: WaveformKind,
    /// Filter response.
    pub filter_kind: FilterKind,
    /// Filter cutoff in Hz.
    pub filter_cutoff: f32,
    /// Filter quality factor.
    pub filter_q: f32,
    /// Route voices through their filter.
    pub filter_enabled: bool,
    /// Oscillators per held note.
    pub voices: u32,
    /// Total detune spread across a bank, in cents.
    pub detune_cents: f32,
    /// Vibrato LFO rate in Hz.
    pub vibrato_rate: f32,
    /// Vibrato depth in cents.
    pub vibrato_depth: f32,
    /// Attack time in seconds.
    pub attack: f32,
    /// Release time in seconds.
    pub release: f32,
    /// Master volume, 0 to 1.
    pub master_volume: f32,
}

impl Default for SynthParams {
    fn default() -> Self {
        Self {
            waveform: WaveformKind::Sine,
            filter_kind: FilterKind::Lowpass,
            filter_cutoff: 800.0,
            filter_q: 1.0,
            filter_enabled: true,
            voices: 1,
            detune_cents: 0.0,
            vibrato_rate: 5.0,
            vibrato_depth: 0.0,
            attack: 0.01,
            release: 0.3,
            master_volume: 1.0,
        }
    }
}

impl SynthParams {
    /// Voice count with the lower bound applied.
    pub fn voice_count(&self) -> usize {
        self.voices.max(1) as usize
    }

    /// Whether any setting of the per-voice filter differs from `other`.
    pub(crate) fn filter_differs(&self, other: &Self) -> bool {
        self.filter_kind != other.filter_kind
            || self.filter_cutoff != other.filter_cutoff
            || self.filter_q != other.filter_q
    }
}
