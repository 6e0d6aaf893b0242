//! Smoothed magnitude spectrum of the master output.
//!
//! [`SpectrumAnalyser`] follows the browser analyser-node conventions a
//! visualiser expects: Blackman window, per-bin magnitude normalised by the
//! FFT size, exponential smoothing across frames, then mapping of the
//! `[min_decibels, max_decibels]` range onto bytes `0..=255`.

use crate::fft::{Fft, Window};
use polyvox_core::linear_to_db;

/// Frame-to-frame smoothed spectrum analyser.
///
/// ```rust
/// use polyvox_analysis::SpectrumAnalyser;
///
/// let mut analyser = SpectrumAnalyser::new(2048, 0.8, -100.0, -30.0);
/// analyser.process(&vec![0.0; 2048]);
/// assert_eq!(analyser.frequency_bin_count(), 1024);
/// assert!(analyser.byte_frequency_data().iter().all(|&b| b == 0));
/// ```
#[derive(Debug)]
pub struct SpectrumAnalyser {
    fft: Fft,
    window: Vec<f32>,
    scratch: Vec<f32>,
    magnitudes: Vec<f32>,
    smoothed: Vec<f32>,
    decibels: Vec<f32>,
    bytes: Vec<u8>,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
}

impl SpectrumAnalyser {
    /// Create an analyser for `fft_size`-sample frames.
    ///
    /// `smoothing` is clamped to `[0, 1]`; `fft_size` is expected to be a
    /// power of two (validated upstream by the engine configuration).
    pub fn new(fft_size: usize, smoothing: f32, min_decibels: f32, max_decibels: f32) -> Self {
        let fft_size = fft_size.max(2);
        let bins = fft_size / 2;
        Self {
            fft: Fft::new(fft_size),
            window: Window::Blackman.coefficients(fft_size),
            scratch: vec![0.0; fft_size],
            magnitudes: vec![0.0; bins],
            smoothed: vec![0.0; bins],
            decibels: vec![min_decibels; bins],
            bytes: vec![0; bins],
            smoothing: smoothing.clamp(0.0, 1.0),
            min_decibels,
            max_decibels,
        }
    }

    /// FFT frame size in samples.
    pub fn fft_size(&self) -> usize {
        self.fft.size()
    }

    /// Number of frequency bins, always `fft_size / 2`.
    pub fn frequency_bin_count(&self) -> usize {
        self.smoothed.len()
    }

    /// Centre frequency of `bin` in Hz.
    pub fn bin_frequency(&self, bin: usize, sample_rate: f32) -> f32 {
        bin as f32 * sample_rate / self.fft.size() as f32
    }

    /// Analyse one frame of time-domain samples, oldest first.
    ///
    /// Frames shorter than the FFT size are zero-padded at the end.
    pub fn process(&mut self, frame: &[f32]) {
        let n = self.fft.size();
        let used = frame.len().min(n);
        self.scratch[..used].copy_from_slice(&frame[..used]);
        self.scratch[used..].fill(0.0);
        for (s, w) in self.scratch.iter_mut().zip(&self.window) {
            *s *= w;
        }

        self.fft.magnitudes(&self.scratch, &mut self.magnitudes);

        let scale = 1.0 / n as f32;
        let range = self.max_decibels - self.min_decibels;
        for (i, &mag) in self.magnitudes.iter().enumerate() {
            let current = mag * scale;
            let smoothed = self.smoothing * self.smoothed[i] + (1.0 - self.smoothing) * current;
            let smoothed = if smoothed.is_finite() { smoothed } else { 0.0 };
            self.smoothed[i] = smoothed;

            let db = linear_to_db(smoothed);
            self.decibels[i] = db;

            let scaled = if range > 0.0 {
                255.0 * (db - self.min_decibels) / range
            } else {
                0.0
            };
            self.bytes[i] = scaled.clamp(0.0, 255.0) as u8;
        }
    }

    /// Smoothed spectrum in bytes, one per bin.
    pub fn byte_frequency_data(&self) -> &[u8] {
        &self.bytes
    }

    /// Smoothed spectrum in decibels, one per bin.
    ///
    /// Silent bins report negative infinity.
    pub fn float_frequency_data(&self) -> &[f32] {
        &self.decibels
    }

    /// Forget all smoothing history.
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
        self.decibels.fill(self.min_decibels);
        self.bytes.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn tone(freq: f32, sr: f32, len: usize, amp: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amp * (2.0 * PI * freq * i as f32 / sr).sin())
            .collect()
    }

    #[test]
    fn smoothing_zero_tracks_latest_frame() {
        let mut analyser = SpectrumAnalyser::new(1024, 0.0, -100.0, -30.0);
        analyser.process(&tone(1500.0, 48000.0, 1024, 1.0));
        assert!(analyser.byte_frequency_data()[32] > 200);

        analyser.process(&vec![0.0; 1024]);
        assert!(analyser.byte_frequency_data().iter().all(|&b| b == 0));
    }

    #[test]
    fn smoothing_decays_gradually() {
        let mut analyser = SpectrumAnalyser::new(1024, 0.8, -100.0, -30.0);
        analyser.process(&tone(1500.0, 48000.0, 1024, 1.0));
        let loud = analyser.float_frequency_data()[32];
        analyser.process(&vec![0.0; 1024]);
        let decayed = analyser.float_frequency_data()[32];
        // One frame of silence at 0.8 smoothing: -20*log10(0.8) ≈ 1.94 dB down
        assert!((loud - decayed - 1.94).abs() < 0.05, "{} -> {}", loud, decayed);
    }

    #[test]
    fn short_frames_are_padded() {
        let mut analyser = SpectrumAnalyser::new(256, 0.8, -100.0, -30.0);
        analyser.process(&[0.5; 10]);
        assert_eq!(analyser.byte_frequency_data().len(), 128);
    }

    #[test]
    fn reset_clears_history() {
        let mut analyser = SpectrumAnalyser::new(512, 0.9, -100.0, -30.0);
        analyser.process(&tone(3000.0, 48000.0, 512, 1.0));
        analyser.reset();
        assert!(analyser.byte_frequency_data().iter().all(|&b| b == 0));
    }
}
