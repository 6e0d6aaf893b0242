//! Polyvox Analysis - spectrum tap for the polyvox voice engine
//!
//! - [`fft`] - FFT wrapper with windowing functions
//! - [`analyser`] - Smoothed magnitude spectrum in bytes and decibels
//!
//! The engine copies the most recent `fft_size` samples of its master output
//! into a [`SpectrumAnalyser`] whenever a visualiser asks for data.
//!
//! ```rust
//! use polyvox_analysis::SpectrumAnalyser;
//!
//! let sr = 48000.0;
//! let frame: Vec<f32> = (0..2048)
//!     .map(|i| (2.0 * std::f32::consts::PI * 3000.0 * i as f32 / sr).sin())
//!     .collect();
//!
//! let mut analyser = SpectrumAnalyser::new(2048, 0.0, -100.0, -30.0);
//! analyser.process(&frame);
//! assert_eq!(analyser.byte_frequency_data()[128], 255);
//! ```

pub mod analyser;
pub mod fft;

pub use analyser::SpectrumAnalyser;
pub use fft::{Fft, Window};
