//! Biquad (bi-quadratic) filter used by the voice filter stage.
//!
//! Coefficient calculation uses the RBJ Audio EQ Cookbook formulas for the
//! three responses a voice can select: low-pass, band-pass, high-pass.

use core::f32::consts::PI;
use libm::{cosf, sinf};

use crate::math::flush_denormal;

/// Filter response selected for a biquad.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BiquadKind {
    /// Passes frequencies below the cutoff.
    #[default]
    Lowpass,
    /// Passes a band around the center frequency (constant 0 dB peak).
    Bandpass,
    /// Passes frequencies above the cutoff.
    Highpass,
}

/// Normalized biquad coefficients (`a0` already divided out).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiquadCoefficients {
    /// Feedforward coefficient for x[n]
    pub b0: f32,
    /// Feedforward coefficient for x[n-1]
    pub b1: f32,
    /// Feedforward coefficient for x[n-2]
    pub b2: f32,
    /// Feedback coefficient for y[n-1]
    pub a1: f32,
    /// Feedback coefficient for y[n-2]
    pub a2: f32,
}

impl BiquadCoefficients {
    /// Passthrough coefficients: `y[n] = x[n]`.
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Compute coefficients for `kind` at `frequency` Hz with quality factor `q`.
    ///
    /// The frequency is clamped to just below Nyquist and `q` to a small
    /// positive minimum, so any positive cutoff is accepted.
    pub fn new(kind: BiquadKind, frequency: f32, q: f32, sample_rate: f32) -> Self {
        let nyquist = sample_rate * 0.5;
        let frequency = frequency.clamp(1.0, nyquist * 0.999);
        let q = q.max(1e-4);

        let omega = 2.0 * PI * frequency / sample_rate;
        let cos_omega = cosf(omega);
        let sin_omega = sinf(omega);
        let alpha = sin_omega / (2.0 * q);

        let (b0, b1, b2) = match kind {
            BiquadKind::Lowpass => {
                let b1 = 1.0 - cos_omega;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            BiquadKind::Highpass => {
                let b1 = -(1.0 + cos_omega);
                (-b1 / 2.0, b1, -b1 / 2.0)
            }
            BiquadKind::Bandpass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        let a0_inv = 1.0 / a0;
        Self {
            b0: b0 * a0_inv,
            b1: b1 * a0_inv,
            b2: b2 * a0_inv,
            a1: a1 * a0_inv,
            a2: a2 * a0_inv,
        }
    }
}

/// Second-order IIR filter, Direct Form I.
///
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
///                - a1*y[n-1] - a2*y[n-2]
/// ```
#[derive(Debug, Clone)]
pub struct Biquad {
    coeffs: BiquadCoefficients,

    /// Input delay line: x[n-1], x[n-2]
    x1: f32,
    x2: f32,

    /// Output delay line: y[n-1], y[n-2]
    y1: f32,
    y2: f32,
}

impl Biquad {
    /// Creates a new biquad with passthrough coefficients.
    pub fn new() -> Self {
        Self {
            coeffs: BiquadCoefficients::IDENTITY,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Replace the coefficients, keeping the delay-line state.
    ///
    /// Keeping state is what lets cutoff sweeps stay click-free.
    #[inline]
    pub fn set_coefficients(&mut self, coeffs: BiquadCoefficients) {
        self.coeffs = coeffs;
    }

    /// Current coefficients.
    pub fn coefficients(&self) -> BiquadCoefficients {
        self.coeffs
    }

    /// Processes a single sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let c = &self.coeffs;
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2
            - c.a1 * self.y1
            - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = flush_denormal(output);

        output
    }

    /// Clears the delay lines without touching the coefficients.
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}
