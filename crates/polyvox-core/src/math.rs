//! Mathematical utility functions for DSP.
//!
//! All functions are allocation-free and suitable for `no_std`.
//!
//! - [`db_to_linear`] / [`linear_to_db`] - Convert between dB and linear gain
//! - [`cents_to_ratio`] - Pitch offset in cents to frequency ratio
//! - [`flush_denormal`] - Keep filter state out of the denormal range

use libm::{expf, log10f, powf};

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use polyvox_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels.
///
/// Non-positive input returns `f32::NEG_INFINITY`.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        return f32::NEG_INFINITY;
    }
    20.0 * log10f(linear)
}

/// Convert a pitch offset in cents to a frequency ratio.
///
/// 100 cents = 1 semitone, 1200 cents = 1 octave.
///
/// # Example
/// ```rust
/// use polyvox_core::cents_to_ratio;
///
/// assert_eq!(cents_to_ratio(0.0), 1.0);
/// assert!((cents_to_ratio(1200.0) - 2.0).abs() < 1e-6);
/// ```
#[inline]
pub fn cents_to_ratio(cents: f32) -> f32 {
    powf(2.0, cents / 1200.0)
}

/// Flush denormal numbers to zero.
///
/// IIR filters decaying towards silence can produce denormals, which are
/// very slow on most CPUs.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_round_trip_at_unity() {
        assert!((linear_to_db(db_to_linear(0.0))).abs() < 1e-5);
    }

    #[test]
    fn linear_to_db_of_silence_is_negative_infinity() {
        assert_eq!(linear_to_db(0.0), f32::NEG_INFINITY);
    }

    #[test]
    fn cents_to_ratio_octave_down() {
        assert!((cents_to_ratio(-1200.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn flush_denormal_keeps_audible_values() {
        assert_eq!(flush_denormal(1e-30), 0.0);
        assert_eq!(flush_denormal(0.25), 0.25);
    }
}
