//! Time-stamped parameter automation for click-free changes.
//!
//! Audio parameters (gain, frequency, detune, etc.) must never jump
//! instantaneously while a voice is sounding. Instead of changing a value
//! directly, callers schedule changes on the audio clock's timeline and the
//! render loop evaluates the timeline once per sample.
//!
//! ## Event Kinds
//!
//! - **Set value**: jump to a value at a given time
//! - **Linear ramp**: constant rate of change, ending at a value at a given time
//! - **Exponential ramp**: constant ratio of change, good for gain fades
//! - **Set target**: one-pole approach towards a target (RC-like response)
//!
//! Ramps start from the previous event on the timeline, or from the value the
//! parameter held when it was last evaluated if the timeline was empty.
//!
//! ## Usage
//!
//! ```rust
//! use polyvox_core::AudioParam;
//!
//! let mut gain = AudioParam::new(0.0);
//!
//! // Fade in over 10ms starting at t = 0
//! gain.set_value_at_time(0.0001, 0.0);
//! gain.linear_ramp_to_value_at_time(0.5, 0.010);
//!
//! // In the render loop, evaluate once per sample
//! let sample_rate = 48000.0;
//! for n in 0..480 {
//!     let _g = gain.advance(f64::from(n) / sample_rate);
//! }
//! assert!((gain.advance(0.010) - 0.5).abs() < 1e-6);
//! ```

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use libm::{expf, powf};

/// A single scheduled change on an [`AudioParam`] timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutomationEvent {
    /// Jump to `value` at `time`.
    SetValue {
        /// Time in seconds on the audio clock.
        time: f64,
        /// Value to jump to.
        value: f32,
    },
    /// Linear ramp from the previous event, reaching `value` at `time`.
    LinearRamp {
        /// End time in seconds.
        time: f64,
        /// Value reached at `time`.
        value: f32,
    },
    /// Exponential ramp from the previous event, reaching `value` at `time`.
    ExponentialRamp {
        /// End time in seconds.
        time: f64,
        /// Value reached at `time`. Must share the sign of the start value.
        value: f32,
    },
    /// Exponential approach towards `target` starting at `time`.
    SetTarget {
        /// Start time in seconds.
        time: f64,
        /// Value approached asymptotically.
        target: f32,
        /// Time constant in seconds (63.2% of the way after one constant).
        time_constant: f64,
    },
}

impl AutomationEvent {
    /// Time at which this event is ordered on the timeline.
    ///
    /// For ramps this is the end time; for set-value and set-target it is the
    /// start time.
    #[inline]
    pub fn time(&self) -> f64 {
        match *self {
            Self::SetValue { time, .. }
            | Self::LinearRamp { time, .. }
            | Self::ExponentialRamp { time, .. }
            | Self::SetTarget { time, .. } => time,
        }
    }

    #[inline]
    fn is_ramp(&self) -> bool {
        matches!(self, Self::LinearRamp { .. } | Self::ExponentialRamp { .. })
    }
}

/// An automatable audio parameter.
///
/// Holds an intrinsic value plus a time-ordered list of pending
/// [`AutomationEvent`]s. The owning node calls [`advance`](Self::advance)
/// with the audio clock time of every sample it renders; events whose time
/// has passed are consumed as the clock moves forward.
///
/// All scheduling methods return `&mut Self` so calls can be chained:
///
/// ```rust
/// use polyvox_core::AudioParam;
///
/// let mut gain = AudioParam::new(1.0);
/// gain.cancel_and_hold(0.5)
///     .exponential_ramp_to_value_at_time(0.0001, 0.8);
/// ```
#[derive(Debug, Clone)]
pub struct AudioParam {
    /// Most recently evaluated value
    value: f32,
    /// Value the parameter was created with
    default_value: f32,
    /// Pending events, sorted by [`AutomationEvent::time`]
    events: Vec<AutomationEvent>,
    /// Time of the last completed event (start point for ramps)
    anchor_time: f64,
    /// Value of the last completed event
    anchor_value: f32,
    /// Value at which the active set-target event started
    target_origin: Option<f32>,
}

impl AudioParam {
    /// Create a parameter with the given initial value and no automation.
    pub fn new(default_value: f32) -> Self {
        Self {
            value: default_value,
            default_value,
            events: Vec::new(),
            anchor_time: 0.0,
            anchor_value: default_value,
            target_origin: None,
        }
    }

    /// Current value, as of the last [`advance`](Self::advance).
    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Value the parameter was created with.
    #[inline]
    pub fn default_value(&self) -> f32 {
        self.default_value
    }

    /// Set the value immediately, outside of the automation timeline.
    ///
    /// Pending events still apply once their time is reached.
    pub fn set_value(&mut self, value: f32) {
        self.value = value;
        self.anchor_value = value;
    }

    /// Pending automation events in timeline order.
    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    /// Returns `true` if any automation is still pending.
    #[inline]
    pub fn has_automation(&self) -> bool {
        !self.events.is_empty()
    }

    /// Schedule a jump to `value` at `time`.
    pub fn set_value_at_time(&mut self, value: f32, time: f64) -> &mut Self {
        self.insert(AutomationEvent::SetValue { time, value });
        self
    }

    /// Schedule a linear ramp from the previous event to `value`, ending at `end_time`.
    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) -> &mut Self {
        self.insert(AutomationEvent::LinearRamp {
            time: end_time,
            value,
        });
        self
    }

    /// Schedule an exponential ramp from the previous event to `value`, ending at `end_time`.
    ///
    /// If the start value is zero or differs in sign from `value`, the
    /// parameter holds its start value and jumps to `value` at `end_time`.
    pub fn exponential_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) -> &mut Self {
        self.insert(AutomationEvent::ExponentialRamp {
            time: end_time,
            value,
        });
        self
    }

    /// Schedule an exponential approach towards `target`, beginning at `start_time`.
    ///
    /// A non-positive `time_constant` degenerates to [`set_value_at_time`](Self::set_value_at_time).
    pub fn set_target_at_time(
        &mut self,
        target: f32,
        start_time: f64,
        time_constant: f64,
    ) -> &mut Self {
        if time_constant <= 0.0 {
            return self.set_value_at_time(target, start_time);
        }
        self.insert(AutomationEvent::SetTarget {
            time: start_time,
            target,
            time_constant,
        });
        self
    }

    /// Remove every event scheduled at or after `cancel_time`.
    ///
    /// An in-progress set-target that started before `cancel_time` keeps
    /// running until a later event supersedes it.
    pub fn cancel_scheduled_values(&mut self, cancel_time: f64) -> &mut Self {
        self.events.retain(|e| e.time() < cancel_time);
        if !matches!(self.events.first(), Some(AutomationEvent::SetTarget { .. })) {
            self.target_origin = None;
        }
        self
    }

    /// Cancel pending automation from `time` on and pin the current value at `time`.
    ///
    /// This is the starting point for any new ramp on a parameter that may
    /// already be automated: the new ramp begins exactly where the old one
    /// was interrupted.
    pub fn cancel_and_hold(&mut self, time: f64) -> &mut Self {
        let held = self.value;
        self.cancel_scheduled_values(time);
        self.set_value_at_time(held, time)
    }

    /// Evaluate the timeline at `time` and return the parameter value.
    ///
    /// `time` must be non-decreasing across calls; events whose time has
    /// passed are consumed.
    pub fn advance(&mut self, time: f64) -> f32 {
        loop {
            let Some(&event) = self.events.first() else {
                self.anchor_time = time;
                self.anchor_value = self.value;
                break;
            };

            match event {
                AutomationEvent::SetValue { time: at, value } => {
                    if at > time {
                        break;
                    }
                    self.value = value;
                    self.complete(at, value);
                }
                AutomationEvent::LinearRamp { time: end, value } => {
                    if end <= time {
                        self.value = value;
                        self.complete(end, value);
                        continue;
                    }
                    let span = end - self.anchor_time;
                    self.value = if span <= 0.0 {
                        value
                    } else {
                        let frac = ((time - self.anchor_time) / span).clamp(0.0, 1.0) as f32;
                        self.anchor_value + (value - self.anchor_value) * frac
                    };
                    break;
                }
                AutomationEvent::ExponentialRamp { time: end, value } => {
                    if end <= time {
                        self.value = value;
                        self.complete(end, value);
                        continue;
                    }
                    let start = self.anchor_value;
                    let span = end - self.anchor_time;
                    self.value = if start == 0.0 || value == 0.0 || (start < 0.0) != (value < 0.0) {
                        start
                    } else if span <= 0.0 {
                        value
                    } else {
                        let frac = ((time - self.anchor_time) / span).clamp(0.0, 1.0) as f32;
                        start * powf(value / start, frac)
                    };
                    break;
                }
                AutomationEvent::SetTarget {
                    time: start,
                    target,
                    time_constant,
                } => {
                    if start > time {
                        break;
                    }
                    let origin = *self.target_origin.get_or_insert(self.value);
                    let elapsed = ((time - start) / time_constant) as f32;
                    self.value = target + (origin - target) * expf(-elapsed);

                    let superseded = self
                        .events
                        .get(1)
                        .is_some_and(|next| next.is_ramp() || next.time() <= time);
                    if !superseded {
                        break;
                    }
                    self.complete(time, self.value);
                }
            }
        }
        self.value
    }

    /// Pop the front event and make it the start point for what follows.
    fn complete(&mut self, time: f64, value: f32) {
        self.events.remove(0);
        self.anchor_time = time;
        self.anchor_value = value;
        self.target_origin = None;
    }

    fn insert(&mut self, event: AutomationEvent) {
        let at = event.time();
        if at.is_nan() {
            return;
        }
        // Events with equal times keep insertion order.
        let pos = self
            .events
            .iter()
            .position(|e| e.time() > at)
            .unwrap_or(self.events.len());
        self.events.insert(pos, event);
    }
}

impl Default for AudioParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}
