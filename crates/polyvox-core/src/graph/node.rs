//! Graph node types.
//!
//! Each node in the [`AudioGraph`](super::AudioGraph) has a [`NodeId`] and a
//! [`NodeKind`]. The kind determines which inputs it accepts, which
//! [`ParamKind`]s it exposes for automation and modulation, and how it renders
//! a block. The `NodeData` struct bundles the renderer with internal
//! bookkeeping (adjacency lists, output buffer, disposal time).

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::biquad::{Biquad, BiquadCoefficients, BiquadKind};
use crate::math::cents_to_ratio;
use crate::oscillator::{Oscillator, Waveform};
use crate::param::AudioParam;

use super::edge::EdgeId;

/// Unique identifier for a node in the audio graph.
///
/// Node IDs are assigned sequentially and never reused within a graph
/// instance, so a stale ID can never alias a newer node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// The role of a node in the audio graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Source: periodic waveform with frequency and detune parameters.
    Oscillator,
    /// Biquad filter with frequency and Q parameters.
    Filter,
    /// Multiplies its input by the gain parameter.
    Gain,
    /// Sink that records the most recent samples of its input.
    Analyser,
    /// Final output. Exactly one per graph.
    Destination,
}

impl NodeKind {
    /// Whether audio edges may arrive at this node.
    pub fn accepts_input(self) -> bool {
        !matches!(self, Self::Oscillator)
    }

    /// Whether this node produces a signal other nodes may consume.
    pub fn produces_output(self) -> bool {
        !matches!(self, Self::Analyser | Self::Destination)
    }

    /// Whether this node exposes `param`.
    pub fn has_param(self, param: ParamKind) -> bool {
        matches!(
            (self, param),
            (Self::Oscillator, ParamKind::Frequency | ParamKind::Detune)
                | (Self::Filter, ParamKind::Frequency | ParamKind::Q)
                | (Self::Gain, ParamKind::Gain)
        )
    }
}

/// Automatable parameters exposed by graph nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Oscillator or filter frequency in Hz.
    Frequency,
    /// Oscillator detune in cents.
    Detune,
    /// Filter quality factor.
    Q,
    /// Linear gain.
    Gain,
}

impl ParamKind {
    pub(crate) const COUNT: usize = 4;

    #[inline]
    pub(crate) fn slot(self) -> usize {
        match self {
            Self::Frequency => 0,
            Self::Detune => 1,
            Self::Q => 2,
            Self::Gain => 3,
        }
    }
}

/// Oscillator source state.
#[derive(Debug, Clone)]
pub(crate) struct OscillatorNode {
    pub osc: Oscillator,
    pub frequency: AudioParam,
    pub detune: AudioParam,
    pub start_time: f64,
    pub stop_time: Option<f64>,
}

/// Filter stage state. Coefficients are recomputed once per block when the
/// frequency, Q or response changed.
#[derive(Debug, Clone)]
pub(crate) struct FilterNode {
    pub biquad: Biquad,
    pub kind: BiquadKind,
    pub frequency: AudioParam,
    pub q: AudioParam,
    cached: Option<(BiquadKind, f32, f32)>,
}

/// Gain stage state.
#[derive(Debug, Clone)]
pub(crate) struct GainNode {
    pub gain: AudioParam,
}

/// Ring buffer of the most recent input samples.
#[derive(Debug, Clone)]
pub(crate) struct AnalyserNode {
    pub ring: Vec<f32>,
    pub write_pos: usize,
}

/// Per-kind renderer.
#[derive(Debug, Clone)]
pub(crate) enum Processor {
    Oscillator(OscillatorNode),
    Filter(FilterNode),
    Gain(GainNode),
    Analyser(AnalyserNode),
    Destination,
}

impl Processor {
    pub fn oscillator(waveform: Waveform, frequency: f32, sample_rate: f32, start: f64) -> Self {
        Self::Oscillator(OscillatorNode {
            osc: Oscillator::new(waveform, sample_rate),
            frequency: AudioParam::new(frequency),
            detune: AudioParam::new(0.0),
            start_time: start,
            stop_time: None,
        })
    }

    pub fn filter(kind: BiquadKind, frequency: f32, q: f32) -> Self {
        Self::Filter(FilterNode {
            biquad: Biquad::new(),
            kind,
            frequency: AudioParam::new(frequency),
            q: AudioParam::new(q),
            cached: None,
        })
    }

    pub fn gain(gain: f32) -> Self {
        Self::Gain(GainNode {
            gain: AudioParam::new(gain),
        })
    }

    pub fn analyser(size: usize) -> Self {
        Self::Analyser(AnalyserNode {
            ring: vec![0.0; size.max(1)],
            write_pos: 0,
        })
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Oscillator(_) => NodeKind::Oscillator,
            Self::Filter(_) => NodeKind::Filter,
            Self::Gain(_) => NodeKind::Gain,
            Self::Analyser(_) => NodeKind::Analyser,
            Self::Destination => NodeKind::Destination,
        }
    }

    pub fn param(&self, param: ParamKind) -> Option<&AudioParam> {
        match (self, param) {
            (Self::Oscillator(o), ParamKind::Frequency) => Some(&o.frequency),
            (Self::Oscillator(o), ParamKind::Detune) => Some(&o.detune),
            (Self::Filter(f), ParamKind::Frequency) => Some(&f.frequency),
            (Self::Filter(f), ParamKind::Q) => Some(&f.q),
            (Self::Gain(g), ParamKind::Gain) => Some(&g.gain),
            _ => None,
        }
    }

    pub fn param_mut(&mut self, param: ParamKind) -> Option<&mut AudioParam> {
        match (self, param) {
            (Self::Oscillator(o), ParamKind::Frequency) => Some(&mut o.frequency),
            (Self::Oscillator(o), ParamKind::Detune) => Some(&mut o.detune),
            (Self::Filter(f), ParamKind::Frequency) => Some(&mut f.frequency),
            (Self::Filter(f), ParamKind::Q) => Some(&mut f.q),
            (Self::Gain(g), ParamKind::Gain) => Some(&mut g.gain),
            _ => None,
        }
    }

    /// Render `output.len()` frames starting at clock time `t0`.
    ///
    /// `modulation[slot]` holds the summed signal of every edge connected to
    /// that parameter; it is only read when `connected[slot]` is set.
    pub fn render(
        &mut self,
        t0: f64,
        sample_rate: f32,
        input: &[f32],
        modulation: &[Vec<f32>; ParamKind::COUNT],
        connected: [bool; ParamKind::COUNT],
        output: &mut [f32],
    ) {
        let dt = 1.0 / f64::from(sample_rate);
        let modulated = |slot: usize, n: usize| {
            if connected[slot] {
                modulation[slot][n]
            } else {
                0.0
            }
        };

        match self {
            Self::Oscillator(node) => {
                let freq_slot = ParamKind::Frequency.slot();
                let detune_slot = ParamKind::Detune.slot();
                for (n, out) in output.iter_mut().enumerate() {
                    let t = t0 + n as f64 * dt;
                    let playing = t >= node.start_time && node.stop_time.is_none_or(|s| t < s);
                    if !playing {
                        *out = 0.0;
                        continue;
                    }
                    let freq = node.frequency.advance(t) + modulated(freq_slot, n);
                    let cents = node.detune.advance(t) + modulated(detune_slot, n);
                    *out = node.osc.advance(freq * cents_to_ratio(cents));
                }
            }
            Self::Filter(node) => {
                let freq = node.frequency.advance(t0) + modulated(ParamKind::Frequency.slot(), 0);
                let q = node.q.advance(t0) + modulated(ParamKind::Q.slot(), 0);
                let key = (node.kind, freq, q);
                if node.cached != Some(key) {
                    node.biquad
                        .set_coefficients(BiquadCoefficients::new(node.kind, freq, q, sample_rate));
                    node.cached = Some(key);
                }
                for (out, &x) in output.iter_mut().zip(input) {
                    *out = node.biquad.process(x);
                }
            }
            Self::Gain(node) => {
                let slot = ParamKind::Gain.slot();
                for (n, (out, &x)) in output.iter_mut().zip(input).enumerate() {
                    let t = t0 + n as f64 * dt;
                    *out = x * (node.gain.advance(t) + modulated(slot, n));
                }
            }
            Self::Analyser(node) => {
                let len = node.ring.len();
                for &x in input {
                    node.ring[node.write_pos] = x;
                    node.write_pos = (node.write_pos + 1) % len;
                }
                output.fill(0.0);
            }
            Self::Destination => {
                output.copy_from_slice(input);
            }
        }
    }
}

/// Internal bookkeeping for a node in the graph.
#[derive(Debug)]
pub(crate) struct NodeData {
    pub processor: Processor,
    /// Edges arriving at this node (audio and parameter).
    pub incoming: Vec<EdgeId>,
    /// Edges leaving this node.
    pub outgoing: Vec<EdgeId>,
    /// Output of the most recent render quantum.
    pub output: Vec<f32>,
    /// Clock time after which the node is removed from the graph.
    pub dispose_at: Option<f64>,
}

impl NodeData {
    pub fn new(processor: Processor, block_size: usize) -> Self {
        Self {
            processor,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            output: vec![0.0; block_size],
            dispose_at: None,
        }
    }
}
