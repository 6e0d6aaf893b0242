//! Voice chains and the banks that group them per held note.
//!
//! A [`VoiceChain`] is one oscillator with its own filter and gain stage.
//! A [`VoiceBank`] is every chain sounding for one note; its size is the
//! voice count at the moment the note was pressed.

use polyvox_core::{AudioGraph, GraphError, NodeId, ParamKind};

/// MIDI note number of concert A.
const A4_NOTE: i32 = 69;

/// Frequency of concert A in Hz.
const A4_HZ: f32 = 440.0;

/// Equal-tempered frequency of a MIDI note, A4 = 440 Hz.
///
/// ```rust
/// use polyvox_synth::midi_to_freq;
///
/// assert_eq!(midi_to_freq(69), 440.0);
/// assert!((midi_to_freq(60) - 261.6256).abs() < 1e-3);
/// ```
pub fn midi_to_freq(note: u8) -> f32 {
    A4_HZ * 2.0f32.powf((i32::from(note) - A4_NOTE) as f32 / 12.0)
}

/// Detune of each voice in a bank, spread evenly across `spread_cents`.
///
/// Voice `i` of `count` sits at `i * spread / (count - 1) - spread / 2`, so
/// the offsets are symmetric around zero. A single voice is never detuned.
///
/// ```rust
/// use polyvox_synth::detune_offsets;
///
/// assert_eq!(detune_offsets(1, 50.0), vec![0.0]);
/// assert_eq!(detune_offsets(2, 20.0), vec![-10.0, 10.0]);
/// ```
pub fn detune_offsets(count: usize, spread_cents: f32) -> Vec<f32> {
    if count <= 1 {
        return vec![0.0; count];
    }
    let step = spread_cents / (count - 1) as f32;
    (0..count)
        .map(|i| i as f32 * step - spread_cents / 2.0)
        .collect()
}

/// Signal path of a voice chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Routing {
    /// oscillator → filter → gain
    ThroughFilter,
    /// oscillator → gain; the filter stays allocated but unconnected
    Direct,
}

impl Routing {
    /// Routing for a filter-enabled flag.
    pub fn for_filter(enabled: bool) -> Self {
        if enabled {
            Self::ThroughFilter
        } else {
            Self::Direct
        }
    }
}

/// One oscillator with its filter and gain stage.
#[derive(Clone, Debug, PartialEq)]
pub struct VoiceChain {
    /// Sound source.
    pub oscillator: NodeId,
    /// Per-voice filter, present even when routed around.
    pub filter: NodeId,
    /// Envelope and level stage, always feeding the master bus.
    pub gain: NodeId,
    routing: Routing,
}

impl VoiceChain {
    pub(crate) fn new(oscillator: NodeId, filter: NodeId, gain: NodeId, routing: Routing) -> Self {
        Self {
            oscillator,
            filter,
            gain,
            routing,
        }
    }

    /// Current signal path.
    pub fn routing(&self) -> Routing {
        self.routing
    }

    /// All three node handles.
    pub fn nodes(&self) -> [NodeId; 3] {
        [self.oscillator, self.filter, self.gain]
    }

    /// Connect the chain per its routing, ending at `output`.
    pub(crate) fn wire(&self, graph: &mut AudioGraph, output: NodeId) -> Result<(), GraphError> {
        match self.routing {
            Routing::ThroughFilter => {
                graph.connect(self.oscillator, self.filter)?;
                graph.connect(self.filter, self.gain)?;
            }
            Routing::Direct => {
                graph.connect(self.oscillator, self.gain)?;
            }
        }
        graph.connect(self.gain, output)?;
        Ok(())
    }

    /// Switch to `routing`, reconnecting every stage.
    ///
    /// Returns `Ok(false)` without touching the graph when the chain is
    /// already routed that way.
    pub(crate) fn rewire(
        &mut self,
        graph: &mut AudioGraph,
        routing: Routing,
        output: NodeId,
    ) -> Result<bool, GraphError> {
        if self.routing == routing {
            return Ok(false);
        }
        for node in self.nodes() {
            graph.disconnect(node)?;
        }
        self.routing = routing;
        self.wire(graph, output)?;
        Ok(true)
    }

    /// Fade the gain from its current value to `floor` by `fade_end`, then
    /// stop the oscillator and dispose every stage at `stop_at`.
    ///
    /// Every step is attempted; the first failure is returned.
    pub(crate) fn release(
        &self,
        graph: &mut AudioGraph,
        now: f64,
        fade_end: f64,
        stop_at: f64,
        floor: f32,
    ) -> Result<(), GraphError> {
        let fade = graph.param_mut(self.gain, ParamKind::Gain).map(|gain| {
            gain.cancel_and_hold(now)
                .exponential_ramp_to_value_at_time(floor, fade_end);
        });
        let stop = graph.stop(self.oscillator, stop_at);
        let mut dispose = Ok(());
        for node in self.nodes() {
            let result = graph.dispose_at(node, stop_at);
            if dispose.is_ok() {
                dispose = result;
            }
        }
        fade.and(stop).and(dispose)
    }
}

/// Every voice chain sounding for one held note.
#[derive(Clone, Debug, PartialEq)]
pub struct VoiceBank {
    /// MIDI note number.
    pub note: u8,
    /// Velocity the note was pressed with.
    pub velocity: u8,
    /// Chains in detune order, lowest first.
    pub chains: Vec<VoiceChain>,
}

impl VoiceBank {
    /// Number of chains, fixed at creation.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Whether the bank has no chains.
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Oscillator handles of every chain.
    pub fn oscillators(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.chains.iter().map(|c| c.oscillator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyvox_core::{BiquadKind, Waveform};

    fn chain(graph: &mut AudioGraph, routing: Routing) -> VoiceChain {
        let osc = graph.add_oscillator(Waveform::Sine, 440.0);
        let filter = graph.add_filter(BiquadKind::Lowpass, 800.0, 1.0);
        let gain = graph.add_gain(0.5);
        let dest = graph.destination();
        let chain = VoiceChain::new(osc, filter, gain, routing);
        chain.wire(graph, dest).unwrap();
        chain
    }

    #[test]
    fn a4_is_exact() {
        assert_eq!(midi_to_freq(69), 440.0);
        assert!((midi_to_freq(81) - 880.0).abs() < 1e-3);
        assert!((midi_to_freq(57) - 220.0).abs() < 1e-3);
    }

    #[test]
    fn offsets_for_three_voices() {
        assert_eq!(detune_offsets(3, 30.0), vec![-15.0, 0.0, 15.0]);
        assert!(detune_offsets(0, 10.0).is_empty());
    }

    #[test]
    fn wire_through_filter() {
        let mut graph = AudioGraph::new(48000.0, 128);
        let c = chain(&mut graph, Routing::ThroughFilter);
        assert!(graph.is_connected(c.oscillator, c.filter));
        assert!(graph.is_connected(c.filter, c.gain));
        assert!(graph.is_connected(c.gain, graph.destination()));
        assert!(!graph.is_connected(c.oscillator, c.gain));
    }

    #[test]
    fn rewire_is_idempotent() {
        let mut graph = AudioGraph::new(48000.0, 128);
        let mut c = chain(&mut graph, Routing::ThroughFilter);
        let dest = graph.destination();

        assert_eq!(c.rewire(&mut graph, Routing::Direct, dest), Ok(true));
        let edges = graph.edge_count();
        assert_eq!(c.rewire(&mut graph, Routing::Direct, dest), Ok(false));
        assert_eq!(graph.edge_count(), edges);
        assert!(graph.is_connected(c.oscillator, c.gain));
        assert!(!graph.is_connected(c.oscillator, c.filter));
        assert!(graph.contains(c.filter));

        assert_eq!(c.rewire(&mut graph, Routing::ThroughFilter, dest), Ok(true));
        assert!(graph.is_connected(c.filter, c.gain));
        assert_eq!(c.routing(), Routing::ThroughFilter);
    }

    #[test]
    fn release_schedules_stop_and_disposal() {
        let mut graph = AudioGraph::new(48000.0, 128);
        let c = chain(&mut graph, Routing::ThroughFilter);
        c.release(&mut graph, 0.0, 0.1, 0.15, 0.0001).unwrap();

        assert_eq!(graph.stop_time(c.oscillator), Some(0.15));
        graph.advance(48000 / 5);
        for node in c.nodes() {
            assert!(!graph.contains(node));
        }
    }

    #[test]
    fn release_after_removal_reports_error() {
        let mut graph = AudioGraph::new(48000.0, 128);
        let c = chain(&mut graph, Routing::Direct);
        graph.remove_node(c.oscillator).unwrap();
        assert!(c.release(&mut graph, 0.0, 0.1, 0.15, 0.0001).is_err());
        // The remaining stages were still scheduled
        graph.advance(48000 / 5);
        assert!(!graph.contains(c.gain));
    }
}
