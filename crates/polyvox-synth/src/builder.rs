//! Builds the voice bank for a newly pressed note.

use polyvox_config::EnvelopeConfig;
use polyvox_core::{AudioGraph, BiquadKind, GraphError, NodeId, ParamKind, Waveform};

use crate::modulation::ModulationBus;
use crate::params::SynthParams;
use crate::voice::{Routing, VoiceBank, VoiceChain, detune_offsets, midi_to_freq};

/// Everything needed to build one bank.
#[derive(Clone, Debug, PartialEq)]
pub struct BankRequest {
    /// MIDI note number.
    pub note: u8,
    /// Key velocity, 0 to 127.
    pub velocity: u8,
    /// Chains to build.
    pub voice_count: usize,
    /// Oscillator shape.
    pub waveform: Waveform,
    /// Total detune spread in cents.
    pub detune_spread: f32,
    /// Filter response.
    pub filter_kind: BiquadKind,
    /// Filter cutoff in Hz.
    pub filter_cutoff: f32,
    /// Filter quality factor.
    pub filter_q: f32,
    /// Route through the filter.
    pub filter_enabled: bool,
    /// Attack time in seconds.
    pub attack: f32,
    /// Master volume, 0 to 1.
    pub master_volume: f32,
    /// Oscillators live once the current reconciliation completes.
    pub total_oscillators: usize,
}

impl BankRequest {
    /// Request for `note` using the current parameters.
    pub fn from_params(note: u8, velocity: u8, params: &SynthParams, total_oscillators: usize) -> Self {
        Self {
            note,
            velocity,
            voice_count: params.voice_count(),
            waveform: params.waveform.into(),
            detune_spread: params.detune_cents,
            filter_kind: params.filter_kind.into(),
            filter_cutoff: params.filter_cutoff,
            filter_q: params.filter_q,
            filter_enabled: params.filter_enabled,
            attack: params.attack,
            master_volume: params.master_volume,
            total_oscillators,
        }
    }

    /// Steady-state level of each chain's gain stage.
    ///
    /// Velocity scales linearly; master volume is divided across every live
    /// oscillator plus one for headroom.
    pub fn gain_target(&self) -> f32 {
        (f32::from(self.velocity) / 127.0)
            * (self.master_volume / (self.total_oscillators as f32 + 1.0))
    }
}

/// Graph handles a bank is wired to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusPorts {
    /// Where every chain's gain stage feeds.
    pub output: NodeId,
    /// Vibrato bus attached to every oscillator's detune.
    pub modulation: ModulationBus,
}

/// Create, wire and start every chain of a bank.
///
/// The gain stage starts at the envelope floor and ramps linearly to
/// [`BankRequest::gain_target`] over the attack. If any step fails, every
/// node created so far is removed before the error is returned.
pub fn build_bank(
    graph: &mut AudioGraph,
    request: &BankRequest,
    ports: BusPorts,
    envelope: &EnvelopeConfig,
) -> Result<VoiceBank, GraphError> {
    let mut created = Vec::new();
    match build_chains(graph, request, ports, envelope, &mut created) {
        Ok(chains) => Ok(VoiceBank {
            note: request.note,
            velocity: request.velocity,
            chains,
        }),
        Err(e) => {
            for node in created {
                // The node may already be gone; nothing else to undo.
                let _ = graph.remove_node(node);
            }
            Err(e)
        }
    }
}

fn build_chains(
    graph: &mut AudioGraph,
    request: &BankRequest,
    ports: BusPorts,
    envelope: &EnvelopeConfig,
    created: &mut Vec<NodeId>,
) -> Result<Vec<VoiceChain>, GraphError> {
    let now = graph.current_time();
    let frequency = midi_to_freq(request.note);
    let target = request.gain_target();
    let attack_end = now + f64::from(request.attack).max(envelope.min_ramp_secs);
    let routing = Routing::for_filter(request.filter_enabled);

    let mut chains = Vec::with_capacity(request.voice_count);
    for offset in detune_offsets(request.voice_count, request.detune_spread) {
        let oscillator = graph.add_oscillator(request.waveform, frequency);
        created.push(oscillator);
        let filter = graph.add_filter(request.filter_kind, request.filter_cutoff, request.filter_q);
        created.push(filter);
        let gain = graph.add_gain(envelope.gain_floor);
        created.push(gain);

        graph.param_mut(oscillator, ParamKind::Detune)?.set_value(offset);
        graph
            .param_mut(gain, ParamKind::Gain)?
            .set_value_at_time(envelope.gain_floor, now)
            .linear_ramp_to_value_at_time(target, attack_end);

        let chain = VoiceChain::new(oscillator, filter, gain, routing);
        chain.wire(graph, ports.output)?;
        ports.modulation.attach(graph, oscillator)?;
        chains.push(chain);
    }
    Ok(chains)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(voices: usize, spread: f32) -> BankRequest {
        BankRequest::from_params(
            60,
            100,
            &SynthParams {
                voices: voices as u32,
                detune_cents: spread,
                ..SynthParams::default()
            },
            voices,
        )
    }

    fn ports(graph: &mut AudioGraph) -> BusPorts {
        BusPorts {
            output: graph.destination(),
            modulation: ModulationBus::new(graph, 5.0, 0.0).unwrap(),
        }
    }

    #[test]
    fn gain_target_normalises_by_oscillator_count() {
        let req = request(1, 0.0);
        assert!((req.gain_target() - (100.0 / 127.0) * 0.5).abs() < 1e-6);

        let req = BankRequest {
            total_oscillators: 3,
            master_volume: 0.8,
            ..request(1, 0.0)
        };
        assert!((req.gain_target() - (100.0 / 127.0) * 0.2).abs() < 1e-6);
    }

    #[test]
    fn bank_has_requested_size_and_detune() {
        let mut graph = AudioGraph::new(48000.0, 128);
        let ports = ports(&mut graph);
        let bank = build_bank(&mut graph, &request(2, 20.0), ports, &EnvelopeConfig::default())
            .unwrap();

        assert_eq!(bank.len(), 2);
        let detunes: Vec<f32> = bank
            .chains
            .iter()
            .map(|c| graph.param(c.oscillator, ParamKind::Detune).unwrap().value())
            .collect();
        assert_eq!(detunes, vec![-10.0, 10.0]);
        for chain in &bank.chains {
            assert!(graph.is_connected_to_param(
                ports.modulation.output(),
                chain.oscillator,
                ParamKind::Detune
            ));
            assert!(graph.is_connected(chain.gain, ports.output));
            assert_eq!(chain.routing(), Routing::ThroughFilter);
        }
    }

    #[test]
    fn attack_ramps_from_floor_to_target() {
        let mut graph = AudioGraph::new(48000.0, 128);
        let ports = ports(&mut graph);
        let req = request(1, 0.0);
        let bank = build_bank(&mut graph, &req, ports, &EnvelopeConfig::default()).unwrap();
        let gain = bank.chains[0].gain;

        graph.advance(1);
        assert!(graph.param(gain, ParamKind::Gain).unwrap().value() < 0.01);
        graph.advance(960);
        let settled = graph.param(gain, ParamKind::Gain).unwrap().value();
        assert!((settled - req.gain_target()).abs() < 1e-6);
    }

    #[test]
    fn failed_build_leaves_no_nodes() {
        let mut graph = AudioGraph::new(48000.0, 128);
        let modulation = ModulationBus::new(&mut graph, 5.0, 0.0).unwrap();
        let dead = graph.add_gain(0.0);
        graph.remove_node(dead).unwrap();
        let nodes = graph.node_count();
        let edges = graph.edge_count();

        let ports = BusPorts {
            output: dead,
            modulation,
        };
        let err = build_bank(&mut graph, &request(3, 10.0), ports, &EnvelopeConfig::default());
        assert_eq!(err, Err(GraphError::NodeNotFound(dead)));
        assert_eq!(graph.node_count(), nodes);
        assert_eq!(graph.edge_count(), edges);
    }
}
