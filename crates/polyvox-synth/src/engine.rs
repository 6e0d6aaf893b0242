//! The voice-graph engine.
//!
//! [`SynthEngine`] owns the audio graph, the master and modulation buses,
//! and the registry of live voice banks. On every [`sync`](SynthEngine::sync)
//! it compares the store with what it last observed and brings the graph in
//! line:
//!
//! - bus-level settings (vibrato, master volume) glide in place;
//! - waveform changes, and voice-count changes under the rebuild policy,
//!   release every bank and rebuild one per held note;
//! - filter, bypass and detune changes are applied to live chains in place;
//! - released notes fade out and pressed notes get a fresh bank.
//!
//! Nothing here fails: teardown problems are logged and skipped so one
//! broken chain never blocks the rest.

use std::collections::BTreeMap;

use polyvox_config::{EngineConfig, EnvelopeConfig};
use polyvox_core::{AudioGraph, NodeId, ParamKind};
use tracing::{debug, info, trace, warn};

use crate::builder::{BankRequest, BusPorts, build_bank};
use crate::error::EngineError;
use crate::master::MasterBus;
use crate::modulation::{ModulationBus, glide};
use crate::params::SynthParams;
use crate::store::{ActiveNotes, SynthStore};
use crate::voice::{Routing, VoiceBank, detune_offsets};

/// Why the registry is being reconciled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconcile {
    /// Only the set of held notes changed; untouched notes keep their banks.
    Notes,
    /// Voice shape changed; every bank is released and rebuilt.
    Structural,
}

/// Polyphonic voice-graph engine.
///
/// ```rust
/// use polyvox_config::EngineConfig;
/// use polyvox_synth::{SynthEngine, SynthStore};
///
/// let mut engine = SynthEngine::new(&EngineConfig::default()).unwrap();
/// let mut store = SynthStore::new();
///
/// store.note_on(60, 100);
/// engine.sync(&store);
/// assert_eq!(engine.live_notes().collect::<Vec<_>>(), vec![60]);
///
/// let mut block = vec![0.0; 512];
/// engine.render(&mut block);
///
/// engine.clear_all_notes(&mut store);
/// assert!(store.active_notes().is_empty());
/// ```
#[derive(Debug)]
pub struct SynthEngine {
    graph: AudioGraph,
    master: MasterBus,
    modulation: ModulationBus,
    registry: BTreeMap<u8, VoiceBank>,
    /// Parameters as of the last sync.
    observed: SynthParams,
    envelope: EnvelopeConfig,
    rebuild_on_voice_change: bool,
}

impl SynthEngine {
    /// Build the graph with its master and modulation buses running.
    ///
    /// The buses start at factory parameter values; the first
    /// [`sync`](Self::sync) glides them to whatever the store holds.
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let params = SynthParams::default();

        let mut graph = AudioGraph::new(config.sample_rate_hz(), config.audio.block_size);
        let master = MasterBus::new(&mut graph, params.master_volume, &config.analyser)?;
        let modulation = ModulationBus::new(&mut graph, params.vibrato_rate, params.vibrato_depth)?;

        info!(
            sample_rate = config.audio.sample_rate,
            block_size = config.audio.block_size,
            fft_size = config.analyser.fft_size,
            "synth engine ready"
        );

        Ok(Self {
            graph,
            master,
            modulation,
            registry: BTreeMap::new(),
            observed: params,
            envelope: config.envelope.clone(),
            rebuild_on_voice_change: config.voices.rebuild_on_voice_change,
        })
    }

    /// Bring the graph in line with the store.
    pub fn sync(&mut self, store: &SynthStore) {
        let params = store.params().clone();

        self.propagate_buses(&params);
        if self.is_structural(&params) {
            self.reconcile(&params, store.active_notes(), Reconcile::Structural);
        } else {
            self.propagate_voices(&params);
            self.reconcile(&params, store.active_notes(), Reconcile::Notes);
        }
        self.observed = params;
    }

    /// Release every sounding note and empty the store's note set.
    ///
    /// Calling this again with nothing held does nothing.
    pub fn clear_all_notes(&mut self, store: &mut SynthStore) {
        store.set_active_notes(ActiveNotes::new());
        let params = store.params().clone();
        self.reconcile(&params, store.active_notes(), Reconcile::Notes);
    }

    /// Render the next `output.len()` frames of the master output.
    pub fn render(&mut self, output: &mut [f32]) {
        self.graph.render(output);
    }

    /// Smoothed spectrum of the master output, one byte per bin.
    pub fn byte_frequency_data(&mut self) -> &[u8] {
        self.refresh_analysis();
        self.master.analyser().byte_frequency_data()
    }

    /// Smoothed spectrum of the master output in decibels.
    pub fn float_frequency_data(&mut self) -> &[f32] {
        self.refresh_analysis();
        self.master.analyser().float_frequency_data()
    }

    /// Number of analyser bins, half the FFT size.
    pub fn frequency_bin_count(&self) -> usize {
        self.master.analyser().frequency_bin_count()
    }

    /// Output of the vibrato depth stage.
    pub fn modulation_output(&self) -> NodeId {
        self.modulation.output()
    }

    /// The master gain every voice feeds.
    pub fn master_input(&self) -> NodeId {
        self.master.input()
    }

    /// Read-only view of the audio graph.
    pub fn graph(&self) -> &AudioGraph {
        &self.graph
    }

    /// Clock time in seconds.
    pub fn current_time(&self) -> f64 {
        self.graph.current_time()
    }

    /// Notes with a live bank, ascending.
    pub fn live_notes(&self) -> impl Iterator<Item = u8> + '_ {
        self.registry.keys().copied()
    }

    /// The live bank for `note`.
    pub fn bank(&self, note: u8) -> Option<&VoiceBank> {
        self.registry.get(&note)
    }

    /// Oscillators of every live bank. Fading tails are not included.
    pub fn live_oscillators(&self) -> Vec<NodeId> {
        self.registry
            .values()
            .flat_map(|bank| bank.oscillators())
            .collect()
    }

    fn refresh_analysis(&mut self) {
        if let Err(e) = self.master.analyse(&self.graph) {
            warn!(error = %e, "spectrum tap unavailable");
        }
    }

    fn is_structural(&self, params: &SynthParams) -> bool {
        params.waveform != self.observed.waveform
            || (self.rebuild_on_voice_change && params.voice_count() != self.observed.voice_count())
    }

    fn propagate_buses(&mut self, params: &SynthParams) {
        let tc = self.envelope.smoothing_time_constant_secs;
        let prev = &self.observed;
        let mut results = Vec::new();

        if params.vibrato_rate != prev.vibrato_rate {
            results.push(self.modulation.set_rate(&mut self.graph, params.vibrato_rate, tc));
        }
        if params.vibrato_depth != prev.vibrato_depth {
            results.push(self.modulation.set_depth(&mut self.graph, params.vibrato_depth, tc));
        }
        if params.master_volume != prev.master_volume {
            results.push(self.master.set_volume(&mut self.graph, params.master_volume, tc));
        }
        for e in results.into_iter().filter_map(Result::err) {
            warn!(error = %e, "bus update skipped");
        }
    }

    fn propagate_voices(&mut self, params: &SynthParams) {
        let tc = self.envelope.smoothing_time_constant_secs;
        let bypass_changed = params.filter_enabled != self.observed.filter_enabled;
        let filter_changed = bypass_changed || params.filter_differs(&self.observed);
        let detune_changed = params.detune_cents != self.observed.detune_cents;
        if !(filter_changed || detune_changed) || self.registry.is_empty() {
            return;
        }

        let routing = Routing::for_filter(params.filter_enabled);
        let output = self.master.input();
        let graph = &mut self.graph;

        for bank in self.registry.values_mut() {
            let offsets = detune_offsets(bank.len(), params.detune_cents);
            for (chain, offset) in bank.chains.iter_mut().zip(offsets) {
                if bypass_changed && let Err(e) = chain.rewire(graph, routing, output) {
                    warn!(note = bank.note, error = %e, "rewire failed");
                }
                if filter_changed {
                    let result = graph
                        .set_filter_kind(chain.filter, params.filter_kind.into())
                        .and_then(|()| {
                            glide(graph, chain.filter, ParamKind::Frequency, params.filter_cutoff, tc)
                        })
                        .and_then(|()| glide(graph, chain.filter, ParamKind::Q, params.filter_q, tc));
                    if let Err(e) = result {
                        warn!(note = bank.note, error = %e, "filter update skipped");
                    }
                }
                if detune_changed
                    && let Err(e) = glide(graph, chain.oscillator, ParamKind::Detune, offset, tc)
                {
                    warn!(note = bank.note, error = %e, "detune update skipped");
                }
            }
        }
        debug!(
            banks = self.registry.len(),
            bypass_changed, filter_changed, detune_changed, "propagated voice parameters"
        );
    }

    /// Make the registry match `notes`.
    fn reconcile(&mut self, params: &SynthParams, notes: &ActiveNotes, reason: Reconcile) {
        let now = self.graph.current_time();

        let released: Vec<u8> = match reason {
            Reconcile::Structural => self.registry.keys().copied().collect(),
            Reconcile::Notes => self
                .registry
                .keys()
                .filter(|note| !notes.contains_key(note))
                .copied()
                .collect(),
        };
        for note in &released {
            if let Some(bank) = self.registry.remove(note) {
                self.release_bank(&bank, params, now);
            }
        }

        let pressed: Vec<(u8, u8)> = notes
            .iter()
            .filter(|(note, _)| !self.registry.contains_key(note))
            .map(|(note, state)| (*note, state.velocity))
            .collect();
        if !pressed.is_empty() {
            let surviving: usize = self.registry.values().map(VoiceBank::len).sum();
            let total = surviving + pressed.len() * params.voice_count();
            let ports = BusPorts {
                output: self.master.input(),
                modulation: self.modulation,
            };
            for &(note, velocity) in &pressed {
                let request = BankRequest::from_params(note, velocity, params, total);
                match build_bank(&mut self.graph, &request, ports, &self.envelope) {
                    Ok(bank) => {
                        self.registry.insert(note, bank);
                    }
                    Err(e) => warn!(note, error = %e, "voice bank not built"),
                }
            }
        }

        if !(released.is_empty() && pressed.is_empty()) {
            debug!(
                ?reason,
                released = released.len(),
                pressed = pressed.len(),
                live = self.registry.len(),
                nodes = self.graph.node_count(),
                "reconciled voice banks"
            );
        }
    }

    /// Fade every chain of `bank` and schedule its teardown.
    fn release_bank(&mut self, bank: &VoiceBank, params: &SynthParams, now: f64) {
        let fade = f64::from(params.release).max(self.envelope.min_ramp_secs);
        let fade_end = now + fade;
        let stop_at = fade_end + self.envelope.release_guard_secs;
        for chain in &bank.chains {
            if let Err(e) =
                chain.release(&mut self.graph, now, fade_end, stop_at, self.envelope.gain_floor)
            {
                trace!(note = bank.note, error = %e, "teardown step skipped");
            }
        }
    }
}
