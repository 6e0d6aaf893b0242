//! Polyvox Synth - polyphonic voice-graph engine
//!
//! The engine keeps an [`AudioGraph`](polyvox_core::AudioGraph) of voice
//! chains in step with a host-owned [`SynthStore`]. Every held note owns a
//! [`VoiceBank`] of detuned oscillator → filter → gain chains; all chains
//! feed a master gain with a spectrum tap, and one shared LFO bus drives
//! every oscillator's detune for vibrato.
//!
//! # Core Components
//!
//! - [`SynthStore`] - Parameter set and active note set a host edits
//! - [`SynthEngine`] - Reconciles the graph against the store
//! - [`VoiceChain`] / [`VoiceBank`] - Per-oscillator and per-note voice state
//! - [`ModulationBus`] - Shared vibrato LFO
//! - [`MasterBus`] - Output gain and spectrum tap
//!
//! # Example
//!
//! ```rust
//! use polyvox_config::EngineConfig;
//! use polyvox_synth::{SynthEngine, SynthStore, WaveformKind};
//!
//! let mut engine = SynthEngine::new(&EngineConfig::default()).unwrap();
//! let mut store = SynthStore::new();
//!
//! store.set_waveform(WaveformKind::Sawtooth);
//! store.set_voices(3);
//! store.set_detune(20.0);
//! store.note_on(57, 110);
//! engine.sync(&store);
//!
//! let mut block = vec![0.0; 1024];
//! engine.render(&mut block);
//! let spectrum = engine.byte_frequency_data();
//! assert_eq!(spectrum.len(), 1024);
//! ```
//!
//! # Logging
//!
//! The engine reports through `tracing`: `info` at construction, `debug`
//! for reconciliation and propagation, `trace` for skipped teardown steps.
//! No subscriber is installed.

pub mod builder;
pub mod engine;
pub mod error;
pub mod master;
pub mod modulation;
pub mod params;
pub mod store;
pub mod voice;

pub use builder::{BankRequest, BusPorts, build_bank};
pub use engine::{Reconcile, SynthEngine};
pub use error::EngineError;
pub use master::MasterBus;
pub use modulation::ModulationBus;
pub use params::{FilterKind, SynthParams, WaveformKind};
pub use store::{ActiveNotes, MIDI_MAX, NoteState, SynthStore};
pub use voice::{Routing, VoiceBank, VoiceChain, detune_offsets, midi_to_freq};
