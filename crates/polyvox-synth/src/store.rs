//! Host-owned parameter and note state.
//!
//! The store is the single source of what should be sounding. A host (UI,
//! MIDI handler) mutates it; the engine reads it on every
//! [`SynthEngine::sync`](crate::SynthEngine::sync) and writes back only when
//! clearing all notes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::params::{FilterKind, SynthParams, WaveformKind};

/// Highest MIDI note number and velocity.
pub const MIDI_MAX: u8 = 127;

/// Per-note state of a held key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteState {
    /// Key velocity, 0 to 127.
    pub velocity: u8,
}

/// Held notes keyed by MIDI note number.
pub type ActiveNotes = BTreeMap<u8, NoteState>;

/// Parameter set plus active note set.
///
/// Only the parameters serialize; held notes are session state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthStore {
    params: SynthParams,
    #[serde(skip)]
    notes: ActiveNotes,
}

impl SynthStore {
    /// Store with factory parameters and no held notes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store starting from `params`.
    pub fn with_params(params: SynthParams) -> Self {
        Self {
            params,
            notes: ActiveNotes::new(),
        }
    }

    /// Current parameters.
    pub fn params(&self) -> &SynthParams {
        &self.params
    }

    /// Replace every parameter at once.
    pub fn set_params(&mut self, params: SynthParams) {
        self.params = params;
    }

    /// Currently held notes.
    pub fn active_notes(&self) -> &ActiveNotes {
        &self.notes
    }

    /// Press `note` with `velocity`.
    ///
    /// Pressing a held note only updates its velocity. Notes above 127 are
    /// ignored; velocities above 127 are clamped.
    pub fn note_on(&mut self, note: u8, velocity: u8) {
        if note > MIDI_MAX {
            return;
        }
        self.notes.insert(
            note,
            NoteState {
                velocity: velocity.min(MIDI_MAX),
            },
        );
    }

    /// Release `note`. Releasing a note that is not held does nothing.
    pub fn note_off(&mut self, note: u8) {
        if note > MIDI_MAX {
            return;
        }
        self.notes.remove(&note);
    }

    /// Replace the whole active note set. Keys above 127 are dropped.
    pub fn set_active_notes(&mut self, mut notes: ActiveNotes) {
        notes.retain(|&note, _| note <= MIDI_MAX);
        self.notes = notes;
    }

    /// Set the oscillator waveform.
    pub fn set_waveform(&mut self, waveform: WaveformKind) {
        self.params.waveform = waveform;
    }

    /// Set the filter response.
    pub fn set_filter_kind(&mut self, kind: FilterKind) {
        self.params.filter_kind = kind;
    }

    /// Set the filter cutoff in Hz.
    pub fn set_filter_cutoff(&mut self, hz: f32) {
        self.params.filter_cutoff = hz;
    }

    /// Set the filter quality factor.
    pub fn set_filter_resonance(&mut self, q: f32) {
        self.params.filter_q = q;
    }

    /// Route voices through (true) or around (false) their filter.
    pub fn set_filter_enabled(&mut self, enabled: bool) {
        self.params.filter_enabled = enabled;
    }

    /// Set oscillators per note.
    pub fn set_voices(&mut self, voices: u32) {
        self.params.voices = voices;
    }

    /// Set total detune spread in cents.
    pub fn set_detune(&mut self, cents: f32) {
        self.params.detune_cents = cents;
    }

    /// Set vibrato rate in Hz.
    pub fn set_vibrato_rate(&mut self, hz: f32) {
        self.params.vibrato_rate = hz;
    }

    /// Set vibrato depth in cents.
    pub fn set_vibrato_depth(&mut self, cents: f32) {
        self.params.vibrato_depth = cents;
    }

    /// Set attack time in seconds.
    pub fn set_attack(&mut self, secs: f32) {
        self.params.attack = secs;
    }

    /// Set release time in seconds.
    pub fn set_release(&mut self, secs: f32) {
        self.params.release = secs;
    }

    /// Set master volume, 0 to 1.
    pub fn set_master_volume(&mut self, volume: f32) {
        self.params.master_volume = volume;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_on_off() {
        let mut store = SynthStore::new();
        store.note_on(60, 100);
        store.note_on(64, 90);
        store.note_off(60);
        let keys: Vec<u8> = store.active_notes().keys().copied().collect();
        assert_eq!(keys, vec![64]);
    }

    #[test]
    fn repress_replaces_velocity() {
        let mut store = SynthStore::new();
        store.note_on(60, 100);
        store.note_on(60, 20);
        assert_eq!(store.active_notes().len(), 1);
        assert_eq!(store.active_notes()[&60].velocity, 20);
    }

    #[test]
    fn out_of_range_note_is_ignored() {
        let mut store = SynthStore::new();
        store.note_on(200, 100);
        assert!(store.active_notes().is_empty());
        store.note_off(200);
        assert!(store.active_notes().is_empty());
    }

    #[test]
    fn out_of_range_note_leaves_top_key_alone() {
        let mut store = SynthStore::new();
        store.note_on(127, 100);
        store.note_on(200, 50);
        store.note_off(200);
        assert_eq!(store.active_notes()[&127].velocity, 100);
    }

    #[test]
    fn out_of_range_velocity_is_clamped() {
        let mut store = SynthStore::new();
        store.note_on(60, 255);
        assert_eq!(store.active_notes()[&60].velocity, 127);
    }

    #[test]
    fn replacing_note_set_drops_invalid_keys() {
        let mut store = SynthStore::new();
        let mut notes = ActiveNotes::new();
        notes.insert(60, NoteState { velocity: 90 });
        notes.insert(220, NoteState { velocity: 90 });
        store.set_active_notes(notes);
        let keys: Vec<u8> = store.active_notes().keys().copied().collect();
        assert_eq!(keys, vec![60]);
    }

    #[test]
    fn setters_write_params() {
        let mut store = SynthStore::new();
        store.set_waveform(WaveformKind::Square);
        store.set_filter_resonance(4.0);
        store.set_voices(3);
        assert_eq!(store.params().waveform, WaveformKind::Square);
        assert_eq!(store.params().filter_q, 4.0);
        assert_eq!(store.params().voices, 3);
    }
}
