//! Master output stage and its spectrum tap.

use polyvox_analysis::SpectrumAnalyser;
use polyvox_config::AnalyserConfig;
use polyvox_core::{AudioGraph, GraphError, NodeId, ParamKind};

use crate::modulation::glide;

/// Master gain feeding the destination, tapped by an analyser.
#[derive(Debug)]
pub struct MasterBus {
    gain: NodeId,
    tap: NodeId,
    analyser: SpectrumAnalyser,
    frame: Vec<f32>,
}

impl MasterBus {
    /// Create the master gain and analyser tap.
    pub fn new(
        graph: &mut AudioGraph,
        volume: f32,
        config: &AnalyserConfig,
    ) -> Result<Self, GraphError> {
        let gain = graph.add_gain(volume);
        let tap = graph.add_analyser(config.fft_size);
        graph.connect(gain, graph.destination())?;
        graph.connect(gain, tap)?;
        Ok(Self {
            gain,
            tap,
            analyser: SpectrumAnalyser::new(
                config.fft_size,
                config.smoothing,
                config.min_decibels,
                config.max_decibels,
            ),
            frame: vec![0.0; config.fft_size],
        })
    }

    /// Node every voice chain feeds.
    pub fn input(&self) -> NodeId {
        self.gain
    }

    /// Analyser node on the master output.
    pub fn tap(&self) -> NodeId {
        self.tap
    }

    /// Glide the master volume.
    pub fn set_volume(
        &self,
        graph: &mut AudioGraph,
        volume: f32,
        time_constant: f64,
    ) -> Result<(), GraphError> {
        glide(graph, self.gain, ParamKind::Gain, volume, time_constant)
    }

    /// Run the analyser over the latest tapped frame.
    pub fn analyse(&mut self, graph: &AudioGraph) -> Result<(), GraphError> {
        graph.analyser_data(self.tap, &mut self.frame)?;
        self.analyser.process(&self.frame);
        Ok(())
    }

    /// Analyser state as of the last [`analyse`](Self::analyse).
    pub fn analyser(&self) -> &SpectrumAnalyser {
        &self.analyser
    }
}
