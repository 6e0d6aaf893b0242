//! Shared vibrato source.
//!
//! One LFO oscillator feeds one gain stage whose output is summed into the
//! detune parameter of every voice oscillator. The bus is created with the
//! engine and lives as long as it does; rate and depth glide in place.

use polyvox_core::{AudioGraph, GraphError, NodeId, ParamKind, Waveform};

/// LFO plus depth stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModulationBus {
    lfo: NodeId,
    depth: NodeId,
}

impl ModulationBus {
    /// Create and start the bus. Depth is in cents.
    pub fn new(graph: &mut AudioGraph, rate_hz: f32, depth_cents: f32) -> Result<Self, GraphError> {
        let lfo = graph.add_oscillator(Waveform::Sine, rate_hz);
        let depth = graph.add_gain(depth_cents);
        graph.connect(lfo, depth)?;
        Ok(Self { lfo, depth })
    }

    /// The LFO oscillator.
    pub fn lfo(&self) -> NodeId {
        self.lfo
    }

    /// The depth stage; connect its output to a detune parameter.
    pub fn output(&self) -> NodeId {
        self.depth
    }

    /// Sum the vibrato into `oscillator`'s detune.
    pub fn attach(&self, graph: &mut AudioGraph, oscillator: NodeId) -> Result<(), GraphError> {
        graph.connect_param(self.depth, oscillator, ParamKind::Detune)?;
        Ok(())
    }

    /// Glide the LFO rate towards `rate_hz`.
    pub fn set_rate(
        &self,
        graph: &mut AudioGraph,
        rate_hz: f32,
        time_constant: f64,
    ) -> Result<(), GraphError> {
        glide(graph, self.lfo, ParamKind::Frequency, rate_hz.max(0.0), time_constant)
    }

    /// Glide the depth towards `depth_cents`.
    pub fn set_depth(
        &self,
        graph: &mut AudioGraph,
        depth_cents: f32,
        time_constant: f64,
    ) -> Result<(), GraphError> {
        glide(graph, self.depth, ParamKind::Gain, depth_cents.max(0.0), time_constant)
    }
}

/// Pin the parameter where it is now, then approach `value` with `time_constant`.
pub(crate) fn glide(
    graph: &mut AudioGraph,
    node: NodeId,
    param: ParamKind,
    value: f32,
    time_constant: f64,
) -> Result<(), GraphError> {
    let now = graph.current_time();
    graph
        .param_mut(node, param)?
        .cancel_and_hold(now)
        .set_target_at_time(value, now, time_constant);
    Ok(())
}
