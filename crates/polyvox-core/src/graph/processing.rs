//! Audio graph: mutation API, render schedule, and the sample clock.
//!
//! [`AudioGraph`] owns every node and edge, the render order, and the clock
//! that all automation is scheduled against. Mutations (add, connect,
//! disconnect, stop, dispose) may happen between any two render calls; the
//! render order is recomputed lazily on the next render.

#[cfg(not(feature = "std"))]
use alloc::{collections::BTreeMap, format, string::String, vec, vec::Vec};
#[cfg(feature = "std")]
use std::collections::BTreeMap;

use crate::biquad::BiquadKind;
use crate::oscillator::Waveform;
use crate::param::AudioParam;

use super::edge::{Edge, EdgeId, EdgeTarget};
use super::node::{NodeData, NodeId, NodeKind, ParamKind, Processor};

/// Errors that can occur during graph operations.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// The specified node was not found (never existed or already disposed).
    NodeNotFound(NodeId),
    /// The specified edge was not found in the graph.
    EdgeNotFound(EdgeId),
    /// Adding this edge would create a cycle.
    CycleDetected,
    /// An identical edge already exists between these nodes.
    DuplicateEdge(NodeId, NodeId),
    /// A node has an invalid connection (e.g., audio into an oscillator).
    InvalidConnection(String),
    /// The node does not expose the requested parameter.
    NoSuchParam(NodeId, ParamKind),
    /// The operation requires an oscillator node.
    NotAnOscillator(NodeId),
    /// The oscillator has already reached its stop time.
    AlreadyStopped(NodeId),
    /// The operation requires an analyser node.
    NotAnAnalyser(NodeId),
}

impl core::fmt::Display for GraphError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NodeNotFound(id) => write!(f, "node {id} not found"),
            Self::EdgeNotFound(id) => write!(f, "edge {id} not found"),
            Self::CycleDetected => write!(f, "adding this edge would create a cycle"),
            Self::DuplicateEdge(a, b) => write!(f, "edge from {a} to {b} already exists"),
            Self::InvalidConnection(msg) => write!(f, "invalid connection: {msg}"),
            Self::NoSuchParam(id, param) => write!(f, "node {id} has no {param:?} parameter"),
            Self::NotAnOscillator(id) => write!(f, "node {id} is not an oscillator"),
            Self::AlreadyStopped(id) => write!(f, "oscillator {id} has already stopped"),
            Self::NotAnAnalyser(id) => write!(f, "node {id} is not an analyser"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for GraphError {}

/// A typed audio graph rendered against its own sample clock.
///
/// The graph holds oscillator, filter, gain and analyser nodes plus a single
/// destination node created with the graph. Edges either feed a node's audio
/// input or are summed into one of its parameters (e.g. an LFO into an
/// oscillator's detune).
///
/// # Usage
///
/// 1. Create a graph with [`new()`](Self::new)
/// 2. Add nodes: [`add_oscillator()`](Self::add_oscillator),
///    [`add_filter()`](Self::add_filter), [`add_gain()`](Self::add_gain),
///    [`add_analyser()`](Self::add_analyser)
/// 3. Wire them: [`connect()`](Self::connect), [`connect_param()`](Self::connect_param)
/// 4. Schedule automation via [`param_mut()`](Self::param_mut)
/// 5. Pull audio: [`render()`](Self::render)
///
/// ```rust
/// use polyvox_core::graph::{AudioGraph, ParamKind};
/// use polyvox_core::Waveform;
///
/// let mut graph = AudioGraph::new(48000.0, 128);
/// let osc = graph.add_oscillator(Waveform::Sine, 440.0);
/// let amp = graph.add_gain(0.0);
/// graph.connect(osc, amp).unwrap();
/// graph.connect(amp, graph.destination()).unwrap();
///
/// let now = graph.current_time();
/// graph
///     .param_mut(amp, ParamKind::Gain)
///     .unwrap()
///     .linear_ramp_to_value_at_time(0.5, now + 0.01);
///
/// let mut block = vec![0.0; 256];
/// graph.render(&mut block);
/// ```
#[derive(Debug)]
pub struct AudioGraph {
    nodes: BTreeMap<NodeId, NodeData>,
    edges: BTreeMap<EdgeId, Edge>,
    destination: NodeId,
    sample_rate: f32,
    block_size: usize,
    /// Frames rendered so far; the clock.
    frame: u64,
    next_node_slot: u32,
    next_edge_slot: u32,
    /// Topological render order, rebuilt when `order_dirty` is set.
    order: Vec<NodeId>,
    order_dirty: bool,
    scratch_input: Vec<f32>,
    scratch_params: [Vec<f32>; ParamKind::COUNT],
}

impl AudioGraph {
    /// Creates a graph containing only its destination node.
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - Sample rate in Hz (e.g., 48000.0)
    /// * `block_size` - Frames per render quantum (e.g., 128)
    pub fn new(sample_rate: f32, block_size: usize) -> Self {
        let block_size = block_size.max(1);
        let mut graph = Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            destination: NodeId(0),
            sample_rate,
            block_size,
            frame: 0,
            next_node_slot: 0,
            next_edge_slot: 0,
            order: Vec::new(),
            order_dirty: true,
            scratch_input: vec![0.0; block_size],
            scratch_params: core::array::from_fn(|_| vec![0.0; block_size]),
        };
        graph.destination = graph.add_node(Processor::Destination);
        graph
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Frames per render quantum.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Frames rendered since creation.
    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    /// Clock time in seconds of the next frame to be rendered.
    pub fn current_time(&self) -> f64 {
        self.frame as f64 / f64::from(self.sample_rate)
    }

    /// The graph's single output node.
    pub fn destination(&self) -> NodeId {
        self.destination
    }

    // --- Node mutations ---

    /// Adds an oscillator that starts playing at the current clock time.
    pub fn add_oscillator(&mut self, waveform: Waveform, frequency: f32) -> NodeId {
        let start = self.current_time();
        self.add_node(Processor::oscillator(
            waveform,
            frequency,
            self.sample_rate,
            start,
        ))
    }

    /// Adds a biquad filter stage.
    pub fn add_filter(&mut self, kind: BiquadKind, frequency: f32, q: f32) -> NodeId {
        self.add_node(Processor::filter(kind, frequency, q))
    }

    /// Adds a gain stage.
    pub fn add_gain(&mut self, gain: f32) -> NodeId {
        self.add_node(Processor::gain(gain))
    }

    /// Adds an analyser that keeps the last `size` input samples.
    pub fn add_analyser(&mut self, size: usize) -> NodeId {
        self.add_node(Processor::analyser(size))
    }

    fn add_node(&mut self, processor: Processor) -> NodeId {
        let id = NodeId(self.next_node_slot);
        self.next_node_slot += 1;
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_add: {:?} node {id}", processor.kind());
        self.nodes.insert(id, NodeData::new(processor, self.block_size));
        self.order_dirty = true;
        id
    }

    /// Removes a node and every edge touching it.
    ///
    /// The destination node cannot be removed.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        if id == self.destination {
            return Err(GraphError::InvalidConnection(String::from(
                "the destination node cannot be removed",
            )));
        }
        let data = self.nodes.remove(&id).ok_or(GraphError::NodeNotFound(id))?;
        for edge_id in data.incoming.iter().chain(data.outgoing.iter()) {
            if let Some(edge) = self.edges.remove(edge_id) {
                let other = if edge.from == id { edge.to } else { edge.from };
                if let Some(node) = self.nodes.get_mut(&other) {
                    node.incoming.retain(|e| e != edge_id);
                    node.outgoing.retain(|e| e != edge_id);
                }
            }
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_remove: node {id}");
        self.order_dirty = true;
        Ok(())
    }

    /// Schedules removal of a node once the clock reaches `time`.
    ///
    /// Removal happens at the end of the render quantum in which `time` falls.
    pub fn dispose_at(&mut self, id: NodeId, time: f64) -> Result<(), GraphError> {
        if id == self.destination {
            return Err(GraphError::InvalidConnection(String::from(
                "the destination node cannot be disposed",
            )));
        }
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        node.dispose_at = Some(time);
        Ok(())
    }

    /// Schedules an oscillator to fall silent at `time`.
    ///
    /// A later call replaces a stop time that has not been reached yet.
    pub fn stop(&mut self, id: NodeId, time: f64) -> Result<(), GraphError> {
        let now = self.current_time();
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        let Processor::Oscillator(osc) = &mut node.processor else {
            return Err(GraphError::NotAnOscillator(id));
        };
        if osc.stop_time.is_some_and(|s| s <= now) {
            return Err(GraphError::AlreadyStopped(id));
        }
        osc.stop_time = Some(time.max(now));
        Ok(())
    }

    /// Whether an oscillator is currently producing sound.
    pub fn is_playing(&self, id: NodeId) -> bool {
        let now = self.current_time();
        match self.nodes.get(&id).map(|n| &n.processor) {
            Some(Processor::Oscillator(osc)) => {
                now >= osc.start_time && osc.stop_time.is_none_or(|s| now < s)
            }
            _ => false,
        }
    }

    /// Scheduled stop time of an oscillator, if any.
    pub fn stop_time(&self, id: NodeId) -> Option<f64> {
        match self.nodes.get(&id).map(|n| &n.processor) {
            Some(Processor::Oscillator(osc)) => osc.stop_time,
            _ => None,
        }
    }

    // --- Wiring ---

    /// Connects `from`'s output to `to`'s audio input.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<EdgeId, GraphError> {
        self.add_edge(from, to, EdgeTarget::Input)
    }

    /// Connects `from`'s output to parameter `param` of `to`.
    ///
    /// The signal is summed with the parameter's own automated value.
    pub fn connect_param(
        &mut self,
        from: NodeId,
        to: NodeId,
        param: ParamKind,
    ) -> Result<EdgeId, GraphError> {
        self.add_edge(from, to, EdgeTarget::Param(param))
    }

    fn add_edge(&mut self, from: NodeId, to: NodeId, target: EdgeTarget) -> Result<EdgeId, GraphError> {
        let from_kind = self.node_kind(from).ok_or(GraphError::NodeNotFound(from))?;
        let to_kind = self.node_kind(to).ok_or(GraphError::NodeNotFound(to))?;

        if !from_kind.produces_output() {
            return Err(GraphError::InvalidConnection(format!(
                "{from_kind:?} node {from} has no output"
            )));
        }
        match target {
            EdgeTarget::Input if !to_kind.accepts_input() => {
                return Err(GraphError::InvalidConnection(format!(
                    "{to_kind:?} node {to} has no audio input"
                )));
            }
            EdgeTarget::Param(param) if !to_kind.has_param(param) => {
                return Err(GraphError::NoSuchParam(to, param));
            }
            _ => {}
        }

        let edge = Edge { from, to, target };
        if self.edges.values().any(|e| *e == edge) {
            return Err(GraphError::DuplicateEdge(from, to));
        }
        if from == to || self.reaches(to, from) {
            return Err(GraphError::CycleDetected);
        }

        let id = EdgeId(self.next_edge_slot);
        self.next_edge_slot += 1;
        self.edges.insert(id, edge);
        if let Some(node) = self.nodes.get_mut(&from) {
            node.outgoing.push(id);
        }
        if let Some(node) = self.nodes.get_mut(&to) {
            node.incoming.push(id);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_connect: {from} → {to} ({target:?})");
        self.order_dirty = true;
        Ok(id)
    }

    /// Removes every outgoing edge of `id`. Returns how many were removed.
    ///
    /// Calling this on a node with no outgoing edges is a no-op.
    pub fn disconnect(&mut self, id: NodeId) -> Result<usize, GraphError> {
        let outgoing = core::mem::take(
            &mut self
                .nodes
                .get_mut(&id)
                .ok_or(GraphError::NodeNotFound(id))?
                .outgoing,
        );
        for edge_id in &outgoing {
            if let Some(edge) = self.edges.remove(edge_id) {
                if let Some(node) = self.nodes.get_mut(&edge.to) {
                    node.incoming.retain(|e| e != edge_id);
                }
            }
        }
        if !outgoing.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::debug!("graph_disconnect: {} edge(s) from {id}", outgoing.len());
            self.order_dirty = true;
        }
        Ok(outgoing.len())
    }

    /// Removes a single edge.
    pub fn disconnect_edge(&mut self, id: EdgeId) -> Result<(), GraphError> {
        let edge = self.edges.remove(&id).ok_or(GraphError::EdgeNotFound(id))?;
        if let Some(node) = self.nodes.get_mut(&edge.from) {
            node.outgoing.retain(|e| *e != id);
        }
        if let Some(node) = self.nodes.get_mut(&edge.to) {
            node.incoming.retain(|e| *e != id);
        }
        self.order_dirty = true;
        Ok(())
    }

    /// Depth-first search along outgoing edges.
    fn reaches(&self, start: NodeId, target: NodeId) -> bool {
        let mut stack = vec![start];
        let mut seen = Vec::new();
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if seen.contains(&id) {
                continue;
            }
            seen.push(id);
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.outgoing.iter().filter_map(|e| self.edges.get(e).map(|e| e.to)));
            }
        }
        false
    }

    // --- Introspection ---

    /// Whether the node exists.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Kind of a node, or `None` if it does not exist.
    pub fn node_kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(&id).map(|n| n.processor.kind())
    }

    /// Number of nodes, including the destination.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of nodes of `kind`.
    pub fn count_of(&self, kind: NodeKind) -> usize {
        self.nodes
            .values()
            .filter(|n| n.processor.kind() == kind)
            .count()
    }

    /// Whether `from` feeds `to`'s audio input.
    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        self.has_edge(from, to, EdgeTarget::Input)
    }

    /// Whether `from` feeds parameter `param` of `to`.
    pub fn is_connected_to_param(&self, from: NodeId, to: NodeId, param: ParamKind) -> bool {
        self.has_edge(from, to, EdgeTarget::Param(param))
    }

    fn has_edge(&self, from: NodeId, to: NodeId, target: EdgeTarget) -> bool {
        self.nodes.get(&from).is_some_and(|n| {
            n.outgoing
                .iter()
                .filter_map(|e| self.edges.get(e))
                .any(|e| e.to == to && e.target == target)
        })
    }

    /// Nodes whose output feeds `id`'s audio input.
    pub fn inputs_of(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&id)
            .map(|n| {
                n.incoming
                    .iter()
                    .filter_map(|e| self.edges.get(e))
                    .filter(|e| e.target == EdgeTarget::Input)
                    .map(|e| e.from)
                    .collect()
            })
            .unwrap_or_default()
    }

    // --- Parameters ---

    /// Borrow a node's parameter.
    pub fn param(&self, id: NodeId, param: ParamKind) -> Result<&AudioParam, GraphError> {
        self.nodes
            .get(&id)
            .ok_or(GraphError::NodeNotFound(id))?
            .processor
            .param(param)
            .ok_or(GraphError::NoSuchParam(id, param))
    }

    /// Mutably borrow a node's parameter to schedule automation.
    pub fn param_mut(&mut self, id: NodeId, param: ParamKind) -> Result<&mut AudioParam, GraphError> {
        self.nodes
            .get_mut(&id)
            .ok_or(GraphError::NodeNotFound(id))?
            .processor
            .param_mut(param)
            .ok_or(GraphError::NoSuchParam(id, param))
    }

    /// Change a filter's response type.
    pub fn set_filter_kind(&mut self, id: NodeId, kind: BiquadKind) -> Result<(), GraphError> {
        match &mut self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?.processor {
            Processor::Filter(filter) => {
                filter.kind = kind;
                Ok(())
            }
            _ => Err(GraphError::InvalidConnection(format!("node {id} is not a filter"))),
        }
    }

    /// A filter's response type, or `None` if `id` is not a filter.
    pub fn filter_kind(&self, id: NodeId) -> Option<BiquadKind> {
        match self.nodes.get(&id).map(|n| &n.processor) {
            Some(Processor::Filter(filter)) => Some(filter.kind),
            _ => None,
        }
    }

    /// An oscillator's waveform, or `None` if `id` is not an oscillator.
    pub fn waveform(&self, id: NodeId) -> Option<Waveform> {
        match self.nodes.get(&id).map(|n| &n.processor) {
            Some(Processor::Oscillator(osc)) => Some(osc.osc.waveform()),
            _ => None,
        }
    }

    /// Copy the analyser's most recent samples into `out`, oldest first.
    ///
    /// If `out` is longer than the analyser's window, the front is zero-filled.
    pub fn analyser_data(&self, id: NodeId, out: &mut [f32]) -> Result<(), GraphError> {
        let Processor::Analyser(analyser) =
            &self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))?.processor
        else {
            return Err(GraphError::NotAnAnalyser(id));
        };
        let len = analyser.ring.len();
        let take = out.len().min(len);
        let pad = out.len() - take;
        out[..pad].fill(0.0);
        let start = (analyser.write_pos + len - take) % len;
        for (i, slot) in out[pad..].iter_mut().enumerate() {
            *slot = analyser.ring[(start + i) % len];
        }
        Ok(())
    }

    // --- Rendering ---

    /// Render `output.len()` frames, advancing the clock.
    ///
    /// Rendering happens in quanta of [`block_size()`](Self::block_size);
    /// scheduled disposals are applied between quanta.
    pub fn render(&mut self, output: &mut [f32]) {
        for chunk in output.chunks_mut(self.block_size) {
            self.render_quantum(chunk.len());
            if let Some(dest) = self.nodes.get(&self.destination) {
                chunk.copy_from_slice(&dest.output[..chunk.len()]);
            }
        }
    }

    /// Advance the clock by `frames` without collecting output.
    pub fn advance(&mut self, frames: usize) {
        let mut remaining = frames;
        while remaining > 0 {
            let n = remaining.min(self.block_size);
            self.render_quantum(n);
            remaining -= n;
        }
    }

    fn render_quantum(&mut self, frames: usize) {
        if self.order_dirty {
            self.rebuild_order();
        }

        let t0 = self.current_time();
        let Self {
            nodes,
            edges,
            order,
            scratch_input,
            scratch_params,
            sample_rate,
            ..
        } = self;

        for id in order.iter() {
            let Some(node) = nodes.get(id) else { continue };

            scratch_input[..frames].fill(0.0);
            let mut connected = [false; ParamKind::COUNT];
            for edge in node.incoming.iter().filter_map(|e| edges.get(e)) {
                let Some(source) = nodes.get(&edge.from) else {
                    continue;
                };
                let dest = match edge.target {
                    EdgeTarget::Input => &mut scratch_input[..frames],
                    EdgeTarget::Param(param) => {
                        let slot = param.slot();
                        if !connected[slot] {
                            scratch_params[slot][..frames].fill(0.0);
                            connected[slot] = true;
                        }
                        &mut scratch_params[slot][..frames]
                    }
                };
                for (d, s) in dest.iter_mut().zip(&source.output[..frames]) {
                    *d += *s;
                }
            }

            if let Some(node) = nodes.get_mut(id) {
                let NodeData {
                    processor, output, ..
                } = node;
                processor.render(
                    t0,
                    *sample_rate,
                    &scratch_input[..frames],
                    scratch_params,
                    connected,
                    &mut output[..frames],
                );
            }
        }

        self.frame += frames as u64;
        self.collect_disposed();
    }

    fn collect_disposed(&mut self) {
        let now = self.current_time();
        let expired: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.dispose_at.is_some_and(|t| t <= now))
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            // Only fails for an id that vanished mid-loop, which cannot happen here.
            let _ = self.remove_node(id);
        }
    }

    /// Kahn's algorithm over audio and parameter edges.
    fn rebuild_order(&mut self) {
        let mut in_degree: BTreeMap<NodeId, usize> = self
            .nodes
            .iter()
            .map(|(id, n)| (*id, n.incoming.len()))
            .collect();
        let mut ready: Vec<NodeId> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();

        self.order.clear();
        while let Some(id) = ready.pop() {
            self.order.push(id);
            if let Some(node) = self.nodes.get(&id) {
                for edge in node.outgoing.iter().filter_map(|e| self.edges.get(e)) {
                    if let Some(d) = in_degree.get_mut(&edge.to) {
                        *d -= 1;
                        if *d == 0 {
                            ready.push(edge.to);
                        }
                    }
                }
            }
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_sort: {} nodes in render order", self.order.len());
        self.order_dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48000.0;

    fn peak(buf: &[f32]) -> f32 {
        buf.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    #[test]
    fn new_graph_has_only_destination() {
        let graph = AudioGraph::new(SR, 128);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.node_kind(graph.destination()), Some(NodeKind::Destination));
        assert_eq!(graph.current_time(), 0.0);
    }

    #[test]
    fn oscillator_through_gain_reaches_destination() {
        let mut graph = AudioGraph::new(SR, 128);
        let osc = graph.add_oscillator(Waveform::Sine, 440.0);
        let amp = graph.add_gain(0.5);
        graph.connect(osc, amp).unwrap();
        graph.connect(amp, graph.destination()).unwrap();

        let mut out = vec![0.0; 4800];
        graph.render(&mut out);
        let p = peak(&out);
        assert!((p - 0.5).abs() < 0.01, "peak {}", p);
        assert_eq!(graph.current_frame(), 4800);
    }

    #[test]
    fn connect_rejects_cycles() {
        let mut graph = AudioGraph::new(SR, 128);
        let a = graph.add_gain(1.0);
        let b = graph.add_gain(1.0);
        graph.connect(a, b).unwrap();
        assert_eq!(graph.connect(b, a), Err(GraphError::CycleDetected));
        assert_eq!(graph.connect(a, a), Err(GraphError::CycleDetected));
    }

    #[test]
    fn connect_rejects_duplicates() {
        let mut graph = AudioGraph::new(SR, 128);
        let a = graph.add_gain(1.0);
        let b = graph.add_gain(1.0);
        graph.connect(a, b).unwrap();
        assert!(matches!(graph.connect(a, b), Err(GraphError::DuplicateEdge(_, _))));
    }

    #[test]
    fn connect_rejects_audio_into_oscillator() {
        let mut graph = AudioGraph::new(SR, 128);
        let osc = graph.add_oscillator(Waveform::Sine, 440.0);
        let amp = graph.add_gain(1.0);
        assert!(matches!(
            graph.connect(amp, osc),
            Err(GraphError::InvalidConnection(_))
        ));
    }

    #[test]
    fn connect_param_checks_param_exists() {
        let mut graph = AudioGraph::new(SR, 128);
        let lfo = graph.add_oscillator(Waveform::Sine, 5.0);
        let amp = graph.add_gain(1.0);
        assert_eq!(
            graph.connect_param(lfo, amp, ParamKind::Detune),
            Err(GraphError::NoSuchParam(amp, ParamKind::Detune))
        );
        assert!(graph.connect_param(lfo, amp, ParamKind::Gain).is_ok());
        assert!(graph.is_connected_to_param(lfo, amp, ParamKind::Gain));
    }

    #[test]
    fn disconnect_removes_outgoing_and_is_repeatable() {
        let mut graph = AudioGraph::new(SR, 128);
        let osc = graph.add_oscillator(Waveform::Sine, 440.0);
        let amp = graph.add_gain(1.0);
        graph.connect(osc, amp).unwrap();

        assert_eq!(graph.disconnect(osc), Ok(1));
        assert!(!graph.is_connected(osc, amp));
        assert_eq!(graph.disconnect(osc), Ok(0));
    }

    #[test]
    fn disconnect_missing_node_is_an_error() {
        let mut graph = AudioGraph::new(SR, 128);
        let amp = graph.add_gain(1.0);
        graph.remove_node(amp).unwrap();
        assert_eq!(graph.disconnect(amp), Err(GraphError::NodeNotFound(amp)));
    }

    #[test]
    fn stopped_oscillator_goes_silent() {
        let mut graph = AudioGraph::new(SR, 128);
        let osc = graph.add_oscillator(Waveform::Square, 220.0);
        graph.connect(osc, graph.destination()).unwrap();
        graph.stop(osc, 0.01).unwrap();

        let mut out = vec![0.0; 960];
        graph.render(&mut out);
        assert!(peak(&out[..400]) > 0.5);
        assert_eq!(peak(&out[482..]), 0.0);
        assert!(!graph.is_playing(osc));
    }

    #[test]
    fn stop_twice_after_end_reports_already_stopped() {
        let mut graph = AudioGraph::new(SR, 128);
        let osc = graph.add_oscillator(Waveform::Sine, 220.0);
        graph.stop(osc, 0.0).unwrap();
        graph.advance(128);
        assert_eq!(graph.stop(osc, 1.0), Err(GraphError::AlreadyStopped(osc)));
    }

    #[test]
    fn stop_requires_oscillator() {
        let mut graph = AudioGraph::new(SR, 128);
        let amp = graph.add_gain(1.0);
        assert_eq!(graph.stop(amp, 0.0), Err(GraphError::NotAnOscillator(amp)));
    }

    #[test]
    fn disposed_nodes_are_removed_with_their_edges() {
        let mut graph = AudioGraph::new(SR, 128);
        let osc = graph.add_oscillator(Waveform::Sine, 440.0);
        let amp = graph.add_gain(1.0);
        graph.connect(osc, amp).unwrap();
        graph.connect(amp, graph.destination()).unwrap();
        graph.dispose_at(osc, 0.01).unwrap();
        graph.dispose_at(amp, 0.01).unwrap();

        graph.advance(256);
        assert!(graph.contains(osc));
        graph.advance(480);
        assert!(!graph.contains(osc));
        assert!(!graph.contains(amp));
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn destination_cannot_be_removed() {
        let mut graph = AudioGraph::new(SR, 128);
        let dest = graph.destination();
        assert!(graph.remove_node(dest).is_err());
        assert!(graph.dispose_at(dest, 0.0).is_err());
    }

    #[test]
    fn param_modulation_is_summed_into_detune() {
        let mut graph = AudioGraph::new(SR, 128);
        // DC source: a square at 0 Hz sits at +1 for its first half-cycle
        let dc = graph.add_oscillator(Waveform::Square, 0.0);
        let depth = graph.add_gain(1200.0);
        let osc = graph.add_oscillator(Waveform::Sine, 220.0);
        graph.connect(dc, depth).unwrap();
        graph.connect_param(depth, osc, ParamKind::Detune).unwrap();
        graph.connect(osc, graph.destination()).unwrap();

        let mut out = vec![0.0; 48000];
        graph.render(&mut out);
        let mut crossings = 0;
        for w in out.windows(2) {
            if w[0] <= 0.0 && w[1] > 0.0 {
                crossings += 1;
            }
        }
        // One octave up from 220 Hz
        assert!((crossings - 440i32).abs() <= 3, "crossings {}", crossings);
    }

    #[test]
    fn analyser_records_most_recent_input() {
        let mut graph = AudioGraph::new(SR, 128);
        let osc = graph.add_oscillator(Waveform::Square, 100.0);
        let tap = graph.add_analyser(256);
        graph.connect(osc, tap).unwrap();
        graph.advance(1024);

        let mut data = vec![0.0; 256];
        graph.analyser_data(tap, &mut data).unwrap();
        assert!(peak(&data) > 0.5);

        let amp = graph.add_gain(1.0);
        assert_eq!(
            graph.analyser_data(amp, &mut data),
            Err(GraphError::NotAnAnalyser(amp))
        );
    }

    #[test]
    fn gain_ramp_is_sample_accurate() {
        let mut graph = AudioGraph::new(SR, 128);
        let amp = graph.add_gain(0.0);
        let osc = graph.add_oscillator(Waveform::Sine, 440.0);
        graph.connect(osc, amp).unwrap();
        graph.connect(amp, graph.destination()).unwrap();
        {
            let gain = graph.param_mut(amp, ParamKind::Gain).unwrap();
            gain.set_value_at_time(0.0, 0.0);
            gain.linear_ramp_to_value_at_time(1.0, 0.01);
        }
        graph.advance(480);
        let g = graph.param(amp, ParamKind::Gain).unwrap().value();
        assert!((g - 1.0).abs() < 0.01, "gain {}", g);
    }
}
