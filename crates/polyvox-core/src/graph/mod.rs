//! Audio graph for the polyvox voice engine.
//!
//! A graph is a set of typed nodes (oscillator, filter, gain, analyser and a
//! single destination) joined by directed edges. An edge feeds either a node's
//! audio input or one of its automatable [`ParamKind`]s, where the incoming
//! signal is summed with the parameter's own scheduled value.
//!
//! # Rendering
//!
//! [`AudioGraph::render`] pulls audio in fixed-size quanta. Each quantum
//! visits nodes in topological order, so a node always sees the current
//! quantum's output of everything upstream. The graph keeps a frame counter
//! as its clock; every automation event and oscillator start/stop time is
//! expressed in seconds on that clock.
//!
//! # Lifetime
//!
//! Nodes can be removed immediately ([`AudioGraph::remove_node`]) or at a
//! future clock time ([`AudioGraph::dispose_at`]). A released voice schedules
//! its disposal after its fade so the node set stays bounded under sustained
//! play.
//!
//! # no_std Support
//!
//! This module is `no_std` compatible with `alloc`.

pub mod edge;
pub mod node;
mod processing;

pub use edge::{EdgeId, EdgeTarget};
pub use node::{NodeId, NodeKind, ParamKind};
pub use processing::{AudioGraph, GraphError};
