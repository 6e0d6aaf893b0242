//! Graph edge types.
//!
//! An `Edge` carries signal from a source node either into the destination
//! node's audio input or into one of its automatable parameters, where it is
//! summed with the parameter's own value every sample.

use super::node::{NodeId, ParamKind};

/// Unique identifier for an edge in the audio graph.
///
/// Edge IDs are assigned sequentially and never reused within a graph instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub(crate) u32);

impl EdgeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

/// Where an edge lands on its destination node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeTarget {
    /// The node's audio input.
    Input,
    /// One of the node's parameters.
    Param(ParamKind),
}

/// A directed connection between two nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub target: EdgeTarget,
}
