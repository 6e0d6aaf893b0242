//! Polyvox Core - signal graph and DSP primitives for the polyvox synth
//!
//! This crate provides the audio graph the voice engine builds its voices in,
//! plus the sample-level building blocks the graph's nodes are made of.
//!
//! # Core Abstractions
//!
//! ## Graph
//!
//! - [`AudioGraph`] - Typed node graph with a sample clock
//! - [`NodeId`] / [`EdgeId`] - Stable handles, never reused
//! - [`ParamKind`] - Automatable node parameters
//!
//! ## Parameter Automation
//!
//! - [`AudioParam`] - Timeline of value changes evaluated per sample
//! - [`AutomationEvent`] - Set, linear ramp, exponential ramp, target
//!
//! ## Generators and Filters
//!
//! - [`Oscillator`] - PolyBLEP oscillator (sine, square, triangle, sawtooth)
//! - [`Biquad`] - Second-order IIR filter with RBJ cookbook coefficients
//!
//! ## Utilities
//!
//! - Math functions: [`db_to_linear`], [`linear_to_db`], [`cents_to_ratio`]
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible with `alloc`.
//! Disable the default `std` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! polyvox-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use polyvox_core::{AudioGraph, BiquadKind, ParamKind, Waveform};
//!
//! let mut graph = AudioGraph::new(48000.0, 128);
//! let osc = graph.add_oscillator(Waveform::Sawtooth, 110.0);
//! let filter = graph.add_filter(BiquadKind::Lowpass, 800.0, 1.0);
//! graph.connect(osc, filter).unwrap();
//! graph.connect(filter, graph.destination()).unwrap();
//!
//! let mut out = vec![0.0; 512];
//! graph.render(&mut out);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod biquad;
pub mod graph;
pub mod math;
pub mod oscillator;
pub mod param;

pub use biquad::{Biquad, BiquadCoefficients, BiquadKind};
pub use graph::{AudioGraph, EdgeId, EdgeTarget, GraphError, NodeId, NodeKind, ParamKind};
pub use math::{cents_to_ratio, db_to_linear, flush_denormal, linear_to_db};
pub use oscillator::{Oscillator, Waveform};
pub use param::{AudioParam, AutomationEvent};
