//! # Patchbay
//!
//! A live-patchable audio node graph. Nodes declare named, typed ports
//! (Audio, Control or Event); connections wire an output port to an input
//! port; the graph renders one fixed-size block at a time and can be
//! rewired while it renders.
//!
//! ## Quick start
//!
//! ```
//! use patchbay::Graph;
//! use patchbay::nodes::{Gain, Sine};
//!
//! let mut graph = Graph::new();
//! graph.create_node("osc", Sine::new(440.0)).unwrap();
//! graph.create_node("vol", Gain::new(0.25)).unwrap();
//! graph.connect("osc", "out", "vol", "in").unwrap();
//!
//! graph.prepare(48_000, 256);
//! graph.process(256);
//! let block = graph.node_output("vol", 0).unwrap();
//! assert_eq!(block.len(), 256);
//! ```
//!
//! ## Signal kinds and conversion
//!
//! Any output kind may feed any input kind:
//!
//! | From \ To | Audio | Control | Event |
//! |---|---|---|---|
//! | Audio | direct, or summed for several sources | last sample of the block | not converted |
//! | Control | `Float` held for the whole block | copied, last source wins | not converted |
//! | Event | not converted | value of the last event | queues concatenated |
//!
//! The three "not converted" pairings are accepted as connections but carry
//! no signal, and a warning is logged when they are made.
//!
//! ## Threads
//!
//! [`Graph`] is the single-threaded core. [`Engine`] wraps it in a mutex:
//! topology edits lock, while [`Engine::process`] only ever tries the lock and
//! skips the block when an edit is in flight. Parameter changes can go
//! through a lock-free queue instead ([`Engine::set_param`]).
//!
//! ## Devices
//!
//! [`device::DeviceBridge`] turns interleaved device buffers into graph
//! blocks and back. With the `cpal_device` feature,
//! [`device::AudioDevice`] drives a bridge from a real output stream.

mod config;
mod engine;
mod error;
mod graph;
mod node;
mod signal;

pub mod device;
pub mod nodes;

pub use config::{DeviceConfig, GraphConfig};
pub use engine::{Engine, ParamChange, RenderStatus};
pub use error::{ConversionGap, DeviceError, Direction, GraphError};
pub use graph::{Connection, ExecutionOrder, Graph, PhysicalInputs};
pub use node::{FadeIn, Node, NodeBase, ProcessContext, DEFAULT_FADE_IN_MS};
pub use signal::{ControlValue, ControlValues, Event, EventQueues, Param, Port, PortKind, PortMap};
