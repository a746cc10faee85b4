//! Thread-safe front end for a [`Graph`].
//!
//! One render thread and any number of control threads share an
//! [`Engine`] (usually behind an `Arc`). All graph state sits behind a
//! single mutex:
//!
//! - Control threads (`create_node`, `connect`, ...) lock it blocking and may
//!   allocate.
//! - The render thread only ever `try_lock`s it. On contention the block is
//!   skipped and every output buffer keeps its previous contents.
//! - Param changes bypass the mutex through a lock-free `rtrb` queue that the
//!   graph drains at the start of each rendered block.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rtrb::{Producer, RingBuffer};

use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::graph::Graph;
use crate::node::Node;
use crate::signal::ControlValue;

/// A queued param update, applied at the start of the next rendered block.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamChange {
    pub node: Arc<str>,
    pub param: Arc<str>,
    pub value: ControlValue,
}

impl ParamChange {
    pub fn new(node: &str, param: &str, value: impl Into<ControlValue>) -> Self {
        Self {
            node: Arc::from(node),
            param: Arc::from(param),
            value: value.into(),
        }
    }
}

/// Outcome of [`Engine::process`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderStatus {
    Rendered,
    /// A topology edit held the lock; nothing was written this block.
    Skipped,
}

/// A [`Graph`] shared between a render thread and control threads.
///
/// ```
/// use std::sync::Arc;
/// use patchbay::{Engine, RenderStatus};
/// use patchbay::nodes::Sine;
///
/// let engine = Arc::new(Engine::new());
/// engine.prepare(48_000, 128);
/// engine.create_node("osc", Sine::new(220.0)).unwrap();
///
/// let render = Arc::clone(&engine);
/// std::thread::spawn(move || {
///     // Never blocks on a concurrent edit.
///     let _ = render.process(128);
/// })
/// .join()
/// .unwrap();
///
/// engine.set_param("osc", "frequency", 330.0f32).ok();
/// assert_eq!(engine.process(128), RenderStatus::Rendered);
/// ```
pub struct Engine {
    graph: Mutex<Graph>,
    params: Mutex<Producer<ParamChange>>,
    skipped: AtomicU64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::from_graph(Graph::new())
    }

    pub fn with_config(config: GraphConfig) -> Self {
        Self::from_graph(Graph::with_config(config))
    }

    /// Wrap an existing graph. Its nodes and connections are kept.
    pub fn from_graph(mut graph: Graph) -> Self {
        let (producer, consumer) = RingBuffer::new(graph.config().param_queue_capacity);
        graph.attach_param_queue(consumer);
        Self {
            graph: Mutex::new(graph),
            params: Mutex::new(producer),
            skipped: AtomicU64::new(0),
        }
    }

    // ── Control thread ──────────────────────────────────────────────────────

    pub fn create_node<N: Node>(&self, id: &str, node: N) -> Result<(), GraphError> {
        self.graph.lock().create_node(id, node)
    }

    pub fn create_boxed(&self, id: &str, node: Box<dyn Node>) -> Result<(), GraphError> {
        self.graph.lock().create_boxed(id, node)
    }

    pub fn remove_node(&self, id: &str) -> Result<(), GraphError> {
        self.graph.lock().remove_node(id)
    }

    pub fn connect(&self, from: &str, from_port: &str, to: &str, to_port: &str) -> Result<(), GraphError> {
        self.graph.lock().connect(from, from_port, to, to_port)
    }

    pub fn disconnect(&self, from: &str, from_port: &str, to: &str, to_port: &str) -> Result<(), GraphError> {
        self.graph.lock().disconnect(from, from_port, to, to_port)
    }

    pub fn clear(&self) {
        self.graph.lock().clear();
    }

    pub fn prepare(&self, sample_rate: u32, block_size: usize) {
        self.graph.lock().prepare(sample_rate, block_size);
    }

    pub fn set_input_channels(&self, channels: usize) {
        self.graph.lock().set_input_channels(channels);
    }

    /// Queue a param change for the next rendered block without touching the
    /// graph lock.
    ///
    /// Returns the change back if the queue is full. Unknown nodes and
    /// rejected values are dropped silently when the change is applied; use
    /// [`Graph::set_param`] through [`lock`](Self::lock) to get an error.
    pub fn set_param(&self, node: &str, param: &str, value: impl Into<ControlValue>) -> Result<(), ParamChange> {
        self.send_param(ParamChange::new(node, param, value))
    }

    pub fn send_param(&self, change: ParamChange) -> Result<(), ParamChange> {
        self.params
            .lock()
            .push(change)
            .map_err(|rtrb::PushError::Full(change)| change)
    }

    /// Run `f` with shared access to the graph, blocking for the lock.
    pub fn read<R>(&self, f: impl FnOnce(&Graph) -> R) -> R {
        f(&*self.graph.lock())
    }

    /// Copy a node's last rendered block into `dest`. Returns the number of
    /// samples copied, 0 for an unknown node or output.
    pub fn copy_node_output(&self, id: &str, output: usize, dest: &mut [f32]) -> usize {
        let graph = self.graph.lock();
        match graph.node_output(id, output) {
            Some(block) => {
                let n = block.len().min(dest.len());
                dest[..n].copy_from_slice(&block[..n]);
                n
            }
            None => 0,
        }
    }

    /// Blocking access to the graph for anything not wrapped above.
    pub fn lock(&self) -> MutexGuard<'_, Graph> {
        self.graph.lock()
    }

    // ── Render thread ───────────────────────────────────────────────────────

    /// Render one block if the graph is free, otherwise skip it.
    pub fn process(&self, frames: usize) -> RenderStatus {
        match self.graph.try_lock() {
            Some(mut graph) => {
                graph.process(frames);
                RenderStatus::Rendered
            }
            None => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                RenderStatus::Skipped
            }
        }
    }

    /// Non-blocking access for a driver that needs to write inputs, render
    /// and read outputs under one lock. `None` counts as a skipped block.
    pub fn try_graph(&self) -> Option<MutexGuard<'_, Graph>> {
        let guard = self.graph.try_lock();
        if guard.is_none() {
            self.skipped.fetch_add(1, Ordering::Relaxed);
        }
        guard
    }

    /// Blocks skipped because of lock contention.
    pub fn skipped_blocks(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}
