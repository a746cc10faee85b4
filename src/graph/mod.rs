//! The audio graph: node registry, connections, buffers and execution.
//!
//! A [`Graph`] is single-threaded. Share it between a control thread and a
//! render thread through [`Engine`](crate::Engine).

mod arena;
mod buffers;
mod convert;
mod order;
mod process;
mod routing;

pub use buffers::PhysicalInputs;
pub use order::ExecutionOrder;

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use itertools::Itertools;
use rtrb::Consumer;
use tracing::{debug, info, warn};

use arena::{Arena, NodeCell, NodeKey};
use buffers::ScratchPool;

use crate::config::GraphConfig;
use crate::engine::ParamChange;
use crate::error::{ConversionGap, Direction, GraphError};
use crate::node::Node;
use crate::signal::{ControlValue, Event, PortKind};

/// A directed edge from one node's output port to another node's input port.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Connection {
    pub from: Arc<str>,
    pub from_port: Arc<str>,
    pub to: Arc<str>,
    pub to_port: Arc<str>,
}

impl Connection {
    pub fn new(from: &str, from_port: &str, to: &str, to_port: &str) -> Self {
        Self {
            from: Arc::from(from),
            from_port: Arc::from(from_port),
            to: Arc::from(to),
            to_port: Arc::from(to_port),
        }
    }

    /// True if either end of the connection is `id`.
    pub fn touches(&self, id: &str) -> bool {
        &*self.from == id || &*self.to == id
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} -> {}.{}", self.from, self.from_port, self.to, self.to_port)
    }
}

/// Registry of nodes, the connections between them and every buffer the
/// execution pass touches.
///
/// # Lifecycle
///
/// A graph starts empty and unprepared. [`prepare`](Self::prepare) fixes the
/// sample rate and block size and prepares every registered node; after that
/// [`process`](Self::process) renders one block per call. Nodes created on a
/// prepared graph are prepared and allocated immediately ("hot add") and take
/// part from the next block on.
///
/// # Example
///
/// ```
/// use patchbay::Graph;
/// use patchbay::nodes::{Gain, Sine};
///
/// let mut graph = Graph::new();
/// graph.create_node("osc", Sine::new(440.0).with_amplitude(0.5)).unwrap();
/// graph.create_node("amp", Gain::new(0.2)).unwrap();
/// graph.connect("osc", "out", "amp", "in").unwrap();
///
/// graph.prepare(48_000, 64);
/// graph.process(64);
/// let block = graph.node_output("amp", 0).unwrap();
/// assert_eq!(block.len(), 64);
/// ```
///
/// # Execution order
///
/// By default nodes run in the order they were created. A node reads this
/// block's output from nodes that ran before it and the previous block's
/// output from nodes that run after it. [`stale_connections`] lists the
/// edges affected. Set [`ExecutionOrder::Topological`] to have the graph
/// order producers before consumers instead.
///
/// [`stale_connections`]: Self::stale_connections
pub struct Graph {
    arena: Arena,
    index: HashMap<Arc<str>, NodeKey>,
    /// Keys in creation order
    registration: Vec<NodeKey>,
    /// Keys in execution order
    order: Vec<NodeKey>,
    connections: Vec<Connection>,
    pool: ScratchPool,
    physical: PhysicalInputs,
    config: GraphConfig,
    sample_rate: u32,
    block_size: usize,
    prepared: bool,
    blocks_rendered: u64,
    cycle: Vec<Arc<str>>,
    params: Option<Consumer<ParamChange>>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    pub fn with_config(config: GraphConfig) -> Self {
        let mut physical = PhysicalInputs::default();
        physical.resize(config.input_channels, 0);
        Self {
            arena: Arena::default(),
            index: HashMap::new(),
            registration: Vec::new(),
            order: Vec::new(),
            connections: Vec::new(),
            pool: ScratchPool::default(),
            physical,
            config,
            sample_rate: 0,
            block_size: 0,
            prepared: false,
            blocks_rendered: 0,
            cycle: Vec::new(),
            params: None,
        }
    }

    /// Register `node` under `id`.
    ///
    /// If the graph is prepared the node is prepared and its buffers are
    /// allocated before this returns. A duplicate id is rejected and the
    /// existing node is kept.
    pub fn create_node<N: Node>(&mut self, id: &str, node: N) -> Result<(), GraphError> {
        self.create_boxed(id, Box::new(node))
    }

    /// Like [`create_node`](Self::create_node) for an already boxed node.
    pub fn create_boxed(&mut self, id: &str, node: Box<dyn Node>) -> Result<(), GraphError> {
        if self.index.contains_key(id) {
            return Err(rejected(GraphError::DuplicateNode(Arc::from(id))));
        }

        let id: Arc<str> = Arc::from(id);
        let mut cell = NodeCell::new(id.clone(), node);
        if self.prepared {
            cell.node.prepare(self.sample_rate, self.block_size);
            cell.allocate(self.block_size);
        }

        let key = self.arena.insert(cell);
        self.index.insert(id.clone(), key);
        self.registration.push(key);
        self.refresh();
        debug!("created node '{}'", id);
        Ok(())
    }

    /// Sever every connection touching `id`, then drop the node and its
    /// buffers.
    pub fn remove_node(&mut self, id: &str) -> Result<(), GraphError> {
        let key = self.key(id).map_err(rejected)?;

        let before = self.connections.len();
        self.connections.retain(|c| !c.touches(id));
        let severed = before - self.connections.len();

        self.index.remove(id);
        self.registration.retain(|&k| k != key);
        self.arena.remove(key);
        self.refresh();
        debug!("removed node '{}' ({} connections severed)", id, severed);
        Ok(())
    }

    /// Connect `from.from_port` to `to.to_port`.
    ///
    /// Any output kind may feed any input kind; see the conversion table in
    /// the crate docs. Connections that would need one of the unimplemented
    /// conversions are accepted but carry no signal.
    pub fn connect(&mut self, from: &str, from_port: &str, to: &str, to_port: &str) -> Result<(), GraphError> {
        let (connection, from_kind, to_kind) = self
            .validate(from, from_port, to, to_port)
            .map_err(rejected)?;

        if self.connections.contains(&connection) {
            return Err(rejected(GraphError::DuplicateConnection(connection)));
        }

        match ConversionGap::check(from_kind, to_kind) {
            Some(gap) => warn!(
                "{} -> {} conversion is not implemented; {} will carry no signal",
                gap.from, gap.to, connection
            ),
            None if to_kind == PortKind::Audio => {
                // A node that was fed nothing is about to become audible.
                if let Some(cell) = self.index.get(to).and_then(|&k| self.arena.get_mut(k)) {
                    if cell.routes.audio_silent() {
                        cell.node.base_mut().fade_in_mut().reset();
                    }
                }
            }
            None => {}
        }

        self.connections.push(connection);
        self.refresh();

        if let Some(stale) = self.connections.last().filter(|c| self.is_stale(c)) {
            warn!("{} reads the previous block: '{}' runs before '{}'", stale, stale.to, stale.from);
        }
        debug!("connected {}.{} -> {}.{}", from, from_port, to, to_port);
        Ok(())
    }

    /// Remove the connection `from.from_port -> to.to_port`.
    pub fn disconnect(&mut self, from: &str, from_port: &str, to: &str, to_port: &str) -> Result<(), GraphError> {
        self.key(from).map_err(rejected)?;
        self.key(to).map_err(rejected)?;

        let connection = Connection::new(from, from_port, to, to_port);
        let Some(position) = self.connections.iter().position(|c| *c == connection) else {
            return Err(rejected(GraphError::ConnectionNotFound(connection)));
        };

        self.connections.remove(position);
        self.refresh();
        debug!("disconnected {}", connection);
        Ok(())
    }

    /// Remove every connection into or out of `id`. Returns how many were
    /// removed.
    pub fn disconnect_all(&mut self, id: &str) -> Result<usize, GraphError> {
        self.key(id).map_err(rejected)?;
        let before = self.connections.len();
        self.connections.retain(|c| !c.touches(id));
        let removed = before - self.connections.len();
        if removed > 0 {
            self.refresh();
        }
        debug!("disconnected {} connections from '{}'", removed, id);
        Ok(removed)
    }

    /// Drop every node, connection and node buffer.
    ///
    /// The sample rate, block size and physical input channels are kept, so a
    /// running driver can keep calling [`process`](Self::process) and new
    /// nodes are hot-added as usual.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.index.clear();
        self.registration.clear();
        self.order.clear();
        self.connections.clear();
        self.pool.clear();
        self.cycle.clear();
        info!("graph cleared");
    }

    /// Fix the sample rate and block size, prepare every node and
    /// (re)allocate every buffer.
    ///
    /// Safe to call again, e.g. when the device changes rate.
    pub fn prepare(&mut self, sample_rate: u32, block_size: usize) {
        self.sample_rate = sample_rate;
        self.block_size = block_size;

        for (_, cell) in self.arena.iter_mut() {
            cell.node.prepare(sample_rate, block_size);
            cell.allocate(block_size);
        }
        self.pool.set_block_size(block_size);
        let channels = self.physical.len();
        self.physical.resize(channels, block_size);

        self.prepared = true;
        self.refresh();
        info!(
            "graph prepared at {} Hz, {} frames per block, {} nodes",
            sample_rate,
            block_size,
            self.registration.len()
        );
    }

    /// Rendered block of a node's Audio output, by position among the node's
    /// Audio outputs. `None` for an unknown node or output, or before
    /// [`prepare`](Self::prepare).
    pub fn node_output(&self, id: &str, output: usize) -> Option<&[f32]> {
        let key = *self.index.get(id)?;
        self.arena.audio_output(key, output).filter(|_| self.prepared)
    }

    /// Value a node published on a Control output during the last block.
    pub fn control_output(&self, id: &str, port: &str) -> Option<&ControlValue> {
        let key = *self.index.get(id)?;
        self.arena.get(key)?.control_out.get(port)
    }

    /// Events a node emitted on an Event output during the last block.
    pub fn event_output(&self, id: &str, port: &str) -> &[Event] {
        self.index
            .get(id)
            .and_then(|&key| self.arena.get(key))
            .map(|cell| cell.event_out.events(port))
            .unwrap_or(&[])
    }

    /// Copy one deinterleaved block of hardware input into `channel`.
    ///
    /// Extra samples are dropped and a short block is padded with silence.
    pub fn set_physical_input(&mut self, channel: usize, samples: &[f32]) -> Result<(), GraphError> {
        self.physical.write(channel, samples).map_err(rejected)
    }

    /// [`set_physical_input`](Self::set_physical_input) for the render
    /// thread: no diagnostics.
    pub(crate) fn write_physical_input(&mut self, channel: usize, samples: &[f32]) -> bool {
        self.physical.write(channel, samples).is_ok()
    }

    /// Current block of a hardware input channel.
    pub fn physical_input(&self, channel: usize) -> Option<&[f32]> {
        self.physical.channel(channel)
    }

    /// Allocate buffers for `channels` hardware inputs.
    pub fn set_input_channels(&mut self, channels: usize) {
        self.config.input_channels = channels;
        self.physical.resize(channels, self.block_size);
    }

    pub fn physical_input_count(&self) -> usize {
        self.physical.len()
    }

    /// Set a param on a node immediately.
    pub fn set_param(&mut self, id: &str, name: &str, value: impl Into<ControlValue>) -> Result<(), GraphError> {
        let key = self.key(id).map_err(rejected)?;
        let value = value.into();
        let accepted = self
            .arena
            .get_mut(key)
            .map_or(false, |cell| cell.node.set_param(name, &value));
        if !accepted {
            return Err(rejected(GraphError::ParamRejected {
                node: Arc::from(id),
                param: Arc::from(name),
            }));
        }
        Ok(())
    }

    /// Restart a node's fade-in.
    pub fn reset_fade_in(&mut self, id: &str) -> Result<(), GraphError> {
        let key = self.key(id).map_err(rejected)?;
        if let Some(cell) = self.arena.get_mut(key) {
            cell.node.base_mut().fade_in_mut().reset();
        }
        Ok(())
    }

    pub fn node(&self, id: &str) -> Option<&dyn Node> {
        let key = *self.index.get(id)?;
        self.arena.get(key).map(|cell| cell.node.as_ref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.registration.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registration.is_empty()
    }

    /// Every connection, in the order it was made.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Node ids in the order they will be processed.
    pub fn execution_order(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .filter_map(|&key| self.arena.get(key))
            .map(|cell| &*cell.id)
    }

    /// Connections whose consumer runs before its producer and therefore
    /// reads the producer's previous block.
    pub fn stale_connections(&self) -> Vec<&Connection> {
        self.connections.iter().filter(|c| self.is_stale(c)).collect()
    }

    /// Nodes of the cycle that stopped the last topological sort, if any.
    pub fn order_cycle(&self) -> &[Arc<str>] {
        &self.cycle
    }

    pub fn order_mode(&self) -> ExecutionOrder {
        self.config.order
    }

    pub fn set_order_mode(&mut self, order: ExecutionOrder) {
        self.config.order = order;
        self.reorder();
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Blocks rendered since creation.
    pub fn blocks_rendered(&self) -> u64 {
        self.blocks_rendered
    }

    /// Summation buffers currently allocated.
    pub fn scratch_buffers(&self) -> usize {
        self.pool.len()
    }

    pub(crate) fn attach_param_queue(&mut self, queue: Consumer<ParamChange>) {
        self.params = Some(queue);
    }

    fn key(&self, id: &str) -> Result<NodeKey, GraphError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::UnknownNode(Arc::from(id)))
    }

    fn validate(
        &self,
        from: &str,
        from_port: &str,
        to: &str,
        to_port: &str,
    ) -> Result<(Connection, PortKind, PortKind), GraphError> {
        let from_key = self.key(from)?;
        let to_key = self.key(to)?;
        let port_kind = |key: NodeKey, node: &str, port: &str, direction: Direction| {
            let base = self.arena.get(key).map(|cell| cell.node.base());
            let found = match direction {
                Direction::Input => base.and_then(|b| b.input(port)),
                Direction::Output => base.and_then(|b| b.output(port)),
            };
            found.map(|p| p.kind).ok_or_else(|| GraphError::UnknownPort {
                node: Arc::from(node),
                port: Arc::from(port),
                direction,
            })
        };
        let from_kind = port_kind(from_key, from, from_port, Direction::Output)?;
        let to_kind = port_kind(to_key, to, to_port, Direction::Input)?;

        if from_key == to_key {
            return Err(GraphError::SelfConnection(Arc::from(from)));
        }
        Ok((Connection::new(from, from_port, to, to_port), from_kind, to_kind))
    }

    /// Consumers that delay their input want the previous block and are
    /// never stale.
    fn is_stale(&self, connection: &Connection) -> bool {
        let position = |id: &Arc<str>| {
            let key = self.index.get(id)?;
            self.order.iter().position(|k| k == key)
        };
        let delays = self
            .index
            .get(&connection.to)
            .and_then(|&key| self.arena.get(key))
            .map_or(false, |cell| cell.node.delays_input());
        match (position(&connection.from), position(&connection.to)) {
            (Some(from), Some(to)) => from > to && !delays,
            _ => false,
        }
    }

    /// Rebuild routes, grow the scratch pool and recompute the execution
    /// order. Runs after every topology change.
    fn refresh(&mut self) {
        let scratch = routing::rebuild(&mut self.arena, &self.index, &self.connections);
        self.pool.reserve(scratch);
        self.reorder();
    }

    fn reorder(&mut self) {
        if self.config.order == ExecutionOrder::Registration {
            self.order.clone_from(&self.registration);
            self.cycle.clear();
            return;
        }

        let index = &self.index;
        let arena = &self.arena;
        let edges = self
            .connections
            .iter()
            .filter_map(|c| Some((*index.get(&c.from)?, *index.get(&c.to)?)));
        let sorted = order::topological(&self.registration, edges, |key| {
            arena.get(key).map_or(false, |cell| cell.node.delays_input())
        });

        match sorted {
            Ok(order) => {
                self.order = order;
                self.cycle.clear();
            }
            Err(members) => {
                let cycle: Vec<Arc<str>> = members
                    .iter()
                    .filter_map(|&key| self.arena.get(key))
                    .map(|cell| cell.id.clone())
                    .collect();
                if cycle != self.cycle {
                    warn!(
                        "cycle without a delay between {}; running in creation order",
                        cycle.iter().map(|id| format!("'{}'", id)).join(", ")
                    );
                }
                self.cycle = cycle;
                self.order.clone_from(&self.registration);
            }
        }
    }
}

fn rejected(err: GraphError) -> GraphError {
    warn!("{}", err);
    err
}
