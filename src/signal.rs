//! Port, value and event types shared by nodes and the graph.
//!
//! Text travels through the signal path as `Arc<str>` so that moving a value
//! or an event from one node to the next is a reference-count bump, not an
//! allocation.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

/// The three kinds of signal a port can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortKind {
    /// A block of samples, one per frame.
    Audio,
    /// A single value per block.
    Control,
    /// A list of discrete, timestamped messages per block.
    Event,
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortKind::Audio => f.write_str("audio"),
            PortKind::Control => f.write_str("control"),
            PortKind::Event => f.write_str("event"),
        }
    }
}

/// A named, typed input or output of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Port {
    pub name: Arc<str>,
    pub kind: PortKind,
}

impl Port {
    pub fn new(name: &str, kind: PortKind) -> Self {
        Self { name: Arc::from(name), kind }
    }
}

/// A tagged control value.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Text(Arc<str>),
}

impl ControlValue {
    #[inline]
    pub fn as_float(&self) -> Option<f32> {
        match self {
            ControlValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            ControlValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ControlValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ControlValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// True if both values hold the same variant, regardless of payload.
    pub fn same_kind(&self, other: &ControlValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl Default for ControlValue {
    fn default() -> Self {
        ControlValue::Float(0.0)
    }
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlValue::Float(v) => write!(f, "{}", v),
            ControlValue::Int(v) => write!(f, "{}", v),
            ControlValue::Bool(v) => write!(f, "{}", v),
            ControlValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<f32> for ControlValue {
    fn from(v: f32) -> Self {
        ControlValue::Float(v)
    }
}

impl From<i32> for ControlValue {
    fn from(v: i32) -> Self {
        ControlValue::Int(v)
    }
}

impl From<bool> for ControlValue {
    fn from(v: bool) -> Self {
        ControlValue::Bool(v)
    }
}

impl From<&str> for ControlValue {
    fn from(v: &str) -> Self {
        ControlValue::Text(Arc::from(v))
    }
}

impl From<String> for ControlValue {
    fn from(v: String) -> Self {
        ControlValue::Text(Arc::from(v))
    }
}

/// A discrete message with a position inside the current block.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Type tag, e.g. `"trigger"` or `"noteOn"`.
    pub kind: Arc<str>,
    pub value: ControlValue,
    /// Frame within the block, `0..block_size`.
    pub offset: usize,
}

impl Event {
    pub fn new(kind: &str, value: impl Into<ControlValue>, offset: usize) -> Self {
        Self {
            kind: Arc::from(kind),
            value: value.into(),
            offset,
        }
    }

    /// Build an event from an already shared tag (no allocation).
    pub fn with_tag(kind: &Arc<str>, value: ControlValue, offset: usize) -> Self {
        Self {
            kind: kind.clone(),
            value,
            offset,
        }
    }
}

/// A named, introspectable value on a node.
///
/// Params are for tooling and automation; the execution pass never reads them.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Arc<str>,
    pub value: ControlValue,
}

impl Param {
    pub fn new(name: &str, value: impl Into<ControlValue>) -> Self {
        Self {
            name: Arc::from(name),
            value: value.into(),
        }
    }
}

/// A table of per-port values keyed by port name.
///
/// Keys are shared `Arc<str>` so an entry is allocated the first time a port
/// is written and reused on every block after that.
#[derive(Clone, Debug)]
pub struct PortMap<T> {
    entries: HashMap<Arc<str>, T>,
}

/// Control values by port name.
pub type ControlValues = PortMap<ControlValue>;

/// Event queues by port name.
pub type EventQueues = PortMap<Vec<Event>>;

impl<T> Default for PortMap<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> PortMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, port: &str) -> Option<&T> {
        self.entries.get(port)
    }

    #[inline]
    pub fn get_mut(&mut self, port: &str) -> Option<&mut T> {
        self.entries.get_mut(port)
    }

    #[inline]
    pub fn contains(&self, port: &str) -> bool {
        self.entries.contains_key(port)
    }

    /// Write `value` to `port`, reusing the existing key if there is one.
    pub fn set(&mut self, port: &str, value: T) {
        match self.entries.get_mut(port) {
            Some(slot) => *slot = value,
            None => {
                self.entries.insert(Arc::from(port), value);
            }
        }
    }

    /// Write `value` under a key the caller already shares.
    pub(crate) fn set_shared(&mut self, port: &Arc<str>, value: T) {
        match self.entries.get_mut(&**port) {
            Some(slot) => *slot = value,
            None => {
                self.entries.insert(port.clone(), value);
            }
        }
    }

    pub fn remove(&mut self, port: &str) -> Option<T> {
        self.entries.remove(port)
    }

    /// Drop every entry, keeping the table's capacity.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (&**k, v))
    }
}

impl PortMap<Vec<Event>> {
    /// Events queued on `port`, empty if none.
    pub fn events(&self, port: &str) -> &[Event] {
        self.entries.get(port).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Append an event to the queue for `port`.
    pub fn push(&mut self, port: &str, event: Event) {
        match self.entries.get_mut(port) {
            Some(queue) => queue.push(event),
            None => {
                self.entries.insert(Arc::from(port), vec![event]);
            }
        }
    }

    /// Empty every queue but keep the queues (and their capacity) around.
    pub fn clear_queues(&mut self) {
        for queue in self.entries.values_mut() {
            queue.clear();
        }
    }

    pub(crate) fn extend_shared(&mut self, port: &Arc<str>, events: &[Event]) {
        match self.entries.get_mut(&**port) {
            Some(queue) => queue.extend_from_slice(events),
            None => {
                self.entries.insert(port.clone(), events.to_vec());
            }
        }
    }
}
