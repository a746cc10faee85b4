//! Precomputed per-node input routes.
//!
//! Routes are rebuilt from the connection list on every topology change so
//! the render pass never has to search connections or compare port names.

use std::sync::Arc;

use hashbrown::HashMap;

use super::arena::{Arena, NodeKey};
use super::Connection;
use crate::error::ConversionGap;
use crate::signal::PortKind;

/// One source feeding an Audio input.
#[derive(Clone, Debug)]
pub(crate) enum AudioFeed {
    Audio { node: NodeKey, output: usize },
    /// Control output broadcast as a constant across the block.
    Control { node: NodeKey, port: Arc<str> },
}

/// Everything connected to one Audio input port.
#[derive(Clone, Debug, Default)]
pub(crate) struct AudioRoute {
    pub feeds: Vec<AudioFeed>,
}

impl AudioRoute {
    /// A single audio feed is read in place; anything else is summed into a
    /// scratch buffer.
    pub fn needs_scratch(&self) -> bool {
        !matches!(self.feeds.as_slice(), [] | [AudioFeed::Audio { .. }])
    }
}

#[derive(Clone, Debug)]
pub(crate) enum ControlFeed {
    /// Last rendered frame of an audio buffer.
    Audio { node: NodeKey, output: usize },
    Control { node: NodeKey, port: Arc<str> },
    /// Value of the last event in a queue.
    Event { node: NodeKey, port: Arc<str> },
}

#[derive(Clone, Debug)]
pub(crate) struct ControlRoute {
    pub feed: ControlFeed,
    pub to_port: Arc<str>,
}

#[derive(Clone, Debug)]
pub(crate) struct EventRoute {
    pub node: NodeKey,
    pub port: Arc<str>,
    pub to_port: Arc<str>,
}

/// Routes into one node, in connection order.
#[derive(Clone, Debug, Default)]
pub(crate) struct NodeRoutes {
    /// Indexed by the node's Audio input position
    pub audio: Vec<AudioRoute>,
    pub control: Vec<ControlRoute>,
    pub events: Vec<EventRoute>,
}

impl NodeRoutes {
    pub fn scratch_needed(&self) -> usize {
        self.audio.iter().filter(|r| r.needs_scratch()).count()
    }

    /// True if no Audio input of the node has anything connected.
    pub fn audio_silent(&self) -> bool {
        self.audio.iter().all(|r| r.feeds.is_empty())
    }
}

enum Entry {
    Audio(usize, AudioFeed),
    Control(ControlRoute),
    Event(EventRoute),
}

/// Rebuild every node's routes from `connections`.
///
/// Returns the largest number of scratch buffers any single node needs.
pub(crate) fn rebuild(arena: &mut Arena, index: &HashMap<Arc<str>, NodeKey>, connections: &[Connection]) -> usize {
    let mut entries = Vec::with_capacity(connections.len());
    for connection in connections {
        if let Some(entry) = resolve(arena, index, connection) {
            entries.push(entry);
        }
    }

    for (_, cell) in arena.iter_mut() {
        let count = cell.node.base().audio_input_count();
        cell.routes.audio.clear();
        cell.routes.audio.resize_with(count, AudioRoute::default);
        cell.routes.control.clear();
        cell.routes.events.clear();
    }

    for (key, entry) in entries {
        let Some(cell) = arena.get_mut(key) else {
            continue;
        };
        match entry {
            Entry::Audio(input, feed) => {
                if let Some(route) = cell.routes.audio.get_mut(input) {
                    route.feeds.push(feed);
                }
            }
            Entry::Control(route) => cell.routes.control.push(route),
            Entry::Event(route) => cell.routes.events.push(route),
        }
    }

    arena
        .iter()
        .map(|(_, cell)| cell.routes.scratch_needed())
        .max()
        .unwrap_or(0)
}

fn resolve(arena: &Arena, index: &HashMap<Arc<str>, NodeKey>, c: &Connection) -> Option<(NodeKey, Entry)> {
    let from = *index.get(&c.from)?;
    let to = *index.get(&c.to)?;
    let source = arena.get(from)?.node.base();
    let dest = arena.get(to)?.node.base();
    let from_kind = source.output(&c.from_port)?.kind;
    let to_kind = dest.input(&c.to_port)?.kind;

    if ConversionGap::check(from_kind, to_kind).is_some() {
        return None;
    }

    let entry = match (from_kind, to_kind) {
        (PortKind::Audio, PortKind::Audio) => Entry::Audio(
            dest.audio_input_index(&c.to_port)?,
            AudioFeed::Audio {
                node: from,
                output: source.audio_output_index(&c.from_port)?,
            },
        ),
        (PortKind::Control, PortKind::Audio) => Entry::Audio(
            dest.audio_input_index(&c.to_port)?,
            AudioFeed::Control {
                node: from,
                port: c.from_port.clone(),
            },
        ),
        (PortKind::Audio, PortKind::Control) => Entry::Control(ControlRoute {
            feed: ControlFeed::Audio {
                node: from,
                output: source.audio_output_index(&c.from_port)?,
            },
            to_port: c.to_port.clone(),
        }),
        (PortKind::Control, PortKind::Control) => Entry::Control(ControlRoute {
            feed: ControlFeed::Control {
                node: from,
                port: c.from_port.clone(),
            },
            to_port: c.to_port.clone(),
        }),
        (PortKind::Event, PortKind::Control) => Entry::Control(ControlRoute {
            feed: ControlFeed::Event {
                node: from,
                port: c.from_port.clone(),
            },
            to_port: c.to_port.clone(),
        }),
        (PortKind::Event, PortKind::Event) => Entry::Event(EventRoute {
            node: from,
            port: c.from_port.clone(),
            to_port: c.to_port.clone(),
        }),
        _ => return None,
    };
    Some((to, entry))
}
