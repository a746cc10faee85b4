//! Node storage.
//!
//! The graph owns every node in a generational arena. Callers only ever
//! name nodes by id; the arena hands out `NodeKey`s internally so routes can
//! point at a source without owning it.

use std::sync::Arc;

use crate::graph::routing::NodeRoutes;
use crate::node::Node;
use crate::signal::{ControlValues, EventQueues};

/// Stable handle to a slot in the arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct NodeKey {
    index: u32,
    generation: u32,
}

/// A registered node together with every buffer the graph keeps for it.
pub(crate) struct NodeCell {
    pub id: Arc<str>,
    pub node: Box<dyn Node>,
    /// One block-sized buffer per Audio output port
    pub audio_out: Vec<Vec<f32>>,
    pub control_in: ControlValues,
    pub control_out: ControlValues,
    pub event_in: EventQueues,
    pub event_out: EventQueues,
    pub routes: NodeRoutes,
}

impl NodeCell {
    pub fn new(id: Arc<str>, node: Box<dyn Node>) -> Self {
        Self {
            id,
            node,
            audio_out: Vec::new(),
            control_in: ControlValues::new(),
            control_out: ControlValues::new(),
            event_in: EventQueues::new(),
            event_out: EventQueues::new(),
            routes: NodeRoutes::default(),
        }
    }

    /// (Re)allocate output buffers for `block_size` frames.
    pub fn allocate(&mut self, block_size: usize) {
        let count = self.node.base().audio_output_count();
        self.audio_out = vec![vec![0.0; block_size]; count];
    }
}

struct Slot {
    generation: u32,
    occupied: bool,
    // `None` while occupied only during a render pass, when the cell is
    // checked out for processing.
    cell: Option<NodeCell>,
}

#[derive(Default)]
pub(crate) struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Arena {
    pub fn insert(&mut self, cell: NodeCell) -> NodeKey {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation = slot.generation.wrapping_add(1);
                slot.occupied = true;
                slot.cell = Some(cell);
                NodeKey {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    occupied: true,
                    cell: Some(cell),
                });
                NodeKey { index, generation: 0 }
            }
        }
    }

    pub fn remove(&mut self, key: NodeKey) -> Option<NodeCell> {
        let slot = self.slot_mut(key)?;
        slot.occupied = false;
        let cell = slot.cell.take();
        self.free.push(key.index);
        cell
    }

    pub fn get(&self, key: NodeKey) -> Option<&NodeCell> {
        self.slot(key)?.cell.as_ref()
    }

    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut NodeCell> {
        self.slot_mut(key)?.cell.as_mut()
    }

    /// Check a cell out for processing. Other cells stay readable meanwhile.
    pub fn take(&mut self, key: NodeKey) -> Option<NodeCell> {
        self.slot_mut(key)?.cell.take()
    }

    /// Return a cell checked out with [`take`](Self::take).
    pub fn restore(&mut self, key: NodeKey, cell: NodeCell) {
        if let Some(slot) = self.slot_mut(key) {
            slot.cell = Some(cell);
        }
    }

    #[inline]
    pub fn audio_output(&self, key: NodeKey, output: usize) -> Option<&[f32]> {
        self.get(key)?.audio_out.get(output).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &NodeCell)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let cell = slot.cell.as_ref()?;
            Some((
                NodeKey {
                    index: index as u32,
                    generation: slot.generation,
                },
                cell,
            ))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NodeKey, &mut NodeCell)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            let cell = slot.cell.as_mut()?;
            Some((
                NodeKey {
                    index: index as u32,
                    generation,
                },
                cell,
            ))
        })
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }

    fn slot(&self, key: NodeKey) -> Option<&Slot> {
        self.slots
            .get(key.index as usize)
            .filter(|s| s.occupied && s.generation == key.generation)
    }

    fn slot_mut(&mut self, key: NodeKey) -> Option<&mut Slot> {
        self.slots
            .get_mut(key.index as usize)
            .filter(|s| s.occupied && s.generation == key.generation)
    }
}
