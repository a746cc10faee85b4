//! The per-block execution pass.
//!
//! Nothing in this file allocates, locks or logs once the graph has been
//! prepared. Buffers are sized when the topology changes, never here.

use smallvec::SmallVec;

use super::arena::{Arena, NodeCell, NodeKey};
use super::buffers::ScratchPool;
use super::routing::AudioFeed;
use super::{convert, Graph};
use crate::node::ProcessContext;

/// Where one Audio input of the node being processed reads from.
#[derive(Clone, Copy)]
enum InputSource {
    Disconnected,
    /// Another node's output buffer, read in place
    Direct(NodeKey, usize),
    /// A summation buffer from the pool
    Scratch(usize),
}

impl Graph {
    /// Render one block of `frames` samples.
    ///
    /// Does nothing before [`prepare`](Self::prepare). `frames` larger than
    /// the prepared block size is clamped to it.
    ///
    /// Per block: pending param changes are applied, every event output is
    /// emptied, then each node in execution order has its inputs gathered and
    /// runs `update_events`, `update_control` and `render_audio`.
    pub fn process(&mut self, frames: usize) {
        if !self.prepared {
            return;
        }
        let frames = frames.min(self.block_size);
        self.apply_param_changes();

        let Graph {
            arena,
            order,
            pool,
            physical,
            sample_rate,
            block_size,
            blocks_rendered,
            ..
        } = self;

        for (_, cell) in arena.iter_mut() {
            cell.event_out.clear_queues();
        }

        let ctx = ProcessContext::new(*sample_rate, *block_size, frames, physical);
        for &key in order.iter() {
            // Checked out so its inputs can be read from the other cells.
            let Some(mut cell) = arena.take(key) else {
                continue;
            };
            render_node(&mut cell, arena, pool, &ctx);
            arena.restore(key, cell);
        }

        *blocks_rendered += 1;
    }

    fn apply_param_changes(&mut self) {
        let Some(queue) = self.params.as_mut() else {
            return;
        };
        while let Ok(change) = queue.pop() {
            let Some(&key) = self.index.get(&change.node) else {
                continue;
            };
            if let Some(cell) = self.arena.get_mut(key) {
                // A rejected change has nowhere to be reported from here.
                cell.node.set_param(&change.param, &change.value);
            }
        }
    }
}

fn render_node(cell: &mut NodeCell, arena: &Arena, pool: &mut ScratchPool, ctx: &ProcessContext) {
    let frames = ctx.frames;

    let mut sources: SmallVec<[InputSource; 8]> = SmallVec::new();
    let mut next_scratch = 0;
    for route in &cell.routes.audio {
        let source = match route.feeds.as_slice() {
            [] => InputSource::Disconnected,
            [AudioFeed::Audio { node, output }] => InputSource::Direct(*node, *output),
            feeds => match pool.get_mut(next_scratch) {
                Some(scratch) => {
                    convert::sum_feeds(feeds, arena, &mut scratch[..frames]);
                    next_scratch += 1;
                    InputSource::Scratch(next_scratch - 1)
                }
                None => InputSource::Disconnected,
            },
        };
        sources.push(source);
    }

    convert::gather_control(&cell.routes.control, arena, frames, &mut cell.control_in);
    convert::gather_events(&cell.routes.events, arena, &mut cell.event_in);

    cell.node.update_events(&cell.event_in, &mut cell.event_out);
    cell.node.update_control(&cell.control_in, &mut cell.control_out);

    let pool = &*pool;
    let inputs: SmallVec<[Option<&[f32]>; 8]> = sources
        .iter()
        .map(|source| match *source {
            InputSource::Disconnected => None,
            InputSource::Direct(node, output) => arena.audio_output(node, output).and_then(|buf| buf.get(..frames)),
            InputSource::Scratch(slot) => pool.get(slot).and_then(|buf| buf.get(..frames)),
        })
        .collect();
    let mut outputs: SmallVec<[&mut [f32]; 8]> = cell
        .audio_out
        .iter_mut()
        .map(|buf| {
            let end = frames.min(buf.len());
            &mut buf[..end]
        })
        .collect();

    cell.node.render_audio(ctx, &inputs, &mut outputs);
}
