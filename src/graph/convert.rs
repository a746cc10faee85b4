//! Signal conversion between port kinds.
//!
//! | from \ to | Audio                | Control           | Event       |
//! |-----------|----------------------|-------------------|-------------|
//! | Audio     | summed per sample    | last frame        | not carried |
//! | Control   | constant, Float only | copied            | not carried |
//! | Event     | not carried          | last event value  | concatenated|
//!
//! Nothing here allocates once the destination tables hold their keys.

use super::arena::Arena;
use super::routing::{AudioFeed, ControlFeed, ControlRoute, EventRoute};
use crate::signal::{ControlValue, ControlValues, EventQueues};

/// Sum every feed of one Audio input into `out`, in connection order.
pub(crate) fn sum_feeds(feeds: &[AudioFeed], arena: &Arena, out: &mut [f32]) {
    out.fill(0.0);
    for feed in feeds {
        match feed {
            AudioFeed::Audio { node, output } => {
                if let Some(src) = arena.audio_output(*node, *output) {
                    for (o, s) in out.iter_mut().zip(src) {
                        *o += *s;
                    }
                }
            }
            AudioFeed::Control { node, port } => {
                let value = arena
                    .get(*node)
                    .and_then(|cell| cell.control_out.get(port))
                    .and_then(ControlValue::as_float);
                if let Some(v) = value {
                    out.iter_mut().for_each(|o| *o += v);
                }
            }
        }
    }
}

/// Fill a node's control inputs from its routes.
///
/// When several routes target the same port the last one wins. Ports whose
/// source has produced nothing yet keep their previous value.
pub(crate) fn gather_control(routes: &[ControlRoute], arena: &Arena, frames: usize, inputs: &mut ControlValues) {
    for route in routes {
        let value = match &route.feed {
            ControlFeed::Audio { node, output } => arena
                .audio_output(*node, *output)
                .and_then(|buf| buf.get(..frames))
                .and_then(|buf| buf.last())
                .map(|&s| ControlValue::Float(s)),
            ControlFeed::Control { node, port } => arena
                .get(*node)
                .and_then(|cell| cell.control_out.get(port))
                .cloned(),
            ControlFeed::Event { node, port } => arena
                .get(*node)
                .and_then(|cell| cell.event_out.events(port).last())
                .map(|event| event.value.clone()),
        };
        if let Some(value) = value {
            inputs.set_shared(&route.to_port, value);
        }
    }
}

/// Rebuild a node's event inputs from its routes.
///
/// Queues are emptied first, so events live for exactly one block.
/// Multiple sources targeting one port are concatenated in connection order.
pub(crate) fn gather_events(routes: &[EventRoute], arena: &Arena, inputs: &mut EventQueues) {
    inputs.clear_queues();
    for route in routes {
        if let Some(cell) = arena.get(route.node) {
            inputs.extend_shared(&route.to_port, cell.event_out.events(&route.port));
        }
    }
}
