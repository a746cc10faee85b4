use crate::node::{Node, NodeBase, ProcessContext};
use crate::signal::PortKind;

/// A one-block delay tap for feedback loops.
///
/// Inputs: `in` (Audio). Output: `out` (Audio).
///
/// The node copies what it reads. Under [`ExecutionOrder::Topological`] it
/// runs before every other node, so what it reads is always its source's
/// previous block. Under registration order, create it before the node
/// that feeds it to get the same effect.
///
/// [`ExecutionOrder::Topological`]: crate::ExecutionOrder::Topological
pub struct BlockDelay {
    base: NodeBase,
}

impl BlockDelay {
    pub fn new() -> Self {
        Self {
            base: NodeBase::new()
                .with_input("in", PortKind::Audio)
                .with_output("out", PortKind::Audio),
        }
    }

    pub fn with_fade_in_ms(mut self, duration_ms: f32) -> Self {
        self.base = self.base.with_fade_in_ms(duration_ms);
        self
    }
}

impl Default for BlockDelay {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for BlockDelay {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn render_audio(&mut self, _ctx: &ProcessContext, inputs: &[Option<&[f32]>], outputs: &mut [&mut [f32]]) {
        let Some(out) = outputs.first_mut() else {
            return;
        };
        match inputs.first().copied().flatten() {
            Some(input) => out.copy_from_slice(&input[..out.len()]),
            None => out.fill(0.0),
        }
        self.base.fade_in_mut().apply(out);
    }

    fn delays_input(&self) -> bool {
        true
    }
}
