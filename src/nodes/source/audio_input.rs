use crate::node::{Node, NodeBase, ProcessContext};
use crate::signal::{ControlValue, PortKind};

/// Reads one hardware input channel into the graph.
///
/// Output: `out` (Audio). Param: `channel` (Int). A channel the graph has no
/// buffer for renders silence.
pub struct AudioInput {
    base: NodeBase,
    channel: usize,
}

impl AudioInput {
    pub fn new(channel: usize) -> Self {
        Self {
            base: NodeBase::new()
                .with_output("out", PortKind::Audio)
                .with_param("channel", channel as i32),
            channel,
        }
    }

    pub fn with_fade_in_ms(mut self, duration_ms: f32) -> Self {
        self.base = self.base.with_fade_in_ms(duration_ms);
        self
    }

    #[inline]
    pub fn channel(&self) -> usize {
        self.channel
    }
}

impl Node for AudioInput {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn render_audio(&mut self, ctx: &ProcessContext, _inputs: &[Option<&[f32]>], outputs: &mut [&mut [f32]]) {
        let Some(out) = outputs.first_mut() else {
            return;
        };

        match ctx.physical_input(self.channel) {
            Some(input) => {
                let n = input.len().min(out.len());
                out[..n].copy_from_slice(&input[..n]);
                out[n..].fill(0.0);
            }
            None => out.fill(0.0),
        }

        self.base.fade_in_mut().apply(out);
    }

    fn set_param(&mut self, name: &str, value: &ControlValue) -> bool {
        match (name, value) {
            ("channel", ControlValue::Int(channel)) if *channel >= 0 => {
                self.channel = *channel as usize;
                self.base.set_param(name, value)
            }
            _ => false,
        }
    }
}
