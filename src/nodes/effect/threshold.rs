use std::sync::Arc;

use crate::node::{Node, NodeBase, ProcessContext};
use crate::signal::{ControlValue, ControlValues, Event, EventQueues, PortKind};

/// Passes audio through and emits a `trigger` event whenever the signal
/// rises above a threshold.
///
/// Inputs: `in` (Audio), `threshold` (Control). Outputs: `out` (Audio),
/// `trigger` (Event). Param: `threshold`.
///
/// Crossings found while rendering a block are published on the next
/// block, since events are delivered before audio is rendered. Each event
/// carries the crossing sample as its value and its frame as the offset.
pub struct Threshold {
    base: NodeBase,
    threshold: f32,
    above: bool,
    /// (frame, sample) crossings waiting for the next event pass
    pending: Vec<(usize, f32)>,
    tag: Arc<str>,
}

impl Threshold {
    pub fn new(threshold: f32) -> Self {
        Self {
            base: NodeBase::new()
                .with_input("in", PortKind::Audio)
                .with_input("threshold", PortKind::Control)
                .with_output("out", PortKind::Audio)
                .with_output("trigger", PortKind::Event)
                .with_param("threshold", threshold),
            threshold,
            above: false,
            pending: Vec::new(),
            tag: Arc::from("trigger"),
        }
    }

    pub fn with_fade_in_ms(mut self, duration_ms: f32) -> Self {
        self.base = self.base.with_fade_in_ms(duration_ms);
        self
    }

    #[inline]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
        self.base
            .set_param("threshold", &ControlValue::Float(threshold));
    }
}

impl Node for Threshold {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn prepare(&mut self, sample_rate: u32, block_size: usize) {
        self.base.prepare(sample_rate, block_size);
        self.above = false;
        self.pending.clear();
        self.pending.reserve(block_size);
    }

    fn update_events(&mut self, _inputs: &EventQueues, outputs: &mut EventQueues) {
        for (offset, sample) in self.pending.drain(..) {
            outputs.push(&self.tag, Event::with_tag(&self.tag, ControlValue::Float(sample), offset));
        }
    }

    fn update_control(&mut self, inputs: &ControlValues, _outputs: &mut ControlValues) {
        if let Some(threshold) = inputs.get("threshold").and_then(ControlValue::as_float) {
            if threshold != self.threshold {
                self.set_threshold(threshold);
            }
        }
    }

    fn render_audio(&mut self, _ctx: &ProcessContext, inputs: &[Option<&[f32]>], outputs: &mut [&mut [f32]]) {
        let Some(out) = outputs.first_mut() else {
            return;
        };
        match inputs.first().copied().flatten() {
            Some(input) => out.copy_from_slice(&input[..out.len()]),
            None => out.fill(0.0),
        }

        for (frame, &sample) in out.iter().enumerate() {
            let above = sample > self.threshold;
            if above && !self.above {
                self.pending.push((frame, sample));
            }
            self.above = above;
        }

        self.base.fade_in_mut().apply(out);
    }

    fn set_param(&mut self, name: &str, value: &ControlValue) -> bool {
        match (name, value) {
            ("threshold", ControlValue::Float(v)) => {
                self.set_threshold(*v);
                true
            }
            _ => false,
        }
    }
}
