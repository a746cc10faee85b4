//! Gain/volume control effect

use crate::node::{Node, NodeBase, ProcessContext};
use crate::signal::{ControlValue, ControlValues, PortKind};

/// Scales its input by a gain factor.
///
/// Inputs: `in` (Audio), `gain` (Control). Output: `out` (Audio).
/// Param: `gain`.
///
/// A gain change is ramped linearly across the next rendered block and
/// lands exactly on the new value at its end.
pub struct Gain {
    base: NodeBase,
    /// Target gain
    gain: f32,
    /// Gain at the start of the next block
    current: f32,
}

impl Gain {
    pub fn new(gain: f32) -> Self {
        Self {
            base: NodeBase::new()
                .with_input("in", PortKind::Audio)
                .with_input("gain", PortKind::Control)
                .with_output("out", PortKind::Audio)
                .with_param("gain", gain),
            gain,
            current: gain,
        }
    }

    pub fn with_fade_in_ms(mut self, duration_ms: f32) -> Self {
        self.base = self.base.with_fade_in_ms(duration_ms);
        self
    }

    #[inline]
    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
        self.base.set_param("gain", &ControlValue::Float(gain));
    }
}

impl Node for Gain {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn update_control(&mut self, inputs: &ControlValues, _outputs: &mut ControlValues) {
        if let Some(gain) = inputs.get("gain").and_then(ControlValue::as_float) {
            if gain != self.gain {
                self.set_gain(gain);
            }
        }
    }

    fn render_audio(&mut self, _ctx: &ProcessContext, inputs: &[Option<&[f32]>], outputs: &mut [&mut [f32]]) {
        let Some(out) = outputs.first_mut() else {
            return;
        };

        match inputs.first().copied().flatten() {
            Some(input) if self.current != self.gain && !out.is_empty() => {
                let step = (self.gain - self.current) / out.len() as f32;
                let mut gain = self.current;
                for (o, &s) in out.iter_mut().zip(input) {
                    *o = s * gain;
                    gain += step;
                }
                self.current = self.gain;
            }
            Some(input) => {
                for (o, &s) in out.iter_mut().zip(input) {
                    *o = s * self.gain;
                }
            }
            None => {
                out.fill(0.0);
                self.current = self.gain;
            }
        }

        self.base.fade_in_mut().apply(out);
    }

    fn set_param(&mut self, name: &str, value: &ControlValue) -> bool {
        match (name, value) {
            ("gain", ControlValue::Float(v)) => {
                self.set_gain(*v);
                true
            }
            _ => false,
        }
    }
}
