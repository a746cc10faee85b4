use std::f32::consts::FRAC_PI_4;

use crate::node::{Node, NodeBase, ProcessContext};
use crate::signal::{ControlValue, ControlValues, PortKind};

/// Constant-power gains for `pan` in `-1.0..=1.0` (left to right).
#[inline]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    (angle.cos(), angle.sin())
}

/// Mono to stereo with constant-power panning.
///
/// Inputs: `in` (Audio), `pan` (Control). Outputs: `left`, `right` (Audio).
/// Param: `pan`.
pub struct Pan {
    base: NodeBase,
    pan: f32,
}

impl Pan {
    pub fn new(pan: f32) -> Self {
        let pan = pan.clamp(-1.0, 1.0);
        Self {
            base: NodeBase::new()
                .with_input("in", PortKind::Audio)
                .with_input("pan", PortKind::Control)
                .with_output("left", PortKind::Audio)
                .with_output("right", PortKind::Audio)
                .with_param("pan", pan),
            pan,
        }
    }

    pub fn with_fade_in_ms(mut self, duration_ms: f32) -> Self {
        self.base = self.base.with_fade_in_ms(duration_ms);
        self
    }

    #[inline]
    pub fn pan(&self) -> f32 {
        self.pan
    }

    pub fn set_pan(&mut self, pan: f32) {
        self.pan = pan.clamp(-1.0, 1.0);
        self.base.set_param("pan", &ControlValue::Float(self.pan));
    }
}

impl Node for Pan {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn update_control(&mut self, inputs: &ControlValues, _outputs: &mut ControlValues) {
        if let Some(pan) = inputs.get("pan").and_then(ControlValue::as_float) {
            self.set_pan(pan);
        }
    }

    fn render_audio(&mut self, _ctx: &ProcessContext, inputs: &[Option<&[f32]>], outputs: &mut [&mut [f32]]) {
        if let [left, right] = &mut *outputs {
            match inputs.first().copied().flatten() {
                Some(input) => {
                    let (l, r) = pan_gains(self.pan);
                    for ((left, right), &s) in left.iter_mut().zip(right.iter_mut()).zip(input) {
                        *left = s * l;
                        *right = s * r;
                    }
                }
                None => {
                    left.fill(0.0);
                    right.fill(0.0);
                }
            }
        }

        self.base.fade_in_mut().apply_all(outputs);
    }

    fn set_param(&mut self, name: &str, value: &ControlValue) -> bool {
        match (name, value) {
            ("pan", ControlValue::Float(v)) => {
                self.set_pan(*v);
                true
            }
            _ => false,
        }
    }
}
