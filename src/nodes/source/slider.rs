//! Virtual slider publishing a control value

use tracing::warn;

use crate::node::{Node, NodeBase, ProcessContext};
use crate::signal::{ControlValue, ControlValues, PortKind};

/// How a normalized `0..1` position maps onto the slider's range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SliderScale {
    #[default]
    Linear,
    /// `min · (max / min)^position`. Falls back to linear when `min <= 0`.
    Logarithmic,
}

/// A control source holding one value inside `min..=max`.
///
/// Output: `value` (Control), published every block. Param: `value`.
///
/// ```
/// use patchbay::nodes::{Slider, SliderScale};
///
/// let mut cutoff = Slider::new(20.0, 20_000.0, 1000.0).with_scale(SliderScale::Logarithmic);
/// cutoff.set_normalized(0.5);
/// assert!((cutoff.value() - 632.45).abs() < 0.1);
/// ```
pub struct Slider {
    base: NodeBase,
    min: f32,
    max: f32,
    value: f32,
    scale: SliderScale,
}

impl Slider {
    pub fn new(min: f32, max: f32, value: f32) -> Self {
        let value = clamp_to_range(value, min, max);
        Self {
            base: NodeBase::new()
                .with_output("value", PortKind::Control)
                .with_param("value", value),
            min,
            max,
            value,
            scale: SliderScale::Linear,
        }
    }

    pub fn with_scale(mut self, scale: SliderScale) -> Self {
        self.scale = scale;
        self
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    #[inline]
    pub fn min(&self) -> f32 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn set_value(&mut self, value: f32) {
        self.value = clamp_to_range(value, self.min, self.max);
        self.base.set_param("value", &ControlValue::Float(self.value));
    }

    /// Set the value from a `0..1` position on the slider.
    pub fn set_normalized(&mut self, position: f32) {
        let position = position.clamp(0.0, 1.0);
        let value = match self.scale {
            SliderScale::Logarithmic if self.min > 0.0 => self.min * (self.max / self.min).powf(position),
            _ => self.min + position * (self.max - self.min),
        };
        self.set_value(value);
    }

    /// Current value as a `0..1` position on the slider.
    pub fn normalized(&self) -> f32 {
        if self.max == self.min {
            return 0.0;
        }
        match self.scale {
            SliderScale::Logarithmic if self.min > 0.0 && self.value > 0.0 => {
                (self.value / self.min).ln() / (self.max / self.min).ln()
            }
            _ => (self.value - self.min) / (self.max - self.min),
        }
    }

    /// Change the range and re-clamp the current value.
    ///
    /// A NaN bound is rejected and the old range is kept.
    pub fn set_range(&mut self, min: f32, max: f32) -> bool {
        if min.is_nan() || max.is_nan() {
            warn!("slider range {}..{} rejected", min, max);
            return false;
        }
        self.min = min;
        self.max = max;
        self.set_value(self.value);
        true
    }
}

/// `f32::clamp` panics on a NaN bound; `max`/`min` ignore NaN instead.
fn clamp_to_range(value: f32, a: f32, b: f32) -> f32 {
    value.max(a.min(b)).min(b.max(a))
}

impl Node for Slider {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn update_control(&mut self, _inputs: &ControlValues, outputs: &mut ControlValues) {
        outputs.set("value", ControlValue::Float(self.value));
    }

    // No audio outputs.
    fn render_audio(&mut self, _ctx: &ProcessContext, _inputs: &[Option<&[f32]>], _outputs: &mut [&mut [f32]]) {}

    fn set_param(&mut self, name: &str, value: &ControlValue) -> bool {
        match (name, value) {
            ("value", ControlValue::Float(v)) => {
                self.set_value(*v);
                true
            }
            _ => false,
        }
    }
}
