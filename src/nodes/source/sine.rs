//! Sine wave oscillator

use std::f32::consts::TAU;

use crate::node::{Node, NodeBase, ProcessContext};
use crate::signal::{ControlValue, ControlValues, PortKind};

/// A sine wave oscillator (mono source).
///
/// Inputs: `frequency` and `amplitude` (Control). Output: `out` (Audio).
/// Params: `frequency`, `amplitude`, `offset`.
///
/// Output sample `n` after prepare is
/// `sin(2π · frequency · n / sample_rate) · amplitude + offset`.
pub struct Sine {
    base: NodeBase,
    frequency: f32,
    amplitude: f32,
    offset: f32,
    /// Normalized phase in cycles, `0.0..1.0`
    phase: f32,
}

impl Sine {
    pub fn new(frequency: f32) -> Self {
        let frequency = frequency.max(0.0);
        Self {
            base: NodeBase::new()
                .with_input("frequency", PortKind::Control)
                .with_input("amplitude", PortKind::Control)
                .with_output("out", PortKind::Audio)
                .with_param("frequency", frequency)
                .with_param("amplitude", 1.0f32)
                .with_param("offset", 0.0f32),
            frequency,
            amplitude: 1.0,
            offset: 0.0,
            phase: 0.0,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.set_amplitude(amplitude);
        self
    }

    /// Constant added after scaling, e.g. to use the sine as an LFO around a
    /// center value.
    pub fn with_offset(mut self, offset: f32) -> Self {
        self.set_offset(offset);
        self
    }

    pub fn with_fade_in_ms(mut self, duration_ms: f32) -> Self {
        self.base = self.base.with_fade_in_ms(duration_ms);
        self
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    #[inline]
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    #[inline]
    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency.max(0.0);
        self.base.set_param("frequency", &ControlValue::Float(self.frequency));
    }

    pub fn set_amplitude(&mut self, amplitude: f32) {
        self.amplitude = amplitude;
        self.base.set_param("amplitude", &ControlValue::Float(amplitude));
    }

    pub fn set_offset(&mut self, offset: f32) {
        self.offset = offset;
        self.base.set_param("offset", &ControlValue::Float(offset));
    }
}

impl Node for Sine {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn prepare(&mut self, sample_rate: u32, block_size: usize) {
        self.base.prepare(sample_rate, block_size);
        self.phase = 0.0;
    }

    fn update_control(&mut self, inputs: &ControlValues, _outputs: &mut ControlValues) {
        if let Some(frequency) = inputs.get("frequency").and_then(ControlValue::as_float) {
            self.set_frequency(frequency);
        }
        if let Some(amplitude) = inputs.get("amplitude").and_then(ControlValue::as_float) {
            self.set_amplitude(amplitude);
        }
    }

    fn render_audio(&mut self, ctx: &ProcessContext, _inputs: &[Option<&[f32]>], outputs: &mut [&mut [f32]]) {
        let Some(out) = outputs.first_mut() else {
            return;
        };

        let phase_inc = self.frequency / ctx.sample_rate.max(1) as f32;
        for sample in out.iter_mut() {
            *sample = (self.phase * TAU).sin() * self.amplitude + self.offset;

            self.phase += phase_inc;
            if self.phase >= 1.0 {
                self.phase -= self.phase.floor();
            }
        }

        self.base.fade_in_mut().apply(out);
    }

    fn set_param(&mut self, name: &str, value: &ControlValue) -> bool {
        match (name, value) {
            ("frequency", ControlValue::Float(v)) => self.set_frequency(*v),
            ("amplitude", ControlValue::Float(v)) => self.set_amplitude(*v),
            ("offset", ControlValue::Float(v)) => self.set_offset(*v),
            _ => return false,
        }
        true
    }
}
