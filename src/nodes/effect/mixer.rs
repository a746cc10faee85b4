use std::sync::Arc;

use crate::node::{Node, NodeBase, ProcessContext};
use crate::signal::{ControlValue, ControlValues, PortKind};

use super::{pan_gains, Smoothed};

/// Gain and pan moves are smoothed over this long.
const SMOOTHING_MS: f32 = 5.0;

/// One input channel. Param names are built once so queued param changes
/// never format strings on the render thread.
#[derive(Clone, Debug)]
struct Strip {
    gain: Smoothed,
    pan: Smoothed,
    gain_param: Arc<str>,
    pan_param: Arc<str>,
}

/// N-input mixer with per-channel gain, optional constant-power panning and
/// a master gain.
///
/// Inputs `in_0` .. `in_{n-1}` (Audio) and `master` (Control). A mono mixer
/// has one output `out`; a stereo one has `left` and `right`.
///
/// Params: `master`, `gain_<i>` and `pan_<i>` for every input.
pub struct Mixer {
    base: NodeBase,
    strips: Vec<Strip>,
    master: Smoothed,
    stereo: bool,
    smoothing: usize,
}

impl Mixer {
    pub fn mono(inputs: usize) -> Self {
        Self::new(inputs, false)
    }

    pub fn stereo(inputs: usize) -> Self {
        Self::new(inputs, true)
    }

    fn new(inputs: usize, stereo: bool) -> Self {
        let mut base = NodeBase::new();
        let mut strips = Vec::with_capacity(inputs);
        for i in 0..inputs {
            let strip = Strip {
                gain: Smoothed::new(1.0),
                pan: Smoothed::new(0.0),
                gain_param: Arc::from(format!("gain_{i}")),
                pan_param: Arc::from(format!("pan_{i}")),
            };
            base = base
                .with_input(&format!("in_{i}"), PortKind::Audio)
                .with_param(&strip.gain_param, 1.0f32)
                .with_param(&strip.pan_param, 0.0f32);
            strips.push(strip);
        }
        base = base
            .with_input("master", PortKind::Control)
            .with_param("master", 1.0f32);
        base = if stereo {
            base.with_output("left", PortKind::Audio)
                .with_output("right", PortKind::Audio)
        } else {
            base.with_output("out", PortKind::Audio)
        };

        Self {
            base,
            strips,
            master: Smoothed::new(1.0),
            stereo,
            smoothing: 1,
        }
    }

    pub fn with_fade_in_ms(mut self, duration_ms: f32) -> Self {
        self.base = self.base.with_fade_in_ms(duration_ms);
        self
    }

    #[inline]
    pub fn inputs(&self) -> usize {
        self.strips.len()
    }

    #[inline]
    pub fn is_stereo(&self) -> bool {
        self.stereo
    }

    pub fn channel_gain(&self, channel: usize) -> Option<f32> {
        self.strips.get(channel).map(|s| s.gain.target())
    }

    pub fn channel_pan(&self, channel: usize) -> Option<f32> {
        self.strips.get(channel).map(|s| s.pan.target())
    }

    pub fn master_gain(&self) -> f32 {
        self.master.target()
    }

    /// Returns false for an out-of-range channel.
    pub fn set_channel_gain(&mut self, channel: usize, gain: f32) -> bool {
        let gain = gain.max(0.0);
        let Some(strip) = self.strips.get_mut(channel) else {
            return false;
        };
        strip.gain.set(gain, self.smoothing);
        self.base.set_param(&strip.gain_param, &ControlValue::Float(gain));
        true
    }

    /// Returns false for an out-of-range channel.
    pub fn set_channel_pan(&mut self, channel: usize, pan: f32) -> bool {
        let pan = pan.clamp(-1.0, 1.0);
        let Some(strip) = self.strips.get_mut(channel) else {
            return false;
        };
        strip.pan.set(pan, self.smoothing);
        self.base.set_param(&strip.pan_param, &ControlValue::Float(pan));
        true
    }

    pub fn set_master_gain(&mut self, gain: f32) {
        let gain = gain.max(0.0);
        self.master.set(gain, self.smoothing);
        self.base.set_param("master", &ControlValue::Float(gain));
    }
}

/// `gain_3` -> `("gain", 3)`
fn strip_param(name: &str) -> Option<(&str, usize)> {
    let (kind, index) = name.split_once('_')?;
    Some((kind, index.parse().ok()?))
}

impl Node for Mixer {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn prepare(&mut self, sample_rate: u32, block_size: usize) {
        self.base.prepare(sample_rate, block_size);
        self.smoothing = ((SMOOTHING_MS / 1000.0) * sample_rate as f32).round().max(1.0) as usize;
        for strip in &mut self.strips {
            strip.gain.snap();
            strip.pan.snap();
        }
        self.master.snap();
    }

    fn update_control(&mut self, inputs: &ControlValues, _outputs: &mut ControlValues) {
        if let Some(master) = inputs.get("master").and_then(ControlValue::as_float) {
            if master.max(0.0) != self.master.target() {
                self.set_master_gain(master);
            }
        }
    }

    fn render_audio(&mut self, _ctx: &ProcessContext, inputs: &[Option<&[f32]>], outputs: &mut [&mut [f32]]) {
        for out in outputs.iter_mut() {
            out.fill(0.0);
        }

        match &mut *outputs {
            [left, right] => {
                for (strip, input) in self.strips.iter_mut().zip(inputs) {
                    let Some(input) = input else { continue };
                    for ((l, r), &s) in left.iter_mut().zip(right.iter_mut()).zip(*input) {
                        let gain = strip.gain.next();
                        let (pan_l, pan_r) = pan_gains(strip.pan.next());
                        *l += s * gain * pan_l;
                        *r += s * gain * pan_r;
                    }
                }
            }
            [out] => {
                for (strip, input) in self.strips.iter_mut().zip(inputs) {
                    let Some(input) = input else { continue };
                    for (o, &s) in out.iter_mut().zip(*input) {
                        *o += s * strip.gain.next();
                    }
                }
            }
            _ => return,
        }

        // One master value per frame, shared by both sides.
        let frames = outputs[0].len();
        for i in 0..frames {
            let master = self.master.next();
            for out in outputs.iter_mut() {
                out[i] *= master;
            }
        }

        self.base.fade_in_mut().apply_all(outputs);
    }

    fn set_param(&mut self, name: &str, value: &ControlValue) -> bool {
        let Some(v) = value.as_float() else {
            return false;
        };
        if name == "master" {
            self.set_master_gain(v);
            return true;
        }
        match strip_param(name) {
            Some(("gain", channel)) => self.set_channel_gain(channel, v),
            Some(("pan", channel)) => self.set_channel_pan(channel, v),
            _ => false,
        }
    }
}
