//! Core node trait and the state every node carries.

use tracing::warn;

use crate::graph::PhysicalInputs;
use crate::signal::{ControlValue, ControlValues, EventQueues, Param, Port, PortKind};

/// Default fade-in length applied by every node after it is (re)activated.
pub const DEFAULT_FADE_IN_MS: f32 = 50.0;

/// Information available while a node renders a block.
///
/// Passed to every [`Node::render_audio`] call.
#[derive(Clone, Copy)]
pub struct ProcessContext<'a> {
    /// Sample rate of the graph in Hz
    pub sample_rate: u32,
    /// Block size the graph was prepared with
    pub block_size: usize,
    /// Frames to render in this call (`<= block_size`)
    pub frames: usize,
    physical: &'a PhysicalInputs,
}

impl<'a> ProcessContext<'a> {
    pub(crate) fn new(sample_rate: u32, block_size: usize, frames: usize, physical: &'a PhysicalInputs) -> Self {
        Self {
            sample_rate,
            block_size,
            frames,
            physical,
        }
    }

    /// The current block of a hardware input channel, if that channel exists.
    ///
    /// Any node may read physical inputs; no registration is required.
    pub fn physical_input(&self, channel: usize) -> Option<&'a [f32]> {
        self.physical.channel(channel).map(|buf| &buf[..self.frames.min(buf.len())])
    }
}

/// A linear 0 → 1 gain ramp applied to a node's own output after activation.
///
/// For ramp length `L = duration_ms / 1000 * sample_rate` samples, output
/// sample `k` after activation is `raw(k) * min(1, k / L)`.
#[derive(Clone, Debug)]
pub struct FadeIn {
    duration_ms: f32,
    sample_rate: u32,
    length: f32,
    position: usize,
}

impl Default for FadeIn {
    fn default() -> Self {
        Self::new(DEFAULT_FADE_IN_MS)
    }
}

impl FadeIn {
    pub fn new(duration_ms: f32) -> Self {
        Self {
            duration_ms: duration_ms.max(0.0),
            sample_rate: 0,
            length: 0.0,
            position: 0,
        }
    }

    /// Recompute the ramp length for `sample_rate` and restart the ramp.
    pub fn prepare(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.update_length();
        self.reset();
    }

    /// Change the duration. Takes effect on the next [`reset`](Self::reset).
    pub fn set_duration(&mut self, duration_ms: f32) {
        self.duration_ms = duration_ms.max(0.0);
        self.update_length();
    }

    #[inline]
    pub fn duration_ms(&self) -> f32 {
        self.duration_ms
    }

    /// Ramp length in samples at the prepared sample rate. Not rounded.
    #[inline]
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Restart the ramp from silence.
    pub fn reset(&mut self) {
        self.position = 0;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        (self.position as f32) < self.length
    }

    /// Apply the ramp to one buffer and advance it.
    pub fn apply(&mut self, buffer: &mut [f32]) {
        self.apply_all(&mut [buffer]);
    }

    /// Apply the same ramp segment to every output and advance it once.
    pub fn apply_all(&mut self, outputs: &mut [&mut [f32]]) {
        if !self.is_active() {
            return;
        }
        let frames = outputs.iter().map(|o| o.len()).max().unwrap_or(0);
        // Every sample index below the real-valued length gets a gain < 1.
        let remaining = self.length.ceil() as usize - self.position;
        let ramp = frames.min(remaining);

        for output in outputs.iter_mut() {
            for (k, sample) in output.iter_mut().take(ramp).enumerate() {
                *sample *= ((self.position + k) as f32 / self.length).min(1.0);
            }
        }
        self.position += ramp;
    }

    fn update_length(&mut self) {
        self.length = (self.duration_ms / 1000.0) * self.sample_rate as f32;
    }
}

/// Ports, params, timing and fade-in state common to every node.
///
/// Concrete nodes embed one and hand it out through [`Node::base`].
#[derive(Clone, Debug, Default)]
pub struct NodeBase {
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    params: Vec<Param>,
    fade_in: FadeIn,
    sample_rate: u32,
    block_size: usize,
}

impl NodeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an input port. Duplicate names are ignored.
    pub fn with_input(mut self, name: &str, kind: PortKind) -> Self {
        if self.input(name).is_some() {
            warn!("duplicate input port '{}' ignored", name);
        } else {
            self.inputs.push(Port::new(name, kind));
        }
        self
    }

    /// Declare an output port. Duplicate names are ignored.
    pub fn with_output(mut self, name: &str, kind: PortKind) -> Self {
        if self.output(name).is_some() {
            warn!("duplicate output port '{}' ignored", name);
        } else {
            self.outputs.push(Port::new(name, kind));
        }
        self
    }

    pub fn with_param(mut self, name: &str, value: impl Into<ControlValue>) -> Self {
        self.params.push(Param::new(name, value));
        self
    }

    pub fn with_fade_in_ms(mut self, duration_ms: f32) -> Self {
        self.fade_in.set_duration(duration_ms);
        self
    }

    /// Record timing and restart the fade-in.
    pub fn prepare(&mut self, sample_rate: u32, block_size: usize) {
        self.sample_rate = sample_rate;
        self.block_size = block_size;
        self.fade_in.prepare(sample_rate);
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| &*p.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| &*p.name == name)
    }

    /// Position of an Audio input among the node's Audio inputs.
    pub fn audio_input_index(&self, name: &str) -> Option<usize> {
        kind_index(&self.inputs, name, PortKind::Audio)
    }

    /// Position of an Audio output among the node's Audio outputs.
    pub fn audio_output_index(&self, name: &str) -> Option<usize> {
        kind_index(&self.outputs, name, PortKind::Audio)
    }

    pub fn audio_input_count(&self) -> usize {
        self.inputs.iter().filter(|p| p.kind == PortKind::Audio).count()
    }

    pub fn audio_output_count(&self) -> usize {
        self.outputs.iter().filter(|p| p.kind == PortKind::Audio).count()
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ControlValue> {
        self.params.iter().find(|p| &*p.name == name).map(|p| &p.value)
    }

    /// Store `value` if a param called `name` exists and holds the same variant.
    pub fn set_param(&mut self, name: &str, value: &ControlValue) -> bool {
        match self.params.iter_mut().find(|p| &*p.name == name) {
            Some(param) if param.value.same_kind(value) => {
                param.value = value.clone();
                true
            }
            _ => false,
        }
    }

    pub fn fade_in(&self) -> &FadeIn {
        &self.fade_in
    }

    pub fn fade_in_mut(&mut self) -> &mut FadeIn {
        &mut self.fade_in
    }
}

fn kind_index(ports: &[Port], name: &str, kind: PortKind) -> Option<usize> {
    ports
        .iter()
        .filter(|p| p.kind == kind)
        .position(|p| &*p.name == name)
}

/// The processing contract every node implements.
///
/// Per block the graph calls, in order: [`update_events`](Self::update_events),
/// [`update_control`](Self::update_control), then
/// [`render_audio`](Self::render_audio). Only `render_audio` is required.
///
/// ```
/// use patchbay::{Node, NodeBase, PortKind, ProcessContext};
///
/// /// Outputs its input inverted.
/// struct Invert {
///     base: NodeBase,
/// }
///
/// impl Invert {
///     fn new() -> Self {
///         Self {
///             base: NodeBase::new()
///                 .with_input("in", PortKind::Audio)
///                 .with_output("out", PortKind::Audio),
///         }
///     }
/// }
///
/// impl Node for Invert {
///     fn base(&self) -> &NodeBase { &self.base }
///     fn base_mut(&mut self) -> &mut NodeBase { &mut self.base }
///
///     fn render_audio(
///         &mut self,
///         _ctx: &ProcessContext,
///         inputs: &[Option<&[f32]>],
///         outputs: &mut [&mut [f32]],
///     ) {
///         let out = &mut *outputs[0];
///         match inputs[0] {
///             Some(input) => out.iter_mut().zip(input).for_each(|(o, i)| *o = -i),
///             // Disconnected input is silence
///             None => out.fill(0.0),
///         }
///         self.base.fade_in_mut().apply(out);
///     }
/// }
/// ```
pub trait Node: Send + 'static {
    fn base(&self) -> &NodeBase;

    fn base_mut(&mut self) -> &mut NodeBase;

    /// Reset all timing-derived state. Must be safe to call repeatedly.
    ///
    /// Overrides should call `NodeBase::prepare` so the fade-in is recomputed.
    fn prepare(&mut self, sample_rate: u32, block_size: usize) {
        self.base_mut().prepare(sample_rate, block_size);
    }

    /// Once per block, before [`update_control`](Self::update_control).
    ///
    /// `outputs` was emptied by the graph at the start of the block.
    fn update_events(&mut self, _inputs: &EventQueues, _outputs: &mut EventQueues) {}

    /// Once per block, before [`render_audio`](Self::render_audio).
    ///
    /// Values written to `outputs` are visible to every node processed later
    /// in the same block. Inputs holding an unexpected variant are ignored.
    fn update_control(&mut self, _inputs: &ControlValues, _outputs: &mut ControlValues) {}

    /// Render one block.
    ///
    /// `inputs` holds one entry per Audio input port in declaration order;
    /// `None` means nothing is connected and must be treated as silence.
    /// `outputs` holds one buffer per Audio output port; every sample of each
    /// must be written.
    fn render_audio(&mut self, ctx: &ProcessContext, inputs: &[Option<&[f32]>], outputs: &mut [&mut [f32]]);

    /// Set a param by name. Returns `false` for an unknown name or a value of
    /// the wrong variant.
    fn set_param(&mut self, name: &str, value: &ControlValue) -> bool {
        self.base_mut().set_param(name, value)
    }

    /// True if this node only ever wants its sources' previous block.
    ///
    /// With topological ordering such nodes run before everything else and
    /// edges into them are not ordering constraints, which is what lets a
    /// feedback loop through them be scheduled.
    fn delays_input(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fade_in_follows_linear_law() {
        // 10 ms at 1 kHz = 10 samples
        let mut fade = FadeIn::new(10.0);
        fade.prepare(1000);
        assert_eq!(fade.length(), 10.0);

        let mut block = [1.0f32; 4];
        let mut seen = Vec::new();
        for _ in 0..4 {
            block.fill(1.0);
            fade.apply(&mut block);
            seen.extend_from_slice(&block);
        }

        for (k, &s) in seen.iter().enumerate() {
            let expected = (k as f32 / 10.0).min(1.0);
            assert!((s - expected).abs() < 1e-6, "sample {}: {} != {}", k, s, expected);
        }
        assert!(!fade.is_active());
    }

    #[test]
    fn fractional_length_is_not_rounded() {
        // 1 ms at 44.1 kHz = 44.1 samples
        let mut fade = FadeIn::new(1.0);
        fade.prepare(44_100);
        let length = 1.0 / 1000.0 * 44_100.0f32;

        let mut block = [1.0f32; 64];
        fade.apply(&mut block);

        for (k, &s) in block.iter().enumerate() {
            let expected = (k as f32 / length).min(1.0);
            assert!((s - expected).abs() < 1e-6, "sample {}: {} != {}", k, s, expected);
        }
        assert!(block[44] < 1.0);
        assert_eq!(block[45], 1.0);
        assert!(!fade.is_active());
    }

    #[test]
    fn fade_in_advances_once_for_all_outputs() {
        let mut fade = FadeIn::new(4.0);
        fade.prepare(1000);

        let mut left = [1.0f32; 2];
        let mut right = [1.0f32; 2];
        fade.apply_all(&mut [&mut left[..], &mut right[..]]);

        assert_eq!(left, right);
        assert_eq!(left, [0.0, 0.25]);
    }

    #[test]
    fn zero_duration_disables_fade() {
        let mut fade = FadeIn::new(0.0);
        fade.prepare(48_000);
        let mut block = [0.7f32; 8];
        fade.apply(&mut block);
        assert_eq!(block, [0.7; 8]);
    }

    #[test]
    fn reset_restarts_ramp() {
        let mut fade = FadeIn::new(2.0);
        fade.prepare(1000);
        let mut block = [1.0f32; 4];
        fade.apply(&mut block);
        assert!(!fade.is_active());

        fade.reset();
        block.fill(1.0);
        fade.apply(&mut block);
        assert_eq!(block, [0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn set_param_rejects_wrong_variant() {
        let mut base = NodeBase::new().with_param("gain", 0.5f32);
        assert!(base.set_param("gain", &ControlValue::Float(0.8)));
        assert!(!base.set_param("gain", &ControlValue::Int(1)));
        assert!(!base.set_param("missing", &ControlValue::Float(1.0)));
        assert_eq!(base.param("gain"), Some(&ControlValue::Float(0.8)));
    }

    #[test]
    fn audio_indices_skip_other_kinds() {
        let base = NodeBase::new()
            .with_input("freq", PortKind::Control)
            .with_input("a", PortKind::Audio)
            .with_input("b", PortKind::Audio)
            .with_input("a", PortKind::Event);
        assert_eq!(base.inputs().len(), 3);
        assert_eq!(base.audio_input_index("a"), Some(0));
        assert_eq!(base.audio_input_index("b"), Some(1));
        assert_eq!(base.audio_input_index("freq"), None);
        assert_eq!(base.audio_input_count(), 2);
    }
}
