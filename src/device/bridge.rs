use std::sync::Arc;

use crate::config::DeviceConfig;
use crate::engine::Engine;
use crate::error::GraphError;

use super::{FadeOut, OutputMap};

/// Hardware-independent half of a device callback.
///
/// Owns block-sized staging buffers for every device channel. If the engine
/// is busy with a topology edit when a block is due, the staging buffers are
/// left untouched and the previous block is played again.
///
/// ```
/// use std::sync::Arc;
/// use patchbay::{DeviceConfig, Engine};
/// use patchbay::device::DeviceBridge;
/// use patchbay::nodes::Sine;
///
/// let engine = Arc::new(Engine::new());
/// engine.create_node("osc", Sine::new(440.0)).unwrap();
///
/// let config = DeviceConfig::default().with_block_size(64);
/// let mut bridge = DeviceBridge::new(engine, &config);
/// bridge.map_output_channel(0, "osc", 0).unwrap();
///
/// // What a stereo output callback would receive.
/// let mut device_buffer = vec![0.0f32; 2 * 256];
/// bridge.render(&[], &mut device_buffer);
/// ```
pub struct DeviceBridge {
    engine: Arc<Engine>,
    outputs: OutputMap,
    /// Deinterleaved output, one block per channel
    staging: Vec<Vec<f32>>,
    /// Deinterleaved input, one block per channel
    captured: Vec<Vec<f32>>,
    block_size: usize,
    sample_rate: u32,
    fade: FadeOut,
    fade_out_ms: f32,
}

impl DeviceBridge {
    /// Prepare `engine` for `config` and allocate staging buffers.
    pub fn new(engine: Arc<Engine>, config: &DeviceConfig) -> Self {
        let block_size = config.block_size.max(1);
        engine.set_input_channels(config.input_channels);
        engine.prepare(config.sample_rate, block_size);

        Self {
            engine,
            outputs: OutputMap::new(config.output_channels),
            staging: vec![vec![0.0; block_size]; config.output_channels],
            captured: vec![vec![0.0; block_size]; config.input_channels],
            block_size,
            sample_rate: config.sample_rate,
            fade: FadeOut::new(),
            fade_out_ms: config.fade_out_ms,
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn outputs(&self) -> &OutputMap {
        &self.outputs
    }

    pub fn map_output_channel(&mut self, channel: usize, node: &str, output: usize) -> Result<(), GraphError> {
        self.map_shared(channel, Arc::from(node), output)
    }

    pub(crate) fn map_shared(&mut self, channel: usize, node: Arc<str>, output: usize) -> Result<(), GraphError> {
        if self.outputs.map_shared(channel, node, output) {
            Ok(())
        } else {
            Err(GraphError::UnknownChannel(channel))
        }
    }

    pub fn unmap_output_channel(&mut self, channel: usize) -> Result<(), GraphError> {
        if self.outputs.unmap(channel) {
            Ok(())
        } else {
            Err(GraphError::UnknownChannel(channel))
        }
    }

    /// Default ramp length for [`start_fade_out`](Self::start_fade_out).
    pub fn set_fade_out_duration(&mut self, duration_ms: f32) {
        self.fade_out_ms = duration_ms.max(0.0);
    }

    pub fn fade_out_duration(&self) -> f32 {
        self.fade_out_ms
    }

    /// Start ramping the device output to silence. `None` uses the default
    /// duration.
    pub fn start_fade_out(&mut self, duration_ms: Option<f32>) {
        self.fade
            .start(duration_ms.unwrap_or(self.fade_out_ms), self.sample_rate);
    }

    pub fn fade_finished(&self) -> bool {
        self.fade.is_finished()
    }

    /// Fill one interleaved device buffer.
    ///
    /// `input` is the interleaved capture buffer for the same period (may be
    /// shorter or empty; missing samples read as silence).
    pub fn render(&mut self, input: &[f32], output: &mut [f32]) {
        let out_channels = self.staging.len();
        if out_channels == 0 {
            output.fill(0.0);
            return;
        }
        let in_channels = self.captured.len();
        let total = output.len() / out_channels;

        let mut start = 0;
        while start < total {
            let frames = (total - start).min(self.block_size);

            for (channel, buffer) in self.captured.iter_mut().enumerate() {
                for (i, sample) in buffer[..frames].iter_mut().enumerate() {
                    *sample = input
                        .get((start + i) * in_channels + channel)
                        .copied()
                        .unwrap_or(0.0);
                }
            }

            self.render_block(frames);

            let chunk = &mut output[start * out_channels..(start + frames) * out_channels];
            for (i, frame) in chunk.chunks_exact_mut(out_channels).enumerate() {
                let gain = self.fade.next_gain();
                for (sample, staged) in frame.iter_mut().zip(&self.staging) {
                    *sample = staged[i] * gain;
                }
            }
            start += frames;
        }

        // Trailing samples that do not make up a whole frame.
        output[total * out_channels..].fill(0.0);
    }

    fn render_block(&mut self, frames: usize) {
        let Some(mut graph) = self.engine.try_graph() else {
            // Stale block: staging keeps what it had.
            return;
        };

        for (channel, buffer) in self.captured.iter().enumerate() {
            graph.write_physical_input(channel, &buffer[..frames]);
        }
        graph.process(frames);

        for (channel, staged) in self.staging.iter_mut().enumerate() {
            let block = self
                .outputs
                .get(channel)
                .and_then(|(node, output)| graph.node_output(node, output));
            match block {
                Some(block) => {
                    let n = frames.min(block.len());
                    staged[..n].copy_from_slice(&block[..n]);
                    staged[n..frames].fill(0.0);
                }
                None => staged[..frames].fill(0.0),
            }
        }
    }
}
