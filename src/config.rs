//! Graph and device configuration.

use crate::graph::ExecutionOrder;

/// Construction-time settings for a [`Graph`](crate::Graph).
///
/// ```
/// use patchbay::{ExecutionOrder, GraphConfig};
///
/// let config = GraphConfig::default()
///     .with_order(ExecutionOrder::Topological)
///     .with_input_channels(2);
/// assert_eq!(config.input_channels, 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphConfig {
    pub order: ExecutionOrder,
    /// Hardware input channels to allocate buffers for
    pub input_channels: usize,
    /// Capacity of the lock-free param queue used by [`Engine`](crate::Engine)
    pub param_queue_capacity: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            order: ExecutionOrder::Registration,
            input_channels: 0,
            param_queue_capacity: 256,
        }
    }
}

impl GraphConfig {
    pub fn with_order(mut self, order: ExecutionOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_input_channels(mut self, channels: usize) -> Self {
        self.input_channels = channels;
        self
    }

    pub fn with_param_queue_capacity(mut self, capacity: usize) -> Self {
        self.param_queue_capacity = capacity.max(1);
        self
    }
}

/// Settings for driving a graph from an audio device.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceConfig {
    pub sample_rate: u32,
    /// Frames per `process` call. Device buffers are split into chunks of
    /// at most this size.
    pub block_size: usize,
    pub output_channels: usize,
    pub input_channels: usize,
    /// Default ramp length used by `stop`
    pub fade_out_ms: f32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            block_size: 512,
            output_channels: 2,
            input_channels: 0,
            fade_out_ms: 0.0,
        }
    }
}

impl DeviceConfig {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    pub fn with_output_channels(mut self, channels: usize) -> Self {
        self.output_channels = channels;
        self
    }

    pub fn with_input_channels(mut self, channels: usize) -> Self {
        self.input_channels = channels;
        self
    }

    pub fn with_fade_out_ms(mut self, fade_out_ms: f32) -> Self {
        self.fade_out_ms = fade_out_ms.max(0.0);
        self
    }

    /// Length of one block in seconds.
    pub fn block_period(&self) -> f64 {
        self.block_size as f64 / self.sample_rate.max(1) as f64
    }
}
