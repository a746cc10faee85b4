//! Driving an [`Engine`](crate::Engine) from an audio device.
//!
//! [`DeviceBridge`] holds everything a device callback does that does not
//! depend on the hardware: splitting the device buffer into blocks, feeding
//! captured input in, rendering, routing node outputs to device channels and
//! the stop-time fade-out. [`AudioDevice`] (feature `cpal_device`) runs a
//! bridge inside a cpal output stream.

mod bridge;
#[cfg(feature = "cpal_device")]
mod cpal;
mod fade;

pub use bridge::DeviceBridge;
#[cfg(feature = "cpal_device")]
pub use self::cpal::AudioDevice;
pub use fade::FadeOut;

use std::sync::Arc;

/// Which node output feeds each device output channel.
///
/// Unmapped channels are silent. Keeping this outside the graph means
/// rewiring the patch never changes what reaches the speakers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputMap {
    routes: Vec<Option<(Arc<str>, usize)>>,
}

impl OutputMap {
    pub fn new(channels: usize) -> Self {
        Self {
            routes: vec![None; channels],
        }
    }

    pub fn channels(&self) -> usize {
        self.routes.len()
    }

    /// Route Audio output `output` of `node` to `channel`. Returns `false`
    /// if the channel does not exist.
    pub fn map(&mut self, channel: usize, node: &str, output: usize) -> bool {
        self.map_shared(channel, Arc::from(node), output)
    }

    pub(crate) fn map_shared(&mut self, channel: usize, node: Arc<str>, output: usize) -> bool {
        match self.routes.get_mut(channel) {
            Some(route) => {
                *route = Some((node, output));
                true
            }
            None => false,
        }
    }

    pub fn unmap(&mut self, channel: usize) -> bool {
        match self.routes.get_mut(channel) {
            Some(route) => {
                *route = None;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, channel: usize) -> Option<(&str, usize)> {
        self.routes
            .get(channel)?
            .as_ref()
            .map(|(node, output)| (&**node, *output))
    }
}
