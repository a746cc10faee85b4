//! Buffers the graph owns outside of any node: the summation scratch pool
//! and the hardware input channels.

use crate::error::GraphError;

/// Block-sized buffers for many-to-one audio inputs and control→audio
/// conversion.
///
/// Sized at mutation time to the most pooled inputs any single node needs,
/// then reused every block. It only grows.
#[derive(Debug, Default)]
pub(crate) struct ScratchPool {
    buffers: Vec<Vec<f32>>,
    block_size: usize,
}

impl ScratchPool {
    /// Make sure at least `count` buffers exist.
    pub fn reserve(&mut self, count: usize) {
        while self.buffers.len() < count {
            self.buffers.push(vec![0.0; self.block_size]);
        }
    }

    pub fn set_block_size(&mut self, block_size: usize) {
        self.block_size = block_size;
        for buffer in &mut self.buffers {
            buffer.clear();
            buffer.resize(block_size, 0.0);
        }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&[f32]> {
        self.buffers.get(index).map(Vec::as_slice)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        self.buffers.get_mut(index).map(Vec::as_mut_slice)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }
}

/// Deinterleaved hardware input, one block-sized buffer per channel.
#[derive(Debug, Default)]
pub struct PhysicalInputs {
    channels: Vec<Vec<f32>>,
}

impl PhysicalInputs {
    pub(crate) fn resize(&mut self, channels: usize, block_size: usize) {
        self.channels.resize_with(channels, Vec::new);
        for channel in &mut self.channels {
            channel.clear();
            channel.resize(block_size, 0.0);
        }
    }

    /// Copy `samples` into `channel`. Samples beyond the block are dropped and
    /// a short write is padded with silence.
    pub(crate) fn write(&mut self, channel: usize, samples: &[f32]) -> Result<(), GraphError> {
        let buffer = self
            .channels
            .get_mut(channel)
            .ok_or(GraphError::UnknownChannel(channel))?;
        let n = samples.len().min(buffer.len());
        buffer[..n].copy_from_slice(&samples[..n]);
        buffer[n..].fill(0.0);
        Ok(())
    }

    /// Read-only view of one channel's current block.
    pub fn channel(&self, channel: usize) -> Option<&[f32]> {
        self.channels.get(channel).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
