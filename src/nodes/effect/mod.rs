mod delay;
mod gain;
mod mixer;
mod pan;
mod threshold;

pub use delay::*;
pub use gain::*;
pub use mixer::*;
pub use pan::*;
pub use threshold::*;

/// A value that moves linearly to its target over a fixed number of samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Smoothed {
    current: f32,
    target: f32,
    step: f32,
}

impl Smoothed {
    pub fn new(value: f32) -> Self {
        Self {
            current: value,
            target: value,
            step: 0.0,
        }
    }

    /// Head for `target`, arriving after `samples` calls to [`next`](Self::next).
    pub fn set(&mut self, target: f32, samples: usize) {
        self.target = target;
        self.step = (target - self.current) / samples.max(1) as f32;
    }

    /// Jump straight to the target.
    pub fn snap(&mut self) {
        self.current = self.target;
        self.step = 0.0;
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Current value, then advance one sample.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let value = self.current;
        if value != self.target {
            let next = value + self.step;
            let arrived = if self.step > 0.0 {
                next >= self.target
            } else {
                next <= self.target
            };
            self.current = if arrived { self.target } else { next };
        }
        value
    }
}
