/// Linear 1 → 0 gain ramp applied to every device output when stopping.
///
/// Separate from the per-node fade-in: it masks the device going away, not
/// a change in the patch.
#[derive(Clone, Debug, Default)]
pub struct FadeOut {
    length: usize,
    remaining: usize,
    active: bool,
}

impl FadeOut {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin ramping down over `duration_ms`. A zero duration silences the
    /// output immediately.
    pub fn start(&mut self, duration_ms: f32, sample_rate: u32) {
        self.length = ((duration_ms.max(0.0) / 1000.0) * sample_rate as f32).round() as usize;
        self.remaining = self.length;
        self.active = true;
    }

    pub fn cancel(&mut self) {
        self.active = false;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True once the ramp has reached silence.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.active && self.remaining == 0
    }

    /// Gain for the next frame.
    #[inline]
    pub fn next_gain(&mut self) -> f32 {
        if !self.active {
            return 1.0;
        }
        if self.remaining == 0 {
            return 0.0;
        }
        let gain = self.remaining as f32 / self.length as f32;
        self.remaining -= 1;
        gain
    }
}
