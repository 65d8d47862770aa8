use std::time::{Duration, Instant};

/// Wall-clock frame timing. `tick` returns the seconds since the previous
/// tick; the first tick returns zero.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    start: Instant,
    last: Option<Instant>,
    paused: bool,
    max_delta: f32,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            last: None,
            paused: false,
            max_delta: 0.25,
        }
    }

    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    /// Deltas are clamped so a stall (window drag, breakpoint) does not
    /// fling the camera or the animation.
    pub fn tick_at(&mut self, now: Instant) -> f32 {
        let delta = match self.last.replace(now) {
            Some(previous) if !self.paused => now.saturating_duration_since(previous),
            _ => Duration::ZERO,
        };
        delta.as_secs_f32().min(self.max_delta)
    }

    pub fn total_time(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_is_zero_then_deltas_follow() {
        let mut timer = FrameTimer::new();
        let t0 = Instant::now();
        assert_eq!(timer.tick_at(t0), 0.0);

        let dt = timer.tick_at(t0 + Duration::from_millis(16));
        assert!((dt - 0.016).abs() < 1e-6);
    }

    #[test]
    fn long_stalls_are_clamped_and_pause_freezes() {
        let mut timer = FrameTimer::new();
        let t0 = Instant::now();
        timer.tick_at(t0);
        assert_eq!(timer.tick_at(t0 + Duration::from_secs(3)), 0.25);

        timer.set_paused(true);
        assert_eq!(timer.tick_at(t0 + Duration::from_secs(4)), 0.0);
    }
}
