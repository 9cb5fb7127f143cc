//! Animation clock driven by frame timestamps

/// Microseconds per second, the unit of frame-clock timestamps
const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Whether the animation is advancing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    Stopped,
    /// Started but waiting for the next tick to learn the current time
    Pending,
    Started,
}

/// Maps monotonically increasing timestamps to an animation progress value.
///
/// Progress advances by `progress_per_second` for every second between the
/// tick that started the animation and the current one. Stopping freezes
/// progress; starting again resumes from the frozen value.
#[derive(Debug, Clone)]
pub struct AnimationClock {
    pub state: AnimationState,
    pub progress: f64,
    pub progress_per_second: f64,
    start_time: i64,
    start_progress: f64,
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self {
            state: AnimationState::Stopped,
            progress: 0.0,
            progress_per_second: 0.08,
            start_time: 0,
            start_progress: 0.0,
        }
    }
}

impl AnimationClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.state != AnimationState::Stopped
    }

    /// Start or stop the animation
    pub fn set_running(&mut self, running: bool) {
        self.state = if running {
            AnimationState::Pending
        } else {
            AnimationState::Stopped
        };
    }

    /// Jump back to progress 0. A running clock re-anchors on the next tick.
    pub fn reset(&mut self) {
        self.progress = 0.0;
        if self.state == AnimationState::Started {
            self.state = AnimationState::Pending;
        }
    }

    /// Advance to timestamp `now_us` (microseconds). Returns true when
    /// progress changed and the frame needs redrawing.
    pub fn tick(&mut self, now_us: i64) -> bool {
        match self.state {
            AnimationState::Pending => {
                self.start_time = now_us;
                self.start_progress = self.progress;
                self.state = AnimationState::Started;
                false
            }
            AnimationState::Started => {
                let seconds = (now_us - self.start_time) as f64 / MICROS_PER_SECOND;
                self.progress = self.start_progress + seconds * self.progress_per_second;
                true
            }
            AnimationState::Stopped => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_defaults() {
        let clock = AnimationClock::new();
        assert_eq!(clock.state, AnimationState::Stopped);
        assert_eq!(clock.progress, 0.0);
        assert!((clock.progress_per_second - 0.08).abs() < 1e-12);
    }

    #[test]
    fn test_stopped_clock_ignores_ticks() {
        let mut clock = AnimationClock::new();
        assert!(!clock.tick(5_000_000));
        assert_eq!(clock.progress, 0.0);
    }

    #[test]
    fn test_pending_anchors_on_first_tick() {
        let mut clock = AnimationClock::new();
        clock.set_running(true);
        assert_eq!(clock.state, AnimationState::Pending);

        assert!(!clock.tick(10_000_000));
        assert_eq!(clock.state, AnimationState::Started);
        assert_eq!(clock.progress, 0.0);

        assert!(clock.tick(12_500_000));
        assert!((clock.progress - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_stop_and_resume_keeps_progress() {
        let mut clock = AnimationClock::new();
        clock.set_running(true);
        clock.tick(0);
        clock.tick(1_000_000);
        let frozen = clock.progress;

        clock.set_running(false);
        clock.tick(50_000_000);
        assert_eq!(clock.progress, frozen);

        clock.set_running(true);
        clock.tick(60_000_000);
        clock.tick(61_000_000);
        assert!((clock.progress - (frozen + 0.08)).abs() < 1e-12);
    }

    #[test]
    fn test_reset_rearms_running_clock() {
        let mut clock = AnimationClock::new();
        clock.set_running(true);
        clock.tick(0);
        clock.tick(3_000_000);
        clock.reset();
        assert_eq!(clock.progress, 0.0);
        assert_eq!(clock.state, AnimationState::Pending);

        clock.tick(4_000_000);
        clock.tick(5_000_000);
        assert!((clock.progress - 0.08).abs() < 1e-12);
    }

    #[test]
    fn test_reset_stopped_clock_stays_stopped() {
        let mut clock = AnimationClock::new();
        clock.progress = 0.4;
        clock.reset();
        assert_eq!(clock.progress, 0.0);
        assert_eq!(clock.state, AnimationState::Stopped);
    }
}
