use std::time::{Duration, Instant};

/// Abstraction over where frame timestamps originate from.
///
/// Samples are offsets from the source's origin and never move backward.
pub trait TimeSource {
    /// Resets the source to its initial state.
    fn reset(&mut self);
    /// Produces the timestamp for the next frame.
    fn sample(&mut self) -> Duration;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    /// Creates a system time source initialised to `Instant::now()`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
    }

    fn sample(&mut self) -> Duration {
        self.origin.elapsed()
    }
}

/// Time source that advances by a fixed step per sample, starting at zero.
///
/// Used to replay an animation deterministically (still exports, tests).
#[derive(Debug, Clone, Copy)]
pub struct SteppedTimeSource {
    step: Duration,
    next: Duration,
}

impl SteppedTimeSource {
    pub fn new(step: Duration) -> Self {
        Self {
            step,
            next: Duration::ZERO,
        }
    }

    /// Fixed step for a given frame rate; non-positive rates fall back to 60 FPS.
    pub fn from_fps(fps: f32) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 60.0 };
        Self::new(Duration::from_secs_f32(1.0 / fps))
    }

    pub fn step(&self) -> Duration {
        self.step
    }
}

impl TimeSource for SteppedTimeSource {
    fn reset(&mut self) {
        self.next = Duration::ZERO;
    }

    fn sample(&mut self) -> Duration {
        let sample = self.next;
        self.next = self.next.saturating_add(self.step);
        sample
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource>;
