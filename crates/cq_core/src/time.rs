use std::time::{Duration, Instant};

const FPS_SAMPLE_COUNT: usize = 60;

/// Fixed-timestep accumulator. Each video frame feeds in the wall-clock time
/// since the previous frame; `should_step` then hands out whole ticks and
/// keeps the remainder for the next frame.
///
/// Durations are integer nanoseconds, so 30 ticks at 30 Hz consume exactly
/// 999_999_990ns and nothing drifts over a long session.
pub struct FixedStepClock {
    pub fixed_dt: Duration,
    pub max_frame_dt: Duration,
    accumulator: Duration,
    last_instant: Option<Instant>,
    pub fixed_step_count: u64,
    pub frame_count: u64,
    pub steps_this_frame: u32,
    pub real_dt: Duration,

    fps_samples: [f64; FPS_SAMPLE_COUNT],
    fps_sample_index: usize,
    pub smoothed_fps: f64,
}

impl FixedStepClock {
    pub const DEFAULT_TICK_RATE: u32 = 30;

    pub fn new(tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        let fixed_dt = Duration::from_nanos(1_000_000_000 / u64::from(tick_rate));
        Self {
            fixed_dt,
            max_frame_dt: Duration::from_millis(250),
            accumulator: Duration::ZERO,
            last_instant: None,
            fixed_step_count: 0,
            frame_count: 0,
            steps_this_frame: 0,
            real_dt: Duration::ZERO,
            fps_samples: [fixed_dt.as_secs_f64(); FPS_SAMPLE_COUNT],
            fps_sample_index: 0,
            smoothed_fps: f64::from(tick_rate),
        }
    }

    /// Feed the time elapsed since the previous frame. The first call only
    /// records `now`.
    pub fn begin_frame(&mut self, now: Instant) {
        let elapsed = match self.last_instant {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };
        self.last_instant = Some(now);
        self.advance(elapsed);
    }

    /// Feed an explicit elapsed duration.
    pub fn advance(&mut self, elapsed: Duration) {
        self.real_dt = elapsed;

        // Spiral-of-death cap
        if self.real_dt > self.max_frame_dt {
            log::warn!(
                "Frame took {:.1}ms, capping to {}ms",
                self.real_dt.as_secs_f64() * 1000.0,
                self.max_frame_dt.as_millis()
            );
            self.real_dt = self.max_frame_dt;
        }

        self.accumulator += self.real_dt;
        self.steps_this_frame = 0;
        self.frame_count += 1;

        self.fps_samples[self.fps_sample_index] = self.real_dt.as_secs_f64();
        self.fps_sample_index = (self.fps_sample_index + 1) % FPS_SAMPLE_COUNT;
        let avg_dt: f64 = self.fps_samples.iter().sum::<f64>() / FPS_SAMPLE_COUNT as f64;
        self.smoothed_fps = if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 };
    }

    pub fn should_step(&mut self) -> bool {
        if self.accumulator >= self.fixed_dt {
            self.accumulator -= self.fixed_dt;
            self.fixed_step_count += 1;
            self.steps_this_frame += 1;
            true
        } else {
            false
        }
    }

    pub fn accumulated(&self) -> Duration {
        self.accumulator
    }
}

impl Default for FixedStepClock {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TICK_RATE)
    }
}
