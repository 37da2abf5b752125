#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

const STATS_WINDOW: usize = 60;
pub const STATS_UPDATE_INTERVAL: f32 = 5.0; // Seconds between frame-rate log lines

/// Cross-platform monotonic clock.
pub struct FrameClock {
    #[cfg(not(target_arch = "wasm32"))]
    start: Instant,
    #[cfg(target_arch = "wasm32")]
    start_time_ms: f64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            start: Instant::now(),
            #[cfg(target_arch = "wasm32")]
            start_time_ms: Self::now_ms(),
        }
    }

    pub fn elapsed_seconds(&self) -> f32 {
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.start.elapsed().as_secs_f32()
        }

        #[cfg(target_arch = "wasm32")]
        {
            ((Self::now_ms() - self.start_time_ms) / 1000.0) as f32
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn now_ms() -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or_else(js_sys::Date::now)
    }
}

/// Rolling frame-time window, reported through `log` every [`STATS_UPDATE_INTERVAL`].
pub struct FrameStats {
    clock: FrameClock,
    last_frame_time: f32,
    frame_times: [f32; STATS_WINDOW],
    frame_index: usize,
    samples: usize,
    update_timer: f32,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self {
            clock: FrameClock::new(),
            last_frame_time: 0.0,
            frame_times: [0.0; STATS_WINDOW],
            frame_index: 0,
            samples: 0,
            update_timer: 0.0,
        }
    }
}

impl FrameStats {
    pub fn tick(&mut self) {
        let now = self.clock.elapsed_seconds();
        let delta = now - self.last_frame_time;
        self.last_frame_time = now;
        if let Some((fps, frame_ms)) = self.record(delta) {
            log::debug!("FPS: {fps:.1}, Frame: {frame_ms:.2}ms");
        }
    }

    /// Adds one frame time. Returns `(fps, average frame ms)` when a report is due.
    pub fn record(&mut self, delta: f32) -> Option<(f32, f32)> {
        self.frame_times[self.frame_index] = delta;
        self.frame_index = (self.frame_index + 1) % STATS_WINDOW;
        self.samples = (self.samples + 1).min(STATS_WINDOW);
        self.update_timer += delta;

        if self.update_timer < STATS_UPDATE_INTERVAL {
            return None;
        }
        self.update_timer = 0.0;

        let sum: f32 = self.frame_times[..self.samples].iter().sum();
        let average = sum / self.samples as f32;
        if average <= 0.0 {
            return None;
        }
        Some((1.0 / average, average * 1000.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_the_interval_elapses() {
        let mut stats = FrameStats::default();
        let frame = 1.0 / 50.0;
        let mut reports = Vec::new();
        for _ in 0..300 {
            if let Some(report) = stats.record(frame) {
                reports.push(report);
            }
        }
        assert_eq!(reports.len(), 1);
        let (fps, frame_ms) = reports[0];
        assert!((fps - 50.0).abs() < 0.5);
        assert!((frame_ms - 20.0).abs() < 0.1);
    }

    #[test]
    fn partial_window_averages_recorded_frames_only() {
        let mut stats = FrameStats::default();
        let report = stats.record(STATS_UPDATE_INTERVAL);
        let (fps, _) = report.unwrap();
        assert!((fps - 1.0 / STATS_UPDATE_INTERVAL).abs() < 1e-6);
    }
}
