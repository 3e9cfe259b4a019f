//! Frame rate statistics, reported through the log once per second.

use instant::Duration;

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Aggregate of the frames in one reporting interval.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameReport {
    pub fps: f32,
    pub mean_frame_time_ms: f32,
    pub max_frame_time_ms: f32,
}

#[derive(Debug, Default)]
pub struct FrameStats {
    frames: u32,
    elapsed: Duration,
    slowest: Duration,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one frame that took `dt`. Returns a report whenever a full
    /// interval has passed and starts the next one.
    pub fn record(&mut self, dt: Duration) -> Option<FrameReport> {
        self.frames += 1;
        self.elapsed += dt;
        self.slowest = self.slowest.max(dt);
        if self.elapsed < REPORT_INTERVAL {
            return None;
        }

        let seconds = self.elapsed.as_secs_f32();
        let report = FrameReport {
            fps: self.frames as f32 / seconds,
            mean_frame_time_ms: seconds * 1000.0 / self.frames as f32,
            max_frame_time_ms: self.slowest.as_secs_f32() * 1000.0,
        };
        *self = Self::default();
        Some(report)
    }

    /// Like [`FrameStats::record`], logging the report at debug level.
    pub fn record_and_log(&mut self, dt: Duration) {
        if let Some(report) = self.record(dt) {
            log::debug!(
                "{:.1} fps, {:.2} ms/frame (max {:.2} ms)",
                report.fps,
                report.mean_frame_time_ms,
                report.max_frame_time_ms
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_until_a_second_has_passed() {
        let mut stats = FrameStats::new();
        for _ in 0..59 {
            assert_eq!(stats.record(Duration::from_millis(16)), None);
        }
    }

    #[test]
    fn reports_and_resets() {
        let mut stats = FrameStats::new();
        let mut report = None;
        for i in 0..49 {
            let dt = if i == 10 { 40 } else { 20 };
            report = report.or(stats.record(Duration::from_millis(dt)));
        }
        // 48 frames of 20 ms and one of 40 ms make exactly one second
        let report = report.unwrap();
        assert!((report.fps - 49.0).abs() < 1e-3);
        assert!((report.mean_frame_time_ms - 1000.0 / 49.0).abs() < 1e-3);
        assert!((report.max_frame_time_ms - 40.0).abs() < 1e-3);

        assert_eq!(stats.record(Duration::from_millis(20)), None);
    }
}
