use crate::elevation::ElevationLog;
use crate::types::{PositionSample, TravelMetrics, TravelSummary};
use crate::units::{METERS_TO_MILES, MPS_TO_MPH};
use crate::waypoint;

/// Below this speed a fix contributes no distance. Filters out the GPS
/// wander that accumulates while standing still.
pub const DISTANCE_SPEED_GATE_MPH: f64 = 0.5;

/// Consumes position fixes and a 1 Hz tick; maintains distance, speed,
/// top/average speed, the elevation log and pause/resume bookkeeping for
/// one recording session.
///
/// All mutation flows through `feed_position`, `tick` and the session
/// controls. While paused or disconnected every entry point is a no-op, so
/// resuming continues from exactly the pre-pause state.
#[derive(Clone, Debug, Default)]
pub struct MetricsAggregator {
    recording: bool,
    paused: bool,
    connected: bool,
    started_at: f64,
    distance_mi: f64,
    speed_mph: f64,
    top_speed_mph: f64,
    speed_sum_mph: f64,
    speed_samples: u64,
    elapsed_secs: u64,
    elevation_log: ElevationLog,
    last_sample: Option<PositionSample>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    /// Zeroes every aggregate and stamps the session start.
    pub fn start_session(&mut self, now: f64) {
        self.recording = true;
        self.paused = false;
        self.started_at = now;
        self.distance_mi = 0.0;
        self.speed_mph = 0.0;
        self.top_speed_mph = 0.0;
        self.speed_sum_mph = 0.0;
        self.speed_samples = 0;
        self.elapsed_secs = 0;
        self.elevation_log.clear();
        self.last_sample = None;
    }

    pub fn pause(&mut self) {
        if self.recording {
            self.paused = true;
        }
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Snapshots the headline metrics. Does not clear accumulated state;
    /// the caller decides when to discard it.
    pub fn end_session(&mut self) -> TravelSummary {
        self.recording = false;
        self.paused = false;
        TravelSummary {
            started_at: self.started_at,
            distance_mi: self.distance_mi,
            speed_mph: self.speed_mph,
            top_speed_mph: self.top_speed_mph,
            avg_speed_mph: self.avg_speed_mph(),
            elapsed_secs: self.elapsed_secs,
        }
    }

    /// Source-failure gate: while disconnected, fixes are ignored and the
    /// accumulated metrics are preserved untouched.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn feed_position(&mut self, sample: &PositionSample) {
        if !self.recording || self.paused || !self.connected {
            return;
        }

        // Clamp before use: a fix without speed reports a negative value.
        let speed_mph = sample.speed.max(0.0) * MPS_TO_MPH;

        if let Some(prev) = &self.last_sample {
            if speed_mph > DISTANCE_SPEED_GATE_MPH {
                let meters = waypoint::distance_between_m(
                    (prev.latitude, prev.longitude),
                    (sample.latitude, sample.longitude),
                );
                self.distance_mi += meters * METERS_TO_MILES;
            }
        }

        self.speed_mph = speed_mph;
        self.top_speed_mph = self.top_speed_mph.max(speed_mph);
        self.speed_sum_mph += speed_mph;
        self.speed_samples += 1;

        self.elevation_log.record(sample.timestamp, sample.altitude);
        self.last_sample = Some(sample.clone());
    }

    /// 1 Hz elapsed-time tick. Suspended while paused, so paused wall time
    /// never enters the counter.
    pub fn tick(&mut self) {
        if self.recording && !self.paused {
            self.elapsed_secs += 1;
        }
    }

    pub fn metrics(&self) -> TravelMetrics {
        TravelMetrics {
            distance_mi: self.distance_mi,
            speed_mph: self.speed_mph,
            top_speed_mph: self.top_speed_mph,
            avg_speed_mph: self.avg_speed_mph(),
            elevation_m: self
                .elevation_log
                .last()
                .map(|r| r.elevation_m)
                .unwrap_or(0.0),
            elapsed_secs: self.elapsed_secs,
        }
    }

    fn avg_speed_mph(&self) -> f64 {
        if self.speed_samples == 0 {
            0.0
        } else {
            self.speed_sum_mph / self.speed_samples as f64
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn elevation_log(&self) -> &ElevationLog {
        &self.elevation_log
    }

    /// Latest fix seen while recording, used for waypoint bearing and the
    /// geocode refresh gate.
    pub fn last_position(&self) -> Option<&PositionSample> {
        self.last_sample.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample(ts: f64, lat: f64, lon: f64, speed_mps: f64) -> PositionSample {
        PositionSample {
            timestamp: ts,
            latitude: lat,
            longitude: lon,
            altitude: 1500.0,
            accuracy: 5.0,
            speed: speed_mps,
            course: None,
        }
    }

    fn recording() -> MetricsAggregator {
        let mut agg = MetricsAggregator::new();
        agg.start_session(0.0);
        agg
    }

    #[test]
    fn test_distance_is_sum_of_pairwise_legs() {
        let mut agg = recording();
        // Three fixes walking north along a meridian at 2 m/s
        agg.feed_position(&sample(0.0, 40.0000, -105.0, 2.0));
        agg.feed_position(&sample(1.0, 40.0001, -105.0, 2.0));
        agg.feed_position(&sample(2.0, 40.0002, -105.0, 2.0));

        let expected_m = waypoint::distance_between_m((40.0000, -105.0), (40.0001, -105.0))
            + waypoint::distance_between_m((40.0001, -105.0), (40.0002, -105.0));
        assert_relative_eq!(
            agg.metrics().distance_mi,
            expected_m * METERS_TO_MILES,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_slow_fixes_contribute_zero_distance() {
        let mut agg = recording();
        agg.feed_position(&sample(0.0, 40.0000, -105.0, 0.1));
        agg.feed_position(&sample(1.0, 40.0001, -105.0, 0.1)); // ~0.22 mph, under the gate
        assert_eq!(agg.metrics().distance_mi, 0.0);
    }

    #[test]
    fn test_negative_speed_clamped() {
        let mut agg = recording();
        agg.feed_position(&sample(0.0, 40.0, -105.0, -1.0));
        let m = agg.metrics();
        assert_eq!(m.speed_mph, 0.0);
        assert_eq!(m.top_speed_mph, 0.0);
    }

    #[test]
    fn test_average_is_per_sample_not_time_weighted() {
        let mut agg = recording();
        // Irregular gaps; every reading still counts equally
        agg.feed_position(&sample(0.0, 40.0, -105.0, 1.0));
        agg.feed_position(&sample(0.5, 40.0, -105.0, 2.0));
        agg.feed_position(&sample(10.0, 40.0, -105.0, 3.0));
        assert_relative_eq!(agg.metrics().avg_speed_mph, 2.0 * MPS_TO_MPH, epsilon = 1e-9);
    }

    #[test]
    fn test_top_speed_monotone_and_reset_on_start() {
        let mut agg = recording();
        agg.feed_position(&sample(0.0, 40.0, -105.0, 5.0));
        agg.feed_position(&sample(1.0, 40.0, -105.0, 2.0));
        assert_relative_eq!(agg.metrics().top_speed_mph, 5.0 * MPS_TO_MPH, epsilon = 1e-9);

        agg.start_session(10.0);
        assert_eq!(agg.metrics().top_speed_mph, 0.0);
    }

    #[test]
    fn test_pause_freezes_everything() {
        let mut agg = recording();
        agg.feed_position(&sample(0.0, 40.0000, -105.0, 2.0));
        agg.tick();
        let before = agg.metrics();

        agg.pause();
        agg.feed_position(&sample(1.0, 40.0100, -105.0, 8.0));
        agg.tick();
        agg.tick();
        agg.resume();

        let after = agg.metrics();
        assert_eq!(before.distance_mi, after.distance_mi);
        assert_eq!(before.top_speed_mph, after.top_speed_mph);
        assert_eq!(before.avg_speed_mph, after.avg_speed_mph);
        assert_eq!(before.elapsed_secs, after.elapsed_secs);
    }

    #[test]
    fn test_tick_counts_only_while_recording() {
        let mut agg = MetricsAggregator::new();
        agg.tick();
        assert_eq!(agg.metrics().elapsed_secs, 0);
        agg.start_session(0.0);
        agg.tick();
        agg.tick();
        assert_eq!(agg.metrics().elapsed_secs, 2);
    }

    #[test]
    fn test_disconnect_preserves_accumulated_state() {
        let mut agg = recording();
        agg.feed_position(&sample(0.0, 40.0000, -105.0, 2.0));
        agg.feed_position(&sample(1.0, 40.0001, -105.0, 2.0));
        let before = agg.metrics();

        agg.set_connected(false);
        agg.feed_position(&sample(2.0, 40.0100, -105.0, 9.0));
        assert_eq!(agg.metrics().distance_mi, before.distance_mi);
        assert_eq!(agg.metrics().top_speed_mph, before.top_speed_mph);

        agg.set_connected(true);
        agg.feed_position(&sample(3.0, 40.0001, -105.0, 2.0));
        assert!(agg.metrics().distance_mi > before.distance_mi);
    }

    #[test]
    fn test_end_session_snapshots_without_clearing() {
        let mut agg = recording();
        agg.feed_position(&sample(0.0, 40.0000, -105.0, 2.0));
        agg.feed_position(&sample(1.0, 40.0001, -105.0, 2.0));
        agg.tick();

        let summary = agg.end_session();
        assert!(summary.distance_mi > 0.0);
        assert_eq!(summary.elapsed_secs, 1);
        // State survives until the caller starts a new session
        assert_relative_eq!(agg.metrics().distance_mi, summary.distance_mi);
        assert!(!agg.is_recording());
    }

    #[test]
    fn test_elevation_log_thresholding() {
        let mut agg = recording();
        let mut s = sample(0.0, 40.0, -105.0, 2.0);
        s.altitude = 1500.0;
        agg.feed_position(&s);
        s.timestamp = 1.0;
        s.altitude = 1500.5; // under threshold
        agg.feed_position(&s);
        s.timestamp = 2.0;
        s.altitude = 1502.0; // over threshold
        agg.feed_position(&s);
        assert_eq!(agg.elevation_log().len(), 2);
    }
}
