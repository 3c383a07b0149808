// engine.rs — Pure computation layer for the travel tracker.
//
// Everything in this module is independent of:
//   - the tokio runtime (except oneshot completion channels)
//   - platform sensor APIs
//   - file I/O and status persistence
//
// It takes sensor samples in, produces derived state and events out. The
// runner drains all sensor channels on a single task and is the only
// caller of the mutating methods, so position-, heading- and motion-driven
// updates can never race on shared fields.

use tokio::sync::oneshot;

use crate::alerts::{AltitudeAlert, AltitudeMonitor};
use crate::calibration::{CalibrationSession, CalibrationState, GestureEvent};
use crate::geocode::PlaceTracker;
use crate::heading::{is_aligned_with_cardinal, HeadingTracker};
use crate::metrics::MetricsAggregator;
use crate::types::{
    HeadingSample, MotionSample, PositionSample, TravelMetrics, TravelSummary, WaypointLocation,
};
use crate::units::MPS_TO_MPH;
use crate::waypoint::{self, WaypointAverager, CAPTURE_SAMPLE_COUNT};
use crate::{calibration, geocode};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Waypoint capture gives up after this long without 3 fixes.
    /// 0 preserves the open-ended wait.
    pub waypoint_capture_timeout_secs: f64,
    pub calibration_duration_secs: f64,
    pub motion_grace_secs: f64,
    pub geocode_refresh_m: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            waypoint_capture_timeout_secs: 30.0,
            calibration_duration_secs: calibration::CALIBRATION_DURATION_SECS,
            motion_grace_secs: calibration::MOTION_GRACE_SECS,
            geocode_refresh_m: geocode::REFRESH_DISTANCE_M,
        }
    }
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub enum TrackerEvent {
    AltitudeAlert(AltitudeAlert),
    WaypointCaptured {
        waypoint: WaypointLocation,
        samples: usize,
    },
    WaypointCaptureTimedOut {
        waited_secs: f64,
    },
    GestureRecognized {
        direction_changes: u32,
    },
    GestureReset {
        idle_secs: f64,
    },
    CalibrationFinished {
        heading_deg: f64,
        samples: usize,
    },
    CalibrationAborted,
    CalibrationCancelled,
    GeocodeRefreshNeeded {
        latitude: f64,
        longitude: f64,
    },
    ConnectionLost,
    ConnectionRestored,
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Live distance and bearing from the current position to the stored
/// waypoint. Recomputed on every snapshot from the latest position and
/// heading; never cached between samples.
#[derive(Clone, Debug)]
pub struct WaypointFix {
    pub waypoint: WaypointLocation,
    pub distance_m: f64,
    pub bearing_deg: f64,
    pub relative_bearing_deg: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct EngineSnapshot {
    pub metrics: TravelMetrics,
    pub heading_deg: Option<f64>,
    pub heading_aligned: bool,
    pub calibration_state: CalibrationState,
    pub gesture_recognized: bool,
    pub direction_changes: u32,
    pub capturing_waypoint: bool,
    pub waypoint: Option<WaypointFix>,
    pub place: String,
    pub connected: bool,
    pub recording: bool,
    pub paused: bool,
}

// ─── The engine ──────────────────────────────────────────────────────────────

/// Single logical owner of all tracker state. Sensor callbacks of each
/// kind arrive in order; callbacks of different kinds may interleave, and
/// every one funnels through here on one task.
pub struct TrackerEngine {
    config: EngineConfig,

    metrics: MetricsAggregator,
    heading: HeadingTracker,
    calibration: CalibrationSession,
    altitude_monitor: AltitudeMonitor,
    places: PlaceTracker,

    averager: WaypointAverager,
    waypoint: Option<WaypointLocation>,
    waypoint_tx: Option<oneshot::Sender<WaypointLocation>>,
    capture_started_at: Option<f64>,

    calibration_tx: Option<oneshot::Sender<Option<f64>>>,

    connected: bool,
    now: f64,
}

impl TrackerEngine {
    pub fn new(config: EngineConfig) -> Self {
        let calibration = CalibrationSession::with_timing(
            config.calibration_duration_secs,
            config.motion_grace_secs,
        );
        Self {
            metrics: MetricsAggregator::new(),
            heading: HeadingTracker::new(),
            calibration,
            altitude_monitor: AltitudeMonitor::new(),
            places: PlaceTracker::with_refresh_distance(config.geocode_refresh_m),
            averager: WaypointAverager::new(),
            waypoint: None,
            waypoint_tx: None,
            capture_started_at: None,
            calibration_tx: None,
            connected: true,
            now: 0.0,
            config,
        }
    }

    // ── Session controls ─────────────────────────────────────────────────

    pub fn start_session(&mut self, now: f64) {
        self.now = self.now.max(now);
        self.metrics.start_session(self.now);
        self.altitude_monitor.reset();
        log::info!("session started");
    }

    pub fn pause(&mut self) {
        self.metrics.pause();
    }

    pub fn resume(&mut self) {
        self.metrics.resume();
    }

    pub fn end_session(&mut self) -> TravelSummary {
        log::info!("session ended");
        self.metrics.end_session()
    }

    // ── Sensor feeds ─────────────────────────────────────────────────────

    pub fn feed_position(&mut self, sample: &PositionSample) -> Vec<TrackerEvent> {
        let mut events = Vec::new();
        self.now = self.now.max(sample.timestamp);

        // A fix arriving is proof the source is back
        if !self.connected {
            self.connected = true;
            self.metrics.set_connected(true);
            events.push(TrackerEvent::ConnectionRestored);
        }

        // Waypoint capture consumes the same stream, independent of the
        // recording/pause state of the metrics session
        if self.averager.is_capturing() {
            if let Some(wp) = self.averager.feed_position(sample) {
                self.waypoint = Some(wp);
                self.capture_started_at = None;
                if let Some(tx) = self.waypoint_tx.take() {
                    let _ = tx.send(wp);
                }
                events.push(TrackerEvent::WaypointCaptured {
                    waypoint: wp,
                    samples: CAPTURE_SAMPLE_COUNT,
                });
            }
        }

        self.metrics.feed_position(sample);

        let speed_mph = sample.speed.max(0.0) * MPS_TO_MPH;
        if let Some(alert) = self
            .altitude_monitor
            .check(sample.timestamp, sample.altitude, speed_mph)
        {
            events.push(TrackerEvent::AltitudeAlert(alert));
        }

        if self.places.needs_refresh(sample.latitude, sample.longitude) {
            self.places.mark_pending();
            events.push(TrackerEvent::GeocodeRefreshNeeded {
                latitude: sample.latitude,
                longitude: sample.longitude,
            });
        }

        events
    }

    pub fn feed_heading(&mut self, sample: &HeadingSample) -> Vec<TrackerEvent> {
        self.now = self.now.max(sample.timestamp);
        // During calibration the raw headings are evidence, not truth:
        // they buffer for averaging instead of driving the live heading
        if self.calibration.is_buffering() {
            self.calibration.push_heading(sample.heading);
        } else {
            self.heading.feed_heading(sample);
        }
        Vec::new()
    }

    pub fn feed_motion(&mut self, sample: &MotionSample) -> Vec<TrackerEvent> {
        let mut events = Vec::new();
        self.now = self.now.max(sample.timestamp);

        if let Some(gesture) = self.calibration.feed_motion(sample) {
            events.push(match gesture {
                GestureEvent::Recognized { direction_changes } => {
                    TrackerEvent::GestureRecognized { direction_changes }
                }
                GestureEvent::Reset { idle_secs } => TrackerEvent::GestureReset { idle_secs },
            });
        }

        if self.calibration.is_due(self.now) {
            events.extend(self.finalize_calibration());
        }

        events
    }

    /// 1 Hz housekeeping: elapsed time, the calibration deadline, and the
    /// waypoint-capture timeout. `now` is injected so tests can drive a
    /// virtual clock.
    pub fn tick(&mut self, now: f64) -> Vec<TrackerEvent> {
        let mut events = Vec::new();
        self.now = self.now.max(now);

        self.metrics.tick();

        if self.calibration.is_due(self.now) {
            events.extend(self.finalize_calibration());
        }

        if let Some(started) = self.capture_started_at {
            let timeout = self.config.waypoint_capture_timeout_secs;
            if timeout > 0.0 && self.now - started >= timeout {
                let waited_secs = self.now - started;
                self.averager.cancel();
                self.capture_started_at = None;
                // Dropping the sender resolves the receiver with an error
                // instead of leaving the completion hanging forever
                self.waypoint_tx = None;
                events.push(TrackerEvent::WaypointCaptureTimedOut { waited_secs });
                log::warn!("waypoint capture timed out after {:.0}s", waited_secs);
            }
        }

        events
    }

    /// Flagged by the runner when a source goes silent. Metric mutation
    /// freezes without resetting anything; the first fix to arrive
    /// afterwards restores the connection.
    pub fn set_connected(&mut self, connected: bool) -> Option<TrackerEvent> {
        if connected == self.connected {
            return None;
        }
        self.connected = connected;
        self.metrics.set_connected(connected);
        Some(if connected {
            TrackerEvent::ConnectionRestored
        } else {
            TrackerEvent::ConnectionLost
        })
    }

    // ── Waypoint capture ─────────────────────────────────────────────────

    /// Starts a 3-fix capture. The returned receiver fires exactly once
    /// with the averaged waypoint; it resolves with an error if the
    /// capture is cancelled, times out, or is superseded.
    pub fn begin_waypoint_capture(&mut self) -> oneshot::Receiver<WaypointLocation> {
        let (tx, rx) = oneshot::channel();
        self.averager.begin_capture();
        // Replacing a pending sender drops it: a superseded capture can
        // never fire a stale completion
        self.waypoint_tx = Some(tx);
        self.capture_started_at = Some(self.now);
        rx
    }

    pub fn cancel_waypoint_capture(&mut self) {
        self.averager.cancel();
        self.waypoint_tx = None;
        self.capture_started_at = None;
    }

    pub fn clear_waypoint(&mut self) {
        self.waypoint = None;
    }

    pub fn waypoint(&self) -> Option<WaypointLocation> {
        self.waypoint
    }

    // ── Calibration ──────────────────────────────────────────────────────

    /// Starts a calibration session. The receiver fires exactly once when
    /// calibration finalizes: `Some(mean)` when headings were collected,
    /// `None` when the buffer stayed empty. Cancelling drops the sender.
    pub fn start_calibration(&mut self, now: f64) -> oneshot::Receiver<Option<f64>> {
        let (tx, rx) = oneshot::channel();
        self.now = self.now.max(now);
        self.calibration.start(self.now);
        self.calibration_tx = Some(tx);
        log::info!("calibration started");
        rx
    }

    pub fn cancel_calibration(&mut self) -> Vec<TrackerEvent> {
        if !self.calibration.is_buffering() && self.calibration_tx.is_none() {
            return Vec::new();
        }
        self.calibration.cancel();
        self.calibration_tx = None;
        vec![TrackerEvent::CalibrationCancelled]
    }

    fn finalize_calibration(&mut self) -> Vec<TrackerEvent> {
        let samples = self.calibration.buffered();
        let result = self.calibration.finalize();
        let mut events = Vec::new();
        match result {
            Some(mean) => {
                self.heading.set_heading(mean);
                events.push(TrackerEvent::CalibrationFinished {
                    heading_deg: mean,
                    samples,
                });
                log::info!("calibration finished: {:.1}° from {} samples", mean, samples);
            }
            // Empty buffer: benign no-op, the live heading stays put
            None => events.push(TrackerEvent::CalibrationAborted),
        }
        if let Some(tx) = self.calibration_tx.take() {
            let _ = tx.send(result);
        }
        events
    }

    // ── Geocoding glue ───────────────────────────────────────────────────

    pub fn record_geocode_success(&mut self, name: geocode::PlaceName, lat: f64, lon: f64) {
        self.places.record_success(name, lat, lon);
    }

    pub fn record_geocode_failure(&mut self) {
        self.places.record_failure();
    }

    pub fn place_name(&self) -> String {
        self.places.display_name()
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> EngineSnapshot {
        let heading_deg = self.heading.heading();
        let waypoint = self.waypoint.as_ref().map(|wp| {
            let fix = self
                .metrics
                .last_position()
                .map(|p| (p.latitude, p.longitude));
            let (distance_m, bearing_deg) = match fix {
                Some(from) => waypoint::distance_and_bearing(from, wp),
                None => (0.0, 0.0),
            };
            WaypointFix {
                waypoint: *wp,
                distance_m,
                bearing_deg,
                relative_bearing_deg: heading_deg
                    .map(|h| waypoint::relative_bearing(bearing_deg, h)),
            }
        });
        EngineSnapshot {
            metrics: self.metrics.metrics(),
            heading_deg,
            heading_aligned: heading_deg.map(is_aligned_with_cardinal).unwrap_or(false),
            calibration_state: self.calibration.state(),
            gesture_recognized: self.calibration.gesture_recognized(),
            direction_changes: self.calibration.direction_changes(),
            capturing_waypoint: self.averager.is_capturing(),
            waypoint,
            place: self.places.display_name(),
            connected: self.connected,
            recording: self.metrics.is_recording(),
            paused: self.metrics.is_paused(),
        }
    }

    pub fn metrics(&self) -> &MetricsAggregator {
        &self.metrics
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
