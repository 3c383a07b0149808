use serde::{Deserialize, Serialize};
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::engine::EngineSnapshot;
use crate::units;

/// Flat status snapshot persisted as JSON for the presentation layer to
/// observe. The engine never reaches out to presentation; this file is
/// the one-way window into it.
#[derive(Serialize, Deserialize, Clone)]
pub struct LiveStatus {
    pub timestamp: f64,
    pub uptime_seconds: u64,
    // Sample counters
    pub position_samples: u64,
    pub heading_samples: u64,
    pub motion_samples: u64,
    // Session state
    pub recording: bool,
    pub paused: bool,
    pub connected: bool,
    // Travel metrics
    pub distance_mi: f64,
    pub speed_mph: f64,
    pub top_speed_mph: f64,
    pub avg_speed_mph: f64,
    pub elevation_m: f64,
    pub elapsed_secs: u64,
    pub elapsed_display: String,
    // Heading / calibration
    pub heading_deg: f64,
    pub heading_valid: bool,
    pub heading_aligned: bool,
    pub calibration_state: String,
    pub gesture_recognized: bool,
    // Waypoint navigation
    pub waypoint_set: bool,
    pub waypoint_lat: f64,
    pub waypoint_lon: f64,
    pub waypoint_distance_m: f64,
    pub waypoint_bearing_deg: f64,
    pub waypoint_relative_bearing_deg: f64,
    // Place + alerts
    pub place: String,
    pub alerts_delivered: u64,
}

impl LiveStatus {
    pub fn new() -> Self {
        Self {
            timestamp: current_timestamp(),
            uptime_seconds: 0,
            position_samples: 0,
            heading_samples: 0,
            motion_samples: 0,
            recording: false,
            paused: false,
            connected: true,
            distance_mi: 0.0,
            speed_mph: 0.0,
            top_speed_mph: 0.0,
            avg_speed_mph: 0.0,
            elevation_m: 0.0,
            elapsed_secs: 0,
            elapsed_display: units::format_duration(0),
            heading_deg: 0.0,
            heading_valid: false,
            heading_aligned: false,
            calibration_state: "Idle".to_string(),
            gesture_recognized: false,
            waypoint_set: false,
            waypoint_lat: 0.0,
            waypoint_lon: 0.0,
            waypoint_distance_m: 0.0,
            waypoint_bearing_deg: 0.0,
            waypoint_relative_bearing_deg: 0.0,
            place: String::new(),
            alerts_delivered: 0,
        }
    }

    /// Copies the engine-owned state in; the counters stay the runner's.
    pub fn apply_snapshot(&mut self, snap: &EngineSnapshot) {
        self.recording = snap.recording;
        self.paused = snap.paused;
        self.connected = snap.connected;
        self.distance_mi = snap.metrics.distance_mi;
        self.speed_mph = snap.metrics.speed_mph;
        self.top_speed_mph = snap.metrics.top_speed_mph;
        self.avg_speed_mph = snap.metrics.avg_speed_mph;
        self.elevation_m = snap.metrics.elevation_m;
        self.elapsed_secs = snap.metrics.elapsed_secs;
        self.elapsed_display = units::format_duration(snap.metrics.elapsed_secs);
        self.heading_valid = snap.heading_deg.is_some();
        self.heading_deg = snap.heading_deg.unwrap_or(0.0);
        self.heading_aligned = snap.heading_aligned;
        self.calibration_state = format!("{:?}", snap.calibration_state);
        self.gesture_recognized = snap.gesture_recognized;
        match &snap.waypoint {
            Some(fix) => {
                self.waypoint_set = true;
                self.waypoint_lat = fix.waypoint.latitude;
                self.waypoint_lon = fix.waypoint.longitude;
                self.waypoint_distance_m = fix.distance_m;
                self.waypoint_bearing_deg = fix.bearing_deg;
                self.waypoint_relative_bearing_deg = fix.relative_bearing_deg.unwrap_or(0.0);
            }
            None => {
                self.waypoint_set = false;
                self.waypoint_lat = 0.0;
                self.waypoint_lon = 0.0;
                self.waypoint_distance_m = 0.0;
                self.waypoint_bearing_deg = 0.0;
                self.waypoint_relative_bearing_deg = 0.0;
            }
        }
        self.place = snap.place.clone();
    }

    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Default for LiveStatus {
    fn default() -> Self {
        Self::new()
    }
}

pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineConfig, TrackerEngine};

    #[test]
    fn test_apply_snapshot_copies_metrics() {
        let mut engine = TrackerEngine::new(EngineConfig::default());
        engine.start_session(0.0);
        engine.tick(1.0);

        let mut status = LiveStatus::new();
        status.apply_snapshot(&engine.snapshot());
        assert!(status.recording);
        assert_eq!(status.elapsed_secs, 1);
        assert_eq!(status.elapsed_display, "0:01");
        assert!(!status.heading_valid);
        assert!(!status.waypoint_set);
    }
}
