use serde::{Deserialize, Serialize};

/// One fix from the location source. Arrival rate is not uniform.
///
/// `speed` is the source's instantaneous estimate in m/s and is negative
/// when the fix carries no speed; consumers must clamp before use.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PositionSample {
    pub timestamp: f64,
    pub latitude: f64,
    pub longitude: f64,
    /// Altitude above sea level, meters.
    pub altitude: f64,
    /// Horizontal accuracy radius, meters.
    pub accuracy: f64,
    /// Instantaneous speed, m/s. Negative when undefined.
    pub speed: f64,
    /// Course over ground, degrees. Absent when stationary.
    pub course: Option<f64>,
}

/// True heading from the heading source, degrees [0, 360).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeadingSample {
    pub timestamp: f64,
    pub heading: f64,
}

/// Device motion sample: 3-axis rotation rate plus user acceleration.
/// Delivered at a fixed ~100 ms cadence, only while calibration runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MotionSample {
    pub timestamp: f64,
    /// Rotation rate, rad/s.
    pub rotation_x: f64,
    pub rotation_y: f64,
    pub rotation_z: f64,
    /// User acceleration (gravity removed), g.
    pub accel_x: f64,
    pub accel_y: f64,
    pub accel_z: f64,
}

/// A single entry in the elevation log.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ElevationReading {
    pub timestamp: f64,
    pub elevation_m: f64,
}

/// Running travel metrics for the active session.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TravelMetrics {
    pub distance_mi: f64,
    pub speed_mph: f64,
    pub top_speed_mph: f64,
    pub avg_speed_mph: f64,
    pub elevation_m: f64,
    /// Recording time, seconds. Paused intervals are excluded.
    pub elapsed_secs: u64,
}

/// Frozen copy of the headline metrics taken when a session ends.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TravelSummary {
    pub started_at: f64,
    pub distance_mi: f64,
    pub speed_mph: f64,
    pub top_speed_mph: f64,
    pub avg_speed_mph: f64,
    pub elapsed_secs: u64,
}

/// A saved geographic point, derived by averaging a short burst of fixes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaypointLocation {
    pub latitude: f64,
    pub longitude: f64,
}
