use geo::{point, HaversineBearing, HaversineDistance};

use crate::types::{PositionSample, WaypointLocation};

/// Number of consecutive fixes averaged into one waypoint.
pub const CAPTURE_SAMPLE_COUNT: usize = 3;

/// Averages a short burst of position fixes into a single waypoint to
/// knock down single-fix GPS noise.
///
/// The averager has no timeout of its own: if the location source stalls,
/// the capture stays open until the caller cancels it.
#[derive(Clone, Debug, Default)]
pub struct WaypointAverager {
    capturing: bool,
    buffer: Vec<(f64, f64)>,
}

impl WaypointAverager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards any in-flight capture and starts a fresh one.
    pub fn begin_capture(&mut self) {
        self.buffer.clear();
        self.capturing = true;
    }

    /// Idempotent; a capture that never completed emits nothing.
    pub fn cancel(&mut self) {
        self.buffer.clear();
        self.capturing = false;
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Consumes one fix while capturing. Returns the averaged waypoint on
    /// exactly the [`CAPTURE_SAMPLE_COUNT`]th sample, then exits capture
    /// mode; later samples are ignored until the next `begin_capture`.
    pub fn feed_position(&mut self, sample: &PositionSample) -> Option<WaypointLocation> {
        if !self.capturing {
            return None;
        }
        self.buffer.push((sample.latitude, sample.longitude));
        if self.buffer.len() < CAPTURE_SAMPLE_COUNT {
            return None;
        }
        let n = self.buffer.len() as f64;
        let (lat_sum, lon_sum) = self
            .buffer
            .iter()
            .fold((0.0, 0.0), |acc, &(lat, lon)| (acc.0 + lat, acc.1 + lon));
        self.buffer.clear();
        self.capturing = false;
        Some(WaypointLocation {
            latitude: lat_sum / n,
            longitude: lon_sum / n,
        })
    }
}

/// Haversine point-to-point distance in meters.
pub fn distance_between_m(from: (f64, f64), to: (f64, f64)) -> f64 {
    let a = point!(x: from.1, y: from.0);
    let b = point!(x: to.1, y: to.0);
    a.haversine_distance(&b)
}

/// Initial great-circle bearing from `from` to `to`, degrees [0, 360).
pub fn initial_bearing_deg(from: (f64, f64), to: (f64, f64)) -> f64 {
    let a = point!(x: from.1, y: from.0);
    let b = point!(x: to.1, y: to.0);
    a.haversine_bearing(b).rem_euclid(360.0)
}

/// Distance (meters) and initial bearing (degrees) from a current position
/// to a stored waypoint.
pub fn distance_and_bearing(from: (f64, f64), to: &WaypointLocation) -> (f64, f64) {
    let target = (to.latitude, to.longitude);
    (
        distance_between_m(from, target),
        initial_bearing_deg(from, target),
    )
}

/// Bearing to a target relative to the user's current heading, degrees
/// [0, 360). Pure function of both inputs; recompute on every change of
/// either, never cache independently.
pub fn relative_bearing(bearing_deg: f64, heading_deg: f64) -> f64 {
    let mut rel = bearing_deg - heading_deg;
    if rel < 0.0 {
        rel += 360.0;
    }
    rel
}
