use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::waypoint;

/// Movement from the last successfully geocoded position before the place
/// name goes stale and a fresh lookup is requested.
pub const REFRESH_DISTANCE_M: f64 = 1000.0;

/// Sentinel returned before any lookup has ever succeeded.
pub const UNAVAILABLE: &str = "Location unavailable";

/// Resolved place strings: a locality+region label plus a sub-region.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceName {
    pub locality: String,
    pub sub_region: String,
}

#[derive(Clone, Debug)]
pub struct GeocodeError(pub String);

impl fmt::Display for GeocodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "geocode lookup failed: {}", self.0)
    }
}

impl std::error::Error for GeocodeError {}

pub type GeocodeFuture = Pin<Box<dyn Future<Output = Result<PlaceName, GeocodeError>> + Send>>;

/// Opaque reverse-geocoding service. The engine never retries a failed
/// lookup itself; retry and backoff policy belong to the caller.
pub trait GeocodingService: Send {
    fn resolve(&mut self, latitude: f64, longitude: f64) -> GeocodeFuture;
}

/// Tracks the last successfully geocoded position and decides when the
/// current position has moved far enough to warrant a fresh lookup.
/// Failures are non-fatal: the last-known-good name keeps being served.
#[derive(Clone, Debug)]
pub struct PlaceTracker {
    resolved: Option<(PlaceName, f64, f64)>,
    pending: bool,
    refresh_distance_m: f64,
}

impl PlaceTracker {
    pub fn new() -> Self {
        Self::with_refresh_distance(REFRESH_DISTANCE_M)
    }

    pub fn with_refresh_distance(refresh_distance_m: f64) -> Self {
        Self {
            resolved: None,
            pending: false,
            refresh_distance_m,
        }
    }

    /// True when no lookup has succeeded yet, or the position has moved
    /// more than [`REFRESH_DISTANCE_M`] from the last success. Never true
    /// while a lookup is already in flight.
    pub fn needs_refresh(&self, latitude: f64, longitude: f64) -> bool {
        if self.pending {
            return false;
        }
        match &self.resolved {
            None => true,
            Some((_, lat, lon)) => {
                waypoint::distance_between_m((*lat, *lon), (latitude, longitude))
                    > self.refresh_distance_m
            }
        }
    }

    pub fn mark_pending(&mut self) {
        self.pending = true;
    }

    pub fn record_success(&mut self, name: PlaceName, latitude: f64, longitude: f64) {
        self.resolved = Some((name, latitude, longitude));
        self.pending = false;
    }

    /// Keeps the last-known-good name; only clears the in-flight flag so
    /// a later movement can trigger another attempt.
    pub fn record_failure(&mut self) {
        self.pending = false;
    }

    pub fn current(&self) -> Option<&PlaceName> {
        self.resolved.as_ref().map(|(name, _, _)| name)
    }

    pub fn display_name(&self) -> String {
        self.current()
            .map(|name| name.locality.clone())
            .unwrap_or_else(|| UNAVAILABLE.to_string())
    }
}

impl Default for PlaceTracker {
    fn default() -> Self {
        Self::new()
    }
}
