use serde::{Deserialize, Serialize};

/// ~8,000 ft: altitude sickness becomes possible.
pub const MODERATE_ALTITUDE_M: f64 = 2438.0;
/// ~12,000 ft: acclimatization strongly recommended.
pub const HIGH_ALTITUDE_M: f64 = 3657.0;
/// Above this speed the user is presumed to be in a vehicle or aircraft
/// and altitude alerts are suppressed.
pub const ALERT_MAX_SPEED_MPH: f64 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertLevel {
    Moderate,
    High,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AltitudeAlert {
    pub timestamp: f64,
    pub level: AlertLevel,
    pub elevation_m: f64,
}

/// Delivery is delegated to the host platform; repeated-alert
/// de-duplication is the sink's responsibility, not the detector's.
pub trait NotificationSink: Send {
    fn deliver(&mut self, alert: &AltitudeAlert);
}

/// Sink that just logs, for headless runs and tests.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn deliver(&mut self, alert: &AltitudeAlert) {
        log::warn!(
            "altitude alert: {:?} at {:.0} m",
            alert.level,
            alert.elevation_m
        );
    }
}

/// Detects upward crossings of the altitude safety thresholds.
#[derive(Clone, Debug, Default)]
pub struct AltitudeMonitor {
    last_elevation: Option<f64>,
}

impl AltitudeMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one elevation reading. Fires on the sample that crosses a
    /// threshold from below, highest severity first, and only below the
    /// speed cutoff.
    pub fn check(
        &mut self,
        timestamp: f64,
        elevation_m: f64,
        speed_mph: f64,
    ) -> Option<AltitudeAlert> {
        let prev = self.last_elevation.replace(elevation_m);
        let prev = prev?;
        if speed_mph >= ALERT_MAX_SPEED_MPH {
            return None;
        }
        let level = if prev < HIGH_ALTITUDE_M && elevation_m >= HIGH_ALTITUDE_M {
            AlertLevel::High
        } else if prev < MODERATE_ALTITUDE_M && elevation_m >= MODERATE_ALTITUDE_M {
            AlertLevel::Moderate
        } else {
            return None;
        };
        Some(AltitudeAlert {
            timestamp,
            level,
            elevation_m,
        })
    }

    pub fn reset(&mut self) {
        self.last_elevation = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moderate_crossing_fires_once_per_crossing() {
        let mut monitor = AltitudeMonitor::new();
        assert!(monitor.check(0.0, 2400.0, 3.0).is_none());
        let alert = monitor.check(1.0, 2440.0, 3.0).unwrap();
        assert_eq!(alert.level, AlertLevel::Moderate);
        // Staying above the threshold is not a new crossing
        assert!(monitor.check(2.0, 2450.0, 3.0).is_none());
    }

    #[test]
    fn test_high_crossing_outranks_moderate() {
        let mut monitor = AltitudeMonitor::new();
        monitor.check(0.0, 2000.0, 3.0);
        // One sample jumps both thresholds; only the high alert fires
        let alert = monitor.check(1.0, 3700.0, 3.0).unwrap();
        assert_eq!(alert.level, AlertLevel::High);
    }

    #[test]
    fn test_fast_travel_suppresses_alert() {
        let mut monitor = AltitudeMonitor::new();
        monitor.check(0.0, 2400.0, 120.0);
        assert!(monitor.check(1.0, 2500.0, 120.0).is_none());
    }

    #[test]
    fn test_descending_never_fires() {
        let mut monitor = AltitudeMonitor::new();
        monitor.check(0.0, 3700.0, 3.0);
        assert!(monitor.check(1.0, 3600.0, 3.0).is_none());
        assert!(monitor.check(2.0, 2400.0, 3.0).is_none());
    }

    #[test]
    fn test_first_sample_cannot_cross() {
        let mut monitor = AltitudeMonitor::new();
        assert!(monitor.check(0.0, 3700.0, 3.0).is_none());
    }

    #[test]
    fn test_redescend_then_recross_fires_again() {
        let mut monitor = AltitudeMonitor::new();
        monitor.check(0.0, 2400.0, 3.0);
        assert!(monitor.check(1.0, 2440.0, 3.0).is_some());
        monitor.check(2.0, 2400.0, 3.0);
        assert!(monitor.check(3.0, 2440.0, 3.0).is_some());
    }
}
