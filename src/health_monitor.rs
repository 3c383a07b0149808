use std::sync::{Arc, Mutex};
use tokio::time::{Duration, Instant};

/// Tracks freshness for one sensor source. Updated from the source loop's
/// task, read from the drain loop, hence the shared interior.
#[derive(Clone, Debug)]
pub struct SourceHealth {
    pub name: String,
    last_update: Arc<Mutex<Instant>>,
    silence_threshold: Duration,
}

impl SourceHealth {
    pub fn new(name: &str, silence_threshold_secs: u64) -> Self {
        SourceHealth {
            name: name.to_string(),
            last_update: Arc::new(Mutex::new(Instant::now())),
            silence_threshold: Duration::from_secs(silence_threshold_secs),
        }
    }

    pub fn update(&self) {
        if let Ok(mut time) = self.last_update.lock() {
            *time = Instant::now();
        }
    }

    pub fn time_since_last_update(&self) -> Option<Duration> {
        self.last_update.lock().ok().map(|t| t.elapsed())
    }

    pub fn is_silent(&self) -> bool {
        self.time_since_last_update()
            .map(|d| d > self.silence_threshold)
            .unwrap_or(false)
    }
}

/// Silence detection for the three sensor sources. A silent position
/// source flips the engine into its not-connected state, which freezes
/// metric mutation without resetting anything; heading/motion silence is
/// only reported.
pub struct HealthMonitor {
    pub position: SourceHealth,
    pub heading: SourceHealth,
    pub motion: SourceHealth,
}

impl HealthMonitor {
    /// Position fixes land at ~1 Hz and heading at a few Hz, so 10 s of
    /// nothing means the source is gone, not slow. Motion runs at 10 Hz
    /// but only during calibration, so it gets a 2 s window.
    pub fn new() -> Self {
        HealthMonitor {
            position: SourceHealth::new("Position", 10),
            heading: SourceHealth::new("Heading", 10),
            motion: SourceHealth::new("Motion", 2),
        }
    }

    /// `calibrating` scopes the motion check: outside calibration the
    /// motion source is stopped on purpose and silence means nothing.
    pub fn check_health(&self, calibrating: bool) -> HealthReport {
        HealthReport {
            position_healthy: !self.position.is_silent(),
            position_silence: self.position.time_since_last_update(),
            heading_healthy: !self.heading.is_silent(),
            heading_silence: self.heading.time_since_last_update(),
            motion_healthy: !calibrating || !self.motion.is_silent(),
            motion_silence: self.motion.time_since_last_update(),
        }
    }

    pub fn format_status(&self, calibrating: bool) -> String {
        let report = self.check_health(calibrating);
        let tag = |healthy: bool, silence: Option<Duration>| {
            if healthy {
                "ok".to_string()
            } else {
                format!(
                    "silent {:.1}s",
                    silence.unwrap_or(Duration::from_secs(0)).as_secs_f64()
                )
            }
        };
        format!(
            "Health: Position {} | Heading {} | Motion {}",
            tag(report.position_healthy, report.position_silence),
            tag(report.heading_healthy, report.heading_silence),
            tag(report.motion_healthy, report.motion_silence),
        )
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

pub struct HealthReport {
    pub position_healthy: bool,
    pub position_silence: Option<Duration>,
    pub heading_healthy: bool,
    pub heading_silence: Option<Duration>,
    pub motion_healthy: bool,
    pub motion_silence: Option<Duration>,
}
