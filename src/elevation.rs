use crate::types::ElevationReading;

/// Minimum change from the previous logged reading before a new entry is
/// appended. Keeps the log bounded by terrain, not by sample rate.
pub const ELEVATION_CHANGE_THRESHOLD_M: f64 = 1.0;

/// Append-only, change-thresholded elevation history for one session.
///
/// The first available elevation after a session starts is always logged;
/// after that a reading is appended only when it moves more than
/// [`ELEVATION_CHANGE_THRESHOLD_M`] from the last entry.
#[derive(Clone, Debug, Default)]
pub struct ElevationLog {
    readings: Vec<ElevationReading>,
}

impl ElevationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the reading was appended.
    pub fn record(&mut self, timestamp: f64, elevation_m: f64) -> bool {
        let should_append = match self.readings.last() {
            None => true,
            Some(last) => (elevation_m - last.elevation_m).abs() > ELEVATION_CHANGE_THRESHOLD_M,
        };
        if should_append {
            self.readings.push(ElevationReading {
                timestamp,
                elevation_m,
            });
        }
        should_append
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }

    pub fn readings(&self) -> &[ElevationReading] {
        &self.readings
    }

    pub fn last(&self) -> Option<&ElevationReading> {
        self.readings.last()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}
