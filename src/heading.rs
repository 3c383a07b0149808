use crate::types::HeadingSample;

/// Half-width of the window around each cardinal direction, degrees.
pub const CARDINAL_TOLERANCE_DEG: f64 = 10.0;

/// Live heading state. Raw heading samples pass straight through with no
/// smoothing; while a calibration session is buffering, the engine routes
/// samples into the session instead of here.
#[derive(Clone, Debug, Default)]
pub struct HeadingTracker {
    heading_deg: Option<f64>,
}

impl HeadingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed_heading(&mut self, sample: &HeadingSample) {
        self.heading_deg = Some(sample.heading);
    }

    /// Direct heading override, used when calibration finalizes with an
    /// averaged heading.
    pub fn set_heading(&mut self, heading_deg: f64) {
        self.heading_deg = Some(heading_deg);
    }

    pub fn heading(&self) -> Option<f64> {
        self.heading_deg
    }
}

/// True when the heading falls within ±10° of north, east, south or west.
/// Presentation colors its directional indicator off this.
pub fn is_aligned_with_cardinal(heading_deg: f64) -> bool {
    let h = heading_deg.rem_euclid(360.0);
    [0.0, 90.0, 180.0, 270.0, 360.0]
        .iter()
        .any(|cardinal| (h - cardinal).abs() <= CARDINAL_TOLERANCE_DEG)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_through_no_smoothing() {
        let mut tracker = HeadingTracker::new();
        assert!(tracker.heading().is_none());
        tracker.feed_heading(&HeadingSample {
            timestamp: 1.0,
            heading: 123.4,
        });
        assert_eq!(tracker.heading(), Some(123.4));
        tracker.feed_heading(&HeadingSample {
            timestamp: 2.0,
            heading: 10.0,
        });
        assert_eq!(tracker.heading(), Some(10.0));
    }

    #[test]
    fn test_aligned_near_north_from_both_sides() {
        assert!(is_aligned_with_cardinal(355.0));
        assert!(is_aligned_with_cardinal(5.0));
        assert!(is_aligned_with_cardinal(0.0));
    }

    #[test]
    fn test_not_aligned_between_cardinals() {
        assert!(!is_aligned_with_cardinal(15.0));
        assert!(!is_aligned_with_cardinal(45.0));
        assert!(!is_aligned_with_cardinal(135.0));
    }

    #[test]
    fn test_aligned_at_each_cardinal() {
        for cardinal in [90.0, 180.0, 270.0] {
            assert!(is_aligned_with_cardinal(cardinal - 9.9));
            assert!(is_aligned_with_cardinal(cardinal + 9.9));
            assert!(!is_aligned_with_cardinal(cardinal + 10.1));
        }
    }
}
