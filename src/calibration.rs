use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::types::MotionSample;

/// A rotation axis must spin faster than this to count toward the gesture.
pub const ROTATION_RATE_GATE_RAD_S: f64 = 1.0;
/// At least one acceleration axis must exceed this alongside the rotation.
pub const ACCELERATION_GATE_G: f64 = 0.2;
/// Direction reversals needed before the figure-8 is recognized.
pub const GESTURE_DIRECTION_CHANGES: u32 = 3;
/// Idle window after the last significant motion before gesture progress
/// resets and the user must start over.
pub const MOTION_GRACE_SECS: f64 = 3.5;
/// Hard calibration length; finalize fires at this deadline regardless of
/// gesture completion.
pub const CALIBRATION_DURATION_SECS: f64 = 20.0;
/// Motion source cadence requested while calibration runs.
pub const MOTION_SAMPLE_INTERVAL_MS: u64 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationState {
    Idle,
    Buffering,
    Finalizing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationDirection {
    Clockwise,
    CounterClockwise,
}

/// Gesture-recognizer feedback surfaced to the engine.
#[derive(Clone, Debug)]
pub enum GestureEvent {
    Recognized { direction_changes: u32 },
    Reset { idle_secs: f64 },
}

/// Compass-calibration session: buffers heading samples while the user
/// traces a figure-8, recognizes the gesture from rotation-direction
/// reversals, and finalizes into a single averaged heading.
///
/// A figure-8 is well approximated by three or more alternating rotation
/// segments about the dominant axis, which is cheap to detect per sample
/// and noise-tolerant behind the dual rotation+acceleration gate.
#[derive(Clone, Debug)]
pub struct CalibrationSession {
    state: CalibrationState,
    heading_buffer: Vec<f64>,
    last_direction: Option<RotationDirection>,
    direction_changes: u32,
    last_motion_ts: Option<f64>,
    gesture_recognized: bool,
    deadline: f64,
    duration_secs: f64,
    grace_secs: f64,
}

impl CalibrationSession {
    pub fn new() -> Self {
        Self::with_timing(CALIBRATION_DURATION_SECS, MOTION_GRACE_SECS)
    }

    pub fn with_timing(duration_secs: f64, grace_secs: f64) -> Self {
        Self {
            state: CalibrationState::Idle,
            heading_buffer: Vec::new(),
            last_direction: None,
            direction_changes: 0,
            last_motion_ts: None,
            gesture_recognized: false,
            deadline: 0.0,
            duration_secs,
            grace_secs,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn is_buffering(&self) -> bool {
        self.state == CalibrationState::Buffering
    }

    pub fn gesture_recognized(&self) -> bool {
        self.gesture_recognized
    }

    pub fn direction_changes(&self) -> u32 {
        self.direction_changes
    }

    pub fn buffered(&self) -> usize {
        self.heading_buffer.len()
    }

    /// Idle → Buffering. Clears the heading buffer and gesture substate
    /// and stamps the hard-finalize deadline.
    pub fn start(&mut self, now: f64) {
        self.heading_buffer.clear();
        self.reset_gesture();
        self.deadline = now + self.duration_secs;
        self.state = CalibrationState::Buffering;
    }

    /// Heading samples accumulate only while buffering.
    pub fn push_heading(&mut self, heading_deg: f64) {
        if self.state == CalibrationState::Buffering {
            self.heading_buffer.push(heading_deg);
        }
    }

    pub fn feed_motion(&mut self, sample: &MotionSample) -> Option<GestureEvent> {
        if self.state != CalibrationState::Buffering {
            return None;
        }

        let rotation = Vector3::new(sample.rotation_x, sample.rotation_y, sample.rotation_z);
        let accel = Vector3::new(sample.accel_x, sample.accel_y, sample.accel_z);

        if rotation.amax() > ROTATION_RATE_GATE_RAD_S && accel.amax() > ACCELERATION_GATE_G {
            self.last_motion_ts = Some(sample.timestamp);
            let direction = dominant_direction(&rotation);
            let reversed = self
                .last_direction
                .map_or(false, |prev| prev != direction);
            self.last_direction = Some(direction);
            if reversed {
                self.direction_changes += 1;
                if self.direction_changes >= GESTURE_DIRECTION_CHANGES && !self.gesture_recognized {
                    self.gesture_recognized = true;
                    return Some(GestureEvent::Recognized {
                        direction_changes: self.direction_changes,
                    });
                }
            }
        } else if let Some(last) = self.last_motion_ts {
            let idle_secs = sample.timestamp - last;
            if idle_secs > self.grace_secs {
                self.reset_gesture();
                return Some(GestureEvent::Reset { idle_secs });
            }
        }

        None
    }

    /// True once the fixed calibration duration has elapsed.
    pub fn is_due(&self, now: f64) -> bool {
        self.state == CalibrationState::Buffering && now >= self.deadline
    }

    /// Drains the heading buffer into its arithmetic mean and returns to
    /// idle. An empty buffer yields `None`: the live heading stays as-is.
    pub fn finalize(&mut self) -> Option<f64> {
        if self.state != CalibrationState::Buffering {
            return None;
        }
        self.state = CalibrationState::Finalizing;
        let mean = if self.heading_buffer.is_empty() {
            None
        } else {
            Some(self.heading_buffer.iter().sum::<f64>() / self.heading_buffer.len() as f64)
        };
        self.heading_buffer.clear();
        self.reset_gesture();
        self.state = CalibrationState::Idle;
        mean
    }

    /// Abandons calibration without touching the live heading. Idempotent.
    pub fn cancel(&mut self) {
        self.heading_buffer.clear();
        self.reset_gesture();
        self.state = CalibrationState::Idle;
    }

    fn reset_gesture(&mut self) {
        self.last_direction = None;
        self.direction_changes = 0;
        self.last_motion_ts = None;
        self.gesture_recognized = false;
    }
}

impl Default for CalibrationSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Direction about the dominant rotation axis, classified by the sign of
/// the axis with the greatest absolute rate.
fn dominant_direction(rotation: &Vector3<f64>) -> RotationDirection {
    let rate = [rotation.x, rotation.y, rotation.z]
        .into_iter()
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        .unwrap_or(0.0);
    if rate >= 0.0 {
        RotationDirection::CounterClockwise
    } else {
        RotationDirection::Clockwise
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn spin(ts: f64, rate_z: f64) -> MotionSample {
        MotionSample {
            timestamp: ts,
            rotation_x: 0.1,
            rotation_y: 0.0,
            rotation_z: rate_z,
            accel_x: 0.3,
            accel_y: 0.0,
            accel_z: 0.05,
        }
    }

    fn still(ts: f64) -> MotionSample {
        MotionSample {
            timestamp: ts,
            rotation_x: 0.01,
            rotation_y: 0.02,
            rotation_z: 0.01,
            accel_x: 0.01,
            accel_y: 0.0,
            accel_z: 0.01,
        }
    }

    fn buffering(now: f64) -> CalibrationSession {
        let mut session = CalibrationSession::new();
        session.start(now);
        session
    }

    #[test]
    fn test_three_reversals_recognize_gesture() {
        let mut session = buffering(0.0);
        assert!(session.feed_motion(&spin(0.1, 2.0)).is_none());
        assert!(session.feed_motion(&spin(0.5, -2.0)).is_none()); // change 1
        assert!(session.feed_motion(&spin(0.9, 2.0)).is_none()); // change 2
        let event = session.feed_motion(&spin(1.3, -2.0)); // change 3
        assert!(matches!(
            event,
            Some(GestureEvent::Recognized {
                direction_changes: 3
            })
        ));
        assert!(session.gesture_recognized());
    }

    #[test]
    fn test_same_direction_never_counts() {
        let mut session = buffering(0.0);
        for i in 0..10 {
            session.feed_motion(&spin(i as f64 * 0.1, 2.0));
        }
        assert_eq!(session.direction_changes(), 0);
        assert!(!session.gesture_recognized());
    }

    #[test]
    fn test_grace_period_resets_progress() {
        let mut session = buffering(0.0);
        session.feed_motion(&spin(0.1, 2.0));
        session.feed_motion(&spin(0.3, -2.0));
        assert_eq!(session.direction_changes(), 1);

        // 4 s of nothing significant blows the 3.5 s grace window
        let event = session.feed_motion(&still(4.3));
        assert!(matches!(event, Some(GestureEvent::Reset { .. })));
        assert_eq!(session.direction_changes(), 0);

        // Gesture has to start over from scratch
        session.feed_motion(&spin(4.5, 2.0));
        session.feed_motion(&spin(4.7, -2.0));
        assert_eq!(session.direction_changes(), 1);
    }

    #[test]
    fn test_insignificant_motion_within_grace_keeps_progress() {
        let mut session = buffering(0.0);
        session.feed_motion(&spin(0.1, 2.0));
        session.feed_motion(&spin(0.3, -2.0));
        session.feed_motion(&still(1.0));
        assert_eq!(session.direction_changes(), 1);
    }

    #[test]
    fn test_rotation_without_acceleration_is_not_significant() {
        let mut session = buffering(0.0);
        let mut sample = spin(0.1, 2.0);
        sample.accel_x = 0.05;
        sample.accel_y = 0.0;
        sample.accel_z = 0.0;
        session.feed_motion(&sample);
        assert_eq!(session.direction_changes(), 0);
        // No significant motion was ever seen, so nothing to reset either
        assert!(session.feed_motion(&still(10.0)).is_none());
    }

    #[test]
    fn test_dominant_axis_decides_direction() {
        // z spins hardest negative even though x is positive
        let sample = MotionSample {
            timestamp: 0.0,
            rotation_x: 1.2,
            rotation_y: 0.0,
            rotation_z: -3.0,
            accel_x: 0.3,
            accel_y: 0.0,
            accel_z: 0.0,
        };
        let mut session = buffering(0.0);
        session.feed_motion(&sample);
        // Follow with a positive-dominant sample: that is one reversal
        session.feed_motion(&spin(0.2, 3.0));
        assert_eq!(session.direction_changes(), 1);
    }

    #[test]
    fn test_finalize_averages_buffered_headings() {
        let mut session = buffering(0.0);
        session.push_heading(100.0);
        session.push_heading(110.0);
        session.push_heading(120.0);
        let mean = session.finalize().unwrap();
        assert_relative_eq!(mean, 110.0);
        assert_eq!(session.state(), CalibrationState::Idle);
        assert_eq!(session.buffered(), 0);
    }

    #[test]
    fn test_finalize_empty_buffer_is_silent_noop() {
        let mut session = buffering(0.0);
        assert!(session.finalize().is_none());
        assert_eq!(session.state(), CalibrationState::Idle);
    }

    #[test]
    fn test_headings_ignored_while_idle() {
        let mut session = CalibrationSession::new();
        session.push_heading(90.0);
        assert_eq!(session.buffered(), 0);
    }

    #[test]
    fn test_deadline() {
        let mut session = buffering(100.0);
        assert!(!session.is_due(119.9));
        assert!(session.is_due(120.0));
    }

    #[test]
    fn test_cancel_discards_everything() {
        let mut session = buffering(0.0);
        session.push_heading(90.0);
        session.feed_motion(&spin(0.1, 2.0));
        session.cancel();
        assert_eq!(session.state(), CalibrationState::Idle);
        assert_eq!(session.buffered(), 0);
        assert_eq!(session.direction_changes(), 0);
        // Second cancel is a no-op
        session.cancel();
        assert_eq!(session.state(), CalibrationState::Idle);
    }

    #[test]
    fn test_gesture_does_not_end_calibration() {
        let mut session = buffering(0.0);
        session.feed_motion(&spin(0.1, 2.0));
        session.feed_motion(&spin(0.3, -2.0));
        session.feed_motion(&spin(0.5, 2.0));
        session.feed_motion(&spin(0.7, -2.0));
        assert!(session.gesture_recognized());
        // Still buffering until the deadline or an explicit finalize
        assert!(session.is_buffering());
        assert!(!session.is_due(1.0));
    }
}
