//! Sensor source loops. Each loop owns one upstream source, pushes samples
//! into a bounded channel and drops samples when the drain loop falls
//! behind. On real hardware these loops wrap the platform location,
//! heading and motion services; here they run a simulated trail walk so
//! the engine can be exercised end to end. Test doubles bypass the loops
//! entirely and feed the engine directly.

use tokio::sync::mpsc::Sender;
use tokio::time::{interval, Duration};

use crate::calibration::MOTION_SAMPLE_INTERVAL_MS;
use crate::types::{HeadingSample, MotionSample, PositionSample};

/// Simulated hike: a slow walk up a switchbacked ridge, speed and
/// elevation varying smoothly so the metrics have something to chew on.
pub struct SimulatedTrail {
    step: u64,
    latitude: f64,
    longitude: f64,
    altitude: f64,
}

impl SimulatedTrail {
    pub fn new() -> Self {
        Self {
            step: 0,
            latitude: 40.0150,
            longitude: -105.2705,
            altitude: 1740.0,
        }
    }

    pub fn next_position(&mut self) -> PositionSample {
        let t = self.step as f64;
        self.step += 1;

        // ~1.4 m/s base pace with a slow swell, brief rest every ~2 min
        let speed = if (t as u64) % 120 > 110 {
            0.0
        } else {
            1.4 + (t * 0.05).sin() * 0.6
        };
        // One degree of latitude is ~111 km; nudge along a wandering track
        self.latitude += speed * (t * 0.01).cos().abs() / 111_000.0;
        self.longitude += speed * (t * 0.01).sin() / 111_000.0;
        self.altitude += (t * 0.02).sin() * 0.8 + 0.15;

        PositionSample {
            timestamp: current_timestamp(),
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.altitude,
            accuracy: 4.0 + (t * 0.3).sin().abs() * 3.0,
            speed,
            course: if speed > 0.2 {
                Some((t * 0.5).rem_euclid(360.0))
            } else {
                None
            },
        }
    }
}

impl Default for SimulatedTrail {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn position_loop(tx: Sender<PositionSample>) {
    let mut interval = interval(Duration::from_secs(1)); // ~1 Hz fixes
    let mut trail = SimulatedTrail::new();
    let mut sample_count = 0u64;

    loop {
        interval.tick().await;

        let fix = trail.next_position();
        match tx.try_send(fix) {
            Ok(_) => {
                sample_count += 1;
                if sample_count % 60 == 0 {
                    eprintln!("[position] {} fixes", sample_count);
                }
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                eprintln!("[position] Channel closed after {} fixes", sample_count);
                break;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
                // Channel full, drop this sample
            }
        }
    }
}

pub async fn heading_loop(tx: Sender<HeadingSample>) {
    let mut interval = interval(Duration::from_millis(250)); // ~4 Hz
    let mut sample_count = 0u64;

    loop {
        interval.tick().await;

        let t = sample_count as f64 * 0.25;
        let sample = HeadingSample {
            timestamp: current_timestamp(),
            // Slow wander around north-east with sensor jitter
            heading: (45.0 + (t * 0.1).sin() * 30.0 + (t * 2.3).sin() * 2.0).rem_euclid(360.0),
        };

        match tx.try_send(sample) {
            Ok(_) => {
                sample_count += 1;
                if sample_count % 240 == 0 {
                    eprintln!("[heading] {} samples", sample_count);
                }
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                eprintln!("[heading] Channel closed after {} samples", sample_count);
                break;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {}
        }
    }
}

/// Runs only while calibration is active: the runner spawns this task on
/// `start_calibration` and aborts it when calibration ends. The simulated
/// wrist traces a figure-8, reversing rotation direction every second.
pub async fn motion_loop(tx: Sender<MotionSample>) {
    let mut interval = interval(Duration::from_millis(MOTION_SAMPLE_INTERVAL_MS));
    let mut sample_count = 0u64;

    loop {
        interval.tick().await;

        let t = sample_count as f64 * (MOTION_SAMPLE_INTERVAL_MS as f64 / 1000.0);
        let phase = if (t as u64) % 2 == 0 { 1.0 } else { -1.0 };
        let sample = MotionSample {
            timestamp: current_timestamp(),
            rotation_x: (t * 3.0).sin() * 0.4,
            rotation_y: (t * 2.0).cos() * 0.3,
            rotation_z: phase * (1.5 + (t * 4.0).sin() * 0.3),
            accel_x: phase * 0.35,
            accel_y: (t * 5.0).sin() * 0.15,
            accel_z: 0.05,
        };

        match tx.try_send(sample) {
            Ok(_) => {
                sample_count += 1;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                eprintln!("[motion] Channel closed after {} samples", sample_count);
                break;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {}
        }
    }
}

pub fn current_timestamp() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
