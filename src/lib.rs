//! Telemetry and navigation engine for a wrist-worn outdoor travel
//! tracker. Ingests raw position, heading and motion samples, filters the
//! noise, and derives travel metrics, a navigable waypoint bearing, and a
//! figure-8 compass-calibration gesture.
//!
//! The engine is a pure computation layer: samples in, derived state and
//! events out. Async sensor sources, persistence and the presentation
//! layer all live outside it.

pub mod alerts;
pub mod calibration;
pub mod elevation;
pub mod engine;
pub mod geocode;
pub mod heading;
pub mod health_monitor;
pub mod live_status;
pub mod metrics;
pub mod sources;
pub mod types;
pub mod units;
pub mod waypoint;

pub use engine::{EngineConfig, EngineSnapshot, TrackerEngine, TrackerEvent};
pub use types::{
    ElevationReading, HeadingSample, MotionSample, PositionSample, TravelMetrics, TravelSummary,
    WaypointLocation,
};
