use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration, Instant};

use trail_tracker_rs::alerts::NotificationSink;
use trail_tracker_rs::engine::{EngineConfig, TrackerEngine, TrackerEvent};
use trail_tracker_rs::geocode::{GeocodeError, GeocodeFuture, GeocodingService, PlaceName};
use trail_tracker_rs::health_monitor::HealthMonitor;
use trail_tracker_rs::live_status::{current_timestamp, LiveStatus};
use trail_tracker_rs::types::{HeadingSample, MotionSample, PositionSample};
use trail_tracker_rs::{sources, units};

#[derive(Parser, Debug)]
#[command(name = "trail_tracker")]
#[command(about = "Wrist-worn travel tracker engine - simulated sensor run", long_about = None)]
struct Args {
    /// Duration in seconds (0 = continuous)
    #[arg(value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// Output directory for status and summary files
    #[arg(long, default_value = "trail_tracker_sessions")]
    output_dir: String,

    /// Seconds between live status saves
    #[arg(long, default_value = "2")]
    status_interval: u64,

    /// Waypoint capture timeout in seconds (0 = wait forever)
    #[arg(long, default_value = "30")]
    waypoint_timeout: f64,

    /// Run a compass calibration shortly after startup
    #[arg(long)]
    calibrate: bool,

    /// Capture a waypoint shortly after startup
    #[arg(long)]
    capture_waypoint: bool,
}

/// Stand-in for the platform's opaque reverse geocoder.
struct StaticGeocoder;

impl GeocodingService for StaticGeocoder {
    fn resolve(&mut self, latitude: f64, longitude: f64) -> GeocodeFuture {
        Box::pin(async move {
            sleep(Duration::from_millis(200)).await;
            if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
                return Err(GeocodeError("coordinate out of range".to_string()));
            }
            Ok(PlaceName {
                locality: format!("Near {:.3}, {:.3}", latitude, longitude),
                sub_region: "Backcountry".to_string(),
            })
        })
    }
}

/// Notification sink that prints; a real host would raise a haptic alert.
struct StderrNotifier {
    delivered: u64,
}

impl NotificationSink for StderrNotifier {
    fn deliver(&mut self, alert: &trail_tracker_rs::alerts::AltitudeAlert) {
        self.delivered += 1;
        eprintln!(
            "[alert] {:?} altitude: {}",
            alert.level,
            units::format_elevation(alert.elevation_m)
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    println!("[{}] Trail Tracker Starting", ts_now());
    println!("  Duration: {} seconds (0=continuous)", args.duration);
    println!("  Output Dir: {}", args.output_dir);
    println!("  Waypoint Timeout: {}s", args.waypoint_timeout);

    std::fs::create_dir_all(&args.output_dir)?;

    let mut engine = TrackerEngine::new(EngineConfig {
        waypoint_capture_timeout_secs: args.waypoint_timeout,
        ..EngineConfig::default()
    });
    let health = HealthMonitor::new();
    let mut geocoder = StaticGeocoder;
    let mut notifier = StderrNotifier { delivered: 0 };

    // Channels for sensor data
    let (position_tx, mut position_rx) = mpsc::channel::<PositionSample>(64);
    let (heading_tx, mut heading_rx) = mpsc::channel::<HeadingSample>(256);
    let (motion_tx, mut motion_rx) = mpsc::channel::<MotionSample>(512);

    // Geocode results come back on their own channel so lookups never
    // block the drain loop
    type GeoResult = (Result<PlaceName, GeocodeError>, f64, f64);
    let (geo_tx, mut geo_rx) = mpsc::channel::<GeoResult>(8);

    // Position and heading run for the whole session; the motion source
    // starts and stops with calibration
    let _position_handle = tokio::spawn(sources::position_loop(position_tx.clone()));
    let _heading_handle = tokio::spawn(sources::heading_loop(heading_tx.clone()));
    let mut motion_task: Option<JoinHandle<()>> = None;

    drop(position_tx);
    drop(heading_tx);

    engine.start_session(current_timestamp());

    // Sample counters
    let mut position_count = 0u64;
    let mut heading_count = 0u64;
    let mut motion_count = 0u64;

    let start = Instant::now();
    let mut last_tick = Instant::now();
    let mut last_status = Instant::now();
    let mut calibration_started = false;
    let mut capture_started = false;

    println!("[{}] Session started", ts_now());

    loop {
        if args.duration > 0 && start.elapsed().as_secs() >= args.duration {
            println!("[{}] Duration reached, stopping...", ts_now());
            break;
        }

        let mut events = Vec::new();

        while let Ok(fix) = position_rx.try_recv() {
            health.position.update();
            position_count += 1;
            events.extend(engine.feed_position(&fix));
        }

        while let Ok(sample) = heading_rx.try_recv() {
            health.heading.update();
            heading_count += 1;
            events.extend(engine.feed_heading(&sample));
        }

        while let Ok(sample) = motion_rx.try_recv() {
            health.motion.update();
            motion_count += 1;
            events.extend(engine.feed_motion(&sample));
        }

        while let Ok((result, lat, lon)) = geo_rx.try_recv() {
            match result {
                Ok(name) => {
                    println!("[{}] Geocoded: {}", ts_now(), name.locality);
                    engine.record_geocode_success(name, lat, lon);
                }
                Err(err) => {
                    // Non-fatal: the last-known-good name keeps serving
                    eprintln!("[geocode] {}", err);
                    engine.record_geocode_failure();
                }
            }
        }

        // 1 Hz housekeeping tick
        if last_tick.elapsed() >= Duration::from_secs(1) {
            events.extend(engine.tick(current_timestamp()));
            last_tick = Instant::now();

            // Position silence freezes metrics until fixes resume
            let calibrating = engine.snapshot().calibration_state
                != trail_tracker_rs::calibration::CalibrationState::Idle;
            let report = health.check_health(calibrating);
            if !report.position_healthy {
                if let Some(event) = engine.set_connected(false) {
                    events.push(event);
                }
            }
        }

        // Demo triggers
        if args.calibrate && !calibration_started && start.elapsed() >= Duration::from_secs(3) {
            calibration_started = true;
            let _completion = engine.start_calibration(current_timestamp());
            motion_task = Some(tokio::spawn(sources::motion_loop(motion_tx.clone())));
            println!("[{}] Calibration started - trace a figure-8", ts_now());
        }
        if args.capture_waypoint && !capture_started && start.elapsed() >= Duration::from_secs(5) {
            capture_started = true;
            let _completion = engine.begin_waypoint_capture();
            println!("[{}] Waypoint capture started", ts_now());
        }

        for event in events {
            match event {
                TrackerEvent::AltitudeAlert(alert) => notifier.deliver(&alert),
                TrackerEvent::WaypointCaptured { waypoint, samples } => {
                    println!(
                        "[{}] Waypoint saved: {:.5}, {:.5} ({} fixes averaged)",
                        ts_now(),
                        waypoint.latitude,
                        waypoint.longitude,
                        samples
                    );
                }
                TrackerEvent::WaypointCaptureTimedOut { waited_secs } => {
                    println!(
                        "[{}] Waypoint capture gave up after {:.0}s",
                        ts_now(),
                        waited_secs
                    );
                }
                TrackerEvent::GestureRecognized { direction_changes } => {
                    println!(
                        "[{}] Figure-8 recognized ({} reversals)",
                        ts_now(),
                        direction_changes
                    );
                }
                TrackerEvent::GestureReset { idle_secs } => {
                    println!(
                        "[{}] Gesture reset after {:.1}s without motion",
                        ts_now(),
                        idle_secs
                    );
                }
                TrackerEvent::CalibrationFinished {
                    heading_deg,
                    samples,
                } => {
                    println!(
                        "[{}] Calibration complete: heading {:.1} deg ({} samples)",
                        ts_now(),
                        heading_deg,
                        samples
                    );
                    if let Some(task) = motion_task.take() {
                        task.abort();
                    }
                }
                TrackerEvent::CalibrationAborted | TrackerEvent::CalibrationCancelled => {
                    println!("[{}] Calibration ended without a heading update", ts_now());
                    if let Some(task) = motion_task.take() {
                        task.abort();
                    }
                }
                TrackerEvent::GeocodeRefreshNeeded {
                    latitude,
                    longitude,
                } => {
                    let fut = geocoder.resolve(latitude, longitude);
                    let tx = geo_tx.clone();
                    tokio::spawn(async move {
                        let _ = tx.send((fut.await, latitude, longitude)).await;
                    });
                }
                TrackerEvent::ConnectionLost => {
                    eprintln!("[health] Position source silent - metrics frozen");
                }
                TrackerEvent::ConnectionRestored => {
                    println!("[{}] Position source back - metrics resumed", ts_now());
                }
            }
        }

        // Periodic live status save
        if last_status.elapsed() >= Duration::from_secs(args.status_interval) {
            let mut status = LiveStatus::new();
            status.apply_snapshot(&engine.snapshot());
            status.position_samples = position_count;
            status.heading_samples = heading_count;
            status.motion_samples = motion_count;
            status.alerts_delivered = notifier.delivered;
            status.uptime_seconds = start.elapsed().as_secs();
            let status_path = format!("{}/live_status.json", args.output_dir);
            let _ = status.save(&status_path);
            last_status = Instant::now();
        }

        sleep(Duration::from_millis(1)).await;
    }

    // Final summary
    let summary = engine.end_session();
    let summary_path = format!("{}/summary_{}.json", args.output_dir, ts_now_clean());
    std::fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;

    let mut status = LiveStatus::new();
    status.apply_snapshot(&engine.snapshot());
    status.position_samples = position_count;
    status.heading_samples = heading_count;
    status.motion_samples = motion_count;
    status.alerts_delivered = notifier.delivered;
    status.uptime_seconds = start.elapsed().as_secs();
    let _ = status.save(&format!("{}/live_status_final.json", args.output_dir));

    println!("\n=== Trip Summary ===");
    println!("Distance:  {}", units::format_distance(summary.distance_mi));
    println!(
        "Top speed: {}",
        units::format_speed(summary.top_speed_mph)
    );
    println!(
        "Avg speed: {}",
        units::format_speed(summary.avg_speed_mph)
    );
    println!("Time:      {}", units::format_duration(summary.elapsed_secs));
    println!("Saved to {}", summary_path);

    Ok(())
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}

fn ts_now_clean() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}
