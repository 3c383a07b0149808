//! Unit conversion constants and display formatting shared by the rest of
//! the crate. All engine math stays in SI; miles/mph exist only at the
//! aggregate and display boundary.

pub const MPS_TO_MPH: f64 = 2.23694;
pub const MPH_TO_MPS: f64 = 0.44704;
pub const METERS_TO_MILES: f64 = 0.00062137;
pub const METERS_PER_MILE: f64 = 1609.34;
pub const METERS_TO_FEET: f64 = 3.28084;

pub fn mps_to_mph(mps: f64) -> f64 {
    mps * MPS_TO_MPH
}

pub fn mph_to_mps(mph: f64) -> f64 {
    mph * MPH_TO_MPS
}

pub fn meters_to_miles(meters: f64) -> f64 {
    meters * METERS_TO_MILES
}

pub fn meters_to_feet(meters: f64) -> f64 {
    meters * METERS_TO_FEET
}

pub fn format_distance(miles: f64) -> String {
    format!("{:.2} mi", miles)
}

pub fn format_speed(mph: f64) -> String {
    format!("{:.1} mph", mph)
}

pub fn format_elevation(meters: f64) -> String {
    format!("{:.0} ft", meters_to_feet(meters))
}

/// h:mm:ss above an hour, m:ss below.
pub fn format_duration(secs: u64) -> String {
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_speed_conversion_round_trip() {
        assert_relative_eq!(mps_to_mph(1.0), 2.23694);
        assert_relative_eq!(mph_to_mps(mps_to_mph(5.0)), 5.0, epsilon = 1e-4);
    }

    #[test]
    fn test_mile_conversion() {
        // One mile of meters converts back to ~1 mile
        assert_relative_eq!(meters_to_miles(METERS_PER_MILE), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_duration(61), "1:01");
        assert_eq!(format_duration(3600), "1:00:00");
        assert_eq!(format_duration(3725), "1:02:05");
    }

    #[test]
    fn test_format_elevation_in_feet() {
        assert_eq!(format_elevation(1000.0), "3281 ft");
    }
}
