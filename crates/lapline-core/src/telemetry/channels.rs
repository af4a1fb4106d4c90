//! Dashboard channel allow-list
//!
//! Raw telemetry carries far more channels than the dashboard shows. Anything
//! not listed here is dropped at load time without being reported.

use super::Sample;

/// Vehicle speed
pub const SPEED: &str = "speed";
/// Engine speed (RPM)
pub const ENGINE_SPEED: &str = "nmot";
/// Selected gear
pub const GEAR: &str = "gear";
/// Throttle pedal position
pub const THROTTLE: &str = "aps";
/// Front brake pressure
pub const BRAKE_PRESSURE: &str = "pbrake_f";
/// Steering wheel angle
pub const STEERING_ANGLE: &str = "Steering_Angle";
/// Longitudinal acceleration
pub const LONGITUDINAL_ACCEL: &str = "accx_can";
/// Lateral acceleration
pub const LATERAL_ACCEL: &str = "accy_can";
/// GPS latitude in minutes
pub const GPS_LATITUDE: &str = "VBOX_Lat_Min";
/// GPS longitude in minutes
pub const GPS_LONGITUDE: &str = "VBOX_Long_Minutes";
/// Distance from the lap trigger
pub const LAP_DISTANCE: &str = "Laptrigger_lapdist_dls";

/// Every channel the dashboard consumes
pub const DASHBOARD_CHANNELS: [&str; 11] = [
    SPEED,
    ENGINE_SPEED,
    GEAR,
    THROTTLE,
    BRAKE_PRESSURE,
    STEERING_ANGLE,
    LONGITUDINAL_ACCEL,
    LATERAL_ACCEL,
    GPS_LATITUDE,
    GPS_LONGITUDE,
    LAP_DISTANCE,
];

/// Check whether a channel is on the dashboard allow-list (exact match)
pub fn is_dashboard_channel(channel: &str) -> bool {
    DASHBOARD_CHANNELS.contains(&channel)
}

/// Keep only samples whose channel is on the allow-list, preserving order
pub fn filter_channels<I>(samples: I) -> Vec<Sample>
where
    I: IntoIterator<Item = Sample>,
{
    samples
        .into_iter()
        .filter(|s| is_dashboard_channel(&s.channel))
        .collect()
}
