//! Physical and per-constellation constants used throughout the engine.
//!
//! Frequencies are taken from the ICD values for GPS L1/L2 and Galileo
//! E1/E5a, the same constant values carried by `rtklib`-derived GNSS
//! codebases generally.

/// Speed of light in vacuum, m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Earth rotation rate, rad/s (WGS-84 value), used for the Sagnac correction.
pub const OMEGA_EARTH: f64 = 7.2921151467e-5;

pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const SECONDS_PER_HOUR: f64 = 3_600.0;

/// GPS L1 frequency, Hz.
pub const FREQ_GPS_L1: f64 = 1.57542e9;
/// GPS L2 frequency, Hz.
pub const FREQ_GPS_L2: f64 = 1.22760e9;

/// Galileo E1 frequency, Hz.
pub const FREQ_GAL_E1: f64 = 1.57542e9;
/// Galileo E5a frequency, Hz.
pub const FREQ_GAL_E5A: f64 = 1.17645e9;

pub const GPS_L1_WAVE: f64 = SPEED_OF_LIGHT / FREQ_GPS_L1;
pub const GPS_L2_WAVE: f64 = SPEED_OF_LIGHT / FREQ_GPS_L2;
pub const GAL_E1_WAVE: f64 = SPEED_OF_LIGHT / FREQ_GAL_E1;
pub const GAL_E5A_WAVE: f64 = SPEED_OF_LIGHT / FREQ_GAL_E5A;

/// gamma = (f1/f2)^2 for GPS L1/L2.
pub fn gps_gamma_l1l2() -> f64 {
    (FREQ_GPS_L1 / FREQ_GPS_L2).powi(2)
}

/// gamma = (f1/f2)^2 for Galileo E1/E5a.
pub fn gal_gamma_e1e5a() -> f64 {
    (FREQ_GAL_E1 / FREQ_GAL_E5A).powi(2)
}

/// Maximum PRN per constellation (source tool's `MAX_NUM_SATS_CONSTEL`).
pub const MAX_NUM_SATS_CONSTEL: usize = 36;

/// Number of supported constellations (GPS, Galileo).
pub const NUM_CONSTELLATIONS: usize = 2;
