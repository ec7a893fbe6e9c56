//! Time and reference-frame transforms (§4.4): Julian day conversions,
//! quaternion to rotation matrix, and the Greenwich-Sidereal-Time based
//! ECI <-> ECEF rotation used by the correction engine.

use crate::constants::{OMEGA_EARTH, SECONDS_PER_DAY};

pub type Vec3 = [f64; 3];
/// Row-major 3x3 rotation matrix.
pub type Mat3 = [[f64; 3]; 3];

pub fn mat3_mul_vec3(m: Mat3, v: Vec3) -> Vec3 {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

pub fn vec3_add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub fn vec3_sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn vec3_norm(v: Vec3) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

pub fn vec3_scale(v: Vec3, s: f64) -> Vec3 {
    [v[0] * s, v[1] * s, v[2] * s]
}

pub fn vec3_cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn vec3_unit(v: Vec3) -> Vec3 {
    let n = vec3_norm(v);
    vec3_scale(v, 1.0 / n)
}

/// Positive-remainder modulo for real values: result always in `[0, m)`.
pub fn modulo(x: f64, m: f64) -> f64 {
    let r = x % m;
    if r < 0.0 {
        r + m
    } else {
        r
    }
}

/// Days in each month of a (possibly leap) Gregorian year.
fn days_in_month(year: i32) -> [i32; 12] {
    let feb = if is_leap_year(year) { 29 } else { 28 };
    [31, feb, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Converts a Gregorian calendar date plus second-of-day to a Julian Day
/// Number (fractional). Uses the standard Fliegel & Van Flandern
/// algorithm for the integer JDN at 12:00 UT, then adds the fractional
/// day implied by `sod`.
pub fn convert_year_month_day_2_julian_day(year: i32, month: i32, day: i32, sod: f64) -> f64 {
    let a = (14 - month) / 12;
    let y = year + 4800 - a;
    let m = month + 12 * a - 3;

    let jdn = day as i64 + ((153 * m as i64 + 2) / 5) + 365 * y as i64 + (y as i64 / 4)
        - (y as i64 / 100)
        + (y as i64 / 400)
        - 32045;

    // JDN above is defined for the date at 12:00 UT; shift to midnight
    // epoch and add the fraction of the day elapsed, matching the source
    // tool's convention of JDN - 2415020 anchored at SOD = 0.
    (jdn as f64) - 0.5 + sod / SECONDS_PER_DAY
}

/// Converts a Year/Day-of-Year/second-of-day triple to a Julian day, via
/// the Gregorian calendar date it corresponds to.
pub fn convert_year_doy_2_julian_day(year: i32, doy: i32, sod: f64) -> f64 {
    let (month, day) = doy_to_month_day(year, doy);
    convert_year_month_day_2_julian_day(year, month, day, sod)
}

fn doy_to_month_day(year: i32, doy: i32) -> (i32, i32) {
    let months = days_in_month(year);
    let mut remaining = doy;
    for (idx, days) in months.iter().enumerate() {
        if remaining <= *days {
            return (idx as i32 + 1, remaining);
        }
        remaining -= days;
    }
    (12, remaining.max(1))
}

/// Converts a Julian day number back to a (year, month, day) triple.
pub fn convert_julian_day_2_year_month_day(jd: f64) -> (i32, i32, i32) {
    let z = (jd + 0.5).floor() as i64;
    let alpha = ((z as f64 - 1867216.25) / 36524.25).floor() as i64;
    let a = if z < 2299161 {
        z
    } else {
        z + 1 + alpha - alpha / 4
    };
    let b = a + 1524;
    let c = ((b as f64 - 122.1) / 365.25).floor() as i64;
    let d = (365.25 * c as f64).floor() as i64;
    let e = ((b - d) as f64 / 30.6001).floor() as i64;

    let day = (b - d - (30.6001 * e as f64) as i64) as i32;
    let month = if e < 14 { e - 1 } else { e - 13 } as i32;
    let year = if month > 2 { c - 4716 } else { c - 4715 } as i32;

    (year, month, day)
}

pub fn convert_year_month_day_2_doy(year: i32, month: i32, day: i32) -> i32 {
    let months = days_in_month(year);
    months[..(month as usize - 1)].iter().sum::<i32>() + day
}

/// Rotation matrix from the satellite-body / LEO reference frame (SRF)
/// to ECI, built from the attitude quaternion (q0 scalar part).
pub fn quaternion_to_rotation_matrix(q0: f64, q1: f64, q2: f64, q3: f64) -> Mat3 {
    [
        [
            1.0 - 2.0 * q2 * q2 - 2.0 * q3 * q3,
            2.0 * (q1 * q2 - q0 * q3),
            2.0 * (q0 * q2 + q1 * q3),
        ],
        [
            2.0 * (q1 * q2 + q0 * q3),
            1.0 - 2.0 * q1 * q1 - 2.0 * q3 * q3,
            2.0 * (q2 * q3 - q0 * q1),
        ],
        [
            2.0 * (q1 * q3 - q0 * q2),
            2.0 * (q0 * q1 + q2 * q3),
            1.0 - 2.0 * q1 * q1 - 2.0 * q2 * q2,
        ],
    ]
}

/// Greenwich Sidereal Time, in radians, for the given Year/DoY/SOD.
///
/// Follows the source tool's exact numeric convention: the Julian Day
/// Number is referenced to `JDN - 2415020` (a fixed offset from the
/// standard Julian epoch used throughout the legacy ephemeris tables),
/// and the fractional day is added back in separately from `SOD / 86400`.
pub fn greenwich_sidereal_time_rad(year: i32, doy: i32, sod: f64) -> f64 {
    let jdn = convert_year_doy_2_julian_day(year, doy, sod) - 2_415_020.0;
    let fday = sod / SECONDS_PER_DAY;
    let gst_deg = modulo(279.690983 + 0.9856473354 * jdn + 360.0 * fday + 180.0, 360.0);
    gst_deg.to_radians()
}

/// ECI -> ECEF rotation matrix about the Z axis by Greenwich Sidereal Time.
pub fn eci_to_ecef_matrix(gst_rad: f64) -> Mat3 {
    rotation_z(gst_rad)
}

/// Standard right-handed rotation about the Z axis by `angle` radians,
/// used both for the GST (ECI->ECEF) and Sagnac corrections (§4.2), with
/// the same sign convention in both places.
pub fn rotation_z(angle: f64) -> Mat3 {
    let (s, c) = angle.sin_cos();
    [[c, s, 0.0], [-s, c, 0.0], [0.0, 0.0, 1.0]]
}

/// Sagnac correction: rotates a satellite ECI/ECEF position by the Earth
/// rotation that occurs during the signal's flight time.
pub fn apply_sagnac(sat_com_pos: Vec3, flight_time_s: f64) -> Vec3 {
    let theta = OMEGA_EARTH * flight_time_s;
    mat3_mul_vec3(rotation_z(theta), sat_com_pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn modulo_is_always_nonnegative() {
        assert!(approx_eq!(f64, modulo(-10.0, 360.0), 350.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, modulo(370.0, 360.0), 10.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, modulo(0.0, 360.0), 0.0, epsilon = 1e-9));
    }

    #[test]
    fn julian_day_round_trips_through_calendar_date() {
        let jd = convert_year_month_day_2_julian_day(2024, 7, 14, 0.0);
        let (y, m, d) = convert_julian_day_2_year_month_day(jd);
        assert_eq!((y, m, d), (2024, 7, 14));
    }

    #[test]
    fn doy_round_trips_through_julian_day() {
        let year = 2024;
        let doy = 196; // 2024-07-14
        let jd = convert_year_doy_2_julian_day(year, doy, 0.0);
        let (y, m, d) = convert_julian_day_2_year_month_day(jd);
        assert_eq!(convert_year_month_day_2_doy(y, m, d), doy);
    }

    #[test]
    fn identity_quaternion_is_identity_rotation() {
        let r = quaternion_to_rotation_matrix(1.0, 0.0, 0.0, 0.0);
        let v = [1.0, 2.0, 3.0];
        let rv = mat3_mul_vec3(r, v);
        assert!(approx_eq!(f64, rv[0], v[0], epsilon = 1e-12));
        assert!(approx_eq!(f64, rv[1], v[1], epsilon = 1e-12));
        assert!(approx_eq!(f64, rv[2], v[2], epsilon = 1e-12));
    }

    #[test]
    fn rotation_z_preserves_norm() {
        let v = [3.0, -4.0, 5.0];
        let r = rotation_z(0.7);
        let rv = mat3_mul_vec3(r, v);
        assert!(approx_eq!(f64, vec3_norm(rv), vec3_norm(v), epsilon = 1e-9));
    }

    #[test]
    fn sagnac_rotation_is_small_for_leo_flight_times() {
        let pos = [7_000_000.0, 0.0, 0.0];
        let rotated = apply_sagnac(pos, 0.02);
        // a few cm of cross-track displacement for a ~20ms flight time at LEO altitude
        assert!((vec3_norm(vec3_sub(rotated, pos)) - 0.02 * OMEGA_EARTH * 7_000_000.0).abs() < 1e-3);
    }
}
