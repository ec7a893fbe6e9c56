//! Low-precision Sun position, used only to build the satellite
//! body frame for antenna phase offset projection (§4.2 `computeSatApo`).
//!
//! This is an external collaborator per the distilled spec (`findSun`):
//! the correction engine only consumes its output, a unit-scale ECEF
//! direction towards the Sun is all that §4.2's body-frame construction
//! needs. The formulas below are the standard low-precision (~0.01 deg)
//! solar ephemeris (Astronomical Almanac / USNO), adequate for antenna
//! body-frame geometry but not for anything requiring sub-arcsecond
//! accuracy.

use crate::frames::{convert_year_doy_2_julian_day, eci_to_ecef_matrix, mat3_mul_vec3, Vec3};

const AU_METERS: f64 = 149_597_870_700.0;
/// Julian date of the J2000.0 epoch.
const JD_J2000: f64 = 2_451_545.0;

/// Approximate Sun position in ECEF metres at the given Year/DoY/SOD.
pub fn find_sun(year: i32, doy: i32, sod: f64) -> Vec3 {
    // `convert_year_doy_2_julian_day` already returns a full Julian Date
    // (not the legacy `- 2415020` offset used only in the GST computation
    // of §4.2, which is subtracted separately at that call site).
    let jd = convert_year_doy_2_julian_day(year, doy, sod);
    let n = jd - JD_J2000;

    let mean_anomaly = (357.529 + 0.985_600_28 * n).to_radians();
    let mean_longitude = (280.459 + 0.985_647_36 * n).to_radians();
    let ecliptic_longitude =
        mean_longitude + (1.915_f64.to_radians()) * mean_anomaly.sin() + (0.020_f64.to_radians()) * (2.0 * mean_anomaly).sin();
    let distance_au = 1.00014 - 0.01671 * mean_anomaly.cos() - 0.00014 * (2.0 * mean_anomaly).cos();
    let obliquity = (23.439 - 0.0000004 * n).to_radians();

    let x = distance_au * ecliptic_longitude.cos();
    let y = distance_au * obliquity.cos() * ecliptic_longitude.sin();
    let z = distance_au * obliquity.sin() * ecliptic_longitude.sin();

    let eci_m = [x * AU_METERS, y * AU_METERS, z * AU_METERS];

    let gst = super::frames::greenwich_sidereal_time_rad(year, doy, sod);
    mat3_mul_vec3(eci_to_ecef_matrix(gst), eci_m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sun_distance_is_about_one_au() {
        let pos = find_sun(2024, 180, 43_200.0);
        let r = (pos[0] * pos[0] + pos[1] * pos[1] + pos[2] * pos[2]).sqrt();
        let ratio = r / AU_METERS;
        assert!((ratio - 1.0).abs() < 0.02, "distance ratio {ratio} not within 2% of 1 AU");
    }
}
