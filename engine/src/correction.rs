//! Correction engine (§4.2): geometric, clock, relativistic, and antenna
//! phase-center corrections that turn a preprocessed observation into a
//! `CorrectedMeas` ready for a navigation filter.

use crate::constants::SPEED_OF_LIGHT;
use crate::frames::{
    eci_to_ecef_matrix, greenwich_sidereal_time_rad, mat3_mul_vec3, quaternion_to_rotation_matrix, vec3_add,
    vec3_cross, vec3_norm, vec3_sub, vec3_unit, Vec3,
};
use crate::sun::find_sun;
use crate::tables::{
    leo_com_pos, leo_quat, sat_apo, sat_bia, sat_clk_bias, sat_pos_window, LeoPosRow, LeoQuatRow, SatApoRow,
    SatBiaRow, SatClkRow, SatPosRow,
};
use crate::types::{CorrStateTable, CorrectedMeas, PreproObs, Sv};

/// Converts a centimetre-valued ephemeris coordinate to metres. Both
/// `LeoPos` and `SatPos` store position components in centimetres.
const CM_TO_M: f64 = 0.01;

/// Half-window passed to `sat_pos_window`: ten points total straddling
/// the transmission time, per §4.2.
const LAGRANGE_HALF_WINDOW: usize = 5;

/// Antenna geometry and per-constellation UERE weights, §6.
#[derive(Debug, Clone, Copy)]
pub struct CorrConfig {
    /// Receiver centre of mass, satellite reference frame (SRF), metres.
    pub leo_com: Vec3,
    /// Antenna reference point, SRF, metres.
    pub leo_arp: Vec3,
    /// GPS-band phase centre offset, SRF, metres.
    pub leo_pco_gps: Vec3,
    /// Galileo-band phase centre offset, SRF, metres.
    pub leo_pco_gal: Vec3,
    pub gps_uere: f64,
    pub gal_uere: f64,
}

impl CorrConfig {
    fn pco_for(&self, constellation: crate::types::Constellation) -> Vec3 {
        match constellation {
            crate::types::Constellation::Gps => self.leo_pco_gps,
            crate::types::Constellation::Galileo => self.leo_pco_gal,
        }
    }

    fn uere_for(&self, constellation: crate::types::Constellation) -> f64 {
        match constellation {
            crate::types::Constellation::Gps => self.gps_uere,
            crate::types::Constellation::Galileo => self.gal_uere,
        }
    }
}

/// Runs the correction engine over every preprocessed observation of one
/// epoch and returns one `CorrectedMeas` per input, in the same order.
#[allow(clippy::too_many_arguments)]
pub fn correct_epoch(
    config: &CorrConfig,
    year: i32,
    doy: i32,
    obs: &[PreproObs],
    leo_pos_rows: &[LeoPosRow],
    leo_quat_rows: &[LeoQuatRow],
    sat_pos_rows: &[SatPosRow],
    sat_clk_rows: &[SatClkRow],
    sat_apo_rows: &[SatApoRow],
    sat_bia_rows: &[SatBiaRow],
    state: &mut CorrStateTable,
) -> Vec<CorrectedMeas> {
    let mut measurements: Vec<CorrectedMeas> = obs
        .iter()
        .map(|o| {
            correct_one(
                config,
                year,
                doy,
                o,
                leo_pos_rows,
                leo_quat_rows,
                sat_pos_rows,
                sat_clk_rows,
                sat_apo_rows,
                sat_bia_rows,
                state,
            )
        })
        .collect();

    apply_receiver_clock_first_guess(&mut measurements);
    measurements
}

#[allow(clippy::too_many_arguments)]
fn correct_one(
    config: &CorrConfig,
    year: i32,
    doy: i32,
    obs: &PreproObs,
    leo_pos_rows: &[LeoPosRow],
    leo_quat_rows: &[LeoQuatRow],
    sat_pos_rows: &[SatPosRow],
    sat_clk_rows: &[SatClkRow],
    sat_apo_rows: &[SatApoRow],
    sat_bia_rows: &[SatBiaRow],
    state: &mut CorrStateTable,
) -> CorrectedMeas {
    let sv = obs.sv;
    let gamma = sv.constellation.gamma();

    let leo_com_m = leo_com_pos(leo_pos_rows, obs.sod).map(|p| scale(p, CM_TO_M)).unwrap_or([0.0; 3]);
    let leo_apo = receiver_apc_ecef(config, year, doy, obs.sod, leo_quat_rows, sv).unwrap_or([0.0; 3]);
    let rcvr_ref_pos = vec3_add(leo_com_m, leo_apo);

    let sat_clk_raw = sat_clk_bias(sat_clk_rows, sv, obs.sod).unwrap_or(0.0);
    let transmission_time = obs.sod - obs.c1 / SPEED_OF_LIGHT - sat_clk_raw;

    let sat_com_pos_raw = satellite_com_pos(sat_pos_rows, sv, transmission_time).unwrap_or([0.0; 3]);
    let flight_time_s = vec3_norm(vec3_sub(sat_com_pos_raw, rcvr_ref_pos)) / SPEED_OF_LIGHT;
    let sat_pos = crate::frames::apply_sagnac(sat_com_pos_raw, flight_time_s);

    let sun_pos = find_sun(year, doy, obs.sod);
    let sat_apo_vec = satellite_apo(sat_apo_rows, sv, sat_pos, sun_pos, gamma).unwrap_or([0.0; 3]);
    let sat_cop_pos = vec3_add(sat_pos, sat_apo_vec);

    let (sat_code_bia, sat_phase_bia, sat_clk_bia) = satellite_biases(sat_bia_rows, sv, gamma).unwrap_or((0.0, 0.0, 0.0));

    let dtr = relativistic_correction(state, sv, obs.sod, sat_pos);
    let sat_clk = SPEED_OF_LIGHT * (sat_clk_raw + sat_clk_bia) + SPEED_OF_LIGHT * dtr;

    let corr_code = obs.if_c + sat_clk + sat_code_bia;
    let corr_phase = obs.if_p + sat_clk + sat_phase_bia;
    let geom_range = vec3_norm(vec3_sub(sat_cop_pos, rcvr_ref_pos));
    let code_residual = corr_code - geom_range;
    let phase_residual = corr_phase - geom_range;

    let flag = !(dtr == 0.0 || corr_code == 0.0 || corr_phase == 0.0 || geom_range == 0.0);

    CorrectedMeas {
        sod: obs.sod,
        sv,
        elevation: obs.elevation,
        azimuth: obs.azimuth,
        flag,
        rcvr_ref_pos,
        leo_apo,
        sat_pos,
        sat_apo: sat_apo_vec,
        sat_clk,
        sat_code_bia,
        sat_phase_bia,
        flight_time_ms: flight_time_s * 1000.0,
        dtr,
        corr_code,
        corr_phase,
        geom_range,
        code_residual,
        phase_residual,
        rcvr_clk: 0.0,
        sigma_uere: config.uere_for(sv.constellation),
    }
}

fn scale(v: Vec3, s: f64) -> Vec3 {
    [v[0] * s, v[1] * s, v[2] * s]
}

/// Receiver antenna phase centre in ECEF, §4.2 steps 1-5.
fn receiver_apc_ecef(
    config: &CorrConfig,
    year: i32,
    doy: i32,
    sod: f64,
    leo_quat_rows: &[LeoQuatRow],
    sv: Sv,
) -> Option<Vec3> {
    let apc_srf = vec3_add(vec3_sub(config.leo_arp, config.leo_com), config.pco_for(sv.constellation));

    let (q0, q1, q2, q3) = leo_quat(leo_quat_rows, sod)?;
    let r_q = quaternion_to_rotation_matrix(q0, q1, q2, q3);
    let apc_eci = mat3_mul_vec3(r_q, apc_srf);

    let gst = greenwich_sidereal_time_rad(year, doy, sod);
    let r_gst = eci_to_ecef_matrix(gst);
    Some(mat3_mul_vec3(r_gst, apc_eci))
}

/// Satellite centre-of-mass position at `transmission_time`, via 10-point
/// Lagrange interpolation over the nearest `SatPos` rows for this SV.
fn satellite_com_pos(sat_pos_rows: &[SatPosRow], sv: Sv, transmission_time: f64) -> Option<Vec3> {
    let window = sat_pos_window(sat_pos_rows, sv, transmission_time, LAGRANGE_HALF_WINDOW);
    if window.len() < 2 {
        return None;
    }

    let xs: Vec<f64> = window.iter().map(|r| r.sod).collect();
    let x_pos: Vec<f64> = window.iter().map(|r| r.x_cm * CM_TO_M).collect();
    let y_pos: Vec<f64> = window.iter().map(|r| r.y_cm * CM_TO_M).collect();
    let z_pos: Vec<f64> = window.iter().map(|r| r.z_cm * CM_TO_M).collect();

    Some([
        lagrange_interpolate(&xs, &x_pos, transmission_time),
        lagrange_interpolate(&xs, &y_pos, transmission_time),
        lagrange_interpolate(&xs, &z_pos, transmission_time),
    ])
}

/// Classic Lagrange interpolation: `sum_i y_i * prod_{j != i} (x - x_j)/(x_i - x_j)`.
fn lagrange_interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len();
    let mut total = 0.0;
    for i in 0..n {
        let mut term = ys[i];
        for j in 0..n {
            if i == j {
                continue;
            }
            term *= (x - xs[j]) / (xs[i] - xs[j]);
        }
        total += term;
    }
    total
}

/// Satellite antenna phase offset, rotated into ECEF via the satellite
/// body frame (radial, sun-pointing, cross-track), then combined across
/// frequencies with the same iono-free weighting as the code/phase biases.
fn satellite_apo(sat_apo_rows: &[SatApoRow], sv: Sv, sat_pos: Vec3, sun_pos: Vec3, gamma: f64) -> Option<Vec3> {
    let row = sat_apo(sat_apo_rows, sv)?;

    let k = vec3_unit(sat_pos);
    let e = vec3_unit(vec3_sub(sun_pos, sat_pos));
    let j = vec3_cross(k, e);
    let i = vec3_cross(j, k);

    let rotate = |body: Vec3| -> Vec3 {
        [
            i[0] * body[0] + j[0] * body[1] + k[0] * body[2],
            i[1] * body[0] + j[1] * body[1] + k[1] * body[2],
            i[2] * body[0] + j[2] * body[1] + k[2] * body[2],
        ]
    };

    let apo_f1 = rotate(row.f1);
    let apo_f2 = rotate(row.f2);
    Some([
        (apo_f1[0] + gamma * apo_f2[0]) / (1.0 + gamma),
        (apo_f1[1] + gamma * apo_f2[1]) / (1.0 + gamma),
        (apo_f1[2] + gamma * apo_f2[2]) / (1.0 + gamma),
    ])
}

/// Iono-free satellite code/phase/clock biases, §4.2.
fn satellite_biases(sat_bia_rows: &[SatBiaRow], sv: Sv, gamma: f64) -> Option<(f64, f64, f64)> {
    let row = sat_bia(sat_bia_rows, sv)?;
    let code_bias = (row.obs_f1_c + gamma * row.obs_f2_c) / (1.0 + gamma);
    let phase_bias = (row.obs_f1_p + gamma * row.obs_f2_p) / (1.0 + gamma);
    let clock_bias = (row.clk_f1_c + gamma * row.clk_f2_c) / (1.0 + gamma);
    Some((code_bias, phase_bias, clock_bias))
}

/// Relativistic correction via finite difference of consecutive satellite
/// positions. Zero (and implicitly Flag = 0 downstream) when there is no
/// previous epoch for this satellite yet.
fn relativistic_correction(state: &mut CorrStateTable, sv: Sv, sod: f64, sat_pos: Vec3) -> f64 {
    let st = state.get_mut(sv);
    let dtr = match (st.sod_prev, st.sat_com_pos_prev) {
        (Some(sod_prev), Some(pos_prev)) if sod > sod_prev => {
            let delta_t = sod - sod_prev;
            let delta_r = vec3_norm(vec3_sub(sat_pos, pos_prev));
            delta_r / (SPEED_OF_LIGHT * delta_t)
        }
        _ => 0.0,
    };
    st.sod_prev = Some(sod);
    st.sat_com_pos_prev = Some(sat_pos);
    dtr
}

/// Weighted-mean receiver clock first guess across all satellites of the
/// epoch, weights `1 / sigma_uere^2`; subtracted from every code and phase
/// residual in place.
fn apply_receiver_clock_first_guess(measurements: &mut [CorrectedMeas]) {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for m in measurements.iter() {
        if m.sigma_uere <= 0.0 {
            continue;
        }
        let w = 1.0 / (m.sigma_uere * m.sigma_uere);
        weighted_sum += w * m.code_residual;
        weight_total += w;
    }

    if weight_total == 0.0 {
        return;
    }

    let rcvr_clk = weighted_sum / weight_total;
    for m in measurements.iter_mut() {
        m.rcvr_clk = rcvr_clk;
        m.code_residual -= rcvr_clk;
        m.phase_residual -= rcvr_clk;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Constellation;
    use float_cmp::approx_eq;

    fn test_config() -> CorrConfig {
        CorrConfig {
            leo_com: [0.0, 0.0, 0.0],
            leo_arp: [0.1, 0.0, 0.0],
            leo_pco_gps: [0.0, 0.0, 0.05],
            leo_pco_gal: [0.0, 0.0, 0.05],
            gps_uere: 1.0,
            gal_uere: 1.0,
        }
    }

    #[test]
    fn lagrange_reproduces_exact_polynomial() {
        let xs = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        let ys: Vec<f64> = xs.iter().map(|&x| 2.0 * x * x - x + 5.0).collect();
        let y = lagrange_interpolate(&xs, &ys, 2.5);
        let expected = 2.0 * 2.5 * 2.5 - 2.5 + 5.0;
        assert!(approx_eq!(f64, y, expected, epsilon = 1e-6));
    }

    #[test]
    fn first_epoch_has_zero_dtr_and_is_flagged() {
        let mut state = CorrStateTable::new();
        let sv = Sv::new(Constellation::Gps, 3);
        let dtr = relativistic_correction(&mut state, sv, 100.0, [7_000_000.0, 0.0, 0.0]);
        assert_eq!(dtr, 0.0);
    }

    #[test]
    fn second_epoch_dtr_is_nonzero_for_moving_satellite() {
        let mut state = CorrStateTable::new();
        let sv = Sv::new(Constellation::Gps, 3);
        relativistic_correction(&mut state, sv, 100.0, [7_000_000.0, 0.0, 0.0]);
        let dtr = relativistic_correction(&mut state, sv, 101.0, [7_000_100.0, 0.0, 0.0]);
        assert!(dtr > 0.0);
    }

    #[test]
    fn receiver_clock_first_guess_is_subtracted_from_all_residuals() {
        let mut measurements = vec![
            CorrectedMeas {
                sod: 0.0,
                sv: Sv::new(Constellation::Gps, 1),
                elevation: 45.0,
                azimuth: 10.0,
                flag: true,
                rcvr_ref_pos: [0.0; 3],
                leo_apo: [0.0; 3],
                sat_pos: [0.0; 3],
                sat_apo: [0.0; 3],
                sat_clk: 0.0,
                sat_code_bia: 0.0,
                sat_phase_bia: 0.0,
                flight_time_ms: 0.0,
                dtr: 0.001,
                corr_code: 10.0,
                corr_phase: 10.0,
                geom_range: 0.0,
                code_residual: 10.0,
                phase_residual: 10.0,
                rcvr_clk: 0.0,
                sigma_uere: 1.0,
            },
            CorrectedMeas {
                sod: 0.0,
                sv: Sv::new(Constellation::Gps, 2),
                elevation: 45.0,
                azimuth: 10.0,
                flag: true,
                rcvr_ref_pos: [0.0; 3],
                leo_apo: [0.0; 3],
                sat_pos: [0.0; 3],
                sat_apo: [0.0; 3],
                sat_clk: 0.0,
                sat_code_bia: 0.0,
                sat_phase_bia: 0.0,
                flight_time_ms: 0.0,
                dtr: 0.001,
                corr_code: 20.0,
                corr_phase: 20.0,
                geom_range: 0.0,
                code_residual: 20.0,
                phase_residual: 20.0,
                rcvr_clk: 0.0,
                sigma_uere: 1.0,
            },
        ];

        apply_receiver_clock_first_guess(&mut measurements);

        assert!(approx_eq!(f64, measurements[0].rcvr_clk, 15.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, measurements[0].code_residual, -5.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, measurements[1].code_residual, 5.0, epsilon = 1e-9));
    }

    #[test]
    fn receiver_apc_is_none_without_matching_quaternion_row() {
        let config = test_config();
        let rows: Vec<LeoQuatRow> = vec![];
        let sv = Sv::new(Constellation::Gps, 1);
        assert!(receiver_apc_ecef(&config, 2024, 180, 43_200.0, &rows, sv).is_none());
    }
}
