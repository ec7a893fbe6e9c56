//! PREPRO/CORR output file writers (§6 "Output files"), preserving the
//! fixed-width column layouts so downstream tooling can parse by byte
//! offset as well as by whitespace splitting.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use leoppp_engine::types::{CorrectedMeas, PreproObs};

use crate::error::AppError;

fn create(path: &Path) -> Result<BufWriter<File>, AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| AppError::Io { path: parent.to_path_buf(), source })?;
    }
    let file = File::create(path).map_err(|source| AppError::Io { path: path.to_path_buf(), source })?;
    Ok(BufWriter::new(file))
}

/// Writes one PREPRO OBS line per satellite per epoch, in the column
/// order specified by §6: `SOD PRN ELEV AZIM VALID REJECT STATUS C1 C2
/// L1 L2 S1 S2 CODE_RATE CODE_RATE_STEP PHASE_RATE PHASE_RATE_STEP
/// CODE_IF PHASE_IF SMOOTH_IF`. `CODE_RATE`/`PHASE_RATE` report the F1
/// rate and rate-step; F2 is carried in the `PreproObs` record but not
/// part of this fixed column set.
pub fn write_prepro_file(path: &Path, epochs: &[Vec<PreproObs>]) -> Result<(), AppError> {
    let mut w = create(path)?;
    writeln!(
        w,
        "# {:>4} {:>6} {:>8} {:>8} {:>4} {:>4} {:>4} {:>15} {:>15} {:>15} {:>15} {:>8} {:>8} {:>10} {:>10} {:>10} {:>10} {:>15} {:>15} {:>15}",
        "SOD", "PRN", "ELEV", "AZIM", "VALID", "REJ", "STATUS", "C1", "C2", "L1", "L2", "S1", "S2", "CODERATE",
        "CODEACC", "PHASERATE", "PHASEACC", "CODEIF", "PHASEIF", "SMOOTHIF"
    )
    .map_err(|source| AppError::Io { path: path.to_path_buf(), source })?;

    for epoch in epochs {
        for obs in epoch {
            let prn = format!("{}{:02}", obs.sv.constellation.code(), obs.sv.prn);
            writeln!(
                w,
                "{:6.0} {:>6} {:8.3} {:8.3} {:4} {:4} {:4} {:15.3} {:15.3} {:15.3} {:15.3} {:8.3} {:8.3} {:10.3} {:10.3} {:10.3} {:10.3} {:15.3} {:15.3} {:15.3}",
                obs.sod,
                prn,
                obs.elevation,
                obs.azimuth,
                obs.valid as u8,
                obs.rejection_cause.code(),
                obs.status as u8,
                obs.c1,
                obs.c2,
                obs.l1,
                obs.l2,
                obs.s1,
                obs.s2,
                obs.range_rate_l1.unwrap_or(f64::NAN),
                obs.range_rate_step_l1.unwrap_or(f64::NAN),
                obs.phase_rate_l1.unwrap_or(f64::NAN),
                obs.phase_rate_step_l1.unwrap_or(f64::NAN),
                obs.if_c,
                obs.if_p,
                obs.smooth_if,
            )
            .map_err(|source| AppError::Io { path: path.to_path_buf(), source })?;
        }
    }
    Ok(())
}

/// Writes one CORR line per satellite per epoch, column order per §6:
/// `SOD CONST PRN ELEV AZIM FLAG LEO_XYZ LEO_APO_XYZ SAT_XYZ SAT_APO_XYZ
/// SAT_CLK CODE_BIA PHASE_BIA FLIGHT_TIME DTR CORR_CODE CORR_PHASE
/// GEOM_RNGE CODE_RES PHASE_RES RCVR_CLK SUERE`.
pub fn write_corr_file(path: &Path, epochs: &[Vec<CorrectedMeas>]) -> Result<(), AppError> {
    let mut w = create(path)?;
    writeln!(
        w,
        "# {:>4} {:>1} {:>3} {:>8} {:>8} {:>4} {:>43} {:>25} {:>43} {:>25} {:>14} {:>8} {:>8} {:>8} {:>14} {:>14} {:>14} {:>14} {:>10} {:>10} {:>14} {:>10}",
        "SOD", "C", "PRN", "ELEV", "AZIM", "FLAG", "LEO-X/Y/Z", "LEO-APO-X/Y/Z", "SAT-X/Y/Z", "SAT-APO-X/Y/Z", "SAT-CLK",
        "CODE-BIA", "PHASE-BIA", "TOF", "DTR", "CORR-CODE", "CORR-PHASE", "GEOM-RNGE", "CODE-RES", "PHASE-RES",
        "RCVR-CLK", "SUERE"
    )
    .map_err(|source| AppError::Io { path: path.to_path_buf(), source })?;

    for epoch in epochs {
        for m in epoch {
            let leo_com = [m.rcvr_ref_pos[0] - m.leo_apo[0], m.rcvr_ref_pos[1] - m.leo_apo[1], m.rcvr_ref_pos[2] - m.leo_apo[2]];
            writeln!(
                w,
                "{:05.0} {:>1} {:02} {:8.3} {:8.3} {:4} {} {} {} {} {:14.3} {:8.3} {:8.3} {:8.3} {:14.3} {:14.3} {:14.3} {:14.3} {:10.4} {:10.4} {:14.3} {:10.4}",
                m.sod,
                m.sv.constellation.code(),
                m.sv.prn,
                m.elevation,
                m.azimuth,
                m.flag as u8,
                format_vec3_wide(leo_com),
                format_vec3_narrow(m.leo_apo),
                format_vec3_wide(m.sat_pos),
                format_vec3_narrow(m.sat_apo),
                m.sat_clk,
                m.sat_code_bia,
                m.sat_phase_bia,
                m.flight_time_ms,
                m.dtr,
                m.corr_code,
                m.corr_phase,
                m.geom_range,
                m.code_residual,
                m.phase_residual,
                m.rcvr_clk,
                m.sigma_uere,
            )
            .map_err(|source| AppError::Io { path: path.to_path_buf(), source })?;
        }
    }
    Ok(())
}

fn format_vec3_wide(v: [f64; 3]) -> String {
    format!("{:14.3} {:14.3} {:14.3}", v[0], v[1], v[2])
}

fn format_vec3_narrow(v: [f64; 3]) -> String {
    format!("{:8.3} {:8.3} {:8.3}", v[0], v[1], v[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use leoppp_engine::{Constellation, RejectionCause, Sv};
    use std::sync::atomic::{AtomicU64, Ordering};

    static UNIQUE: AtomicU64 = AtomicU64::new(0);

    fn temp_path(suffix: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("leoppp-output-test-{}-{}.{suffix}", std::process::id(), UNIQUE.fetch_add(1, Ordering::Relaxed)))
    }

    fn sample_prepro() -> PreproObs {
        PreproObs {
            sod: 12345.0,
            sv: Sv::new(Constellation::Gps, 7),
            elevation: 42.0,
            azimuth: 180.0,
            c1: 20_000_000.0,
            c2: 20_000_010.0,
            l1: 1.0e8,
            l2: 1.0e8,
            l1_meters: 1.9e7,
            l2_meters: 2.1e7,
            s1: 45.0,
            s2: 44.0,
            geom_free_p: 0.1,
            if_c: 20_000_005.0,
            if_p: 20_000_006.0,
            smooth_if: 20_000_005.5,
            range_rate_l1: Some(1.0),
            range_rate_step_l1: Some(0.1),
            phase_rate_l1: Some(2.0),
            phase_rate_step_l1: Some(0.2),
            range_rate_l2: None,
            range_rate_step_l2: None,
            phase_rate_l2: None,
            phase_rate_step_l2: None,
            valid: true,
            rejection_cause: RejectionCause::None,
            status: true,
        }
    }

    #[test]
    fn writes_one_line_per_observation() {
        let path = temp_path("ppve");
        write_prepro_file(&path, &[vec![sample_prepro()]]).expect("writes");
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(contents.lines().count(), 2); // header + one record
        assert!(contents.contains("G07"));
    }
}
