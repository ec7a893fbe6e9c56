//! Static ephemeris/bias table file parsing (§6 "Input files"). Each
//! function reads one whitespace-delimited text table (`#`-prefixed
//! header, one row per line) into the corresponding owned row type from
//! `leoppp_engine::correction`'s table module.
//!
//! Column layouts, one file per table (CONST is the single-letter
//! constellation code):
//! - LeoPos:  `SOD DOY YEAR X_CM Y_CM Z_CM`
//! - LeoQuat: `SOD Q0 Q1 Q2 Q3`
//! - SatPos:  `SOD DOY YEAR CONST PRN X_CM Y_CM Z_CM`
//! - SatClk:  `SOD CONST PRN CLK_BIAS`   (parsed at full `f64` precision)
//! - SatApo:  `CONST PRN F1X F1Y F1Z F2X F2Y F2Z`
//! - SatBia:  `CONST PRN CLK_F1_C CLK_F2_C OBS_F1_C OBS_F2_C CLK_F1_P CLK_F2_P OBS_F1_P OBS_F2_P`

use std::fs;
use std::path::Path;

use leoppp_engine::tables::{LeoPosRow, LeoQuatRow, SatApoRow, SatBiaRow, SatClkRow, SatPosRow};
use leoppp_engine::{Constellation, Sv};

use crate::error::AppError;
use crate::io::data_lines;

fn malformed(path: &Path, line: usize, reason: impl Into<String>) -> AppError {
    AppError::MalformedRecord { path: path.to_path_buf(), line, reason: reason.into() }
}

fn parse_f64(path: &Path, line: usize, token: &str) -> Result<f64, AppError> {
    // Parsed directly into `f64` with no intermediate textual rounding,
    // per the Design Notes' warning about truncating the clock-bias
    // mantissa: `str::parse::<f64>` reads the full decimal representation.
    token.parse::<f64>().map_err(|_| malformed(path, line, format!("not a number: {token:?}")))
}

fn parse_sv(path: &Path, line: usize, const_tok: &str, prn_tok: &str) -> Result<Sv, AppError> {
    let code = const_tok.chars().next().ok_or_else(|| malformed(path, line, "empty constellation code"))?;
    let constellation =
        Constellation::from_code(code).ok_or_else(|| malformed(path, line, format!("unknown constellation {code:?}")))?;
    let prn: u8 = prn_tok.parse().map_err(|_| malformed(path, line, format!("bad PRN {prn_tok:?}")))?;
    Ok(Sv::try_new(constellation, prn)?)
}

fn read_rows<T>(path: &Path, expected_fields: usize, mut row_of: impl FnMut(&[&str]) -> Result<T, AppError>) -> Result<Vec<T>, AppError> {
    let contents = fs::read_to_string(path).map_err(|source| AppError::Io { path: path.to_path_buf(), source })?;
    let mut rows = Vec::new();
    for (idx, line) in data_lines(&contents).enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != expected_fields {
            return Err(malformed(path, idx + 1, format!("expected {expected_fields} fields, got {}", fields.len())));
        }
        rows.push(row_of(&fields)?);
    }
    Ok(rows)
}

pub fn read_leo_pos(path: &Path) -> Result<Vec<LeoPosRow>, AppError> {
    read_rows(path, 6, |f| {
        Ok(LeoPosRow {
            sod: parse_f64(path, 0, f[0])?,
            doy: f[1].parse().map_err(|_| malformed(path, 0, format!("bad DOY {:?}", f[1])))?,
            year: f[2].parse().map_err(|_| malformed(path, 0, format!("bad YEAR {:?}", f[2])))?,
            x_cm: parse_f64(path, 0, f[3])?,
            y_cm: parse_f64(path, 0, f[4])?,
            z_cm: parse_f64(path, 0, f[5])?,
        })
    })
}

pub fn read_leo_quat(path: &Path) -> Result<Vec<LeoQuatRow>, AppError> {
    read_rows(path, 5, |f| {
        Ok(LeoQuatRow {
            sod: parse_f64(path, 0, f[0])?,
            q0: parse_f64(path, 0, f[1])?,
            q1: parse_f64(path, 0, f[2])?,
            q2: parse_f64(path, 0, f[3])?,
            q3: parse_f64(path, 0, f[4])?,
        })
    })
}

pub fn read_sat_pos(path: &Path) -> Result<Vec<SatPosRow>, AppError> {
    read_rows(path, 8, |f| {
        Ok(SatPosRow {
            sod: parse_f64(path, 0, f[0])?,
            doy: f[1].parse().map_err(|_| malformed(path, 0, format!("bad DOY {:?}", f[1])))?,
            year: f[2].parse().map_err(|_| malformed(path, 0, format!("bad YEAR {:?}", f[2])))?,
            sv: parse_sv(path, 0, f[3], f[4])?,
            x_cm: parse_f64(path, 0, f[5])?,
            y_cm: parse_f64(path, 0, f[6])?,
            z_cm: parse_f64(path, 0, f[7])?,
        })
    })
}

pub fn read_sat_clk(path: &Path) -> Result<Vec<SatClkRow>, AppError> {
    read_rows(path, 4, |f| {
        Ok(SatClkRow { sod: parse_f64(path, 0, f[0])?, sv: parse_sv(path, 0, f[1], f[2])?, clk_bias: parse_f64(path, 0, f[3])? })
    })
}

pub fn read_sat_apo(path: &Path) -> Result<Vec<SatApoRow>, AppError> {
    read_rows(path, 8, |f| {
        Ok(SatApoRow {
            sv: parse_sv(path, 0, f[0], f[1])?,
            f1: [parse_f64(path, 0, f[2])?, parse_f64(path, 0, f[3])?, parse_f64(path, 0, f[4])?],
            f2: [parse_f64(path, 0, f[5])?, parse_f64(path, 0, f[6])?, parse_f64(path, 0, f[7])?],
        })
    })
}

pub fn read_sat_bia(path: &Path) -> Result<Vec<SatBiaRow>, AppError> {
    read_rows(path, 10, |f| {
        Ok(SatBiaRow {
            sv: parse_sv(path, 0, f[0], f[1])?,
            clk_f1_c: parse_f64(path, 0, f[2])?,
            clk_f2_c: parse_f64(path, 0, f[3])?,
            obs_f1_c: parse_f64(path, 0, f[4])?,
            obs_f2_c: parse_f64(path, 0, f[5])?,
            clk_f1_p: parse_f64(path, 0, f[6])?,
            clk_f2_p: parse_f64(path, 0, f[7])?,
            obs_f1_p: parse_f64(path, 0, f[8])?,
            obs_f2_p: parse_f64(path, 0, f[9])?,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static UNIQUE: AtomicU64 = AtomicU64::new(0);

    fn write_temp_file(suffix: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir()
            .join(format!("leoppp-tables-test-{}-{}.{}", std::process::id(), UNIQUE.fetch_add(1, Ordering::Relaxed), suffix));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn reads_sat_clk_at_full_precision() {
        let path = write_temp_file("clk", "# SOD CONST PRN CLK_BIAS\n100 G 3 1.234567890123456e-4\n");
        let rows = read_sat_clk(&path).expect("parses");
        std::fs::remove_file(&path).ok();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].clk_bias - 1.234567890123456e-4).abs() < 1e-20);
    }

    #[test]
    fn rejects_wrong_field_count() {
        let path = write_temp_file("clk", "# SOD CONST PRN CLK_BIAS\n100 G 3\n");
        let err = read_sat_clk(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, AppError::MalformedRecord { .. }));
    }
}
