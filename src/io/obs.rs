//! OBS epoch reader (§6 "Input files"): parses the whitespace-delimited
//! observation file into per-epoch `CodeObs`/`PhaseObs` sequences.
//!
//! File layout, one line per satellite per epoch:
//! `SOD CONST PRN ELEV AZIM C1 C2 L1 L2 S1 S2`
//! (`CONST` is the single-letter constellation code, `G` or `E`.)

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use leoppp_engine::{CodeObs, Constellation, PhaseObs, Sv};

use crate::error::AppError;
use crate::io::data_lines;

/// One epoch's worth of parallel code/phase observation sequences, in
/// the order they appeared in the file (§5 ordering guarantee).
#[derive(Debug, Clone, Default)]
pub struct ObsEpoch {
    pub sod: f64,
    pub codes: Vec<CodeObs>,
    pub phases: Vec<PhaseObs>,
}

/// Reads a whole day's OBS file and groups its rows by second-of-day.
/// Epochs are returned in increasing SOD order, matching the ordering
/// guarantee of §5.
pub fn read_obs_file(path: &Path) -> Result<Vec<ObsEpoch>, AppError> {
    let contents = fs::read_to_string(path).map_err(|source| AppError::Io { path: path.to_path_buf(), source })?;

    let mut epochs: BTreeMap<u64, ObsEpoch> = BTreeMap::new();

    for (idx, line) in data_lines(&contents).enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 11 {
            return Err(AppError::MalformedRecord {
                path: path.to_path_buf(),
                line: idx + 1,
                reason: format!("expected 11 fields, got {}", fields.len()),
            });
        }

        let parse_f64 = |s: &str| -> Result<f64, AppError> {
            s.parse().map_err(|_| AppError::MalformedRecord {
                path: path.to_path_buf(),
                line: idx + 1,
                reason: format!("not a number: {s:?}"),
            })
        };

        let sod = parse_f64(fields[0])?;
        let constellation_code = fields[1].chars().next().ok_or_else(|| AppError::MalformedRecord {
            path: path.to_path_buf(),
            line: idx + 1,
            reason: "empty constellation code".to_string(),
        })?;
        let constellation = Constellation::from_code(constellation_code).ok_or_else(|| AppError::MalformedRecord {
            path: path.to_path_buf(),
            line: idx + 1,
            reason: format!("unknown constellation code {constellation_code:?}"),
        })?;
        let prn: u8 = fields[2].parse().map_err(|_| AppError::MalformedRecord {
            path: path.to_path_buf(),
            line: idx + 1,
            reason: format!("bad PRN {:?}", fields[2]),
        })?;
        let sv = Sv::try_new(constellation, prn)?;

        let elevation = parse_f64(fields[3])?;
        let azimuth = parse_f64(fields[4])?;
        let c1 = parse_f64(fields[5])?;
        let c2 = parse_f64(fields[6])?;
        let l1 = parse_f64(fields[7])?;
        let l2 = parse_f64(fields[8])?;
        let s1 = parse_f64(fields[9])?;
        let s2 = parse_f64(fields[10])?;

        let epoch = epochs.entry(sod.round() as u64).or_insert_with(|| ObsEpoch { sod, ..Default::default() });
        epoch.codes.push(CodeObs { sod, sv, elevation, azimuth, c1, c2, s1, s2 });
        epoch.phases.push(PhaseObs { sod, sv, l1, l2 });
    }

    Ok(epochs.into_values().collect())
}
