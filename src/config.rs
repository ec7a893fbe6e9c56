//! Scenario configuration file parsing (§6): one parameter per line,
//! `#` comments, blank lines skipped. Mirrors the `Conf` dictionary of
//! the source tool, but as a closed, typed struct rather than an
//! open-ended string-keyed map.

use std::fmt;
use std::fs;
use std::path::Path;

use hifitime::Epoch;
use leoppp_engine::prepro::{CycleSlipConfig, Threshold};

use crate::error::{AppError, ConfigError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavSolution {
    Gps,
    Gal,
    GpsGal,
}

impl NavSolution {
    pub fn wants_gps(self) -> bool {
        matches!(self, NavSolution::Gps | NavSolution::GpsGal)
    }

    pub fn wants_gal(self) -> bool {
        matches!(self, NavSolution::Gal | NavSolution::GpsGal)
    }
}

impl fmt::Display for NavSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NavSolution::Gps => "GPS",
            NavSolution::Gal => "GAL",
            NavSolution::GpsGal => "GPSGAL",
        };
        write!(f, "{s}")
    }
}

/// Full scenario configuration, §6.
#[derive(Debug, Clone)]
pub struct Config {
    pub ini_date: Epoch,
    pub end_date: Epoch,
    pub sampling_rate: f64,
    pub nav_solution: NavSolution,
    pub prepro_out: bool,
    pub corr_out: bool,
    pub sat_acronym: String,

    pub rcvr_mask: f64,
    pub min_snr: Threshold,
    pub cycle_slips: CycleSlipConfig,
    pub max_psr_outrng: Threshold,
    pub max_code_rate: Threshold,
    pub max_code_rate_step: Threshold,
    pub max_phase_rate: Threshold,
    pub max_phase_rate_step: Threshold,
    pub max_data_gap: Threshold,
    pub hatch_time: f64,
    pub hatch_state_f: f64,

    pub leo_com_pos: [f64; 3],
    pub leo_arp_pos: [f64; 3],
    pub leo_pco_gps: [f64; 3],
    pub leo_pco_gal: [f64; 3],

    pub sat_apo_file: String,
    pub sat_bia_file: String,

    pub gps_uere: f64,
    pub gal_uere: f64,

    pub max_lsq_iter: usize,
    pub pdop_max: f64,
}

/// A single `KEY value value ...` line split into its tokens.
struct Line<'a> {
    key: String,
    tokens: Vec<&'a str>,
}

fn tokenize(contents: &str) -> Vec<Line<'_>> {
    contents
        .lines()
        .filter_map(|raw| {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                return None;
            }
            let mut parts = line.split_whitespace();
            let key = parts.next()?.to_uppercase();
            Some(Line { key, tokens: parts.collect() })
        })
        .collect()
}

fn find<'a, 'b>(lines: &'a [Line<'b>], key: &'static str) -> Result<&'a [&'b str], ConfigError> {
    lines
        .iter()
        .find(|l| l.key == key)
        .map(|l| l.tokens.as_slice())
        .ok_or(ConfigError::MissingParameter { key })
}

fn find_opt<'a, 'b>(lines: &'a [Line<'b>], key: &'static str) -> Option<&'a [&'b str]> {
    lines.iter().find(|l| l.key == key).map(|l| l.tokens.as_slice())
}

fn parse_f64(key: &'static str, token: &str) -> Result<f64, ConfigError> {
    token.parse::<f64>().map_err(|source| ConfigError::ParseFloat { key, source })
}

fn expect_arity(key: &'static str, tokens: &[&str], expected: usize) -> Result<(), ConfigError> {
    if tokens.len() != expected {
        return Err(ConfigError::WrongArity { key, expected, got: tokens.len() });
    }
    Ok(())
}

fn parse_threshold(lines: &[Line], key: &'static str) -> Result<Threshold, ConfigError> {
    let tokens = find(lines, key)?;
    expect_arity(key, tokens, 2)?;
    let enabled = parse_flag(key, tokens[0])?;
    let value = parse_f64(key, tokens[1])?;
    Ok(Threshold { enabled, value })
}

fn parse_flag(key: &'static str, token: &str) -> Result<bool, ConfigError> {
    match token {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(ConfigError::InvalidValue { key, value: other.to_string() }),
    }
}

fn parse_vec3(lines: &[Line], key: &'static str) -> Result<[f64; 3], ConfigError> {
    let tokens = find(lines, key)?;
    expect_arity(key, tokens, 3)?;
    Ok([parse_f64(key, tokens[0])?, parse_f64(key, tokens[1])?, parse_f64(key, tokens[2])?])
}

fn parse_date(key: &'static str, token: &str) -> Result<Epoch, ConfigError> {
    let parts: Vec<&str> = token.split('/').collect();
    if parts.len() != 3 {
        return Err(ConfigError::InvalidDate(format!("{key}: expected DD/MM/YYYY, got {token:?}")));
    }
    let day: u8 = parts[0].parse().map_err(|_| ConfigError::InvalidDate(format!("{key}: bad day in {token:?}")))?;
    let month: u8 = parts[1].parse().map_err(|_| ConfigError::InvalidDate(format!("{key}: bad month in {token:?}")))?;
    let year: i32 = parts[2].parse().map_err(|_| ConfigError::InvalidDate(format!("{key}: bad year in {token:?}")))?;
    Ok(Epoch::from_gregorian_utc_at_midnight(year, month, day))
}

impl Config {
    /// Parses a scenario configuration file. I/O and malformed-parameter
    /// failures are fatal (§7) and reported as an `AppError`.
    pub fn load(path: &Path) -> Result<Config, AppError> {
        let contents = fs::read_to_string(path).map_err(|source| AppError::Io { path: path.to_path_buf(), source })?;
        Self::parse(&contents).map_err(|source| AppError::Config { path: path.to_path_buf(), source })
    }

    fn parse(contents: &str) -> Result<Config, ConfigError> {
        let lines = tokenize(contents);

        let ini_tokens = find(&lines, "INI_DATE")?;
        expect_arity("INI_DATE", ini_tokens, 1)?;
        let end_tokens = find(&lines, "END_DATE")?;
        expect_arity("END_DATE", end_tokens, 1)?;

        let ini_date = parse_date("INI_DATE", ini_tokens[0])?;
        let end_date = parse_date("END_DATE", end_tokens[0])?;
        if end_date < ini_date {
            return Err(ConfigError::OutOfRange { key: "END_DATE", value: 0.0, reason: "END_DATE precedes INI_DATE" });
        }

        let sampling_tokens = find(&lines, "SAMPLING_RATE")?;
        expect_arity("SAMPLING_RATE", sampling_tokens, 1)?;
        let sampling_rate = parse_f64("SAMPLING_RATE", sampling_tokens[0])?;
        if sampling_rate <= 0.0 {
            return Err(ConfigError::OutOfRange { key: "SAMPLING_RATE", value: sampling_rate, reason: "must be positive" });
        }

        let nav_tokens = find(&lines, "NAV_SOLUTION")?;
        expect_arity("NAV_SOLUTION", nav_tokens, 1)?;
        let nav_solution = match nav_tokens[0].to_uppercase().as_str() {
            "GPS" => NavSolution::Gps,
            "GAL" => NavSolution::Gal,
            "GPSGAL" => NavSolution::GpsGal,
            other => return Err(ConfigError::InvalidValue { key: "NAV_SOLUTION", value: other.to_string() }),
        };

        let prepro_out = parse_bool_flag(&lines, "PREPRO_OUT")?;
        let corr_out = parse_bool_flag(&lines, "CORR_OUT")?;

        let acronym_tokens = find(&lines, "SAT_ACRONYM")?;
        expect_arity("SAT_ACRONYM", acronym_tokens, 1)?;
        let sat_acronym = acronym_tokens[0].to_string();

        let mask_tokens = find(&lines, "RCVR_MASK")?;
        expect_arity("RCVR_MASK", mask_tokens, 1)?;
        let rcvr_mask = parse_f64("RCVR_MASK", mask_tokens[0])?;
        if !(0.0..90.0).contains(&rcvr_mask) {
            return Err(ConfigError::OutOfRange { key: "RCVR_MASK", value: rcvr_mask, reason: "expected [0, 90) degrees" });
        }

        let min_snr = parse_threshold(&lines, "MIN_SNR")?;
        let max_psr_outrng = parse_threshold(&lines, "MAX_PSR_OUTRNG")?;
        let max_code_rate = parse_threshold(&lines, "MAX_CODE_RATE")?;
        let max_code_rate_step = parse_threshold(&lines, "MAX_CODE_RATE_STEP")?;
        let max_phase_rate = parse_threshold(&lines, "MAX_PHASE_RATE")?;
        let max_phase_rate_step = parse_threshold(&lines, "MAX_PHASE_RATE_STEP")?;
        let max_data_gap = parse_threshold(&lines, "MAX_DATA_GAP")?;

        let cs_tokens = find(&lines, "CYCLE_SLIPS")?;
        expect_arity("CYCLE_SLIPS", cs_tokens, 5)?;
        let cycle_slips = CycleSlipConfig {
            enabled: parse_flag("CYCLE_SLIPS", cs_tokens[0])?,
            threshold_cycles: parse_f64("CYCLE_SLIPS", cs_tokens[1])?,
            csnepochs: parse_f64("CYCLE_SLIPS", cs_tokens[2])? as usize,
            csnpoints: parse_f64("CYCLE_SLIPS", cs_tokens[3])? as usize,
            cspdegree: parse_f64("CYCLE_SLIPS", cs_tokens[4])? as usize,
        };
        if cycle_slips.csnpoints <= cycle_slips.cspdegree {
            return Err(ConfigError::OutOfRange {
                key: "CYCLE_SLIPS",
                value: cycle_slips.csnpoints as f64,
                reason: "CSNPOINTS must exceed CSPDEGREE for the polynomial fit to be well posed",
            });
        }

        let hatch_time_tokens = find(&lines, "HATCH_TIME")?;
        expect_arity("HATCH_TIME", hatch_time_tokens, 1)?;
        let hatch_time = parse_f64("HATCH_TIME", hatch_time_tokens[0])?;

        let hatch_state_f_tokens = find(&lines, "HATCH_STATE_F")?;
        expect_arity("HATCH_STATE_F", hatch_state_f_tokens, 1)?;
        let hatch_state_f = parse_f64("HATCH_STATE_F", hatch_state_f_tokens[0])?;

        let leo_com_pos = parse_vec3(&lines, "LEO_COM_POS")?;
        let leo_arp_pos = parse_vec3(&lines, "LEO_ARP_POS")?;
        let leo_pco_gps = parse_vec3(&lines, "LEO_PCO_GPS")?;
        let leo_pco_gal = parse_vec3(&lines, "LEO_PCO_GAL")?;

        let sat_apo_tokens = find(&lines, "SAT_APO_FILE")?;
        expect_arity("SAT_APO_FILE", sat_apo_tokens, 1)?;
        let sat_apo_file = sat_apo_tokens[0].to_string();

        let sat_bia_tokens = find(&lines, "SAT_BIA_FILE")?;
        expect_arity("SAT_BIA_FILE", sat_bia_tokens, 1)?;
        let sat_bia_file = sat_bia_tokens[0].to_string();

        let gps_uere_tokens = find(&lines, "GPS_UERE")?;
        expect_arity("GPS_UERE", gps_uere_tokens, 1)?;
        let gps_uere = parse_f64("GPS_UERE", gps_uere_tokens[0])?;

        let gal_uere_tokens = find(&lines, "GAL_UERE")?;
        expect_arity("GAL_UERE", gal_uere_tokens, 1)?;
        let gal_uere = parse_f64("GAL_UERE", gal_uere_tokens[0])?;

        // Downstream navigation-solution limits: threaded through per §6,
        // even though the estimator itself is out of scope (§1).
        let max_lsq_iter = match find_opt(&lines, "MAX_LSQ_ITER") {
            Some(tokens) => {
                expect_arity("MAX_LSQ_ITER", tokens, 1)?;
                parse_f64("MAX_LSQ_ITER", tokens[0])? as usize
            }
            None => 10,
        };
        let pdop_max = match find_opt(&lines, "PDOP_MAX") {
            Some(tokens) => {
                expect_arity("PDOP_MAX", tokens, 1)?;
                parse_f64("PDOP_MAX", tokens[0])?
            }
            None => 6.0,
        };

        Ok(Config {
            ini_date,
            end_date,
            sampling_rate,
            nav_solution,
            prepro_out,
            corr_out,
            sat_acronym,
            rcvr_mask,
            min_snr,
            cycle_slips,
            max_psr_outrng,
            max_code_rate,
            max_code_rate_step,
            max_phase_rate,
            max_phase_rate_step,
            max_data_gap,
            hatch_time,
            hatch_state_f,
            leo_com_pos,
            leo_arp_pos,
            leo_pco_gps,
            leo_pco_gal,
            sat_apo_file,
            sat_bia_file,
            gps_uere,
            gal_uere,
            max_lsq_iter,
            pdop_max,
        })
    }
}

fn parse_bool_flag(lines: &[Line], key: &'static str) -> Result<bool, ConfigError> {
    let tokens = find(lines, key)?;
    expect_arity(key, tokens, 1)?;
    parse_flag(key, tokens[0])
}
