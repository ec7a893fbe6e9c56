//! Day/epoch orchestration loop (§1, out of scope for the core engine
//! but required for a runnable tool): walks the configured date range,
//! loads each day's static tables, drives the preprocessor and
//! correction engine over every epoch, and writes the configured output
//! files.

use hifitime::{TimeSeries, Unit};

use leoppp_engine::correction::CorrConfig;
use leoppp_engine::prepro::PreproConfig;
use leoppp_engine::tables::{SatApoRow, SatBiaRow};
use leoppp_engine::types::{CorrStateTable, CorrectedMeas, PreproObs, PreproStateTable};
use leoppp_engine::{correct_epoch, preprocess_epoch};

use crate::config::Config;
use crate::error::AppError;
use crate::io::{obs, output, scenario_paths, tables};

fn prepro_config(config: &Config) -> PreproConfig {
    PreproConfig {
        rcvr_mask_deg: config.rcvr_mask,
        min_snr: config.min_snr,
        max_psr_outrng: config.max_psr_outrng,
        max_code_rate: config.max_code_rate,
        max_code_rate_step: config.max_code_rate_step,
        max_phase_rate: config.max_phase_rate,
        max_phase_rate_step: config.max_phase_rate_step,
        max_data_gap: config.max_data_gap,
        cycle_slips: config.cycle_slips,
        hatch_time: config.hatch_time,
        hatch_state_f: config.hatch_state_f,
    }
}

fn corr_config(config: &Config) -> CorrConfig {
    CorrConfig {
        leo_com: config.leo_com_pos,
        leo_arp: config.leo_arp_pos,
        leo_pco_gps: config.leo_pco_gps,
        leo_pco_gal: config.leo_pco_gal,
        gps_uere: config.gps_uere,
        gal_uere: config.gal_uere,
    }
}

/// Runs the whole scenario: every day in `[INI_DATE, END_DATE]`,
/// inclusive (§6). A missing or malformed input file aborts only the
/// current day (§7); all other days are still attempted.
pub fn run_scenario(root: &std::path::Path, config: &Config) -> Result<(), AppError> {
    let sat_apo_rows = tables::read_sat_apo(&root.join("INP/ATX").join(&config.sat_apo_file))?;
    let sat_bia_rows = tables::read_sat_bia(&root.join("INP/BIA").join(&config.sat_bia_file))?;

    let days = TimeSeries::inclusive(config.ini_date, config.end_date, 1 * Unit::Day);
    let mut failures = 0usize;

    for day in days {
        let year = day.year();
        let doy = day.day_of_year().floor() as u32;

        match run_day(root, config, year, doy, &sat_apo_rows, &sat_bia_rows) {
            Ok(()) => log::info!("day {year}/{doy:03}: processed"),
            Err(err) => {
                log::error!("day {year}/{doy:03}: {err}, skipping");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        log::warn!("{failures} day(s) failed during this run; see preceding errors");
    }
    Ok(())
}

fn run_day(
    root: &std::path::Path,
    config: &Config,
    year: i32,
    doy: u32,
    sat_apo_rows: &[SatApoRow],
    sat_bia_rows: &[SatBiaRow],
) -> Result<(), AppError> {
    let paths = scenario_paths(root, &config.sat_acronym, year, doy);

    let obs_epochs = obs::read_obs_file(&paths.obs)?;
    let leo_pos_rows = tables::read_leo_pos(&paths.leo_pos)?;
    let leo_quat_rows = tables::read_leo_quat(&paths.leo_quat)?;
    let sat_pos_rows = tables::read_sat_pos(&paths.sat_pos)?;
    let sat_clk_rows = tables::read_sat_clk(&paths.sat_clk)?;

    let prepro_cfg = prepro_config(config);
    let corr_cfg = corr_config(config);

    let mut prepro_state = PreproStateTable::new();
    let mut corr_state = CorrStateTable::new();

    let mut prepro_out: Vec<Vec<PreproObs>> = Vec::new();
    let mut corr_out: Vec<Vec<CorrectedMeas>> = Vec::new();

    for epoch in &obs_epochs {
        let codes: Vec<_> = epoch
            .codes
            .iter()
            .copied()
            .filter(|c| wants_constellation(config, c.sv.constellation))
            .collect();
        let phases: Vec<_> = epoch
            .phases
            .iter()
            .copied()
            .filter(|p| wants_constellation(config, p.sv.constellation))
            .collect();

        let prepro = preprocess_epoch(&prepro_cfg, &codes, &phases, &mut prepro_state);

        // SAMPLING_RATE gates which epochs the correction engine runs
        // on; the preprocessor itself still sees every epoch so its
        // rate/Hatch state stays continuous (§6).
        let runs_correction = is_sampling_epoch(epoch.sod, config.sampling_rate);

        if runs_correction {
            let corrected = correct_epoch(
                &corr_cfg,
                year,
                doy as i32,
                &prepro,
                &leo_pos_rows,
                &leo_quat_rows,
                &sat_pos_rows,
                &sat_clk_rows,
                sat_apo_rows,
                sat_bia_rows,
                &mut corr_state,
            );
            if config.corr_out {
                corr_out.push(corrected);
            }
        }

        if config.prepro_out {
            prepro_out.push(prepro);
        }
    }

    if config.prepro_out {
        output::write_prepro_file(&paths.prepro_out, &prepro_out)?;
    }
    if config.corr_out {
        output::write_corr_file(&paths.corr_out, &corr_out)?;
    }

    Ok(())
}

fn wants_constellation(config: &Config, constellation: leoppp_engine::Constellation) -> bool {
    match constellation {
        leoppp_engine::Constellation::Gps => config.nav_solution.wants_gps(),
        leoppp_engine::Constellation::Galileo => config.nav_solution.wants_gal(),
    }
}

/// Whether `sod` falls on a `sampling_rate`-second boundary, tolerant of
/// the float rounding that second-of-day arithmetic accumulates over a
/// day.
fn is_sampling_epoch(sod: f64, sampling_rate: f64) -> bool {
    if sampling_rate <= 0.0 {
        return true;
    }
    let remainder = sod % sampling_rate;
    remainder < 1e-6 || (sampling_rate - remainder) < 1e-6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_epoch_boundary() {
        assert!(is_sampling_epoch(0.0, 30.0));
        assert!(is_sampling_epoch(30.0, 30.0));
        assert!(!is_sampling_epoch(15.0, 30.0));
        assert!(is_sampling_epoch(5.0, 1.0));
    }
}
