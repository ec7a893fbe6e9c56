//! File I/O: the "external collaborators" of spec.md §1/§6 that this
//! expanded, ambient-stack-complete crate must still give a concrete
//! body to. Everything here is intentionally thin — whitespace-delimited
//! text in, typed rows out — so the numerically interesting code stays
//! in `leoppp-engine`.

pub mod obs;
pub mod output;
pub mod tables;

use std::path::{Path, PathBuf};

/// Builds the conventional per-day input/output file paths for a scenario
/// rooted at `root`, for the given acronym/year/day-of-year. Filenames
/// encode `{acronym}_{year}{doy:03}` so a day's whole file set sorts and
/// greps together; static per-scenario tables (`SAT_APO_FILE`,
/// `SAT_BIA_FILE`) are named directly by the configuration instead.
pub struct ScenarioPaths {
    pub obs: PathBuf,
    pub leo_pos: PathBuf,
    pub sat_pos: PathBuf,
    pub leo_quat: PathBuf,
    pub sat_clk: PathBuf,
    pub prepro_out: PathBuf,
    pub corr_out: PathBuf,
}

pub fn scenario_paths(root: &Path, acronym: &str, year: i32, doy: u32) -> ScenarioPaths {
    let stem = format!("{acronym}_{year}{doy:03}");
    let day_stem = format!("{year}{doy:03}");
    ScenarioPaths {
        obs: root.join("INP/OBS").join(format!("{stem}.obs")),
        leo_pos: root.join("INP/SP3").join(format!("{stem}.leopos")),
        sat_pos: root.join("INP/SP3").join(format!("{day_stem}.sp3")),
        leo_quat: root.join("INP/ATT").join(format!("{stem}.att")),
        sat_clk: root.join("INP/CLK").join(format!("{day_stem}.clk")),
        prepro_out: root.join("OUT/PPVE").join(format!("{stem}.ppve")),
        corr_out: root.join("OUT/CORR").join(format!("{stem}.corr")),
    }
}

/// Splits a file into non-comment, non-blank data lines, each already
/// `#`-stripped and trimmed.
pub(crate) fn data_lines(contents: &str) -> impl Iterator<Item = &str> {
    contents.lines().filter_map(|raw| {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            None
        } else {
            Some(line)
        }
    })
}
