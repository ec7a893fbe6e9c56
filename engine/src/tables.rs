//! Static per-day ephemeris and bias tables, and the uniform accessors
//! (§4.3) used to look them up by time and by satellite.
//!
//! Tables are loaded once per day by the outer I/O layer and handed to
//! the correction engine as plain read-only slices; accessors here never
//! return a reference that could alias a caller's mutable state, only
//! owned copies of the (small, `Copy`) row types.

use crate::types::Sv;

/// One row of the LEO receiver CoM position table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeoPosRow {
    pub sod: f64,
    pub doy: u16,
    pub year: u16,
    pub x_cm: f64,
    pub y_cm: f64,
    pub z_cm: f64,
}

/// One row of the LEO body-attitude quaternion table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeoQuatRow {
    pub sod: f64,
    pub q0: f64,
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
}

/// One row of the precise satellite position (SP3-derived) table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatPosRow {
    pub sod: f64,
    pub doy: u16,
    pub year: u16,
    pub sv: Sv,
    pub x_cm: f64,
    pub y_cm: f64,
    pub z_cm: f64,
}

/// One row of the precise satellite clock bias table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatClkRow {
    pub sod: f64,
    pub sv: Sv,
    pub clk_bias: f64,
}

/// Per-satellite antenna phase offsets (body frame), one row per SV.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatApoRow {
    pub sv: Sv,
    /// Offset for frequency 1, metres, body frame (x, y, z).
    pub f1: [f64; 3],
    /// Offset for frequency 2, metres, body frame (x, y, z).
    pub f2: [f64; 3],
}

/// Per-satellite code/phase biases for both the clock and the observation
/// reference, one row per SV.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatBiaRow {
    pub sv: Sv,
    pub clk_f1_c: f64,
    pub clk_f2_c: f64,
    pub obs_f1_c: f64,
    pub obs_f2_c: f64,
    pub clk_f1_p: f64,
    pub clk_f2_p: f64,
    pub obs_f1_p: f64,
    pub obs_f2_p: f64,
}

/// Exact match on SOD. Returns the first row found, or `None`.
pub fn find_by_sod<T: Copy>(rows: &[T], sod_of: impl Fn(&T) -> f64, sod: f64) -> Option<T> {
    rows.iter().copied().find(|r| sod_of(r) == sod)
}

/// Filters a slice of satellite-tagged rows down to one SV, preserving order.
pub fn filter_by_sv<T: Copy>(rows: &[T], sv_of: impl Fn(&T) -> Sv, sv: Sv) -> Vec<T> {
    rows.iter().copied().filter(|r| sv_of(r) == sv).collect()
}

/// Nearest row with `sod_of(row) < target`, by largest SOD below target.
pub fn nearest_below<T: Copy>(rows: &[T], sod_of: impl Fn(&T) -> f64, target: f64) -> Option<T> {
    rows.iter()
        .copied()
        .filter(|r| sod_of(r) < target)
        .max_by(|a, b| sod_of(a).partial_cmp(&sod_of(b)).unwrap())
}

/// Nearest row with `sod_of(row) > target`, by smallest SOD above target.
pub fn nearest_above<T: Copy>(rows: &[T], sod_of: impl Fn(&T) -> f64, target: f64) -> Option<T> {
    rows.iter()
        .copied()
        .filter(|r| sod_of(r) > target)
        .min_by(|a, b| sod_of(a).partial_cmp(&sod_of(b)).unwrap())
}

impl LeoPosRow {
    pub fn position(self) -> [f64; 3] {
        [self.x_cm, self.y_cm, self.z_cm]
    }
}

impl SatPosRow {
    pub fn position(self) -> [f64; 3] {
        [self.x_cm, self.y_cm, self.z_cm]
    }
}

/// Looks up the unique LEO CoM position row for `sod`. Returns `None`
/// (rather than a zero/NaN position) if no exact row exists, leaving it
/// to the caller to flag the epoch as unresolvable, per §7's
/// per-satellite partial-failure semantics.
pub fn leo_com_pos(rows: &[LeoPosRow], sod: f64) -> Option<[f64; 3]> {
    find_by_sod(rows, |r| r.sod, sod).map(LeoPosRow::position)
}

/// Looks up the body-attitude quaternion for `sod`.
pub fn leo_quat(rows: &[LeoQuatRow], sod: f64) -> Option<(f64, f64, f64, f64)> {
    find_by_sod(rows, |r| r.sod, sod).map(|r| (r.q0, r.q1, r.q2, r.q3))
}

/// Satellite clock bias at `sod`: exact lookup if present, otherwise
/// linear interpolation between the nearest bracketing rows for this SV.
pub fn sat_clk_bias(rows: &[SatClkRow], sv: Sv, sod: f64) -> Option<f64> {
    let rows = filter_by_sv(rows, |r| r.sv, sv);
    if rows.is_empty() {
        return None;
    }
    if let Some(exact) = find_by_sod(&rows, |r| r.sod, sod) {
        return Some(exact.clk_bias);
    }
    let below = nearest_below(&rows, |r| r.sod, sod)?;
    let above = nearest_above(&rows, |r| r.sod, sod)?;
    let slope = (above.clk_bias - below.clk_bias) / (above.sod - below.sod);
    Some(slope * (sod - below.sod) + below.clk_bias)
}

/// Satellite antenna phase offset row for a given SV.
pub fn sat_apo(rows: &[SatApoRow], sv: Sv) -> Option<SatApoRow> {
    rows.iter().copied().find(|r| r.sv == sv)
}

/// Satellite code/phase bias row for a given SV.
pub fn sat_bia(rows: &[SatBiaRow], sv: Sv) -> Option<SatBiaRow> {
    rows.iter().copied().find(|r| r.sv == sv)
}

/// Selects a window of satellite position rows straddling `target_sod`
/// for a given SV: up to `half_window` rows at or before the target and
/// up to `half_window` rows strictly after, clamped at the ends of the
/// per-SV series. This replaces the source tool's `argsort`-on-absolute-
/// difference window selection, which does not guarantee the window
/// straddles the target (see `DESIGN.md`).
pub fn sat_pos_window(rows: &[SatPosRow], sv: Sv, target_sod: f64, half_window: usize) -> Vec<SatPosRow> {
    let mut series = filter_by_sv(rows, |r| r.sv, sv);
    series.sort_by(|a, b| a.sod.partial_cmp(&b.sod).unwrap());

    let split = series.partition_point(|r| r.sod <= target_sod);
    let before_start = split.saturating_sub(half_window);
    let mut window: Vec<SatPosRow> = series[before_start..split].to_vec();

    let after_end = (split + half_window).min(series.len());
    window.extend_from_slice(&series[split..after_end]);

    // Pad at file boundaries by extending from whichever side still has
    // samples available, keeping the window as close to `2 * half_window`
    // as the series allows.
    let target_len = 2 * half_window;
    if window.len() < target_len {
        let short_before = before_start == 0 && split.saturating_sub(before_start) < half_window;
        if short_before && after_end < series.len() {
            let extra = (target_len - window.len()).min(series.len() - after_end);
            window.extend_from_slice(&series[after_end..after_end + extra]);
        } else if before_start > 0 {
            let extra = (target_len - window.len()).min(before_start);
            let mut head = series[before_start - extra..before_start].to_vec();
            head.extend(window);
            window = head;
        }
    }

    window
}
