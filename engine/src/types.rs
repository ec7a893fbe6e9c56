//! Core data model: observation records, per-satellite persistent state,
//! and the per-epoch output records produced by the preprocessor and the
//! correction engine.

use crate::constants::{
    gal_gamma_e1e5a, gps_gamma_l1l2, GAL_E1_WAVE, GAL_E5A_WAVE, GPS_L1_WAVE, GPS_L2_WAVE,
    MAX_NUM_SATS_CONSTEL, NUM_CONSTELLATIONS,
};

/// The two constellations this tool observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constellation {
    Gps,
    Galileo,
}

impl Constellation {
    /// Array index into the fixed per-constellation state table.
    pub fn index(self) -> usize {
        match self {
            Constellation::Gps => 0,
            Constellation::Galileo => 1,
        }
    }

    /// Single-letter code used by the source tool's satellite labels
    /// ("G01", "E27", ...) and carried into output file columns.
    pub fn code(self) -> char {
        match self {
            Constellation::Gps => 'G',
            Constellation::Galileo => 'E',
        }
    }

    pub fn from_code(c: char) -> Option<Self> {
        match c {
            'G' => Some(Constellation::Gps),
            'E' => Some(Constellation::Galileo),
            _ => None,
        }
    }

    /// F1/F2 wavelengths in metres for this constellation's dual-frequency pair.
    pub fn wavelengths(self) -> (f64, f64) {
        match self {
            Constellation::Gps => (GPS_L1_WAVE, GPS_L2_WAVE),
            Constellation::Galileo => (GAL_E1_WAVE, GAL_E5A_WAVE),
        }
    }

    /// gamma = (f1/f2)^2 for this constellation's iono-free combination.
    pub fn gamma(self) -> f64 {
        match self {
            Constellation::Gps => gps_gamma_l1l2(),
            Constellation::Galileo => gal_gamma_e1e5a(),
        }
    }
}

/// A satellite identifier: constellation + PRN (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sv {
    pub constellation: Constellation,
    pub prn: u8,
}

impl Sv {
    pub fn new(constellation: Constellation, prn: u8) -> Self {
        Self { constellation, prn }
    }

    /// Validated constructor: rejects PRNs outside `1..=MAX_NUM_SATS_CONSTEL`,
    /// the range the fixed-size state tables are sized for. Used at the I/O
    /// boundary when parsing satellite labels from input files.
    pub fn try_new(constellation: Constellation, prn: u8) -> crate::error::Result<Self> {
        if prn == 0 || prn as usize > MAX_NUM_SATS_CONSTEL {
            return Err(crate::error::Error::PrnOutOfRange { prn, max: MAX_NUM_SATS_CONSTEL });
        }
        Ok(Self { constellation, prn })
    }

    /// Index into the fixed `[constellation][prn-1]` state arrays.
    pub(crate) fn table_index(self) -> (usize, usize) {
        (self.constellation.index(), (self.prn - 1) as usize)
    }
}

/// One satellite's code (pseudorange) observation for an epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodeObs {
    pub sod: f64,
    pub sv: Sv,
    pub elevation: f64,
    pub azimuth: f64,
    pub c1: f64,
    pub c2: f64,
    pub s1: f64,
    pub s2: f64,
}

/// One satellite's carrier-phase observation for an epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseObs {
    pub sod: f64,
    pub sv: Sv,
    pub l1: f64,
    pub l2: f64,
}

/// Rejection cause reported by the preprocessor; numeric values match the
/// source tool's `REJECTION_CAUSE` table so output files preserve the same
/// code-to-meaning mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RejectionCause {
    #[default]
    None = 0,
    MaskAngle = 1,
    DataGap = 2,
    MinSnrF1 = 3,
    MinSnrF2 = 4,
    MaxPsrOutrngF1 = 5,
    MaxPsrOutrngF2 = 6,
    MaxPhaseRateF1 = 7,
    MaxPhaseRateF2 = 8,
    MaxPhaseRateStepF1 = 9,
    MaxPhaseRateStepF2 = 10,
    MaxCodeRateF1 = 11,
    MaxCodeRateF2 = 12,
    MaxCodeRateStepF1 = 13,
    MaxCodeRateStepF2 = 14,
    CycleSlip = 15,
}

impl RejectionCause {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Per-satellite, per-epoch output of the preprocessor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreproObs {
    pub sod: f64,
    pub sv: Sv,
    pub elevation: f64,
    pub azimuth: f64,

    pub c1: f64,
    pub c2: f64,
    pub l1: f64,
    pub l2: f64,
    pub l1_meters: f64,
    pub l2_meters: f64,
    pub s1: f64,
    pub s2: f64,

    pub geom_free_p: f64,
    pub if_c: f64,
    pub if_p: f64,
    pub smooth_if: f64,

    pub range_rate_l1: Option<f64>,
    pub range_rate_step_l1: Option<f64>,
    pub phase_rate_l1: Option<f64>,
    pub phase_rate_step_l1: Option<f64>,

    pub range_rate_l2: Option<f64>,
    pub range_rate_step_l2: Option<f64>,
    pub phase_rate_l2: Option<f64>,
    pub phase_rate_step_l2: Option<f64>,

    pub valid: bool,
    pub rejection_cause: RejectionCause,
    pub status: bool,
}

/// Per-(constellation, PRN) persistent preprocessor state.
///
/// `GF_L_Prev`/`GF_Epoch_Prev` and `CycleSlipFlags` are runtime-sized
/// (their capacity is driven by `CSNPOINTS`/`CSNEPOCHS` from
/// configuration) but the enclosing state table is a fixed-size array,
/// per the source's "redesign flag" recommendation: no hashing of
/// satellite labels on the per-epoch hot path.
#[derive(Debug, Clone)]
pub struct PrevPreproState {
    pub prev_epoch: f64,

    pub prev_c1: Option<f64>,
    pub prev_c2: Option<f64>,
    pub prev_l1: Option<f64>,
    pub prev_l2: Option<f64>,
    pub prev_range_rate_l1: Option<f64>,
    pub prev_range_rate_l2: Option<f64>,
    pub prev_phase_rate_l1: Option<f64>,
    pub prev_phase_rate_l2: Option<f64>,

    pub ksmooth: f64,
    pub prev_smooth: f64,
    pub if_p_prev: f64,
    pub prealign_offset: f64,
    pub reset_hatch_filter: bool,

    pub gf_l_prev: Vec<f64>,
    pub gf_epoch_prev: Vec<f64>,
    pub cycle_slip_buff_idx: usize,
    pub cycle_slip_flags: Vec<bool>,
    pub cycle_slip_flag_idx: usize,
    pub cycle_slip_detect_flag: bool,
}

impl PrevPreproState {
    pub fn new() -> Self {
        Self {
            // Forces a data-gap reset on the very first sample of the day,
            // matching the source tool's `PrevEpoch = 86400` sentinel.
            prev_epoch: 86_400.0,

            prev_c1: None,
            prev_c2: None,
            prev_l1: None,
            prev_l2: None,
            prev_range_rate_l1: None,
            prev_range_rate_l2: None,
            prev_phase_rate_l1: None,
            prev_phase_rate_l2: None,

            ksmooth: 0.0,
            prev_smooth: 0.0,
            if_p_prev: 0.0,
            prealign_offset: 0.0,
            reset_hatch_filter: true,

            gf_l_prev: Vec::new(),
            gf_epoch_prev: Vec::new(),
            cycle_slip_buff_idx: 0,
            cycle_slip_flags: Vec::new(),
            cycle_slip_flag_idx: 0,
            cycle_slip_detect_flag: false,
        }
    }

    /// Drop all rate-dependent "Prev*" fields back to "no predecessor",
    /// as required after a confirmed data gap or cycle slip.
    pub(crate) fn reset_rates(&mut self) {
        self.prev_c1 = None;
        self.prev_c2 = None;
        self.prev_l1 = None;
        self.prev_l2 = None;
        self.prev_range_rate_l1 = None;
        self.prev_range_rate_l2 = None;
        self.prev_phase_rate_l1 = None;
        self.prev_phase_rate_l2 = None;
    }

    /// Clear the cycle-slip detection buffers (does not touch the Hatch state).
    pub(crate) fn reset_cycle_slip_buffers(&mut self, csnpoints: usize, csnepochs: usize) {
        self.gf_l_prev = Vec::with_capacity(csnpoints);
        self.gf_epoch_prev = Vec::with_capacity(csnpoints);
        self.cycle_slip_buff_idx = 0;
        self.cycle_slip_flags = vec![false; csnepochs];
        self.cycle_slip_flag_idx = 0;
    }

    /// Lazily sizes the `CycleSlipFlags` ring to `csnepochs` the first time
    /// it is needed. `PrevPreproState::new()` has no `CYCLE_SLIPS`
    /// configuration to size against yet, so the ring starts empty; this
    /// must run before any indexed write to it, not just after an explicit
    /// reset, or the steady-state path (buffer fills without ever hitting a
    /// data gap or confirmed slip) indexes a zero-length vector.
    pub(crate) fn ensure_cycle_slip_ring(&mut self, csnepochs: usize) {
        if self.cycle_slip_flags.len() != csnepochs {
            self.cycle_slip_flags = vec![false; csnepochs];
            self.cycle_slip_flag_idx = 0;
        }
    }
}

impl Default for PrevPreproState {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-size `[constellation][prn-1]` table of per-satellite preprocessor state.
pub struct PreproStateTable {
    states: Vec<Vec<PrevPreproState>>,
}

impl PreproStateTable {
    pub fn new() -> Self {
        Self {
            states: (0..NUM_CONSTELLATIONS)
                .map(|_| (0..MAX_NUM_SATS_CONSTEL).map(|_| PrevPreproState::new()).collect())
                .collect(),
        }
    }

    pub fn get(&self, sv: Sv) -> &PrevPreproState {
        let (c, p) = sv.table_index();
        &self.states[c][p]
    }

    pub fn get_mut(&mut self, sv: Sv) -> &mut PrevPreproState {
        let (c, p) = sv.table_index();
        &mut self.states[c][p]
    }
}

impl Default for PreproStateTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-(constellation, PRN) persistent correction-engine state: only what
/// is needed to finite-difference the relativistic correction (Dtr).
#[derive(Debug, Clone, Copy, Default)]
pub struct PrevCorrState {
    pub sod_prev: Option<f64>,
    pub sat_com_pos_prev: Option<[f64; 3]>,
}

/// Fixed-size `[constellation][prn-1]` table of per-satellite correction state.
pub struct CorrStateTable {
    states: Vec<Vec<PrevCorrState>>,
}

impl CorrStateTable {
    pub fn new() -> Self {
        Self {
            states: (0..NUM_CONSTELLATIONS)
                .map(|_| vec![PrevCorrState::default(); MAX_NUM_SATS_CONSTEL])
                .collect(),
        }
    }

    pub fn get(&self, sv: Sv) -> &PrevCorrState {
        let (c, p) = sv.table_index();
        &self.states[c][p]
    }

    pub fn get_mut(&mut self, sv: Sv) -> &mut PrevCorrState {
        let (c, p) = sv.table_index();
        &mut self.states[c][p]
    }
}

impl Default for CorrStateTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-satellite, per-epoch output of the correction engine.
#[derive(Debug, Clone, Copy)]
pub struct CorrectedMeas {
    pub sod: f64,
    pub sv: Sv,
    pub elevation: f64,
    pub azimuth: f64,
    pub flag: bool,

    /// Receiver CoM + APC position, ECEF (metres).
    pub rcvr_ref_pos: [f64; 3],
    /// Receiver APC offset from CoM, ECEF (metres).
    pub leo_apo: [f64; 3],

    /// Satellite CoM position at transmission time, Sagnac-corrected, ECEF
    /// (metres). Add `sat_apo` to get the CoP position used for `GeomRange`.
    pub sat_pos: [f64; 3],
    /// Satellite APO in ECEF (metres).
    pub sat_apo: [f64; 3],

    pub sat_clk: f64,
    pub sat_code_bia: f64,
    pub sat_phase_bia: f64,

    /// Signal flight time, milliseconds.
    pub flight_time_ms: f64,
    pub dtr: f64,

    pub corr_code: f64,
    pub corr_phase: f64,
    pub geom_range: f64,
    pub code_residual: f64,
    pub phase_residual: f64,
    pub rcvr_clk: f64,
    pub sigma_uere: f64,
}
