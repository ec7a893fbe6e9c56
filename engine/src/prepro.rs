//! Measurement preprocessor (§4.1): per-satellite quality gating,
//! data-gap handling, cycle-slip detection, and Hatch code-carrier
//! smoothing.

use std::collections::HashMap;

use crate::polyfit::{polyfit, polyval};
use crate::types::{CodeObs, PhaseObs, PreproObs, PreproStateTable, RejectionCause, Sv};

/// An enable flag plus a single numeric threshold, matching the
/// `[FLAG, VALUE]` shape every gating parameter takes in the source
/// tool's configuration file (§6).
#[derive(Debug, Clone, Copy)]
pub struct Threshold {
    pub enabled: bool,
    pub value: f64,
}

impl Threshold {
    pub fn disabled() -> Self {
        Self { enabled: false, value: 0.0 }
    }
}

/// Cycle-slip detector configuration (`CYCLE_SLIPS` config entry).
#[derive(Debug, Clone, Copy)]
pub struct CycleSlipConfig {
    pub enabled: bool,
    pub threshold_cycles: f64,
    pub csnepochs: usize,
    pub csnpoints: usize,
    pub cspdegree: usize,
}

/// All preprocessor-relevant configuration, §6.
#[derive(Debug, Clone, Copy)]
pub struct PreproConfig {
    pub rcvr_mask_deg: f64,
    pub min_snr: Threshold,
    pub max_psr_outrng: Threshold,
    pub max_code_rate: Threshold,
    pub max_code_rate_step: Threshold,
    pub max_phase_rate: Threshold,
    pub max_phase_rate_step: Threshold,
    pub max_data_gap: Threshold,
    pub cycle_slips: CycleSlipConfig,
    pub hatch_time: f64,
    pub hatch_state_f: f64,
}

/// Runs the full preprocessing algorithm for one epoch.
///
/// `codes` and `phases` are the parallel per-epoch sequences from the
/// OBS file; satellites are emitted in the order they appear in `codes`,
/// matching the source ordering guarantee (§5). A code record with no
/// matching phase record is skipped.
pub fn preprocess_epoch(
    config: &PreproConfig,
    codes: &[CodeObs],
    phases: &[PhaseObs],
    state: &mut PreproStateTable,
) -> Vec<PreproObs> {
    if config.cycle_slips.enabled {
        detect_cycle_slips(config, phases, state);
    }

    let phase_by_sv: HashMap<Sv, PhaseObs> = phases.iter().map(|p| (p.sv, *p)).collect();

    let mut out = Vec::with_capacity(codes.len());
    for code in codes {
        let Some(phase) = phase_by_sv.get(&code.sv) else {
            continue;
        };
        out.push(process_satellite(config, code, phase, state));
    }
    out
}

fn detect_cycle_slips(config: &PreproConfig, phases: &[PhaseObs], state: &mut PreproStateTable) {
    let cs = config.cycle_slips;

    for phase in phases {
        let st = state.get_mut(phase.sv);
        st.ensure_cycle_slip_ring(cs.csnepochs);
        let gf = phase.l1 - phase.l2;

        let last_epoch = st.gf_epoch_prev.last().copied().unwrap_or(0.0);
        let delta_t = phase.sod - last_epoch;
        if delta_t > config.max_data_gap.value {
            st.reset_cycle_slip_buffers(cs.csnpoints, cs.csnepochs);
            st.reset_hatch_filter = true;
        }

        let n = st.gf_l_prev.len();
        if n < cs.csnpoints {
            st.gf_l_prev.push(gf);
            st.gf_epoch_prev.push(phase.sod);
            st.cycle_slip_buff_idx = st.gf_l_prev.len();
            continue;
        }

        let Some(coeffs) = polyfit(&st.gf_epoch_prev, &st.gf_l_prev, cs.cspdegree) else {
            log::warn!("cycle-slip polynomial fit degenerate for {:?}, skipping epoch", phase.sv);
            continue;
        };
        let predicted = polyval(&coeffs, phase.sod);
        let residual = (gf - predicted).abs();
        let cs_flag = residual > cs.threshold_cycles;

        st.cycle_slip_flag_idx = (st.cycle_slip_flag_idx + 1) % cs.csnepochs;
        let idx = st.cycle_slip_flag_idx;
        st.cycle_slip_flags[idx] = cs_flag;

        let confirmed = st.cycle_slip_flags.iter().filter(|&&f| f).count() == cs.csnepochs;
        if confirmed {
            st.cycle_slip_detect_flag = true;
            st.reset_rates();
            st.reset_cycle_slip_buffers(cs.csnpoints, cs.csnepochs);
            st.reset_hatch_filter = true;
        } else if cs_flag {
            // Exceeded but not yet confirmed: drop the sample, leave the
            // buffer untouched.
        } else {
            st.gf_l_prev.remove(0);
            st.gf_epoch_prev.remove(0);
            st.gf_l_prev.push(gf);
            st.gf_epoch_prev.push(phase.sod);
        }
    }
}

fn process_satellite(
    config: &PreproConfig,
    code: &CodeObs,
    phase: &PhaseObs,
    state: &mut PreproStateTable,
) -> PreproObs {
    let sv = code.sv;
    let (wave1, wave2) = sv.constellation.wavelengths();
    let gamma = sv.constellation.gamma();

    let l1_meters = phase.l1 * wave1;
    let l2_meters = phase.l2 * wave2;

    let mut valid = true;
    let mut rejection_cause = RejectionCause::None;

    let st = state.get_mut(sv);
    let delta_t = code.sod - st.prev_epoch;

    if delta_t > config.max_data_gap.value {
        if config.max_data_gap.enabled && delta_t < 1000.0 {
            rejection_cause = RejectionCause::DataGap;
        }
        st.reset_rates();
        st.reset_cycle_slip_buffers(config.cycle_slips.csnpoints, config.cycle_slips.csnepochs);
        st.reset_hatch_filter = true;
    }

    if code.elevation < config.rcvr_mask_deg {
        rejection_cause = RejectionCause::MaskAngle;
        valid = false;
    }

    if config.min_snr.enabled {
        if code.s1 < config.min_snr.value {
            rejection_cause = RejectionCause::MinSnrF1;
            valid = false;
        }
        if code.s2 < config.min_snr.value {
            rejection_cause = RejectionCause::MinSnrF2;
            valid = false;
        }
    }

    if config.max_psr_outrng.enabled {
        if code.c1 > config.max_psr_outrng.value {
            rejection_cause = RejectionCause::MaxPsrOutrngF1;
            valid = false;
        }
        if code.c2 > config.max_psr_outrng.value {
            rejection_cause = RejectionCause::MaxPsrOutrngF2;
            valid = false;
        }
    }

    if st.cycle_slip_detect_flag {
        rejection_cause = RejectionCause::CycleSlip;
        valid = false;
        st.cycle_slip_detect_flag = false;
    }

    let geom_free_p = (phase.l2 - phase.l1) / (1.0 - gamma);
    let if_c = (code.c2 - gamma * code.c1) / (1.0 - gamma);
    let mut if_p = (l2_meters - gamma * l1_meters) / (1.0 - gamma);

    let smooth_if;
    if st.reset_hatch_filter {
        st.reset_hatch_filter = false;
        st.ksmooth = 1.0;
        smooth_if = if_c;
        st.prev_smooth = smooth_if;
        st.prealign_offset = if_c - if_p;
        st.reset_rates();
    } else {
        st.ksmooth += delta_t;
        let smoothing_time = st.ksmooth.min(config.hatch_time);
        let alpha = delta_t / smoothing_time;
        smooth_if = alpha * if_c + (1.0 - alpha) * (st.prev_smooth + if_p - st.if_p_prev);
    }

    let (phase_rate_l1, phase_rate_step_l1) = rate_check(
        &mut valid, &mut rejection_cause, st.prev_l1, st.prev_phase_rate_l1, phase.l1, wave1, delta_t,
        config.max_phase_rate, config.max_phase_rate_step,
        RejectionCause::MaxPhaseRateF1, RejectionCause::MaxPhaseRateStepF1, &mut st.reset_hatch_filter,
    );
    let (range_rate_l1, range_rate_step_l1) = rate_check(
        &mut valid, &mut rejection_cause, st.prev_c1, st.prev_range_rate_l1, code.c1, 1.0, delta_t,
        config.max_code_rate, config.max_code_rate_step,
        RejectionCause::MaxCodeRateF1, RejectionCause::MaxCodeRateStepF1, &mut st.reset_hatch_filter,
    );

    let (phase_rate_l2, phase_rate_step_l2) = rate_check(
        &mut valid, &mut rejection_cause, st.prev_l2, st.prev_phase_rate_l2, phase.l2, wave2, delta_t,
        config.max_phase_rate, config.max_phase_rate_step,
        RejectionCause::MaxPhaseRateF2, RejectionCause::MaxPhaseRateStepF2, &mut st.reset_hatch_filter,
    );
    let (range_rate_l2, range_rate_step_l2) = rate_check(
        &mut valid, &mut rejection_cause, st.prev_c2, st.prev_range_rate_l2, code.c2, 1.0, delta_t,
        config.max_code_rate, config.max_code_rate_step,
        RejectionCause::MaxCodeRateF2, RejectionCause::MaxCodeRateStepF2, &mut st.reset_hatch_filter,
    );

    let status = st.ksmooth > config.hatch_state_f * config.hatch_time && valid;

    st.prev_c1 = Some(code.c1);
    st.prev_l1 = Some(phase.l1);
    st.prev_c2 = Some(code.c2);
    st.prev_l2 = Some(phase.l2);
    st.prev_smooth = smooth_if;
    st.if_p_prev = if_p;
    st.prev_range_rate_l1 = range_rate_l1;
    st.prev_range_rate_l2 = range_rate_l2;
    st.prev_phase_rate_l1 = phase_rate_l1;
    st.prev_phase_rate_l2 = phase_rate_l2;
    st.prev_epoch = code.sod;

    if_p += st.prealign_offset;

    PreproObs {
        sod: code.sod,
        sv,
        elevation: code.elevation,
        azimuth: code.azimuth,
        c1: code.c1,
        c2: code.c2,
        l1: phase.l1,
        l2: phase.l2,
        l1_meters,
        l2_meters,
        s1: code.s1,
        s2: code.s2,
        geom_free_p,
        if_c,
        if_p,
        smooth_if,
        range_rate_l1,
        range_rate_step_l1,
        phase_rate_l1,
        phase_rate_step_l1,
        range_rate_l2,
        range_rate_step_l2,
        phase_rate_l2,
        phase_rate_step_l2,
        valid,
        rejection_cause,
        status,
    }
}

/// Shared rate/rate-step computation used for both the phase rates
/// (`scale` = wavelength) and the code rates (`scale = 1.0`). A missing
/// predecessor forces `valid = false` for the epoch without setting a
/// rejection cause (§4.1: "missing predecessors force Valid = 0 but do
/// not raise a rejection code").
#[allow(clippy::too_many_arguments)]
fn rate_check(
    valid: &mut bool,
    rejection_cause: &mut RejectionCause,
    prev_value: Option<f64>,
    prev_rate: Option<f64>,
    current_value: f64,
    scale: f64,
    delta_t: f64,
    rate_limit: Threshold,
    rate_step_limit: Threshold,
    rate_cause: RejectionCause,
    rate_step_cause: RejectionCause,
    reset_hatch_filter: &mut bool,
) -> (Option<f64>, Option<f64>) {
    let Some(prev) = prev_value else {
        *valid = false;
        return (None, None);
    };

    let rate = (current_value - prev) / delta_t * scale;
    if rate_limit.enabled && rate.abs() > rate_limit.value {
        *rejection_cause = rate_cause;
        *valid = false;
        *reset_hatch_filter = true;
    }

    let Some(prev_r) = prev_rate else {
        *valid = false;
        return (Some(rate), None);
    };

    let step = (rate - prev_r) / delta_t;
    if rate_step_limit.enabled && step.abs() > rate_step_limit.value {
        *rejection_cause = rate_step_cause;
        *valid = false;
        *reset_hatch_filter = true;
    }

    (Some(rate), Some(step))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Constellation;
    use float_cmp::approx_eq;

    fn default_config() -> PreproConfig {
        PreproConfig {
            rcvr_mask_deg: 5.0,
            min_snr: Threshold::disabled(),
            max_psr_outrng: Threshold::disabled(),
            max_code_rate: Threshold::disabled(),
            max_code_rate_step: Threshold::disabled(),
            max_phase_rate: Threshold { enabled: true, value: 1.0e6 },
            max_phase_rate_step: Threshold::disabled(),
            max_data_gap: Threshold { enabled: true, value: 60.0 },
            cycle_slips: CycleSlipConfig {
                enabled: true,
                threshold_cycles: 1.0,
                csnepochs: 2,
                csnpoints: 4,
                cspdegree: 1,
            },
            hatch_time: 100.0,
            hatch_state_f: 0.5,
        }
    }

    fn gps_sv() -> Sv {
        Sv::new(Constellation::Gps, 1)
    }

    fn code_at(sod: f64) -> CodeObs {
        CodeObs {
            sod,
            sv: gps_sv(),
            elevation: 45.0,
            azimuth: 120.0,
            c1: 20_000_000.0 + sod * 100.0,
            c2: 20_000_010.0 + sod * 100.0,
            s1: 45.0,
            s2: 44.0,
        }
    }

    fn phase_at(sod: f64) -> PhaseObs {
        PhaseObs {
            sod,
            sv: gps_sv(),
            l1: 1.0e8 + sod * 500.0,
            l2: 1.0e8 + sod * 400.0,
        }
    }

    #[test]
    fn first_epoch_resets_hatch_and_prealigns() {
        let config = default_config();
        let mut state = PreproStateTable::new();
        let out = preprocess_epoch(&config, &[code_at(0.0)], &[phase_at(0.0)], &mut state);
        assert_eq!(out.len(), 1);
        let obs = out[0];
        assert!(approx_eq!(f64, obs.smooth_if, obs.if_c, epsilon = 1e-9));
        // pre-aligned IF_P should equal IF_P + (IF_C - IF_P) == IF_C on the reset epoch
        assert!(approx_eq!(f64, obs.if_p, obs.if_c, epsilon = 1e-6));
        assert!(!obs.status);
    }

    #[test]
    fn elevation_exactly_at_mask_is_not_rejected() {
        let config = default_config();
        let mut state = PreproStateTable::new();
        let mut code = code_at(0.0);
        code.elevation = config.rcvr_mask_deg;
        let out = preprocess_epoch(&config, &[code], &[phase_at(0.0)], &mut state);
        assert_eq!(out[0].rejection_cause, RejectionCause::None);
    }

    #[test]
    fn elevation_below_mask_is_rejected() {
        let config = default_config();
        let mut state = PreproStateTable::new();
        let mut code = code_at(0.0);
        code.elevation = config.rcvr_mask_deg - 1.0;
        let out = preprocess_epoch(&config, &[code], &[phase_at(0.0)], &mut state);
        assert_eq!(out[0].rejection_cause, RejectionCause::MaskAngle);
        assert!(!out[0].valid);
    }

    #[test]
    fn data_gap_boundary_does_not_trigger_at_exact_threshold() {
        let config = default_config();
        let mut state = PreproStateTable::new();
        let _ = preprocess_epoch(&config, &[code_at(0.0)], &[phase_at(0.0)], &mut state);
        let out = preprocess_epoch(&config, &[code_at(60.0)], &[phase_at(60.0)], &mut state);
        assert_ne!(out[0].rejection_cause, RejectionCause::DataGap);
    }

    #[test]
    fn data_gap_past_threshold_triggers_rejection() {
        let config = default_config();
        let mut state = PreproStateTable::new();
        let _ = preprocess_epoch(&config, &[code_at(0.0)], &[phase_at(0.0)], &mut state);
        let out = preprocess_epoch(&config, &[code_at(61.0)], &[phase_at(61.0)], &mut state);
        assert_eq!(out[0].rejection_cause, RejectionCause::DataGap);
        assert!(!out[0].valid);
    }

    #[test]
    fn unmatched_phase_records_are_skipped() {
        let config = default_config();
        let mut state = PreproStateTable::new();
        let other_sv = Sv::new(Constellation::Galileo, 5);
        let mut phase = phase_at(0.0);
        phase.sv = other_sv;
        let out = preprocess_epoch(&config, &[code_at(0.0)], &[phase], &mut state);
        assert!(out.is_empty());
    }

    #[test]
    fn confirmed_cycle_slip_resets_rates_and_clears_buffers() {
        let mut config = default_config();
        config.cycle_slips.csnpoints = 3;
        config.cycle_slips.csnepochs = 2;
        config.cycle_slips.threshold_cycles = 0.5;
        let mut state = PreproStateTable::new();

        // Feed three clean samples to fill the CS buffer, one per second.
        for sod in [0.0, 1.0, 2.0] {
            preprocess_epoch(&config, &[code_at(sod)], &[phase_at(sod)], &mut state);
        }

        // Inject a 2-cycle slip in L1 for the next two epochs; with
        // CSNEPOCHS = 2 the second exceedance confirms the slip.
        let mut slipped1 = phase_at(3.0);
        slipped1.l1 += 2.0;
        preprocess_epoch(&config, &[code_at(3.0)], &[slipped1], &mut state);

        let mut slipped2 = phase_at(4.0);
        slipped2.l1 += 2.0;
        let out = preprocess_epoch(&config, &[code_at(4.0)], &[slipped2], &mut state);

        assert_eq!(out[0].rejection_cause, RejectionCause::CycleSlip);
        assert!(!out[0].status);

        // The confirmed slip clears the rate history (so the next epoch's
        // rate check again sees "no predecessor") and the CS buffers, but
        // the raw observables are still latched for the next epoch's delta.
        let st = state.get(gps_sv());
        assert!(st.prev_phase_rate_l1.is_none());
        assert!(st.prev_c1.is_some());
        assert!(st.gf_l_prev.is_empty());
    }
}
