//! Per-epoch measurement preprocessing and geometric/clock correction
//! engine for a LEO GNSS PPP pipeline.
//!
//! This crate is deliberately I/O-free: it consumes already-parsed
//! observation records and static ephemeris tables, and produces
//! per-epoch output records. File parsing, output formatting, and
//! day/epoch orchestration live in the binary crate that wraps this one.

pub mod constants;
pub mod correction;
pub mod error;
pub mod frames;
pub mod polyfit;
pub mod prepro;
pub mod sun;
pub mod tables;
pub mod types;

pub use correction::{correct_epoch, CorrConfig};
pub use error::{Error, Result};
pub use prepro::{preprocess_epoch, CycleSlipConfig, PreproConfig, Threshold};
pub use types::{
    CodeObs, Constellation, CorrStateTable, CorrectedMeas, PhaseObs, PreproObs, PreproStateTable, RejectionCause, Sv,
};
