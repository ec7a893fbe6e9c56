use thiserror::Error;

/// Errors raised by the engine itself.
///
/// The per-epoch preprocessing and correction paths are intentionally
/// infallible (missing ephemeris rows, rejected measurements, and data
/// gaps are reported in-band via `Valid`/`RejectionCause`/`Flag`, per
/// the source tool's partial-failure semantics). This type exists for
/// the handful of operations that have a genuine precondition a caller
/// can violate, such as constructing a state table with an out-of-range
/// PRN.
#[derive(Debug, Error)]
pub enum Error {
    #[error("PRN {prn} out of range for constellation (max {max})")]
    PrnOutOfRange { prn: u8, max: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
