use thiserror::Error;

use crate::stage::Stage;

/// Why a run was stopped before the Cool stage completed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    #[error("sensor fault")]
    SensorFault,
    #[error("invalid stage")]
    InvalidStage,
    #[error("max runtime exceeded")]
    MaxRuntime,
    #[error("cancelled")]
    Cancelled,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReflowError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid stage code: {0}")]
    InvalidStage(u8),
    #[error("invalid duty level: {0} (expected 0..=6)")]
    InvalidDutyLevel(u8),
    #[error("run already finished; state is frozen")]
    Frozen,
    #[error("abort: {0}")]
    Abort(AbortReason),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// Rejections raised while validating a band table.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProfileError {
    #[error("profile has no bands")]
    Empty,
    #[error("profile has no band for stage {0}")]
    MissingStage(Stage),
    #[error("band {label:?} uses stage {stage}, only preheat/soak/reflow are table-driven")]
    UntabledStage { label: String, stage: Stage },
    #[error("band {label:?} is out of stage order")]
    OutOfOrder { label: String },
    #[error("band {label:?} upper bound must be finite")]
    NonFinite { label: String },
    #[error("band {label:?} upper bound must exceed the previous band in its stage")]
    NotIncreasing { label: String },
    #[error("band {label:?} {channel} level {level} exceeds 6")]
    LevelOutOfRange {
        label: String,
        channel: &'static str,
        level: u8,
    },
    #[error("band {label:?} top level {level} exceeds limit {limit}")]
    TopLevelLimit { label: String, level: u8, limit: u8 },
    #[error("band label must not be empty")]
    EmptyLabel,
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
