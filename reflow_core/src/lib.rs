#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core reflow logic (hardware-agnostic).
//!
//! This crate provides the oven control engine. All hardware interactions go
//! through `reflow_traits::Thermocouple` and `reflow_traits::Heater`.
//!
//! ## Architecture
//!
//! - **Profile**: validated band table mapping (stage, temperature) to duty
//!   levels and a sub-phase label (`profile` module)
//! - **State machine**: one `OvenState` advanced once per tick (`machine`)
//! - **Scheduler**: six sub-slices per 1 s tick, level `L` means ON for
//!   slices `1..=L` (`scheduler`)
//! - **Timing**: milestone crossings and the run summary (`timing`)
//! - **Safety**: sensor-fault hold and trip, runtime cap, fail-stop on an
//!   invalid stage (`controller`)
//!
//! The controller is single-threaded and blocking. One tick reads the
//! thermocouple once, evaluates the state machine, then drives the heaters
//! until the tick deadline.

pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod duty;
pub mod error;
pub mod hw_error;
pub mod machine;
pub mod mocks;
pub mod profile;
pub mod runner;
pub mod scheduler;
pub mod stage;
pub mod status;
pub mod telemetry;
pub mod timing;
pub mod util;

pub use builder::{ControllerBuilder, Missing};
pub use config::{CoolCfg, MilestoneCfg, SafetyCfg, TOP_LEVEL_LIMIT};
pub use controller::{Controller, TickOutcome};
pub use duty::{DutyLevel, Levels, SLICES};
pub use error::{AbortReason, BuildError, ProfileError, ReflowError, Report, Result};
pub use machine::{OvenState, ProfileMachine, Reading, Step};
pub use profile::{Band, BandRow, Profile};
pub use runner::{RunParams, RunReport, run};
pub use scheduler::{DutyScheduler, SliceStats, TICK_MS};
pub use stage::Stage;
pub use status::RunStatus;
pub use telemetry::{NullSink, TelemetrySink, TickReport, TracingSink};
pub use timing::{Milestones, Summary};
