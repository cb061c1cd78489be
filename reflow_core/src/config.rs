//! Configuration types for the reflow engine.
//!
//! These are the runtime configuration structs used by the controller.
//! They are separate from the TOML-deserialized config in `reflow_config`.

/// Highest top-element duty level the enclosure tolerates.
pub const TOP_LEVEL_LIMIT: u8 = 3;

/// Cool stage behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct CoolCfg {
    /// The run completes on the first Cool tick at or below this temperature.
    pub complete_at_c: f32,
    /// Seconds after Cool entry before the door advisory switches to "OpenDoor".
    pub door_open_after_s: u64,
}

impl Default for CoolCfg {
    fn default() -> Self {
        Self {
            complete_at_c: 50.0,
            door_open_after_s: 8,
        }
    }
}

/// Temperature crossings latched by the timing recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct MilestoneCfg {
    /// "Last seen at or below" while heating; start of the peak-time window.
    pub ambient_c: f32,
    /// Start of the soak window.
    pub soak_c: f32,
    /// Liquidus crossing; end of soak, bounds of time above liquidus.
    pub reflow_c: f32,
    /// Initial running maximum, above typical ambient so room temperature never registers as a peak.
    pub max_temp_init_c: f32,
}

impl Default for MilestoneCfg {
    fn default() -> Self {
        Self {
            ambient_c: 50.0,
            soak_c: 150.0,
            reflow_c: 180.0,
            max_temp_init_c: 30.0,
        }
    }
}

/// Safety configuration for runtime and sensor guards.
#[derive(Debug, Clone, PartialEq)]
pub struct SafetyCfg {
    /// Hard cap on a single run in milliseconds.
    pub max_run_ms: u64,
    /// Fail-stop after this many back-to-back sensor faults. 0 never trips.
    pub max_consecutive_faults: u32,
    /// Highest top level a band table may request.
    pub top_level_limit: u8,
}

impl Default for SafetyCfg {
    fn default() -> Self {
        Self {
            max_run_ms: 900_000,
            max_consecutive_faults: 3,
            top_level_limit: TOP_LEVEL_LIMIT,
        }
    }
}
