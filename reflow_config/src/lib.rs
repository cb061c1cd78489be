#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the reflow controller.
//!
//! `Config` and its sections are deserialized from TOML and checked with
//! `Config::validate`. Every section is optional; an empty file yields the
//! stock profile on the simulated oven.
use serde::Deserialize;

/// Stage names accepted in `[[profile.bands]]`.
pub const TABLED_STAGES: [&str; 3] = ["preheat", "soak", "reflow"];

/// One row of the band table.
///
/// ```toml
/// [[profile.bands]]
/// stage = "soak"
/// upper_c = 150.0
/// top = 1
/// bottom = 4
/// label = "Soak1"
/// ```
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BandCfg {
    pub stage: String,
    pub upper_c: f32,
    pub top: u8,
    pub bottom: u8,
    pub label: String,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ProfileCfg {
    /// Empty means the built-in table.
    pub bands: Vec<BandCfg>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Cool {
    /// Cool completes once the reading drops to this temperature.
    pub complete_at_c: f32,
    /// Seconds after Cool entry before the door advisory flips to open.
    pub door_open_after_s: u64,
}

impl Default for Cool {
    fn default() -> Self {
        Self {
            complete_at_c: 50.0,
            door_open_after_s: 8,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Safety {
    /// Hard cap for a whole run.
    pub max_run_ms: u64,
    /// Consecutive sensor faults tolerated before the run is aborted.
    pub max_consecutive_faults: u32,
    /// Highest duty level any band may give the top element (0..=6).
    pub top_level_limit: u8,
}

impl Default for Safety {
    fn default() -> Self {
        Self {
            max_run_ms: 900_000,
            max_consecutive_faults: 3,
            top_level_limit: 3,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// GPIO/SPI wiring for the hardware backend.
#[derive(Debug, Deserialize, Clone)]
pub struct Pins {
    pub heater_top: u8,
    pub heater_bottom: u8,
    #[serde(default)]
    pub spi_bus: u8,
    #[serde(default)]
    pub spi_cs: u8,
}

/// First-order thermal model for the simulated oven.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Sim {
    pub ambient_c: f32,
    pub top_gain_c_per_s: f32,
    pub bottom_gain_c_per_s: f32,
    /// Fraction of the excess over ambient lost per second.
    pub loss_per_s: f32,
}

impl Default for Sim {
    fn default() -> Self {
        Self {
            ambient_c: 25.0,
            top_gain_c_per_s: 1.5,
            bottom_gain_c_per_s: 2.5,
            loss_per_s: 0.01,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub profile: ProfileCfg,
    #[serde(default)]
    pub cool: Cool,
    #[serde(default)]
    pub safety: Safety,
    #[serde(default)]
    pub logging: Logging,
    /// Present only for the hardware backend.
    #[serde(default)]
    pub pins: Option<Pins>,
    #[serde(default)]
    pub sim: Sim,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_path(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Profile
        for (idx, b) in self.profile.bands.iter().enumerate() {
            let stage = b.stage.to_ascii_lowercase();
            if !TABLED_STAGES.contains(&stage.as_str()) {
                eyre::bail!(
                    "profile.bands[{idx}].stage must be one of preheat, soak, reflow (got {:?})",
                    b.stage
                );
            }
            if !b.upper_c.is_finite() {
                eyre::bail!("profile.bands[{idx}].upper_c must be finite");
            }
            if b.top > 6 || b.bottom > 6 {
                eyre::bail!("profile.bands[{idx}] levels must be in 0..=6");
            }
            if b.label.trim().is_empty() {
                eyre::bail!("profile.bands[{idx}].label must not be empty");
            }
        }

        // Cool
        if !self.cool.complete_at_c.is_finite() {
            eyre::bail!("cool.complete_at_c must be finite");
        }
        if self.cool.door_open_after_s > 60 * 60 {
            eyre::bail!("cool.door_open_after_s is unreasonably large (>1h)");
        }

        // Safety
        if self.safety.max_run_ms == 0 {
            eyre::bail!("safety.max_run_ms must be >= 1");
        }
        if self.safety.max_run_ms > 24 * 60 * 60 * 1000 {
            eyre::bail!("safety.max_run_ms is unreasonably large (>24h)");
        }
        if self.safety.max_consecutive_faults == 0 {
            eyre::bail!("safety.max_consecutive_faults must be >= 1");
        }
        if self.safety.top_level_limit > 6 {
            eyre::bail!("safety.top_level_limit must be in 0..=6");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        // Pins
        if let Some(p) = &self.pins
            && p.heater_top == p.heater_bottom
        {
            eyre::bail!("pins.heater_top and pins.heater_bottom must differ");
        }

        // Sim
        let s = &self.sim;
        if !s.ambient_c.is_finite() {
            eyre::bail!("sim.ambient_c must be finite");
        }
        if !(s.top_gain_c_per_s.is_finite() && s.top_gain_c_per_s >= 0.0) {
            eyre::bail!("sim.top_gain_c_per_s must be >= 0");
        }
        if !(s.bottom_gain_c_per_s.is_finite() && s.bottom_gain_c_per_s >= 0.0) {
            eyre::bail!("sim.bottom_gain_c_per_s must be >= 0");
        }
        if !(s.loss_per_s >= 0.0 && s.loss_per_s <= 1.0) {
            eyre::bail!("sim.loss_per_s must be in [0.0, 1.0]");
        }

        Ok(())
    }
}
