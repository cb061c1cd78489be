//! `From`/`TryFrom` implementations bridging `reflow_config` types to core types.

use crate::config::{CoolCfg, SafetyCfg};
use crate::error::{ReflowError, Result};
use crate::profile::{BandRow, Profile, default_rows};
use crate::stage::Stage;

// ── SafetyCfg ────────────────────────────────────────────────────────────────

impl From<&reflow_config::Safety> for SafetyCfg {
    fn from(c: &reflow_config::Safety) -> Self {
        Self {
            max_run_ms: c.max_run_ms,
            max_consecutive_faults: c.max_consecutive_faults,
            top_level_limit: c.top_level_limit,
        }
    }
}

// ── CoolCfg ──────────────────────────────────────────────────────────────────

impl From<&reflow_config::Cool> for CoolCfg {
    fn from(c: &reflow_config::Cool) -> Self {
        Self {
            complete_at_c: c.complete_at_c,
            door_open_after_s: c.door_open_after_s,
        }
    }
}

// ── Profile ──────────────────────────────────────────────────────────────────

fn band_row(b: &reflow_config::BandCfg) -> std::result::Result<BandRow, ReflowError> {
    let stage: Stage = b.stage.parse()?;
    Ok((stage, b.upper_c, b.top, b.bottom, b.label.clone()))
}

/// Builds the effective profile: the configured bands, or the stock table
/// when `[profile]` is empty. Validated against `[safety] top_level_limit`.
impl TryFrom<&reflow_config::Config> for Profile {
    type Error = eyre::Report;

    fn try_from(c: &reflow_config::Config) -> Result<Self> {
        let rows = if c.profile.bands.is_empty() {
            default_rows()
        } else {
            c.profile
                .bands
                .iter()
                .map(band_row)
                .collect::<std::result::Result<Vec<_>, _>>()?
        };
        let profile = Profile::new(rows, CoolCfg::from(&c.cool), c.safety.top_level_limit)?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProfileError;

    #[test]
    fn empty_profile_section_means_stock_table() {
        let cfg = reflow_config::load_toml("").unwrap();
        let p = Profile::try_from(&cfg).unwrap();
        assert_eq!(p, Profile::default());
    }

    #[test]
    fn configured_top_level_is_checked_against_limit() {
        let cfg = reflow_config::load_toml(
            r#"
[safety]
top_level_limit = 2

[[profile.bands]]
stage = "preheat"
upper_c = 100.0
top = 3
bottom = 6
label = "Hot"
"#,
        )
        .unwrap();
        let err = Profile::try_from(&cfg).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProfileError>(),
            Some(ProfileError::TopLevelLimit { level: 3, limit: 2, .. })
        ));
    }

    #[test]
    fn safety_fields_carry_over() {
        let cfg = reflow_config::load_toml("[safety]\nmax_run_ms = 5000\nmax_consecutive_faults = 7\n")
            .unwrap();
        let s = SafetyCfg::from(&cfg.safety);
        assert_eq!(s.max_run_ms, 5000);
        assert_eq!(s.max_consecutive_faults, 7);
        assert_eq!(s.top_level_limit, 3);
    }
}
