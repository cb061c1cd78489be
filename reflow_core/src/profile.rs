//! Band table driving the heating stages.
//!
//! A profile is an ordered list of bands `(stage, upper_c, top, bottom, label)`.
//! Within a tabled stage the first band whose `upper_c` is above the current
//! temperature selects the duty levels; a temperature at or above the last
//! band's bound is that stage's exit threshold.

use crate::config::CoolCfg;
use crate::duty::{DutyLevel, Levels, SLICES};
use crate::error::ProfileError;
use crate::stage::Stage;

/// One sub-band of a heating stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub stage: Stage,
    /// Exclusive upper temperature bound in °C.
    pub upper_c: f32,
    pub levels: Levels,
    pub label: String,
}

impl Band {
    pub fn new(stage: Stage, upper_c: f32, top: u8, bottom: u8, label: impl Into<String>) -> Self {
        Self {
            stage,
            upper_c,
            levels: Levels::new(DutyLevel::saturating(top), DutyLevel::saturating(bottom)),
            label: label.into(),
        }
    }
}

/// Validated band table plus Cool-stage settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    bands: Vec<Band>,
    cool: CoolCfg,
}

/// Raw band rows before level validation: `(stage, upper_c, top, bottom, label)`.
pub type BandRow = (Stage, f32, u8, u8, String);

impl Profile {
    /// Validate `rows` and build a profile.
    ///
    /// Rejects empty tables, tabled stages without bands, bands for Cool/Error,
    /// out-of-order stages, non-increasing bounds, levels above 6 and top levels
    /// above `top_level_limit`.
    pub fn new(
        rows: Vec<BandRow>,
        cool: CoolCfg,
        top_level_limit: u8,
    ) -> Result<Self, ProfileError> {
        if rows.is_empty() {
            return Err(ProfileError::Empty);
        }
        let mut bands = Vec::with_capacity(rows.len());
        let mut prev: Option<(Stage, f32)> = None;
        for (stage, upper_c, top, bottom, label) in rows {
            if label.trim().is_empty() {
                return Err(ProfileError::EmptyLabel);
            }
            if !stage.is_tabled() {
                return Err(ProfileError::UntabledStage { label, stage });
            }
            if !upper_c.is_finite() {
                return Err(ProfileError::NonFinite { label });
            }
            if let Some((prev_stage, prev_upper)) = prev {
                if stage < prev_stage {
                    return Err(ProfileError::OutOfOrder { label });
                }
                if stage == prev_stage && upper_c <= prev_upper {
                    return Err(ProfileError::NotIncreasing { label });
                }
            }
            for (channel, level) in [("top", top), ("bottom", bottom)] {
                if level > SLICES {
                    return Err(ProfileError::LevelOutOfRange {
                        label,
                        channel,
                        level,
                    });
                }
            }
            if top > top_level_limit {
                return Err(ProfileError::TopLevelLimit {
                    label,
                    level: top,
                    limit: top_level_limit,
                });
            }
            prev = Some((stage, upper_c));
            bands.push(Band::new(stage, upper_c, top, bottom, label));
        }
        for stage in Stage::TABLED {
            if !bands.iter().any(|b| b.stage == stage) {
                return Err(ProfileError::MissingStage(stage));
            }
        }
        Ok(Self { bands, cool })
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn cool(&self) -> &CoolCfg {
        &self.cool
    }

    /// Band selected for `temp_c` in `stage`, or `None` once the stage's exit
    /// threshold is reached (and for untabled stages).
    pub fn band_for(&self, stage: Stage, temp_c: f32) -> Option<&Band> {
        self.bands
            .iter()
            .filter(|b| b.stage == stage)
            .find(|b| temp_c < b.upper_c)
    }

    /// Temperature at which `stage` hands over to the next stage.
    pub fn exit_threshold(&self, stage: Stage) -> Option<f32> {
        self.bands
            .iter()
            .filter(|b| b.stage == stage)
            .map(|b| b.upper_c)
            .last()
    }

    /// Highest top level any band requests.
    pub fn max_top_level(&self) -> DutyLevel {
        self.bands
            .iter()
            .map(|b| b.levels.top)
            .max()
            .unwrap_or(DutyLevel::OFF)
    }
}

/// The stock lead-free profile.
///
/// The three Reflow sub-bands intentionally share identical levels.
pub fn default_rows() -> Vec<BandRow> {
    [
        (Stage::Preheat, 40.0, 0, 5, "Preheat1"),
        (Stage::Preheat, 100.0, 1, 5, "Preheat2"),
        (Stage::Preheat, 140.0, 3, 6, "Preheat3"),
        (Stage::Soak, 150.0, 1, 4, "Soak1"),
        (Stage::Soak, 170.0, 2, 5, "Soak2"),
        (Stage::Soak, 180.0, 2, 6, "Soak3"),
        (Stage::Reflow, 190.0, 3, 6, "Reflow1"),
        (Stage::Reflow, 200.0, 3, 6, "Reflow2"),
        (Stage::Reflow, 212.0, 3, 6, "Reflow3"),
    ]
    .into_iter()
    .map(|(stage, upper, top, bottom, label)| (stage, upper, top, bottom, label.to_string()))
    .collect()
}

impl Default for Profile {
    fn default() -> Self {
        let bands = default_rows()
            .into_iter()
            .map(|(stage, upper, top, bottom, label)| Band::new(stage, upper, top, bottom, label))
            .collect();
        Self {
            bands,
            cool: CoolCfg::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TOP_LEVEL_LIMIT;

    #[test]
    fn default_table_passes_validation() {
        let p = Profile::new(default_rows(), CoolCfg::default(), TOP_LEVEL_LIMIT).unwrap();
        assert_eq!(p, Profile::default());
        assert_eq!(p.max_top_level().get(), 3);
    }

    #[test]
    fn exit_thresholds_come_from_last_band() {
        let p = Profile::default();
        assert_eq!(p.exit_threshold(Stage::Preheat), Some(140.0));
        assert_eq!(p.exit_threshold(Stage::Soak), Some(180.0));
        assert_eq!(p.exit_threshold(Stage::Reflow), Some(212.0));
        assert_eq!(p.exit_threshold(Stage::Cool), None);
    }

    #[test]
    fn band_lookup_uses_exclusive_upper_bounds() {
        let p = Profile::default();
        assert_eq!(p.band_for(Stage::Preheat, 39.9).unwrap().label, "Preheat1");
        assert_eq!(p.band_for(Stage::Preheat, 40.0).unwrap().label, "Preheat2");
        assert!(p.band_for(Stage::Preheat, 140.0).is_none());
        assert_eq!(p.band_for(Stage::Soak, 20.0).unwrap().label, "Soak1");
    }
}
