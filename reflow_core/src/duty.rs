//! Quantized duty levels.

use reflow_traits::Channel;

use crate::error::ReflowError;

/// Number of equal sub-slices in one control tick.
pub const SLICES: u8 = 6;

/// Fraction of a tick a channel is energized, in sixths.
///
/// Level L is ON during sub-slices 1..=L and OFF for L+1..=6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DutyLevel(u8);

impl DutyLevel {
    pub const OFF: Self = Self(0);
    pub const FULL: Self = Self(SLICES);

    /// Returns `None` when `level` is above 6.
    pub const fn new(level: u8) -> Option<Self> {
        if level <= SLICES {
            Some(Self(level))
        } else {
            None
        }
    }

    /// Clamp to the valid range.
    pub const fn saturating(level: u8) -> Self {
        if level <= SLICES {
            Self(level)
        } else {
            Self(SLICES)
        }
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Whether the channel is ON during 1-indexed sub-slice `slice`.
    #[inline]
    pub const fn asserted_at(self, slice: u8) -> bool {
        self.0 >= slice
    }

    /// ON/OFF pattern across the six sub-slices of a tick.
    pub fn pattern(self) -> [bool; SLICES as usize] {
        let mut out = [false; SLICES as usize];
        for (i, on) in out.iter_mut().enumerate() {
            *on = self.asserted_at(i as u8 + 1);
        }
        out
    }

    /// Fraction of the tick this level keeps the channel on.
    pub fn ratio(self) -> f32 {
        f32::from(self.0) / f32::from(SLICES)
    }
}

impl TryFrom<u8> for DutyLevel {
    type Error = ReflowError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level).ok_or(ReflowError::InvalidDutyLevel(level))
    }
}

/// Duty level for each heater channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Levels {
    pub top: DutyLevel,
    pub bottom: DutyLevel,
}

impl Levels {
    pub const OFF: Self = Self {
        top: DutyLevel::OFF,
        bottom: DutyLevel::OFF,
    };

    pub const fn new(top: DutyLevel, bottom: DutyLevel) -> Self {
        Self { top, bottom }
    }

    pub fn get(&self, channel: Channel) -> DutyLevel {
        match channel {
            Channel::Top => self.top,
            Channel::Bottom => self.bottom,
        }
    }
}
