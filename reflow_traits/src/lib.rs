pub mod clock;

pub use clock::{Clock, MonotonicClock, SimClock};

/// One of the two independently switched heating elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Top,
    Bottom,
}

impl Channel {
    /// Both channels in actuation order.
    pub const ALL: [Channel; 2] = [Channel::Top, Channel::Bottom];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Top => "top",
            Channel::Bottom => "bottom",
        }
    }
}

/// Oven temperature probe. `Err` means the probe could not produce a reading
/// (open thermocouple, bus error); callers must never coerce it into a number.
pub trait Thermocouple {
    fn read(&mut self) -> Result<f32, Box<dyn std::error::Error + Send + Sync>>;
}

/// On/off heater outputs. Writes are idempotent and fire-and-forget.
pub trait Heater {
    fn set(
        &mut self,
        channel: Channel,
        on: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: Thermocouple + ?Sized> Thermocouple for Box<T> {
    fn read(&mut self) -> Result<f32, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read()
    }
}

impl<H: Heater + ?Sized> Heater for Box<H> {
    fn set(
        &mut self,
        channel: Channel,
        on: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set(channel, on)
    }
}
