//! MAX6675 K-type thermocouple converter.
//!
//! The chip shifts out one 16-bit frame per read, MSB first:
//!
//! | bit   | meaning                          |
//! |-------|----------------------------------|
//! | 15    | dummy sign bit, always 0         |
//! | 14..3 | temperature, 0.25 °C per count   |
//! | 2     | thermocouple input open          |
//! | 1     | device id, always 0              |
//! | 0     | tri-state                        |

use crate::error::{HwError, Result};

/// Degrees Celsius per count.
pub const LSB_C: f32 = 0.25;

const OPEN_BIT: u16 = 1 << 2;
const FIXED_ZERO_BITS: u16 = (1 << 15) | (1 << 1);

/// Decode a raw frame into degrees Celsius.
pub fn decode(frame: u16) -> Result<f32> {
    if frame & FIXED_ZERO_BITS != 0 {
        return Err(HwError::Frame(frame));
    }
    if frame & OPEN_BIT != 0 {
        return Err(HwError::OpenThermocouple);
    }
    let counts = (frame >> 3) & 0x0FFF;
    Ok(f32::from(counts) * LSB_C)
}

#[cfg(feature = "hardware")]
pub use driver::Max6675;

#[cfg(feature = "hardware")]
mod driver {
    use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
    use tracing::trace;

    use super::decode;
    use crate::error::{HwError, Result};

    /// Max SCK for the MAX6675 is 4.3 MHz; stay well below.
    const CLOCK_HZ: u32 = 1_000_000;

    pub struct Max6675 {
        spi: Spi,
    }

    impl Max6675 {
        pub fn new(bus: u8, cs: u8) -> Result<Self> {
            let bus = match bus {
                0 => Bus::Spi0,
                1 => Bus::Spi1,
                2 => Bus::Spi2,
                other => return Err(HwError::Spi(format!("unsupported spi bus {other}"))),
            };
            let ss = match cs {
                0 => SlaveSelect::Ss0,
                1 => SlaveSelect::Ss1,
                2 => SlaveSelect::Ss2,
                other => return Err(HwError::Spi(format!("unsupported chip select {other}"))),
            };
            let spi = Spi::new(bus, ss, CLOCK_HZ, Mode::Mode0)
                .map_err(|e| HwError::Spi(e.to_string()))?;
            Ok(Self { spi })
        }

        pub fn read_frame(&mut self) -> Result<u16> {
            let mut buf = [0u8; 2];
            self.spi
                .read(&mut buf)
                .map_err(|e| HwError::Spi(e.to_string()))?;
            let frame = u16::from_be_bytes(buf);
            trace!(frame, "max6675 frame");
            Ok(frame)
        }

        pub fn read_celsius(&mut self) -> Result<f32> {
            decode(self.read_frame()?)
        }
    }
}
