use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("spi error: {0}")]
    Spi(String),
    #[error("thermocouple input open")]
    OpenThermocouple,
    #[error("malformed max6675 frame {0:#06x}")]
    Frame(u16),
}

pub type Result<T> = std::result::Result<T, HwError>;
