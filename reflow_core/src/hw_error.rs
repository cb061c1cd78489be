//! Maps `Box<dyn Error>` from trait boundaries to typed `ReflowError`.
//!
//! The traits in `reflow_traits` use `Box<dyn Error + Send + Sync>` for maximum
//! flexibility; this module converts those to our typed error enum, with an
//! optional feature-gated path for `reflow_hardware::HwError` downcasting.

use crate::error::ReflowError;

/// Map a heater-side trait error to a typed `ReflowError`.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ReflowError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<reflow_hardware::error::HwError>() {
            return match hw {
                reflow_hardware::error::HwError::Gpio(_) => ReflowError::Hardware(hw.to_string()),
                other => ReflowError::HardwareFault(other.to_string()),
            };
        }
    }
    ReflowError::Hardware(e.to_string())
}

/// Describe a thermocouple read failure for telemetry.
pub fn fault_message(e: &(dyn std::error::Error + 'static)) -> String {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<reflow_hardware::error::HwError>() {
            return match hw {
                reflow_hardware::error::HwError::OpenThermocouple => {
                    "thermocouple open circuit".to_string()
                }
                other => other.to_string(),
            };
        }
    }
    let s = e.to_string();
    if s.is_empty() {
        "sensor read failed".to_string()
    } else {
        s
    }
}
