pub mod error;
pub mod max6675;

use reflow_traits::{Channel, Clock, Heater, Thermocouple};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use crate::error::HwError;

/// Parameters of the first-order oven model used by the simulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalParams {
    pub ambient_c: f32,
    pub top_gain_c_per_s: f32,
    pub bottom_gain_c_per_s: f32,
    pub loss_per_s: f32,
}

impl Default for ThermalParams {
    fn default() -> Self {
        Self {
            ambient_c: 25.0,
            top_gain_c_per_s: 1.5,
            bottom_gain_c_per_s: 2.5,
            loss_per_s: 0.01,
        }
    }
}

/// Largest Euler step taken when catching the model up to the clock.
const MAX_STEP_S: f32 = 0.05;

/// dT/dt = gain_top*on_top + gain_bottom*on_bottom - loss*(T - ambient)
struct ThermalModel {
    params: ThermalParams,
    clock: Arc<dyn Clock + Send + Sync>,
    last: Instant,
    temperature_c: f32,
    on: [bool; 2],
}

impl ThermalModel {
    fn catch_up(&mut self) {
        let now = self.clock.now();
        let mut remaining = now.saturating_duration_since(self.last).as_secs_f32();
        self.last = now;
        let p = self.params;
        while remaining > 0.0 {
            let dt = remaining.min(MAX_STEP_S);
            let mut dtemp = -p.loss_per_s * (self.temperature_c - p.ambient_c);
            if self.on[0] {
                dtemp += p.top_gain_c_per_s;
            }
            if self.on[1] {
                dtemp += p.bottom_gain_c_per_s;
            }
            self.temperature_c += dtemp * dt;
            remaining -= dt;
        }
    }
}

/// Simulated oven: a thermocouple and a heater pair sharing one thermal
/// model driven by `clock`. Pair it with a `SimClock` for runs in virtual time.
pub struct SimulatedOven {
    model: Rc<RefCell<ThermalModel>>,
    fault_after: Option<u64>,
}

impl SimulatedOven {
    pub fn new(params: ThermalParams, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let last = clock.now();
        let model = ThermalModel {
            params,
            clock,
            last,
            temperature_c: params.ambient_c,
            on: [false; 2],
        };
        Self {
            model: Rc::new(RefCell::new(model)),
            fault_after: None,
        }
    }

    /// Make the thermocouple fail permanently after `n` good reads.
    pub fn with_fault_after(mut self, n: u64) -> Self {
        self.fault_after = Some(n);
        self
    }

    /// Current model temperature.
    pub fn temperature_c(&self) -> f32 {
        let mut m = self.model.borrow_mut();
        m.catch_up();
        m.temperature_c
    }

    /// Split into the two capabilities the controller consumes.
    pub fn split(self) -> (SimThermocouple, SimHeater) {
        (
            SimThermocouple {
                model: Rc::clone(&self.model),
                reads: Cell::new(0),
                fault_after: self.fault_after,
            },
            SimHeater { model: self.model },
        )
    }
}

pub struct SimThermocouple {
    model: Rc<RefCell<ThermalModel>>,
    reads: Cell<u64>,
    fault_after: Option<u64>,
}

impl Thermocouple for SimThermocouple {
    fn read(&mut self) -> Result<f32, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(limit) = self.fault_after
            && self.reads.get() >= limit
        {
            return Err(Box::new(HwError::OpenThermocouple));
        }
        self.reads.set(self.reads.get() + 1);
        let mut m = self.model.borrow_mut();
        m.catch_up();
        // Quantize like the MAX6675 does.
        let t = (m.temperature_c / max6675::LSB_C).round() * max6675::LSB_C;
        tracing::trace!(temp_c = t, "sim thermocouple read");
        Ok(t)
    }
}

pub struct SimHeater {
    model: Rc<RefCell<ThermalModel>>,
}

impl Heater for SimHeater {
    fn set(
        &mut self,
        channel: Channel,
        on: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut m = self.model.borrow_mut();
        m.catch_up();
        let slot = match channel {
            Channel::Top => 0,
            Channel::Bottom => 1,
        };
        m.on[slot] = on;
        Ok(())
    }
}

#[cfg(feature = "hardware")]
pub mod hardware {
    use reflow_traits::{Channel, Heater, Thermocouple};
    use rppal::gpio::{Gpio, OutputPin};

    use crate::error::HwError;
    use crate::max6675::Max6675;

    /// Two solid-state relays on GPIO outputs, active high.
    pub struct GpioHeater {
        top: OutputPin,
        bottom: OutputPin,
    }

    impl GpioHeater {
        pub fn try_new(top_pin: u8, bottom_pin: u8) -> Result<Self, HwError> {
            let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
            let top = gpio
                .get(top_pin)
                .map_err(|e| HwError::Gpio(e.to_string()))?
                .into_output_low();
            let bottom = gpio
                .get(bottom_pin)
                .map_err(|e| HwError::Gpio(e.to_string()))?
                .into_output_low();
            Ok(Self { top, bottom })
        }
    }

    impl Heater for GpioHeater {
        fn set(
            &mut self,
            channel: Channel,
            on: bool,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let pin = match channel {
                Channel::Top => &mut self.top,
                Channel::Bottom => &mut self.bottom,
            };
            if on {
                pin.set_high();
            } else {
                pin.set_low();
            }
            Ok(())
        }
    }

    impl Drop for GpioHeater {
        fn drop(&mut self) {
            self.top.set_low();
            self.bottom.set_low();
        }
    }

    pub struct HardwareThermocouple {
        chip: Max6675,
    }

    impl HardwareThermocouple {
        pub fn try_new(spi_bus: u8, spi_cs: u8) -> Result<Self, HwError> {
            Ok(Self {
                chip: Max6675::new(spi_bus, spi_cs)?,
            })
        }
    }

    impl Thermocouple for HardwareThermocouple {
        fn read(&mut self) -> Result<f32, Box<dyn std::error::Error + Send + Sync>> {
            match self.chip.read_celsius() {
                Ok(t) => {
                    tracing::debug!(temp_c = t, "max6675 sample");
                    Ok(t)
                }
                Err(e) => {
                    tracing::error!(error = %e, "thermocouple read error");
                    Err(Box::new(e))
                }
            }
        }
    }
}
