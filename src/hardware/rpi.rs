/// Raspberry Pi backend
///
/// GPIO through `rppal::gpio`, the two converters on `rppal::i2c` through
/// its embedded-hal implementation.
use rppal::gpio::{self, Gpio, InputPin, OutputPin};
use rppal::i2c::I2c;
use std::time::Duration;

use super::{init_with_retry, ActuatorBank, ActuatorLine, AdcFrontEnd, BallInput, Level};
use crate::config::WiringConfig;
use crate::error::HardwareError;

fn claim(gpio: &Gpio, line: u8) -> Result<gpio::Pin, HardwareError> {
    gpio.get(line).map_err(|e| HardwareError::ClaimFailed {
        line,
        source: Box::new(e),
    })
}

fn open_gpio() -> Result<Gpio, HardwareError> {
    Gpio::new().map_err(|e| HardwareError::Unavailable(format!("GPIO: {e}")))
}

/// Ball-presence sensor on one input line, pulled down.
pub struct GpioBallInput {
    pin: InputPin,
}

impl GpioBallInput {
    pub fn open(line: u8) -> Result<Self, HardwareError> {
        let gpio = open_gpio()?;
        let pin = claim(&gpio, line)?.into_input_pulldown();
        tracing::info!(target: "five_pin_lane::sensor", "Ball sensor on GPIO {line}");
        Ok(Self { pin })
    }
}

impl BallInput for GpioBallInput {
    fn read(&mut self) -> Result<Level, HardwareError> {
        Ok(match self.pin.read() {
            gpio::Level::High => Level::High,
            gpio::Level::Low => Level::Low,
        })
    }
}

/// Break lines and reset line, all idle high.
pub struct GpioActuators {
    breaks: Vec<OutputPin>,
    reset: OutputPin,
}

impl GpioActuators {
    pub fn open(wiring: &WiringConfig) -> Result<Self, HardwareError> {
        let gpio = open_gpio()?;
        let breaks = wiring
            .break_gpios
            .iter()
            .map(|line| claim(&gpio, *line).map(|pin| pin.into_output_high()))
            .collect::<Result<Vec<_>, _>>()?;
        let reset = claim(&gpio, wiring.reset_gpio)?.into_output_high();
        Ok(Self { breaks, reset })
    }
}

impl ActuatorBank for GpioActuators {
    fn drive(&mut self, line: ActuatorLine, level: Level) -> Result<(), HardwareError> {
        let pin = match line {
            ActuatorLine::Reset => &mut self.reset,
            ActuatorLine::Break(position) => self
                .breaks
                .get_mut(position.index())
                .ok_or_else(|| HardwareError::Unavailable(format!("no break line for {position}")))?,
        };
        match level {
            Level::High => pin.set_high(),
            Level::Low => pin.set_low(),
        }
        Ok(())
    }
}

/// Open the I2C bus and both converters, retrying per the wiring config.
pub fn open_adc_front_end(wiring: &WiringConfig) -> Result<AdcFrontEnd<I2c>, HardwareError> {
    init_with_retry(
        wiring.adc_init_attempts,
        Duration::from_millis(wiring.adc_init_backoff_ms),
        |_| {
            let bus = I2c::with_bus(wiring.i2c_bus).map_err(|e| HardwareError::ReadFailed {
                what: format!("I2C bus {}", wiring.i2c_bus),
                source: Box::new(e),
            })?;
            AdcFrontEnd::open(bus, wiring.adc_addresses, wiring.pin_inputs, wiring.machine_pin_input)
        },
    )
}
