/// ADS1115 single-shot driver over `embedded_hal::i2c::I2c`
///
/// Two converters share one bus. Each pin sensor and the machine pin is a
/// single-ended input on one of them.
use embedded_hal::i2c::I2c;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;

use super::{AnalogChannel, AnalogFrontEnd};
use crate::error::HardwareError;

const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

/// Start a single conversion / conversion finished.
const OS_BIT: u16 = 0x8000;
/// PGA +-6.144 V, single-shot, 860 SPS, comparator off.
const CONFIG_BASE: u16 = 0x0100 | 0x00E0 | 0x0003;
const FULL_SCALE_VOLTS: f32 = 6.144;
const CONVERSION_POLLS: u32 = 10;

/// One single-ended input on one of the two converters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdcInput {
    /// Converter index (0 or 1)
    pub adc: u8,
    /// Input AIN0..AIN3
    pub input: u8,
}

impl AdcInput {
    pub const fn new(adc: u8, input: u8) -> Self {
        Self { adc, input }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Ads1115 {
    address: u8,
}

impl Ads1115 {
    pub fn new(address: u8) -> Self {
        Self { address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Read the config register to confirm the converter answers.
    pub fn probe<I2C: I2c>(&self, bus: &mut I2C) -> Result<u16, I2C::Error> {
        self.read_register(bus, REG_CONFIG)
    }

    /// Single-shot conversion of AIN`input` against ground, in volts.
    pub fn read_single_ended<I2C: I2c>(&self, bus: &mut I2C, input: u8) -> Result<f32, I2C::Error> {
        let mux = (0x4 | u16::from(input & 0x3)) << 12;
        let config = OS_BIT | mux | CONFIG_BASE;
        bus.write(self.address, &[REG_CONFIG, (config >> 8) as u8, config as u8])?;

        for _ in 0..CONVERSION_POLLS {
            if self.read_register(bus, REG_CONFIG)? & OS_BIT != 0 {
                break;
            }
            thread::sleep(Duration::from_micros(500));
        }

        let raw = self.read_register(bus, REG_CONVERSION)? as i16;
        Ok(raw_to_volts(raw))
    }

    fn read_register<I2C: I2c>(&self, bus: &mut I2C, register: u8) -> Result<u16, I2C::Error> {
        let mut buf = [0u8; 2];
        bus.write_read(self.address, &[register], &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }
}

fn raw_to_volts(raw: i16) -> f32 {
    f32::from(raw) * FULL_SCALE_VOLTS / 32768.0
}

/// Both converters plus the channel wiring of the lane.
pub struct AdcFrontEnd<I2C> {
    bus: I2C,
    adcs: [Ads1115; 2],
    pins: [AdcInput; 5],
    machine_pin: AdcInput,
}

impl<I2C> AdcFrontEnd<I2C>
where
    I2C: I2c,
{
    /// Probe both converters; fails if either does not answer.
    pub fn open(mut bus: I2C, addresses: [u8; 2], pins: [AdcInput; 5], machine_pin: AdcInput) -> Result<Self, HardwareError> {
        let adcs = [Ads1115::new(addresses[0]), Ads1115::new(addresses[1])];
        for adc in &adcs {
            adc.probe(&mut bus).map_err(|e| HardwareError::ReadFailed {
                what: format!("ADS1115 at {:#04x}", adc.address()),
                source: format!("{e:?}").into(),
            })?;
        }
        Ok(Self {
            bus,
            adcs,
            pins,
            machine_pin,
        })
    }

    fn input_for(&self, channel: AnalogChannel) -> AdcInput {
        match channel {
            AnalogChannel::Pin(position) => self.pins[position.index()],
            AnalogChannel::MachinePin => self.machine_pin,
        }
    }
}

impl<I2C> AnalogFrontEnd for AdcFrontEnd<I2C>
where
    I2C: I2c + Send,
{
    fn read_voltage(&mut self, channel: AnalogChannel) -> Result<f32, HardwareError> {
        let input = self.input_for(channel);
        let adc = self.adcs[usize::from(input.adc.min(1))];
        adc.read_single_ended(&mut self.bus, input.input)
            .map_err(|e| HardwareError::ReadFailed {
                what: format!("{channel:?} (ADS1115 {:#04x} AIN{})", adc.address(), input.input),
                source: format!("{e:?}").into(),
            })
    }
}
