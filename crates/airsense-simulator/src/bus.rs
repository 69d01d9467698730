//! Simulated I2C bus carrying a BME280 and an SGP30.
//!
//! The BME280 is a register file holding the datasheet's example trim. Each
//! forced conversion fills the data registers from a slowly drifting model.
//! The SGP30 answers the command set used by the driver, with CRC words,
//! and reports the fixed 400 ppm / 0 ppb for its first 15 measurements.

use std::time::Instant;

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};
use log::{debug, trace};
use sensirion_i2c::crc8;

use airsense_core::sensors::bme280::registers;
use airsense_core::sensors::sgp30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimBusError {
    /// Nobody answered at this address.
    AddressNack,
    /// The device rejected the bytes written.
    DataNack,
    /// A read asked for more bytes than the device had queued.
    Overrun,
}

impl embedded_hal::i2c::Error for SimBusError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::AddressNack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            Self::DataNack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data),
            Self::Overrun => ErrorKind::Overrun,
        }
    }
}

pub struct SimulatedBus {
    bme280: SimBme280,
    sgp30: SimSgp30,
}

impl SimulatedBus {
    pub fn new() -> Self {
        let start = Instant::now();
        Self {
            bme280: SimBme280::new(start),
            sgp30: SimSgp30::new(start),
        }
    }
}

impl ErrorType for SimulatedBus {
    type Error = SimBusError;
}

impl I2c for SimulatedBus {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for operation in operations {
            match (address, operation) {
                (registers::DEFAULT_ADDRESS, Operation::Write(bytes)) => self.bme280.write(bytes)?,
                (registers::DEFAULT_ADDRESS, Operation::Read(buffer)) => self.bme280.read(buffer),
                (sgp30::DEFAULT_ADDRESS, Operation::Write(bytes)) => self.sgp30.write(bytes)?,
                (sgp30::DEFAULT_ADDRESS, Operation::Read(buffer)) => self.sgp30.read(buffer)?,
                _ => return Err(SimBusError::AddressNack),
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BME280
// ---------------------------------------------------------------------------

const CALIB_A: [u8; 26] = [
    0x70, 0x6B, 0x43, 0x67, 0x18, 0xFC, 0x7D, 0x8E, 0x43, 0xD6, 0xD0, 0x0B, 0x27, 0x0B, 0x8C, 0x00,
    0xF9, 0xFF, 0x8C, 0x3C, 0xF8, 0xC6, 0x70, 0x17, 0x00, 0x4B,
];
const CALIB_B: [u8; 7] = [0x6A, 0x01, 0x00, 0x13, 0x29, 0x03, 0x1E];

struct SimBme280 {
    regs: [u8; 256],
    pointer: u8,
    start: Instant,
}

impl SimBme280 {
    fn new(start: Instant) -> Self {
        let mut sim = Self {
            regs: [0; 256],
            pointer: 0,
            start,
        };
        sim.power_on();
        sim
    }

    fn power_on(&mut self) {
        self.regs = [0; 256];
        self.regs[registers::CHIP_ID as usize] = registers::EXPECTED_CHIP_ID;
        let a = registers::CALIB_A as usize;
        self.regs[a..a + CALIB_A.len()].copy_from_slice(&CALIB_A);
        let b = registers::CALIB_B as usize;
        self.regs[b..b + CALIB_B.len()].copy_from_slice(&CALIB_B);
        // Skipped channels read back as 0x80000 / 0x8000.
        self.regs[registers::DATA as usize..registers::DATA as usize + 8]
            .copy_from_slice(&[0x80, 0x00, 0x00, 0x80, 0x00, 0x00, 0x80, 0x00]);
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), SimBusError> {
        let Some((&register, values)) = bytes.split_first() else {
            return Ok(());
        };
        self.pointer = register;

        for (offset, &value) in values.iter().enumerate() {
            let register = register.wrapping_add(offset as u8);
            match register {
                registers::RESET if value == registers::SOFT_RESET_COMMAND => {
                    debug!("SIM BME280: soft reset");
                    self.power_on();
                }
                registers::CTRL_HUM | registers::CONFIG => self.regs[register as usize] = value,
                registers::CTRL_MEAS => {
                    self.regs[register as usize] = value;
                    if value & 0x03 != 0 {
                        self.convert();
                    }
                    // Forced mode drops back to sleep once the conversion is done.
                    if value & 0x03 != 0x03 {
                        self.regs[register as usize] &= !0x03;
                    }
                }
                _ => return Err(SimBusError::DataNack),
            }
        }
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) {
        if self.pointer == registers::DATA
            && self.regs[registers::CTRL_MEAS as usize] & 0x03 == 0x03
        {
            self.convert();
        }
        for (offset, byte) in buffer.iter_mut().enumerate() {
            *byte = self.regs[self.pointer.wrapping_add(offset as u8) as usize];
        }
    }

    /// Fill the data registers from the environment model.
    fn convert(&mut self) {
        let t = self.start.elapsed().as_secs_f64();
        let adc_t = (519_888.0 + 8_000.0 * (t / 120.0).sin()) as u32;
        let adc_p = (415_148.0 + 400.0 * (t / 300.0).sin()) as u32;
        let adc_h = (30_000.0 + 2_500.0 * (t / 180.0).sin() + 300.0 * (t / 23.0).cos()) as u16;
        trace!("SIM BME280: adc T {} P {} H {}", adc_t, adc_p, adc_h);

        let data = registers::DATA as usize;
        self.regs[data..data + 3].copy_from_slice(&adc20_bytes(adc_p));
        self.regs[data + 3..data + 6].copy_from_slice(&adc20_bytes(adc_t));
        self.regs[data + 6..data + 8].copy_from_slice(&adc_h.to_be_bytes());
    }
}

fn adc20_bytes(value: u32) -> [u8; 3] {
    [(value >> 12) as u8, (value >> 4) as u8, ((value & 0x0F) << 4) as u8]
}

// ---------------------------------------------------------------------------
// SGP30
// ---------------------------------------------------------------------------

const SGP30_SERIAL: [u16; 3] = [0x0000, 0x0123, 0x4567];
const SGP30_FEATURE_SET: u16 = 0x0022;
const SGP30_WARMUP_MEASUREMENTS: u32 = 15;

struct SimSgp30 {
    iaq_running: bool,
    measurements: u32,
    baseline: [u16; 2],
    absolute_humidity: u16,
    response: Vec<u8>,
    start: Instant,
}

impl SimSgp30 {
    fn new(start: Instant) -> Self {
        Self {
            iaq_running: false,
            measurements: 0,
            baseline: [0x8000, 0x8000],
            absolute_humidity: 0,
            response: Vec::new(),
            start,
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), SimBusError> {
        if bytes.len() < 2 || (bytes.len() - 2) % 3 != 0 {
            return Err(SimBusError::DataNack);
        }
        let command = u16::from_be_bytes([bytes[0], bytes[1]]);

        let mut args = Vec::new();
        for chunk in bytes[2..].chunks_exact(3) {
            if crc8::calculate(&chunk[..2]) != chunk[2] {
                return Err(SimBusError::DataNack);
            }
            args.push(u16::from_be_bytes([chunk[0], chunk[1]]));
        }

        self.response.clear();
        match (command, args.as_slice()) {
            (0x3682, []) => self.respond(&SGP30_SERIAL),
            (0x202F, []) => self.respond(&[SGP30_FEATURE_SET]),
            (0x2003, []) => {
                debug!("SIM SGP30: iaq_init");
                self.iaq_running = true;
                self.measurements = 0;
                self.baseline = [0x8000, 0x8000];
            }
            (0x2008, []) if self.iaq_running => {
                self.measurements += 1;
                let words = self.air_quality();
                self.respond(&words);
            }
            (0x2015, []) if self.iaq_running => {
                let baseline = self.baseline;
                self.respond(&baseline);
            }
            (0x201E, &[tvoc, eco2]) if self.iaq_running => {
                debug!("SIM SGP30: baseline set to {:#06x}/{:#06x}", eco2, tvoc);
                self.baseline = [eco2, tvoc];
            }
            (0x2061, &[humidity]) => {
                debug!("SIM SGP30: absolute humidity {}", humidity);
                self.absolute_humidity = humidity;
            }
            _ => return Err(SimBusError::DataNack),
        }
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<(), SimBusError> {
        if buffer.len() > self.response.len() {
            return Err(SimBusError::Overrun);
        }
        buffer.copy_from_slice(&self.response[..buffer.len()]);
        self.response.clear();
        Ok(())
    }

    fn respond(&mut self, words: &[u16]) {
        for word in words {
            let bytes = word.to_be_bytes();
            self.response.extend_from_slice(&bytes);
            self.response.push(crc8::calculate(&bytes));
        }
    }

    fn air_quality(&mut self) -> [u16; 2] {
        if self.measurements <= SGP30_WARMUP_MEASUREMENTS {
            return [400, 0];
        }

        let t = self.start.elapsed().as_secs_f64();
        // Drier air reads a little higher without compensation.
        let humidity_bias = if self.absolute_humidity == 0 { 40.0 } else { 0.0 };
        let eco2 = 450.0 + 120.0 * (t / 90.0).sin().abs() + humidity_bias;
        let tvoc = 20.0 + 35.0 * (t / 60.0).sin().abs();

        // The on-chip baseline drifts slowly toward the current reading.
        self.baseline[0] = self.baseline[0].wrapping_add(3);
        self.baseline[1] = self.baseline[1].wrapping_sub(1);

        [eco2 as u16, tvoc as u16]
    }
}
