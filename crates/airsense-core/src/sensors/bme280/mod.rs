//! Async BME280 temperature/humidity/pressure driver.
//!
//! Initialization order is fixed by the chip: the identity register is
//! checked first, the factory trim is read once, and only then are the
//! measurement registers written. Every read of measurement data is a single
//! burst over 0xF7..=0xFE so that the three channels belong to the same
//! conversion.

pub mod calibration;
pub mod codec;
pub mod compensation;
pub mod registers;
pub mod settings;

use embedded_hal::i2c::Error as _;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{debug, error, info};

use super::{DeviceError, EnvironmentSensor};
use calibration::CalibrationCoefficients;

pub use compensation::CompensatedSample;
pub use settings::{Bme280Config, Filter, Mode, Oversampling, Standby};

const SENSOR: &str = "BME280";

/// Maximum number of status polls while waiting for a conversion or NVM copy.
const STATUS_POLL_ATTEMPTS: u32 = 10;
const STATUS_POLL_INTERVAL_US: u32 = 2_000;
/// Start-up time after a soft reset.
const RESET_DELAY_US: u32 = 2_000;

/// Raw ADC values from one burst read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    /// 20-bit
    pub adc_temperature: u32,
    /// 20-bit
    pub adc_pressure: u32,
    pub adc_humidity: u16,
}

impl RawSample {
    /// Reassemble the raw values from the 8-byte data block.
    pub const fn from_data_block(data: &[u8; registers::DATA_LEN]) -> Self {
        Self {
            adc_pressure: adc20(data[0], data[1], data[2]),
            adc_temperature: adc20(data[3], data[4], data[5]),
            adc_humidity: ((data[6] as u16) << 8) | data[7] as u16,
        }
    }
}

#[inline]
const fn adc20(msb: u8, lsb: u8, xlsb: u8) -> u32 {
    ((msb as u32) << 12) | ((lsb as u32) << 4) | ((xlsb as u32) >> 4)
}

/// Whether the measurement registers hold a complete configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigState {
    Uninitialized,
    Configured,
}

pub struct Bme280<I, D> {
    i2c: I,
    delay: D,
    address: u8,
    calibration: Option<CalibrationCoefficients>,
    config: Bme280Config,
    state: ConfigState,
}

impl<I: I2c, D: DelayNs> Bme280<I, D> {
    /// Create a driver. Does not talk to the sensor.
    pub fn new(i2c: I, delay: D, address: u8) -> Self {
        Self {
            i2c,
            delay,
            address,
            calibration: None,
            config: Bme280Config::default(),
            state: ConfigState::Uninitialized,
        }
    }

    /// Verify the chip, reset it, load the factory trim and apply `config`.
    ///
    /// On a chip-id mismatch nothing else is sent to the device.
    pub async fn init(&mut self, config: Bme280Config) -> Result<(), DeviceError> {
        self.verify_chip_id().await?;
        self.soft_reset().await?;

        let calibration = self.load_calibration().await?;
        self.calibration = Some(calibration);
        debug!("BME280: calibration {:?}", calibration);

        self.configure(config).await?;
        info!("BME280: initialized at address {:#04x}", self.address);

        Ok(())
    }

    pub async fn verify_chip_id(&mut self) -> Result<(), DeviceError> {
        let mut id = [0u8; 1];
        self.read_into(registers::CHIP_ID, &mut id, "read chip id").await?;

        if id[0] != registers::EXPECTED_CHIP_ID {
            error!(
                "BME280: chip id {:#04x} does not match {:#04x}",
                id[0],
                registers::EXPECTED_CHIP_ID
            );
            return Err(DeviceError::NotFound {
                sensor: SENSOR,
                chip_id: id[0],
            });
        }

        Ok(())
    }

    /// Reset the device and wait until the trim has been copied out of NVM.
    ///
    /// Clears the configuration; `configure` has to run again afterwards.
    pub async fn soft_reset(&mut self) -> Result<(), DeviceError> {
        self.write_reg(registers::RESET, registers::SOFT_RESET_COMMAND, "soft reset").await?;
        self.state = ConfigState::Uninitialized;
        self.delay.delay_us(RESET_DELAY_US).await;

        self.wait_status_clear(registers::STATUS_IM_UPDATE, "NVM copy").await
    }

    /// Read and decode both calibration blocks.
    pub async fn load_calibration(&mut self) -> Result<CalibrationCoefficients, DeviceError> {
        let mut block_a = [0u8; registers::CALIB_A_LEN];
        self.read_into(registers::CALIB_A, &mut block_a, "read calibration block A").await?;

        let mut block_b = [0u8; registers::CALIB_B_LEN];
        self.read_into(registers::CALIB_B, &mut block_b, "read calibration block B").await?;

        Ok(CalibrationCoefficients::from_blocks(&block_a, &block_b))
    }

    /// Write the measurement configuration.
    ///
    /// ctrl_hum only latches on the following ctrl_meas write, so the order
    /// is ctrl_hum, config, ctrl_meas. A failed write leaves the driver
    /// unconfigured.
    pub async fn configure(&mut self, config: Bme280Config) -> Result<(), DeviceError> {
        if self.calibration.is_none() {
            return Err(DeviceError::NotInitialized { sensor: SENSOR });
        }

        self.state = ConfigState::Uninitialized;

        self.write_reg(registers::CTRL_HUM, config.ctrl_hum(), "write ctrl_hum").await?;
        self.write_reg(registers::CONFIG, config.config(), "write config").await?;
        self.write_reg(registers::CTRL_MEAS, config.ctrl_meas(), "write ctrl_meas").await?;

        self.config = config;
        self.state = ConfigState::Configured;
        debug!("BME280: configured {:?}", config);

        Ok(())
    }

    /// Burst-read the data registers.
    ///
    /// Outside normal mode the conversion must already have been started;
    /// this waits for the measuring bit to clear first.
    pub async fn read_raw(&mut self, mode: Mode) -> Result<RawSample, DeviceError> {
        if mode != Mode::Normal {
            self.wait_status_clear(registers::STATUS_MEASURING, "conversion").await?;
        }

        let mut data = [0u8; registers::DATA_LEN];
        self.read_into(registers::DATA, &mut data, "burst read data registers").await?;

        let raw = RawSample::from_data_block(&data);
        debug!("BME280: raw {:?}", raw);

        Ok(raw)
    }

    /// Take one compensated measurement.
    ///
    /// In forced and sleep mode this triggers a one-shot conversion and waits
    /// for it; in normal mode it returns the latest completed conversion.
    pub async fn measure(&mut self) -> Result<CompensatedSample, DeviceError> {
        let calibration = self
            .calibration
            .ok_or(DeviceError::NotInitialized { sensor: SENSOR })?;
        if self.state != ConfigState::Configured {
            return Err(DeviceError::NotConfigured { sensor: SENSOR });
        }

        let mode = self.config.mode;
        if mode != Mode::Normal {
            self.trigger_forced().await?;
        }

        let raw = self.read_raw(mode).await?;
        Ok(CompensatedSample::compute(&raw, &calibration))
    }

    async fn trigger_forced(&mut self) -> Result<(), DeviceError> {
        let ctrl_meas = self.config.ctrl_meas_with_mode(Mode::Forced);
        self.write_reg(registers::CTRL_MEAS, ctrl_meas, "trigger forced conversion").await?;
        self.delay
            .delay_us(self.config.max_measurement_time_us())
            .await;
        Ok(())
    }

    async fn wait_status_clear(
        &mut self,
        mask: u8,
        operation: &'static str,
    ) -> Result<(), DeviceError> {
        let mut status = [0u8; 1];
        for _ in 0..STATUS_POLL_ATTEMPTS {
            self.read_into(registers::STATUS, &mut status, "read status").await?;
            if status[0] & mask == 0 {
                return Ok(());
            }
            self.delay.delay_us(STATUS_POLL_INTERVAL_US).await;
        }

        error!(
            "BME280: status {:#04x} still busy after {} polls",
            status[0], STATUS_POLL_ATTEMPTS
        );
        Err(DeviceError::ConversionTimeout {
            sensor: SENSOR,
            operation,
        })
    }

    async fn read_into(
        &mut self,
        register: u8,
        buffer: &mut [u8],
        operation: &'static str,
    ) -> Result<(), DeviceError> {
        self.i2c
            .write_read(self.address, &[register], buffer)
            .await
            .map_err(|e| {
                error!("BME280 {} failed: {:?}", operation, e.kind());
                DeviceError::BusFault {
                    sensor: SENSOR,
                    operation,
                }
            })
    }

    async fn write_reg(
        &mut self,
        register: u8,
        value: u8,
        operation: &'static str,
    ) -> Result<(), DeviceError> {
        self.i2c
            .write(self.address, &[register, value])
            .await
            .map_err(|e| {
                error!("BME280 {} failed: {:?}", operation, e.kind());
                DeviceError::BusFault {
                    sensor: SENSOR,
                    operation,
                }
            })
    }
}

impl<I, D> Bme280<I, D> {
    pub fn state(&self) -> ConfigState {
        self.state
    }

    pub fn config(&self) -> &Bme280Config {
        &self.config
    }

    pub fn calibration(&self) -> Option<&CalibrationCoefficients> {
        self.calibration.as_ref()
    }

    /// Give back the bus and delay.
    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }
}

impl<I: I2c, D: DelayNs> EnvironmentSensor for Bme280<I, D> {
    async fn measure(&mut self) -> Result<CompensatedSample, DeviceError> {
        Bme280::measure(self).await
    }
}
