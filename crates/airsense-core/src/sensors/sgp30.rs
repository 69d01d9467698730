//! Async SGP30 gas sensor driver.
//!
//! Commands are 16-bit words; every data word on the wire is followed by a
//! Sensirion CRC-8. The on-chip IAQ algorithm expects `measure_iaq` about
//! once per second after `iaq_init`, and reports 400 ppm / 0 ppb for the
//! first ~15 s.

use embedded_hal::i2c::Error as _;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{debug, error, info};
use sensirion_i2c::crc8;

use super::{AirQuality, DeviceError, GasSensor};
use crate::storage::BaselineRecord;

const SENSOR: &str = "SGP30";

/// Product type lives in the top nibble of the feature set; SGP30 is 0.
const PRODUCT_TYPE_MASK: u16 = 0xF000;

pub const DEFAULT_ADDRESS: u8 = 0x58;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    IaqInit,
    MeasureIaq,
    GetIaqBaseline,
    SetIaqBaseline,
    SetAbsoluteHumidity,
    GetFeatureSet,
    GetSerialId,
}

impl Command {
    const fn code(self) -> u16 {
        match self {
            Self::IaqInit => 0x2003,
            Self::MeasureIaq => 0x2008,
            Self::GetIaqBaseline => 0x2015,
            Self::SetIaqBaseline => 0x201E,
            Self::SetAbsoluteHumidity => 0x2061,
            Self::GetFeatureSet => 0x202F,
            Self::GetSerialId => 0x3682,
        }
    }

    /// Maximum execution time before the result can be read.
    const fn duration_us(self) -> u32 {
        match self {
            Self::MeasureIaq => 12_000,
            _ => 10_000,
        }
    }

    const fn operation(self) -> &'static str {
        match self {
            Self::IaqInit => "iaq_init",
            Self::MeasureIaq => "measure_iaq",
            Self::GetIaqBaseline => "get_iaq_baseline",
            Self::SetIaqBaseline => "set_iaq_baseline",
            Self::SetAbsoluteHumidity => "set_absolute_humidity",
            Self::GetFeatureSet => "get_feature_set",
            Self::GetSerialId => "get_serial_id",
        }
    }
}

/// Absolute humidity in g/m³ as unsigned 8.8 fixed point, from relative
/// humidity and temperature (Magnus formula).
pub fn absolute_humidity_fixed(humidity_percent: f32, temperature_c: f32) -> u16 {
    let saturation_hpa = 6.112 * libm::expf(17.62 * temperature_c / (243.12 + temperature_c));
    let vapour_hpa = humidity_percent / 100.0 * saturation_hpa;
    let grams_per_m3 = 216.7 * vapour_hpa / (273.15 + temperature_c);
    // Float-to-int casts saturate, and NaN becomes 0.
    (grams_per_m3 * 256.0) as u16
}

pub struct Sgp30<I, D> {
    i2c: I,
    delay: D,
    address: u8,
    initialized: bool,
}

impl<I: I2c, D: DelayNs> Sgp30<I, D> {
    pub fn new(i2c: I, delay: D, address: u8) -> Self {
        Self {
            i2c,
            delay,
            address,
            initialized: false,
        }
    }

    /// Log the serial number, check the product type and start the IAQ
    /// algorithm.
    ///
    /// Restarting the algorithm resets its baseline, so this runs once; the
    /// trait methods call it lazily on first use.
    pub async fn init(&mut self) -> Result<(), DeviceError> {
        let serial = self.serial().await?;
        info!("SGP30: serial {:#014x}", serial);

        let features = self.feature_set().await?;
        if features & PRODUCT_TYPE_MASK != 0 {
            error!("SGP30: feature set {:#06x} is not an SGP30", features);
            return Err(DeviceError::NotFound {
                sensor: SENSOR,
                chip_id: (features >> 12) as u8,
            });
        }

        self.write_command(Command::IaqInit, &[]).await?;
        self.initialized = true;
        info!("SGP30: IAQ algorithm started");

        Ok(())
    }

    /// 48-bit serial number.
    pub async fn serial(&mut self) -> Result<u64, DeviceError> {
        let mut words = [0u16; 3];
        self.read_words(Command::GetSerialId, &mut words).await?;
        Ok(((words[0] as u64) << 32) | ((words[1] as u64) << 16) | words[2] as u64)
    }

    /// Product type and version word.
    pub async fn feature_set(&mut self) -> Result<u16, DeviceError> {
        let mut words = [0u16; 1];
        self.read_words(Command::GetFeatureSet, &mut words).await?;
        Ok(words[0])
    }

    pub async fn measure_iaq(&mut self) -> Result<AirQuality, DeviceError> {
        let mut words = [0u16; 2];
        self.read_words(Command::MeasureIaq, &mut words).await?;
        Ok(AirQuality {
            eco2_ppm: words[0],
            tvoc_ppb: words[1],
        })
    }

    pub async fn iaq_baseline(&mut self) -> Result<BaselineRecord, DeviceError> {
        let mut words = [0u16; 2];
        self.read_words(Command::GetIaqBaseline, &mut words).await?;
        Ok(BaselineRecord {
            eco2_baseline: words[0],
            tvoc_baseline: words[1],
        })
    }

    /// Restore a baseline. The chip takes the TVOC word first.
    pub async fn set_iaq_baseline(&mut self, baseline: BaselineRecord) -> Result<(), DeviceError> {
        self.write_command(
            Command::SetIaqBaseline,
            &[baseline.tvoc_baseline, baseline.eco2_baseline],
        )
        .await
    }

    /// Set humidity compensation, 8.8 fixed point g/m³. Zero disables it.
    pub async fn set_absolute_humidity(&mut self, fixed: u16) -> Result<(), DeviceError> {
        self.write_command(Command::SetAbsoluteHumidity, &[fixed]).await
    }

    async fn ensure_initialized(&mut self) -> Result<(), DeviceError> {
        if !self.initialized {
            self.init().await.map_err(|e| {
                error!("SGP30 initialization failed: {}", e);
                e
            })?;
        }
        Ok(())
    }

    /// Send a command with up to two argument words, then wait for it.
    async fn write_command(&mut self, command: Command, args: &[u16]) -> Result<(), DeviceError> {
        let mut buffer = [0u8; 8];
        let code = command.code().to_be_bytes();
        buffer[..2].copy_from_slice(&code);

        let mut len = 2;
        for word in args.iter().take(2) {
            let bytes = word.to_be_bytes();
            buffer[len..len + 2].copy_from_slice(&bytes);
            buffer[len + 2] = crc8::calculate(&bytes);
            len += 3;
        }

        self.i2c
            .write(self.address, &buffer[..len])
            .await
            .map_err(|e| {
                error!("SGP30 {} failed: {:?}", command.operation(), e.kind());
                DeviceError::BusFault {
                    sensor: SENSOR,
                    operation: command.operation(),
                }
            })?;

        self.delay.delay_us(command.duration_us()).await;
        Ok(())
    }

    /// Run a command and read `words.len()` CRC-checked words back.
    async fn read_words(&mut self, command: Command, words: &mut [u16]) -> Result<(), DeviceError> {
        self.write_command(command, &[]).await?;

        let mut buffer = [0u8; 9];
        let len = words.len().min(3) * 3;
        self.i2c
            .read(self.address, &mut buffer[..len])
            .await
            .map_err(|e| {
                error!("SGP30 {} read failed: {:?}", command.operation(), e.kind());
                DeviceError::BusFault {
                    sensor: SENSOR,
                    operation: command.operation(),
                }
            })?;

        for (word, chunk) in words.iter_mut().zip(buffer[..len].chunks_exact(3)) {
            if crc8::calculate(&chunk[..2]) != chunk[2] {
                error!(
                    "SGP30 {}: CRC mismatch on {:02x?}",
                    command.operation(),
                    chunk
                );
                return Err(DeviceError::Crc {
                    sensor: SENSOR,
                    operation: command.operation(),
                });
            }
            *word = u16::from_be_bytes([chunk[0], chunk[1]]);
        }

        Ok(())
    }
}

impl<I, D> Sgp30<I, D> {
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }
}

impl<I: I2c, D: DelayNs> GasSensor for Sgp30<I, D> {
    async fn set_relative_humidity(
        &mut self,
        humidity_percent: f32,
        temperature_c: f32,
    ) -> Result<(), DeviceError> {
        self.ensure_initialized().await?;
        let fixed = absolute_humidity_fixed(humidity_percent, temperature_c);
        debug!(
            "SGP30: humidity compensation {} ({:.1} %RH at {:.2} C)",
            fixed, humidity_percent, temperature_c
        );
        self.set_absolute_humidity(fixed).await
    }

    async fn measure(&mut self) -> Result<AirQuality, DeviceError> {
        self.ensure_initialized().await?;
        self.measure_iaq().await
    }

    async fn baseline(&mut self) -> Result<BaselineRecord, DeviceError> {
        self.ensure_initialized().await?;
        self.iaq_baseline().await
    }

    async fn set_baseline(&mut self, baseline: BaselineRecord) -> Result<(), DeviceError> {
        self.ensure_initialized().await?;
        self.set_iaq_baseline(baseline).await
    }
}
