pub mod bme280;
pub mod sgp30;

use thiserror_no_std::Error;

use crate::storage::BaselineRecord;

/// Errors raised by the sensor drivers.
///
/// The underlying bus error is logged where it happens and then dropped, so
/// every variant only carries which sensor failed and during what.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    #[error("{sensor}: unexpected chip id {chip_id:#04x}")]
    NotFound { sensor: &'static str, chip_id: u8 },
    #[error("{sensor}: bus fault during {operation}")]
    BusFault {
        sensor: &'static str,
        operation: &'static str,
    },
    #[error("{sensor}: timed out waiting for {operation}")]
    ConversionTimeout {
        sensor: &'static str,
        operation: &'static str,
    },
    #[error("{sensor}: CRC mismatch during {operation}")]
    Crc {
        sensor: &'static str,
        operation: &'static str,
    },
    #[error("{sensor}: calibration has not been loaded")]
    NotInitialized { sensor: &'static str },
    #[error("{sensor}: sensor is not configured")]
    NotConfigured { sensor: &'static str },
}

/// Gas readings from the secondary sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AirQuality {
    pub eco2_ppm: u16,
    pub tvoc_ppb: u16,
}

/// Trait for the environmental sensor that drives the compensation chain.
pub trait EnvironmentSensor {
    /// Take one compensated temperature/pressure/humidity measurement.
    fn measure(&mut self) -> impl Future<Output = Result<CompensatedSample, DeviceError>>;
}

/// Trait for the gas sensor whose drift compensation is fed by the
/// environmental sensor.
pub trait GasSensor {
    /// Feed the current relative humidity and temperature into the sensor's
    /// humidity compensation.
    fn set_relative_humidity(
        &mut self,
        humidity_percent: f32,
        temperature_c: f32,
    ) -> impl Future<Output = Result<(), DeviceError>>;

    /// Run one air-quality measurement.
    fn measure(&mut self) -> impl Future<Output = Result<AirQuality, DeviceError>>;

    /// Read the current IAQ baseline from the sensor.
    fn baseline(&mut self) -> impl Future<Output = Result<BaselineRecord, DeviceError>>;

    /// Restore a previously saved IAQ baseline.
    fn set_baseline(
        &mut self,
        baseline: BaselineRecord,
    ) -> impl Future<Output = Result<(), DeviceError>>;
}

pub use bme280::{Bme280, Bme280Config, CompensatedSample};
pub use sgp30::Sgp30;
