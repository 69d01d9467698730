//! Shared async I2C bus.
//!
//! The BME280 and the SGP30 sit on one bus. Each driver owns an
//! [`AsyncI2cDevice`] handle onto the same mutex, and every call it makes is
//! one complete transaction under the lock.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};

/// One device's handle onto a shared async I2C bus.
///
/// The lock is an embassy async `Mutex`, so it may be held across the await
/// points of a transaction. Firmware uses `CriticalSectionRawMutex`; a
/// single-threaded host can use `NoopRawMutex`.
///
/// # Example
///
/// ```no_run
/// # use airsense_core::async_i2c_bus::AsyncI2cDevice;
/// # use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
/// # use embassy_sync::mutex::Mutex;
/// # fn demo<B: embedded_hal_async::i2c::I2c>(bus: B) {
/// let bus: Mutex<CriticalSectionRawMutex, B> = Mutex::new(bus);
///
/// let bme280_bus = AsyncI2cDevice::new(&bus);
/// let sgp30_bus = AsyncI2cDevice::new(&bus);
/// # }
/// ```
pub struct AsyncI2cDevice<'a, M: RawMutex, T> {
    bus: &'a Mutex<M, T>,
}

impl<'a, M: RawMutex, T> AsyncI2cDevice<'a, M, T> {
    #[inline]
    pub const fn new(bus: &'a Mutex<M, T>) -> Self {
        Self { bus }
    }
}

impl<M: RawMutex, T> Clone for AsyncI2cDevice<'_, M, T> {
    fn clone(&self) -> Self {
        Self { bus: self.bus }
    }
}

impl<M, T> ErrorType for AsyncI2cDevice<'_, M, T>
where
    M: RawMutex,
    T: ErrorType,
{
    type Error = T::Error;
}

impl<M, T> I2c for AsyncI2cDevice<'_, M, T>
where
    M: RawMutex,
    T: I2c,
{
    #[inline]
    async fn read(&mut self, address: u8, read: &mut [u8]) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.read(address, read).await
    }

    #[inline]
    async fn write(&mut self, address: u8, write: &[u8]) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.write(address, write).await
    }

    /// Register reads use this; the lock spans the repeated start so no
    /// other device can slip in between address and data.
    #[inline]
    async fn write_read(
        &mut self,
        address: u8,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.write_read(address, write, read).await
    }

    #[inline]
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.transaction(address, operations).await
    }
}
