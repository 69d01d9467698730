//! One environmental + gas reading, in the order the compensation needs.

use core::fmt;

use log::error;

use crate::sensors::{DeviceError, EnvironmentSensor, GasSensor};

/// Output of one pipeline cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentReading {
    pub temperature_c: f32,
    pub pressure_pa: f32,
    pub humidity_percent: f32,
    pub eco2_ppm: u16,
    pub tvoc_ppb: u16,
}

impl fmt::Display for EnvironmentReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "T = {:.2} C   P = {:.2} hPa   H = {:5.1} %RH   eCO2 = {:4} ppm   TVOC = {:4} ppb",
            self.temperature_c,
            self.pressure_pa / 100.0,
            self.humidity_percent,
            self.eco2_ppm,
            self.tvoc_ppb
        )
    }
}

/// Read the environmental sensor, push its humidity and temperature into
/// the gas sensor's compensation, then measure gas.
///
/// The gas measurement always sees this cycle's humidity. If the
/// compensation update fails, no gas measurement is taken.
pub async fn read_environment<E, G>(
    environment: &mut E,
    gas: &mut G,
) -> Result<EnvironmentReading, DeviceError>
where
    E: EnvironmentSensor,
    G: GasSensor,
{
    let sample = environment.measure().await?;

    gas.set_relative_humidity(sample.humidity_percent, sample.temperature_c)
        .await
        .map_err(|e| {
            error!("Failed to update gas sensor humidity compensation: {}", e);
            e
        })?;

    let air = gas.measure().await?;

    Ok(EnvironmentReading {
        temperature_c: sample.temperature_c,
        pressure_pa: sample.pressure_pa,
        humidity_percent: sample.humidity_percent,
        eco2_ppm: air.eco2_ppm,
        tvoc_ppb: air.tvoc_ppb,
    })
}

#[cfg(test)]
pub(crate) mod fakes {
    use core::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    use crate::sensors::{AirQuality, CompensatedSample, DeviceError, EnvironmentSensor, GasSensor};
    use crate::storage::BaselineRecord;

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum Event {
        EnvironmentMeasured,
        HumiditySet { humidity: f32, temperature: f32 },
        GasMeasured,
        BaselineRead,
        BaselineSet(BaselineRecord),
    }

    pub type EventLog = Rc<RefCell<Vec<Event>>>;

    pub const BUS_FAULT: DeviceError = DeviceError::BusFault {
        sensor: "fake",
        operation: "fake",
    };

    /// Replays a list of samples, failing once they run out.
    pub struct FakeEnvironment {
        pub log: EventLog,
        pub samples: Vec<CompensatedSample>,
    }

    impl EnvironmentSensor for FakeEnvironment {
        async fn measure(&mut self) -> Result<CompensatedSample, DeviceError> {
            self.log.borrow_mut().push(Event::EnvironmentMeasured);
            if self.samples.is_empty() {
                return Err(BUS_FAULT);
            }
            Ok(self.samples.remove(0))
        }
    }

    pub struct FakeGas {
        pub log: EventLog,
        pub air: AirQuality,
        pub baseline: BaselineRecord,
        pub fail_humidity: bool,
        pub fail_set_baseline: bool,
    }

    impl FakeGas {
        pub fn new(log: EventLog) -> Self {
            Self {
                log,
                air: AirQuality {
                    eco2_ppm: 400,
                    tvoc_ppb: 0,
                },
                baseline: BaselineRecord {
                    eco2_baseline: 0x930A,
                    tvoc_baseline: 0x04B5,
                },
                fail_humidity: false,
                fail_set_baseline: false,
            }
        }
    }

    impl GasSensor for FakeGas {
        async fn set_relative_humidity(
            &mut self,
            humidity_percent: f32,
            temperature_c: f32,
        ) -> Result<(), DeviceError> {
            if self.fail_humidity {
                return Err(BUS_FAULT);
            }
            self.log.borrow_mut().push(Event::HumiditySet {
                humidity: humidity_percent,
                temperature: temperature_c,
            });
            Ok(())
        }

        async fn measure(&mut self) -> Result<AirQuality, DeviceError> {
            self.log.borrow_mut().push(Event::GasMeasured);
            Ok(self.air)
        }

        async fn baseline(&mut self) -> Result<BaselineRecord, DeviceError> {
            self.log.borrow_mut().push(Event::BaselineRead);
            Ok(self.baseline)
        }

        async fn set_baseline(&mut self, baseline: BaselineRecord) -> Result<(), DeviceError> {
            if self.fail_set_baseline {
                return Err(BUS_FAULT);
            }
            self.log.borrow_mut().push(Event::BaselineSet(baseline));
            Ok(())
        }
    }

    pub fn sample(temperature_c: f32, humidity_percent: f32) -> CompensatedSample {
        CompensatedSample {
            temperature_c,
            pressure_pa: 100_653.25,
            humidity_percent,
        }
    }
}
