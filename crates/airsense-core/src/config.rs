use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use crate::sensors::{Bme280Config, bme280, sgp30};

/// Monitor configuration.
///
/// Borrowed strings keep it usable from a `no_std` deserializer reading
/// straight out of a flash or card buffer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(bound(deserialize = "'de: 'a"), default)]
pub struct MonitorConfig<'a> {
    pub bme280_address: u8,
    pub sgp30_address: u8,
    /// 8.3 name of the baseline file in the card's root directory.
    pub baseline_file: &'a str,
    pub baseline_save_interval_secs: u64,
    pub sample_interval_ms: u32,
    /// Readings taken when no baseline could be restored.
    pub warmup_readings: u32,
    /// Readings taken after a baseline was restored.
    pub settle_readings: u32,
    pub bme280: Bme280Config,
}

impl Default for MonitorConfig<'_> {
    fn default() -> Self {
        Self {
            bme280_address: bme280::registers::DEFAULT_ADDRESS,
            sgp30_address: sgp30::DEFAULT_ADDRESS,
            baseline_file: "BASELINE.TXT",
            baseline_save_interval_secs: 3600,
            sample_interval_ms: 1000,
            warmup_readings: 15,
            settle_readings: 5,
            bme280: Bme280Config::default(),
        }
    }
}

impl MonitorConfig<'_> {
    pub fn baseline_save_interval(&self) -> Duration {
        Duration::from_secs(self.baseline_save_interval_secs)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms as u64)
    }
}
