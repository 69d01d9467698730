//! Desktop simulator for the airsense air-quality monitor.
//!
//! Runs the airsense-core monitor against a simulated I2C bus that carries a
//! BME280 and an SGP30, keeping the IAQ baseline in a host file.
//!
//! ```text
//! airsense-simulator [BASELINE_FILE] [CYCLES]
//! ```
//!
//! Without `CYCLES` it runs until interrupted. Set `RUST_LOG=debug` to see
//! the bus traffic of the simulated devices.

mod bus;
mod host;

use std::path::PathBuf;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::delay::DelayNs;
use log::{error, info};

use airsense_core::async_i2c_bus::AsyncI2cDevice;
use airsense_core::config::MonitorConfig;
use airsense_core::monitor::Monitor;
use airsense_core::sensors::{Bme280, Sgp30};
use airsense_core::storage::BaselineStore;

use bus::SimulatedBus;
use host::{FileResource, StdClock, StdDelay};

/// Baseline saves every minute so they show up in a short session.
const SIM_BASELINE_SAVE_INTERVAL_SECS: u64 = 60;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let baseline_path = args.next().map(PathBuf::from);
    let cycles = args.next().and_then(|arg| arg.parse::<u32>().ok());

    let config = MonitorConfig {
        baseline_save_interval_secs: SIM_BASELINE_SAVE_INTERVAL_SECS,
        ..MonitorConfig::default()
    };
    let baseline_path = baseline_path.unwrap_or_else(|| PathBuf::from(config.baseline_file));

    info!("airsense simulator starting");
    info!("Baseline file: {}", baseline_path.display());

    embassy_futures::block_on(simulate(&config, baseline_path, cycles));
}

async fn simulate(config: &MonitorConfig<'_>, baseline_path: PathBuf, cycles: Option<u32>) {
    let bus: Mutex<CriticalSectionRawMutex, SimulatedBus> = Mutex::new(SimulatedBus::new());

    let mut bme280 = Bme280::new(AsyncI2cDevice::new(&bus), StdDelay, config.bme280_address);
    if let Err(e) = bme280.init(config.bme280).await {
        error!("BME280 initialization failed: {}", e);
        return;
    }

    let mut sgp30 = Sgp30::new(AsyncI2cDevice::new(&bus), StdDelay, config.sgp30_address);
    if let Err(e) = sgp30.init().await {
        error!("SGP30 initialization failed: {}", e);
        return;
    }

    let store = BaselineStore::new(
        FileResource::new(baseline_path),
        config.baseline_save_interval(),
    );
    let mut monitor = Monitor::new(bme280, sgp30, store, StdDelay, StdClock::new(), config);

    let Some(cycles) = cycles else {
        monitor.run().await
    };

    let path = monitor.start().await;
    info!("Start-up finished: {:?}", path);

    let mut delay = StdDelay;
    for _ in 0..cycles {
        monitor.cycle().await;
        delay.delay_ms(config.sample_interval_ms).await;
    }
    info!("Finished {} cycles", cycles);
}
