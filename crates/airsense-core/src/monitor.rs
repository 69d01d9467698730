//! Monitor lifecycle: baseline restore or warm-up, then the reading loop
//! with periodic baseline saves.
//!
//! Nothing here touches hardware or a global clock directly. Sensors,
//! storage, delay and clock are all handed in, so the same loop runs on the
//! board and in the simulator.

use embassy_time::Instant;
use embedded_hal_async::delay::DelayNs;
use log::{error, info, warn};

use crate::config::MonitorConfig;
use crate::pipeline::{EnvironmentReading, read_environment};
use crate::sensors::{EnvironmentSensor, GasSensor};
use crate::storage::{BaselineLoad, BaselineStore, TextResource};

/// Monotonic time source.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// How [`Monitor::start`] brought the gas sensor up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPath {
    /// A stored baseline was restored; only a short settle was needed.
    RestoredBaseline,
    /// No usable baseline; the full warm-up ran.
    WarmUp,
}

pub struct Monitor<E, G, R, D, C> {
    environment: E,
    gas: G,
    store: BaselineStore<R>,
    delay: D,
    clock: C,
    sample_interval_ms: u32,
    warmup_readings: u32,
    settle_readings: u32,
}

impl<E, G, R, D, C> Monitor<E, G, R, D, C>
where
    E: EnvironmentSensor,
    G: GasSensor,
    R: TextResource,
    D: DelayNs,
    C: Clock,
{
    pub fn new(
        environment: E,
        gas: G,
        store: BaselineStore<R>,
        delay: D,
        clock: C,
        config: &MonitorConfig<'_>,
    ) -> Self {
        Self {
            environment,
            gas,
            store,
            delay,
            clock,
            sample_interval_ms: config.sample_interval_ms,
            warmup_readings: config.warmup_readings,
            settle_readings: config.settle_readings,
        }
    }

    /// Restore the stored baseline, or run the warm-up when there is none.
    ///
    /// Reading failures during start-up are logged and skipped.
    pub async fn start(&mut self) -> StartPath {
        if let BaselineLoad::Found(record) = self.store.load() {
            match self.gas.set_baseline(record).await {
                Ok(()) => {
                    info!("Baseline restored, settling for {} readings", self.settle_readings);
                    self.take_readings(self.settle_readings).await;
                    return StartPath::RestoredBaseline;
                }
                Err(e) => warn!("Could not restore baseline: {}", e),
            }
        }

        info!("Warming up for {} readings", self.warmup_readings);
        self.take_readings(self.warmup_readings).await;
        StartPath::WarmUp
    }

    /// One reading followed by the baseline save check.
    ///
    /// Never fails: errors are logged and the next cycle tries again.
    pub async fn cycle(&mut self) -> Option<EnvironmentReading> {
        let reading = match read_environment(&mut self.environment, &mut self.gas).await {
            Ok(reading) => {
                info!("{}", reading);
                Some(reading)
            }
            Err(e) => {
                error!("Reading failed: {}", e);
                None
            }
        };

        self.save_baseline_if_due().await;
        reading
    }

    pub async fn run(&mut self) -> ! {
        self.start().await;
        loop {
            self.cycle().await;
            self.delay.delay_ms(self.sample_interval_ms).await;
        }
    }

    async fn take_readings(&mut self, count: u32) {
        for n in 1..=count {
            match read_environment(&mut self.environment, &mut self.gas).await {
                Ok(reading) => info!("[{}/{}] {}", n, count, reading),
                Err(e) => warn!("[{}/{}] reading failed: {}", n, count, e),
            }
            self.delay.delay_ms(self.sample_interval_ms).await;
        }
    }

    async fn save_baseline_if_due(&mut self) {
        let now = self.clock.now();
        if !self.store.save_due(now) {
            return;
        }

        let record = match self.gas.baseline().await {
            Ok(record) => record,
            Err(e) => {
                error!("Could not read baseline from gas sensor: {}", e);
                return;
            }
        };

        if let Err(e) = self.store.save(record, now) {
            error!("Baseline not saved: {}", e);
        }
    }
}

impl<E, G, R, D, C> Monitor<E, G, R, D, C> {
    pub fn store(&self) -> &BaselineStore<R> {
        &self.store
    }

    pub fn gas(&self) -> &G {
        &self.gas
    }
}
