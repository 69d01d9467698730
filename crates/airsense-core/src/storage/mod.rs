//! Gas sensor baseline persistence.
//!
//! The baseline lives in one small text resource as `eco2,tvoc`. A missing,
//! unreadable or malformed resource is [`BaselineLoad::NotFound`], never an
//! error: the caller falls back to a warm-up. Writes are rate-limited by a
//! save interval measured from the last successful save of this run.

pub mod memory;
pub mod sd_card;

use core::fmt::{self, Write as _};

use embassy_time::{Duration, Instant};
use log::{debug, info, warn};
use thiserror_no_std::Error;

pub use memory::MemoryResource;
pub use sd_card::SdCardResource;

/// Largest baseline text accepted on load.
pub const BASELINE_TEXT_CAPACITY: usize = 32;

const SEPARATOR: char = ',';

/// Calibration baseline of the gas sensor's IAQ algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BaselineRecord {
    pub eco2_baseline: u16,
    pub tvoc_baseline: u16,
}

impl BaselineRecord {
    /// Parse `eco2,tvoc`, ignoring surrounding whitespace.
    pub fn parse(text: &str) -> Option<Self> {
        let mut fields = text.trim().split(SEPARATOR);
        let eco2_baseline = fields.next()?.trim().parse().ok()?;
        let tvoc_baseline = fields.next()?.trim().parse().ok()?;
        if fields.next().is_some() {
            return None;
        }

        Some(Self {
            eco2_baseline,
            tvoc_baseline,
        })
    }
}

impl fmt::Display for BaselineRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.eco2_baseline, SEPARATOR, self.tvoc_baseline)
    }
}

/// Result of loading the baseline resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineLoad {
    Found(BaselineRecord),
    NotFound,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineError {
    #[error("Failed to write the baseline resource")]
    WriteFailed,

    #[error("Baseline text does not fit the write buffer")]
    Format,
}

/// A single small text resource that can be read whole and overwritten.
pub trait TextResource {
    type Error: fmt::Debug;

    /// Copy the contents into `buffer`.
    ///
    /// Returns the full length of the resource, which may exceed the number
    /// of bytes copied, or `None` if the resource does not exist.
    fn read(&mut self, buffer: &mut [u8]) -> Result<Option<usize>, Self::Error>;

    /// Replace the whole contents, creating the resource if needed.
    fn overwrite(&mut self, contents: &[u8]) -> Result<(), Self::Error>;
}

/// Baseline persistence over one [`TextResource`].
pub struct BaselineStore<R> {
    resource: R,
    interval: Duration,
    last_saved: Option<Instant>,
}

impl<R: TextResource> BaselineStore<R> {
    pub fn new(resource: R, interval: Duration) -> Self {
        Self {
            resource,
            interval,
            last_saved: None,
        }
    }

    pub fn load(&mut self) -> BaselineLoad {
        let mut buffer = [0u8; BASELINE_TEXT_CAPACITY];
        let len = match self.resource.read(&mut buffer) {
            Ok(Some(len)) => len,
            Ok(None) => {
                info!("No stored baseline");
                return BaselineLoad::NotFound;
            }
            Err(e) => {
                warn!("Baseline resource unreadable: {:?}", e);
                return BaselineLoad::NotFound;
            }
        };

        if len == 0 || len > buffer.len() {
            warn!("Ignoring baseline of {} bytes", len);
            return BaselineLoad::NotFound;
        }

        let parsed = core::str::from_utf8(&buffer[..len])
            .ok()
            .and_then(BaselineRecord::parse);
        match parsed {
            Some(record) => {
                info!(
                    "Loaded baseline eCO2 {:#06x}, TVOC {:#06x}",
                    record.eco2_baseline, record.tvoc_baseline
                );
                BaselineLoad::Found(record)
            }
            None => {
                warn!("Ignoring malformed baseline");
                BaselineLoad::NotFound
            }
        }
    }

    /// Overwrite the resource with `record` and stamp `now` as the last save.
    ///
    /// The stamp only moves on success, so a failed write is retried by the
    /// next due check.
    pub fn save(&mut self, record: BaselineRecord, now: Instant) -> Result<(), BaselineError> {
        let mut text: heapless::String<BASELINE_TEXT_CAPACITY> = heapless::String::new();
        writeln!(text, "{}", record).map_err(|_| BaselineError::Format)?;

        self.resource.overwrite(text.as_bytes()).map_err(|e| {
            warn!("Baseline write failed: {:?}", e);
            BaselineError::WriteFailed
        })?;

        self.last_saved = Some(now);
        info!(
            "Saved baseline eCO2 {:#06x}, TVOC {:#06x}",
            record.eco2_baseline, record.tvoc_baseline
        );
        Ok(())
    }

    /// Whether a save is due at `now`.
    ///
    /// The first call of a run only starts the interval, so nothing is written
    /// right after start-up.
    pub fn save_due(&mut self, now: Instant) -> bool {
        match self.last_saved {
            None => {
                debug!("Baseline save interval starts now");
                self.last_saved = Some(now);
                false
            }
            Some(last) => now
                .checked_duration_since(last)
                .is_some_and(|elapsed| elapsed >= self.interval),
        }
    }

    /// Save `record` if the interval has elapsed. Returns whether it wrote.
    pub fn maybe_save(
        &mut self,
        record: BaselineRecord,
        now: Instant,
    ) -> Result<bool, BaselineError> {
        if !self.save_due(now) {
            return Ok(false);
        }
        self.save(record, now)?;
        Ok(true)
    }

    pub fn last_saved(&self) -> Option<Instant> {
        self.last_saved
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub fn into_inner(self) -> R {
        self.resource
    }
}
