//! std implementations of the monitor's delay, clock and baseline resource.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use airsense_core::monitor::Clock;
use airsense_core::storage::TextResource;

/// Blocking delay. The simulator runs on one thread, so sleeping is fine.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl embedded_hal_async::delay::DelayNs for StdDelay {
    async fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns as u64));
    }
}

/// Monotonic clock counting from simulator start.
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    start: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for StdClock {
    fn now(&self) -> embassy_time::Instant {
        embassy_time::Instant::from_micros(self.start.elapsed().as_micros() as u64)
    }
}

/// Baseline text kept in a host file.
pub struct FileResource {
    path: PathBuf,
}

impl FileResource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TextResource for FileResource {
    type Error = io::Error;

    fn read(&mut self, buffer: &mut [u8]) -> Result<Option<usize>, Self::Error> {
        let contents = match fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let copied = contents.len().min(buffer.len());
        buffer[..copied].copy_from_slice(&contents[..copied]);
        Ok(Some(contents.len()))
    }

    fn overwrite(&mut self, contents: &[u8]) -> Result<(), Self::Error> {
        fs::write(&self.path, contents)
    }
}
