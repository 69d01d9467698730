//! Hardware-independent core library for airsense
//!
//! This crate contains all platform-agnostic logic for the airsense
//! air-quality monitor: the BME280 calibration and compensation engine, the
//! SGP30 gas sensor driver, the compensation pipeline that couples the two,
//! and persistence of the SGP30 IAQ baseline.
//!
//! It is `#![no_std]` so it compiles on both embedded targets and desktop
//! hosts (for the simulator and tests).

#![no_std]

#[cfg(test)]
extern crate std;

pub mod async_i2c_bus;
pub mod config;
pub mod monitor;
pub mod pipeline;
pub mod sensors;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_utils;
