//! Shared fixtures for unit tests.

use crate::sensors::bme280::calibration::CalibrationCoefficients;

/// Calibration block A (0x88..=0xA1) encoding the datasheet example trim.
pub const CALIB_A_BYTES: [u8; 26] = [
    0x70, 0x6B, 0x43, 0x67, 0x18, 0xFC, 0x7D, 0x8E, 0x43, 0xD6, 0xD0, 0x0B, 0x27, 0x0B, 0x8C,
    0x00, 0xF9, 0xFF, 0x8C, 0x3C, 0xF8, 0xC6, 0x70, 0x17, 0x00, 0x4B,
];

/// Calibration block B (0xE1..=0xE7).
pub const CALIB_B_BYTES: [u8; 7] = [0x6A, 0x01, 0x00, 0x13, 0x29, 0x03, 0x1E];

pub const REFERENCE_ADC_T: u32 = 519_888;
pub const REFERENCE_ADC_P: u32 = 415_148;
pub const REFERENCE_ADC_H: u16 = 30_000;

/// Data block (0xF7..=0xFE) carrying the reference ADC values.
pub const REFERENCE_DATA_BYTES: [u8; 8] = [0x65, 0x5A, 0xC0, 0x7E, 0xED, 0x00, 0x75, 0x30];

pub fn reference_calibration() -> CalibrationCoefficients {
    CalibrationCoefficients {
        dig_t1: 27504,
        dig_t2: 26435,
        dig_t3: -1000,
        dig_p1: 36477,
        dig_p2: -10685,
        dig_p3: 3024,
        dig_p4: 2855,
        dig_p5: 140,
        dig_p6: -7,
        dig_p7: 15500,
        dig_p8: -14600,
        dig_p9: 6000,
        dig_h1: 75,
        dig_h2: 362,
        dig_h3: 0,
        dig_h4: 313,
        dig_h5: 50,
        dig_h6: 30,
    }
}

/// No-op delay for driving async code without a time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDelay;

impl embedded_hal_async::delay::DelayNs for NoopDelay {
    async fn delay_ns(&mut self, _ns: u32) {}
}

/// Assert that two floating point values are approximately equal
pub fn assert_float_eq(a: f32, b: f32, epsilon: f32) {
    let diff = (a - b).abs();
    assert!(
        diff < epsilon,
        "Values not equal within epsilon: {} vs {} (diff: {}, epsilon: {})",
        a,
        b,
        diff,
        epsilon
    );
}
