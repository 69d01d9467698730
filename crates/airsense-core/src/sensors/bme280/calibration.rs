use super::codec::{Nibble, packed12, s8, s16_le, u16_le};
use super::registers::{CALIB_A_LEN, CALIB_B_LEN};

/// Factory trim coefficients fused into every BME280.
///
/// Decoded once during initialization and never modified afterwards.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationCoefficients {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,

    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,

    pub dig_h1: u8,
    pub dig_h2: i16,
    pub dig_h3: u8,
    pub dig_h4: i16,
    pub dig_h5: i16,
    pub dig_h6: i8,
}

impl CalibrationCoefficients {
    /// Decode the coefficients from the two calibration blocks.
    ///
    /// `a` is the burst read of 0x88..=0xA1 and `b` the burst read of
    /// 0xE1..=0xE7. Byte 24 of `a` (0xA0) is unused.
    pub fn from_blocks(a: &[u8; CALIB_A_LEN], b: &[u8; CALIB_B_LEN]) -> Self {
        Self {
            dig_t1: u16_le(a[0], a[1]),
            dig_t2: s16_le(a[2], a[3]),
            dig_t3: s16_le(a[4], a[5]),

            dig_p1: u16_le(a[6], a[7]),
            dig_p2: s16_le(a[8], a[9]),
            dig_p3: s16_le(a[10], a[11]),
            dig_p4: s16_le(a[12], a[13]),
            dig_p5: s16_le(a[14], a[15]),
            dig_p6: s16_le(a[16], a[17]),
            dig_p7: s16_le(a[18], a[19]),
            dig_p8: s16_le(a[20], a[21]),
            dig_p9: s16_le(a[22], a[23]),

            dig_h1: a[25],
            dig_h2: s16_le(b[0], b[1]),
            dig_h3: b[2],
            // 0xE5 is shared: low nibble belongs to H4, high nibble to H5.
            dig_h4: packed12(b[3], b[4], Nibble::Low),
            dig_h5: packed12(b[5], b[4], Nibble::High),
            dig_h6: s8(b[6]),
        }
    }
}
