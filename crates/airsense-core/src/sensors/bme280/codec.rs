//! Byte decoding helpers for BME280 register contents.

/// Which nibble of a shared byte belongs to a packed 12-bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nibble {
    Low,
    High,
}

/// Unsigned 16-bit little-endian.
#[inline]
pub const fn u16_le(low: u8, high: u8) -> u16 {
    ((high as u16) << 8) | low as u16
}

/// Signed 16-bit little-endian.
#[inline]
pub const fn s16_le(low: u8, high: u8) -> i16 {
    let value = u16_le(low, high) as i32;
    if value & 0x8000 != 0 {
        (value - 0x1_0000) as i16
    } else {
        value as i16
    }
}

/// Signed 8-bit.
#[inline]
pub const fn s8(byte: u8) -> i8 {
    let value = byte as i16;
    if value & 0x80 != 0 {
        (value - 0x100) as i8
    } else {
        value as i8
    }
}

/// Signed 12-bit value made of `high << 4` and one nibble of `shared`.
#[inline]
pub const fn packed12(high: u8, shared: u8, side: Nibble) -> i16 {
    let nibble = match side {
        Nibble::Low => shared & 0x0F,
        Nibble::High => shared >> 4,
    };
    let value = ((high as i16) << 4) | nibble as i16;
    if value & 0x800 != 0 {
        value - 0x1000
    } else {
        value
    }
}
