//! BME280 register map.

/// Default I2C address (SDO tied to GND). 0x77 when SDO is tied to VDDIO.
pub const DEFAULT_ADDRESS: u8 = 0x76;

pub const CHIP_ID: u8 = 0xD0;
pub const EXPECTED_CHIP_ID: u8 = 0x60;

pub const RESET: u8 = 0xE0;
pub const SOFT_RESET_COMMAND: u8 = 0xB6;

pub const CTRL_HUM: u8 = 0xF2;
pub const STATUS: u8 = 0xF3;
pub const CTRL_MEAS: u8 = 0xF4;
pub const CONFIG: u8 = 0xF5;

/// Status bit 3: a conversion is running.
pub const STATUS_MEASURING: u8 = 0b0000_1000;
/// Status bit 0: NVM data is being copied to the image registers.
pub const STATUS_IM_UPDATE: u8 = 0b0000_0001;

/// Pressure MSB/LSB/XLSB, temperature MSB/LSB/XLSB, humidity MSB/LSB.
pub const DATA: u8 = 0xF7;
pub const DATA_LEN: usize = 8;

/// Temperature and pressure trim, 0x88..=0xA1 (dig_H1 sits in the last byte).
pub const CALIB_A: u8 = 0x88;
pub const CALIB_A_LEN: usize = 26;

/// Humidity trim, 0xE1..=0xE7.
pub const CALIB_B: u8 = 0xE1;
pub const CALIB_B_LEN: usize = 7;
