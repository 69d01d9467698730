use serde::{Deserialize, Serialize};

/// Oversampling setting for one measurement channel.
///
/// Higher oversampling reduces noise at the cost of a longer conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Oversampling {
    /// Channel is not measured; its data register keeps the reset value.
    Skipped = 0,
    #[default]
    X1 = 1,
    X2 = 2,
    X4 = 3,
    X8 = 4,
    X16 = 5,
}

impl Oversampling {
    /// Decode a 3-bit register code. Codes 6 and 7 mean x16.
    pub const fn from_code(code: u8) -> Self {
        match code & 0x07 {
            0 => Self::Skipped,
            1 => Self::X1,
            2 => Self::X2,
            3 => Self::X4,
            4 => Self::X8,
            _ => Self::X16,
        }
    }

    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Number of conversions averaged per sample.
    pub const fn factor(self) -> u32 {
        match self {
            Self::Skipped => 0,
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
            Self::X8 => 8,
            Self::X16 => 16,
        }
    }
}

/// IIR filter coefficient for pressure and temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Filter {
    #[default]
    Off = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X16 = 4,
}

impl Filter {
    /// Decode a 3-bit register code. Codes 5 to 7 mean x16.
    pub const fn from_code(code: u8) -> Self {
        match code & 0x07 {
            0 => Self::Off,
            1 => Self::X2,
            2 => Self::X4,
            3 => Self::X8,
            _ => Self::X16,
        }
    }

    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Inactive time between conversions in normal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Standby {
    Ms0_5 = 0,
    Ms62_5 = 1,
    Ms125 = 2,
    Ms250 = 3,
    Ms500 = 4,
    #[default]
    Ms1000 = 5,
    Ms10 = 6,
    Ms20 = 7,
}

impl Standby {
    pub const fn from_code(code: u8) -> Self {
        match code & 0x07 {
            0 => Self::Ms0_5,
            1 => Self::Ms62_5,
            2 => Self::Ms125,
            3 => Self::Ms250,
            4 => Self::Ms500,
            5 => Self::Ms1000,
            6 => Self::Ms10,
            _ => Self::Ms20,
        }
    }

    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Power mode, bits 1:0 of ctrl_meas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Mode {
    Sleep = 0b00,
    /// One measurement on request, then back to sleep.
    #[default]
    Forced = 0b01,
    Normal = 0b11,
}

impl Mode {
    /// Decode the 2-bit mode field. 0b10 is a second encoding of forced mode.
    pub const fn from_code(code: u8) -> Self {
        match code & 0x03 {
            0b00 => Self::Sleep,
            0b11 => Self::Normal,
            _ => Self::Forced,
        }
    }

    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Complete BME280 measurement configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bme280Config {
    pub temperature: Oversampling,
    pub pressure: Oversampling,
    pub humidity: Oversampling,
    pub filter: Filter,
    /// Only used in normal mode.
    pub standby: Standby,
    pub mode: Mode,
    /// Enables the 3-wire SPI interface. Always off on I2C.
    pub spi3w: bool,
}

impl Default for Bme280Config {
    fn default() -> Self {
        Self::weather_monitoring()
    }
}

impl Bme280Config {
    /// Datasheet "weather monitoring": forced mode, x1 everywhere, filter off.
    pub const fn weather_monitoring() -> Self {
        Self {
            temperature: Oversampling::X1,
            pressure: Oversampling::X1,
            humidity: Oversampling::X1,
            filter: Filter::Off,
            standby: Standby::Ms1000,
            mode: Mode::Forced,
            spi3w: false,
        }
    }

    /// Datasheet "humidity sensing": pressure skipped.
    pub const fn humidity_sensing() -> Self {
        Self {
            pressure: Oversampling::Skipped,
            ..Self::weather_monitoring()
        }
    }

    /// Datasheet "indoor navigation": normal mode, heavy pressure filtering.
    pub const fn indoor_navigation() -> Self {
        Self {
            temperature: Oversampling::X2,
            pressure: Oversampling::X16,
            humidity: Oversampling::X1,
            filter: Filter::X16,
            standby: Standby::Ms0_5,
            mode: Mode::Normal,
            spi3w: false,
        }
    }

    /// Value for ctrl_hum (0xF2).
    pub const fn ctrl_hum(&self) -> u8 {
        self.humidity.code() & 0x07
    }

    /// Value for config (0xF5).
    pub const fn config(&self) -> u8 {
        ((self.standby.code() & 0x07) << 5) | ((self.filter.code() & 0x07) << 2) | self.spi3w as u8
    }

    /// Value for ctrl_meas (0xF4) with an explicit mode.
    pub const fn ctrl_meas_with_mode(&self, mode: Mode) -> u8 {
        ((self.temperature.code() & 0x07) << 5)
            | ((self.pressure.code() & 0x07) << 2)
            | (mode.code() & 0x03)
    }

    /// Value for ctrl_meas (0xF4).
    pub const fn ctrl_meas(&self) -> u8 {
        self.ctrl_meas_with_mode(self.mode)
    }

    /// Worst-case duration of one conversion cycle, in microseconds.
    pub const fn max_measurement_time_us(&self) -> u32 {
        let mut time = 1250 + 2300 * self.temperature.factor();
        if self.pressure.factor() > 0 {
            time += 2300 * self.pressure.factor() + 575;
        }
        if self.humidity.factor() > 0 {
            time += 2300 * self.humidity.factor() + 575;
        }
        time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oversampling_codes_six_and_seven_are_x16() {
        assert_eq!(Oversampling::from_code(5), Oversampling::X16);
        assert_eq!(Oversampling::from_code(6), Oversampling::X16);
        assert_eq!(Oversampling::from_code(7), Oversampling::X16);
        // Masked to three bits, not rejected.
        assert_eq!(Oversampling::from_code(0x09), Oversampling::X1);
    }

    #[test]
    fn test_oversampling_six_and_seven_produce_same_registers() {
        let with = |code| Bme280Config {
            temperature: Oversampling::from_code(code),
            pressure: Oversampling::from_code(code),
            humidity: Oversampling::from_code(code),
            ..Bme280Config::weather_monitoring()
        };
        for code in [6, 7] {
            assert_eq!(with(code).ctrl_hum(), with(5).ctrl_hum());
            assert_eq!(with(code).ctrl_meas(), with(5).ctrl_meas());
            assert_eq!(with(code).config(), with(5).config());
        }
    }

    #[test]
    fn test_register_packing() {
        let config = Bme280Config {
            temperature: Oversampling::X2,
            pressure: Oversampling::X16,
            humidity: Oversampling::X4,
            filter: Filter::X16,
            standby: Standby::Ms20,
            mode: Mode::Normal,
            spi3w: true,
        };
        assert_eq!(config.ctrl_hum(), 0b011);
        assert_eq!(config.ctrl_meas(), 0b010_101_11);
        assert_eq!(config.config(), 0b111_100_0_1);
        assert_eq!(config.ctrl_meas_with_mode(Mode::Forced), 0b010_101_01);
    }

    #[test]
    fn test_weather_monitoring_registers() {
        let config = Bme280Config::default();
        assert_eq!(config.ctrl_hum(), 0x01);
        assert_eq!(config.ctrl_meas(), 0x25);
        assert_eq!(config.config(), 0xA0);
    }

    #[test]
    fn test_filter_and_mode_decoding() {
        assert_eq!(Filter::from_code(7), Filter::X16);
        assert_eq!(Filter::from_code(3), Filter::X8);
        assert_eq!(Mode::from_code(0b10), Mode::Forced);
        assert_eq!(Mode::from_code(0b11), Mode::Normal);
        assert_eq!(Standby::from_code(6), Standby::Ms10);
    }

    #[test]
    fn test_max_measurement_time() {
        // 1.25 + 2.3 + (2.3 + 0.575) + (2.3 + 0.575) ms
        assert_eq!(Bme280Config::weather_monitoring().max_measurement_time_us(), 9_300);
        // Pressure skipped drops its term entirely.
        assert_eq!(Bme280Config::humidity_sensing().max_measurement_time_us(), 6_425);
    }
}
