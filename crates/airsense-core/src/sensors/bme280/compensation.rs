//! Bosch integer compensation formulas.
//!
//! Temperature runs first and yields `t_fine`, which both the pressure and
//! the humidity formulas consume. All intermediates are `i64`: the pressure
//! cross products need the width, and humidity uses it as well since its
//! products sit close to the `i32` limit at extreme trim values.

use super::calibration::CalibrationCoefficients;
use super::RawSample;

/// Upper clamp of the humidity formula: 100 %RH in Q22.10, shifted by 12.
const HUMIDITY_MAX: i64 = 419_430_400;

/// Output of the temperature formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureCompensation {
    /// Fine temperature, required by pressure and humidity.
    pub t_fine: i32,
    /// Temperature in hundredths of a degree Celsius.
    pub centi_celsius: i32,
}

/// Compensated measurement in physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompensatedSample {
    pub temperature_c: f32,
    pub pressure_pa: f32,
    /// Always within 0..=100.
    pub humidity_percent: f32,
}

impl CompensatedSample {
    /// Compensate all three channels of one raw sample.
    pub fn compute(raw: &RawSample, calib: &CalibrationCoefficients) -> Self {
        let temperature = compensate_temperature(raw.adc_temperature, calib);
        let pressure = compensate_pressure(raw.adc_pressure, temperature.t_fine, calib);
        let humidity = compensate_humidity(raw.adc_humidity, temperature.t_fine, calib);

        Self {
            temperature_c: temperature.centi_celsius as f32 / 100.0,
            pressure_pa: pressure as f32 / 256.0,
            humidity_percent: humidity as f32 / 1024.0,
        }
    }
}

pub fn compensate_temperature(
    adc_t: u32,
    calib: &CalibrationCoefficients,
) -> TemperatureCompensation {
    let adc_t = adc_t as i64;
    let t1 = calib.dig_t1 as i64;
    let t2 = calib.dig_t2 as i64;
    let t3 = calib.dig_t3 as i64;

    let var1 = (((adc_t >> 3) - (t1 << 1)) * t2) >> 11;
    let var2 = (((((adc_t >> 4) - t1) * ((adc_t >> 4) - t1)) >> 12) * t3) >> 14;
    let t_fine = var1 + var2;

    TemperatureCompensation {
        t_fine: t_fine as i32,
        centi_celsius: ((t_fine * 5 + 128) >> 8) as i32,
    }
}

/// Pressure in Pa as unsigned Q24.8. Returns 0 when the trim makes the
/// divisor vanish.
pub fn compensate_pressure(adc_p: u32, t_fine: i32, calib: &CalibrationCoefficients) -> u32 {
    let mut var1 = t_fine as i64 - 128_000;
    let mut var2 = var1 * var1 * calib.dig_p6 as i64;
    var2 += (var1 * calib.dig_p5 as i64) << 17;
    var2 += (calib.dig_p4 as i64) << 35;
    var1 = ((var1 * var1 * calib.dig_p3 as i64) >> 8) + ((var1 * calib.dig_p2 as i64) << 12);
    var1 = (((1i64 << 47) + var1) * calib.dig_p1 as i64) >> 33;

    if var1 == 0 {
        return 0;
    }

    let mut p = 1_048_576 - adc_p as i64;
    p = (((p << 31) - var2) * 3125) / var1;
    let var1 = (calib.dig_p9 as i64 * (p >> 13) * (p >> 13)) >> 25;
    let var2 = (calib.dig_p8 as i64 * p) >> 19;
    p = ((p + var1 + var2) >> 8) + ((calib.dig_p7 as i64) << 4);

    p.clamp(0, u32::MAX as i64) as u32
}

/// Relative humidity as unsigned Q22.10, clamped to 0..=100 %.
pub fn compensate_humidity(adc_h: u16, t_fine: i32, calib: &CalibrationCoefficients) -> u32 {
    let adc_h = adc_h as i64;
    let h1 = calib.dig_h1 as i64;
    let h2 = calib.dig_h2 as i64;
    let h3 = calib.dig_h3 as i64;
    let h4 = calib.dig_h4 as i64;
    let h5 = calib.dig_h5 as i64;
    let h6 = calib.dig_h6 as i64;

    let mut x = t_fine as i64 - 76_800;
    x = ((((adc_h << 14) - (h4 << 20) - (h5 * x)) + 16_384) >> 15)
        * (((((((x * h6) >> 10) * (((x * h3) >> 11) + 32_768)) >> 10) + 2_097_152) * h2
            + 8_192)
            >> 14);
    x -= ((((x >> 15) * (x >> 15)) >> 7) * h1) >> 4;
    x = x.clamp(0, HUMIDITY_MAX);

    (x >> 12) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        REFERENCE_ADC_H, REFERENCE_ADC_P, REFERENCE_ADC_T, assert_float_eq, reference_calibration,
    };

    fn reference_raw() -> RawSample {
        RawSample {
            adc_temperature: REFERENCE_ADC_T,
            adc_pressure: REFERENCE_ADC_P,
            adc_humidity: REFERENCE_ADC_H,
        }
    }

    #[test]
    fn test_reference_temperature() {
        let temperature = compensate_temperature(REFERENCE_ADC_T, &reference_calibration());
        assert_eq!(temperature.t_fine, 128_422);
        assert_eq!(temperature.centi_celsius, 2508);
    }

    #[test]
    fn test_reference_pressure() {
        let pressure = compensate_pressure(REFERENCE_ADC_P, 128_422, &reference_calibration());
        assert_eq!(pressure, 25_767_233);
        // Published reference: 100653.27 Pa.
        assert_float_eq(pressure as f32 / 256.0, 100_653.27, 0.1);
    }

    #[test]
    fn test_reference_humidity() {
        let humidity = compensate_humidity(REFERENCE_ADC_H, 128_422, &reference_calibration());
        assert_eq!(humidity, 56_317);
    }

    #[test]
    fn test_compute_uses_fine_temperature() {
        let calib = reference_calibration();
        let sample = CompensatedSample::compute(&reference_raw(), &calib);
        assert_float_eq(sample.temperature_c, 25.08, 0.001);
        assert_float_eq(sample.pressure_pa, 100_653.25, 0.01);
        assert_float_eq(sample.humidity_percent, 54.997, 0.001);

        // Same pressure/humidity ADC, different temperature: results must move.
        let mut warmer = reference_raw();
        warmer.adc_temperature += 8_000;
        let shifted = CompensatedSample::compute(&warmer, &calib);
        assert!(shifted.temperature_c > sample.temperature_c);
        assert_ne!(shifted.pressure_pa, sample.pressure_pa);
        assert_ne!(shifted.humidity_percent, sample.humidity_percent);
    }

    #[test]
    fn test_pressure_zero_divisor_returns_zero() {
        let calib = CalibrationCoefficients {
            dig_p1: 0,
            ..reference_calibration()
        };
        assert_eq!(compensate_pressure(REFERENCE_ADC_P, 128_422, &calib), 0);

        let raw = reference_raw();
        let sample = CompensatedSample::compute(&raw, &calib);
        assert_eq!(sample.pressure_pa, 0.0);
    }

    #[test]
    fn test_humidity_is_clamped() {
        let calib = reference_calibration();
        assert_eq!(compensate_humidity(0, 128_422, &calib), 0);
        assert_eq!(compensate_humidity(u16::MAX, 128_422, &calib), 100 * 1024);
    }
}
