//! Conversion of raw counts into physical values (datasheet sections 4.1 to 4.3).
//!
//! Everything is fixed point. Divisions truncate toward zero, so negative intermediate values round
//! up, not down. Intermediates are widened to `i64`; the compensation term alone exceeds `i32` for
//! ordinary readings at full resolution.

use crate::hw_def::*;

fn low_resolution(status: u8) -> bool {
    status & STATUS_LOW_RESOLUTION != 0
}

/// Temperature offset (millidegrees) for the given supply voltage.
///
/// Linear interpolation over the last table interval whose lower bound is strictly below
/// `supply_uv`; at or below the first point the first offset is used unchanged. Above the last
/// point the last interval is extrapolated.
pub fn d1(supply_uv: i32) -> i32 {
    let supply_uv = supply_uv as i64;
    for pair in TEMP_POINTS.windows(2).rev() {
        let (lower, upper) = (pair[0], pair[1]);
        if supply_uv > lower.supply_uv as i64 {
            let offset = (supply_uv - lower.supply_uv as i64) * (upper.d1 - lower.d1) as i64
                / (upper.supply_uv - lower.supply_uv) as i64;
            return (offset + lower.d1 as i64) as i32;
        }
    }
    TEMP_POINTS[0].d1
}

/// Temperature in millidegrees from a raw count
pub fn temperature(raw: u16, supply_uv: i32, status: u8) -> i32 {
    let d2 = if low_resolution(status) { D2_LOW_RESOLUTION } else { D2_HIGH_RESOLUTION };
    (raw as i64 * d2 as i64 + d1(supply_uv) as i64) as i32
}

/// Temperature compensated relative humidity in milli-percent.
///
/// `raw_temperature` must be the temperature count taken alongside `raw_humidity`.
pub fn humidity(raw_humidity: u16, raw_temperature: u16, supply_uv: i32, status: u8) -> i32 {
    let temp = temperature(raw_temperature, supply_uv, status) as i64;
    let HumidityCoefficients { c2, c3, t2 } = if low_resolution(status) {
        HUMIDITY_LOW_RESOLUTION
    } else {
        HUMIDITY_HIGH_RESOLUTION
    };
    let so_rh = raw_humidity as i64;

    let rh_linear = HUMIDITY_C1 * 1000 + c2 * so_rh / 1000 + so_rh * so_rh * c3 / 10_000;
    ((temp - 25_000) * (10_000 + t2 * so_rh) / 1_000_000 + rh_linear) as i32
}
