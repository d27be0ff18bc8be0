use crate::calibration;
use crate::hw_def::*;

use core::fmt;

use embassy_time::Duration;

#[cfg(feature = "defmt")]
use defmt::Format;

/// Driver configuration, applied by [`crate::Sht15::init`] and used for every read afterwards
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// supply voltage in millivolts, used until a [`crate::SupplyVoltage`] source reports one
    pub supply_mv: u32,
    /// validate every response with the sensor's CRC-8
    pub checksum: bool,
    /// skip reloading calibration data from OTP before each measurement
    pub no_otp_reload: bool,
    /// 8bit humidity and 12bit temperature instead of 12bit and 14bit
    pub low_resolution: bool,
    /// cached measurements and status are reused until they are older than this
    pub max_age: Duration,
    /// how many times a public read re-runs an exchange that ended in [`crate::Error::Retry`]
    pub retries: u8,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            supply_mv: 3300,
            checksum: false,
            no_otp_reload: false,
            low_resolution: false,
            max_age: Duration::from_secs(1),
            retries: 1,
        }
    }
}
impl Config {
    /// Status register bits this configuration asks for
    pub fn status_bits(&self) -> u8 {
        let mut status = 0;
        if self.no_otp_reload {
            status |= STATUS_NO_OTP_RELOAD;
        }
        if self.low_resolution {
            status |= STATUS_LOW_RESOLUTION;
        }
        status
    }

    pub(crate) fn supply_uv(&self) -> i32 {
        (self.supply_mv as i32).saturating_mul(1000)
    }
}

/// What the driver is waiting for the sensor to finish
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Pending {
    /// no measurement in flight
    #[default]
    Idle,
    /// a temperature measurement command was acknowledged
    AwaitingTemperature,
    /// a humidity measurement command was acknowledged
    AwaitingHumidity,
}

/// Temperature in thousandths of a degree centigrade
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Millidegrees(pub i32);
impl Millidegrees {
    /// Get temperature in Centigrade
    pub fn centigrade(&self) -> f32 {
        self.0 as f32 / 1000.0
    }
    /// Get temperature in Fahrenheit
    pub fn fahrenheit(&self) -> f32 {
        self.centigrade() * 9.0 / 5.0 + 32.0
    }
}

/// Relative humidity in thousandths of a percent
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct MilliPercent(pub i32);
impl MilliPercent {
    /// Get relative humidity in percent
    pub fn percent(&self) -> f32 {
        self.0 as f32 / 1000.0
    }
}

/// Raw (still in u16 format) temperature and humidity counts, with the status they were taken under
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RawMeasurement {
    /// unprocessed temperature
    pub temperature: u16,
    /// unprocessed relative humidity
    pub humidity: u16,
    /// status register, selects the resolution the counts were sampled at
    pub status: u8,
}
impl RawMeasurement {
    /// Calibrated temperature at the given supply voltage
    pub fn temperature(&self, supply_uv: i32) -> Millidegrees {
        Millidegrees(calibration::temperature(self.temperature, supply_uv, self.status))
    }
    /// Temperature compensated relative humidity at the given supply voltage
    pub fn humidity(&self, supply_uv: i32) -> MilliPercent {
        MilliPercent(calibration::humidity(self.humidity, self.temperature, supply_uv, self.status))
    }
}

/// Temperature and humidity after calibration
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Measurement {
    /// temperature
    pub temperature: Millidegrees,
    /// relative humidity
    pub humidity: MilliPercent,
}

/// Status bits from the device
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatusBits {
    raw: u8,
    /// 8bit humidity / 12bit temperature resolution
    pub low_resolution: bool,
    /// OTP calibration reload disabled
    pub no_otp_reload: bool,
    /// heater is enabled
    pub heater_enabled: bool,
    /// supply voltage dropped below 2.47V
    pub low_battery: bool,
}
impl From<u8> for StatusBits {
    fn from(raw: u8) -> Self {
        Self {
            raw,
            low_resolution: raw & STATUS_LOW_RESOLUTION != 0,
            no_otp_reload: raw & STATUS_NO_OTP_RELOAD != 0,
            heater_enabled: raw & STATUS_HEATER != 0,
            low_battery: raw & STATUS_LOW_BATTERY != 0,
        }
    }
}
impl StatusBits {
    /// Get the raw status bits
    pub fn raw(&self) -> u8 {
        self.raw
    }
}
impl fmt::Display for StatusBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatusBits {{ 0x{:02x}; ", self.raw)?;
        if self.low_resolution {
            write!(f, "low_resolution ")?;
        }
        if self.no_otp_reload {
            write!(f, "no_otp_reload ")?;
        }
        if self.heater_enabled {
            write!(f, "heater_enabled ")?;
        }
        if self.low_battery {
            write!(f, "low_battery ")?;
        }
        write!(f, "}}")
    }
}
