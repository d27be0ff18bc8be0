#[cfg(feature = "defmt")]
use defmt::Format;

/// Commands understood by the sensor (datasheet table 2)
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub(crate) enum Command {
    MeasureTemperature = 0x03,
    MeasureHumidity = 0x05,
    WriteStatus = 0x06,
    ReadStatus = 0x07,
    SoftReset = 0x1E,
}
impl Command {
    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }
}

// Minimum line timings, nanoseconds
pub(crate) const T_SCK_LOW_NS: u32 = 100;
pub(crate) const T_SCK_HIGH_NS: u32 = 100;
pub(crate) const T_SETUP_NS: u32 = 150;

/// Settle time after a soft reset before the next command, milliseconds
pub(crate) const T_SOFT_RESET_MS: u32 = 11;

/// Clock pulses with data held high that resynchronize the interface
pub(crate) const CONNECTION_RESET_PULSES: usize = 9;

/// Measurement deadlines, milliseconds
pub(crate) const TEMPERATURE_TIMEOUT_MS: u64 = 400;
pub(crate) const HUMIDITY_TIMEOUT_MS: u64 = 160;

/// Status register: 8bit RH / 12bit temperature resolution
pub const STATUS_LOW_RESOLUTION: u8 = 0x01;
/// Status register: do not reload calibration from OTP before a measurement
pub const STATUS_NO_OTP_RELOAD: u8 = 0x02;
/// Status register: on-chip heater enabled
pub const STATUS_HEATER: u8 = 0x04;
/// Status register: supply voltage below 2.47V
pub const STATUS_LOW_BATTERY: u8 = 0x40;

/// Writable configuration bits that must survive a soft reset
pub(crate) const STATUS_CONFIG_MASK: u8 = STATUS_LOW_RESOLUTION | STATUS_NO_OTP_RELOAD | STATUS_HEATER;

/// Status bits that seed the checksum
pub(crate) const STATUS_CRC_SEED_MASK: u8 = 0x0F;

/// One point of the supply-voltage dependent temperature offset curve
#[derive(Clone, Copy, Debug)]
pub(crate) struct CalibrationPoint {
    /// supply voltage in microvolts
    pub(crate) supply_uv: i32,
    /// temperature offset in millidegrees
    pub(crate) d1: i32,
}

/// Datasheet table 9: d1 versus VDD
pub(crate) const TEMP_POINTS: [CalibrationPoint; 5] = [
    CalibrationPoint { supply_uv: 2_500_000, d1: -39_400 },
    CalibrationPoint { supply_uv: 3_000_000, d1: -39_600 },
    CalibrationPoint { supply_uv: 3_500_000, d1: -39_700 },
    CalibrationPoint { supply_uv: 4_000_000, d1: -39_800 },
    CalibrationPoint { supply_uv: 5_000_000, d1: -40_100 },
];

/// d2 (x1000) per temperature count
pub(crate) const D2_HIGH_RESOLUTION: i32 = 10;
pub(crate) const D2_LOW_RESOLUTION: i32 = 40;

/// Humidity linearization and temperature compensation coefficients (datasheet table 7, V4 sensors)
#[derive(Clone, Copy, Debug)]
pub(crate) struct HumidityCoefficients {
    /// x 10^-6
    pub(crate) c2: i64,
    /// x 10^-7
    pub(crate) c3: i64,
    /// x 10^-5
    pub(crate) t2: i64,
}

/// c1 in percent
pub(crate) const HUMIDITY_C1: i64 = -4;

pub(crate) const HUMIDITY_HIGH_RESOLUTION: HumidityCoefficients = HumidityCoefficients { c2: 40_500, c3: -28, t2: 80 };
pub(crate) const HUMIDITY_LOW_RESOLUTION: HumidityCoefficients = HumidityCoefficients { c2: 648_000, c3: -7_200, t2: 1_280 };
