//! This is a platform-agnostic Rust driver for the Sensirion SHT1x family (SHT10, SHT11, SHT15,
//! SHT71 and SHT75) of humidity and temperature sensors using the [`embedded-hal`] and
//! [`embedded-hal-async`] traits.
//!
//! [`embedded-hal`]: https://github.com/rust-embedded/embedded-hal/tree/master/embedded-hal
//! [`embedded-hal-async`]: https://github.com/rust-embedded/embedded-hal/tree/master/embedded-hal-async
//!
//! The SHT1x is not an I²C device. It speaks a two-wire protocol that looks similar but has its own
//! start condition and reset sequence, so this driver bit-bangs it on two GPIOs. Completion of a
//! measurement is signalled by the sensor pulling DATA low, which the driver picks up through a
//! falling edge interrupt.
//!
//! This driver allows you to:
//! - Read calibrated temperature and temperature compensated relative humidity.
//! - Cache readings and status for a configurable time, so frequent readers do not hit the bus.
//! - Share one sensor between tasks; bus exchanges are serialized and concurrent readers reuse the
//!   result of the exchange in flight.
//! - Validate responses with the sensor's CRC-8 and recover from checksum failures.
//! - Read the status register (resolution, OTP reload, heater, low battery).
//! - Enable/disable the heater.
//! - Compensate the temperature for the actual supply voltage, including voltage changes at runtime.
//! - Trigger a software reset.
//!
//! ## Features
//!
//! - `defmt`: Enables logging using the `defmt` framework.
//! - `log`: Enables logging using the `log` framework.
//!
//! ## Supported devices: SHT10, SHT11, SHT15, SHT71, SHT75
//!
//! Datasheet:
//!   [SHT1x](https://sensirion.com/media/documents/BD45ECB5/61642783/Sensirion_Humidity_Sensors_SHT1x_Datasheet.pdf)
//!
//! ## Example:
//!
//! ```ignore
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
//! use sht15::{Config, OpenDrain, Sht15};
//!
//! // Platform-specific
//! let sck = /* embedded_hal::digital::OutputPin instance */;
//! let data = OpenDrain(/* open drain embedded_hal::digital::{InputPin, OutputPin} instance */);
//! let irq = /* sht15::EdgeInterrupt for the data line */;
//! let delay = /* embedded_hal::delay::DelayNs + embedded_hal_async::delay::DelayNs instance */;
//!
//! let sht15: Sht15<CriticalSectionRawMutex, _, _, _, _> =
//!     Sht15::new(sck, data, irq, delay, Config { checksum: true, ..Config::default() });
//! sht15.init().await.unwrap();
//!
//! // In the data line's falling edge interrupt handler:
//! sht15.on_data_falling_edge();
//!
//! let measurement = sht15.read_measurement().await.unwrap();
//! let centigrade = measurement.temperature.centigrade();
//! let percent = measurement.humidity.percent();
//! let low_battery = sht15.read_status().await.unwrap().low_battery;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![no_std]

#[cfg(all(feature = "defmt", feature = "log"))]
compile_error!("Features \"defmt\" and \"log\" are mutually exclusive and cannot be enabled together");

#[macro_use]
mod fmt;

mod bus;
mod cache;
pub mod calibration;
pub mod checksum;
mod device_impl;
mod hw_def;
mod measurement;
mod protocol;
mod supply;
mod types;

pub use crate::{
    bus::{DataLine, EdgeInterrupt, OpenDrain},
    hw_def::{STATUS_HEATER, STATUS_LOW_BATTERY, STATUS_LOW_RESOLUTION, STATUS_NO_OTP_RELOAD},
    supply::SupplyVoltage,
    types::*,
};
use crate::{measurement::Edge, protocol::Device, supply::Supply};

use core::cell::{Cell, RefCell};

use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;

#[cfg(feature = "defmt")]
use defmt::Format;

/// SHT1x device driver
///
/// All methods take `&self`: share the driver between tasks (and the data line interrupt) by
/// reference. `M` picks the mutex flavour; use `CriticalSectionRawMutex` when
/// [`Sht15::on_data_falling_edge`] is called from a real interrupt handler.
pub struct Sht15<M: RawMutex, SCK, DATA, IRQ, D> {
    /// transport and cached device state, locked for the whole of every exchange
    pub(crate) device: Mutex<M, Device<SCK, DATA, D>>,
    /// state shared with the data line interrupt
    pub(crate) edge: BlockingMutex<M, RefCell<Edge<IRQ>>>,
    /// raised by the interrupt or the arm-time check once DATA is low
    pub(crate) ready: Signal<M, ()>,
    pub(crate) supply: BlockingMutex<M, Cell<Supply>>,
    pub(crate) supply_changed: Signal<M, ()>,
    pub(crate) config: Config,
}

/// All possible errors in this crate
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug)]
pub enum Error<E> {
    /// GPIO error on either line
    Pin(E),
    /// The sensor did not acknowledge a command or status byte; the interface was reset
    NotAcknowledged,
    /// The sensor did not finish a measurement in time; the interface was reset
    Timeout,
    /// A checksum failed and the sensor was reset; run the operation again
    Retry,
    /// A checksum failed and the configuration could not be restored after resetting the sensor
    RecoveryFailed,
}

impl<E> From<E> for Error<E> {
    fn from(err: E) -> Self {
        Error::Pin(err)
    }
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Pin(err) => write!(f, "pin error: {err:?}"),
            Error::NotAcknowledged => write!(f, "command not acknowledged"),
            Error::Timeout => write!(f, "measurement timed out"),
            Error::Retry => write!(f, "checksum mismatch, sensor reset, retry"),
            Error::RecoveryFailed => write!(f, "checksum mismatch, unable to restore sensor settings"),
        }
    }
}
