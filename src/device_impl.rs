use crate::bus::{DataLine, EdgeInterrupt};
use crate::hw_def::*;
use crate::measurement::{Edge, Quantity};
use crate::protocol::Device;
use crate::supply::Supply;
use crate::types::*;
use crate::{Error, Sht15};

use core::cell::{Cell, RefCell};
use core::future::Future;

use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::Instant;
use embedded_hal::delay::DelayNs as BlockingDelay;
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs as AsyncDelay;

impl<M, SCK, DATA, IRQ, D, E> Sht15<M, SCK, DATA, IRQ, D>
where
    M: RawMutex,
    SCK: OutputPin<Error = E>,
    DATA: DataLine<Error = E>,
    IRQ: EdgeInterrupt,
    D: BlockingDelay + AsyncDelay,
{
    /// Create a new SHT1x driver instance. Nothing is sent until [`Sht15::init`].
    pub fn new(sck: SCK, data: DATA, irq: IRQ, delay: D, config: Config) -> Self {
        Self {
            device: Mutex::new(Device::new(sck, data, delay, config.checksum)),
            edge: BlockingMutex::new(RefCell::new(Edge::new(irq))),
            ready: Signal::new(),
            supply: BlockingMutex::new(Cell::new(Supply { uv: config.supply_uv(), valid: true })),
            supply_changed: Signal::new(),
            config,
        }
    }

    /// Bring the interface and the sensor to a known state and apply the configured status bits
    pub async fn init(&self) -> Result<(), Error<E>> {
        let mut device = self.device.lock().await;
        self.disarm();
        device.bus.connection_reset()?;
        device.soft_reset().await?;

        let status = self.config.status_bits();
        if status != 0 {
            device.write_status(status)?;
        }
        debug!("sht15: initialized, status {:#x}", status);
        Ok(())
    }

    /// Software reset: the sensor returns to its power-on defaults, including the status register
    pub async fn soft_reset(&self) -> Result<(), Error<E>> {
        self.device.lock().await.soft_reset().await
    }

    /// Return the raw counts, measuring humidity and temperature first if the cached ones are
    /// missing or older than [`Config::max_age`].
    ///
    /// Does not retry: a checksum failure shows up as [`Error::Retry`].
    pub async fn update_measurements(&self) -> Result<RawMeasurement, Error<E>> {
        let mut device = self.device.lock().await;
        if device.state.measurements.needs_refresh(Instant::now(), self.config.max_age) {
            self.measure(&mut device, Quantity::Humidity).await?;
            self.measure(&mut device, Quantity::Temperature).await?;
            device.state.measured_status = device.state.status;
            device.state.measurements.mark(Instant::now());
        }
        // Calibrate with the resolution the counts were taken at, even if the status changed since
        Ok(RawMeasurement {
            temperature: device.state.raw_temperature,
            humidity: device.state.raw_humidity,
            status: device.state.measured_status,
        })
    }

    /// Return the status register, reading it from the sensor first if the cached copy is missing
    /// or older than [`Config::max_age`].
    ///
    /// Does not retry: a checksum failure shows up as [`Error::Retry`].
    pub async fn update_status(&self) -> Result<StatusBits, Error<E>> {
        let mut device = self.device.lock().await;
        if device.state.status_read.needs_refresh(Instant::now(), self.config.max_age) {
            let status = device.read_status().await?;
            device.state.status = status;
            device.state.status_read.mark(Instant::now());
        }
        Ok(StatusBits::from(device.state.status))
    }

    async fn with_retries<T, F, Fut>(&self, mut op: F) -> Result<T, Error<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error<E>>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Err(Error::Retry) if attempt < self.config.retries => {
                    attempt += 1;
                    warn!("sht15: retrying after checksum failure ({})", attempt);
                }
                result => return result,
            }
        }
    }

    fn calibrate(&self, raw: &RawMeasurement) -> Measurement {
        if !self.supply_valid() {
            warn!("sht15: supply voltage stale, compensating for {} uV", self.supply_uv());
        }
        let supply_uv = self.supply_uv();
        Measurement { temperature: raw.temperature(supply_uv), humidity: raw.humidity(supply_uv) }
    }

    /// Calibrated temperature and humidity from one exchange
    pub async fn read_measurement(&self) -> Result<Measurement, Error<E>> {
        let raw = self.with_retries(move || self.update_measurements()).await?;
        Ok(self.calibrate(&raw))
    }

    /// Temperature, compensated for the supply voltage
    pub async fn read_temperature(&self) -> Result<Millidegrees, Error<E>> {
        Ok(self.read_measurement().await?.temperature)
    }

    /// Relative humidity, compensated for the temperature
    pub async fn read_humidity(&self) -> Result<MilliPercent, Error<E>> {
        Ok(self.read_measurement().await?.humidity)
    }

    /// Status register
    pub async fn read_status(&self) -> Result<StatusBits, Error<E>> {
        self.with_retries(move || self.update_status()).await
    }

    /// Whether any of the bits in `mask` (see `STATUS_*`) is set in the status register
    pub async fn read_status_bit(&self, mask: u8) -> Result<bool, Error<E>> {
        Ok(self.read_status().await?.raw() & mask != 0)
    }

    /// Condensation heater
    pub async fn set_heater(&self, enable: bool) -> Result<(), Error<E>> {
        let mut device = self.device.lock().await;
        let mut status = device.state.status & STATUS_CONFIG_MASK;
        if enable {
            status |= STATUS_HEATER;
        } else {
            status &= !STATUS_HEATER;
        }
        device.write_status(status)
    }

    /// Give back the pins, interrupt and delay. Call [`Sht15::soft_reset`] first to leave the
    /// sensor in its power-on state.
    pub fn release(self) -> (SCK, DATA, IRQ, D) {
        let device = self.device.into_inner();
        let edge = self.edge.into_inner().into_inner();
        (device.bus.sck, device.bus.data, edge.irq, device.bus.delay)
    }
}
