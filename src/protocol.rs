use crate::bus::{Bus, DataLine};
use crate::cache::Freshness;
use crate::checksum;
use crate::hw_def::*;
use crate::Error;

use embedded_hal::delay::DelayNs as BlockingDelay;
use embedded_hal::digital::{OutputPin, PinState};
use embedded_hal_async::delay::DelayNs as AsyncDelay;

/// Everything the sensor told us last time we asked
#[derive(Debug)]
pub(crate) struct DeviceState {
    pub(crate) raw_temperature: u16,
    pub(crate) raw_humidity: u16,
    /// status register at the time the raw counts were taken
    pub(crate) measured_status: u8,
    /// last known status register; also seeds the checksum
    pub(crate) status: u8,
    pub(crate) checksum_ok: bool,
    pub(crate) checksumming: bool,
    pub(crate) measurements: Freshness,
    pub(crate) status_read: Freshness,
}

impl DeviceState {
    pub(crate) const fn new(checksumming: bool) -> Self {
        Self {
            raw_temperature: 0,
            raw_humidity: 0,
            measured_status: 0,
            status: 0,
            checksum_ok: false,
            checksumming,
            measurements: Freshness::new(),
            status_read: Freshness::new(),
        }
    }
}

/// The transport together with the state it talks about. Only reachable through the driver's
/// protocol lock.
#[derive(Debug)]
pub(crate) struct Device<SCK, DATA, D> {
    pub(crate) bus: Bus<SCK, DATA, D>,
    pub(crate) state: DeviceState,
}

impl<SCK, DATA, D, E> Device<SCK, DATA, D>
where
    SCK: OutputPin<Error = E>,
    DATA: DataLine<Error = E>,
    D: BlockingDelay + AsyncDelay,
{
    pub(crate) fn new(sck: SCK, data: DATA, delay: D, checksumming: bool) -> Self {
        Self { bus: Bus::new(sck, data, delay), state: DeviceState::new(checksumming) }
    }

    /// Transmission start, command byte, acknowledge. On entry SCK is low and DATA is high.
    pub(crate) fn send_command(&mut self, cmd: Command) -> Result<(), Error<E>> {
        trace!("sht15: command {:#x}", cmd.as_u8());
        self.bus.transmission_start()?;
        self.bus.send_byte(cmd.as_u8())?;
        self.bus.wait_for_ack()
    }

    /// Section 3.2. The sensor returns to its power-on status register, so the cached copy (and with
    /// it the checksum seed) goes back to zero.
    pub(crate) async fn soft_reset(&mut self) -> Result<(), Error<E>> {
        self.send_command(Command::SoftReset)?;
        self.bus.sleep_ms(T_SOFT_RESET_MS).await;
        self.state.status = 0;
        debug!("sht15: soft reset");
        Ok(())
    }

    /// Figure 14. The cached status only changes once the sensor acknowledged the new value.
    pub(crate) fn write_status(&mut self, status: u8) -> Result<(), Error<E>> {
        self.send_command(Command::WriteStatus)?;
        self.bus.data.set_output(PinState::High)?;
        self.bus.send_byte(status)?;
        self.bus.wait_for_ack()?;
        debug!("sht15: status written {:#x}", status);
        self.state.status = status;
        Ok(())
    }

    /// Figure 15. Returns the status byte without storing it.
    pub(crate) async fn read_status(&mut self) -> Result<u8, Error<E>> {
        self.send_command(Command::ReadStatus)?;
        let status = self.bus.read_byte()?;

        if self.state.checksumming {
            self.bus.ack()?;
            let received = self.bus.read_byte()?;
            self.state.checksum_ok =
                checksum::verify(self.state.status, &[Command::ReadStatus.as_u8(), status], received);
        }

        self.bus.end_transmission()?;

        if self.state.checksumming && !self.state.checksum_ok {
            return Err(self.recover().await);
        }
        Ok(status)
    }

    /// After a checksum failure the datasheet asks for a soft reset. That also wipes the
    /// configuration bits, which are written back if any were set. Returns the error the failed
    /// operation has to report.
    pub(crate) async fn recover(&mut self) -> Error<E> {
        let previous_config = self.state.status & STATUS_CONFIG_MASK;
        warn!("sht15: checksum mismatch, resetting (config {:#x})", previous_config);

        if let Err(err) = self.soft_reset().await {
            return err;
        }
        if previous_config != 0 && self.write_status(previous_config).is_err() {
            error!("sht15: CRC validation failed, unable to restore device settings");
            return Error::RecoveryFailed;
        }
        Error::Retry
    }
}
