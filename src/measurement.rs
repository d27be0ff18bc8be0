//! Measurement state machine.
//!
//! After a measurement command is acknowledged the sensor holds DATA high until the conversion is
//! done, then pulls it low. That low level is picked up one of two ways:
//!
//! - the falling edge interrupt, whose handler [`Sht15::on_data_falling_edge`] only disarms itself,
//!   bumps the `handled` generation and signals the waiting task, or
//! - the level check right after arming, for conversions that finished before the interrupt was
//!   enabled. It only signals if no interrupt was counted in the meantime.
//!
//! Either way the waiting task runs the completion handler, a plain synchronous function, exactly once
//! per signal. The task holds the protocol lock throughout, so nothing else touches the bus while a
//! measurement is pending.

use crate::bus::{DataLine, EdgeInterrupt};
use crate::checksum;
use crate::hw_def::*;
use crate::protocol::Device;
use crate::{Error, Pending, Sht15};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, with_timeout};
use embedded_hal::delay::DelayNs as BlockingDelay;
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs as AsyncDelay;

/// Which quantity to measure
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Quantity {
    Temperature,
    Humidity,
}

impl Quantity {
    fn command(self) -> Command {
        match self {
            Quantity::Temperature => Command::MeasureTemperature,
            Quantity::Humidity => Command::MeasureHumidity,
        }
    }

    fn timeout(self) -> Duration {
        match self {
            Quantity::Temperature => Duration::from_millis(TEMPERATURE_TIMEOUT_MS),
            Quantity::Humidity => Duration::from_millis(HUMIDITY_TIMEOUT_MS),
        }
    }

    fn pending(self) -> Pending {
        match self {
            Quantity::Temperature => Pending::AwaitingTemperature,
            Quantity::Humidity => Pending::AwaitingHumidity,
        }
    }
}

impl Pending {
    fn quantity(self) -> Option<Quantity> {
        match self {
            Pending::Idle => None,
            Pending::AwaitingTemperature => Some(Quantity::Temperature),
            Pending::AwaitingHumidity => Some(Quantity::Humidity),
        }
    }
}

/// Interrupt-side state
#[derive(Debug)]
pub(crate) struct Edge<IRQ> {
    pub(crate) irq: IRQ,
    pub(crate) pending: Pending,
    /// bumped by every interrupt, cleared whenever the interrupt is armed
    pub(crate) handled: u32,
}

impl<IRQ> Edge<IRQ> {
    pub(crate) const fn new(irq: IRQ) -> Self {
        Self { irq, pending: Pending::Idle, handled: 0 }
    }
}

impl<M, SCK, DATA, IRQ, D, E> Sht15<M, SCK, DATA, IRQ, D>
where
    M: RawMutex,
    SCK: OutputPin<Error = E>,
    DATA: DataLine<Error = E>,
    IRQ: EdgeInterrupt,
    D: BlockingDelay + AsyncDelay,
{
    /// Entry point for the data line's falling edge interrupt.
    ///
    /// Does not block and never touches the bus, so it may run in interrupt context.
    pub fn on_data_falling_edge(&self) {
        let pending = self.edge.lock(|edge| {
            let mut edge = edge.borrow_mut();
            edge.irq.disarm();
            edge.handled = edge.handled.wrapping_add(1);
            edge.pending
        });
        if pending != Pending::Idle {
            self.ready.signal(());
        }
    }

    /// The pending-read tag: what the sensor is currently converting, if anything
    pub fn pending(&self) -> Pending {
        self.edge.lock(|edge| edge.borrow().pending)
    }

    fn set_pending(&self, pending: Pending) {
        self.edge.lock(|edge| edge.borrow_mut().pending = pending);
    }

    fn arm(&self) {
        self.edge.lock(|edge| {
            let mut edge = edge.borrow_mut();
            edge.handled = 0;
            edge.irq.arm_falling_edge();
        });
    }

    pub(crate) fn disarm(&self) {
        self.edge.lock(|edge| edge.borrow_mut().irq.disarm());
    }

    /// Run one measurement and leave the raw result in the device state.
    ///
    /// The pending tag is `Idle` again whenever this returns, successful or not.
    pub(crate) async fn measure(&self, device: &mut Device<SCK, DATA, D>, quantity: Quantity) -> Result<(), Error<E>> {
        self.ready.reset();
        device.send_command(quantity.command())?;
        self.set_pending(quantity.pending());

        let result = self.await_result(device, quantity).await;
        self.set_pending(Pending::Idle);
        result?;

        if device.state.checksumming && !device.state.checksum_ok {
            return Err(device.recover().await);
        }
        Ok(())
    }

    async fn await_result(&self, device: &mut Device<SCK, DATA, D>, quantity: Quantity) -> Result<(), Error<E>> {
        device.bus.release_data()?;

        // The conversion may already be over by the time the interrupt is enabled; that edge is
        // gone, so look at the level instead.
        self.arm();
        if device.bus.data_is_low()? {
            let handled = self.edge.lock(|edge| {
                let mut edge = edge.borrow_mut();
                edge.irq.disarm();
                edge.handled
            });
            if handled == 0 {
                self.ready.signal(());
            }
        }

        let outcome = with_timeout(quantity.timeout(), self.wait_for_completion(device)).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!("sht15: measurement timed out");
                self.disarm();
                device.bus.connection_reset()?;
                Err(Error::Timeout)
            }
        }
    }

    async fn wait_for_completion(&self, device: &mut Device<SCK, DATA, D>) -> Result<(), Error<E>> {
        loop {
            self.ready.wait().await;
            if self.complete(device)? {
                return Ok(());
            }
        }
    }

    /// Completion handler. Returns `false` on a spurious wake-up, in which case the interrupt has
    /// been re-armed and another signal will follow.
    fn complete(&self, device: &mut Device<SCK, DATA, D>) -> Result<bool, Error<E>> {
        if !device.bus.data_is_low()? {
            // The line may have dropped between the check and arming, so look again afterwards
            self.arm();
            let low = device.bus.data_is_low()?;
            let handled = self.edge.lock(|edge| edge.borrow().handled);
            if !low || handled != 0 {
                trace!("sht15: spurious wake-up");
                return Ok(false);
            }
        }
        // DATA is about to toggle with every bit we clock in
        self.disarm();

        let Some(quantity) = self.pending().quantity() else {
            return Ok(true);
        };

        let hi = device.bus.read_byte()?;
        device.bus.ack()?;
        let lo = device.bus.read_byte()?;

        if device.state.checksumming {
            device.bus.ack()?;
            let received = device.bus.read_byte()?;
            device.state.checksum_ok =
                checksum::verify(device.state.status, &[quantity.command().as_u8(), hi, lo], received);
        }

        device.bus.end_transmission()?;

        let value = u16::from_be_bytes([hi, lo]);
        trace!("sht15: raw value {}", value);
        if !device.state.checksumming || device.state.checksum_ok {
            match quantity {
                Quantity::Temperature => device.state.raw_temperature = value,
                Quantity::Humidity => device.state.raw_humidity = value,
            }
        }

        self.set_pending(Pending::Idle);
        Ok(true)
    }
}
