//! Bit-banged two-wire transport (datasheet section 3).
//!
//! SCK is always driven by us. DATA is open drain: we either drive it or release it to the pull-up
//! and let the sensor pull it low. Timing is entirely ours, so every edge is followed by a busy wait
//! of at least the datasheet minimum.

use crate::hw_def::*;
use crate::Error;

use embedded_hal::delay::DelayNs as BlockingDelay;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState};
use embedded_hal_async::delay::DelayNs as AsyncDelay;

/// Bidirectional data line
///
/// The sensor needs the line switched between driven output and released input in the middle of an
/// exchange. Implement this for a HAL's flexible pin, or wrap an open-drain pin in [`OpenDrain`].
pub trait DataLine: InputPin + OutputPin {
    /// Stop driving the line so the sensor can pull it low
    fn set_input(&mut self) -> Result<(), Self::Error>;
    /// Drive the line to `state`
    fn set_output(&mut self, state: PinState) -> Result<(), Self::Error>;
}

/// Falling edge notification on the data line
///
/// The platform's interrupt handler for this line must call [`crate::Sht15::on_data_falling_edge`].
pub trait EdgeInterrupt {
    /// Enable the falling edge interrupt
    fn arm_falling_edge(&mut self);
    /// Disable the interrupt; must be safe to call when already disabled
    fn disarm(&mut self);
}

/// [`DataLine`] over an open-drain pin with an external pull-up, where releasing the line means
/// writing high.
#[derive(Debug)]
pub struct OpenDrain<P>(pub P);
impl<P: ErrorType> ErrorType for OpenDrain<P> {
    type Error = P::Error;
}
impl<P: InputPin> InputPin for OpenDrain<P> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }
    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.is_low()
    }
}
impl<P: OutputPin> OutputPin for OpenDrain<P> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }
}
impl<P: InputPin + OutputPin> DataLine for OpenDrain<P> {
    fn set_input(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }
    fn set_output(&mut self, state: PinState) -> Result<(), Self::Error> {
        self.0.set_state(state)
    }
}

/// The two lines plus the delay that paces them
#[derive(Debug)]
pub(crate) struct Bus<SCK, DATA, D> {
    pub(crate) sck: SCK,
    pub(crate) data: DATA,
    pub(crate) delay: D,
}

impl<SCK, DATA, D, E> Bus<SCK, DATA, D>
where
    SCK: OutputPin<Error = E>,
    DATA: DataLine<Error = E>,
    D: BlockingDelay + AsyncDelay,
{
    pub(crate) fn new(sck: SCK, data: DATA, delay: D) -> Self {
        Self { sck, data, delay }
    }

    fn wait_ns(&mut self, ns: u32) {
        BlockingDelay::delay_ns(&mut self.delay, ns);
    }

    /// Sleep rather than spin; used for settle times in the millisecond range
    pub(crate) async fn sleep_ms(&mut self, ms: u32) {
        AsyncDelay::delay_ms(&mut self.delay, ms).await;
    }

    fn clock_pulse(&mut self, high_ns: u32, low_ns: u32) -> Result<(), E> {
        self.sck.set_high()?;
        self.wait_ns(high_ns);
        self.sck.set_low()?;
        self.wait_ns(low_ns);
        Ok(())
    }

    /// Section 3.4: nine clocks with DATA high bring the interface back to idle whatever state the
    /// sensor's shift register was in. The status register is left alone.
    pub(crate) fn connection_reset(&mut self) -> Result<(), E> {
        debug!("sht15: connection reset");
        self.data.set_output(PinState::High)?;
        self.wait_ns(T_SCK_LOW_NS);
        self.sck.set_low()?;
        self.wait_ns(T_SCK_LOW_NS);
        for _ in 0..CONNECTION_RESET_PULSES {
            self.clock_pulse(T_SCK_HIGH_NS, T_SCK_LOW_NS)?;
        }
        Ok(())
    }

    fn send_bit(&mut self, bit: bool) -> Result<(), E> {
        self.data.set_state(PinState::from(bit))?;
        self.wait_ns(T_SETUP_NS);
        self.clock_pulse(T_SCK_HIGH_NS, T_SCK_LOW_NS)
    }

    /// Figure 12: DATA falls while SCK is high, then rises again during the following SCK high.
    pub(crate) fn transmission_start(&mut self) -> Result<(), E> {
        self.data.set_output(PinState::High)?;
        self.wait_ns(T_SETUP_NS);
        self.sck.set_low()?;
        self.wait_ns(T_SCK_LOW_NS);
        self.sck.set_high()?;
        self.wait_ns(T_SCK_HIGH_NS);
        self.data.set_low()?;
        self.wait_ns(T_SETUP_NS);
        self.sck.set_low()?;
        self.wait_ns(T_SCK_LOW_NS);
        self.sck.set_high()?;
        self.wait_ns(T_SCK_HIGH_NS);
        self.data.set_high()?;
        self.wait_ns(T_SETUP_NS);
        self.sck.set_low()?;
        self.wait_ns(T_SCK_LOW_NS);
        Ok(())
    }

    /// MSB first. DATA must already be an output.
    pub(crate) fn send_byte(&mut self, byte: u8) -> Result<(), E> {
        for i in (0..8).rev() {
            self.send_bit(byte & (1 << i) != 0)?;
        }
        Ok(())
    }

    /// Release DATA and sample it during the ninth clock. High means the sensor did not take the
    /// byte; the interface is reset before reporting it.
    pub(crate) fn wait_for_ack(&mut self) -> Result<(), Error<E>> {
        self.data.set_input()?;
        self.sck.set_high()?;
        self.wait_ns(T_SCK_HIGH_NS);
        if self.data.is_high()? {
            self.sck.set_low()?;
            warn!("sht15: command not acknowledged");
            self.connection_reset()?;
            return Err(Error::NotAcknowledged);
        }
        self.sck.set_low()?;
        self.wait_ns(T_SCK_LOW_NS);
        Ok(())
    }

    /// MSB first, sampled while SCK is high. DATA must already be released.
    pub(crate) fn read_byte(&mut self) -> Result<u8, E> {
        let mut byte = 0u8;
        for _ in 0..8 {
            byte <<= 1;
            self.sck.set_high()?;
            self.wait_ns(T_SCK_HIGH_NS);
            byte |= self.data.is_high()? as u8;
            self.sck.set_low()?;
            self.wait_ns(T_SCK_LOW_NS);
        }
        Ok(byte)
    }

    /// Pull DATA low for one clock to ask for the next byte, then release it again
    pub(crate) fn ack(&mut self) -> Result<(), E> {
        self.data.set_output(PinState::Low)?;
        self.wait_ns(T_SETUP_NS);
        self.sck.set_high()?;
        self.wait_ns(T_SETUP_NS);
        self.sck.set_low()?;
        self.wait_ns(T_SETUP_NS);
        self.data.set_high()?;
        self.data.set_input()
    }

    /// NAK: one clock with DATA held high, no more bytes wanted
    pub(crate) fn end_transmission(&mut self) -> Result<(), E> {
        self.data.set_output(PinState::High)?;
        self.wait_ns(T_SETUP_NS);
        self.clock_pulse(T_SCK_HIGH_NS, T_SCK_LOW_NS)
    }

    pub(crate) fn release_data(&mut self) -> Result<(), E> {
        self.data.set_input()
    }

    pub(crate) fn data_is_low(&mut self) -> Result<bool, E> {
        self.data.is_low()
    }
}
