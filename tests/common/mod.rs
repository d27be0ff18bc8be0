//! Simulated SHT1x bus.
//!
//! Every rising SCK edge records what we were driving on DATA (`None` when released). Reads of a
//! released DATA line pop scripted levels; an empty script reads as the pull-up.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState};
use sht15::{checksum, Config, DataLine, EdgeInterrupt, Sht15};

pub const MEASURE_TEMPERATURE: u8 = 0x03;
pub const MEASURE_HUMIDITY: u8 = 0x05;
pub const WRITE_STATUS: u8 = 0x06;
pub const READ_STATUS: u8 = 0x07;
pub const SOFT_RESET: u8 = 0x1E;

#[derive(Debug, Default)]
pub struct Wire {
    sck: bool,
    data_output: bool,
    data_level: bool,
    script: VecDeque<bool>,
    pub clocked: Vec<Option<bool>>,
    pub armed: bool,
    pub arms: usize,
}

/// What the sensor saw on the wire
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Frame {
    Command(u8),
    Written(u8),
}

impl Wire {
    pub fn ack(&mut self) {
        self.script.push_back(false);
    }

    pub fn nak(&mut self) {
        self.script.push_back(true);
    }

    pub fn level(&mut self, high: bool) {
        self.script.push_back(high);
    }

    pub fn byte(&mut self, byte: u8) {
        for i in (0..8).rev() {
            self.script.push_back(byte & (1 << i) != 0);
        }
    }

    /// Checksum byte the way the sensor sends it
    pub fn checksum(&mut self, status: u8, frame: &[u8]) {
        self.byte(checksum::crc8(status, frame).reverse_bits());
    }

    /// Command acknowledged, conversion already finished when the driver looks, result bytes
    pub fn measurement(&mut self, value: u16) {
        self.ack();
        self.level(false); // arm-time check
        self.level(false); // completion handler check
        self.byte((value >> 8) as u8);
        self.byte(value as u8);
    }

    pub fn measurement_with_checksum(&mut self, cmd: u8, value: u16, status: u8) {
        self.measurement(value);
        self.checksum(status, &[cmd, (value >> 8) as u8, value as u8]);
    }

    pub fn script_is_empty(&self) -> bool {
        self.script.is_empty()
    }

    pub fn frames(&self) -> Vec<Frame> {
        let c = &self.clocked;
        let bits = |range: std::ops::Range<usize>| -> Option<u8> {
            if range.end > c.len() {
                return None;
            }
            c[range].iter().try_fold(0u8, |byte, bit| bit.map(|bit| (byte << 1) | bit as u8))
        };

        let mut frames = Vec::new();
        let mut i = 0;
        while i + 10 < c.len() {
            let start = c[i] == Some(true) && c[i + 1] == Some(false);
            match (start, bits(i + 2..i + 10), c[i + 10]) {
                (true, Some(cmd), None) => {
                    frames.push(Frame::Command(cmd));
                    i += 11;
                    if cmd == WRITE_STATUS {
                        if let (Some(status), Some(None)) = (bits(i..i + 8), c.get(i + 8)) {
                            frames.push(Frame::Written(status));
                            i += 9;
                        }
                    }
                }
                _ => i += 1,
            }
        }
        frames
    }

    pub fn commands(&self) -> Vec<u8> {
        self.frames()
            .into_iter()
            .filter_map(|frame| match frame {
                Frame::Command(cmd) => Some(cmd),
                Frame::Written(_) => None,
            })
            .collect()
    }

    /// Connection resets: runs of at least nine clocks with DATA driven high
    pub fn resets(&self) -> usize {
        let mut resets = 0;
        let mut run = 0;
        for edge in self.clocked.iter().chain([None].iter()) {
            if *edge == Some(true) {
                run += 1;
            } else {
                if run >= 9 {
                    resets += 1;
                }
                run = 0;
            }
        }
        resets
    }

    pub fn clear(&mut self) {
        self.clocked.clear();
    }
}

pub type Shared = Rc<RefCell<Wire>>;

pub struct Sck(pub Shared);
pub struct Data(pub Shared);
pub struct Irq(pub Shared);

impl ErrorType for Sck {
    type Error = Infallible;
}
impl OutputPin for Sck {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().sck = false;
        Ok(())
    }
    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut wire = self.0.borrow_mut();
        if !wire.sck {
            let edge = wire.data_output.then_some(wire.data_level);
            wire.clocked.push(edge);
        }
        wire.sck = true;
        Ok(())
    }
}

impl ErrorType for Data {
    type Error = Infallible;
}
impl InputPin for Data {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let mut wire = self.0.borrow_mut();
        if wire.data_output {
            Ok(wire.data_level)
        } else {
            Ok(wire.script.pop_front().unwrap_or(true))
        }
    }
    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}
impl OutputPin for Data {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().data_level = false;
        Ok(())
    }
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().data_level = true;
        Ok(())
    }
}
impl DataLine for Data {
    fn set_input(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().data_output = false;
        Ok(())
    }
    fn set_output(&mut self, state: PinState) -> Result<(), Self::Error> {
        let mut wire = self.0.borrow_mut();
        wire.data_output = true;
        wire.data_level = state == PinState::High;
        Ok(())
    }
}

impl EdgeInterrupt for Irq {
    fn arm_falling_edge(&mut self) {
        let mut wire = self.0.borrow_mut();
        wire.armed = true;
        wire.arms += 1;
    }
    fn disarm(&mut self) {
        self.0.borrow_mut().armed = false;
    }
}

pub struct NoDelay;
impl embedded_hal::delay::DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
impl embedded_hal_async::delay::DelayNs for NoDelay {
    async fn delay_ns(&mut self, _ns: u32) {}
}

pub type TestSht15 = Sht15<NoopRawMutex, Sck, Data, Irq, NoDelay>;

pub fn sensor(config: Config) -> (TestSht15, Shared) {
    let wire = Shared::default();
    let sht15 = Sht15::new(Sck(wire.clone()), Data(wire.clone()), Irq(wire.clone()), NoDelay, config);
    (sht15, wire)
}

/// Stand-in for the interrupt controller: fires the edge handler `count` times, each time after the
/// driver armed the interrupt.
pub async fn fire_edges(sht15: &TestSht15, wire: &Shared, count: usize) {
    for _ in 0..count {
        while !wire.borrow().armed {
            embassy_futures::yield_now().await;
        }
        sht15.on_data_falling_edge();
    }
}
