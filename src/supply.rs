//! Supply voltage tracking.
//!
//! The temperature offset depends on VDD. The voltage lives outside the protocol lock: a change
//! notification only marks it stale and wakes whoever runs [`Sht15::watch_supply`], which queries
//! the source again.

use crate::Sht15;

use core::convert::Infallible;

use embassy_sync::blocking_mutex::raw::RawMutex;

/// Source of the sensor's supply voltage, typically a regulator
pub trait SupplyVoltage {
    /// Error type
    type Error;
    /// Current output in microvolts; zero or negative means unknown
    fn voltage_uv(&mut self) -> Result<i32, Self::Error>;
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Supply {
    pub(crate) uv: i32,
    pub(crate) valid: bool,
}

impl<M: RawMutex, SCK, DATA, IRQ, D> Sht15<M, SCK, DATA, IRQ, D> {
    /// Supply voltage in microvolts used for temperature compensation
    pub fn supply_uv(&self) -> i32 {
        self.supply.lock(|supply| supply.get().uv)
    }

    /// Whether the supply voltage is known to be current
    pub fn supply_valid(&self) -> bool {
        self.supply.lock(|supply| supply.get().valid)
    }

    /// Notification that the supply voltage changed.
    ///
    /// Does not block; call it from the regulator's notifier. The new voltage is fetched by
    /// [`Sht15::watch_supply`].
    pub fn on_supply_voltage_change(&self) {
        self.supply.lock(|supply| {
            let mut current = supply.get();
            current.valid = false;
            supply.set(current);
        });
        self.supply_changed.signal(());
    }

    /// Query `source` once and use its answer from now on.
    ///
    /// An unknown (non-positive) reading keeps the previous voltage. Returns the voltage in use.
    pub fn update_supply<S: SupplyVoltage>(&self, source: &mut S) -> Result<i32, S::Error> {
        let reading = source.voltage_uv()?;
        Ok(self.supply.lock(|supply| {
            let mut current = supply.get();
            if reading > 0 {
                current = Supply { uv: reading, valid: true };
                supply.set(current);
                debug!("sht15: supply {} uV", reading);
            } else {
                warn!("sht15: supply voltage unknown, keeping {} uV", current.uv);
            }
            current.uv
        }))
    }

    /// Refresh the supply voltage every time [`Sht15::on_supply_voltage_change`] is called.
    ///
    /// Runs until `source` fails.
    pub async fn watch_supply<S: SupplyVoltage>(&self, source: &mut S) -> Result<Infallible, S::Error> {
        loop {
            self.supply_changed.wait().await;
            self.update_supply(source)?;
        }
    }
}
