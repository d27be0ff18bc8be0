mod common;

use std::thread::sleep;
use std::time::Duration;

use common::*;

use embassy_futures::block_on;
use sht15::Config;

fn script_measurement(wire: &Shared) {
    let mut wire = wire.borrow_mut();
    wire.measurement(1000);
    wire.measurement(0x0640);
}

#[test]
fn readings_expire_after_max_age() {
    let (sht15, wire) = sensor(Config::default());

    script_measurement(&wire);
    block_on(sht15.read_measurement()).unwrap();
    assert_eq!(wire.borrow().commands().len(), 2);

    sleep(Duration::from_millis(500));
    block_on(sht15.read_measurement()).unwrap();
    assert_eq!(wire.borrow().commands().len(), 2);

    sleep(Duration::from_millis(600));
    script_measurement(&wire);
    block_on(sht15.read_measurement()).unwrap();
    assert_eq!(wire.borrow().commands(), [MEASURE_HUMIDITY, MEASURE_TEMPERATURE, MEASURE_HUMIDITY, MEASURE_TEMPERATURE]);
    assert!(wire.borrow().script_is_empty());
}
