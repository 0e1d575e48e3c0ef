//! Touchpad hardware initialization module
//!
//! Both MPR121 modules of the snowflake sit on the same I2C bus, strapped to
//! addresses 0x5A and 0x5B.

use embedded_hal_bus::i2c::AtomicDevice;
use embedded_hal_bus::util::AtomicCell;
use esp_hal::delay::Delay;
use esp_hal::i2c::master::I2c;
use esp_hal::Blocking;
use log::info;
use snowflake_touchpad::{Mpr121, Touchpad, MPR121_ADDRESS, MPR121_ADDRESS_VDD};

pub type SharedI2c = AtomicCell<I2c<'static, Blocking>>;

/// One MPR121 module on the shared bus
pub type Sensor = Mpr121<AtomicDevice<'static, I2c<'static, Blocking>>, Delay>;

/// Type alias for the snowflake touchpad instance
pub type Snowflake = Touchpad<Sensor, Delay>;

/// Brings up both MPR121 modules and builds the coordinate tables.
///
/// # Panics
///
/// Panics if either module does not answer at its address.
pub fn initialize_touchpad(i2c: &'static SharedI2c) -> Snowflake {
    let delay = Delay::new();
    let sensor1 = Mpr121::new(AtomicDevice::new(i2c), delay);
    let sensor2 = Mpr121::new(AtomicDevice::new(i2c), delay);

    let mut touchpad = Touchpad::new(sensor1, sensor2, delay);
    if let Err(err) = touchpad.initialize(MPR121_ADDRESS, MPR121_ADDRESS_VDD) {
        panic!("Failed to initialize touchpad: {err}");
    }

    if let Some(tables) = touchpad.tables() {
        for (module, table) in tables.iter().enumerate() {
            info!("Module {} coordinates: {:?}", module + 1, table.as_array());
        }
    }

    touchpad
}
