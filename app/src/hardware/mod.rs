//! Hardware initialization modules
//!
//! - **Touchpad**: two MPR121 capacitive sensors sharing one I2C bus

pub mod touch;

pub use touch::{initialize_touchpad, SharedI2c, Snowflake};
