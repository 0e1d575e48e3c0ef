#![no_std]
//! Snowflake touchpad driver.
//!
//! Two MPR121 capacitive sensors, twelve electrodes each, are laid out as a
//! snowflake. Every electrode is mapped once to a fixed point of a 0..=255
//! square; a position read averages the points of all touched electrodes.
//!
//! Holding electrodes 4 and 11 of both sensors soft-resets the pad once they
//! are let go.

#[cfg(test)]
extern crate alloc;

pub mod layout;
pub mod mpr121;
pub mod touchpad;

#[cfg(test)]
mod test_support;

pub use mpr121::blocking::Mpr121;
pub use mpr121::{Mpr121Config, Mpr121Error, MPR121_ADDRESS, MPR121_ADDRESS_VDD};
pub use touchpad::blocking::{TouchSensor, Touchpad};
pub use touchpad::{
    Axis, Coordinate, Module, PassThrough, TouchBuffer, TouchMask, TouchpadConfig, TouchpadError,
};

#[cfg(feature = "async")]
pub use mpr121::asynch::Mpr121Async;
#[cfg(feature = "async")]
pub use touchpad::asynch::TouchpadAsync;
