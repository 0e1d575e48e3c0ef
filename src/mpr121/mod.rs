// https://github.com/adafruit/Adafruit_MPR121
use core::fmt::{Display, Formatter};

use embedded_hal::i2c::Error;
use num_enum::IntoPrimitive;

use crate::touchpad::CHANNELS;

/// ADDR pin not connected
pub const MPR121_ADDRESS: u8 = 0x5A;
/// ADDR pin tied to 3V3
pub const MPR121_ADDRESS_VDD: u8 = 0x5B;
/// ADDR pin tied to SDA
pub const MPR121_ADDRESS_SDA: u8 = 0x5C;
/// ADDR pin tied to SCL
pub const MPR121_ADDRESS_SCL: u8 = 0x5D;

/// Value written to SOFTRESET to reset the chip
pub(crate) const SOFT_RESET_MAGIC: u8 = 0x63;
/// CONFIG2 reads back this value after a soft reset
pub(crate) const CONFIG2_RESET_VALUE: u8 = 0x24;
/// Run mode with baseline tracking on the first 5 bits and all 12 electrodes enabled
pub(crate) const ECR_RUN_ALL: u8 = 0x8F;
/// 16 uA charge current, first filter 6 samples
pub(crate) const CONFIG1_DEFAULT: u8 = 0x10;
/// 0.5 us encoding, 1 ms period
pub(crate) const CONFIG2_DEFAULT: u8 = 0x20;

pub(crate) const TOUCH_STATUS_MASK: u16 = 0x0FFF;
pub(crate) const FILTERED_DATA_MASK: u16 = 0x03FF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[repr(u8)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    TouchStatusL = 0x00,
    TouchStatusH = 0x01,
    FiltData0L = 0x04,
    FiltData0H = 0x05,
    Baseline0 = 0x1E,
    Mhdr = 0x2B,
    Nhdr = 0x2C,
    Nclr = 0x2D,
    Fdlr = 0x2E,
    Mhdf = 0x2F,
    Nhdf = 0x30,
    Nclf = 0x31,
    Fdlf = 0x32,
    Nhdt = 0x33,
    Nclt = 0x34,
    Fdlt = 0x35,
    TouchTh0 = 0x41,
    ReleaseTh0 = 0x42,
    Debounce = 0x5B,
    Config1 = 0x5C,
    Config2 = 0x5D,
    Ecr = 0x5E,
    AutoConfig0 = 0x7B,
    AutoConfig1 = 0x7C,
    UpLimit = 0x7D,
    LowLimit = 0x7E,
    TargetLimit = 0x7F,
    SoftReset = 0x80,
}

impl Register {
    pub fn addr(self) -> u8 {
        self.into()
    }

    /// Register of `channel`, for banks laid out `stride` bytes apart
    pub(crate) fn channel(self, channel: u8, stride: u8) -> u8 {
        self.addr() + channel * stride
    }
}

/// Baseline filter and debounce settings applied by `begin`, in order.
pub(crate) const FILTER_DEFAULTS: &[(Register, u8)] = &[
    (Register::Mhdr, 0x01),
    (Register::Nhdr, 0x01),
    (Register::Nclr, 0x0E),
    (Register::Fdlr, 0x00),
    (Register::Mhdf, 0x01),
    (Register::Nhdf, 0x05),
    (Register::Nclf, 0x01),
    (Register::Fdlf, 0x00),
    (Register::Nhdt, 0x00),
    (Register::Nclt, 0x00),
    (Register::Fdlt, 0x00),
    (Register::Debounce, 0x00),
];

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mpr121Config {
    /// Electrode counts above baseline that register a touch
    pub touch_threshold: u8,
    /// Electrode counts above baseline below which a touch is released
    pub release_threshold: u8,
}

impl Default for Mpr121Config {
    fn default() -> Self {
        Self {
            touch_threshold: 12,
            release_threshold: 6,
        }
    }
}

/// Errors that can occur when interacting with the MPR121
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mpr121Error {
    I2CError,
    /// CONFIG2 did not read back its reset value after a soft reset
    NotFound(u8),
    /// Electrode index past the last channel
    InvalidChannel(u8),
}

impl Display for Mpr121Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Mpr121Error::I2CError => write!(f, "I2C error"),
            Mpr121Error::NotFound(config2) => {
                write!(f, "MPR121 not found (CONFIG2 = 0x{config2:02X})")
            }
            Mpr121Error::InvalidChannel(channel) => write!(f, "invalid channel {channel}"),
        }
    }
}

impl<E> From<E> for Mpr121Error
where
    E: Error,
{
    fn from(_: E) -> Self {
        Mpr121Error::I2CError
    }
}

pub(crate) fn check_channel(channel: u8) -> Result<(), Mpr121Error> {
    if usize::from(channel) < CHANNELS {
        Ok(())
    } else {
        Err(Mpr121Error::InvalidChannel(channel))
    }
}

#[cfg(feature = "async")]
pub mod asynch;
pub mod blocking;
