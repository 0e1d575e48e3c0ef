use core::fmt::{self, Debug, Display, Formatter};

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::layout::{SensorLayout, SNOWFLAKE_LAYOUT};

/// Electrodes per sensor module
pub const CHANNELS: usize = 12;
/// Sensor modules making up the pad
pub const MODULES: usize = 2;

pub const COORD_MIN: u8 = 0;
pub const COORD_MAX: u8 = 255;
/// Reported when nothing is touched
pub const COORD_MID: u8 = COORD_MAX / 2;

// Pi as the deployed firmware computed it. Coordinate tables must stay
// bit-identical with it.
#[allow(clippy::approx_constant)]
const FIRMWARE_PI: f64 = 3.14159;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    X = b'x',
    Y = b'y',
}

impl TryFrom<char> for Axis {
    type Error = char;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            'x' => Ok(Axis::X),
            'y' => Ok(Axis::Y),
            other => Err(other),
        }
    }
}

impl Display for Axis {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Module {
    First = 0,
    Second = 1,
}

impl Module {
    pub const ALL: [Module; MODULES] = [Module::First, Module::Second];

    pub fn index(self) -> usize {
        u8::from(self) as usize
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Module::First => write!(f, "module 1"),
            Module::Second => write!(f, "module 2"),
        }
    }
}

bitflags! {
    /// Electrodes of one module currently reporting a touch.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct TouchMask: u16 {
        const CH0  = 1 << 0;
        const CH1  = 1 << 1;
        const CH2  = 1 << 2;
        const CH3  = 1 << 3;
        const CH4  = 1 << 4;
        const CH5  = 1 << 5;
        const CH6  = 1 << 6;
        const CH7  = 1 << 7;
        const CH8  = 1 << 8;
        const CH9  = 1 << 9;
        const CH10 = 1 << 10;
        const CH11 = 1 << 11;
    }
}

impl TouchMask {
    /// Mask with a single channel set, empty for channels past the last electrode.
    pub fn channel(channel: usize) -> Self {
        if channel < CHANNELS {
            Self::from_bits_truncate(1 << channel)
        } else {
            Self::empty()
        }
    }

    pub fn is_touched(self, channel: usize) -> bool {
        channel < CHANNELS && self.contains(Self::channel(channel))
    }

    /// Indices of the touched channels in ascending order.
    pub fn channels(self) -> impl Iterator<Item = usize> {
        (0..CHANNELS).filter(move |&channel| self.is_touched(channel))
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TouchMask {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=u16:#05x}", self.bits());
    }
}

/// Position on the pad in the 8-bit output space, (0, 0) being top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Coordinate {
    pub x: u8,
    pub y: u8,
}

impl Coordinate {
    pub const CENTER: Coordinate = Coordinate::new(COORD_MID, COORD_MID);

    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    pub fn get(self, axis: Axis) -> u8 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }
}

impl Default for Coordinate {
    fn default() -> Self {
        Coordinate::CENTER
    }
}

/// Projects one component of a polar placement onto the 8-bit output range.
///
/// The half range is the integer midpoint (127) and the result is truncated
/// toward zero, saturating at the bounds of `u8`.
pub fn polar_to_axis(angle_deg: f64, length: f64, axis: Axis) -> u8 {
    let rad = angle_deg * (2.0 * FIRMWARE_PI / 360.0);
    let unit = match axis {
        Axis::X => libm::cos(rad),
        Axis::Y => libm::sin(rad),
    };
    let length = length.clamp(0.0, 1.0);

    (unit * length * (f64::from(COORD_MAX) + 1.0) / 2.0 + f64::from(COORD_MID)) as u8
}

/// Converts a polar placement to an output coordinate.
///
/// The y component is stored as its 8-bit negation so that "up" on the pad
/// maps to small y values.
pub fn polar_to_coordinate(angle_deg: f64, length: f64) -> Coordinate {
    Coordinate {
        x: polar_to_axis(angle_deg, length, Axis::X),
        y: polar_to_axis(angle_deg, length, Axis::Y).wrapping_neg(),
    }
}

/// Per-channel output coordinates of one sensor module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CoordinateTable([Coordinate; CHANNELS]);

impl CoordinateTable {
    pub fn build(layout: &SensorLayout) -> Self {
        let mut table = [Coordinate::CENTER; CHANNELS];
        for (slot, placement) in table.iter_mut().zip(layout) {
            *slot = placement
                .pinned
                .unwrap_or_else(|| polar_to_coordinate(placement.angle_deg, placement.length));
        }
        Self(table)
    }

    pub fn coordinate(&self, channel: usize) -> Option<Coordinate> {
        self.0.get(channel).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coordinate> {
        self.0.iter()
    }

    pub fn as_array(&self) -> &[Coordinate; CHANNELS] {
        &self.0
    }
}

pub type CoordinateTables = [CoordinateTable; MODULES];

pub fn build_tables(layout: &[SensorLayout; MODULES]) -> CoordinateTables {
    [
        CoordinateTable::build(&layout[0]),
        CoordinateTable::build(&layout[1]),
    ]
}

/// Mean coordinate of every touched channel on both modules.
///
/// Truncating division; [`COORD_MID`] when nothing is touched.
pub fn average(tables: &CoordinateTables, masks: &[TouchMask; MODULES], axis: Axis) -> u8 {
    let mut total: u32 = 0;
    let mut count: u32 = 0;

    for (table, mask) in tables.iter().zip(masks) {
        for coordinate in mask.channels().filter_map(|channel| table.coordinate(channel)) {
            total += u32::from(coordinate.get(axis));
            count += 1;
        }
    }

    if count == 0 {
        COORD_MID
    } else {
        (total / count) as u8
    }
}

/// Outer left and top arrows on module 1, outer right and bottom arrows on module 2.
pub const SOFT_RESET_GESTURE: [TouchMask; MODULES] = [
    TouchMask::CH4.union(TouchMask::CH11),
    TouchMask::CH5.union(TouchMask::CH11),
];

/// True when every channel of `gesture` is held. An all-empty gesture never matches.
pub fn is_reset_gesture(masks: &[TouchMask; MODULES], gesture: &[TouchMask; MODULES]) -> bool {
    gesture.iter().any(|g| !g.is_empty())
        && masks.iter().zip(gesture).all(|(mask, g)| mask.contains(*g))
}

/// True while any channel of `gesture` is still held.
pub(crate) fn gesture_held(masks: &[TouchMask; MODULES], gesture: &[TouchMask; MODULES]) -> bool {
    masks.iter().zip(gesture).any(|(mask, g)| mask.intersects(*g))
}

/// Hook for filtering touch masks before they are averaged.
///
/// Reserved for rejecting far proximity touches that would otherwise drag the
/// cursor. The reset gesture is always detected on the unfiltered masks.
pub trait TouchBuffer {
    fn buffer(&mut self, masks: &mut [TouchMask; MODULES]);
}

/// Leaves touch masks unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl TouchBuffer for PassThrough {
    fn buffer(&mut self, _masks: &mut [TouchMask; MODULES]) {}
}

#[derive(Debug, Clone, Copy)]
pub struct TouchpadConfig {
    pub layout: &'static [SensorLayout; MODULES],
    /// Channels that must all be held to re-initialize the sensors
    pub reset_gesture: [TouchMask; MODULES],
    /// Sleep between polls while waiting for the reset gesture to be released
    pub release_poll_ms: u32,
    /// Pause between gesture release and sensor re-initialization
    pub reset_settle_ms: u32,
    /// Give up waiting for the release after this long; `None` waits forever
    pub release_timeout_ms: Option<u32>,
}

impl Default for TouchpadConfig {
    fn default() -> Self {
        Self {
            layout: &SNOWFLAKE_LAYOUT,
            reset_gesture: SOFT_RESET_GESTURE,
            release_poll_ms: 5,
            reset_settle_ms: 200,
            release_timeout_ms: None,
        }
    }
}

/// Errors reported by the touchpad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TouchpadError<E> {
    /// A sensor module did not come up at its address
    NotFound { module: Module, address: u8 },
    /// Bus failure while reading a sensor
    Sensor(E),
    /// Axis other than `x` or `y`
    InvalidAxis(u8),
    /// Position requested before a successful `initialize`
    Uninitialized,
    /// Reset gesture still held when the release timeout ran out
    ReleaseTimeout,
}

impl<E: Debug> Display for TouchpadError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TouchpadError::NotFound { module, address } => {
                write!(f, "MPR121 {module} not found at 0x{address:02X}")
            }
            TouchpadError::Sensor(err) => write!(f, "sensor error: {err:?}"),
            TouchpadError::InvalidAxis(axis) => write!(f, "invalid axis 0x{axis:02X}"),
            TouchpadError::Uninitialized => write!(f, "touchpad not initialized"),
            TouchpadError::ReleaseTimeout => write!(f, "reset gesture not released in time"),
        }
    }
}

/// Addresses and tables of an initialized touchpad
#[derive(Debug, Clone, Copy)]
pub(crate) struct Ready {
    pub addresses: [u8; MODULES],
    pub tables: CoordinateTables,
}

pub(crate) fn parse_axis<E>(axis: u8) -> Result<Axis, TouchpadError<E>> {
    Axis::try_from(axis).map_err(|_| TouchpadError::InvalidAxis(axis))
}

#[cfg(feature = "async")]
pub mod asynch;
pub mod blocking;
