//! Electrode placement of the snowflake touchpad.
//!
//! Each MPR121 module drives 12 electrodes. Their positions are given in polar
//! form, 0° pointing down the pad, and converted to output coordinates once
//! when the touchpad is initialized. The outermost left/top/right/bottom
//! arrows do not sit where the angle formula puts them, so they carry an
//! exact pinned coordinate instead.

use crate::touchpad::{Coordinate, CHANNELS, COORD_MAX, COORD_MID, COORD_MIN, MODULES};

/// Position of one electrode on the pad.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelPlacement {
    /// Angle in degrees, 0° is down.
    pub angle_deg: f64,
    /// Distance from the pad centre as a fraction of its radius (0.0 to 1.0).
    pub length: f64,
    /// Exact coordinate used in place of the computed one.
    pub pinned: Option<Coordinate>,
}

impl ChannelPlacement {
    pub const fn new(angle_deg: f64, length: f64) -> Self {
        Self {
            angle_deg,
            length,
            pinned: None,
        }
    }

    pub const fn pinned(self, coordinate: Coordinate) -> Self {
        Self {
            pinned: Some(coordinate),
            ..self
        }
    }
}

/// Placement of all electrodes of one module, indexed by channel.
pub type SensorLayout = [ChannelPlacement; CHANNELS];

pub const PIN_LEFT: Coordinate = Coordinate::new(COORD_MIN, COORD_MID);
pub const PIN_TOP: Coordinate = Coordinate::new(COORD_MID, COORD_MIN);
pub const PIN_RIGHT: Coordinate = Coordinate::new(COORD_MAX, COORD_MID);
pub const PIN_BOTTOM: Coordinate = Coordinate::new(COORD_MID, COORD_MAX);

/// Left half of the pad, wired to the module at 0x5A.
pub const SNOWFLAKE_MODULE_1: SensorLayout = [
    ChannelPlacement::new(-105.0, 1.0), // bottom-left dot
    ChannelPlacement::new(-135.0, 1.0), // outer bottom-left arrow
    ChannelPlacement::new(-135.0, 0.5), // inner bottom-left arrow
    ChannelPlacement::new(-165.0, 1.0), // left-bottom dot
    ChannelPlacement::new(-180.0, 1.0).pinned(PIN_LEFT), // outer left arrow
    ChannelPlacement::new(-180.0, 0.5), // inner left arrow
    ChannelPlacement::new(165.0, 1.0),  // left-top dot
    ChannelPlacement::new(135.0, 1.0),  // outer top-left arrow
    ChannelPlacement::new(135.0, 0.5),  // inner top-left arrow
    ChannelPlacement::new(105.0, 1.0),  // top-left dot
    ChannelPlacement::new(90.0, 0.5),   // inner top arrow
    ChannelPlacement::new(90.0, 1.0).pinned(PIN_TOP), // outer top arrow
];

/// Right half of the pad, wired to the module at 0x5B.
pub const SNOWFLAKE_MODULE_2: SensorLayout = [
    ChannelPlacement::new(75.0, 1.0),  // top-right dot
    ChannelPlacement::new(45.0, 0.5),  // inner top-right arrow
    ChannelPlacement::new(45.0, 1.0),  // outer top-right arrow
    ChannelPlacement::new(15.0, 1.0),  // right-top dot
    ChannelPlacement::new(0.0, 0.5),   // inner right arrow
    ChannelPlacement::new(0.0, 1.0).pinned(PIN_RIGHT), // outer right arrow
    ChannelPlacement::new(-15.0, 1.0), // right-bottom dot
    ChannelPlacement::new(-45.0, 0.5), // inner bottom-right arrow
    ChannelPlacement::new(-45.0, 1.0), // outer bottom-right arrow
    ChannelPlacement::new(-75.0, 1.0), // bottom-right dot
    ChannelPlacement::new(-90.0, 0.5), // inner bottom arrow
    ChannelPlacement::new(-90.0, 1.0).pinned(PIN_BOTTOM), // outer bottom arrow
];

pub const SNOWFLAKE_LAYOUT: [SensorLayout; MODULES] = [SNOWFLAKE_MODULE_1, SNOWFLAKE_MODULE_2];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths_are_unit_fractions() {
        for placement in SNOWFLAKE_LAYOUT.iter().flatten() {
            assert!((0.0..=1.0).contains(&placement.length));
        }
    }

    #[test]
    fn test_only_outer_arrows_are_pinned() {
        let pinned: [(usize, usize, Coordinate); 4] = [
            (0, 4, PIN_LEFT),
            (0, 11, PIN_TOP),
            (1, 5, PIN_RIGHT),
            (1, 11, PIN_BOTTOM),
        ];
        for (module, layout) in SNOWFLAKE_LAYOUT.iter().enumerate() {
            for (channel, placement) in layout.iter().enumerate() {
                let expected = pinned
                    .iter()
                    .find(|(m, c, _)| *m == module && *c == channel)
                    .map(|(_, _, coordinate)| *coordinate);
                assert_eq!(placement.pinned, expected, "module {module} ch {channel}");
            }
        }
    }
}
