//! Screen coordinates of touch devices
//!
//! Stax is 400x670, Flex is 480x600. Button devices have no coordinates:
//! every lookup returns `None` for them.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::device::Device;

/// A point on a touch screen, in pixels from the upper-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Fixed anchors shared by most NBGL screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    Center,
    UpperCenterMiddle,
    UpperLeft,
    UpperRight,
    LowerLeft,
    LowerMiddle,
    LowerMiddleRight,
    LowerRight,
    AboveLowerMiddle,
}

impl Anchor {
    /// Coordinates of the anchor on a touch device
    pub fn on(self, device: &Device) -> Option<Position> {
        let (stax, flex) = match self {
            Anchor::Center => ((200, 335), (240, 300)),
            Anchor::UpperCenterMiddle => ((200, 280), (240, 250)),
            Anchor::UpperLeft => ((36, 36), (45, 45)),
            Anchor::UpperRight => ((342, 55), (405, 75)),
            Anchor::LowerLeft => ((36, 606), (55, 530)),
            Anchor::LowerMiddle => ((200, 606), (240, 550)),
            Anchor::LowerMiddleRight => ((266, 615), (320, 550)),
            Anchor::LowerRight => ((342, 606), (430, 550)),
            Anchor::AboveLowerMiddle => ((200, 515), (240, 435)),
        };
        pick(device, stax, flex)
    }
}

/// Number of entries a choice list shows at once
pub const CHOICE_LIST_LEN: usize = 5;

/// Entry `index` (1-based) of a choice list
pub fn choice(device: &Device, index: usize) -> Option<Position> {
    if !(1..=CHOICE_LIST_LEN).contains(&index) {
        return None;
    }
    let step = (index - 1) as u16;
    pick(device, (200, 140 + 95 * step), (240, 150 + 90 * step))
}

/// Suggestion `index` (1-based)
///
/// Stax shows two rows of two. Flex shows a single swipeable row where only
/// the first two are reachable without swiping.
pub fn suggestion(device: &Device, index: usize) -> Option<Position> {
    match (device.name, index) {
        ("stax", 1) => Some(Position::new(100, 280)),
        ("stax", 2) => Some(Position::new(290, 280)),
        ("stax", 3) => Some(Position::new(110, 350)),
        ("stax", 4) => Some(Position::new(290, 350)),
        ("flex", 1) => Some(Position::new(140, 300)),
        ("flex", 2) => Some(Position::new(350, 300)),
        _ => None,
    }
}

const KEY_ROWS: [&str; 3] = ["qwertyuiop", "asdfghjkl", "zxcvbnm"];

/// Key of the lowercase letter-only keyboard
pub fn letter_key(device: &Device, key: char) -> Option<Position> {
    // (first key x of each row, key pitch, row y values)
    let (starts, pitch, rows) = match device.name {
        "stax" => ([20u16, 40, 20], 40u16, [470u16, 525, 580]),
        "flex" => ([24, 48, 24], 48, [415, 490, 565]),
        _ => return None,
    };
    let key = key.to_ascii_lowercase();
    KEY_ROWS.iter().enumerate().find_map(|(row, letters)| {
        letters
            .find(key)
            .map(|col| Position::new(starts[row] + pitch * col as u16, rows[row]))
    })
}

/// Backspace key of the letter-only keyboard
pub fn backspace_key(device: &Device) -> Option<Position> {
    pick(device, (340, 580), (400, 565))
}

fn pick(device: &Device, stax: (u16, u16), flex: (u16, u16)) -> Option<Position> {
    match device.name {
        "stax" => Some(Position::new(stax.0, stax.1)),
        "flex" => Some(Position::new(flex.0, flex.1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchors_per_device() {
        assert_eq!(Anchor::Center.on(&Device::STAX), Some(Position::new(200, 335)));
        assert_eq!(Anchor::Center.on(&Device::FLEX), Some(Position::new(240, 300)));
        assert_eq!(Anchor::LowerRight.on(&Device::FLEX), Some(Position::new(430, 550)));
        assert_eq!(Anchor::Center.on(&Device::NANOX), None);
    }

    #[test]
    fn test_choice_list() {
        assert_eq!(choice(&Device::STAX, 1), Some(Position::new(200, 140)));
        assert_eq!(choice(&Device::STAX, 5), Some(Position::new(200, 520)));
        assert_eq!(choice(&Device::FLEX, 3), Some(Position::new(240, 330)));
        assert_eq!(choice(&Device::FLEX, 0), None);
        assert_eq!(choice(&Device::FLEX, 6), None);
    }

    #[test]
    fn test_suggestions() {
        assert_eq!(suggestion(&Device::STAX, 4), Some(Position::new(290, 350)));
        assert_eq!(suggestion(&Device::FLEX, 3), None);
    }

    #[test]
    fn test_letter_keys() {
        assert_eq!(letter_key(&Device::STAX, 'q'), Some(Position::new(20, 470)));
        assert_eq!(letter_key(&Device::STAX, 'l'), Some(Position::new(360, 525)));
        assert_eq!(letter_key(&Device::STAX, 'm'), Some(Position::new(260, 580)));
        assert_eq!(letter_key(&Device::FLEX, 'P'), Some(Position::new(456, 415)));
        assert_eq!(letter_key(&Device::FLEX, 'g'), Some(Position::new(240, 490)));
        assert_eq!(letter_key(&Device::FLEX, '1'), None);
        assert_eq!(backspace_key(&Device::FLEX), Some(Position::new(400, 565)));
    }

    #[test]
    fn test_positions_are_on_screen() {
        for device in [Device::STAX, Device::FLEX] {
            for c in 'a'..='z' {
                let p = letter_key(&device, c).unwrap();
                assert!(device.contains(p.x, p.y), "{c} off screen on {device}");
            }
            for i in 1..=CHOICE_LIST_LEN {
                let p = choice(&device, i).unwrap();
                assert!(device.contains(p.x, p.y));
            }
        }
    }
}
