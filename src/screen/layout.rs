//! Layouts: addressable screen regions and the gestures behind their actions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::backend::client::{LONG_PRESS, TAP};
use crate::backend::{Backend, SwipeDirection};
use crate::common::{Error, Result};

use super::device::Device;
use super::position::{self, Anchor, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    /// Physical buttons of button devices
    Buttons,
    /// Screen center, tappable and swipeable
    Center,
    TappableCenter,
    UpperLeftButton,
    UpperRightButton,
    LowerLeftButton,
    LowerMiddleButton,
    LowerRightButton,
    AboveLowerMiddleButton,
    /// Vertical list of up to five choices
    ChoiceList,
    /// Word suggestions above a keyboard
    Suggestions,
    LetterOnlyKeyboard,
}

impl LayoutKind {
    pub const ALL: [LayoutKind; 12] = [
        LayoutKind::Buttons,
        LayoutKind::Center,
        LayoutKind::TappableCenter,
        LayoutKind::UpperLeftButton,
        LayoutKind::UpperRightButton,
        LayoutKind::LowerLeftButton,
        LayoutKind::LowerMiddleButton,
        LayoutKind::LowerRightButton,
        LayoutKind::AboveLowerMiddleButton,
        LayoutKind::ChoiceList,
        LayoutKind::Suggestions,
        LayoutKind::LetterOnlyKeyboard,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LayoutKind::Buttons => "buttons",
            LayoutKind::Center => "center",
            LayoutKind::TappableCenter => "tappable_center",
            LayoutKind::UpperLeftButton => "upper_left_button",
            LayoutKind::UpperRightButton => "upper_right_button",
            LayoutKind::LowerLeftButton => "lower_left_button",
            LayoutKind::LowerMiddleButton => "lower_middle_button",
            LayoutKind::LowerRightButton => "lower_right_button",
            LayoutKind::AboveLowerMiddleButton => "above_lower_middle_button",
            LayoutKind::ChoiceList => "choice_list",
            LayoutKind::Suggestions => "suggestions",
            LayoutKind::LetterOnlyKeyboard => "letter_only_keyboard",
        }
    }

    /// Action names the layout understands
    pub fn actions(&self) -> &'static [&'static str] {
        match self {
            LayoutKind::Buttons => &["right", "left", "both"],
            LayoutKind::Center => &["tap", "swipe_left", "swipe_right"],
            LayoutKind::TappableCenter => &["tap"],
            LayoutKind::UpperLeftButton
            | LayoutKind::UpperRightButton
            | LayoutKind::LowerLeftButton
            | LayoutKind::LowerMiddleButton
            | LayoutKind::LowerRightButton
            | LayoutKind::AboveLowerMiddleButton => &["tap", "hold"],
            LayoutKind::ChoiceList | LayoutKind::Suggestions => &["choose"],
            LayoutKind::LetterOnlyKeyboard => &["write", "back"],
        }
    }

    /// Whether the layout exists on the device's screen family
    pub fn applies_to(&self, device: &Device) -> bool {
        match self {
            LayoutKind::Buttons => !device.is_touchscreen,
            _ => device.is_touchscreen,
        }
    }

    fn anchor(&self) -> Option<Anchor> {
        match self {
            LayoutKind::Center | LayoutKind::TappableCenter => Some(Anchor::Center),
            LayoutKind::UpperLeftButton => Some(Anchor::UpperLeft),
            LayoutKind::UpperRightButton => Some(Anchor::UpperRight),
            LayoutKind::LowerLeftButton => Some(Anchor::LowerLeft),
            LayoutKind::LowerMiddleButton => Some(Anchor::LowerMiddle),
            LayoutKind::LowerRightButton => Some(Anchor::LowerRight),
            LayoutKind::AboveLowerMiddleButton => Some(Anchor::AboveLowerMiddle),
            _ => None,
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayoutKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        LayoutKind::ALL
            .iter()
            .find(|k| k.name() == s)
            .copied()
            .ok_or_else(|| Error::Config(format!("Unknown layout '{}'", s)))
    }
}

/// Argument carried by parameterized actions (`choose`, `write`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionArg {
    #[default]
    None,
    Index(usize),
    Text(String),
}

impl fmt::Display for ActionArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionArg::None => Ok(()),
            ActionArg::Index(i) => write!(f, "({})", i),
            ActionArg::Text(t) => write!(f, "({:?})", t),
        }
    }
}

/// A layout bound to a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    kind: LayoutKind,
    device: Device,
}

impl Layout {
    /// Bind a layout, rejecting devices whose screen family lacks it
    pub fn new(kind: LayoutKind, device: Device) -> Result<Self> {
        if !kind.applies_to(&device) {
            return Err(Error::unsupported_layout(kind.name(), "*", device.name));
        }
        Ok(Self { kind, device })
    }

    pub fn kind(&self) -> LayoutKind {
        self.kind
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn supports(&self, action: &str) -> bool {
        self.kind.actions().contains(&action)
    }

    /// Fixed touch point of anchored layouts
    pub fn position(&self) -> Option<Position> {
        self.kind.anchor().and_then(|a| a.on(&self.device))
    }

    fn unsupported(&self, action: &str) -> Error {
        Error::unsupported_layout(self.kind.name(), action, self.device.name)
    }

    fn fixed_position(&self, action: &str) -> Result<Position> {
        self.position().ok_or_else(|| self.unsupported(action))
    }

    /// Perform `action` through the backend
    pub async fn invoke(&self, backend: &mut Backend, action: &str, arg: &ActionArg) -> Result<()> {
        if !self.supports(action) {
            return Err(self.unsupported(action));
        }
        tracing::debug!("{}.{}{}", self.kind, action, arg);

        match (self.kind, action) {
            (LayoutKind::Buttons, "right") => backend.right_click().await,
            (LayoutKind::Buttons, "left") => backend.left_click().await,
            (LayoutKind::Buttons, "both") => backend.both_click().await,
            (_, "tap") => {
                let at = self.fixed_position(action)?;
                backend.finger_touch(at, TAP).await
            }
            (_, "hold") => {
                let at = self.fixed_position(action)?;
                backend.finger_touch(at, LONG_PRESS).await
            }
            (_, "swipe_left") => {
                let at = self.fixed_position(action)?;
                backend.finger_swipe(at, SwipeDirection::Left).await
            }
            (_, "swipe_right") => {
                let at = self.fixed_position(action)?;
                backend.finger_swipe(at, SwipeDirection::Right).await
            }
            (LayoutKind::ChoiceList, "choose") | (LayoutKind::Suggestions, "choose") => {
                let ActionArg::Index(index) = arg else {
                    return Err(Error::Config(format!(
                        "{}.choose needs an index, got '{}'",
                        self.kind, arg
                    )));
                };
                let at = if self.kind == LayoutKind::ChoiceList {
                    position::choice(&self.device, *index)
                } else {
                    position::suggestion(&self.device, *index)
                }
                .ok_or_else(|| self.unsupported(&format!("choose({})", index)))?;
                backend.finger_touch(at, TAP).await
            }
            (LayoutKind::LetterOnlyKeyboard, "write") => {
                let ActionArg::Text(text) = arg else {
                    return Err(Error::Config(format!(
                        "{}.write needs a text, got '{}'",
                        self.kind, arg
                    )));
                };
                // resolve every key first so a bad character sends nothing
                let keys = text
                    .chars()
                    .map(|c| {
                        position::letter_key(&self.device, c)
                            .ok_or_else(|| self.unsupported(&format!("write({:?})", c)))
                    })
                    .collect::<Result<Vec<_>>>()?;
                for at in keys {
                    backend.finger_touch(at, TAP).await?;
                }
                Ok(())
            }
            (LayoutKind::LetterOnlyKeyboard, "back") => {
                let at = position::backspace_key(&self.device)
                    .ok_or_else(|| self.unsupported(action))?;
                backend.finger_touch(at, TAP).await
            }
            _ => Err(self.unsupported(action)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockDevice;

    async fn open(device: Device) -> (Backend, crate::backend::mock::MockJournal) {
        let mock = MockDevice::new();
        let journal = mock.journal();
        let mut backend = Backend::new(Box::new(mock), device);
        backend.open().await.unwrap();
        (backend, journal)
    }

    #[test]
    fn test_touch_layouts_reject_button_devices() {
        assert!(matches!(
            Layout::new(LayoutKind::Center, Device::NANOS),
            Err(Error::UnsupportedLayout { .. })
        ));
        assert!(matches!(
            Layout::new(LayoutKind::Buttons, Device::STAX),
            Err(Error::UnsupportedLayout { .. })
        ));
        assert!(Layout::new(LayoutKind::Buttons, Device::NANOSP).is_ok());
    }

    #[test]
    fn test_layout_names_round_trip() {
        for kind in LayoutKind::ALL {
            assert_eq!(kind.name().parse::<LayoutKind>().unwrap(), kind);
        }
    }

    #[tokio::test]
    async fn test_tap_and_hold() {
        let (mut backend, journal) = open(Device::STAX).await;
        let layout = Layout::new(LayoutKind::AboveLowerMiddleButton, Device::STAX).unwrap();
        layout.invoke(&mut backend, "tap", &ActionArg::None).await.unwrap();
        layout.invoke(&mut backend, "hold", &ActionArg::None).await.unwrap();
        assert_eq!(
            journal.gestures(),
            vec!["touch (200, 515) 100ms", "touch (200, 515) 1500ms"]
        );
    }

    #[tokio::test]
    async fn test_unknown_action_is_unsupported() {
        let (mut backend, journal) = open(Device::FLEX).await;
        let layout = Layout::new(LayoutKind::TappableCenter, Device::FLEX).unwrap();
        let err = layout
            .invoke(&mut backend, "swipe_left", &ActionArg::None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedLayout { .. }));
        assert!(journal.gestures().is_empty());
    }

    #[tokio::test]
    async fn test_choose_out_of_range() {
        let (mut backend, _) = open(Device::FLEX).await;
        let list = Layout::new(LayoutKind::ChoiceList, Device::FLEX).unwrap();
        list.invoke(&mut backend, "choose", &ActionArg::Index(2))
            .await
            .unwrap();
        assert!(matches!(
            list.invoke(&mut backend, "choose", &ActionArg::Index(9)).await,
            Err(Error::UnsupportedLayout { .. })
        ));
    }

    #[tokio::test]
    async fn test_keyboard_write_is_all_or_nothing() {
        let (mut backend, journal) = open(Device::STAX).await;
        let keyboard = Layout::new(LayoutKind::LetterOnlyKeyboard, Device::STAX).unwrap();
        keyboard
            .invoke(&mut backend, "write", &ActionArg::Text("qa".into()))
            .await
            .unwrap();
        assert_eq!(
            journal.gestures(),
            vec!["touch (20, 470) 100ms", "touch (40, 525) 100ms"]
        );

        assert!(keyboard
            .invoke(&mut backend, "write", &ActionArg::Text("a1".into()))
            .await
            .is_err());
        assert_eq!(journal.gestures().len(), 2);
    }

    #[tokio::test]
    async fn test_buttons() {
        let (mut backend, journal) = open(Device::NANOX).await;
        let buttons = Layout::new(LayoutKind::Buttons, Device::NANOX).unwrap();
        buttons.invoke(&mut backend, "both", &ActionArg::None).await.unwrap();
        assert_eq!(journal.gestures(), vec!["press both"]);
    }
}
