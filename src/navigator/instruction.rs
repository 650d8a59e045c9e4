//! Navigation instructions
//!
//! Instructions have a compact text form used in scenario files:
//!
//! ```text
//! review.confirm            use case action
//! choice_list.choose(2)     use case action with an index
//! keyboard.write(abc)       use case action with a text
//! press right               button press (left, right, both)
//! touch 200 335 [1500ms]    raw touch, optional hold
//! swipe left 240 300        raw swipe
//! wait 500ms | wait 2s      fixed pause
//! wait screen               wait until the screen changes
//! wait text Approve         wait until the screen shows a text
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::{Button, SwipeDirection};
use crate::common::{Error, Result};
use crate::screen::{ActionArg, Position};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    Press(Button),
    Touch { at: Position, hold: Duration },
    Swipe { at: Position, direction: SwipeDirection },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    Duration(Duration),
    ScreenChange,
    Text(String),
}

/// One navigation step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Instruction {
    UseCase {
        use_case: String,
        action: String,
        arg: ActionArg,
    },
    Gesture(Gesture),
    Wait(WaitCondition),
}

impl Instruction {
    pub fn use_case(use_case: &str, action: &str) -> Self {
        Self::use_case_with(use_case, action, ActionArg::None)
    }

    pub fn use_case_with(use_case: &str, action: &str, arg: ActionArg) -> Self {
        Instruction::UseCase {
            use_case: use_case.to_string(),
            action: action.to_string(),
            arg,
        }
    }

    pub fn press(button: Button) -> Self {
        Instruction::Gesture(Gesture::Press(button))
    }

    pub fn touch(at: Position, hold: Duration) -> Self {
        Instruction::Gesture(Gesture::Touch { at, hold })
    }

    pub fn swipe(at: Position, direction: SwipeDirection) -> Self {
        Instruction::Gesture(Gesture::Swipe { at, direction })
    }

    pub fn wait(condition: WaitCondition) -> Self {
        Instruction::Wait(condition)
    }

    pub fn is_wait(&self) -> bool {
        matches!(self, Instruction::Wait(_))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::UseCase {
                use_case,
                action,
                arg,
            } => match arg {
                ActionArg::None => write!(f, "{}.{}", use_case, action),
                ActionArg::Index(i) => write!(f, "{}.{}({})", use_case, action, i),
                ActionArg::Text(t) => write!(f, "{}.{}({})", use_case, action, t),
            },
            Instruction::Gesture(Gesture::Press(button)) => write!(f, "press {}", button.as_str()),
            Instruction::Gesture(Gesture::Touch { at, hold }) => {
                write!(f, "touch {} {} {}ms", at.x, at.y, hold.as_millis())
            }
            Instruction::Gesture(Gesture::Swipe { at, direction }) => write!(
                f,
                "swipe {} {} {}",
                format!("{:?}", direction).to_lowercase(),
                at.x,
                at.y
            ),
            Instruction::Wait(WaitCondition::Duration(d)) => write!(f, "wait {}ms", d.as_millis()),
            Instruction::Wait(WaitCondition::ScreenChange) => write!(f, "wait screen"),
            Instruction::Wait(WaitCondition::Text(t)) => write!(f, "wait text {}", t),
        }
    }
}

impl From<Instruction> for String {
    fn from(instruction: Instruction) -> Self {
        instruction.to_string()
    }
}

impl TryFrom<String> for Instruction {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

fn invalid(s: &str, reason: &str) -> Error {
    Error::Config(format!("Invalid instruction '{}': {}", s, reason))
}

fn parse_coord(s: &str, value: Option<&str>) -> Result<u16> {
    value
        .ok_or_else(|| invalid(s, "missing coordinate"))?
        .parse()
        .map_err(|_| invalid(s, "coordinates are pixel integers"))
}

fn parse_duration(s: &str, value: &str) -> Result<Duration> {
    let (number, scale) = if let Some(ms) = value.strip_suffix("ms") {
        (ms, 1)
    } else if let Some(secs) = value.strip_suffix('s') {
        (secs, 1000)
    } else {
        return Err(invalid(s, "durations end in 'ms' or 's'"));
    };
    let number: u64 = number
        .parse()
        .map_err(|_| invalid(s, "duration is not an integer"))?;
    Ok(Duration::from_millis(number * scale))
}

impl FromStr for Instruction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (head, rest) = match s.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (s, ""),
        };

        match head {
            "press" => {
                let button = match rest {
                    "left" => Button::Left,
                    "right" => Button::Right,
                    "both" => Button::Both,
                    _ => return Err(invalid(s, "button is left, right or both")),
                };
                Ok(Instruction::press(button))
            }
            "touch" => {
                let mut parts = rest.split_whitespace();
                let x = parse_coord(s, parts.next())?;
                let y = parse_coord(s, parts.next())?;
                let hold = match parts.next() {
                    Some(d) => parse_duration(s, d)?,
                    None => crate::backend::client::TAP,
                };
                Ok(Instruction::touch(Position::new(x, y), hold))
            }
            "swipe" => {
                let mut parts = rest.split_whitespace();
                let direction = match parts.next() {
                    Some("left") => SwipeDirection::Left,
                    Some("right") => SwipeDirection::Right,
                    Some("up") => SwipeDirection::Up,
                    Some("down") => SwipeDirection::Down,
                    _ => return Err(invalid(s, "direction is left, right, up or down")),
                };
                let x = parse_coord(s, parts.next())?;
                let y = parse_coord(s, parts.next())?;
                Ok(Instruction::swipe(Position::new(x, y), direction))
            }
            "wait" => match rest.split_once(char::is_whitespace) {
                Some(("text", text)) => Ok(Instruction::wait(WaitCondition::Text(text.trim().to_string()))),
                _ if rest == "screen" => Ok(Instruction::wait(WaitCondition::ScreenChange)),
                _ => Ok(Instruction::wait(WaitCondition::Duration(parse_duration(s, rest)?))),
            },
            _ => {
                let (name, arg) = match s.split_once('(') {
                    Some((name, arg)) => {
                        let arg = arg
                            .strip_suffix(')')
                            .ok_or_else(|| invalid(s, "unbalanced parenthesis"))?;
                        let arg = match arg.parse::<usize>() {
                            Ok(index) => ActionArg::Index(index),
                            Err(_) => ActionArg::Text(arg.to_string()),
                        };
                        (name, arg)
                    }
                    None => (s, ActionArg::None),
                };
                let (use_case, action) = name
                    .split_once('.')
                    .filter(|(u, a)| !u.is_empty() && !a.is_empty())
                    .ok_or_else(|| invalid(s, "expected <use_case>.<action>"))?;
                Ok(Instruction::use_case_with(use_case, action, arg))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_use_case_actions() {
        assert_eq!(
            "review.confirm".parse::<Instruction>().unwrap(),
            Instruction::use_case("review", "confirm")
        );
        assert_eq!(
            "choice_list.choose(2)".parse::<Instruction>().unwrap(),
            Instruction::use_case_with("choice_list", "choose", ActionArg::Index(2))
        );
        assert_eq!(
            "keyboard.write(abc)".parse::<Instruction>().unwrap(),
            Instruction::use_case_with("keyboard", "write", ActionArg::Text("abc".into()))
        );
        assert!("review".parse::<Instruction>().is_err());
        assert!("review.choose(2".parse::<Instruction>().is_err());
    }

    #[test]
    fn test_parse_gestures() {
        assert_eq!(
            "press both".parse::<Instruction>().unwrap(),
            Instruction::press(Button::Both)
        );
        assert_eq!(
            "touch 200 335 1500ms".parse::<Instruction>().unwrap(),
            Instruction::touch(Position::new(200, 335), Duration::from_millis(1500))
        );
        assert_eq!(
            "swipe left 240 300".parse::<Instruction>().unwrap(),
            Instruction::swipe(Position::new(240, 300), SwipeDirection::Left)
        );
        assert!("press middle".parse::<Instruction>().is_err());
        assert!("touch 12".parse::<Instruction>().is_err());
    }

    #[test]
    fn test_parse_waits() {
        assert_eq!(
            "wait 2s".parse::<Instruction>().unwrap(),
            Instruction::wait(WaitCondition::Duration(Duration::from_secs(2)))
        );
        assert_eq!(
            "wait screen".parse::<Instruction>().unwrap(),
            Instruction::wait(WaitCondition::ScreenChange)
        );
        assert_eq!(
            "wait text Hold to sign".parse::<Instruction>().unwrap(),
            Instruction::wait(WaitCondition::Text("Hold to sign".into()))
        );
        assert!("wait forever".parse::<Instruction>().is_err());
    }

    #[test]
    fn test_display_parses_back() {
        for text in [
            "home.settings",
            "choice_list.choose(3)",
            "press right",
            "touch 36 606 100ms",
            "swipe right 200 335",
            "wait 250ms",
            "wait screen",
            "wait text Approve",
        ] {
            let instruction: Instruction = text.parse().unwrap();
            assert_eq!(instruction.to_string(), text);
        }
    }

    #[test]
    fn test_serde_uses_text_form() {
        let steps: Vec<Instruction> = serde_yaml::from_str("- press right\n- review.confirm\n").unwrap();
        assert_eq!(steps[0], Instruction::press(Button::Right));
        assert_eq!(serde_json::to_string(&steps[1]).unwrap(), "\"review.confirm\"");
    }
}
