//! Raise policy: which status words turn a response into an error

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::Error;

use super::status::SUCCESS;

/// Outcome of evaluating a status word against a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject,
}

/// Status-word filter applied to every response of a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "policy", content = "accepted")]
pub enum RaisePolicy {
    /// Never raise
    RaiseNothing,
    /// Raise on every status, success included
    RaiseAll,
    /// Raise on everything except 0x9000
    #[default]
    RaiseAllButSuccess,
    /// Raise unless the status is in the whitelist
    RaiseCustom(BTreeSet<u16>),
}

impl RaisePolicy {
    /// Whitelist policy from any list of accepted status words
    pub fn custom(accepted: impl IntoIterator<Item = u16>) -> Self {
        Self::RaiseCustom(accepted.into_iter().collect())
    }

    /// Decide whether a status word is accepted
    pub fn evaluate(&self, status: u16) -> Verdict {
        let accepted = match self {
            RaisePolicy::RaiseNothing => true,
            RaisePolicy::RaiseAll => false,
            RaisePolicy::RaiseAllButSuccess => status == SUCCESS,
            RaisePolicy::RaiseCustom(whitelist) => whitelist.contains(&status),
        };
        if accepted {
            Verdict::Accept
        } else {
            Verdict::Reject
        }
    }

    pub fn rejects(&self, status: u16) -> bool {
        self.evaluate(status) == Verdict::Reject
    }
}

impl fmt::Display for RaisePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaisePolicy::RaiseNothing => write!(f, "nothing"),
            RaisePolicy::RaiseAll => write!(f, "all"),
            RaisePolicy::RaiseAllButSuccess => write!(f, "all-but-success"),
            RaisePolicy::RaiseCustom(whitelist) => {
                let codes: Vec<String> = whitelist.iter().map(|s| format!("{s:04x}")).collect();
                write!(f, "custom:{}", codes.join(","))
            }
        }
    }
}

/// Parses `nothing`, `all`, `all-but-success` or `custom:9000,6985`
impl FromStr for RaisePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nothing" => Ok(RaisePolicy::RaiseNothing),
            "all" => Ok(RaisePolicy::RaiseAll),
            "all-but-success" => Ok(RaisePolicy::RaiseAllButSuccess),
            other => {
                let list = other.strip_prefix("custom:").ok_or_else(|| {
                    Error::Config(format!(
                        "Unknown raise policy '{}'. Use nothing, all, all-but-success or custom:<sw,..>",
                        other
                    ))
                })?;
                let mut codes = BTreeSet::new();
                for code in list.split(',').map(str::trim).filter(|c| !c.is_empty()) {
                    let code = code.trim_start_matches("0x");
                    let sw = u16::from_str_radix(code, 16).map_err(|_| {
                        Error::Config(format!("Invalid status word in raise policy: {}", code))
                    })?;
                    codes.insert(sw);
                }
                Ok(RaisePolicy::RaiseCustom(codes))
            }
        }
    }
}
