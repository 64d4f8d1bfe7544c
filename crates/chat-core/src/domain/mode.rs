//! Router mode selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which protocol the server speaks.
///
/// - `Named`: JSON commands, usernames, private messages, user lists.
/// - `Broadcast`: plain-text lines relayed to every connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    #[default]
    Named,
    Broadcast,
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatMode::Named => f.write_str("named"),
            ChatMode::Broadcast => f.write_str("broadcast"),
        }
    }
}

impl FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "named" => Ok(ChatMode::Named),
            "broadcast" => Ok(ChatMode::Broadcast),
            other => Err(format!(
                "unknown chat mode '{other}' (expected 'named' or 'broadcast')"
            )),
        }
    }
}
