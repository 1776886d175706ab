//! Start position for groups without a stored offset.

use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigErrorCode, Error};
use crate::events::Offset;

/// Where to begin reading a group that has no stored offset yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPosition {
    /// Read everything the remote still retains
    Beginning,
    /// Only read events newer than now
    End,
    /// Read back this many seconds from now; negative values reach into the future
    SecondsAgo(i64),
}

impl StartPosition {
    /// Offset assigned to a previously unseen group at `now_ms`.
    pub fn default_offset(&self, now_ms: i64) -> Offset {
        match self {
            Self::Beginning => 0,
            Self::End => now_ms,
            Self::SecondsAgo(secs) => now_ms.saturating_sub(secs.saturating_mul(1000)),
        }
    }
}

impl FromStr for StartPosition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "beginning" => Ok(Self::Beginning),
            "end" => Ok(Self::End),
            other => other.parse::<i64>().map(Self::SecondsAgo).map_err(|_| {
                Error::config(
                    ConfigErrorCode::InvalidStartPosition,
                    format!(
                        "start_position '{}' is invalid! Must be `beginning`, `end`, or an integer.",
                        s
                    ),
                )
            }),
        }
    }
}

impl fmt::Display for StartPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beginning => write!(f, "beginning"),
            Self::End => write!(f, "end"),
            Self::SecondsAgo(secs) => write!(f, "{}", secs),
        }
    }
}
