//! Reading status model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where the user stands with an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ReadingStatus {
    /// Currently reading
    Reading,
    /// Plan to read
    ToRead,
    /// Paused
    OnHold,
    /// Fully read
    Read,
    /// Abandoned
    Dropped,
    /// Never read, not on the list
    #[default]
    Unread,
}

impl ReadingStatus {
    /// Statuses a user can pick explicitly (everything but `Unread`)
    pub const LISTED: [Self; 5] = [
        Self::Reading,
        Self::ToRead,
        Self::OnHold,
        Self::Read,
        Self::Dropped,
    ];

    /// Wire name, identical to the serde representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reading => "reading",
            Self::ToRead => "toRead",
            Self::OnHold => "onHold",
            Self::Read => "read",
            Self::Dropped => "dropped",
            Self::Unread => "unread",
        }
    }

    /// Human readable description
    #[must_use]
    pub const fn text(self) -> &'static str {
        match self {
            Self::Dropped => "dropped",
            Self::ToRead => "plan to read",
            Self::Read => "fully read",
            Self::Reading => "currently reading",
            Self::Unread => "never read",
            Self::OnHold => "on hold",
        }
    }

    /// Description with the first letter capitalized
    #[must_use]
    pub fn upper_text(self) -> String {
        let text = self.text();
        let mut chars = text.chars();
        chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars).collect()
        })
    }
}

impl fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "reading" => Ok(Self::Reading),
            "toRead" | "to-read" => Ok(Self::ToRead),
            "onHold" | "on-hold" => Ok(Self::OnHold),
            "read" => Ok(Self::Read),
            "dropped" => Ok(Self::Dropped),
            "unread" => Ok(Self::Unread),
            other => Err(format!("unknown reading status '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serde_names() {
        let json = serde_json::to_string(&ReadingStatus::ToRead).unwrap();
        assert_eq!(json, "\"toRead\"");
        let parsed: ReadingStatus = serde_json::from_str("\"onHold\"").unwrap();
        assert_eq!(parsed, ReadingStatus::OnHold);
    }

    #[test]
    fn test_status_text() {
        assert_eq!(ReadingStatus::Reading.text(), "currently reading");
        assert_eq!(ReadingStatus::ToRead.upper_text(), "Plan to read");
        assert_eq!(ReadingStatus::Unread.upper_text(), "Never read");
    }

    #[test]
    fn test_listed_excludes_unread() {
        assert!(!ReadingStatus::LISTED.contains(&ReadingStatus::Unread));
        assert_eq!(ReadingStatus::default(), ReadingStatus::Unread);
    }

    #[test]
    fn test_status_from_str_roundtrips_display() {
        for status in ReadingStatus::LISTED {
            assert_eq!(status.to_string().parse::<ReadingStatus>(), Ok(status));
        }
        assert!("finished".parse::<ReadingStatus>().is_err());
    }
}
