//! Dataset split markers

use serde::{Deserialize, Serialize};

/// Dataset split type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Split {
    /// Training split
    Train,
    /// Development (validation) split
    Dev,
    /// Held-out test split
    Test,
}

impl Split {
    /// Parse a split marker as found in the `split` column.
    ///
    /// Markers are compared exactly; anything other than `train`, `dev` or
    /// `test` is `None`.
    #[must_use]
    pub fn parse(marker: &str) -> Option<Self> {
        match marker {
            "train" => Some(Self::Train),
            "dev" => Some(Self::Dev),
            "test" => Some(Self::Test),
            _ => None,
        }
    }
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Train => write!(f, "train"),
            Self::Dev => write!(f, "dev"),
            Self::Test => write!(f, "test"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_markers() {
        assert_eq!(Split::parse("train"), Some(Split::Train));
        assert_eq!(Split::parse("dev"), Some(Split::Dev));
        assert_eq!(Split::parse("test"), Some(Split::Test));
        assert_eq!(Split::parse("other"), None);
    }

    #[test]
    fn test_parse_is_exact() {
        assert_eq!(Split::parse("validation"), None);
        assert_eq!(Split::parse(" test "), None);
        assert_eq!(Split::parse("Train"), None);
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for split in [Split::Train, Split::Dev, Split::Test] {
            assert_eq!(Split::parse(&split.to_string()), Some(split));
        }
    }
}
