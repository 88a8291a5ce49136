use std::fmt;

/// Lifecycle tag attached to every stored result.
///
/// `Unprocessed -> InProgress -> {Completed | Failed}`, with `Failed` allowed
/// back into `InProgress` for retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ProcessedState {
    Unprocessed = 0,
    InProgress = 1,
    Completed = 2,
    Failed = 3,
}

impl ProcessedState {
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Whether a row in this state may be claimed for scanning.
    #[must_use]
    pub const fn is_scannable(self) -> bool {
        matches!(self, Self::Unprocessed | Self::Failed)
    }
}

impl TryFrom<i32> for ProcessedState {
    type Error = InvalidStatus;

    fn try_from(value: i32) -> Result<Self, InvalidStatus> {
        match value {
            0 => Ok(Self::Unprocessed),
            1 => Ok(Self::InProgress),
            2 => Ok(Self::Completed),
            3 => Ok(Self::Failed),
            other => Err(InvalidStatus(other)),
        }
    }
}

impl fmt::Display for ProcessedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unprocessed => "unprocessed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "error",
        };
        write!(f, "{}", name)
    }
}

/// Origin tag for a stored result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Category {
    /// Auto-discovered by a search cycle.
    Discovered = 0,
    /// Added by hand through the manual-add endpoint.
    Manual = 2,
}

impl Category {
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for Category {
    type Error = InvalidStatus;

    fn try_from(value: i32) -> Result<Self, InvalidStatus> {
        match value {
            0 => Ok(Self::Discovered),
            2 => Ok(Self::Manual),
            other => Err(InvalidStatus(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidStatus(pub i32);

impl fmt::Display for InvalidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid status value: {}", self.0)
    }
}

impl std::error::Error for InvalidStatus {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processed_state_round_trip() {
        for value in 0..4 {
            let state = ProcessedState::try_from(value).unwrap();
            assert_eq!(state.as_i32(), value);
        }
        assert!(ProcessedState::try_from(4).is_err());
        assert!(ProcessedState::try_from(-1).is_err());
    }

    #[test]
    fn test_scannable_states() {
        assert!(ProcessedState::Unprocessed.is_scannable());
        assert!(ProcessedState::Failed.is_scannable());
        assert!(!ProcessedState::InProgress.is_scannable());
        assert!(!ProcessedState::Completed.is_scannable());
    }

    #[test]
    fn test_category_rejects_unknown_tags() {
        assert_eq!(Category::try_from(0).unwrap(), Category::Discovered);
        assert_eq!(Category::try_from(2).unwrap(), Category::Manual);
        assert!(Category::try_from(1).is_err());
        assert!(Category::try_from(3).is_err());
    }
}
