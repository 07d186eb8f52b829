#![forbid(unsafe_code)]

//! Error types.
//!
//! None of these cross the navigation queue: a transition that cannot run
//! resolves as a [`TransitionOutcome`](crate::transition::TransitionOutcome)
//! instead. These errors are for direct calls on groups, loaders, the gesture
//! guard, and configuration loading.

use thiserror::Error;

use crate::card::CardId;

/// Precondition failures on [`CardGroup`](crate::group::CardGroup) mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupError {
    #[error("cannot undo: already at the first card")]
    AtFirstCard,
    #[error("cannot undo: swipe history is empty")]
    EmptyHistory,
    #[error("{0} is not the current card of this group")]
    NotCurrent(CardId),
    #[error("{0} is not the card before the current one")]
    NotPrevious(CardId),
}

/// Rejected loader requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoaderError {
    #[error("a page load is already in flight")]
    AlreadyLoading,
    #[error("all pages have been loaded")]
    Exhausted,
}

/// Reasons a pan cannot start a drag-to-pop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("pan is not horizontal")]
    NotHorizontal,
    #[error("a transition is already queued or running")]
    Busy,
    #[error("the displayed card is a loading placeholder")]
    LoadingCardDisplayed,
    #[error("no card is displayed")]
    NothingDisplayed,
    #[error("the displayed card could not be captured")]
    NoSnapshot,
    #[error("no pan is in progress")]
    NoActivePan,
    #[error("{0} is not in history")]
    NotInHistory(CardId),
}

/// Failures loading or validating a [`StackConfig`](crate::config::StackConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "config-file")]
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[cfg(feature = "config-file")]
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_readable() {
        assert_eq!(
            GroupError::AtFirstCard.to_string(),
            "cannot undo: already at the first card"
        );
        assert_eq!(
            LoaderError::AlreadyLoading.to_string(),
            "a page load is already in flight"
        );
        let err = ConfigError::Validation(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "validation errors: a; b");
    }
}
