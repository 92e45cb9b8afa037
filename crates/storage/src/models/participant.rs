use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix that marks a participant key as an unresolved display-name guess
/// in every persisted form (database rows, JSON files).
pub const UNRESOLVED_PREFIX: &str = "unresolved_";

/// Who a score belongs to.
///
/// A participant is either identified by a stable platform id (digits) or
/// carried as the display-name guess taken from the report because no
/// directory member matched it. Persisted stores only ever see the
/// serialized key, where unresolved guesses are prefixed with
/// [`UNRESOLVED_PREFIX`].
///
/// # Examples
///
/// ```
/// use storage::models::ParticipantRef;
///
/// let guess = ParticipantRef::unresolved("bela");
/// assert_eq!(guess.storage_key(), "unresolved_bela");
/// assert_eq!(ParticipantRef::from_storage_key("unresolved_bela"), guess);
///
/// let id = ParticipantRef::identified("111");
/// assert_eq!(id.storage_key(), "111");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParticipantRef {
    Identified(String),
    Unresolved(String),
}

impl ParticipantRef {
    pub fn identified(id: impl Into<String>) -> Self {
        Self::Identified(id.into())
    }

    pub fn unresolved(guess: impl Into<String>) -> Self {
        Self::Unresolved(guess.into())
    }

    /// Parses the persisted form. Only all-digit keys are platform ids; a
    /// bare name without the unresolved prefix (as written by older data
    /// files) is read as an unresolved guess.
    pub fn from_storage_key(key: &str) -> Self {
        match key.strip_prefix(UNRESOLVED_PREFIX) {
            Some(guess) => Self::Unresolved(guess.to_string()),
            None if is_platform_id(key) => Self::Identified(key.to_string()),
            None => Self::Unresolved(key.to_string()),
        }
    }

    pub fn storage_key(&self) -> String {
        match self {
            Self::Identified(id) => id.clone(),
            Self::Unresolved(guess) => format!("{}{}", UNRESOLVED_PREFIX, guess),
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved(_))
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Identified(id) => Some(id),
            Self::Unresolved(_) => None,
        }
    }

    pub fn guess(&self) -> Option<&str> {
        match self {
            Self::Identified(_) => None,
            Self::Unresolved(guess) => Some(guess),
        }
    }
}

/// Platform ids are non-empty runs of ASCII digits
pub fn is_platform_id(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

impl From<String> for ParticipantRef {
    fn from(key: String) -> Self {
        Self::from_storage_key(&key)
    }
}

impl From<ParticipantRef> for String {
    fn from(participant: ParticipantRef) -> Self {
        participant.storage_key()
    }
}

impl fmt::Display for ParticipantRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identified(id) => write!(f, "{}", id),
            Self::Unresolved(guess) => write!(f, "{}{}", UNRESOLVED_PREFIX, guess),
        }
    }
}
