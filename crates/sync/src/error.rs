use std::fmt;

/// Failure of a single write call against the external API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// Network or server error; eligible for retry.
    Transient(String),
    /// Version-token precondition mismatch: the resource changed since the
    /// token was issued. Never retried with the same desired state.
    Conflict(String),
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient(msg) => write!(f, "write failed: {msg}"),
            Self::Conflict(msg) => write!(f, "write conflict: {msg}"),
        }
    }
}

impl std::error::Error for WriteError {}

/// Synchronous rejection of an `apply` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// A mutation is already in flight for this entity key. Not an error
    /// path for the user; the caller ignores or re-queues the intent.
    Busy { entity_key: String },
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy { entity_key } => {
                write!(f, "mutation already in flight for '{entity_key}'")
            }
        }
    }
}

impl std::error::Error for ApplyError {}
