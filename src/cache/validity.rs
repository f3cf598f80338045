use thiserror::Error;

use crate::git::WorkingCopy;

/// Outcome of checking an existing cache entry against the locator it is
/// supposed to serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid(InvalidReason),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    #[error("entry is not a directory")]
    Missing,
    #[error("cannot open working copy: {0}")]
    Unreadable(String),
    #[error("repository is bare")]
    Bare,
    #[error("repository has no checked out commits")]
    Empty,
    #[error("repository has no origin remote")]
    MissingOrigin,
    #[error("origin {found} does not match {expected}")]
    OriginMismatch { found: String, expected: String },
}

impl Validity {
    /// The origin has to equal the locator byte for byte.
    pub fn of(copy: &WorkingCopy, locator: &str) -> Validity {
        let reason = if copy.bare {
            InvalidReason::Bare
        } else if copy.empty {
            InvalidReason::Empty
        } else {
            match &copy.origin {
                None => InvalidReason::MissingOrigin,
                Some(origin) if origin == locator => return Validity::Valid,
                Some(origin) => InvalidReason::OriginMismatch {
                    found: origin.clone(),
                    expected: locator.to_owned(),
                },
            }
        };
        Validity::Invalid(reason)
    }
}
