use thiserror::Error;

/// Why an invite code cannot be redeemed by the requesting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum InviteError {
    #[error("invalid code format")]
    Malformed,
    #[error("code not found")]
    NotFound,
    #[error("you cannot use your own invite code")]
    SelfRedemption,
    #[error("code has already been used")]
    AlreadyUsed,
    #[error("code has expired")]
    Expired,
}

impl InviteError {
    /// Stable machine-readable tag for clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::NotFound => "not_found",
            Self::SelfRedemption => "self_redemption",
            Self::AlreadyUsed => "already_used",
            Self::Expired => "expired",
        }
    }
}

/// Domain error taxonomy shared by every connection and streak operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Invite(#[from] InviteError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("already connected to a family member")]
    AlreadyConnected,
    #[error("unauthorized")]
    Unauthorized,
    #[error("could not allocate a unique invite code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },
    #[error("store is not configured")]
    NotConfigured,
    #[error("store error: {0}")]
    Store(String),
}

impl Error {
    /// Wrap a backend failure, keeping only its message.
    pub fn store<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> Self + '_ {
        move |e| Self::Store(format!("{context}: {e}"))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_errors_have_distinct_codes() {
        let all = [
            InviteError::Malformed,
            InviteError::NotFound,
            InviteError::SelfRedemption,
            InviteError::AlreadyUsed,
            InviteError::Expired,
        ];
        let mut codes: Vec<_> = all.iter().map(InviteError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn expired_and_used_messages_differ() {
        assert_ne!(
            InviteError::Expired.to_string(),
            InviteError::AlreadyUsed.to_string()
        );
    }
}
