//! Authentication hook for the handshake.
//!
//! Conquest does not mint or store credentials. Whoever issues tokens
//! implements [`Authenticator`]; the server calls it once per connection
//! with the token from `hello` and trusts the returned profile for the
//! lifetime of that connection.

use conquest_protocol::PlayerId;

use crate::SessionError;

/// Who a token belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: PlayerId,
    /// Display name shown to other players in the room.
    pub name: String,
}

/// Validates a client's token and returns its identity.
///
/// `Send + Sync + 'static` because one authenticator is shared by every
/// connection task for as long as the server runs.
///
/// # Example
///
/// ```rust
/// use conquest_protocol::PlayerId;
/// use conquest_session::{Authenticator, SessionError, UserProfile};
///
/// /// Lets everyone in as player 1.
/// struct Everyone;
///
/// impl Authenticator for Everyone {
///     async fn authenticate(&self, _token: &str) -> Result<UserProfile, SessionError> {
///         Ok(UserProfile { id: PlayerId(1), name: "guest".into() })
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Returns the profile behind `token`.
    ///
    /// # Errors
    /// `SessionError::AuthFailed` when the token is malformed or unknown.
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<UserProfile, SessionError>> + Send;
}

/// Development authenticator: tokens are `"<id>:<name>"`, e.g. `"7:alice"`.
///
/// Performs no verification at all. Meant for local play and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevTokenAuthenticator;

impl DevTokenAuthenticator {
    const MAX_NAME_LEN: usize = 32;

    fn parse(token: &str) -> Result<UserProfile, SessionError> {
        let (id, name) = token
            .split_once(':')
            .ok_or_else(|| SessionError::AuthFailed("expected <id>:<name>".into()))?;
        let id: u64 = id
            .trim()
            .parse()
            .map_err(|_| SessionError::AuthFailed(format!("bad player id {id:?}")))?;
        let name = name.trim();
        if name.is_empty() || name.chars().count() > Self::MAX_NAME_LEN {
            return Err(SessionError::AuthFailed("bad display name".into()));
        }
        Ok(UserProfile {
            id: PlayerId(id),
            name: name.to_owned(),
        })
    }
}

impl Authenticator for DevTokenAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<UserProfile, SessionError> {
        Self::parse(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dev_token_accepts_id_and_name() {
        let profile = DevTokenAuthenticator.authenticate("7:alice").await.unwrap();
        assert_eq!(profile.id, PlayerId(7));
        assert_eq!(profile.name, "alice");
    }

    #[tokio::test]
    async fn test_dev_token_trims_and_keeps_colons_in_name() {
        let profile = DevTokenAuthenticator
            .authenticate(" 12 : Dr: Who ")
            .await
            .unwrap();
        assert_eq!(profile.id, PlayerId(12));
        assert_eq!(profile.name, "Dr: Who");
    }

    #[tokio::test]
    async fn test_dev_token_rejects_malformed() {
        for token in ["", "alice", "x:alice", "3:", "3:   ", "-1:bob"] {
            let result = DevTokenAuthenticator.authenticate(token).await;
            assert!(
                matches!(result, Err(SessionError::AuthFailed(_))),
                "{token:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_dev_token_rejects_overlong_name() {
        let token = format!("1:{}", "n".repeat(33));
        assert!(DevTokenAuthenticator.authenticate(&token).await.is_err());
    }
}
