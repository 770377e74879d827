//! Identity validation.
//!
//! Clients pick their own `playerId`; the server only checks that what they
//! claim is well-formed. Deployments that do real authentication can plug in
//! their own [`IdentityValidator`].

use bingo_protocol::PlayerId;

use crate::SessionError;

/// Longest accepted player id, in characters.
pub const MAX_PLAYER_ID_LEN: usize = 64;

/// Longest kept display name, in characters. Longer names are cut.
pub const MAX_NAME_LEN: usize = 32;

/// Name used when a client sends none (or only whitespace).
pub const DEFAULT_NAME: &str = "Player";

/// A validated player identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub player_id: PlayerId,
    pub name: String,
}

/// Decides whether a claimed identity may enter a game.
///
/// Called once per `create-game` / `join-game`. Implementations may do I/O
/// (look up a profile service, check a signature), hence the future.
pub trait IdentityValidator: Send + Sync + 'static {
    fn validate(
        &self,
        player_id: PlayerId,
        name: Option<String>,
    ) -> impl std::future::Future<Output = Result<Identity, SessionError>> + Send;
}

/// Accepts any well-formed identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenIdentity;

impl IdentityValidator for OpenIdentity {
    async fn validate(
        &self,
        player_id: PlayerId,
        name: Option<String>,
    ) -> Result<Identity, SessionError> {
        let id = player_id.as_str().trim();
        if id.is_empty() {
            return Err(SessionError::InvalidIdentity("player id is empty".into()));
        }
        if id.chars().count() > MAX_PLAYER_ID_LEN {
            return Err(SessionError::InvalidIdentity(format!(
                "player id longer than {MAX_PLAYER_ID_LEN} characters"
            )));
        }

        Ok(Identity {
            player_id: PlayerId::new(id),
            name: normalize_name(name.as_deref()),
        })
    }
}

/// Trims, truncates and defaults a display name.
pub fn normalize_name(name: Option<&str>) -> String {
    let trimmed = name.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return DEFAULT_NAME.to_string();
    }
    trimmed.chars().take(MAX_NAME_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_validate_accepts_plain_identity() {
        let identity = OpenIdentity
            .validate(PlayerId::new("player_ab12"), Some("  Ana ".into()))
            .await
            .unwrap();
        assert_eq!(identity.player_id, PlayerId::new("player_ab12"));
        assert_eq!(identity.name, "Ana");
    }

    #[tokio::test]
    async fn test_validate_trims_player_id() {
        let identity = OpenIdentity
            .validate(PlayerId::new(" 42 "), None)
            .await
            .unwrap();
        assert_eq!(identity.player_id.as_str(), "42");
    }

    #[tokio::test]
    async fn test_validate_empty_id_returns_error() {
        let result = OpenIdentity.validate(PlayerId::new("   "), None).await;
        assert!(matches!(result, Err(SessionError::InvalidIdentity(_))));
    }

    #[tokio::test]
    async fn test_validate_overlong_id_returns_error() {
        let long = "x".repeat(MAX_PLAYER_ID_LEN + 1);
        let result = OpenIdentity.validate(PlayerId::new(long), None).await;
        assert!(matches!(result, Err(SessionError::InvalidIdentity(_))));
    }

    #[test]
    fn test_normalize_name_defaults_when_missing_or_blank() {
        assert_eq!(normalize_name(None), DEFAULT_NAME);
        assert_eq!(normalize_name(Some("   ")), DEFAULT_NAME);
    }

    #[test]
    fn test_normalize_name_truncates_by_chars() {
        let name = "é".repeat(40);
        assert_eq!(normalize_name(Some(&name)).chars().count(), MAX_NAME_LEN);
    }
}
