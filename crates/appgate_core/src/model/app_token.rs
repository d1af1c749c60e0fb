//! App token domain model.
//!
//! # Invariants
//! - Every token belongs to exactly one app and has no lifetime of its own.
//! - `auth_token` is unique across all tokens and immutable once stored.

use crate::model::app::{AppId, AppValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of an app token.
pub type AppTokenId = Uuid;

/// Maximum token display name length, in characters.
pub const TOKEN_NAME_MAX_CHARS: usize = 128;
/// Maximum secret length, in characters.
pub const TOKEN_SECRET_MAX_CHARS: usize = 30;

const MASK_VISIBLE_CHARS: usize = 4;

/// Bearer credential owned by one app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppToken {
    pub id: AppTokenId,
    pub app_id: AppId,
    /// Optional label; empty when not provided.
    pub name: String,
    pub auth_token: String,
}

impl AppToken {
    /// Validates fields before they reach storage.
    pub fn validate(&self) -> Result<(), AppValidationError> {
        validate_token_name(&self.name)?;
        validate_token_secret(&self.auth_token)
    }

    /// Display form that only reveals the trailing characters of the secret.
    pub fn masked(&self) -> String {
        let total = self.auth_token.chars().count();
        let visible = total.min(MASK_VISIBLE_CHARS);
        let tail: String = self.auth_token.chars().skip(total - visible).collect();
        format!("{}{}", "*".repeat(total - visible), tail)
    }
}

pub(crate) fn validate_token_name(name: &str) -> Result<(), AppValidationError> {
    let actual = name.chars().count();
    if actual > TOKEN_NAME_MAX_CHARS {
        return Err(AppValidationError::TokenNameTooLong {
            max_chars: TOKEN_NAME_MAX_CHARS,
            actual,
        });
    }
    Ok(())
}

pub(crate) fn validate_token_secret(secret: &str) -> Result<(), AppValidationError> {
    if secret.is_empty() {
        return Err(AppValidationError::EmptyTokenSecret);
    }
    let actual = secret.chars().count();
    if actual > TOKEN_SECRET_MAX_CHARS {
        return Err(AppValidationError::TokenSecretTooLong {
            max_chars: TOKEN_SECRET_MAX_CHARS,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{AppToken, TOKEN_NAME_MAX_CHARS, TOKEN_SECRET_MAX_CHARS};
    use crate::model::app::AppValidationError;
    use uuid::Uuid;

    fn token(name: &str, secret: &str) -> AppToken {
        AppToken {
            id: Uuid::new_v4(),
            app_id: Uuid::new_v4(),
            name: name.to_string(),
            auth_token: secret.to_string(),
        }
    }

    #[test]
    fn masked_reveals_last_four_characters() {
        assert_eq!(token("", "abcdefgh").masked(), "****efgh");
        assert_eq!(token("", "xyz").masked(), "xyz");
    }

    #[test]
    fn validate_accepts_empty_name_and_bounded_secret() {
        assert!(token("", &"a".repeat(TOKEN_SECRET_MAX_CHARS)).validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_names_and_secrets() {
        assert_eq!(
            token("", "").validate().unwrap_err(),
            AppValidationError::EmptyTokenSecret
        );
        assert!(matches!(
            token("", &"a".repeat(TOKEN_SECRET_MAX_CHARS + 1)).validate(),
            Err(AppValidationError::TokenSecretTooLong { .. })
        ));
        assert!(matches!(
            token(&"n".repeat(TOKEN_NAME_MAX_CHARS + 1), "secret").validate(),
            Err(AppValidationError::TokenNameTooLong { .. })
        ));
    }
}
