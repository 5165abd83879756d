use std::fmt;

use serde::{Deserialize, Serialize};

/// Which of the two token roles a JWT was minted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT payload. Field names are the wire names shared with already-issued
/// tokens: `user_id`, `username`, `type`, `iat`, `exp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub username: String,
    /// `None` when the token carries no `type` claim; such tokens never
    /// verify.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TokenKind>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn identity(&self) -> AuthenticatedIdentity {
        AuthenticatedIdentity {
            subject_id: self.user_id,
            subject_name: self.username.clone(),
        }
    }
}

/// Identity recovered from a verified access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedIdentity {
    pub subject_id: i64,
    pub subject_name: String,
}
