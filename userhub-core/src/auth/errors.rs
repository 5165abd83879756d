use thiserror::Error;

use super::claims::TokenKind;

/// Reasons a token could not be issued or verified.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing secret must not be empty")]
    EmptySecret,

    /// Bad signature, malformed encoding, or unparseable claims.
    #[error("token signature is invalid or the token is malformed")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("expected a {expected} token, got {}", kind_label(.found))]
    KindMismatch {
        expected: TokenKind,
        found: Option<TokenKind>,
    },

    #[error("token lifetime is out of range")]
    TtlOutOfRange,

    #[error("failed to sign token: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),
}

fn kind_label(kind: &Option<TokenKind>) -> &'static str {
    kind.map(TokenKind::as_str).unwrap_or("untyped")
}

/// Failures of the bearer-credential guard.
///
/// Both variants are reported to clients as the same unauthorized response;
/// the distinction only feeds logs.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer credential")]
    MissingCredential,

    #[error("invalid or expired credential: {0}")]
    InvalidOrExpiredCredential(#[source] TokenError),
}
