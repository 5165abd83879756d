use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    claims::{AuthenticatedIdentity, Claims, TokenKind},
    errors::TokenError,
};

/// Lifetimes applied to newly issued tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTtl {
    pub access: Duration,
    pub refresh: Duration,
}

impl TokenTtl {
    /// Fails when either lifetime does not fit a [`Duration`].
    pub fn new(
        access_hours: i64,
        refresh_days: i64,
    ) -> Result<Self, TokenError> {
        Ok(Self {
            access: Duration::try_hours(access_hours)
                .ok_or(TokenError::TtlOutOfRange)?,
            refresh: Duration::try_days(refresh_days)
                .ok_or(TokenError::TtlOutOfRange)?,
        })
    }

    pub fn for_kind(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access,
            TokenKind::Refresh => self.refresh,
        }
    }
}

impl Default for TokenTtl {
    fn default() -> Self {
        Self {
            access: Duration::hours(24),
            refresh: Duration::days(7),
        }
    }
}

/// Access + refresh tokens handed out at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Issues and verifies HS256 tokens with a single shared secret.
///
/// The service is immutable after construction and cheap to share behind an
/// `Arc`. Verification uses zero leeway: a token whose `exp` is at or before
/// the current second is expired.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: TokenTtl,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(
        secret: impl AsRef<[u8]>,
        ttl: TokenTtl,
    ) -> Result<Self, TokenError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        })
    }

    pub fn ttl(&self) -> TokenTtl {
        self.ttl
    }

    /// Issue a token of `kind` using the configured lifetime for that kind.
    pub fn issue(
        &self,
        subject_id: i64,
        subject_name: &str,
        kind: TokenKind,
    ) -> Result<String, TokenError> {
        self.issue_with_ttl(
            subject_id,
            subject_name,
            kind,
            self.ttl.for_kind(kind),
        )
    }

    pub fn issue_with_ttl(
        &self,
        subject_id: i64,
        subject_name: &str,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(TokenError::TtlOutOfRange)?;
        let claims = Claims {
            user_id: subject_id,
            username: subject_name.to_string(),
            kind: Some(kind),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Encode)
    }

    /// Issue the access/refresh pair returned by login.
    pub fn issue_pair(
        &self,
        subject_id: i64,
        subject_name: &str,
    ) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue(
                subject_id,
                subject_name,
                TokenKind::Access,
            )?,
            refresh_token: self.issue(
                subject_id,
                subject_name,
                TokenKind::Refresh,
            )?,
            token_type: "Bearer".to_string(),
            expires_in: self.ttl.access.num_seconds(),
        })
    }

    /// Check signature, expiry and kind, returning the embedded identity.
    pub fn verify(
        &self,
        token: &str,
        expected: TokenKind,
    ) -> Result<AuthenticatedIdentity, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => {
                    debug!(error = %err, "token rejected");
                    TokenError::InvalidSignature
                }
            })?
            .claims;

        // The library only rejects `exp < now`; a zero-lifetime token must
        // not verify within its issuing second either.
        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        if claims.kind != Some(expected) {
            return Err(TokenError::KindMismatch {
                expected,
                found: claims.kind,
            });
        }

        Ok(claims.identity())
    }

    /// Mint a fresh access token from a valid refresh token.
    ///
    /// The refresh token itself is neither rotated nor invalidated.
    pub fn refresh(&self, refresh_token: &str) -> Result<String, TokenError> {
        let identity = self.verify(refresh_token, TokenKind::Refresh)?;
        self.issue(
            identity.subject_id,
            &identity.subject_name,
            TokenKind::Access,
        )
    }
}
