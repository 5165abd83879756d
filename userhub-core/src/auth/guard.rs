//! Bearer-credential guard shared by every protected route.

use super::{
    claims::{AuthenticatedIdentity, TokenKind},
    errors::AuthError,
    token::TokenService,
};

const BEARER_PREFIX: &str = "Bearer ";

/// Pull the raw token out of an `Authorization` header value.
///
/// The `Bearer ` prefix is optional; a bare token is accepted as-is.
pub fn extract_bearer_token(
    authorization: Option<&str>,
) -> Result<&str, AuthError> {
    let raw = authorization
        .map(str::trim_start)
        .ok_or(AuthError::MissingCredential)?;

    let token = raw.strip_prefix(BEARER_PREFIX).unwrap_or(raw).trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredential);
    }

    Ok(token)
}

/// Resolve an `Authorization` header into a verified access-token identity.
pub fn authenticate(
    authorization: Option<&str>,
    tokens: &TokenService,
) -> Result<AuthenticatedIdentity, AuthError> {
    let token = extract_bearer_token(authorization)?;
    tokens
        .verify(token, TokenKind::Access)
        .map_err(AuthError::InvalidOrExpiredCredential)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{TokenError, TokenTtl};

    fn service() -> TokenService {
        TokenService::new("guard-secret", TokenTtl::default()).unwrap()
    }

    #[test]
    fn strips_optional_bearer_prefix() {
        assert_eq!(extract_bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert_eq!(extract_bearer_token(Some("abc")).unwrap(), "abc");
    }

    #[test]
    fn missing_or_blank_header_is_missing_credential() {
        for header in [None, Some(""), Some("   "), Some("Bearer ")] {
            assert!(matches!(
                extract_bearer_token(header),
                Err(AuthError::MissingCredential)
            ));
        }
    }

    #[test]
    fn authenticates_access_tokens() {
        let tokens = service();
        let token = tokens.issue(266, "kaka", TokenKind::Access).unwrap();

        let header = format!("Bearer {token}");
        let identity = authenticate(Some(&header), &tokens).unwrap();
        assert_eq!(identity.subject_id, 266);

        let identity = authenticate(Some(&token), &tokens).unwrap();
        assert_eq!(identity.subject_name, "kaka");
    }

    #[test]
    fn refresh_tokens_do_not_authenticate() {
        let tokens = service();
        let token = tokens.issue(266, "kaka", TokenKind::Refresh).unwrap();

        let err = authenticate(Some(&token), &tokens).unwrap_err();
        assert!(matches!(
            err,
            AuthError::InvalidOrExpiredCredential(
                TokenError::KindMismatch { .. }
            )
        ));
    }

    #[test]
    fn missing_header_fails_before_verification() {
        assert!(matches!(
            authenticate(None, &service()),
            Err(AuthError::MissingCredential)
        ));
    }
}
