//! Token-based authentication.
//!
//! Tokens are stateless HS256 JWTs. Access tokens authorize API calls,
//! refresh tokens only mint new access tokens. Nothing is persisted, so there
//! is no revocation: a token is valid until its `exp`.

pub mod claims;
pub mod crypto;
pub mod errors;
pub mod guard;
pub mod token;

pub use claims::{AuthenticatedIdentity, Claims, TokenKind};
pub use crypto::{AuthCrypto, AuthCryptoError};
pub use errors::{AuthError, TokenError};
pub use guard::{authenticate, extract_bearer_token};
pub use token::{TokenPair, TokenService, TokenTtl};
