//! Configuration for userhub.
//!
//! Settings come from the process environment, optionally backed by a `.env`
//! file. Loading yields the typed [`Config`] together with any
//! [`ConfigWarnings`] the caller should surface at startup.

pub mod constants;
pub mod error;
pub mod loader;
pub mod models;
pub mod sources;
pub mod util;
pub mod validation;

pub use error::ConfigLoadError;
pub use loader::{ConfigLoad, ConfigLoader};
pub use models::{
    AuthConfig, Config, ConfigMetadata, DatabaseConfig, LoginAccount,
    ServerConfig,
};
pub use sources::EnvConfig;
pub use validation::{ConfigWarning, ConfigWarnings};
