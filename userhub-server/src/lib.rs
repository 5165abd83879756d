//! # userhub server
//!
//! HTTP front end for the user directory:
//!
//! - **Auth**: `/api/auth/login` and `/api/auth/refresh` issue HS256
//!   access/refresh tokens for the configured account.
//! - **Users**: list/get/add/update/soft-delete over MySQL, all behind the
//!   bearer-token middleware.
//! - **Health**: `/health` reports pool occupancy.

pub mod api_types;
pub mod errors;
pub mod handlers;
pub mod infra;
pub mod middleware;
pub mod routes;

pub use infra::app_state::AppState;
