//! Admin authentication: a single configured credential pair exchanged for
//! a short-lived HS256 token.

pub mod domain;
pub mod errors;
pub mod service;

pub use service::{AuthConfig, AuthService};
