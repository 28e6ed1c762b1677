//! Route handlers: the auth flow plus service health.

pub mod auth;
pub mod health;
