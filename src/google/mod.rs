//! Google OAuth2 and Gmail API integration.

pub mod auth;
pub mod gmail;
pub mod utils;
