pub mod auth;

pub use auth::{issue_token, pilot_auth_middleware, PilotClaims};
