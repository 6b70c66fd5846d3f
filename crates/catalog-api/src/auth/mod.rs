//! HTTP Basic authentication for staff accounts

pub mod middleware;
pub mod models;
pub mod password;

pub use middleware::{auth_middleware, AuthFailureLimiter, AuthState};
pub use models::AuthUser;
