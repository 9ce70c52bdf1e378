//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Rate limiter — reject early, save resources
//! 2. Auth validator — bearer token to session to fresh staff profile
//! 3. Audit logger — logs after auth, has the staff identity

pub mod audit;
pub mod auth;
pub mod rate;
