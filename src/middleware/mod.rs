//! HTTP middleware.

pub mod session_limit;

pub use session_limit::session_limit_middleware;
