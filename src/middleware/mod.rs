//! HTTP middleware.

mod rate_limit;
mod request_logger;

pub use rate_limit::RateLimit;
pub use request_logger::RequestLogger;
