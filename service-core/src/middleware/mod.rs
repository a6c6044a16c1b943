pub mod rate_limit;

pub use rate_limit::{IpRateLimiter, create_ip_rate_limiter, ip_rate_limit_middleware};
