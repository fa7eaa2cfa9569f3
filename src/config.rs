use crate::center::DeletePolicy;

/// Runtime settings for the academy service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Signs session cookies.
    pub secret: String,
    /// Session lifetime in seconds (default: 8 hours).
    pub session_lifetime_secs: i64,
    /// Session lifetime when the user asks to be remembered (default: 30 days).
    pub remember_lifetime_secs: i64,
    pub rate_limit: RateLimit,
    pub center_delete: DeletePolicy,
    pub min_password_length: usize,
}

/// Failed login throttling, applied per IP and per account.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    /// Failures tolerated within `window_secs` before locking (default: 5).
    pub max_failures: i64,
    /// Window over which failures accumulate (default: 300).
    pub window_secs: i64,
    /// How long a locked principal is refused (default: 300).
    pub lockout_secs: i64,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            max_failures: 5,
            window_secs: 300,
            lockout_secs: 300,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            secret: String::new(),
            session_lifetime_secs: 8 * 60 * 60,
            remember_lifetime_secs: 30 * 24 * 60 * 60,
            rate_limit: RateLimit::default(),
            center_delete: DeletePolicy::Cascade,
            min_password_length: 8,
        }
    }
}
