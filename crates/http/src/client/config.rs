//! Client defaults and authentication endpoint paths

use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "shopfront-client/0.1.0";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Paths of the endpoints that manage the session itself
///
/// Requests to these never carry a bearer token, and a 401 from them is
/// returned to the caller instead of triggering a token refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEndpoints {
    pub login: String,
    pub refresh: String,
    pub logout: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            login: "/auth/login".to_string(),
            refresh: "/auth/refresh".to_string(),
            logout: "/auth/logout".to_string(),
        }
    }
}

impl AuthEndpoints {
    pub fn paths(&self) -> [&str; 3] {
        [
            self.login.as_str(),
            self.refresh.as_str(),
            self.logout.as_str(),
        ]
    }
}
