//! QMS server configuration: loaded from environment variables.

use chrono::Duration;

#[derive(Clone, Debug)]
pub struct QmsConfig {
    /// HMAC key used to sign session tokens.
    pub auth_secret: String,
    /// Lifetime of a session token in hours.
    pub session_ttl_hours: i64,
    /// Days before a due date at which an item turns amber.
    pub rag_amber_days: i64,
    /// Days before a due date at which an item turns red.
    pub rag_red_days: i64,
    /// Page size used when a list request gives no limit.
    pub default_page_size: i64,
    /// Upper bound on any requested page size.
    pub max_page_size: i64,
    /// Organization name stamped on auditor packs.
    pub organization: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for QmsConfig {
    fn default() -> Self {
        Self {
            auth_secret: String::new(),
            session_ttl_hours: 12,
            rag_amber_days: 30,
            rag_red_days: 0,
            default_page_size: 50,
            max_page_size: 200,
            organization: "ComplianceOS".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl QmsConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut auth_secret = std::env::var("QMS_AUTH_SECRET").unwrap_or_default();
        let session_ttl_hours = std::env::var("QMS_SESSION_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.session_ttl_hours);
        let rag_amber_days = std::env::var("QMS_RAG_AMBER_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.rag_amber_days);
        let rag_red_days = std::env::var("QMS_RAG_RED_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.rag_red_days);
        let default_page_size = std::env::var("QMS_DEFAULT_PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.default_page_size);
        let max_page_size = std::env::var("QMS_MAX_PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_page_size);
        let organization =
            std::env::var("QMS_ORGANIZATION").unwrap_or_else(|_| defaults.organization.clone());
        let request_timeout_secs = std::env::var("QMS_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.request_timeout_secs);

        if auth_secret.is_empty() {
            tracing::warn!(
                "QMS_AUTH_SECRET not set -- using a per-process secret, sessions will not survive restarts"
            );
            auth_secret = format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple());
        }
        if rag_red_days > rag_amber_days {
            tracing::warn!(
                rag_red_days,
                rag_amber_days,
                "QMS_RAG_RED_DAYS exceeds QMS_RAG_AMBER_DAYS -- amber band will be empty"
            );
        }

        Self {
            auth_secret,
            session_ttl_hours,
            rag_amber_days,
            rag_red_days,
            default_page_size,
            max_page_size: max_page_size.max(1),
            organization,
            request_timeout_secs,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.session_ttl_hours)
    }

    /// Clamp a requested page size into `1..=max_page_size`.
    pub fn page_size(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size)
    }

    pub fn thresholds(&self) -> crate::compliance::rag::RagThresholds {
        crate::compliance::rag::RagThresholds {
            amber_days: self.rag_amber_days,
            red_days: self.rag_red_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_clamped() {
        let config = QmsConfig::default();
        assert_eq!(config.page_size(None), 50);
        assert_eq!(config.page_size(Some(0)), 1);
        assert_eq!(config.page_size(Some(10_000)), 200);
        assert_eq!(config.page_size(Some(25)), 25);
    }
}
