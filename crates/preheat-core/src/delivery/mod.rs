//! External delivery contracts - quota check and message send
//!
//! Both are I/O boundaries owned by other subsystems; the warmup controller
//! only consumes them. A lettre-backed production transport lives in
//! [`smtp`].

mod smtp;

pub use smtp::SmtpTransport;

use async_trait::async_trait;
use preheat_common::types::AccountId;

/// Result of an account quota check, taken once per job execution
#[derive(Debug, Clone, Copy)]
pub struct QuotaStatus {
    pub is_available: bool,
    pub daily_remaining: i64,
    pub hourly_remaining: i64,
}

/// Sending-quota contract owned by the rate-limiting subsystem
#[async_trait]
pub trait QuotaChecker: Send + Sync {
    async fn check(&self, account_id: AccountId, domain: &str) -> anyhow::Result<QuotaStatus>;
}

/// Quota checker for deployments without an external limiter
pub struct UnmeteredQuota;

#[async_trait]
impl QuotaChecker for UnmeteredQuota {
    async fn check(&self, _account_id: AccountId, _domain: &str) -> anyhow::Result<QuotaStatus> {
        Ok(QuotaStatus {
            is_available: true,
            daily_remaining: i64::MAX,
            hourly_remaining: i64::MAX,
        })
    }
}

/// One outbound warmup message
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub from: String,
    pub from_name: Option<String>,
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub content: String,
    pub tracking_enabled: bool,
    pub warmup_mode: bool,
}

/// Outcome of a single send attempt
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub success: bool,
    pub tracking_id: Option<String>,
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn sent(tracking_id: String) -> Self {
        Self {
            success: true,
            tracking_id: Some(tracking_id),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            tracking_id: None,
            error: Some(error.into()),
        }
    }
}

/// Message-send contract owned by the transport subsystem
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, request: &SendRequest) -> SendOutcome;
}

/// Whether an SMTP error string indicates a hard rejection of the
/// recipient rather than a transient or local failure
pub fn is_hard_bounce(error: &str) -> bool {
    error.contains("5.1.1")
        || error.contains("550")
        || error.contains("User unknown")
        || error.contains("does not exist")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_bounce_classification() {
        assert!(is_hard_bounce("550 5.1.1 User unknown"));
        assert!(is_hard_bounce("recipient does not exist"));
        assert!(!is_hard_bounce("421 service temporarily unavailable"));
        assert!(!is_hard_bounce("connection reset by peer"));
    }

    #[tokio::test]
    async fn test_unmetered_quota_is_always_available() {
        let quota = UnmeteredQuota;
        let status = quota
            .check(uuid::Uuid::new_v4(), "example.com")
            .await
            .unwrap();
        assert!(status.is_available);
        assert_eq!(status.daily_remaining, i64::MAX);
    }
}
