//! Database models

use chrono::{DateTime, NaiveDate, Utc};
use preheat_common::types::{AccountId, EmailId, JobId, PlanId, UserId};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Warmup plan settings, validated at plan creation.
///
/// Stored as JSONB on the plan row; every recognized threshold is an
/// explicit field rather than a free-form blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSettings {
    /// Maximum tolerated bounce rate (fraction of sent)
    pub max_bounce_rate: f64,

    /// Maximum tolerated spam-complaint rate (fraction of sent)
    pub max_spam_rate: f64,

    /// Open rate the plan aims for (fraction of delivered)
    pub target_open_rate: f64,

    /// Reply rate the plan aims for (fraction of delivered)
    pub target_reply_rate: f64,

    /// Restrict sends to the configured business-hours window
    pub business_hours_only: bool,

    /// Pause the plan automatically on threshold breach
    pub auto_pause_enabled: bool,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            max_bounce_rate: 0.05,
            max_spam_rate: 0.01,
            target_open_rate: 0.20,
            target_reply_rate: 0.05,
            business_hours_only: true,
            auto_pause_enabled: true,
        }
    }
}

impl PlanSettings {
    /// Validate threshold ranges. Rejected settings never reach the store.
    pub fn validate(&self) -> preheat_common::Result<()> {
        fn check(name: &str, value: f64) -> preheat_common::Result<()> {
            if !(0.0..=1.0).contains(&value) {
                return Err(preheat_common::Error::Validation(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
            Ok(())
        }

        check("max_bounce_rate", self.max_bounce_rate)?;
        check("max_spam_rate", self.max_spam_rate)?;
        check("target_open_rate", self.target_open_rate)?;
        check("target_reply_rate", self.target_reply_rate)?;

        if self.max_bounce_rate == 0.0 || self.max_spam_rate == 0.0 {
            return Err(preheat_common::Error::Validation(
                "bounce and spam thresholds must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Warmup plan model - one per sending identity under warmup
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WarmupPlan {
    pub id: PlanId,
    pub account_id: AccountId,
    pub user_id: UserId,
    /// Sending identity being warmed up
    pub sender_address: String,
    pub sender_name: Option<String>,
    pub strategy: String,
    pub status: String,
    /// 0 before start, then 1..=total_weeks
    pub current_week: i32,
    pub total_weeks: i32,
    pub daily_target: i32,
    pub actual_sent_today: i32,
    /// Monotonic; only ever incremented atomically
    pub total_sent: i64,
    pub total_delivered: i64,
    pub total_opened: i64,
    pub total_replied: i64,
    pub total_bounced: i64,
    pub total_complaints: i64,
    pub health_score: f64,
    pub reputation_score: f64,
    pub trend: String,
    pub start_date: DateTime<Utc>,
    pub expected_completion_date: DateTime<Utc>,
    pub actual_completion_date: Option<DateTime<Utc>>,
    pub pause_reason: Option<String>,
    pub failure_reason: Option<String>,
    pub settings: Json<PlanSettings>,
    pub metrics_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WarmupPlan {
    /// Domain of the sending identity
    pub fn sender_domain(&self) -> &str {
        preheat_common::types::email_domain(&self.sender_address).unwrap_or("")
    }
}

/// Input for creating a warmup plan row; all derived fields are computed
/// by the plan manager before insertion.
#[derive(Debug, Clone)]
pub struct NewWarmupPlan {
    pub account_id: AccountId,
    pub user_id: UserId,
    pub sender_address: String,
    pub sender_name: Option<String>,
    pub strategy: String,
    pub total_weeks: i32,
    pub daily_target: i32,
    pub start_date: DateTime<Utc>,
    pub expected_completion_date: DateTime<Utc>,
    pub settings: PlanSettings,
}

/// One timestamped, leveled entry in a job's execution log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLogEntry {
    pub at: DateTime<Utc>,
    pub level: String,
    pub message: String,
}

impl JobLogEntry {
    pub fn info(at: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            at,
            level: "info".to_string(),
            message: message.into(),
        }
    }

    pub fn warning(at: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            at,
            level: "warning".to_string(),
            message: message.into(),
        }
    }

    pub fn error(at: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            at,
            level: "error".to_string(),
            message: message.into(),
        }
    }
}

/// Warmup job model - one per plan per calendar day
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WarmupJob {
    pub id: JobId,
    pub warmup_plan_id: PlanId,
    pub scheduled_date: NaiveDate,
    pub target_emails: i32,
    pub status: String,
    pub emails_sent: i32,
    pub emails_delivered: i32,
    pub emails_opened: i32,
    pub emails_replied: i32,
    pub emails_bounced: i32,
    pub spam_complaints: i32,
    pub execution_log: Json<Vec<JobLogEntry>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a warmup job
#[derive(Debug, Clone)]
pub struct NewWarmupJob {
    pub warmup_plan_id: PlanId,
    pub scheduled_date: NaiveDate,
    pub target_emails: i32,
}

/// Warmup email model - one per outbound message belonging to a job
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WarmupEmail {
    pub id: EmailId,
    pub warmup_job_id: JobId,
    pub recipient_email: String,
    pub recipient_name: Option<String>,
    pub recipient_type: String,
    pub content_type: String,
    pub subject: String,
    pub content: String,
    pub scheduled_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub status: String,
    pub error_message: Option<String>,
    pub interaction_simulated: bool,
    pub simulation_type: Option<String>,
    pub simulation_delay_hours: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a warmup email
#[derive(Debug, Clone)]
pub struct NewWarmupEmail {
    pub warmup_job_id: JobId,
    pub recipient_email: String,
    pub recipient_name: Option<String>,
    pub recipient_type: String,
    pub content_type: String,
    pub subject: String,
    pub content: String,
    pub scheduled_at: DateTime<Utc>,
    pub interaction_simulated: bool,
    pub simulation_type: Option<String>,
    pub simulation_delay_hours: Option<i32>,
}

/// Append-only daily aggregate written on every plan metrics update
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WarmupActivity {
    pub id: uuid::Uuid,
    pub warmup_plan_id: PlanId,
    pub activity_date: NaiveDate,
    pub emails_sent: i32,
    pub emails_delivered: i32,
    pub emails_opened: i32,
    pub emails_replied: i32,
    pub emails_bounced: i32,
    pub spam_complaints: i32,
    pub health_score: f64,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a warmup activity row
#[derive(Debug, Clone)]
pub struct NewWarmupActivity {
    pub warmup_plan_id: PlanId,
    pub activity_date: NaiveDate,
    pub emails_sent: i32,
    pub emails_delivered: i32,
    pub emails_opened: i32,
    pub emails_replied: i32,
    pub emails_bounced: i32,
    pub spam_complaints: i32,
    pub health_score: f64,
}

/// Delayed synthetic-engagement task, replayed by the interaction sweeper.
///
/// Claimed with a visibility timeout; delivery is at-least-once and the
/// applied transitions are conditional, so replay is idempotent.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SimulatedInteraction {
    pub id: uuid::Uuid,
    pub warmup_email_id: EmailId,
    pub warmup_job_id: JobId,
    pub interaction_type: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: String,
    pub attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Input for enqueueing a simulated interaction
#[derive(Debug, Clone)]
pub struct NewSimulatedInteraction {
    pub warmup_email_id: EmailId,
    pub warmup_job_id: JobId,
    pub interaction_type: String,
    pub scheduled_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Per-execution counter deltas pushed into a plan's running metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsDelta {
    pub sent: i64,
    pub delivered: i64,
    pub opened: i64,
    pub replied: i64,
    pub bounced: i64,
    pub complaints: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_validate_defaults() {
        assert!(PlanSettings::default().validate().is_ok());
    }

    #[test]
    fn test_settings_validate_rejects_out_of_range() {
        let mut settings = PlanSettings::default();
        settings.max_bounce_rate = 1.5;
        assert!(settings.validate().is_err());

        let mut settings = PlanSettings::default();
        settings.target_open_rate = -0.1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_validate_rejects_zero_thresholds() {
        let mut settings = PlanSettings::default();
        settings.max_spam_rate = 0.0;
        assert!(settings.validate().is_err());
    }
}
