//! Warmup plan repository

use chrono::{DateTime, Utc};
use preheat_common::types::PlanId;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{MetricsDelta, NewWarmupPlan, WarmupPlan};

/// Warmup plan repository
#[derive(Clone)]
pub struct PlanRepository {
    pool: PgPool,
}

impl PlanRepository {
    /// Create a new plan repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new warmup plan in `pending` status
    pub async fn create(&self, input: NewWarmupPlan) -> Result<WarmupPlan, sqlx::Error> {
        let id = Uuid::new_v4();

        sqlx::query_as::<_, WarmupPlan>(
            r#"
            INSERT INTO warmup_plans (
                id, account_id, user_id, sender_address, sender_name, strategy,
                total_weeks, daily_target, start_date, expected_completion_date, settings
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.account_id)
        .bind(input.user_id)
        .bind(&input.sender_address)
        .bind(&input.sender_name)
        .bind(&input.strategy)
        .bind(input.total_weeks)
        .bind(input.daily_target)
        .bind(input.start_date)
        .bind(input.expected_completion_date)
        .bind(Json(input.settings))
        .fetch_one(&self.pool)
        .await
    }

    /// Get a plan by ID
    pub async fn get(&self, id: PlanId) -> Result<Option<WarmupPlan>, sqlx::Error> {
        sqlx::query_as::<_, WarmupPlan>("SELECT * FROM warmup_plans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List all active plans
    pub async fn list_active(&self) -> Result<Vec<WarmupPlan>, sqlx::Error> {
        sqlx::query_as::<_, WarmupPlan>(
            "SELECT * FROM warmup_plans WHERE status = 'active' ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Move a pending plan to active, re-stamping its start date
    pub async fn start(
        &self,
        id: PlanId,
        start_date: DateTime<Utc>,
        expected_completion_date: DateTime<Utc>,
        daily_target: i32,
    ) -> Result<Option<WarmupPlan>, sqlx::Error> {
        sqlx::query_as::<_, WarmupPlan>(
            r#"
            UPDATE warmup_plans SET
                status = 'active',
                current_week = 1,
                daily_target = $2,
                start_date = $3,
                expected_completion_date = $4,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(daily_target)
        .bind(start_date)
        .bind(expected_completion_date)
        .fetch_optional(&self.pool)
        .await
    }

    /// Pause an active plan, recording the reason
    pub async fn pause(
        &self,
        id: PlanId,
        reason: &str,
    ) -> Result<Option<WarmupPlan>, sqlx::Error> {
        sqlx::query_as::<_, WarmupPlan>(
            r#"
            UPDATE warmup_plans SET
                status = 'paused',
                pause_reason = $2,
                updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
    }

    /// Resume a paused plan, clearing the pause reason
    pub async fn resume(&self, id: PlanId) -> Result<Option<WarmupPlan>, sqlx::Error> {
        sqlx::query_as::<_, WarmupPlan>(
            r#"
            UPDATE warmup_plans SET
                status = 'active',
                pause_reason = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'paused'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Complete an active plan
    pub async fn complete(
        &self,
        id: PlanId,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<WarmupPlan>, sqlx::Error> {
        sqlx::query_as::<_, WarmupPlan>(
            r#"
            UPDATE warmup_plans SET
                status = 'completed',
                actual_completion_date = $2,
                updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(completed_at)
        .fetch_optional(&self.pool)
        .await
    }

    /// Fail a plan; terminal, reachable from active or paused
    pub async fn fail(
        &self,
        id: PlanId,
        reason: &str,
    ) -> Result<Option<WarmupPlan>, sqlx::Error> {
        sqlx::query_as::<_, WarmupPlan>(
            r#"
            UPDATE warmup_plans SET
                status = 'failed',
                failure_reason = $2,
                updated_at = NOW()
            WHERE id = $1 AND status IN ('active', 'paused')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
    }

    /// Advance the plan to a later week, resetting the daily counter.
    ///
    /// The `current_week < $2` guard makes repeated or concurrent invocations
    /// a no-op; only the winning writer sees `true`.
    pub async fn advance_week(
        &self,
        id: PlanId,
        week: i32,
        daily_target: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE warmup_plans SET
                current_week = $2,
                daily_target = $3,
                actual_sent_today = 0,
                updated_at = NOW()
            WHERE id = $1 AND status = 'active' AND current_week < $2
            "#,
        )
        .bind(id)
        .bind(week)
        .bind(daily_target)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Reset the day counter at a day boundary
    pub async fn reset_daily_sent(&self, id: PlanId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE warmup_plans SET actual_sent_today = 0, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Atomically add execution counters to the plan's running totals.
    ///
    /// Increment-in-place rather than read-modify-write; concurrent job
    /// executions for the same plan must not lose updates.
    pub async fn add_delivery_counters(
        &self,
        id: PlanId,
        delta: &MetricsDelta,
    ) -> Result<Option<WarmupPlan>, sqlx::Error> {
        sqlx::query_as::<_, WarmupPlan>(
            r#"
            UPDATE warmup_plans SET
                total_sent = total_sent + $2,
                total_delivered = total_delivered + $3,
                total_opened = total_opened + $4,
                total_replied = total_replied + $5,
                total_bounced = total_bounced + $6,
                total_complaints = total_complaints + $7,
                actual_sent_today = actual_sent_today + $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(delta.sent)
        .bind(delta.delivered)
        .bind(delta.opened)
        .bind(delta.replied)
        .bind(delta.bounced)
        .bind(delta.complaints)
        .fetch_optional(&self.pool)
        .await
    }

    /// Store freshly computed health and reputation scores
    pub async fn update_scores(
        &self,
        id: PlanId,
        health_score: f64,
        reputation_score: f64,
        trend: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE warmup_plans SET
                health_score = $2,
                reputation_score = $3,
                trend = $4,
                metrics_updated_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(health_score)
        .bind(reputation_score)
        .bind(trend)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
