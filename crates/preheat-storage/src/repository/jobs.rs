//! Warmup job repository

use chrono::{DateTime, NaiveDate, Utc};
use preheat_common::types::{JobId, PlanId};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{JobLogEntry, NewWarmupJob, WarmupJob};

/// Counters written back onto a job after an execution run
#[derive(Debug, Clone, Copy, Default)]
pub struct JobCounters {
    pub sent: i32,
    pub delivered: i32,
    pub bounced: i32,
}

/// Warmup job repository
#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    /// Create a new job repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a job for a plan and date.
    ///
    /// Returns `None` when a job already exists for that `(plan, date)`
    /// pair; the unique constraint makes concurrent scheduling safe without
    /// an in-memory lock.
    pub async fn create(&self, input: NewWarmupJob) -> Result<Option<WarmupJob>, sqlx::Error> {
        let id = Uuid::new_v4();

        sqlx::query_as::<_, WarmupJob>(
            r#"
            INSERT INTO warmup_jobs (id, warmup_plan_id, scheduled_date, target_emails)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (warmup_plan_id, scheduled_date) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.warmup_plan_id)
        .bind(input.scheduled_date)
        .bind(input.target_emails)
        .fetch_optional(&self.pool)
        .await
    }

    /// Get a job by ID
    pub async fn get(&self, id: JobId) -> Result<Option<WarmupJob>, sqlx::Error> {
        sqlx::query_as::<_, WarmupJob>("SELECT * FROM warmup_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List pending jobs due on or before the given date
    pub async fn list_executable(&self, date: NaiveDate) -> Result<Vec<WarmupJob>, sqlx::Error> {
        sqlx::query_as::<_, WarmupJob>(
            r#"
            SELECT * FROM warmup_jobs
            WHERE status = 'pending' AND scheduled_date <= $1
            ORDER BY scheduled_date ASC
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await
    }

    /// Claim a pending job for execution.
    ///
    /// Conditional on the current status, so only one of several concurrent
    /// executors wins the claim.
    pub async fn mark_running(
        &self,
        id: JobId,
        started_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE warmup_jobs SET
                status = 'running',
                started_at = $2,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(started_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Put a claimed job back to pending after a quota deferral
    pub async fn revert_to_pending(&self, id: JobId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE warmup_jobs SET
                status = 'pending',
                updated_at = NOW()
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark a job completed, folding in the run's counters.
    ///
    /// Counters are added rather than assigned: a quota-deferred job can
    /// execute more than once, and the simulator may have already bumped
    /// opened/replied.
    pub async fn complete(
        &self,
        id: JobId,
        counters: JobCounters,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<WarmupJob>, sqlx::Error> {
        sqlx::query_as::<_, WarmupJob>(
            r#"
            UPDATE warmup_jobs SET
                status = 'completed',
                emails_sent = emails_sent + $2,
                emails_delivered = emails_delivered + $3,
                emails_bounced = emails_bounced + $4,
                completed_at = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(counters.sent)
        .bind(counters.delivered)
        .bind(counters.bounced)
        .bind(completed_at)
        .fetch_optional(&self.pool)
        .await
    }

    /// Mark a job failed with the error captured
    pub async fn fail(
        &self,
        id: JobId,
        error: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<WarmupJob>, sqlx::Error> {
        sqlx::query_as::<_, WarmupJob>(
            r#"
            UPDATE warmup_jobs SET
                status = 'failed',
                error_message = $2,
                completed_at = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(completed_at)
        .fetch_optional(&self.pool)
        .await
    }

    /// Append an entry to the job's execution log
    pub async fn append_log(&self, id: JobId, entry: &JobLogEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE warmup_jobs SET
                execution_log = execution_log || $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Json(vec![entry.clone()]))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Increment the opened counter after a simulated open
    pub async fn increment_opened(&self, id: JobId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE warmup_jobs SET emails_opened = emails_opened + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Increment the replied counter after a simulated reply
    pub async fn increment_replied(&self, id: JobId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE warmup_jobs SET emails_replied = emails_replied + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List running jobs started before the cutoff
    pub async fn list_stalled(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<WarmupJob>, sqlx::Error> {
        sqlx::query_as::<_, WarmupJob>(
            r#"
            SELECT * FROM warmup_jobs
            WHERE status = 'running' AND started_at < $1
            ORDER BY started_at ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
    }

    /// List jobs from past dates that never started
    pub async fn list_unstarted(
        &self,
        before: NaiveDate,
    ) -> Result<Vec<WarmupJob>, sqlx::Error> {
        sqlx::query_as::<_, WarmupJob>(
            r#"
            SELECT * FROM warmup_jobs
            WHERE status = 'pending' AND started_at IS NULL AND scheduled_date < $1
            ORDER BY scheduled_date ASC
            "#,
        )
        .bind(before)
        .fetch_all(&self.pool)
        .await
    }

    /// Count a plan's failed jobs since the given date
    pub async fn count_recent_failures(
        &self,
        plan_id: PlanId,
        since: NaiveDate,
    ) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM warmup_jobs
            WHERE warmup_plan_id = $1 AND status = 'failed' AND scheduled_date >= $2
            "#,
        )
        .bind(plan_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }
}
