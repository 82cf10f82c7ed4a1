//! Warmup email repository

use chrono::{DateTime, Utc};
use preheat_common::types::{EmailId, JobId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewWarmupEmail, WarmupEmail};

/// Warmup email repository
#[derive(Clone)]
pub struct EmailRepository {
    pool: PgPool,
}

impl EmailRepository {
    /// Create a new email repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a day's emails in one transaction
    pub async fn create_batch(&self, emails: Vec<NewWarmupEmail>) -> Result<u64, sqlx::Error> {
        let mut count = 0u64;
        let mut tx = self.pool.begin().await?;

        for input in emails {
            let id = Uuid::new_v4();

            let result = sqlx::query(
                r#"
                INSERT INTO warmup_emails (
                    id, warmup_job_id, recipient_email, recipient_name,
                    recipient_type, content_type, subject, content, scheduled_at,
                    interaction_simulated, simulation_type, simulation_delay_hours
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(id)
            .bind(input.warmup_job_id)
            .bind(&input.recipient_email)
            .bind(&input.recipient_name)
            .bind(&input.recipient_type)
            .bind(&input.content_type)
            .bind(&input.subject)
            .bind(&input.content)
            .bind(input.scheduled_at)
            .bind(input.interaction_simulated)
            .bind(&input.simulation_type)
            .bind(input.simulation_delay_hours)
            .execute(&mut *tx)
            .await?;

            count += result.rows_affected();
        }

        tx.commit().await?;
        Ok(count)
    }

    /// Get an email by ID
    pub async fn get(&self, id: EmailId) -> Result<Option<WarmupEmail>, sqlx::Error> {
        sqlx::query_as::<_, WarmupEmail>("SELECT * FROM warmup_emails WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List a job's pending emails in dispatch order
    pub async fn list_pending_by_job(
        &self,
        job_id: JobId,
    ) -> Result<Vec<WarmupEmail>, sqlx::Error> {
        sqlx::query_as::<_, WarmupEmail>(
            r#"
            SELECT * FROM warmup_emails
            WHERE warmup_job_id = $1 AND status = 'pending'
            ORDER BY scheduled_at ASC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Mark an email delivered after a successful dispatch
    pub async fn mark_delivered(
        &self,
        id: EmailId,
        sent_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE warmup_emails SET
                status = 'delivered',
                sent_at = $2,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(sent_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark an email bounced on a hard rejection
    pub async fn mark_bounced(
        &self,
        id: EmailId,
        sent_at: DateTime<Utc>,
        error: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE warmup_emails SET
                status = 'bounced',
                sent_at = $2,
                error_message = $3,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(sent_at)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark an email failed; the send loop continues past it
    pub async fn mark_failed(&self, id: EmailId, error: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE warmup_emails SET
                status = 'failed',
                error_message = $2,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a simulated open.
    ///
    /// Conditional on the current status so an at-least-once replay of the
    /// same interaction is a no-op.
    pub async fn mark_opened(&self, id: EmailId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE warmup_emails SET
                status = 'opened',
                updated_at = NOW()
            WHERE id = $1 AND status IN ('sent', 'delivered')
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a simulated reply
    pub async fn mark_replied(&self, id: EmailId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE warmup_emails SET
                status = 'replied',
                updated_at = NOW()
            WHERE id = $1 AND status IN ('sent', 'delivered', 'opened')
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a simulated click as an event row
    pub async fn insert_click(
        &self,
        email_id: EmailId,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO email_click_events (id, warmup_email_id, occurred_at) VALUES ($1, $2, $3)",
        )
        .bind(Uuid::new_v4())
        .bind(email_id)
        .bind(occurred_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Push pending emails to new send slots in one transaction.
    ///
    /// Used for quota deferral; the email count is preserved, only
    /// `scheduled_at` moves.
    pub async fn reschedule_batch(
        &self,
        slots: &[(EmailId, DateTime<Utc>)],
    ) -> Result<u64, sqlx::Error> {
        let mut count = 0u64;
        let mut tx = self.pool.begin().await?;

        for (id, scheduled_at) in slots {
            let result = sqlx::query(
                r#"
                UPDATE warmup_emails SET
                    scheduled_at = $2,
                    updated_at = NOW()
                WHERE id = $1 AND status = 'pending'
                "#,
            )
            .bind(id)
            .bind(scheduled_at)
            .execute(&mut *tx)
            .await?;

            count += result.rows_affected();
        }

        tx.commit().await?;
        Ok(count)
    }
}
