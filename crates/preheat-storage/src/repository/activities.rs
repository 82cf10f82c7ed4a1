//! Warmup activity repository

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewWarmupActivity, WarmupActivity};

/// Warmup activity repository; rows are append-only
#[derive(Clone)]
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    /// Create a new activity repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a daily aggregate row
    pub async fn insert(&self, input: NewWarmupActivity) -> Result<WarmupActivity, sqlx::Error> {
        let id = Uuid::new_v4();

        sqlx::query_as::<_, WarmupActivity>(
            r#"
            INSERT INTO warmup_activities (
                id, warmup_plan_id, activity_date, emails_sent, emails_delivered,
                emails_opened, emails_replied, emails_bounced, spam_complaints,
                health_score
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.warmup_plan_id)
        .bind(input.activity_date)
        .bind(input.emails_sent)
        .bind(input.emails_delivered)
        .bind(input.emails_opened)
        .bind(input.emails_replied)
        .bind(input.emails_bounced)
        .bind(input.spam_complaints)
        .bind(input.health_score)
        .fetch_one(&self.pool)
        .await
    }
}
