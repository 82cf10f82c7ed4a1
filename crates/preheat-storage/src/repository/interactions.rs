//! Simulated interaction queue repository
//!
//! A Postgres-backed delayed task queue: rows become visible once
//! `scheduled_at` passes, are claimed under a visibility timeout, and are
//! deleted after expiry. Delivery is at-least-once.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewSimulatedInteraction, SimulatedInteraction};

/// Simulated interaction repository
#[derive(Clone)]
pub struct InteractionRepository {
    pool: PgPool,
}

impl InteractionRepository {
    /// Create a new interaction repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue a simulated interaction
    pub async fn enqueue(
        &self,
        input: NewSimulatedInteraction,
    ) -> Result<SimulatedInteraction, sqlx::Error> {
        let id = Uuid::new_v4();

        sqlx::query_as::<_, SimulatedInteraction>(
            r#"
            INSERT INTO simulated_interactions (
                id, warmup_email_id, warmup_job_id, interaction_type,
                scheduled_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.warmup_email_id)
        .bind(input.warmup_job_id)
        .bind(&input.interaction_type)
        .bind(input.scheduled_at)
        .bind(input.expires_at)
        .fetch_one(&self.pool)
        .await
    }

    /// Claim due interactions under a visibility timeout.
    ///
    /// `FOR UPDATE SKIP LOCKED` keeps concurrent sweepers off each other's
    /// rows; a claim that is never completed becomes claimable again once
    /// `locked_until` passes.
    pub async fn claim_due(
        &self,
        now: DateTime<Utc>,
        visibility: Duration,
        limit: i64,
    ) -> Result<Vec<SimulatedInteraction>, sqlx::Error> {
        sqlx::query_as::<_, SimulatedInteraction>(
            r#"
            UPDATE simulated_interactions SET
                locked_until = $2,
                attempts = attempts + 1
            WHERE id IN (
                SELECT id FROM simulated_interactions
                WHERE status = 'pending'
                  AND scheduled_at <= $1
                  AND (locked_until IS NULL OR locked_until < $1)
                ORDER BY scheduled_at ASC
                LIMIT $3
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(now + visibility)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Mark a claimed interaction as applied
    pub async fn mark_done(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE simulated_interactions SET status = 'done', locked_until = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete records past their expiry, applied or not
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM simulated_interactions WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
