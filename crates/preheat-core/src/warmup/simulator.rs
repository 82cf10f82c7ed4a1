//! Interaction Simulator - delayed synthetic engagement replay
//!
//! Modeled as an explicit delayed task queue: records are claimed under a
//! visibility timeout and applied through conditional status transitions,
//! so at-least-once delivery and replay are both safe.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use preheat_common::types::InteractionType;
use preheat_storage::models::{NewSimulatedInteraction, SimulatedInteraction, WarmupEmail};
use preheat_storage::repository::{EmailRepository, InteractionRepository, JobRepository};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Expiry margin past the scheduled replay time; 24h comfortably exceeds
/// the maximum simulation delay, so every record is eventually cleaned up.
const EXPIRY_MARGIN_HOURS: i64 = 24;

/// How long a claimed record stays invisible to other sweepers
const CLAIM_VISIBILITY_MINUTES: i64 = 5;

/// Records processed per sweep
const SWEEP_BATCH_SIZE: i64 = 200;

/// Counts from one sweep pass
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepStats {
    pub claimed: usize,
    pub applied: usize,
    pub expired: u64,
}

/// Interaction Simulator
pub struct InteractionSimulator {
    interactions: InteractionRepository,
    emails: EmailRepository,
    jobs: JobRepository,
}

impl InteractionSimulator {
    /// Create a new interaction simulator
    pub fn new(
        interactions: InteractionRepository,
        emails: EmailRepository,
        jobs: JobRepository,
    ) -> Self {
        Self {
            interactions,
            emails,
            jobs,
        }
    }

    /// Enqueue the synthetic interaction flagged on a just-sent email
    pub async fn schedule(&self, email: &WarmupEmail, sent_at: DateTime<Utc>) -> Result<()> {
        let Some(kind) = email.simulation_type.as_deref() else {
            warn!(email_id = %email.id, "Email flagged for simulation without a type");
            return Ok(());
        };

        let delay_hours = email.simulation_delay_hours.unwrap_or(1).max(1) as i64;
        let scheduled_at = sent_at + Duration::hours(delay_hours);

        self.interactions
            .enqueue(NewSimulatedInteraction {
                warmup_email_id: email.id,
                warmup_job_id: email.warmup_job_id,
                interaction_type: kind.to_string(),
                scheduled_at,
                expires_at: scheduled_at + Duration::hours(EXPIRY_MARGIN_HOURS),
            })
            .await?;

        debug!(
            email_id = %email.id,
            kind,
            %scheduled_at,
            "Scheduled simulated interaction"
        );

        Ok(())
    }

    /// Replay all due interactions.
    ///
    /// Records whose time has not arrived are untouched; a record that
    /// fails mid-apply is retried after its visibility timeout lapses.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepStats> {
        let mut stats = SweepStats::default();

        stats.expired = self.interactions.delete_expired(now).await?;
        if stats.expired > 0 {
            debug!("Dropped {} expired interaction records", stats.expired);
        }

        let claimed = self
            .interactions
            .claim_due(now, Duration::minutes(CLAIM_VISIBILITY_MINUTES), SWEEP_BATCH_SIZE)
            .await?;
        stats.claimed = claimed.len();

        for record in claimed {
            match self.apply(&record, now).await {
                Ok(()) => {
                    self.interactions.mark_done(record.id).await?;
                    stats.applied += 1;
                }
                Err(e) => {
                    warn!(
                        interaction_id = %record.id,
                        email_id = %record.warmup_email_id,
                        "Failed to apply simulated interaction: {}",
                        e
                    );
                }
            }
        }

        if stats.applied > 0 {
            info!(
                applied = stats.applied,
                claimed = stats.claimed,
                "Replayed simulated interactions"
            );
        }

        Ok(stats)
    }

    async fn apply(&self, record: &SimulatedInteraction, now: DateTime<Utc>) -> Result<()> {
        let kind = InteractionType::from_str(&record.interaction_type)
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;

        match kind {
            InteractionType::Open => {
                if self.emails.mark_opened(record.warmup_email_id).await? {
                    self.jobs.increment_opened(record.warmup_job_id).await?;
                }
            }
            InteractionType::Reply => {
                if self.emails.mark_replied(record.warmup_email_id).await? {
                    self.jobs.increment_replied(record.warmup_job_id).await?;
                }
            }
            InteractionType::Click => {
                self.emails
                    .insert_click(record.warmup_email_id, now)
                    .await?;
            }
        }

        Ok(())
    }
}
