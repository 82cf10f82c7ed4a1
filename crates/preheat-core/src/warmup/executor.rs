//! Job Executor - drives a `WarmupJob` from pending to a terminal state

use super::generator::spread_send_times;
use super::plans::PlanManager;
use super::simulator::InteractionSimulator;
use crate::delivery::{is_hard_bounce, MessageTransport, QuotaChecker, SendRequest};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use preheat_common::config::WarmupConfig;
use preheat_storage::models::{JobLogEntry, MetricsDelta, WarmupEmail, WarmupJob, WarmupPlan};
use preheat_storage::repository::{EmailRepository, JobCounters, JobRepository, PlanRepository};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{debug, error, info, warn};

enum RunOutcome {
    Completed { counters: JobCounters, failed: i32 },
    /// Quota was unavailable; emails moved to the next day and the job
    /// returned to pending for a later retry.
    Deferred { rescheduled: u64 },
    NothingToSend,
}

/// Job Executor
pub struct JobExecutor {
    plans: PlanRepository,
    jobs: JobRepository,
    emails: EmailRepository,
    manager: Arc<PlanManager>,
    simulator: Arc<InteractionSimulator>,
    transport: Arc<dyn MessageTransport>,
    quota: Arc<dyn QuotaChecker>,
    send_delay_min_secs: u64,
    send_delay_max_secs: u64,
    send_timeout_secs: u64,
    business_hours_start: u32,
    business_hours_end: u32,
}

impl JobExecutor {
    /// Create a new job executor
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        plans: PlanRepository,
        jobs: JobRepository,
        emails: EmailRepository,
        manager: Arc<PlanManager>,
        simulator: Arc<InteractionSimulator>,
        transport: Arc<dyn MessageTransport>,
        quota: Arc<dyn QuotaChecker>,
        config: &WarmupConfig,
    ) -> Self {
        Self {
            plans,
            jobs,
            emails,
            manager,
            simulator,
            transport,
            quota,
            send_delay_min_secs: config.send_delay_min_secs,
            send_delay_max_secs: config.send_delay_max_secs,
            send_timeout_secs: config.send_timeout_secs,
            business_hours_start: config.business_hours_start,
            business_hours_end: config.business_hours_end,
        }
    }

    /// Execute one warmup job.
    ///
    /// The claim is conditional at the store, so concurrent executors
    /// cannot both run the same job. A single email failure never aborts
    /// the run; an error in the outer flow marks the job failed.
    pub async fn execute(&self, job: &WarmupJob) -> Result<()> {
        let now = Utc::now();

        if !self.jobs.mark_running(job.id, now).await? {
            debug!(job_id = %job.id, "Job already claimed by another executor");
            return Ok(());
        }

        self.log(job, JobLogEntry::info(now, "Execution started")).await;

        match self.run(job).await {
            Ok(RunOutcome::Completed { counters, failed }) => {
                let summary = format!(
                    "Sent {} of {} emails ({} failed, {} bounced)",
                    counters.sent,
                    counters.sent + failed,
                    failed,
                    counters.bounced
                );
                self.log(job, JobLogEntry::info(Utc::now(), summary)).await;
                Ok(())
            }
            Ok(RunOutcome::Deferred { rescheduled }) => {
                info!(
                    job_id = %job.id,
                    rescheduled,
                    "Job deferred; sending quota unavailable"
                );
                Ok(())
            }
            Ok(RunOutcome::NothingToSend) => Ok(()),
            Err(e) => {
                let message = format!("{:#}", e);
                error!(job_id = %job.id, "Job execution failed: {}", message);

                if let Err(mark_err) = self.jobs.fail(job.id, &message, Utc::now()).await {
                    error!(job_id = %job.id, "Failed to mark job as failed: {}", mark_err);
                }
                self.log(job, JobLogEntry::error(Utc::now(), message)).await;
                Err(e)
            }
        }
    }

    async fn run(&self, job: &WarmupJob) -> Result<RunOutcome> {
        let plan = self
            .plans
            .get(job.warmup_plan_id)
            .await?
            .ok_or_else(|| anyhow!("warmup plan {} not found", job.warmup_plan_id))?;

        let pending = self.emails.list_pending_by_job(job.id).await?;

        if pending.is_empty() {
            self.jobs
                .complete(job.id, JobCounters::default(), Utc::now())
                .await?;
            self.log(job, JobLogEntry::info(Utc::now(), "No emails to send"))
                .await;
            return Ok(RunOutcome::NothingToSend);
        }

        let quota = self
            .quota
            .check(plan.account_id, plan.sender_domain())
            .await
            .context("quota check failed")?;

        if !quota.is_available {
            return self.defer(job, pending).await;
        }

        let mut counters = JobCounters::default();
        let mut failed = 0i32;
        let total = pending.len();

        for (i, email) in pending.iter().enumerate() {
            self.dispatch(&plan, job, email, &mut counters, &mut failed)
                .await;

            // Politeness pacing between dispatches, not after the last one.
            if i + 1 < total {
                self.pace().await;
            }
        }

        let delta = MetricsDelta {
            sent: counters.sent as i64,
            delivered: counters.delivered as i64,
            opened: 0,
            replied: 0,
            bounced: counters.bounced as i64,
            complaints: 0,
        };

        self.manager
            .apply_job_results(plan.id, delta, job.scheduled_date)
            .await
            .context("failed to update plan metrics")?;

        self.jobs.complete(job.id, counters, Utc::now()).await?;

        info!(
            job_id = %job.id,
            plan_id = %plan.id,
            sent = counters.sent,
            bounced = counters.bounced,
            failed,
            "Warmup job completed"
        );

        Ok(RunOutcome::Completed { counters, failed })
    }

    /// Dispatch a single email and record its outcome. Never fails the run.
    async fn dispatch(
        &self,
        plan: &WarmupPlan,
        job: &WarmupJob,
        email: &WarmupEmail,
        counters: &mut JobCounters,
        failed: &mut i32,
    ) {
        let request = SendRequest {
            from: plan.sender_address.clone(),
            from_name: plan.sender_name.clone(),
            to: email.recipient_email.clone(),
            to_name: email.recipient_name.clone(),
            subject: email.subject.clone(),
            content: email.content.clone(),
            tracking_enabled: true,
            warmup_mode: true,
        };

        let outcome = match tokio::time::timeout(
            StdDuration::from_secs(self.send_timeout_secs),
            self.transport.send(&request),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                self.record_failure(job, email, "Send timed out", failed).await;
                return;
            }
        };

        let now = Utc::now();

        if outcome.success {
            match self.emails.mark_delivered(email.id, now).await {
                Ok(true) => {
                    counters.sent += 1;
                    counters.delivered += 1;
                }
                Ok(false) => {
                    warn!(email_id = %email.id, "Email was no longer pending at delivery");
                }
                Err(e) => {
                    error!(email_id = %email.id, "Failed to record delivery: {}", e);
                }
            }

            if email.interaction_simulated {
                if let Err(e) = self.simulator.schedule(email, now).await {
                    warn!(email_id = %email.id, "Failed to schedule interaction: {}", e);
                }
            }
            return;
        }

        let error = outcome
            .error
            .unwrap_or_else(|| "unknown transport error".to_string());

        if is_hard_bounce(&error) {
            match self.emails.mark_bounced(email.id, now, &error).await {
                Ok(true) => {
                    // A bounce still left the gate; it counts against sent.
                    counters.sent += 1;
                    counters.bounced += 1;
                }
                Ok(false) => {}
                Err(e) => error!(email_id = %email.id, "Failed to record bounce: {}", e),
            }
            self.log(
                job,
                JobLogEntry::warning(now, format!("{} bounced: {}", email.recipient_email, error)),
            )
            .await;
        } else {
            self.record_failure(job, email, &error, failed).await;
        }
    }

    async fn record_failure(&self, job: &WarmupJob, email: &WarmupEmail, error: &str, failed: &mut i32) {
        if let Err(e) = self.emails.mark_failed(email.id, error).await {
            error!(email_id = %email.id, "Failed to record send failure: {}", e);
        }
        *failed += 1;
        self.log(
            job,
            JobLogEntry::error(
                Utc::now(),
                format!("Send to {} failed: {}", email.recipient_email, error),
            ),
        )
        .await;
    }

    /// Quota was unavailable: push every pending email to a randomized
    /// business-hours slot tomorrow and put the job back for a later retry.
    /// The email count is preserved; nothing is lost or duplicated.
    async fn defer(&self, job: &WarmupJob, pending: Vec<WarmupEmail>) -> Result<RunOutcome> {
        self.log(
            job,
            JobLogEntry::warning(
                Utc::now(),
                format!(
                    "Sending quota unavailable; rescheduling {} emails to tomorrow",
                    pending.len()
                ),
            ),
        )
        .await;

        let mut rng = StdRng::from_entropy();
        let tomorrow = job.scheduled_date + Duration::days(1);
        let slots = spread_send_times(
            tomorrow,
            pending.len(),
            self.business_hours_start,
            self.business_hours_end,
            &mut rng,
        );

        let assignments: Vec<(uuid::Uuid, DateTime<Utc>)> = pending
            .iter()
            .zip(slots)
            .map(|(email, slot)| (email.id, slot))
            .collect();

        let rescheduled = self.emails.reschedule_batch(&assignments).await?;
        self.jobs.revert_to_pending(job.id).await?;

        Ok(RunOutcome::Deferred { rescheduled })
    }

    async fn pace(&self) {
        let (min, max) = (
            self.send_delay_min_secs.min(self.send_delay_max_secs),
            self.send_delay_max_secs.max(self.send_delay_min_secs),
        );
        if max == 0 {
            return;
        }

        let millis = {
            let mut rng = StdRng::from_entropy();
            rng.gen_range(min * 1000..=max * 1000)
        };
        tokio::time::sleep(StdDuration::from_millis(millis)).await;
    }

    /// Best-effort log append; its own failure never escalates.
    async fn log(&self, job: &WarmupJob, entry: JobLogEntry) {
        if let Err(e) = self.jobs.append_log(job.id, &entry).await {
            warn!(job_id = %job.id, "Failed to append job log entry: {}", e);
        }
    }
}
