//! Health Monitor - stuck-job detection and chronic degradation sweeps

use super::plans::{PlanError, PlanManager};
use super::scoring::RateSnapshot;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use preheat_common::types::PlanId;
use preheat_storage::models::WarmupPlan;
use preheat_storage::repository::{JobRepository, PlanRepository};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Trailing window for the repeated-failure check
const FAILURE_WINDOW_DAYS: i64 = 3;

/// Failures within the window that pause a plan
const FAILURE_THRESHOLD: i64 = 3;

/// What a monitor pass found and did
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitorReport {
    pub timed_out: usize,
    pub failed_to_start: usize,
    pub plans_paused: usize,
}

/// Health Monitor
pub struct HealthMonitor {
    plans: PlanRepository,
    jobs: JobRepository,
    manager: Arc<PlanManager>,
    stale_after: Duration,
}

impl HealthMonitor {
    /// Create a new health monitor
    pub fn new(
        plans: PlanRepository,
        jobs: JobRepository,
        manager: Arc<PlanManager>,
        stale_job_hours: i64,
    ) -> Self {
        Self {
            plans,
            jobs,
            manager,
            stale_after: Duration::hours(stale_job_hours),
        }
    }

    /// Run one monitor pass: fail stuck jobs, pause chronically failing or
    /// degraded plans.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<MonitorReport> {
        let mut report = MonitorReport::default();
        let mut affected_plans: HashSet<PlanId> = HashSet::new();

        // Running jobs that never finished within the staleness window.
        for job in self.jobs.list_stalled(now - self.stale_after).await? {
            warn!(
                job_id = %job.id,
                plan_id = %job.warmup_plan_id,
                started_at = ?job.started_at,
                "Failing stuck warmup job (timeout)"
            );
            self.jobs
                .fail(job.id, "Job execution timed out", now)
                .await?;
            report.timed_out += 1;
            affected_plans.insert(job.warmup_plan_id);
        }

        // Jobs from past dates that never started at all.
        for job in self.jobs.list_unstarted(now.date_naive()).await? {
            warn!(
                job_id = %job.id,
                plan_id = %job.warmup_plan_id,
                scheduled_date = %job.scheduled_date,
                "Failing warmup job that never started"
            );
            self.jobs.fail(job.id, "Job failed to start", now).await?;
            report.failed_to_start += 1;
            affected_plans.insert(job.warmup_plan_id);
        }

        // Repeated failures pause the plan regardless of metric thresholds.
        let since = now.date_naive() - Duration::days(FAILURE_WINDOW_DAYS);
        for plan_id in affected_plans {
            let failures = self.jobs.count_recent_failures(plan_id, since).await?;
            if failures >= FAILURE_THRESHOLD {
                if self
                    .pause(plan_id, "Multiple job failures detected")
                    .await?
                {
                    report.plans_paused += 1;
                }
            }
        }

        // Re-evaluate every active plan's latest metrics against the
        // monitor's stricter multipliers, even without a fresh execution.
        for plan in self.plans.list_active().await? {
            if let Some(reason) = degradation_reason(&plan) {
                if self.pause(plan.id, &reason).await? {
                    report.plans_paused += 1;
                }
            }
        }

        if report.timed_out + report.failed_to_start + report.plans_paused > 0 {
            info!(
                timed_out = report.timed_out,
                failed_to_start = report.failed_to_start,
                plans_paused = report.plans_paused,
                "Health monitor pass finished"
            );
        }

        Ok(report)
    }

    async fn pause(&self, plan_id: PlanId, reason: &str) -> Result<bool> {
        match self.manager.pause_plan(plan_id, reason).await {
            Ok(_) => Ok(true),
            // Already paused/failed elsewhere, or gone; nothing to do.
            Err(PlanError::NotActive) | Err(PlanError::NotFound) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Monitor-side degradation check, stricter than the per-job criteria:
/// 1.5x bounce, 2x spam, or delivery collapsing below 0.7.
pub fn degradation_reason(plan: &WarmupPlan) -> Option<String> {
    if plan.total_sent == 0 {
        return None;
    }

    let rates = RateSnapshot::from_plan(plan);
    let settings = &plan.settings;

    if rates.bounce_rate > settings.max_bounce_rate * 1.5 {
        return Some(format!(
            "Bounce rate {:.1}% exceeded 1.5x the configured maximum of {:.1}%",
            rates.bounce_rate * 100.0,
            settings.max_bounce_rate * 100.0
        ));
    }

    if rates.spam_rate > settings.max_spam_rate * 2.0 {
        return Some(format!(
            "Spam complaint rate {:.2}% exceeded 2x the configured maximum of {:.2}%",
            rates.spam_rate * 100.0,
            settings.max_spam_rate * 100.0
        ));
    }

    if rates.delivery_rate < 0.7 {
        return Some(format!(
            "Delivery rate collapsed to {:.1}%",
            rates.delivery_rate * 100.0
        ));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use preheat_storage::models::PlanSettings;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn plan_with_totals(sent: i64, delivered: i64, bounced: i64, complaints: i64) -> WarmupPlan {
        let now = Utc::now();
        WarmupPlan {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            sender_address: "sales@example.com".to_string(),
            sender_name: None,
            strategy: "moderate".to_string(),
            status: "active".to_string(),
            current_week: 2,
            total_weeks: 6,
            daily_target: 20,
            actual_sent_today: 0,
            total_sent: sent,
            total_delivered: delivered,
            total_opened: 0,
            total_replied: 0,
            total_bounced: bounced,
            total_complaints: complaints,
            health_score: 80.0,
            reputation_score: 60.0,
            trend: "stable".to_string(),
            start_date: now,
            expected_completion_date: now,
            actual_completion_date: None,
            pause_reason: None,
            failure_reason: None,
            settings: Json(PlanSettings::default()),
            metrics_updated_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_no_degradation_before_first_send() {
        let plan = plan_with_totals(0, 0, 0, 0);
        assert!(degradation_reason(&plan).is_none());
    }

    #[test]
    fn test_degradation_on_bounce_breach() {
        // 0.08 bounce rate against a 0.05 maximum crosses 1.5x.
        let plan = plan_with_totals(100, 90, 8, 0);
        let reason = degradation_reason(&plan).unwrap();
        assert!(reason.contains("Bounce rate"));
    }

    #[test]
    fn test_degradation_on_delivery_collapse() {
        let plan = plan_with_totals(100, 60, 2, 0);
        let reason = degradation_reason(&plan).unwrap();
        assert!(reason.contains("Delivery rate"));
    }

    #[test]
    fn test_healthy_plan_passes() {
        let plan = plan_with_totals(100, 96, 2, 0);
        assert!(degradation_reason(&plan).is_none());
    }
}
