//! Warmup Service - dependency-injected facade over the four entry points
//!
//! Explicitly constructed by the process entry point; no lazily
//! initialized singletons. All cross-instance coordination happens at the
//! store, so several stateless instances may run the same entry points
//! concurrently.

use super::executor::JobExecutor;
use super::generator::JobGenerator;
use super::monitor::{HealthMonitor, MonitorReport};
use super::plans::{PlanManager, Progression};
use super::simulator::{InteractionSimulator, SweepStats};
use crate::delivery::{MessageTransport, QuotaChecker};
use crate::notify::Notifier;
use anyhow::Result;
use chrono::{DateTime, Utc};
use preheat_common::config::WarmupConfig;
use preheat_storage::db::DatabasePool;
use preheat_storage::repository::{
    ActivityRepository, EmailRepository, InteractionRepository, JobRepository, PlanRepository,
};
use std::sync::Arc;
use tracing::{error, info};

/// Warmup Service
pub struct WarmupService {
    manager: Arc<PlanManager>,
    generator: JobGenerator,
    executor: JobExecutor,
    simulator: Arc<InteractionSimulator>,
    monitor: HealthMonitor,
    plans: PlanRepository,
    jobs: JobRepository,
}

impl WarmupService {
    /// Wire up the warmup service against a database pool and the
    /// externally owned transport, quota, and notification contracts.
    pub fn new(
        db_pool: &DatabasePool,
        transport: Arc<dyn MessageTransport>,
        quota: Arc<dyn QuotaChecker>,
        notifier: Arc<dyn Notifier>,
        config: &WarmupConfig,
    ) -> Self {
        let pool = db_pool.pool().clone();

        let plans = PlanRepository::new(pool.clone());
        let jobs = JobRepository::new(pool.clone());
        let emails = EmailRepository::new(pool.clone());
        let activities = ActivityRepository::new(pool.clone());
        let interactions = InteractionRepository::new(pool);

        let manager = Arc::new(PlanManager::new(plans.clone(), activities, notifier));
        let simulator = Arc::new(InteractionSimulator::new(
            interactions,
            emails.clone(),
            jobs.clone(),
        ));

        let generator = JobGenerator::new(jobs.clone(), emails.clone(), config);
        let executor = JobExecutor::new(
            plans.clone(),
            jobs.clone(),
            emails,
            manager.clone(),
            simulator.clone(),
            transport,
            quota,
            config,
        );
        let monitor = HealthMonitor::new(
            plans.clone(),
            jobs.clone(),
            manager.clone(),
            config.stale_job_hours,
        );

        Self {
            manager,
            generator,
            executor,
            simulator,
            monitor,
            plans,
            jobs,
        }
    }

    /// Plan lifecycle API for external callers (create/start/pause/resume)
    pub fn manager(&self) -> Arc<PlanManager> {
        self.manager.clone()
    }

    /// Entry point (a): run week progression and create today's job for
    /// every active plan. Idempotent per `(plan, date)`.
    pub async fn schedule_daily_jobs(&self, now: DateTime<Utc>) -> Result<()> {
        let today = now.date_naive();
        let plans = self.plans.list_active().await?;

        info!(count = plans.len(), %today, "Scheduling daily warmup jobs");

        for mut plan in plans {
            match self.manager.progress_week(&plan, now).await {
                Ok(Progression::Complete) => continue,
                Ok(Progression::Advance { week, daily_target }) => {
                    plan.current_week = week;
                    plan.daily_target = daily_target;
                    plan.actual_sent_today = 0;
                }
                Ok(Progression::Hold) => {}
                Err(e) => {
                    error!(plan_id = %plan.id, "Week progression failed: {}", e);
                    continue;
                }
            }

            match self.generator.generate_for_date(&plan, today).await {
                Ok(Some(_)) => {
                    // A fresh day started for this plan.
                    if let Err(e) = self.plans.reset_daily_sent(plan.id).await {
                        error!(plan_id = %plan.id, "Failed to reset daily counter: {}", e);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    error!(plan_id = %plan.id, "Job generation failed: {}", e);
                }
            }
        }

        Ok(())
    }

    /// Entry point (b): execute every due job
    pub async fn execute_due_jobs(&self, now: DateTime<Utc>) -> Result<()> {
        let jobs = self.jobs.list_executable(now.date_naive()).await?;

        for job in jobs {
            if let Err(e) = self.executor.execute(&job).await {
                error!(job_id = %job.id, "Job execution error: {}", e);
            }
        }

        Ok(())
    }

    /// Entry point (c): replay due simulated interactions
    pub async fn sweep_interactions(&self, now: DateTime<Utc>) -> Result<SweepStats> {
        self.simulator.sweep(now).await
    }

    /// Entry point (d): detect stuck jobs and degraded plans
    pub async fn run_health_checks(&self, now: DateTime<Utc>) -> Result<MonitorReport> {
        self.monitor.run(now).await
    }
}
