//! Plan Lifecycle Manager - Warmup plan state machine and week progression

use super::scoring;
use crate::notify::{Notification, NotificationKind, Notifier};
use crate::strategy;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use preheat_common::types::{AccountId, PlanId, UserId, WarmupStrategy};
use preheat_storage::models::{MetricsDelta, NewWarmupActivity, NewWarmupPlan, PlanSettings, WarmupPlan};
use preheat_storage::repository::{ActivityRepository, PlanRepository};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Plan manager errors
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Warmup plan not found")]
    NotFound,

    #[error("Plan is not in pending status")]
    NotPending,

    #[error("Plan is not active")]
    NotActive,

    #[error("Plan is not paused")]
    NotPaused,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Request to create a warmup plan
#[derive(Debug, Clone)]
pub struct CreatePlanRequest {
    pub account_id: AccountId,
    pub user_id: UserId,
    pub sender_address: String,
    pub sender_name: Option<String>,
    pub strategy: String,
    pub settings: Option<PlanSettings>,
}

/// Outcome of a week-progression check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progression {
    /// Nothing to do yet
    Hold,
    /// The plan moved to a later schedule week
    Advance { week: i32, daily_target: i32 },
    /// Elapsed time passed the final week; the plan is done
    Complete,
}

/// The week a plan should be in after `days_elapsed` days.
///
/// Purely time-based; cumulative volume is never a gate.
pub fn expected_week(days_elapsed: i64, total_weeks: i32) -> i32 {
    let week = (days_elapsed / 7 + 1) as i32;
    week.min(total_weeks)
}

/// Evaluate week progression for an active plan at `now`.
///
/// Idempotent: re-invoking with no elapsed-time change yields `Hold`.
pub fn evaluate_progression(
    current_week: i32,
    total_weeks: i32,
    strategy: WarmupStrategy,
    start_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Progression {
    let days_elapsed = (now - start_date).num_days();
    if days_elapsed < 0 {
        return Progression::Hold;
    }

    if days_elapsed >= total_weeks as i64 * 7 {
        return Progression::Complete;
    }

    let expected = expected_week(days_elapsed, total_weeks);
    if expected <= current_week {
        return Progression::Hold;
    }

    let daily_target = strategy::week_schedule(strategy, expected)
        .map(|w| w.daily_target)
        .unwrap_or(0);

    Progression::Advance {
        week: expected,
        daily_target,
    }
}

/// Plan Manager - owns the warmup plan state machine
pub struct PlanManager {
    plans: PlanRepository,
    activities: ActivityRepository,
    notifier: Arc<dyn Notifier>,
}

impl PlanManager {
    /// Create a new plan manager
    pub fn new(
        plans: PlanRepository,
        activities: ActivityRepository,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            plans,
            activities,
            notifier,
        }
    }

    /// Create a warmup plan in `pending` status.
    ///
    /// Validation failures reject the call before anything is persisted.
    pub async fn create_plan(&self, request: CreatePlanRequest) -> Result<WarmupPlan, PlanError> {
        let strategy = WarmupStrategy::from_str(&request.strategy)
            .map_err(|e| PlanError::Validation(e.to_string()))?;

        if preheat_common::types::email_domain(&request.sender_address).is_none() {
            return Err(PlanError::Validation(format!(
                "Invalid sender address: {}",
                request.sender_address
            )));
        }

        let settings = request
            .settings
            .unwrap_or_else(|| strategy::default_settings(strategy));
        settings
            .validate()
            .map_err(|e| PlanError::Validation(e.to_string()))?;

        let total_weeks = strategy::total_weeks(strategy);
        let daily_target = strategy::week_schedule(strategy, 1)
            .map(|w| w.daily_target)
            .unwrap_or(0);

        let now = Utc::now();
        let plan = self
            .plans
            .create(NewWarmupPlan {
                account_id: request.account_id,
                user_id: request.user_id,
                sender_address: request.sender_address,
                sender_name: request.sender_name,
                strategy: strategy.to_string(),
                total_weeks,
                daily_target,
                start_date: now,
                expected_completion_date: now + Duration::weeks(total_weeks as i64),
                settings,
            })
            .await?;

        info!(
            plan_id = %plan.id,
            strategy = %plan.strategy,
            "Warmup plan created for {}",
            plan.sender_address
        );

        Ok(plan)
    }

    /// Start a pending plan: week 1, start date re-stamped
    pub async fn start_plan(&self, id: PlanId) -> Result<WarmupPlan, PlanError> {
        let plan = self.plans.get(id).await?.ok_or(PlanError::NotFound)?;

        if plan.status != "pending" {
            return Err(PlanError::NotPending);
        }

        let strategy = WarmupStrategy::from_str(&plan.strategy)
            .map_err(|e| PlanError::Validation(e.to_string()))?;
        let daily_target = strategy::week_schedule(strategy, 1)
            .map(|w| w.daily_target)
            .unwrap_or(plan.daily_target);

        let now = Utc::now();
        let updated = self
            .plans
            .start(
                id,
                now,
                now + Duration::weeks(plan.total_weeks as i64),
                daily_target,
            )
            .await?
            .ok_or(PlanError::NotPending)?;

        info!(plan_id = %id, "Warmup plan started");

        self.notify(
            &updated,
            Notification::new(
                NotificationKind::Milestone,
                "Warmup started",
                format!(
                    "Warmup for {} started on the {} schedule",
                    updated.sender_address, updated.strategy
                ),
                serde_json::json!({ "plan_id": updated.id, "week": 1 }),
            ),
        )
        .await;

        Ok(updated)
    }

    /// Pause an active plan with a human-readable reason
    pub async fn pause_plan(&self, id: PlanId, reason: &str) -> Result<WarmupPlan, PlanError> {
        let plan = self.plans.get(id).await?.ok_or(PlanError::NotFound)?;

        if plan.status != "active" {
            return Err(PlanError::NotActive);
        }

        let updated = self
            .plans
            .pause(id, reason)
            .await?
            .ok_or(PlanError::NotActive)?;

        warn!(plan_id = %id, "Warmup plan paused: {}", reason);

        self.notify(
            &updated,
            Notification::new(
                NotificationKind::Paused,
                "Warmup paused",
                format!("Warmup for {} paused: {}", updated.sender_address, reason),
                serde_json::json!({ "plan_id": updated.id, "reason": reason }),
            ),
        )
        .await;

        Ok(updated)
    }

    /// Resume a paused plan
    pub async fn resume_plan(&self, id: PlanId) -> Result<WarmupPlan, PlanError> {
        let plan = self.plans.get(id).await?.ok_or(PlanError::NotFound)?;

        if plan.status != "paused" {
            return Err(PlanError::NotPaused);
        }

        let updated = self.plans.resume(id).await?.ok_or(PlanError::NotPaused)?;

        info!(plan_id = %id, "Warmup plan resumed");

        Ok(updated)
    }

    /// Complete an active plan
    pub async fn complete_plan(&self, id: PlanId) -> Result<WarmupPlan, PlanError> {
        let updated = self
            .plans
            .complete(id, Utc::now())
            .await?
            .ok_or(PlanError::NotActive)?;

        info!(plan_id = %id, "Warmup plan completed");

        self.notify(
            &updated,
            Notification::new(
                NotificationKind::Completion,
                "Warmup completed",
                format!(
                    "Warmup for {} completed after {} weeks",
                    updated.sender_address, updated.total_weeks
                ),
                serde_json::json!({ "plan_id": updated.id, "total_sent": updated.total_sent }),
            ),
        )
        .await;

        Ok(updated)
    }

    /// Fail a plan; terminal and not resumable
    pub async fn fail_plan(&self, id: PlanId, reason: &str) -> Result<WarmupPlan, PlanError> {
        let updated = self
            .plans
            .fail(id, reason)
            .await?
            .ok_or(PlanError::NotFound)?;

        warn!(plan_id = %id, "Warmup plan failed: {}", reason);

        self.notify(
            &updated,
            Notification::new(
                NotificationKind::Failed,
                "Warmup failed",
                format!("Warmup for {} failed: {}", updated.sender_address, reason),
                serde_json::json!({ "plan_id": updated.id, "reason": reason }),
            ),
        )
        .await;

        Ok(updated)
    }

    /// Run the time-based week-progression check for an active plan.
    ///
    /// Safe to invoke any number of times per day; the guarded store update
    /// ensures only the winning writer advances and notifies.
    pub async fn progress_week(
        &self,
        plan: &WarmupPlan,
        now: DateTime<Utc>,
    ) -> Result<Progression, PlanError> {
        if plan.status != "active" {
            return Ok(Progression::Hold);
        }

        let strategy = WarmupStrategy::from_str(&plan.strategy)
            .map_err(|e| PlanError::Validation(e.to_string()))?;

        let progression = evaluate_progression(
            plan.current_week,
            plan.total_weeks,
            strategy,
            plan.start_date,
            now,
        );

        match progression {
            Progression::Hold => Ok(Progression::Hold),
            Progression::Complete => {
                self.complete_plan(plan.id).await?;
                Ok(Progression::Complete)
            }
            Progression::Advance { week, daily_target } => {
                let advanced = self.plans.advance_week(plan.id, week, daily_target).await?;

                if !advanced {
                    // Another invocation won the race; nothing to announce.
                    debug!(plan_id = %plan.id, week, "Week advance already applied");
                    return Ok(Progression::Hold);
                }

                info!(
                    plan_id = %plan.id,
                    week,
                    daily_target,
                    "Warmup plan advanced to week {}",
                    week
                );

                self.notify(
                    plan,
                    Notification::new(
                        NotificationKind::Milestone,
                        "Warmup milestone",
                        format!(
                            "Warmup for {} reached week {} of {}; daily target is now {}",
                            plan.sender_address, week, plan.total_weeks, daily_target
                        ),
                        serde_json::json!({ "plan_id": plan.id, "week": week }),
                    ),
                )
                .await;

                Ok(Progression::Advance { week, daily_target })
            }
        }
    }

    /// Fold an execution run's counters into the plan's running metrics.
    ///
    /// Increments are atomic at the store; scores are recomputed from the
    /// returned totals, an activity row is appended, and the auto-pause
    /// circuit breaker is evaluated last.
    pub async fn apply_job_results(
        &self,
        plan_id: PlanId,
        delta: MetricsDelta,
        activity_date: NaiveDate,
    ) -> Result<WarmupPlan, PlanError> {
        let mut plan = self
            .plans
            .add_delivery_counters(plan_id, &delta)
            .await?
            .ok_or(PlanError::NotFound)?;

        let previous_health = plan.health_score;
        let rates = scoring::RateSnapshot::from_plan(&plan);
        let health = scoring::health_score(&rates, &plan.settings);
        let reputation = scoring::reputation_score(&rates);
        let trend = scoring::trend(previous_health, health);

        self.plans
            .update_scores(plan_id, health, reputation, trend.as_str())
            .await?;

        plan.health_score = health;
        plan.reputation_score = reputation;
        plan.trend = trend.to_string();

        self.activities
            .insert(NewWarmupActivity {
                warmup_plan_id: plan_id,
                activity_date,
                emails_sent: delta.sent as i32,
                emails_delivered: delta.delivered as i32,
                emails_opened: delta.opened as i32,
                emails_replied: delta.replied as i32,
                emails_bounced: delta.bounced as i32,
                spam_complaints: delta.complaints as i32,
                health_score: health,
            })
            .await?;

        if plan.settings.auto_pause_enabled {
            if let Some(reason) = scoring::auto_pause_reason(&rates, health, &plan.settings) {
                match self.pause_plan(plan_id, &reason).await {
                    Ok(paused) => return Ok(paused),
                    // Already paused or failed by another path; keep going.
                    Err(PlanError::NotActive) => {}
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(plan)
    }

    async fn notify(&self, plan: &WarmupPlan, notification: Notification) {
        self.notifier
            .notify(plan.user_id, plan.account_id, notification)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn at_day(days: i64) -> DateTime<Utc> {
        start() + Duration::days(days)
    }

    #[test]
    fn test_expected_week_table() {
        assert_eq!(expected_week(0, 4), 1);
        assert_eq!(expected_week(6, 4), 1);
        assert_eq!(expected_week(7, 4), 2);
        assert_eq!(expected_week(13, 4), 2);
        assert_eq!(expected_week(14, 4), 3);
        assert_eq!(expected_week(29, 4), 4);
    }

    #[test]
    fn test_progression_holds_within_week_one() {
        let p = evaluate_progression(1, 6, WarmupStrategy::Moderate, start(), at_day(6));
        assert_eq!(p, Progression::Hold);
    }

    #[test]
    fn test_progression_advances_after_a_week() {
        let p = evaluate_progression(1, 6, WarmupStrategy::Moderate, start(), at_day(8));
        assert_eq!(
            p,
            Progression::Advance {
                week: 2,
                daily_target: 20
            }
        );
    }

    #[test]
    fn test_progression_is_idempotent_same_day() {
        // After advancing to week 2, re-running on the same day holds.
        let p = evaluate_progression(2, 6, WarmupStrategy::Moderate, start(), at_day(8));
        assert_eq!(p, Progression::Hold);

        let again = evaluate_progression(2, 6, WarmupStrategy::Moderate, start(), at_day(8));
        assert_eq!(again, Progression::Hold);
    }

    #[test]
    fn test_progression_can_skip_weeks() {
        // A plan untouched for three weeks jumps straight to the expected week.
        let p = evaluate_progression(1, 6, WarmupStrategy::Moderate, start(), at_day(21));
        assert_eq!(
            p,
            Progression::Advance {
                week: 4,
                daily_target: 50
            }
        );
    }

    #[test]
    fn test_progression_completes_after_final_week() {
        let p = evaluate_progression(4, 4, WarmupStrategy::Aggressive, start(), at_day(28));
        assert_eq!(p, Progression::Complete);
    }

    #[test]
    fn test_progression_holds_on_clock_skew() {
        let p = evaluate_progression(1, 6, WarmupStrategy::Moderate, start(), at_day(-1));
        assert_eq!(p, Progression::Hold);
    }
}
