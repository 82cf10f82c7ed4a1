//! Job Generator - turns an active plan and a calendar date into one
//! `WarmupJob` plus its emails
//!
//! Scheduling is idempotent per `(plan, date)`: the store's unique
//! constraint, not an in-memory lock, arbitrates concurrent invocations.

use super::templates;
use crate::strategy::{self, RecipientMix};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use preheat_common::config::{PoolEntry, RecipientPools, WarmupConfig};
use preheat_common::types::{ContentType, InteractionType, RecipientType, WarmupStrategy};
use preheat_storage::models::{NewWarmupEmail, NewWarmupJob, WarmupJob, WarmupPlan};
use preheat_storage::repository::{EmailRepository, JobRepository};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Job Generator
pub struct JobGenerator {
    jobs: JobRepository,
    emails: EmailRepository,
    pools: RecipientPools,
    business_hours_start: u32,
    business_hours_end: u32,
}

impl JobGenerator {
    /// Create a new job generator
    pub fn new(jobs: JobRepository, emails: EmailRepository, config: &WarmupConfig) -> Self {
        Self {
            jobs,
            emails,
            pools: config.pools.clone(),
            business_hours_start: config.business_hours_start,
            business_hours_end: config.business_hours_end,
        }
    }

    /// Generate the day's job and emails for an active plan.
    ///
    /// Returns `None` when a job already exists for `(plan, date)`.
    pub async fn generate_for_date(
        &self,
        plan: &WarmupPlan,
        date: NaiveDate,
    ) -> Result<Option<WarmupJob>> {
        let strategy = WarmupStrategy::from_str(&plan.strategy)
            .with_context(|| format!("plan {} has an unknown strategy", plan.id))?;

        let week = plan.current_week.max(1);
        let schedule = strategy::week_schedule(strategy, week)
            .or_else(|| strategy::schedule(strategy).last())
            .context("strategy schedule is empty")?;

        let job = match self
            .jobs
            .create(NewWarmupJob {
                warmup_plan_id: plan.id,
                scheduled_date: date,
                target_emails: plan.daily_target,
            })
            .await?
        {
            Some(job) => job,
            None => {
                debug!(plan_id = %plan.id, %date, "Job already scheduled for this date");
                return Ok(None);
            }
        };

        let mut rng = StdRng::from_entropy();
        let sender_name = plan
            .sender_name
            .clone()
            .unwrap_or_else(|| plan.sender_address.clone());

        // Build the day's email specs, grouped by recipient type first.
        let mut specs: Vec<(PoolEntry, RecipientType, ContentType)> = Vec::new();
        for (recipient_type, count) in split_counts(plan.daily_target, &schedule.recipient_mix) {
            if count == 0 {
                continue;
            }

            let pool = self.pool_for(recipient_type);
            if pool.is_empty() {
                warn!(
                    plan_id = %plan.id,
                    recipient_type = %recipient_type,
                    "No recipients configured; skipping {} sends",
                    count
                );
                continue;
            }

            for i in 0..count {
                let entry = pool[i as usize % pool.len()].clone();
                let content_type =
                    pick_content(&schedule.content_mix.weights(), week, recipient_type, &mut rng);
                specs.push((entry, recipient_type, content_type));
            }
        }

        // Shuffle so dispatch order doesn't cluster by recipient type, then
        // pin the specs onto evenly spread, jittered business-hours slots.
        specs.shuffle(&mut rng);
        let slots = spread_send_times(
            date,
            specs.len(),
            self.business_hours_start,
            self.business_hours_end,
            &mut rng,
        );

        let mut batch = Vec::with_capacity(specs.len());
        for ((entry, recipient_type, content_type), scheduled_at) in
            specs.into_iter().zip(slots)
        {
            let (subject, content) = templates::render(
                content_type,
                entry.name.as_deref(),
                &sender_name,
                &mut rng,
            );

            let simulation = decide_simulation(recipient_type, week, &mut rng);

            batch.push(NewWarmupEmail {
                warmup_job_id: job.id,
                recipient_email: entry.email,
                recipient_name: entry.name,
                recipient_type: recipient_type.to_string(),
                content_type: content_type.to_string(),
                subject,
                content,
                scheduled_at,
                interaction_simulated: simulation.is_some(),
                simulation_type: simulation.map(|(kind, _)| kind.to_string()),
                simulation_delay_hours: simulation.map(|(_, delay)| delay),
            });
        }

        let created = self.emails.create_batch(batch).await?;

        info!(
            plan_id = %plan.id,
            job_id = %job.id,
            %date,
            "Scheduled warmup job with {} emails (target {})",
            created,
            plan.daily_target
        );

        Ok(Some(job))
    }

    fn pool_for(&self, recipient_type: RecipientType) -> &[PoolEntry] {
        match recipient_type {
            RecipientType::Internal => &self.pools.internal,
            RecipientType::Partner => &self.pools.partner,
            RecipientType::ExistingCustomer => &self.pools.existing_customer,
            RecipientType::Prospect => &self.pools.prospect,
        }
    }
}

/// Split a daily target across recipient types by mix weight.
///
/// Floors each bucket, then hands the remainder out in descending
/// fractional order so the counts always sum to the target.
pub fn split_counts(target: i32, mix: &RecipientMix) -> Vec<(RecipientType, i32)> {
    let target = target.max(0);
    let weights = mix.weights();

    let mut counts: Vec<(RecipientType, i32)> = Vec::with_capacity(weights.len());
    let mut fractions: Vec<(usize, f64)> = Vec::with_capacity(weights.len());
    let mut assigned = 0;

    for (i, (recipient_type, weight)) in weights.iter().enumerate() {
        let exact = target as f64 * weight;
        let floor = exact.floor() as i32;
        counts.push((*recipient_type, floor));
        fractions.push((i, exact - floor as f64));
        assigned += floor;
    }

    fractions.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut remainder = target - assigned;
    for (i, _) in fractions {
        if remainder <= 0 {
            break;
        }
        counts[i].1 += 1;
        remainder -= 1;
    }

    counts
}

/// Spread `count` sends evenly across the business-hours window with
/// bounded random jitter, so the day's traffic is neither bursty nor
/// perfectly periodic.
pub fn spread_send_times<R: Rng + ?Sized>(
    date: NaiveDate,
    count: usize,
    start_hour: u32,
    end_hour: u32,
    rng: &mut R,
) -> Vec<DateTime<Utc>> {
    if count == 0 {
        return Vec::new();
    }

    let start_hour = start_hour.min(23);
    let window_start = Utc.from_utc_datetime(
        &date
            .and_hms_opt(start_hour, 0, 0)
            .expect("hour is clamped to 0-23"),
    );
    let window_secs = (end_hour.saturating_sub(start_hour) as i64).max(1) * 3600;
    let slot_secs = (window_secs / count as i64).max(1);
    let jitter_bound = (slot_secs * 2 / 5).max(1);

    let mut times: Vec<DateTime<Utc>> = (0..count as i64)
        .map(|i| {
            let base = i * slot_secs + slot_secs / 2;
            let jitter = rng.gen_range(-jitter_bound..=jitter_bound);
            let offset = (base + jitter).clamp(0, window_secs - 1);
            window_start + Duration::seconds(offset)
        })
        .collect();

    times.sort();
    times
}

/// Decide whether to simulate an interaction for one email.
///
/// Probability is the recipient type's baseline engagement, scaled up
/// during weeks 1-2 and down afterwards. Interaction kinds are weighted
/// 70/20/10 open/click/reply with a 1-8 hour delay.
pub fn decide_simulation<R: Rng + ?Sized>(
    recipient_type: RecipientType,
    week: i32,
    rng: &mut R,
) -> Option<(InteractionType, i32)> {
    let scale = if week <= 2 { 1.25 } else { 0.75 };
    let probability = (strategy::baseline_engagement(recipient_type) * scale).min(0.95);

    if rng.gen::<f64>() >= probability {
        return None;
    }

    let roll: f64 = rng.gen();
    let kind = if roll < 0.7 {
        InteractionType::Open
    } else if roll < 0.9 {
        InteractionType::Click
    } else {
        InteractionType::Reply
    };

    let delay_hours = rng.gen_range(1..=8);

    Some((kind, delay_hours))
}

/// Pick a content type from the week's mix, constrained to what is
/// appropriate for the recipient: cold prospects never receive
/// promotional content in the first two weeks.
fn pick_content<R: Rng + ?Sized>(
    weights: &[(ContentType, f64)],
    week: i32,
    recipient_type: RecipientType,
    rng: &mut R,
) -> ContentType {
    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen::<f64>() * total;

    let mut picked = ContentType::Introduction;
    for (content_type, weight) in weights {
        if roll < *weight {
            picked = *content_type;
            break;
        }
        roll -= weight;
    }

    if recipient_type == RecipientType::Prospect
        && week <= 2
        && matches!(picked, ContentType::Promotional | ContentType::Newsletter)
    {
        return ContentType::Introduction;
    }

    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn mix() -> RecipientMix {
        RecipientMix {
            internal: 0.5,
            partner: 0.4,
            existing_customer: 0.1,
            prospect: 0.0,
        }
    }

    #[test]
    fn test_split_counts_sums_to_target() {
        for target in [0, 1, 7, 10, 33, 100] {
            let counts = split_counts(target, &mix());
            let total: i32 = counts.iter().map(|(_, c)| c).sum();
            assert_eq!(total, target, "target {}", target);
        }
    }

    #[test]
    fn test_split_counts_respects_zero_weight() {
        let counts = split_counts(50, &mix());
        let prospects = counts
            .iter()
            .find(|(t, _)| *t == RecipientType::Prospect)
            .unwrap();
        assert_eq!(prospects.1, 0);
    }

    #[test]
    fn test_split_counts_weights_dominate() {
        let counts = split_counts(100, &mix());
        assert_eq!(counts[0], (RecipientType::Internal, 50));
        assert_eq!(counts[1], (RecipientType::Partner, 40));
        assert_eq!(counts[2], (RecipientType::ExistingCustomer, 10));
    }

    #[test]
    fn test_spread_times_stay_in_window() {
        let mut rng = StdRng::seed_from_u64(42);
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let times = spread_send_times(date, 25, 9, 17, &mut rng);

        assert_eq!(times.len(), 25);
        for time in &times {
            let hour = time.time();
            assert!(hour >= chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap());
            assert!(hour < chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap());
        }
    }

    #[test]
    fn test_spread_times_are_sorted_and_jittered() {
        let mut rng = StdRng::seed_from_u64(42);
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let times = spread_send_times(date, 10, 9, 17, &mut rng);

        for pair in times.windows(2) {
            assert!(pair[0] <= pair[1]);
        }

        // Jitter should keep the gaps uneven; a perfectly periodic
        // sequence defeats the point.
        let gaps: Vec<i64> = times
            .windows(2)
            .map(|p| (p[1] - p[0]).num_seconds())
            .collect();
        assert!(gaps.windows(2).any(|g| g[0] != g[1]), "gaps: {:?}", gaps);
    }

    #[test]
    fn test_spread_times_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert!(spread_send_times(date, 0, 9, 17, &mut rng).is_empty());
    }

    #[test]
    fn test_decide_simulation_delay_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            if let Some((_, delay)) = decide_simulation(RecipientType::Internal, 1, &mut rng) {
                assert!((1..=8).contains(&delay));
            }
        }
    }

    #[test]
    fn test_decide_simulation_early_weeks_engage_more() {
        let mut rng = StdRng::seed_from_u64(9);
        let early = (0..2000)
            .filter(|_| decide_simulation(RecipientType::Prospect, 1, &mut rng).is_some())
            .count();

        let mut rng = StdRng::seed_from_u64(9);
        let late = (0..2000)
            .filter(|_| decide_simulation(RecipientType::Prospect, 4, &mut rng).is_some())
            .count();

        assert!(early > late, "early {} vs late {}", early, late);
    }

    #[test]
    fn test_pick_content_shields_new_prospects() {
        let weights = [
            (ContentType::Introduction, 0.0),
            (ContentType::FollowUp, 0.0),
            (ContentType::Newsletter, 0.5),
            (ContentType::Promotional, 0.5),
        ];

        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let picked = pick_content(&weights, 1, RecipientType::Prospect, &mut rng);
            assert_eq!(picked, ContentType::Introduction);
        }

        // Established recipients draw from the mix as-is.
        let mut rng = StdRng::seed_from_u64(11);
        let picked = pick_content(&weights, 1, RecipientType::Internal, &mut rng);
        assert!(matches!(
            picked,
            ContentType::Newsletter | ContentType::Promotional
        ));
    }
}
