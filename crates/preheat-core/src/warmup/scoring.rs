//! Health & Reputation Scorer - pure functions over accumulated metrics

use preheat_common::types::HealthTrend;
use preheat_storage::models::{PlanSettings, WarmupPlan};

/// Delivery-quality rates derived from a plan's running totals.
///
/// Every rate is 0 when its denominator is 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSnapshot {
    pub delivery_rate: f64,
    pub open_rate: f64,
    pub reply_rate: f64,
    pub bounce_rate: f64,
    pub spam_rate: f64,
}

fn ratio(numerator: i64, denominator: i64) -> f64 {
    if denominator <= 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl RateSnapshot {
    /// Derive rates from raw counters
    pub fn from_totals(
        sent: i64,
        delivered: i64,
        opened: i64,
        replied: i64,
        bounced: i64,
        complaints: i64,
    ) -> Self {
        Self {
            delivery_rate: ratio(delivered, sent),
            open_rate: ratio(opened, delivered),
            reply_rate: ratio(replied, delivered),
            bounce_rate: ratio(bounced, sent),
            spam_rate: ratio(complaints, sent),
        }
    }

    /// Derive rates from a plan row's counters
    pub fn from_plan(plan: &WarmupPlan) -> Self {
        Self::from_totals(
            plan.total_sent,
            plan.total_delivered,
            plan.total_opened,
            plan.total_replied,
            plan.total_bounced,
            plan.total_complaints,
        )
    }
}

/// Compute the 0-100 health score.
///
/// Starts at 100; penalized proportionally for weak delivery, bounces over
/// the plan maximum, and (heavily) spam complaints over the maximum;
/// rewarded when open/reply rates beat their targets.
pub fn health_score(rates: &RateSnapshot, settings: &PlanSettings) -> f64 {
    let mut score = 100.0;

    if rates.delivery_rate < 0.9 {
        score -= (0.9 - rates.delivery_rate) * 200.0;
    }

    if rates.bounce_rate > settings.max_bounce_rate {
        score -= (rates.bounce_rate - settings.max_bounce_rate) * 500.0;
    }

    if rates.spam_rate > settings.max_spam_rate {
        score -= (rates.spam_rate - settings.max_spam_rate) * 2500.0;
    }

    if rates.open_rate > settings.target_open_rate {
        score += (rates.open_rate - settings.target_open_rate) * 50.0;
    }

    if rates.reply_rate > settings.target_reply_rate {
        score += (rates.reply_rate - settings.target_reply_rate) * 100.0;
    }

    score.clamp(0.0, 100.0)
}

/// Compute the 0-100 reputation score: a weighted blend of the same rates
/// from a neutral baseline of 50
pub fn reputation_score(rates: &RateSnapshot) -> f64 {
    let score = 50.0 + rates.delivery_rate * 25.0 + rates.open_rate * 20.0
        + rates.reply_rate * 15.0
        - rates.bounce_rate * 150.0
        - rates.spam_rate * 500.0;

    score.clamp(0.0, 100.0)
}

/// Classify the movement between two consecutive health scores
pub fn trend(previous: f64, current: f64) -> HealthTrend {
    if current - previous > 2.0 {
        HealthTrend::Improving
    } else if previous - current > 2.0 {
        HealthTrend::Declining
    } else {
        HealthTrend::Stable
    }
}

/// Circuit-breaker check run after every metrics update.
///
/// Harder multipliers than the per-week criteria: this stops the whole
/// plan, and the resulting pause requires an explicit external resume.
pub fn auto_pause_reason(
    rates: &RateSnapshot,
    health: f64,
    settings: &PlanSettings,
) -> Option<String> {
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

    if health < 30.0 {
        return Some(format!("Health score dropped to {:.0}", health));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> PlanSettings {
        PlanSettings::default()
    }

    #[test]
    fn test_rates_zero_when_nothing_sent() {
        let rates = RateSnapshot::from_totals(0, 0, 0, 0, 0, 0);
        assert_eq!(rates.delivery_rate, 0.0);
        assert_eq!(rates.bounce_rate, 0.0);
        assert_eq!(rates.spam_rate, 0.0);
    }

    #[test]
    fn test_healthy_sending_scores_high() {
        let rates = RateSnapshot::from_totals(100, 98, 40, 8, 1, 0);
        let health = health_score(&rates, &settings());
        assert!(health > 90.0, "health was {}", health);
        assert!((0.0..=100.0).contains(&health));
    }

    #[test]
    fn test_health_score_bounded_under_extreme_input() {
        // Everything bounced.
        let rates = RateSnapshot::from_totals(100, 0, 0, 0, 100, 50);
        let health = health_score(&rates, &settings());
        assert_eq!(health, 0.0);

        // Everything engaged.
        let rates = RateSnapshot::from_totals(100, 100, 100, 100, 0, 0);
        let health = health_score(&rates, &settings());
        assert_eq!(health, 100.0);
    }

    #[test]
    fn test_reputation_score_bounded() {
        let bad = RateSnapshot::from_totals(100, 10, 0, 0, 90, 20);
        assert_eq!(reputation_score(&bad), 0.0);

        let good = RateSnapshot::from_totals(100, 100, 80, 30, 0, 0);
        let score = reputation_score(&good);
        assert!((0.0..=100.0).contains(&score));
        assert!(score > 50.0);
    }

    #[test]
    fn test_trend_thresholds() {
        assert_eq!(trend(80.0, 83.0), HealthTrend::Improving);
        assert_eq!(trend(80.0, 77.0), HealthTrend::Declining);
        assert_eq!(trend(80.0, 81.5), HealthTrend::Stable);
        assert_eq!(trend(80.0, 78.5), HealthTrend::Stable);
        assert_eq!(trend(80.0, 80.0), HealthTrend::Stable);
    }

    #[test]
    fn test_auto_pause_on_bounce_breach() {
        // max_bounce_rate = 0.05; observed 0.08 > 1.5x.
        let rates = RateSnapshot::from_totals(100, 90, 0, 0, 8, 0);
        let reason = auto_pause_reason(&rates, 80.0, &settings()).unwrap();
        assert!(reason.contains("Bounce rate"), "reason: {}", reason);
    }

    #[test]
    fn test_auto_pause_tolerates_mild_bounce_overrun() {
        // 0.06 exceeds the 0.05 maximum but not the 1.5x breaker.
        let rates = RateSnapshot::from_totals(100, 92, 30, 5, 6, 0);
        assert!(auto_pause_reason(&rates, 80.0, &settings()).is_none());
    }

    #[test]
    fn test_auto_pause_on_spam_breach() {
        // max_spam_rate = 0.01; observed 0.03 > 2x.
        let rates = RateSnapshot::from_totals(100, 95, 30, 5, 0, 3);
        let reason = auto_pause_reason(&rates, 80.0, &settings()).unwrap();
        assert!(reason.contains("Spam complaint rate"), "reason: {}", reason);
    }

    #[test]
    fn test_auto_pause_on_low_health() {
        let rates = RateSnapshot::from_totals(100, 95, 30, 5, 0, 0);
        let reason = auto_pause_reason(&rates, 25.0, &settings()).unwrap();
        assert!(reason.contains("Health score"), "reason: {}", reason);
    }
}
