//! Strategy Catalog - Static week-by-week warmup schedules
//!
//! Pure data. Each strategy maps to a fixed table of weekly targets,
//! recipient and content mixes, and success-criteria thresholds. Week 1
//! leans on low-risk recipients (internal, partner); prospects are phased
//! in as the plan matures.

use preheat_common::types::{ContentType, RecipientType, WarmupStrategy};
use preheat_storage::models::PlanSettings;

/// Recipient-type weights for one schedule week; weights sum to 1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecipientMix {
    pub internal: f64,
    pub partner: f64,
    pub existing_customer: f64,
    pub prospect: f64,
}

impl RecipientMix {
    pub fn weight(&self, recipient_type: RecipientType) -> f64 {
        match recipient_type {
            RecipientType::Internal => self.internal,
            RecipientType::Partner => self.partner,
            RecipientType::ExistingCustomer => self.existing_customer,
            RecipientType::Prospect => self.prospect,
        }
    }

    pub fn weights(&self) -> [(RecipientType, f64); 4] {
        [
            (RecipientType::Internal, self.internal),
            (RecipientType::Partner, self.partner),
            (RecipientType::ExistingCustomer, self.existing_customer),
            (RecipientType::Prospect, self.prospect),
        ]
    }

    pub fn total(&self) -> f64 {
        self.internal + self.partner + self.existing_customer + self.prospect
    }
}

/// Content-type weights for one schedule week; weights sum to 1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentMix {
    pub introduction: f64,
    pub follow_up: f64,
    pub newsletter: f64,
    pub promotional: f64,
}

impl ContentMix {
    pub fn weights(&self) -> [(ContentType, f64); 4] {
        [
            (ContentType::Introduction, self.introduction),
            (ContentType::FollowUp, self.follow_up),
            (ContentType::Newsletter, self.newsletter),
            (ContentType::Promotional, self.promotional),
        ]
    }

    pub fn total(&self) -> f64 {
        self.introduction + self.follow_up + self.newsletter + self.promotional
    }
}

/// Success criteria the scorer and monitor hold a week's sending against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeekCriteria {
    pub min_delivery_rate: f64,
    pub max_bounce_rate: f64,
    pub max_spam_rate: f64,
    pub target_open_rate: f64,
}

/// One week of a warmup schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeekSchedule {
    pub week: i32,
    pub daily_target: i32,
    pub recipient_mix: RecipientMix,
    pub content_mix: ContentMix,
    pub criteria: WeekCriteria,
}

const fn week(
    week: i32,
    daily_target: i32,
    recipient_mix: RecipientMix,
    content_mix: ContentMix,
    criteria: WeekCriteria,
) -> WeekSchedule {
    WeekSchedule {
        week,
        daily_target,
        recipient_mix,
        content_mix,
        criteria,
    }
}

const EARLY_CRITERIA: WeekCriteria = WeekCriteria {
    min_delivery_rate: 0.95,
    max_bounce_rate: 0.02,
    max_spam_rate: 0.002,
    target_open_rate: 0.30,
};

const MID_CRITERIA: WeekCriteria = WeekCriteria {
    min_delivery_rate: 0.92,
    max_bounce_rate: 0.03,
    max_spam_rate: 0.005,
    target_open_rate: 0.25,
};

const LATE_CRITERIA: WeekCriteria = WeekCriteria {
    min_delivery_rate: 0.90,
    max_bounce_rate: 0.05,
    max_spam_rate: 0.01,
    target_open_rate: 0.20,
};

const CONSERVATIVE: [WeekSchedule; 8] = [
    week(
        1,
        5,
        RecipientMix { internal: 0.6, partner: 0.3, existing_customer: 0.1, prospect: 0.0 },
        ContentMix { introduction: 0.7, follow_up: 0.3, newsletter: 0.0, promotional: 0.0 },
        EARLY_CRITERIA,
    ),
    week(
        2,
        10,
        RecipientMix { internal: 0.5, partner: 0.3, existing_customer: 0.2, prospect: 0.0 },
        ContentMix { introduction: 0.5, follow_up: 0.4, newsletter: 0.1, promotional: 0.0 },
        EARLY_CRITERIA,
    ),
    week(
        3,
        15,
        RecipientMix { internal: 0.4, partner: 0.3, existing_customer: 0.25, prospect: 0.05 },
        ContentMix { introduction: 0.4, follow_up: 0.4, newsletter: 0.2, promotional: 0.0 },
        MID_CRITERIA,
    ),
    week(
        4,
        20,
        RecipientMix { internal: 0.35, partner: 0.3, existing_customer: 0.25, prospect: 0.1 },
        ContentMix { introduction: 0.3, follow_up: 0.4, newsletter: 0.2, promotional: 0.1 },
        MID_CRITERIA,
    ),
    week(
        5,
        25,
        RecipientMix { internal: 0.3, partner: 0.25, existing_customer: 0.3, prospect: 0.15 },
        ContentMix { introduction: 0.25, follow_up: 0.4, newsletter: 0.25, promotional: 0.1 },
        MID_CRITERIA,
    ),
    week(
        6,
        30,
        RecipientMix { internal: 0.25, partner: 0.25, existing_customer: 0.3, prospect: 0.2 },
        ContentMix { introduction: 0.2, follow_up: 0.35, newsletter: 0.3, promotional: 0.15 },
        LATE_CRITERIA,
    ),
    week(
        7,
        40,
        RecipientMix { internal: 0.2, partner: 0.25, existing_customer: 0.3, prospect: 0.25 },
        ContentMix { introduction: 0.15, follow_up: 0.35, newsletter: 0.3, promotional: 0.2 },
        LATE_CRITERIA,
    ),
    week(
        8,
        50,
        RecipientMix { internal: 0.15, partner: 0.2, existing_customer: 0.35, prospect: 0.3 },
        ContentMix { introduction: 0.1, follow_up: 0.3, newsletter: 0.35, promotional: 0.25 },
        LATE_CRITERIA,
    ),
];

const MODERATE: [WeekSchedule; 6] = [
    week(
        1,
        10,
        RecipientMix { internal: 0.5, partner: 0.4, existing_customer: 0.1, prospect: 0.0 },
        ContentMix { introduction: 0.7, follow_up: 0.3, newsletter: 0.0, promotional: 0.0 },
        EARLY_CRITERIA,
    ),
    week(
        2,
        20,
        RecipientMix { internal: 0.4, partner: 0.4, existing_customer: 0.2, prospect: 0.0 },
        ContentMix { introduction: 0.5, follow_up: 0.4, newsletter: 0.1, promotional: 0.0 },
        EARLY_CRITERIA,
    ),
    week(
        3,
        35,
        RecipientMix { internal: 0.3, partner: 0.3, existing_customer: 0.3, prospect: 0.1 },
        ContentMix { introduction: 0.3, follow_up: 0.4, newsletter: 0.2, promotional: 0.1 },
        MID_CRITERIA,
    ),
    week(
        4,
        50,
        RecipientMix { internal: 0.2, partner: 0.3, existing_customer: 0.3, prospect: 0.2 },
        ContentMix { introduction: 0.2, follow_up: 0.4, newsletter: 0.3, promotional: 0.1 },
        MID_CRITERIA,
    ),
    week(
        5,
        65,
        RecipientMix { internal: 0.15, partner: 0.25, existing_customer: 0.3, prospect: 0.3 },
        ContentMix { introduction: 0.15, follow_up: 0.35, newsletter: 0.3, promotional: 0.2 },
        LATE_CRITERIA,
    ),
    week(
        6,
        80,
        RecipientMix { internal: 0.1, partner: 0.2, existing_customer: 0.3, prospect: 0.4 },
        ContentMix { introduction: 0.1, follow_up: 0.3, newsletter: 0.35, promotional: 0.25 },
        LATE_CRITERIA,
    ),
];

const AGGRESSIVE: [WeekSchedule; 4] = [
    week(
        1,
        20,
        RecipientMix { internal: 0.5, partner: 0.3, existing_customer: 0.2, prospect: 0.0 },
        ContentMix { introduction: 0.6, follow_up: 0.3, newsletter: 0.1, promotional: 0.0 },
        EARLY_CRITERIA,
    ),
    week(
        2,
        40,
        RecipientMix { internal: 0.35, partner: 0.3, existing_customer: 0.25, prospect: 0.1 },
        ContentMix { introduction: 0.4, follow_up: 0.4, newsletter: 0.2, promotional: 0.0 },
        MID_CRITERIA,
    ),
    week(
        3,
        70,
        RecipientMix { internal: 0.2, partner: 0.25, existing_customer: 0.3, prospect: 0.25 },
        ContentMix { introduction: 0.2, follow_up: 0.4, newsletter: 0.25, promotional: 0.15 },
        LATE_CRITERIA,
    ),
    week(
        4,
        100,
        RecipientMix { internal: 0.1, partner: 0.2, existing_customer: 0.3, prospect: 0.4 },
        ContentMix { introduction: 0.1, follow_up: 0.3, newsletter: 0.35, promotional: 0.25 },
        LATE_CRITERIA,
    ),
];

/// Full schedule for a strategy
pub fn schedule(strategy: WarmupStrategy) -> &'static [WeekSchedule] {
    match strategy {
        WarmupStrategy::Conservative => &CONSERVATIVE,
        WarmupStrategy::Moderate => &MODERATE,
        WarmupStrategy::Aggressive => &AGGRESSIVE,
    }
}

/// Number of weeks in a strategy's schedule
pub fn total_weeks(strategy: WarmupStrategy) -> i32 {
    schedule(strategy).len() as i32
}

/// Schedule entry for a 1-based week number
pub fn week_schedule(strategy: WarmupStrategy, week: i32) -> Option<&'static WeekSchedule> {
    if week < 1 {
        return None;
    }
    schedule(strategy).get((week - 1) as usize)
}

/// Default plan settings per strategy; risk tolerance widens with pace
pub fn default_settings(strategy: WarmupStrategy) -> PlanSettings {
    match strategy {
        WarmupStrategy::Conservative => PlanSettings {
            max_bounce_rate: 0.03,
            max_spam_rate: 0.005,
            target_open_rate: 0.25,
            target_reply_rate: 0.05,
            business_hours_only: true,
            auto_pause_enabled: true,
        },
        WarmupStrategy::Moderate => PlanSettings {
            max_bounce_rate: 0.05,
            max_spam_rate: 0.01,
            target_open_rate: 0.20,
            target_reply_rate: 0.05,
            business_hours_only: true,
            auto_pause_enabled: true,
        },
        WarmupStrategy::Aggressive => PlanSettings {
            max_bounce_rate: 0.07,
            max_spam_rate: 0.02,
            target_open_rate: 0.15,
            target_reply_rate: 0.03,
            business_hours_only: true,
            auto_pause_enabled: true,
        },
    }
}

/// Baseline likelihood that a recipient of this type engages at all
pub fn baseline_engagement(recipient_type: RecipientType) -> f64 {
    match recipient_type {
        RecipientType::Internal => 0.9,
        RecipientType::Partner => 0.7,
        RecipientType::ExistingCustomer => 0.5,
        RecipientType::Prospect => 0.25,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preheat_common::types::WarmupStrategy::*;

    const STRATEGIES: [preheat_common::types::WarmupStrategy; 3] =
        [Conservative, Moderate, Aggressive];

    #[test]
    fn test_targets_non_decreasing() {
        for strategy in STRATEGIES {
            let weeks = schedule(strategy);
            for pair in weeks.windows(2) {
                assert!(
                    pair[1].daily_target >= pair[0].daily_target,
                    "{} week {} target decreased",
                    strategy,
                    pair[1].week
                );
            }
        }
    }

    #[test]
    fn test_final_week_is_maximum() {
        for strategy in STRATEGIES {
            let weeks = schedule(strategy);
            let max = weeks.iter().map(|w| w.daily_target).max().unwrap();
            assert_eq!(weeks.last().unwrap().daily_target, max);
        }
    }

    #[test]
    fn test_week_numbers_are_sequential() {
        for strategy in STRATEGIES {
            for (i, entry) in schedule(strategy).iter().enumerate() {
                assert_eq!(entry.week, (i + 1) as i32);
            }
        }
    }

    #[test]
    fn test_mixes_sum_to_one() {
        for strategy in STRATEGIES {
            for entry in schedule(strategy) {
                assert!(
                    (entry.recipient_mix.total() - 1.0).abs() < 1e-9,
                    "{} week {} recipient mix sums to {}",
                    strategy,
                    entry.week,
                    entry.recipient_mix.total()
                );
                assert!(
                    (entry.content_mix.total() - 1.0).abs() < 1e-9,
                    "{} week {} content mix sums to {}",
                    strategy,
                    entry.week,
                    entry.content_mix.total()
                );
            }
        }
    }

    #[test]
    fn test_week_one_has_no_prospects() {
        for strategy in STRATEGIES {
            let first = &schedule(strategy)[0];
            assert_eq!(first.recipient_mix.prospect, 0.0);
        }
    }

    #[test]
    fn test_week_lookup() {
        assert_eq!(week_schedule(Moderate, 1).unwrap().daily_target, 10);
        assert_eq!(week_schedule(Moderate, 6).unwrap().daily_target, 80);
        assert!(week_schedule(Moderate, 0).is_none());
        assert!(week_schedule(Moderate, 7).is_none());
    }

    #[test]
    fn test_total_weeks() {
        assert_eq!(total_weeks(Conservative), 8);
        assert_eq!(total_weeks(Moderate), 6);
        assert_eq!(total_weeks(Aggressive), 4);
    }

    #[test]
    fn test_default_settings_validate() {
        for strategy in STRATEGIES {
            assert!(default_settings(strategy).validate().is_ok());
        }
    }

    #[test]
    fn test_criteria_relax_as_plan_matures() {
        for strategy in STRATEGIES {
            for pair in schedule(strategy).windows(2) {
                assert!(pair[1].criteria.min_delivery_rate <= pair[0].criteria.min_delivery_rate);
                assert!(pair[1].criteria.max_bounce_rate >= pair[0].criteria.max_bounce_rate);
                assert!(pair[1].criteria.max_spam_rate >= pair[0].criteria.max_spam_rate);
                assert!(pair[1].criteria.target_open_rate <= pair[0].criteria.target_open_rate);
            }
        }
    }
}
