//! Common types for Preheat

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for warmup plans
pub type PlanId = Uuid;

/// Unique identifier for warmup jobs
pub type JobId = Uuid;

/// Unique identifier for warmup emails
pub type EmailId = Uuid;

/// Unique identifier for sending accounts
pub type AccountId = Uuid;

/// Unique identifier for users
pub type UserId = Uuid;

/// Named ramp-up profile for a warmup plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarmupStrategy {
    Conservative,
    Moderate,
    Aggressive,
}

impl WarmupStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarmupStrategy::Conservative => "conservative",
            WarmupStrategy::Moderate => "moderate",
            WarmupStrategy::Aggressive => "aggressive",
        }
    }
}

impl std::fmt::Display for WarmupStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WarmupStrategy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conservative" => Ok(WarmupStrategy::Conservative),
            "moderate" => Ok(WarmupStrategy::Moderate),
            "aggressive" => Ok(WarmupStrategy::Aggressive),
            other => Err(crate::Error::Validation(format!(
                "Unknown warmup strategy: {}",
                other
            ))),
        }
    }
}

/// Warmup plan lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Pending,
    Active,
    Paused,
    Completed,
    Failed,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Pending => "pending",
            PlanStatus::Active => "active",
            PlanStatus::Paused => "paused",
            PlanStatus::Completed => "completed",
            PlanStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Warmup job execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-email delivery status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    Pending,
    Sent,
    Delivered,
    Opened,
    Replied,
    Bounced,
    Failed,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Pending => "pending",
            EmailStatus::Sent => "sent",
            EmailStatus::Delivered => "delivered",
            EmailStatus::Opened => "opened",
            EmailStatus::Replied => "replied",
            EmailStatus::Bounced => "bounced",
            EmailStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recipient risk class, from lowest risk to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientType {
    Internal,
    Partner,
    ExistingCustomer,
    Prospect,
}

impl RecipientType {
    pub const ALL: [RecipientType; 4] = [
        RecipientType::Internal,
        RecipientType::Partner,
        RecipientType::ExistingCustomer,
        RecipientType::Prospect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientType::Internal => "internal",
            RecipientType::Partner => "partner",
            RecipientType::ExistingCustomer => "existing_customer",
            RecipientType::Prospect => "prospect",
        }
    }
}

impl std::fmt::Display for RecipientType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Warmup email content class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Introduction,
    FollowUp,
    Newsletter,
    Promotional,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Introduction => "introduction",
            ContentType::FollowUp => "follow_up",
            ContentType::Newsletter => "newsletter",
            ContentType::Promotional => "promotional",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Synthetic engagement event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    Open,
    Click,
    Reply,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::Open => "open",
            InteractionType::Click => "click",
            InteractionType::Reply => "reply",
        }
    }
}

impl std::fmt::Display for InteractionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for InteractionType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(InteractionType::Open),
            "click" => Ok(InteractionType::Click),
            "reply" => Ok(InteractionType::Reply),
            other => Err(crate::Error::Validation(format!(
                "Unknown interaction type: {}",
                other
            ))),
        }
    }
}

/// Direction of the health score between two metric updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthTrend {
    Improving,
    Stable,
    Declining,
}

impl HealthTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthTrend::Improving => "improving",
            HealthTrend::Stable => "stable",
            HealthTrend::Declining => "declining",
        }
    }
}

impl std::fmt::Display for HealthTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Extract the domain part of an email address, if well-formed
pub fn email_domain(address: &str) -> Option<&str> {
    let parts: Vec<&str> = address.splitn(2, '@').collect();
    if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
        Some(parts[1])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_strategy_parse() {
        assert_eq!(
            WarmupStrategy::from_str("moderate").unwrap(),
            WarmupStrategy::Moderate
        );
        assert!(WarmupStrategy::from_str("reckless").is_err());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(PlanStatus::Active.to_string(), "active");
        assert_eq!(JobStatus::Running.to_string(), "running");
        assert_eq!(RecipientType::ExistingCustomer.to_string(), "existing_customer");
        assert_eq!(ContentType::FollowUp.to_string(), "follow_up");
    }

    #[test]
    fn test_email_domain() {
        assert_eq!(email_domain("sales@example.com"), Some("example.com"));
        assert_eq!(email_domain("not-an-address"), None);
        assert_eq!(email_domain("@example.com"), None);
        assert_eq!(email_domain("user@"), None);
    }
}
