//! Preheat Core - Account warmup control plane
//!
//! This crate provides the warmup controller: the strategy catalog, plan
//! lifecycle state machine, daily job generation and execution, synthetic
//! interaction replay, and the health monitor.

pub mod delivery;
pub mod notify;
pub mod strategy;
pub mod warmup;

pub use delivery::{
    MessageTransport, QuotaChecker, QuotaStatus, SendOutcome, SendRequest, SmtpTransport,
    UnmeteredQuota,
};
pub use notify::{Notification, NotificationKind, Notifier, NoopNotifier, WebhookNotifier};
pub use strategy::{WeekCriteria, WeekSchedule};
pub use warmup::{
    CreatePlanRequest, HealthMonitor, InteractionSimulator, JobExecutor, JobGenerator,
    PlanError, PlanManager, WarmupService,
};
