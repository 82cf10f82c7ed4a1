//! Repository layer for data access

pub mod activities;
pub mod emails;
pub mod interactions;
pub mod jobs;
pub mod plans;

pub use activities::ActivityRepository;
pub use emails::EmailRepository;
pub use interactions::InteractionRepository;
pub use jobs::{JobCounters, JobRepository};
pub use plans::PlanRepository;
