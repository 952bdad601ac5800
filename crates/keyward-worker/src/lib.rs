//! Scheduled maintenance for Keyward.
//!
//! This crate provides:
//! - The [`ScheduledJob`] trait and the built-in jobs
//! - A cron scheduler that runs each job on its configured schedule

pub mod jobs;
pub mod scheduler;

pub use jobs::{RevokedSessionCleanupJob, SanctionExpirySweepJob, ScheduledJob, default_jobs};
pub use scheduler::CronScheduler;
