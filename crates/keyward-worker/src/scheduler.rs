//! Cron scheduler for periodic maintenance jobs.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use keyward_core::error::AppError;

use crate::jobs::ScheduledJob;

/// Runs each registered [`ScheduledJob`] on its own cron schedule.
pub struct CronScheduler {
    scheduler: JobScheduler,
    registered: Vec<&'static str>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("registered", &self.registered)
            .finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new() -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            registered: Vec::new(),
        })
    }

    /// Register every job in `jobs`.
    pub async fn register_all(&mut self, jobs: Vec<Arc<dyn ScheduledJob>>) -> Result<(), AppError> {
        for job in jobs {
            self.register(job).await?;
        }
        tracing::info!(count = self.registered.len(), "All scheduled jobs registered");
        Ok(())
    }

    /// Register one job on its own schedule. A failed run is logged; the
    /// next tick runs it again.
    pub async fn register(&mut self, job: Arc<dyn ScheduledJob>) -> Result<(), AppError> {
        let name = job.name();
        let schedule = job.schedule().to_string();

        let task = Arc::clone(&job);
        let cron = CronJob::new_async(schedule.as_str(), move |_uuid, _lock| {
            let task = Arc::clone(&task);
            Box::pin(async move {
                tracing::debug!(job = task.name(), "Running scheduled job");
                match task.run().await {
                    Ok(report) => tracing::info!(job = task.name(), %report, "Scheduled job finished"),
                    Err(e) => tracing::error!(job = task.name(), error = %e, "Scheduled job failed"),
                }
            })
        })
        .map_err(|e| AppError::configuration(format!("Invalid schedule '{schedule}' for {name}: {e}")))?;

        self.scheduler
            .add(cron)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add {name} schedule: {e}")))?;

        self.registered.push(name);
        tracing::info!(job = name, schedule = %schedule, "Registered scheduled job");
        Ok(())
    }

    /// Names of the registered jobs.
    pub fn registered(&self) -> &[&'static str] {
        &self.registered
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use keyward_core::error::ErrorKind;
    use keyward_core::result::AppResult;
    use serde_json::Value;

    #[derive(Debug)]
    struct Noop(&'static str);

    #[async_trait]
    impl ScheduledJob for Noop {
        fn name(&self) -> &'static str {
            "noop"
        }

        fn schedule(&self) -> &str {
            self.0
        }

        async fn run(&self) -> AppResult<Value> {
            Ok(Value::Null)
        }
    }

    #[tokio::test]
    async fn test_register_valid_schedule() {
        let mut scheduler = CronScheduler::new().await.unwrap();
        scheduler
            .register(Arc::new(Noop("0 */5 * * * *")))
            .await
            .unwrap();
        assert_eq!(scheduler.registered(), ["noop"]);
    }

    #[tokio::test]
    async fn test_invalid_schedule_is_configuration_error() {
        let mut scheduler = CronScheduler::new().await.unwrap();
        let err = scheduler
            .register(Arc::new(Noop("every tuesday")))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(scheduler.registered().is_empty());
    }
}
