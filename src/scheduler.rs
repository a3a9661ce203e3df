use crate::config::Config;
use crate::feedback::FeedbackLoop;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

/// Initialize and start the scheduler running the feedback cycle
pub async fn start_scheduler(config: &Config, feedback: Arc<FeedbackLoop>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    // Create scheduled jobs for each time in feedback_schedule_times
    for time in &config.feedback_schedule_times {
        let cron_expr = time_to_cron(time)?;
        info!("Scheduling feedback cycle for {} UTC (cron: {})", time, cron_expr);

        let feedback_clone = Arc::clone(&feedback);
        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _l| {
            let feedback = Arc::clone(&feedback_clone);

            Box::pin(async move {
                info!("⏰ Scheduled feedback cycle triggered");
                let summary = feedback.run_cycle().await;
                if summary.failed > 0 {
                    error!("Feedback cycle finished with {} failed investigation(s)", summary.failed);
                }
            })
        })
        .with_context(|| format!("Failed to create job for {}", time))?;

        scheduler.add(job).await?;
    }

    scheduler.start().await?;
    info!("✓ Scheduler started");

    Ok(scheduler)
}

/// Convert time string (HH:MM, UTC) to a daily cron expression
fn time_to_cron(time: &str) -> Result<String> {
    let parts: Vec<&str> = time.trim().split(':').collect();
    if parts.len() != 2 {
        anyhow::bail!("Invalid time format: {}. Expected HH:MM", time);
    }

    let hour: u8 = parts[0].parse().context("Invalid hour")?;
    let minute: u8 = parts[1].parse().context("Invalid minute")?;
    if hour > 23 || minute > 59 {
        anyhow::bail!("Invalid time: {}. Hour must be 0-23 and minute 0-59", time);
    }

    // Cron format: "second minute hour day month day_of_week"
    Ok(format!("0 {} {} * * *", minute, hour))
}
