use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::tasks::status_sweep;

pub(crate) async fn run(state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweeper = tokio::spawn(status_sweep_loop(state.clone(), shutdown_rx));

    crate::core::shutdown::shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }

    if let Err(err) = sweeper.await {
        tracing::error!(error = %err, "Background task join failed");
    }

    Ok(())
}

async fn status_sweep_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let period = Duration::from_secs(state.settings().grading().status_sweep_interval_seconds);
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(interval_seconds = period.as_secs(), "Exam status sweeper started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = status_sweep::sweep_exam_statuses(state.db(), primitive_now_utc()).await {
                    tracing::error!(error = %err, "sweep_exam_statuses failed");
                }
            }
        }
    }

    tracing::info!("Exam status sweeper stopped");
}
