use anyhow::Result;
use tokio::time::{sleep, Duration};

use crate::core::shutdown::{self, ShutdownFlag};
use crate::core::state::AppState;
use crate::tasks::grading;

pub(crate) async fn run(state: AppState) -> Result<()> {
    let concurrency = state.settings().grading().worker_concurrency;
    let (trigger, flag) = shutdown::channel();

    let mut handles = Vec::with_capacity(concurrency);
    for worker_id in 0..concurrency {
        handles.push(tokio::spawn(grading_worker(state.clone(), worker_id, flag.clone())));
    }
    tracing::info!(workers = concurrency, "Grading workers started");

    shutdown::shutdown_signal().await;
    trigger.fire();

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Background task join failed");
        }
    }

    Ok(())
}

async fn grading_worker(state: AppState, worker_id: usize, mut shutdown: ShutdownFlag) {
    let poll = Duration::from_secs(state.settings().grading().worker_poll_seconds);

    loop {
        if shutdown.is_set() {
            break;
        }

        match grading::claim_next(&state).await {
            Ok(Some(submission_id)) => {
                tracing::debug!(worker_id, submission_id = %submission_id, "Claimed submission");
                // Failures are recorded on the submission by run_claimed.
                let _ = grading::run_claimed(&state, &submission_id).await;
                continue;
            }
            Ok(None) => {}
            Err(err) => tracing::error!(worker_id, error = %err, "Failed to claim submission"),
        }

        tokio::select! {
            _ = shutdown.wait() => break,
            _ = sleep(poll) => {}
        }
    }

    tracing::info!(worker_id, "Grading worker stopped");
}
