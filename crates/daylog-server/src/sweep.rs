use std::time::Duration;

use tracing::{info, warn};

use daylog_api::AppState;

/// Background task that prunes link tokens nobody presented before they
/// expired. Resolution checks expiry on its own; this only keeps the table small.
pub async fn run_token_sweep(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let task_state = state.clone();
        let result = tokio::task::spawn_blocking(move || {
            task_state
                .db
                .prune_expired_link_tokens(task_state.clock.now())
        })
        .await;

        match result {
            Ok(Ok(count)) => {
                if count > 0 {
                    info!("Token sweep: pruned {} expired link tokens", count);
                }
            }
            Ok(Err(e)) => warn!("Token sweep error: {}", e),
            Err(e) => warn!("Token sweep task failed: {}", e),
        }
    }
}
