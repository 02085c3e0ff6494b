//! Check command - probes the job source and reports the vector store

use tracing::warn;

use crate::engine::MatchEngine;

pub async fn run() -> anyhow::Result<()> {
    let config = super::bootstrap();
    let engine = MatchEngine::from_config(&config).await?;

    let store = engine.store_status();
    println!("vector store: {}", store.kind);
    if let Some(reason) = &store.degraded {
        println!("  durable store unavailable: {}", reason);
    }

    match engine.check_source().await {
        Ok(()) => println!("job source {}: ok", engine.source_name()),
        Err(e) => {
            warn!(error = %e, "Job source health check failed");
            println!("job source {}: {}", engine.source_name(), e);
        }
    }

    let limit = engine.rate_limit_status().await;
    println!(
        "rate limit: {}/{} calls left, window resets in {}s",
        limit.remaining,
        limit.limit,
        limit.reset_in.as_secs()
    );

    Ok(())
}
