//! Delete and reindex commands.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;

pub async fn run_delete(video_id: &str, settings: Settings) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    orchestrator.delete_video(video_id).await?;
    Output::success(&format!("Deleted {}", video_id));
    Ok(())
}

pub async fn run_reindex(video_id: &str, settings: Settings) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    let status = orchestrator.index_status(video_id).await?;
    if status.in_sync {
        Output::info(&format!(
            "{} is in sync ({} chunks); reindexing anyway.",
            video_id, status.chunk_rows
        ));
    } else {
        Output::warning(&format!(
            "{} has {} chunk rows but {} index entries.",
            video_id, status.chunk_rows, status.indexed
        ));
    }

    let spinner = Output::spinner("Re-embedding chunks...");
    let count = orchestrator.reindex(video_id).await;
    spinner.finish_and_clear();

    Output::success(&format!("Reindexed {} chunks", count?));
    Ok(())
}
