//! List command: show loaded videos.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;

pub async fn run_list(settings: Settings) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    let db = orchestrator.database();

    let videos = db.list_videos()?;
    if videos.is_empty() {
        Output::info("No videos loaded yet. Use `grasp load <url>` to get started.");
        return Ok(());
    }

    Output::header("Loaded videos");
    for video in videos {
        let chunks = db.chunk_count(&video.id)?;
        Output::video_info(&video.title, &video.id, chunks, video.duration);
    }

    Ok(())
}
