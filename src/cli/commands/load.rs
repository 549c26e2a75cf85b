//! Load command: fetch, chunk, embed, and index a video transcript.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;

pub async fn run_load(url: &str, force: bool, settings: Settings) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Loading video transcript...");
    let result = orchestrator.load_video(url, force).await;
    spinner.finish_and_clear();

    let result = result?;

    if result.skipped {
        Output::info(&format!(
            "{} is already loaded ({} chunks). Use --force to re-load.",
            result.video_id, result.chunk_count
        ));
        return Ok(());
    }

    Output::success(&format!("Loaded \"{}\"", result.title));
    Output::kv("Video ID", &result.video_id);
    Output::kv("Chunks indexed", &result.chunk_count.to_string());
    Ok(())
}
