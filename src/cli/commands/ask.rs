//! Ask command: one-off question about a loaded video.

use crate::answer::format_playback_time;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;

pub async fn run_ask(
    video_id: &str,
    question: &str,
    at: f64,
    settings: Settings,
) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Thinking...");
    let outcome = orchestrator.answer(video_id, question, at).await;
    spinner.finish_and_clear();

    let outcome = outcome?;

    println!("{}", outcome.answer);

    if !outcome.context.is_empty() {
        Output::header("Context");
        for chunk in &outcome.context {
            let marker = match chunk.distance {
                Some(d) => format!("distance {:.3}", d),
                None => "near playback".to_string(),
            };
            Output::kv(
                &format!(
                    "[{} - {}]",
                    format_playback_time(chunk.start_time),
                    format_playback_time(chunk.end_time)
                ),
                &marker,
            );
        }
    }

    Ok(())
}
