//! CLI module for Grasp.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Grasp - Learn from videos
///
/// Load a video's transcript, ask questions anchored to your playback
/// position, and keep timestamped notes.
#[derive(Parser, Debug)]
#[command(name = "grasp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a video's transcript and index it for chat
    Load {
        /// YouTube URL or bare video ID
        url: String,

        /// Force re-loading even if already indexed
        #[arg(short, long)]
        force: bool,
    },

    /// Ask a question about a loaded video
    Ask {
        /// Video ID
        video_id: String,

        /// The question to ask
        question: String,

        /// Current playback position in seconds
        #[arg(long, default_value = "0")]
        at: f64,
    },

    /// List loaded videos
    List,

    /// Delete a video and everything derived from it
    Delete {
        /// Video ID
        video_id: String,
    },

    /// Re-embed and re-index a video's chunks
    Reindex {
        /// Video ID
        video_id: String,
    },

    /// Start the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
