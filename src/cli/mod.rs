use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Backend;

#[derive(Parser, Debug)]
#[command(
    name = "transcriber",
    about = "YouTube Transcriber - Fetch caption transcripts for YouTube videos",
    version,
    long_about = "Serves and fetches plain-text transcripts of YouTube videos from their published captions. Manual captions are preferred over auto-generated ones, and rate-limited requests are retried with exponential backoff."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./config.yaml, then the user config directory)
    #[arg(long, global = true, value_name = "PATH", env = "TRANSCRIBER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the caption backend from the configuration
    #[arg(long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP transcript service
    Serve {
        /// Address to bind (overrides server.bind_address)
        #[arg(short, long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Fetch the transcript of one video
    Transcribe {
        /// YouTube URL or bare 11-character video id
        #[arg(value_name = "URL_OR_ID")]
        url: String,

        /// Preferred caption language, repeatable (defaults to the configured list)
        #[arg(short, long = "language", value_name = "LANG")]
        languages: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print the video id contained in a URL
    VideoId {
        #[arg(value_name = "INPUT")]
        input: String,
    },

    /// Show or initialize the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// Full transcript with cues as JSON
    Json,
    /// SRT subtitle format
    Srt,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Srt => write!(f, "srt"),
        }
    }
}
