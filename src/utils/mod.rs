use tokio::process::Command;

use crate::config::{Backend, Config};

/// Format milliseconds as an SRT timestamp (`HH:MM:SS,mmm`)
pub fn format_srt_timestamp(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Normalize a user-supplied language into a YouTube caption language code
pub fn normalize_language_code(lang: &str) -> String {
    let lang = lang.trim();

    // Common language names
    let normalized = match lang.to_lowercase().as_str() {
        "english" => "en",
        "hebrew" => "he",
        "spanish" => "es",
        "french" => "fr",
        "german" => "de",
        "italian" => "it",
        "portuguese" => "pt",
        "japanese" => "ja",
        "korean" => "ko",
        "chinese" => "zh",
        "arabic" => "ar",
        "hindi" => "hi",
        "russian" => "ru",
        _ => return lang.replace('_', "-"),
    };

    normalized.to_string()
}

/// Check if the current environment has required tools
pub async fn check_dependencies(config: &Config) -> Vec<String> {
    let mut missing = Vec::new();

    if config.youtube.backend == Backend::YtDlp && !check_command_available(&config.youtube.yt_dlp_path).await {
        missing.push(format!(
            "{} - required by the yt_dlp caption backend",
            config.youtube.yt_dlp_path
        ));
    }

    missing
}

/// Check if a command can be executed
pub async fn check_command_available(command: &str) -> bool {
    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
