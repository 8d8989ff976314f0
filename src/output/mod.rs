use anyhow::Result;
use std::fmt::Write;
use std::path::Path;

use crate::captions::Transcript;
use crate::cli::OutputFormat;
use crate::utils::format_srt_timestamp;

/// Render a transcript in the requested format
pub fn render(transcript: &Transcript, format: OutputFormat) -> Result<String> {
    let content = match format {
        OutputFormat::Text => transcript.text.clone(),
        OutputFormat::Json => serde_json::to_string_pretty(transcript)?,
        OutputFormat::Srt => format_as_srt(transcript),
    };
    Ok(content)
}

/// Save transcript to file
pub fn save_to_file(transcript: &Transcript, path: &Path, format: OutputFormat) -> Result<()> {
    let content = render(transcript, format)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }
    fs_err::write(path, content)?;
    Ok(())
}

/// Print transcript to console
pub fn print_to_console(transcript: &Transcript, format: OutputFormat) -> Result<()> {
    println!("{}", render(transcript, format)?);
    Ok(())
}

/// Numbered SRT blocks. Cues without timing follow the previous cue.
fn format_as_srt(transcript: &Transcript) -> String {
    let mut out = String::new();
    let mut cursor = 0u64;
    let mut index = 1;

    for cue in transcript.cues.iter().filter(|cue| !cue.text.trim().is_empty()) {
        let start = cue.start_ms.unwrap_or(cursor);
        let end = start + cue.duration_ms.unwrap_or(0);
        cursor = end;

        let _ = writeln!(
            out,
            "{}\n{} --> {}\n{}\n",
            index,
            format_srt_timestamp(start),
            format_srt_timestamp(end),
            cue.text.trim()
        );
        index += 1;
    }

    out
}
