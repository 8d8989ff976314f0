use serde::Deserialize;

use super::{Cue, JSON3, VTT};
use crate::ExtractionError;

/// YouTube json3 timed-text payload
#[derive(Debug, Deserialize)]
struct Json3Payload {
    #[serde(default)]
    events: Option<Vec<Json3Event>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    t_start_ms: Option<u64>,
    d_duration_ms: Option<u64>,
    #[serde(default)]
    segs: Option<Vec<Json3Segment>>,
}

#[derive(Debug, Deserialize)]
struct Json3Segment {
    utf8: Option<String>,
}

/// Decode a fetched caption payload into cues.
pub fn decode(payload: &[u8], format: &str) -> Result<Vec<Cue>, ExtractionError> {
    match format {
        JSON3 => decode_json3(payload),
        VTT => Ok(decode_vtt(&String::from_utf8_lossy(payload))),
        other => Err(ExtractionError::UnsupportedEncoding(format!(
            "no decoder for caption format '{}'",
            other
        ))),
    }
}

/// Concatenate cue texts verbatim and trim the result once.
pub fn transcript_text(cues: &[Cue]) -> String {
    cues.iter()
        .map(|cue| cue.text.as_str())
        .collect::<String>()
        .trim()
        .to_string()
}

fn decode_json3(payload: &[u8]) -> Result<Vec<Cue>, ExtractionError> {
    let parsed: Json3Payload = serde_json::from_slice(payload)
        .map_err(|e| ExtractionError::Unknown(format!("Failed to parse json3 captions: {}", e)))?;

    let cues = parsed
        .events
        .unwrap_or_default()
        .into_iter()
        .filter_map(|event| {
            let segs = event.segs?;
            let mut text = String::new();
            let mut has_text = false;
            for seg in segs {
                if let Some(fragment) = seg.utf8 {
                    text.push_str(&fragment);
                    has_text = true;
                }
            }

            has_text.then(|| Cue {
                start_ms: event.t_start_ms,
                duration_ms: event.d_duration_ms,
                text,
            })
        })
        .collect();

    Ok(cues)
}

fn decode_vtt(payload: &str) -> Vec<Cue> {
    let mut cues = Vec::new();
    let mut lines = payload.lines().peekable();

    while let Some(line) = lines.next() {
        let Some((start, end)) = parse_timing_line(line) else {
            continue;
        };

        let mut text_lines = Vec::new();
        while let Some(next) = lines.peek() {
            if next.trim().is_empty() {
                break;
            }
            let cleaned = clean_vtt_text(next);
            if !cleaned.is_empty() {
                text_lines.push(cleaned);
            }
            lines.next();
        }

        if text_lines.is_empty() {
            continue;
        }

        cues.push(Cue {
            start_ms: Some(start),
            duration_ms: Some(end.saturating_sub(start)),
            text: format!("{}\n", text_lines.join("\n")),
        });
    }

    cues
}

/// Parse `00:00:01.000 --> 00:00:04.000 align:start position:0%`
fn parse_timing_line(line: &str) -> Option<(u64, u64)> {
    let (start, rest) = line.split_once("-->")?;
    let end = rest.split_whitespace().next()?;
    Some((parse_vtt_timestamp(start.trim())?, parse_vtt_timestamp(end)?))
}

fn parse_vtt_timestamp(value: &str) -> Option<u64> {
    let (clock, millis) = value.split_once('.')?;
    let millis: u64 = millis.parse().ok()?;

    let parts: Vec<u64> = clock
        .split(':')
        .map(|part| part.parse().ok())
        .collect::<Option<Vec<u64>>>()?;

    let seconds = match parts.as_slice() {
        [h, m, s] => h * 3600 + m * 60 + s,
        [m, s] => m * 60 + s,
        _ => return None,
    };

    Some(seconds * 1000 + millis)
}

/// Strip inline tags (`<c>`, `<00:00:01.000>`) and decode the common entities
fn clean_vtt_text(line: &str) -> String {
    let mut text = String::with_capacity(line.len());
    let mut in_tag = false;
    for ch in line.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }

    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json3_concatenates_segments_verbatim() {
        let payload = br#"{"events":[{"segs":[{"utf8":"Hello "}]},{"segs":[{"utf8":"world"}]}]}"#;
        let cues = decode(payload, JSON3).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "Hello ");
        assert_eq!(transcript_text(&cues), "Hello world");
    }

    #[test]
    fn test_json3_without_events_is_empty() {
        let cues = decode(br#"{"wireMagic":"pb3"}"#, JSON3).unwrap();
        assert!(cues.is_empty());
        assert_eq!(transcript_text(&cues), "");
    }

    #[test]
    fn test_json3_skips_events_and_segments_without_text() {
        let payload = br#"{
            "wireMagic": "pb3",
            "events": [
                {"tStartMs": 0, "dDurationMs": 5000, "id": 1, "wpWinPosId": 1},
                {"tStartMs": 100, "dDurationMs": 2000, "segs": [{"utf8": "  first"}, {"tOffsetMs": 400}, {"utf8": " line"}]},
                {"tStartMs": 2100, "aAppend": 1, "segs": [{"utf8": "\n"}]},
                {"tStartMs": 2200, "dDurationMs": 1800, "segs": [{"acAsrConf": 0}]},
                {"tStartMs": 4000, "dDurationMs": 1000, "segs": [{"utf8": "second  "}]}
            ]
        }"#;

        let cues = decode(payload, JSON3).unwrap();
        assert_eq!(cues.len(), 3);
        assert_eq!(cues[0].start_ms, Some(100));
        assert_eq!(cues[0].duration_ms, Some(2000));
        assert_eq!(cues[0].text, "  first line");
        assert_eq!(cues[1].duration_ms, None);
        assert_eq!(transcript_text(&cues), "first line\nsecond");
    }

    #[test]
    fn test_json3_malformed_payload() {
        let err = decode(b"<html>not json</html>", JSON3).unwrap_err();
        assert!(matches!(err, ExtractionError::Unknown(ref m) if m.contains("json3")));
    }

    #[test]
    fn test_vtt_cues() {
        let payload = "WEBVTT\nKind: captions\nLanguage: en\n\n\
            1\n00:00:01.000 --> 00:00:03.500 align:start position:0%\n\
            Hello<00:00:01.500><c> there</c>\n\n\
            00:03.500 --> 00:05.000\nTom &amp; Jerry\nsecond line\n\n\
            NOTE this is a comment\n\n";

        let cues = decode(payload.as_bytes(), VTT).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].start_ms, Some(1000));
        assert_eq!(cues[0].duration_ms, Some(2500));
        assert_eq!(cues[0].text, "Hello there\n");
        assert_eq!(cues[1].start_ms, Some(3500));
        assert_eq!(transcript_text(&cues), "Hello there\nTom & Jerry\nsecond line");
    }

    #[test]
    fn test_unknown_format_is_unsupported() {
        let err = decode(b"<timedtext/>", "srv3").unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedEncoding(_)));
    }
}
