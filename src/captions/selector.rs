use serde::{Deserialize, Serialize};

use super::{CaptionTrack, CaptionTrackSet, TrackKind};
use crate::ExtractionError;

/// Precedence between manual and auto-generated tracks across the preferred languages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOrder {
    /// Scan manual tracks for every preferred language, then auto-generated tracks for every language.
    #[default]
    ManualFirst,

    /// For each preferred language in turn, take its manual track, else its auto-generated one.
    LanguageFirst,
}

/// Legacy codes YouTube still uses for some languages, paired with their current form
const LANGUAGE_ALIASES: [(&str, &str); 3] = [("he", "iw"), ("id", "in"), ("yi", "ji")];

/// Find a track for `language`, falling back to its legacy/current alias
fn lookup(tracks: &CaptionTrackSet, kind: TrackKind, language: &str) -> Option<CaptionTrack> {
    tracks.track(kind, language).or_else(|| {
        LANGUAGE_ALIASES.iter().find_map(|&(current, legacy)| {
            if language.eq_ignore_ascii_case(current) {
                tracks.track(kind, legacy)
            } else if language.eq_ignore_ascii_case(legacy) {
                tracks.track(kind, current)
            } else {
                None
            }
        })
    })
}

/// Pick one caption track according to the preferred language list.
pub fn select(
    tracks: &CaptionTrackSet,
    preferred_languages: &[String],
    order: SelectionOrder,
) -> Result<CaptionTrack, ExtractionError> {
    let found = match order {
        SelectionOrder::ManualFirst => [TrackKind::Manual, TrackKind::AutoGenerated]
            .into_iter()
            .find_map(|kind| {
                preferred_languages
                    .iter()
                    .find_map(|language| lookup(tracks, kind, language))
            }),
        SelectionOrder::LanguageFirst => preferred_languages.iter().find_map(|language| {
            lookup(tracks, TrackKind::Manual, language)
                .or_else(|| lookup(tracks, TrackKind::AutoGenerated, language))
        }),
    };

    found.ok_or_else(|| {
        let available = tracks.languages();
        ExtractionError::NoCaptionsAvailable(format!(
            "no captions in preferred languages [{}] (available: [{}])",
            preferred_languages.join(", "),
            available.join(", ")
        ))
    })
}
