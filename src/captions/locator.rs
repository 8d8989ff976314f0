use super::CaptionEncoding;
use crate::ExtractionError;

/// Return the first encoding whose format the pipeline can decode.
pub fn locate(
    encodings: &[CaptionEncoding],
    supported_formats: &[String],
) -> Result<CaptionEncoding, ExtractionError> {
    encodings
        .iter()
        .find(|encoding| supported_formats.iter().any(|format| format == &encoding.format))
        .cloned()
        .ok_or_else(|| {
            let offered: Vec<&str> = encodings.iter().map(|e| e.format.as_str()).collect();
            ExtractionError::UnsupportedEncoding(format!(
                "track offers [{}], supported formats are [{}]",
                offered.join(", "),
                supported_formats.join(", ")
            ))
        })
}
