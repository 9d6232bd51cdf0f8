// Raw extractor payload schema

use serde::Deserialize;

/// One downloadable format as reported by the extractor
#[derive(Debug, Default, Deserialize)]
pub(super) struct RawFormat {
    pub format_id: Option<String>,
    pub format_note: Option<String>,
    pub ext: Option<String>,
    pub url: Option<String>,
    pub manifest_url: Option<String>,
    pub fragment_base_url: Option<String>,
    pub filesize: Option<f64>,
    pub filesize_approx: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A video, or a playlist of videos when `entries` is present
///
/// Single-format videos carry their format fields at the top level.
#[derive(Debug, Default, Deserialize)]
pub(super) struct RawVideo {
    #[serde(rename = "_type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    pub extractor: Option<String>,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub formats: Option<Vec<RawFormat>>,
    /// Unavailable playlist items are reported as `null`
    pub entries: Option<Vec<Option<RawVideo>>>,
    #[serde(flatten)]
    pub media: RawFormat,
}

impl RawVideo {
    pub fn is_playlist(&self) -> bool {
        self.entries.is_some() || self.kind.as_deref() == Some("playlist")
    }
}

impl RawFormat {
    /// First non-blank candidate download reference
    pub fn download_reference(&self) -> Option<&str> {
        [&self.url, &self.manifest_url, &self.fragment_base_url]
            .into_iter()
            .filter_map(|candidate| non_blank(candidate.as_deref()))
            .next()
    }

    /// Short human label distinguishing this format from its siblings
    pub fn label(&self) -> Option<String> {
        if let Some(note) = non_blank(self.format_note.as_deref()) {
            return Some(note.to_string());
        }
        if let (Some(width), Some(height)) = (self.width, self.height) {
            return Some(format!("{}x{}", width, height));
        }
        non_blank(self.format_id.as_deref()).map(str::to_string)
    }

    pub fn size(&self) -> Option<u64> {
        self.filesize
            .or(self.filesize_approx)
            .filter(|size| size.is_finite() && *size >= 0.0)
            .map(|size| size.round() as u64)
    }
}

pub(super) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
