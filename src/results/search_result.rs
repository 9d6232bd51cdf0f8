use serde::Serialize;

/// A downloadable rendition of a remote resource
///
/// Built only by [`validate`](super::validate); every field is fixed once the
/// result exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub(super) display_name: String,
    pub(super) filename: String,
    pub(super) download_url: String,
    pub(super) source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) format_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) extractor: Option<String>,
}

impl SearchResult {
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn download_url(&self) -> &str {
        &self.download_url
    }

    /// URL the query was submitted for
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Size in bytes, exact or approximate
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn format_id(&self) -> Option<&str> {
        self.format_id.as_deref()
    }

    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.width.zip(self.height)
    }

    /// Duration in seconds
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }

    pub fn extractor(&self) -> Option<&str> {
        self.extractor.as_deref()
    }
}
