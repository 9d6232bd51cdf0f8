//! Result Validator
//!
//! Turns a raw extractor payload into validated [`SearchResult`]s. Every
//! format of every video is one candidate entry; entries without a download
//! reference or without a title are dropped without complaint. A payload that
//! does not match the schema at all is an error, never an empty list.

use super::payload::{RawFormat, RawVideo, non_blank};
use super::search_result::SearchResult;
use crate::error::CourierError;

/// Validate `payload` and tag every result with `source_url`
///
/// Output order follows the order of entries in the payload.
pub fn validate(payload: &str, source_url: &str) -> Result<Vec<SearchResult>, CourierError> {
    let root: RawVideo = serde_json::from_str(payload)
        .map_err(|e| CourierError::MalformedPayload(e.to_string()))?;

    let mut results = Vec::new();
    collect_video(&root, source_url, &mut results);
    Ok(results)
}

fn collect_video(video: &RawVideo, source_url: &str, out: &mut Vec<SearchResult>) {
    if video.is_playlist() {
        for entry in video.entries.iter().flatten().flatten() {
            collect_video(entry, source_url, out);
        }
        return;
    }

    match video.formats.as_deref() {
        Some(formats) if !formats.is_empty() => {
            out.extend(
                formats
                    .iter()
                    .filter_map(|format| build_result(video, format, source_url)),
            );
        }
        _ => out.extend(build_result(video, &video.media, source_url)),
    }
}

fn build_result(video: &RawVideo, format: &RawFormat, source_url: &str) -> Option<SearchResult> {
    let download_url = format.download_reference()?;
    let title = non_blank(video.title.as_deref())?;

    let display_name = match format.label() {
        Some(label) => format!("{} ({})", title, label),
        None => title.to_string(),
    };
    let ext = non_blank(format.ext.as_deref()).or(non_blank(video.media.ext.as_deref()));
    let format_id = non_blank(format.format_id.as_deref());

    Some(SearchResult {
        display_name,
        filename: file_name(title, format_id, ext),
        download_url: download_url.to_string(),
        source_url: source_url.to_string(),
        size: format.size(),
        format_id: format_id.map(str::to_string),
        width: format.width,
        height: format.height,
        duration: video.duration,
        thumbnail: non_blank(video.thumbnail.as_deref()).map(str::to_string),
        extractor: non_blank(video.extractor.as_deref()).map(str::to_string),
    })
}

/// Build a filesystem-safe file name: `<title>[-<format_id>][.<ext>]`
pub(crate) fn file_name(title: &str, format_id: Option<&str>, ext: Option<&str>) -> String {
    let mut name = sanitize(title);
    if let Some(format_id) = format_id {
        name.push('-');
        name.push_str(&sanitize(format_id));
    }
    if let Some(ext) = ext {
        name.push('.');
        name.push_str(&sanitize(ext));
    }
    name
}

fn sanitize(part: &str) -> String {
    let replaced: String = part
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod validator_tests;
