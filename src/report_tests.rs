//! Tests for outcome rendering

use super::*;
use crate::error::CourierError;
use crate::results::validate;

const URL: &str = "https://example.com/v";

fn sample_results() -> Vec<SearchResult> {
    let payload = r#"{
        "title": "Sunset",
        "formats": [
            {"format_id": "18", "format_note": "360p", "ext": "mp4", "url": "https://cdn.example/18", "filesize": 5242880},
            {"format_id": "140", "ext": "m4a", "url": "https://cdn.example/140"}
        ]
    }"#;
    validate(payload, URL).unwrap()
}

#[test]
fn test_render_results() {
    let outcome = Outcome::Results(sample_results());

    insta::assert_snapshot!(render_text(URL, Some(&outcome)), @r"
    https://example.com/v
      1. Sunset (360p)
         file: Sunset-18.mp4 (5.0 MiB)
         url:  https://cdn.example/18
      2. Sunset (140)
         file: Sunset-140.m4a
         url:  https://cdn.example/140
    ");
}

#[test]
fn test_render_empty_results() {
    let outcome = Outcome::Results(Vec::new());
    assert_eq!(
        render_text(URL, Some(&outcome)),
        "https://example.com/v\n  (no results)\n"
    );
}

#[test]
fn test_render_error() {
    let outcome = Outcome::Errored(CourierError::EmptyPayload {
        url: URL.to_string(),
    });
    assert_eq!(
        render_text(URL, Some(&outcome)),
        "https://example.com/v\n  error: Backend returned no payload for https://example.com/v\n"
    );
}

#[test]
fn test_render_cancelled() {
    assert_eq!(render_text(URL, None), "https://example.com/v\n  cancelled\n");
}

#[test]
fn test_render_json_statuses() {
    let ok = render_json(URL, Some(&Outcome::Results(sample_results())));
    assert_eq!(ok["status"], "ok");
    assert_eq!(ok["results"].as_array().map(Vec::len), Some(2));
    assert_eq!(ok["results"][0]["download_url"], "https://cdn.example/18");
    assert_eq!(ok["results"][0]["source_url"], URL);
    assert_eq!(ok["results"][0]["size"], 5242880);
    assert!(ok["results"][1].get("size").is_none());

    let errored = render_json(
        URL,
        Some(&Outcome::Errored(CourierError::MalformedPayload(
            "expected value".to_string(),
        ))),
    );
    assert_eq!(errored["status"], "error");
    assert_eq!(errored["fault"], "backend");
    assert_eq!(errored["error"], "Malformed payload: expected value");

    let unavailable = render_json(URL, Some(&Outcome::Errored(CourierError::WorkerUnavailable)));
    assert_eq!(unavailable["fault"], "courier");

    let cancelled = render_json(URL, None);
    assert_eq!(cancelled["status"], "cancelled");
    assert!(cancelled.get("results").is_none());
}

#[test]
fn test_format_size_units() {
    assert_eq!(format_size(0), "0 B");
    assert_eq!(format_size(1023), "1023 B");
    assert_eq!(format_size(1024), "1.0 KiB");
    assert_eq!(format_size(1536), "1.5 KiB");
    assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GiB");
}
