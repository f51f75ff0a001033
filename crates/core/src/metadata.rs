// crates/core/src/metadata.rs
//! Shaping of the fetcher's `--dump-json` metadata into the info response.
//!
//! The raw dump carries hundreds of format records; the client gets a short
//! curated list: muxed formats only, one entry per resolution, capped at 8,
//! bracketed by a synthetic "best" entry and a synthetic "audio only" entry.

use serde::Serialize;

/// Localized labels for the synthetic entries (user-facing, Arabic UI).
const LABEL_BEST_QUALITY: &str = "أعلى جودة";
const LABEL_AUDIO_ONLY: &str = "صوت فقط";
const LABEL_AUTOMATIC: &str = "تلقائي";
const FALLBACK_TITLE: &str = "فيديو";

/// Maximum number of format entries returned, synthetic entries included.
const MAX_FORMATS: usize = 8;

/// One selectable format in the info response.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct FormatOption {
    pub format_id: String,
    pub quality: String,
    pub ext: String,
    pub size: String,
}

/// Response body for the info lookup.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct VideoInfo {
    pub title: String,
    pub thumbnail: String,
    pub duration: u64,
    pub author: String,
    pub formats: Vec<FormatOption>,
}

/// Shape a raw metadata dump into the curated [`VideoInfo`].
pub fn shape_info(raw: &serde_json::Value) -> VideoInfo {
    let mut formats = Vec::new();
    let mut seen_heights = Vec::new();

    let mut muxed: Vec<&serde_json::Value> = raw["formats"]
        .as_array()
        .map(|list| {
            list.iter()
                .filter(|f| {
                    f["vcodec"].as_str().is_some_and(|v| v != "none")
                        && f["acodec"].as_str().is_some_and(|a| a != "none")
                        && f["height"].as_u64().is_some_and(|h| h > 0)
                })
                .collect()
        })
        .unwrap_or_default();
    muxed.sort_by_key(|f| std::cmp::Reverse(f["height"].as_u64().unwrap_or(0)));

    for format in muxed {
        let height = format["height"].as_u64().unwrap_or(0);
        if seen_heights.contains(&height) {
            continue;
        }
        seen_heights.push(height);
        formats.push(FormatOption {
            format_id: format["format_id"].as_str().unwrap_or_default().to_string(),
            quality: format!("{height}p"),
            ext: format["ext"].as_str().unwrap_or_default().to_string(),
            size: size_text(format),
        });
    }

    formats.insert(
        0,
        FormatOption {
            format_id: "best".into(),
            quality: LABEL_BEST_QUALITY.into(),
            ext: "mp4".into(),
            size: LABEL_AUTOMATIC.into(),
        },
    );
    formats.push(FormatOption {
        format_id: "bestaudio".into(),
        quality: LABEL_AUDIO_ONLY.into(),
        ext: "mp3".into(),
        size: LABEL_AUTOMATIC.into(),
    });
    formats.truncate(MAX_FORMATS);

    VideoInfo {
        title: raw["title"]
            .as_str()
            .filter(|t| !t.is_empty())
            .unwrap_or(FALLBACK_TITLE)
            .to_string(),
        thumbnail: best_thumbnail(raw),
        duration: raw["duration"].as_f64().unwrap_or(0.0) as u64,
        author: author_of(raw),
        formats,
    }
}

/// Approximate size in MB from `filesize`, falling back to
/// `filesize_approx`, else empty.
fn size_text(format: &serde_json::Value) -> String {
    let bytes = format["filesize"]
        .as_f64()
        .or_else(|| format["filesize_approx"].as_f64());
    match bytes {
        Some(b) => format!("{:.2} MB", b / (1024.0 * 1024.0)),
        None => String::new(),
    }
}

/// Top-level `thumbnail`, else the last entry of `thumbnails[]`, else empty.
fn best_thumbnail(raw: &serde_json::Value) -> String {
    if let Some(url) = raw["thumbnail"].as_str() {
        return url.to_string();
    }
    raw["thumbnails"]
        .as_array()
        .and_then(|list| list.last())
        .and_then(|t| t["url"].as_str())
        .unwrap_or_default()
        .to_string()
}

fn author_of(raw: &serde_json::Value) -> String {
    ["uploader", "channel", "creator"]
        .iter()
        .find_map(|key| raw[*key].as_str().filter(|s| !s.is_empty()))
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fmt(id: &str, height: u64, vcodec: &str, acodec: &str, filesize: Option<u64>) -> serde_json::Value {
        json!({
            "format_id": id,
            "height": height,
            "vcodec": vcodec,
            "acodec": acodec,
            "ext": "mp4",
            "filesize": filesize,
        })
    }

    #[test]
    fn test_shape_info_filters_and_dedupes() {
        let raw = json!({
            "title": "Clip",
            "thumbnail": "https://cdn/thumb.jpg",
            "duration": 93.4,
            "uploader": "someone",
            "formats": [
                fmt("18", 360, "avc1", "mp4a", Some(10 * 1024 * 1024)),
                fmt("22", 720, "avc1", "mp4a", None),
                // Same height again — deduped.
                fmt("22b", 720, "avc1", "mp4a", None),
                // Video-only — filtered.
                fmt("137", 1080, "avc1", "none", None),
                // Audio-only — filtered.
                fmt("140", 0, "none", "mp4a", None),
            ],
        });

        let info = shape_info(&raw);
        assert_eq!(info.title, "Clip");
        assert_eq!(info.duration, 93);
        assert_eq!(info.author, "someone");

        let ids: Vec<&str> = info.formats.iter().map(|f| f.format_id.as_str()).collect();
        // Synthetic best first, real formats by descending height, synthetic
        // audio entry last.
        assert_eq!(ids, vec!["best", "22", "18", "bestaudio"]);
        assert_eq!(info.formats[2].size, "10.00 MB");
        assert_eq!(info.formats[1].size, "");
    }

    #[test]
    fn test_shape_info_caps_at_eight() {
        let formats: Vec<serde_json::Value> = (1..=20)
            .map(|i| fmt(&format!("f{i}"), 100 * i, "avc1", "mp4a", None))
            .collect();
        let raw = json!({ "title": "t", "formats": formats });

        let info = shape_info(&raw);
        assert_eq!(info.formats.len(), 8);
        assert_eq!(info.formats[0].format_id, "best");
        // The audio entry is appended before truncation, so on an
        // overlong list it falls off the end, matching reference behavior.
        assert_eq!(info.formats[1].quality, "2000p");
    }

    #[test]
    fn test_shape_info_synthetic_entries_survive_short_lists() {
        let raw = json!({ "title": "t", "formats": [] });
        let info = shape_info(&raw);
        let ids: Vec<&str> = info.formats.iter().map(|f| f.format_id.as_str()).collect();
        assert_eq!(ids, vec!["best", "bestaudio"]);
        assert_eq!(info.formats[0].ext, "mp4");
        assert_eq!(info.formats[1].ext, "mp3");
    }

    #[test]
    fn test_shape_info_fallbacks() {
        let raw = json!({
            "thumbnails": [
                { "url": "https://cdn/low.jpg" },
                { "url": "https://cdn/high.jpg" },
            ],
            "channel": "chan",
        });
        let info = shape_info(&raw);
        assert_eq!(info.title, FALLBACK_TITLE);
        assert_eq!(info.thumbnail, "https://cdn/high.jpg");
        assert_eq!(info.duration, 0);
        assert_eq!(info.author, "chan");
    }

    #[test]
    fn test_shape_info_filesize_approx_fallback() {
        let raw = json!({
            "title": "t",
            "formats": [{
                "format_id": "22",
                "height": 720,
                "vcodec": "avc1",
                "acodec": "mp4a",
                "ext": "mp4",
                "filesize_approx": 2.0 * 1024.0 * 1024.0,
            }],
        });
        let info = shape_info(&raw);
        assert_eq!(info.formats[1].size, "2.00 MB");
    }
}
