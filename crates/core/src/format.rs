// crates/core/src/format.rs
//! Format selection: mapping the client's `format_id` to fetcher arguments,
//! output container, and download content type.

/// The three recognized selector classes.
///
/// Anything that isn't `best` or `bestaudio` is treated as a concrete
/// fetcher format id (video track merged with best audio).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatSelection {
    /// Best muxed quality, mp4 container.
    Best,
    /// Audio only, extracted to mp3.
    AudioOnly,
    /// A specific video format id, merged with best audio into mp4.
    ById(String),
}

impl FormatSelection {
    pub fn from_format_id(format_id: &str) -> Self {
        match format_id {
            "bestaudio" => Self::AudioOnly,
            "best" => Self::Best,
            other => Self::ById(other.to_string()),
        }
    }

    /// Output container extension (also the artifact file extension).
    pub fn ext(&self) -> &'static str {
        match self {
            Self::AudioOnly => "mp3",
            _ => "mp4",
        }
    }

    /// Content type served on artifact fetch.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::AudioOnly => "audio/mpeg",
            _ => "video/mp4",
        }
    }

    /// Content type for a bare extension string (used when the selection has
    /// been reduced to the job's stored `ext`).
    pub fn content_type_for_ext(ext: &str) -> &'static str {
        if ext == "mp3" {
            "audio/mpeg"
        } else {
            "video/mp4"
        }
    }

    /// Fetcher arguments selecting this format. Passed as a structured argv,
    /// never through a shell.
    pub fn fetcher_args(&self) -> Vec<String> {
        match self {
            Self::AudioOnly => vec![
                "-f".into(),
                "bestaudio".into(),
                "--extract-audio".into(),
                "--audio-format".into(),
                "mp3".into(),
            ],
            Self::Best => vec![
                "-f".into(),
                "bestvideo[ext=mp4]+bestaudio[ext=m4a]/bestvideo+bestaudio/best".into(),
                "--merge-output-format".into(),
                "mp4".into(),
            ],
            Self::ById(id) => vec![
                "-f".into(),
                format!("{id}+bestaudio/best"),
                "--merge-output-format".into(),
                "mp4".into(),
            ],
        }
    }
}

/// Reduce a user-supplied title to a safe filename fragment.
///
/// Keeps ASCII alphanumerics, underscore, hyphen, and whitespace; caps the
/// result at 100 characters; falls back to `"video"` when nothing survives.
pub fn sanitize_title(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .take(100)
        .collect();
    if cleaned.trim().is_empty() {
        "video".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_selection_classes() {
        assert_eq!(FormatSelection::from_format_id("best"), FormatSelection::Best);
        assert_eq!(
            FormatSelection::from_format_id("bestaudio"),
            FormatSelection::AudioOnly
        );
        assert_eq!(
            FormatSelection::from_format_id("137"),
            FormatSelection::ById("137".into())
        );
        // Unrecognized ids fall through to the by-id class.
        assert_eq!(
            FormatSelection::from_format_id("weird-id"),
            FormatSelection::ById("weird-id".into())
        );
    }

    #[test]
    fn test_extensions_and_content_types() {
        assert_eq!(FormatSelection::AudioOnly.ext(), "mp3");
        assert_eq!(FormatSelection::Best.ext(), "mp4");
        assert_eq!(FormatSelection::ById("22".into()).ext(), "mp4");
        assert_eq!(FormatSelection::AudioOnly.content_type(), "audio/mpeg");
        assert_eq!(FormatSelection::Best.content_type(), "video/mp4");
        assert_eq!(FormatSelection::content_type_for_ext("mp3"), "audio/mpeg");
        assert_eq!(FormatSelection::content_type_for_ext("mp4"), "video/mp4");
    }

    #[test]
    fn test_audio_args_extract_mp3() {
        let args = FormatSelection::AudioOnly.fetcher_args();
        assert!(args.contains(&"--extract-audio".to_string()));
        assert!(args.contains(&"mp3".to_string()));
    }

    #[test]
    fn test_by_id_args_merge_with_best_audio() {
        let args = FormatSelection::ById("137".into()).fetcher_args();
        assert_eq!(args[1], "137+bestaudio/best");
        assert!(args.contains(&"--merge-output-format".to_string()));
    }

    #[test]
    fn test_sanitize_title_strips_specials() {
        assert_eq!(sanitize_title("My Video: Part 1/2!"), "My Video Part 12");
        assert_eq!(sanitize_title("safe_name-2024"), "safe_name-2024");
    }

    #[test]
    fn test_sanitize_title_caps_length() {
        let long = "a".repeat(500);
        assert_eq!(sanitize_title(&long).len(), 100);
    }

    #[test]
    fn test_sanitize_title_fallback() {
        assert_eq!(sanitize_title(""), "video");
        assert_eq!(sanitize_title("!!!***"), "video");
        // Titles that reduce to pure whitespace get the fallback too.
        assert_eq!(sanitize_title("؟؟؟ ؟؟؟"), "video");
    }

    #[test]
    fn test_sanitize_title_no_shell_metacharacters_survive() {
        let out = sanitize_title("a;b&c|d`e$f(g)h");
        assert!(out.chars().all(|c| !";&|`$()".contains(c)));
    }
}
