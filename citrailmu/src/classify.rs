use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Streaming platforms that need dedicated audio-track extraction.
static STREAMING_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(https?://)?(www\.)?(youtube|youtu|youtube-nocookie)\.(com|be)/")
        .expect("valid streaming url regex")
});

static GENERIC_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(?:[-\w.]|(?:%[\da-fA-F]{2}))+").expect("valid url regex")
});

/// What kind of media reference an input string is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// An existing regular file on local storage.
    LocalFile,
    /// A URL on a streaming platform (YouTube).
    StreamingUrl,
    /// Any other http(s) URL, fetched with a plain GET.
    GenericUrl,
    /// Neither a file nor a recognized URL.
    Invalid,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputKind::LocalFile => "local file",
            InputKind::StreamingUrl => "streaming url",
            InputKind::GenericUrl => "web url",
            InputKind::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

/// Classify an input string. Touches the filesystem for the existence
/// check only; never the network.
///
/// A file on disk wins over URL patterns, so a local file literally named
/// `youtube.com/...` is treated as a file.
pub fn classify(input: &str) -> InputKind {
    if Path::new(input).is_file() {
        InputKind::LocalFile
    } else if is_streaming_url(input) {
        InputKind::StreamingUrl
    } else if is_url(input) {
        InputKind::GenericUrl
    } else {
        InputKind::Invalid
    }
}

pub fn is_streaming_url(input: &str) -> bool {
    STREAMING_URL.is_match(input)
}

pub fn is_url(input: &str) -> bool {
    GENERIC_URL.is_match(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streaming_without_scheme() {
        assert_eq!(classify("youtube.com/watch?v=x"), InputKind::StreamingUrl);
    }

    #[test]
    fn test_streaming_variants() {
        for url in [
            "https://www.youtube.com/watch?v=abc",
            "http://youtu.be/abc",
            "https://youtube-nocookie.com/embed/abc",
            "www.youtube.com/shorts/abc",
            "HTTPS://WWW.YOUTUBE.COM/watch?v=abc",
        ] {
            assert_eq!(classify(url), InputKind::StreamingUrl, "{url}");
        }
    }

    #[test]
    fn test_streaming_must_be_anchored() {
        assert_eq!(
            classify("https://example.com/?next=youtube.com/watch"),
            InputKind::GenericUrl
        );
    }

    #[test]
    fn test_generic_url() {
        assert_eq!(classify("http://example.com/a.mp4"), InputKind::GenericUrl);
        assert_eq!(
            classify("https://cdn.example.org/media/talk.m4a?sig=1"),
            InputKind::GenericUrl
        );
    }

    #[test]
    fn test_missing_file_is_invalid() {
        assert_eq!(classify("/tmp/missing.mp4"), InputKind::Invalid);
    }

    #[test]
    fn test_invalid_inputs() {
        for input in ["", "not a url", "ftp://example.com/a.mp3", "example.com/a.mp3"] {
            assert_eq!(classify(input), InputKind::Invalid, "{input:?}");
        }
    }

    #[test]
    fn test_existing_file_is_local() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lecture.wav");
        std::fs::write(&path, b"RIFF").unwrap();
        assert_eq!(classify(path.to_str().unwrap()), InputKind::LocalFile);
    }

    #[test]
    fn test_directory_is_not_local_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(classify(dir.path().to_str().unwrap()), InputKind::Invalid);
    }
}
