use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

static VIDEO_URL_RE: OnceLock<Regex> = OnceLock::new();

fn video_url_re() -> &'static Regex {
    VIDEO_URL_RE.get_or_init(|| {
        Regex::new(
            r"(?:[?&]v=|youtu\.be/|/shorts/|/embed/|/live/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
        )
        .expect("static video url pattern")
    })
}

/// An 11-character YouTube video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Pull the video id out of a watch, short-link, shorts, embed or live URL.
    ///
    /// ```
    /// use factlens_captions::VideoId;
    ///
    /// let id = VideoId::from_url("https://youtu.be/dQw4w9WgXcQ?t=42").unwrap();
    /// assert_eq!(id.as_str(), "dQw4w9WgXcQ");
    /// assert!(VideoId::from_url("https://example.com/article").is_none());
    /// ```
    pub fn from_url(url: &str) -> Option<Self> {
        video_url_re()
            .captures(url.trim())
            .and_then(|c| c.get(1))
            .map(|m| Self(m.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_common_link_shapes() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=1s",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ#comments",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ?autoplay=1",
            "https://www.youtube.com/live/dQw4w9WgXcQ",
        ] {
            assert_eq!(
                VideoId::from_url(url).map(|v| v.to_string()).as_deref(),
                Some("dQw4w9WgXcQ"),
                "{url}"
            );
        }
    }

    #[test]
    fn rejects_non_video_links() {
        assert!(VideoId::from_url("https://www.youtube.com/channel/UCabc").is_none());
        assert!(VideoId::from_url("https://news.example.com/story?id=5").is_none());
        // Too short / too long ids.
        assert!(VideoId::from_url("https://youtu.be/short").is_none());
        assert!(VideoId::from_url("https://youtu.be/dQw4w9WgXcQQQ").is_none());
    }
}
