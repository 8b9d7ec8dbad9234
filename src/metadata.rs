//! Metadata extraction from release-style file and folder names.
//!
//! A path such as `/TV/The.Show.S02E05.720p.BluRay.x264-GROUP` is scanned
//! with a fixed, ordered table of patterns. Each match is recorded and then
//! blanked out with a placeholder, so later patterns (and finally the title
//! pattern) only see text nothing else has claimed.
//!
//! ```
//! use putsync::metadata::{extract, MetadataKind};
//!
//! let bag = extract("The.Show.S02E05.720p.BluRay.x264-GROUP");
//! assert_eq!(bag.get(MetadataKind::Season), ["02"]);
//! assert_eq!(bag.first(MetadataKind::Title), Some("The Show"));
//! ```

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

/// Marker left behind where a token was removed.
const PLACEHOLDER: &str = "%%";

/// The closed vocabulary of extracted tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataKind {
    Year,
    Resolution,
    Source,
    Audio,
    Video,
    VideoExt,
    Episode,
    Season,
    Title,
}

impl MetadataKind {
    pub const ALL: [MetadataKind; 9] = [
        MetadataKind::Year,
        MetadataKind::Resolution,
        MetadataKind::Source,
        MetadataKind::Audio,
        MetadataKind::Video,
        MetadataKind::VideoExt,
        MetadataKind::Episode,
        MetadataKind::Season,
        MetadataKind::Title,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetadataKind::Year => "year",
            MetadataKind::Resolution => "resolution",
            MetadataKind::Source => "source",
            MetadataKind::Audio => "audio",
            MetadataKind::Video => "video",
            MetadataKind::VideoExt => "video_ext",
            MetadataKind::Episode => "episode",
            MetadataKind::Season => "season",
            MetadataKind::Title => "title",
        }
    }
}

impl fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetadataKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown metadata kind '{}'", s))
    }
}

macro_rules! regex {
    ($regex:expr) => {
        Regex::new($regex).expect("metadata regex is valid") // Static pattern, safe to panic
    };
}

/// Token patterns, applied in this order. A pattern with a group named after
/// its kind contributes that group, otherwise the whole match.
static TOKEN_PATTERNS: LazyLock<Vec<(MetadataKind, Regex)>> = LazyLock::new(|| {
    vec![
        (MetadataKind::Year, regex!(r"(19|20)\d\d")),
        (MetadataKind::Resolution, regex!(r"480p|720p|1080p|2160p")),
        (
            MetadataKind::Source,
            regex!(r"BRRip|BluRay|Blu-ray|BDRip|DVDRip|HDRip|HDTV|DVDSCR|WEB"),
        ),
        (MetadataKind::Audio, regex!(r"DTS|AC3|AAC|DD5\.1")),
        (MetadataKind::Video, regex!(r"h264|x264|Xvid|h 264")),
        (
            MetadataKind::VideoExt,
            regex!(r"\.avi|\.mp4|\.m4v|\.mkv|\.divx|\.mpg$"),
        ),
        // S01E02 (the season part is left for the season pattern), 1x02, ep.02
        (
            MetadataKind::Episode,
            regex!(r"(?:E|\d{1,3}x|ep\.)(?P<episode>\d{1,3})"),
        ),
        (
            MetadataKind::Season,
            regex!(r"(?:S|Season )(?P<season>\d{1,3})"),
        ),
    ]
});

/// A run of segment text followed by placeholders (with optional
/// punctuation around them) or the end of the string.
static TITLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| regex!(r"(?:^|/)([^/]+?)(?:(?: ?\W?%%\W?)+|\W?$)"));
static SPACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| regex!(r"[._]"));
static PLACEHOLDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| regex!(r"\{([a-z_]+)\}"));

/// Tokens extracted from one path, per kind in match order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataBag {
    values: BTreeMap<MetadataKind, Vec<String>>,
}

impl MetadataBag {
    /// All values of a kind, empty if none matched.
    pub fn get(&self, kind: MetadataKind) -> &[String] {
        self.values.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn first(&self, kind: MetadataKind) -> Option<&str> {
        self.get(kind).first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates kinds that matched, in vocabulary order.
    pub fn iter(&self) -> impl Iterator<Item = (MetadataKind, &[String])> {
        self.values.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Fills `{kind}` placeholders in `template` with the first value of each
    /// kind. Returns `None` if a placeholder names an unknown kind or a kind
    /// with no value.
    pub fn render(&self, template: &str) -> Option<String> {
        let mut missing = false;
        let rendered = PLACEHOLDER_PATTERN.replace_all(template, |caps: &Captures<'_>| {
            let value = caps[1]
                .parse::<MetadataKind>()
                .ok()
                .and_then(|kind| self.first(kind));
            match value {
                Some(v) => v.to_string(),
                None => {
                    missing = true;
                    String::new()
                }
            }
        });
        (!missing).then(|| rendered.into_owned())
    }

    fn push(&mut self, kind: MetadataKind, value: String) {
        self.values.entry(kind).or_default().push(value);
    }
}

/// Returns `true` if `template` contains `{kind}` placeholders.
pub fn has_placeholders(template: &str) -> bool {
    PLACEHOLDER_PATTERN.is_match(template)
}

/// Extracts metadata tokens from a path or file name.
pub fn extract(path: &str) -> MetadataBag {
    let mut bag = MetadataBag::default();
    let mut working = path.to_string();

    for (kind, pattern) in TOKEN_PATTERNS.iter() {
        let mut pos = 0;
        while let Some(caps) = pattern.captures_at(&working, pos) {
            let Some(whole) = caps.get(0) else { break };
            let value = caps.name(kind.as_str()).unwrap_or(whole).as_str().to_string();
            let range = whole.range();
            bag.push(*kind, value);

            working.replace_range(range.clone(), PLACEHOLDER);
            pos = range.start + PLACEHOLDER.len();
        }
    }

    let working = SPACE_PATTERN.replace_all(&working, " ");
    debug!("Redacted path \"{}\"", working);
    for caps in TITLE_PATTERN.captures_iter(&working) {
        let title = &caps[1];
        // Segments made only of tokens leave placeholder residue behind.
        if title.contains(PLACEHOLDER) || !title.chars().any(char::is_alphanumeric) {
            continue;
        }
        bag.push(MetadataKind::Title, title.to_string());
    }

    bag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_name() {
        let bag = extract("The.Show.S02E05.720p.BluRay.x264-GROUP");

        assert_eq!(bag.get(MetadataKind::Season), ["02"]);
        assert_eq!(bag.get(MetadataKind::Episode), ["05"]);
        assert_eq!(bag.get(MetadataKind::Resolution), ["720p"]);
        assert_eq!(bag.get(MetadataKind::Source), ["BluRay"]);
        assert_eq!(bag.get(MetadataKind::Video), ["x264"]);
        assert_eq!(bag.first(MetadataKind::Title), Some("The Show"));
        assert!(bag.get(MetadataKind::Year).is_empty());
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let path = "/Movies/Some.Film.2014.1080p.WEB.DTS.mkv";
        assert_eq!(extract(path), extract(path));
    }

    #[test]
    fn test_movie_path() {
        let bag = extract("/Movies/Some.Film.2014.1080p.WEB.DTS.mkv");

        assert_eq!(bag.get(MetadataKind::Year), ["2014"]);
        assert_eq!(bag.get(MetadataKind::Resolution), ["1080p"]);
        assert_eq!(bag.get(MetadataKind::Source), ["WEB"]);
        assert_eq!(bag.get(MetadataKind::Audio), ["DTS"]);
        assert_eq!(bag.get(MetadataKind::VideoExt), [".mkv"]);
        assert_eq!(bag.first(MetadataKind::Title), Some("Some Film"));
    }

    #[test]
    fn test_repeated_tokens_keep_order() {
        let bag = extract("/TV/Show/Season 1/Show.1x02.HDTV/Show.1x03.HDTV");

        assert_eq!(bag.get(MetadataKind::Episode), ["02", "03"]);
        assert_eq!(bag.get(MetadataKind::Source), ["HDTV", "HDTV"]);
        assert_eq!(bag.get(MetadataKind::Season), ["1"]);
    }

    #[test]
    fn test_plain_path_has_no_tokens() {
        let bag = extract("/Documents/notes");
        assert_eq!(bag.get(MetadataKind::Title), ["notes"]);
        assert_eq!(bag.iter().count(), 1);
    }

    #[test]
    fn test_token_only_segment_has_no_title() {
        let bag = extract("/2014");
        assert_eq!(bag.get(MetadataKind::Year), ["2014"]);
        assert!(bag.get(MetadataKind::Title).is_empty());
        assert_eq!(bag.render("Movies/{title}"), None);

        let bag = extract("/Movies/2014");
        assert!(bag
            .get(MetadataKind::Title)
            .iter()
            .all(|t| !t.contains('%')));
    }

    #[test]
    fn test_render_template() {
        let bag = extract("The.Show.S02E05.720p.BluRay.x264-GROUP");

        assert_eq!(
            bag.render("TV/{title}/Season {season}").as_deref(),
            Some("TV/The Show/Season 02")
        );
        assert_eq!(bag.render("Movies/{year}"), None);
        assert_eq!(bag.render("Movies/{nonsense}"), None);
        assert_eq!(bag.render("plain").as_deref(), Some("plain"));
    }

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in MetadataKind::ALL {
            assert_eq!(kind.as_str().parse::<MetadataKind>(), Ok(kind));
        }
    }
}
