use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;

use crate::models::{ContentKind, ParsedTitle};
use crate::services::attributes::{extract_attribute, EXTINF_PREFIX};

// ============ GROUP TOKENS ============
const LIVE_GROUPS: &[&str] = &[
    "live", "tv", "television", "channels", "news", "sport", "sports", "entertainment",
    "kids", "music", "documentary", "lifestyle", "adult", "general", "national", "local",
];
const VOD_GROUPS: &[&str] = &[
    "movies", "movie", "vod", "films", "film", "cinema", "hollywood", "bollywood",
];
const SERIES_GROUPS: &[&str] = &[
    "series", "serie", "tv shows", "tv series", "shows", "drama",
];

// ============ URL SHAPES ============
const VOD_EXTENSIONS: &[&str] = &[
    ".mp4", ".mkv", ".avi", ".mov", ".wmv", ".flv", ".webm", ".m4v", ".3gp", ".m2ts",
];
const LIVE_EXTENSIONS: &[&str] = &[".ts", ".m3u8"];
const SERIES_PATH_MARKERS: &[&str] = &["/series/", "/episode/"];
const VOD_PATH_MARKERS: &[&str] = &["/movie/", "/movies/", "/vod/"];
const LIVE_PATH_MARKERS: &[&str] = &["/live/"];

lazy_static! {
    // ============ CONTENT PATTERNS ============
    static ref SERIES_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\bseasons?\b").unwrap(),
        Regex::new(r"(?i)\bepisodes?\b").unwrap(),
        Regex::new(r"(?i)\bs\d{1,2}[\s._-]?e\d{1,3}\b").unwrap(),
        Regex::new(r"(?i)\b\d{1,2}x\d{1,3}\b").unwrap(),
        Regex::new(r"(?i)\bsaisons?\b").unwrap(),
        Regex::new(r"(?i)\bépisodes?\b").unwrap(),
        Regex::new(r"(?i)\bep\.?\s?\d+\b").unwrap(),
        Regex::new(r"(?i)\bparte\b").unwrap(),
        Regex::new(r"(?i)\btemporadas?\b").unwrap(),
    ];

    static ref VOD_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\b(720p|1080p|2160p|4k)\b").unwrap(),
        Regex::new(r"(?i)\b(bluray|blu-ray|webrip|dvdrip|hdtv|web-dl|brrip)\b").unwrap(),
        Regex::new(r"\(\d{4}\)").unwrap(),
        Regex::new(r"(?i)\bmovies?\b").unwrap(),
        Regex::new(r"(?i)\bpel[ií]culas?\b").unwrap(),
    ];

    /// Embedded season/episode code inside a URL path
    static ref URL_EPISODE_CODE: Regex =
        Regex::new(r"(?i)(?:^|[^a-z0-9])s\d{1,2}[._-]?e\d{1,3}(?:[^0-9]|$)").unwrap();

    /// Attribute values that are URLs (logos, EPG sources)
    static ref URL_ATTRIBUTE: Regex = Regex::new(r#"="[a-zA-Z][a-zA-Z0-9+.-]*://[^"]*""#).unwrap();

    // ============ TITLE EXTRACTORS ============
    static ref EXTRACTOR_YEAR: Regex = Regex::new(r"[\(\[](\d{4})[\)\]]").unwrap();
    static ref EXTRACTOR_QUALITY: Regex =
        Regex::new(r"(?i)\b(4k|2160p|1080p|720p|480p|uhd|fhd|hd|bluray|webrip|dvdrip)\b").unwrap();
    static ref EXTRACTOR_SEASON_EPISODE: Regex = Regex::new(r"(?i)\bs(\d{1,2})[\s._-]?e(\d{1,3})\b").unwrap();
    static ref EXTRACTOR_ALT_SEASON_EPISODE: Regex = Regex::new(r"\b(\d{1,2})x(\d{1,3})\b").unwrap();
    static ref EXTRACTOR_PT_SEASON_EPISODE: Regex = Regex::new(r"(?i)\bt(\d{1,2})[\s._-]?e(\d{1,3})\b").unwrap();
    static ref EXTRACTOR_SEASON: Regex = Regex::new(r"(?i)\b(?:season|saison|temporada)\s*(\d{1,2})\b").unwrap();
    static ref EXTRACTOR_EPISODE: Regex =
        Regex::new(r"(?i)\b(?:episode|épisode|episodio|ep)\.?\s*(\d{1,3})\b").unwrap();

    static ref MULTI_SPACES: Regex = Regex::new(r"\s+").unwrap();
}

/// Classification rules, kept as data so providers with unusual naming can
/// be handled with a different rule set.
#[derive(Debug, Clone)]
pub struct ClassifierRules {
    pub live_groups: Vec<String>,
    pub vod_groups: Vec<String>,
    pub series_groups: Vec<String>,
    pub series_patterns: Vec<Regex>,
    pub vod_patterns: Vec<Regex>,
    pub vod_extensions: Vec<String>,
    pub live_extensions: Vec<String>,
    pub series_path_markers: Vec<String>,
    pub vod_path_markers: Vec<String>,
    pub live_path_markers: Vec<String>,
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            live_groups: owned(LIVE_GROUPS),
            vod_groups: owned(VOD_GROUPS),
            series_groups: owned(SERIES_GROUPS),
            series_patterns: SERIES_PATTERNS.clone(),
            vod_patterns: VOD_PATTERNS.clone(),
            vod_extensions: owned(VOD_EXTENSIONS),
            live_extensions: owned(LIVE_EXTENSIONS),
            series_path_markers: owned(SERIES_PATH_MARKERS),
            vod_path_markers: owned(VOD_PATH_MARKERS),
            live_path_markers: owned(LIVE_PATH_MARKERS),
        }
    }
}

/// Lowercase words of a group name joined by single spaces, padded so that
/// `" tv "` only matches the whole word.
fn group_words(group: &str) -> String {
    let words: Vec<String> = group
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();
    format!(" {} ", words.join(" "))
}

fn contains_phrase(words: &str, phrases: &[String]) -> bool {
    phrases.iter().any(|p| words.contains(&format!(" {} ", p)))
}

/// Content classifier for playlist entries
#[derive(Debug, Clone, Default)]
pub struct ContentClassifier {
    rules: ClassifierRules,
}

impl ContentClassifier {
    pub fn new(rules: ClassifierRules) -> Self {
        Self { rules }
    }

    /// Classifies one metadata line + playback URL pair.
    ///
    /// Signals are tried in a fixed order and the first one that decides
    /// wins: group title, content patterns, URL shape. Anything still
    /// undecided is a live channel.
    pub fn classify(&self, metadata_line: &str, url: &str) -> ContentKind {
        if !metadata_line.starts_with(EXTINF_PREFIX) || url.trim().is_empty() {
            return ContentKind::Unknown;
        }

        // 1. Group title
        if let Some(group) = extract_attribute(metadata_line, "group-title") {
            let kind = self.classify_by_group(group);
            if kind != ContentKind::Unknown {
                return kind;
            }
        }

        // 2. Content patterns
        let kind = self.classify_by_patterns(metadata_line);
        if kind != ContentKind::Unknown {
            return kind;
        }

        // 3. URL shape
        let kind = self.classify_by_url(url);
        if kind != ContentKind::Unknown {
            return kind;
        }

        ContentKind::Live
    }

    /// Classify based on group name.
    ///
    /// Series tokens are checked before movie tokens, and both before live
    /// tokens, so "TV Shows" is a series group and "Apple TV Movies" a movie
    /// group.
    pub fn classify_by_group(&self, group: &str) -> ContentKind {
        let words = group_words(group);
        if words.trim().is_empty() {
            return ContentKind::Unknown;
        }

        if contains_phrase(&words, &self.rules.series_groups) {
            return ContentKind::Series;
        }
        if contains_phrase(&words, &self.rules.vod_groups) {
            return ContentKind::Vod;
        }
        if contains_phrase(&words, &self.rules.live_groups) {
            return ContentKind::Live;
        }

        ContentKind::Unknown
    }

    /// Classify based on markers in the metadata line (URL-valued attributes
    /// such as logos are ignored)
    pub fn classify_by_patterns(&self, metadata_line: &str) -> ContentKind {
        let text: Cow<str> = URL_ATTRIBUTE.replace_all(metadata_line, "=\"\"");

        if self.rules.series_patterns.iter().any(|re| re.is_match(&text)) {
            return ContentKind::Series;
        }
        if self.rules.vod_patterns.iter().any(|re| re.is_match(&text)) {
            return ContentKind::Vod;
        }

        ContentKind::Unknown
    }

    /// Classify based on the playback URL path.
    ///
    /// Order: playable file extension, series path or episode code, live
    /// path or stream extension, movie path.
    pub fn classify_by_url(&self, url: &str) -> ContentKind {
        let lower = url.trim().to_lowercase();
        let path = lower
            .split(|c: char| c == '?' || c == '#')
            .next()
            .unwrap_or_default();

        if self.rules.vod_extensions.iter().any(|ext| path.ends_with(ext.as_str())) {
            return ContentKind::Vod;
        }
        if self.rules.series_path_markers.iter().any(|m| path.contains(m.as_str()))
            || URL_EPISODE_CODE.is_match(path)
        {
            return ContentKind::Series;
        }
        if self.rules.live_path_markers.iter().any(|m| path.contains(m.as_str()))
            || self.rules.live_extensions.iter().any(|ext| {
                path.ends_with(ext.as_str()) || path.contains(&format!("{}/", ext))
            })
        {
            return ContentKind::Live;
        }
        if self.rules.vod_path_markers.iter().any(|m| path.contains(m.as_str())) {
            return ContentKind::Vod;
        }

        ContentKind::Unknown
    }

    /// Extract year/quality/season/episode and a cleaned title from a name
    pub fn parse_title(name: &str) -> ParsedTitle {
        let (season, episode) = Self::extract_season_episode(name);

        ParsedTitle {
            title: Self::clean_title(name),
            year: Self::extract_year(name),
            season,
            episode,
            quality: Self::extract_quality(name),
        }
    }

    /// Year in parentheses or brackets, e.g. "Inception (2010)"
    pub fn extract_year(name: &str) -> Option<i32> {
        EXTRACTOR_YEAR
            .captures(name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .filter(|y| (1900..=2100).contains(y))
    }

    pub fn extract_quality(name: &str) -> Option<String> {
        EXTRACTOR_QUALITY
            .captures(name)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_uppercase())
    }

    /// Season and episode numbers (SxxEyy, 1x01, T01E01, "Season 2", "Ep 5")
    pub fn extract_season_episode(name: &str) -> (Option<i32>, Option<i32>) {
        for re in [
            &*EXTRACTOR_SEASON_EPISODE,
            &*EXTRACTOR_ALT_SEASON_EPISODE,
            &*EXTRACTOR_PT_SEASON_EPISODE,
        ] {
            if let Some(caps) = re.captures(name) {
                let season = caps.get(1).and_then(|m| m.as_str().parse().ok());
                let episode = caps.get(2).and_then(|m| m.as_str().parse().ok());
                return (season, episode);
            }
        }

        let season = EXTRACTOR_SEASON
            .captures(name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok());
        let episode = EXTRACTOR_EPISODE
            .captures(name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok());
        (season, episode)
    }

    /// Series name: everything before the first season/episode marker or year
    pub fn extract_series_name(name: &str) -> String {
        Self::clean_title(name)
    }

    /// Cuts a display name at its first season/episode/year marker and strips
    /// quality tags
    pub fn clean_title(title: &str) -> String {
        let cut = [
            &*EXTRACTOR_SEASON_EPISODE,
            &*EXTRACTOR_ALT_SEASON_EPISODE,
            &*EXTRACTOR_PT_SEASON_EPISODE,
            &*EXTRACTOR_SEASON,
            &*EXTRACTOR_EPISODE,
            &*EXTRACTOR_YEAR,
        ]
        .iter()
        .filter_map(|re| re.find(title).map(|m| m.start()))
        .min()
        .unwrap_or(title.len());

        let head = EXTRACTOR_QUALITY.replace_all(&title[..cut], "");
        let head = MULTI_SPACES.replace_all(&head, " ");
        let cleaned = head
            .trim()
            .trim_end_matches(|c: char| c == '-' || c == '|' || c == ':' || c == '.' || c == '_')
            .trim();

        if cleaned.is_empty() {
            title.trim().to_string()
        } else {
            cleaned.to_string()
        }
    }

    /// Genre label for a provider category name
    pub fn genre_for_category(category: &str, kind: ContentKind) -> Option<String> {
        let lower = category.trim().to_lowercase();
        if lower.is_empty() {
            return None;
        }

        let genre = if lower.contains("action") {
            "Action"
        } else if lower.contains("comedy") {
            "Comedy"
        } else if lower.contains("drama") {
            "Drama"
        } else if lower.contains("horror") {
            "Horror"
        } else if lower.contains("sci-fi") || lower.contains("science") {
            "Sci-Fi"
        } else if lower.contains("romance") {
            "Romance"
        } else if lower.contains("thriller") {
            "Thriller"
        } else if lower.contains("crime") {
            "Crime"
        } else if lower.contains("documentary") {
            "Documentary"
        } else if lower.contains("animation") || lower.contains("cartoon") {
            "Animation"
        } else if kind == ContentKind::Series {
            "Series"
        } else {
            "Movie"
        };

        Some(genre.to_string())
    }
}
