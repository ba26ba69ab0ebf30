//! EXTINF attribute extraction
//!
//! Attributes are located by plain substring search: the first occurrence of
//! `name="` and the next `"` after it. Escaped quotes inside values are not
//! supported, and a short name can match inside a longer one (`name` matches
//! within `tvg-name`), so callers always ask for the full attribute name.

pub const EXTINF_PREFIX: &str = "#EXTINF:";
pub const HEADER_LINE: &str = "#EXTM3U";

/// Returns the value of `name="..."` on a metadata line.
///
/// `None` when the attribute is absent or its closing quote is missing.
pub fn extract_attribute<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{}=\"", name);
    let start = line.find(&needle)? + needle.len();
    let len = line[start..].find('"')?;
    Some(&line[start..start + len])
}

/// Text after the last comma of a metadata line, trimmed
pub fn trailing_title(line: &str) -> Option<&str> {
    let idx = line.rfind(',')?;
    let title = line[idx + 1..].trim();
    (!title.is_empty()).then_some(title)
}

/// Duration field right after `#EXTINF:` (`-1` for live entries)
pub fn extinf_duration(line: &str) -> Option<i64> {
    let rest = line.strip_prefix(EXTINF_PREFIX)?.trim_start();
    let end = rest
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && c == '-')))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Attributes of one `#EXTINF` line that the catalog cares about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryMetadata {
    pub tvg_id: Option<String>,
    pub tvg_name: Option<String>,
    pub tvg_logo: Option<String>,
    pub tvg_country: Option<String>,
    pub tvg_language: Option<String>,
    pub group_title: Option<String>,
    pub title: Option<String>,
    pub duration: Option<i64>,
}

impl EntryMetadata {
    /// Reads a metadata line; `None` if it is not an `#EXTINF` line
    pub fn parse(line: &str) -> Option<Self> {
        if !line.starts_with(EXTINF_PREFIX) {
            return None;
        }

        Some(Self {
            tvg_id: non_blank(extract_attribute(line, "tvg-id")),
            tvg_name: non_blank(extract_attribute(line, "tvg-name")),
            tvg_logo: non_blank(extract_attribute(line, "tvg-logo")),
            tvg_country: non_blank(extract_attribute(line, "tvg-country")),
            tvg_language: non_blank(extract_attribute(line, "tvg-language")),
            group_title: non_blank(extract_attribute(line, "group-title")),
            title: trailing_title(line).map(str::to_string),
            duration: extinf_duration(line),
        })
    }

    /// Display name: `tvg-name` when present, otherwise the trailing title
    pub fn display_name(&self) -> Option<&str> {
        self.tvg_name.as_deref().or(self.title.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = r#"#EXTINF:-1 tvg-id="bbc1.uk" tvg-name="BBC One" tvg-logo="http://logo/bbc.png" group-title="UK | News",BBC One HD"#;

    #[test]
    fn test_extract_attribute() {
        assert_eq!(extract_attribute(LINE, "tvg-id"), Some("bbc1.uk"));
        assert_eq!(extract_attribute(LINE, "group-title"), Some("UK | News"));
        assert_eq!(extract_attribute(LINE, "tvg-logo"), Some("http://logo/bbc.png"));
        assert_eq!(extract_attribute(LINE, "tvg-country"), None);
    }

    #[test]
    fn test_extract_attribute_unterminated() {
        let line = r#"#EXTINF:-1 group-title="Movies,Broken"#;
        assert_eq!(extract_attribute(line, "group-title"), None);
    }

    #[test]
    fn test_extract_attribute_empty_value() {
        let line = r#"#EXTINF:-1 tvg-logo="",Channel"#;
        assert_eq!(extract_attribute(line, "tvg-logo"), Some(""));
    }

    #[test]
    fn test_trailing_title_uses_last_comma() {
        let line = r#"#EXTINF:-1 group-title="Action, Adventure",Mad Max, Fury Road"#;
        assert_eq!(trailing_title(line), Some("Fury Road"));
        assert_eq!(trailing_title("#EXTINF:-1 tvg-id=\"x\","), None);
    }

    #[test]
    fn test_extinf_duration() {
        assert_eq!(extinf_duration("#EXTINF:-1 tvg-id=\"x\",A"), Some(-1));
        assert_eq!(extinf_duration("#EXTINF:7260,Movie"), Some(7260));
        assert_eq!(extinf_duration("#EXTINF:,Movie"), None);
        assert_eq!(extinf_duration("#EXTVLCOPT:foo"), None);
    }

    #[test]
    fn test_entry_metadata_prefers_tvg_name() {
        let meta = EntryMetadata::parse(LINE).unwrap();
        assert_eq!(meta.display_name(), Some("BBC One"));
        assert_eq!(meta.title.as_deref(), Some("BBC One HD"));
        assert_eq!(meta.group_title.as_deref(), Some("UK | News"));
        assert_eq!(meta.duration, Some(-1));
    }

    #[test]
    fn test_entry_metadata_without_name() {
        let meta = EntryMetadata::parse(r#"#EXTINF:-1 tvg-name="  " group-title="Movies","#).unwrap();
        assert_eq!(meta.display_name(), None);
        assert!(EntryMetadata::parse("http://not-a-metadata-line").is_none());
    }
}
