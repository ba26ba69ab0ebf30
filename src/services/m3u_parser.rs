use anyhow::{anyhow, bail, Context, Result};
use async_stream::try_stream;
use futures::Stream;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{Client, Response};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tokio_util::io::StreamReader;

use crate::config::HttpTimeouts;
use crate::models::{
    category_id_for_name, external_id_for_url, ContentDetails, ContentKind, ContentRecord,
    LiveDetails, SeriesDetails, VodDetails,
};
use crate::services::attributes::{EntryMetadata, EXTINF_PREFIX, HEADER_LINE};
use crate::services::classifier::ContentClassifier;

// Defensive limits for streamed parsing
const MAX_LINE_BYTES: usize = 32 * 1024; // protect against maliciously long lines
const READ_LINE_TIMEOUT: Duration = Duration::from_secs(10);

/// Log progress every N emitted records
const PROGRESS_LOG_INTERVAL: usize = 10_000;

lazy_static! {
    /// Regex to normalize multiple whitespaces into single space
    static ref MULTI_SPACE_REGEX: Regex = Regex::new(r"\s{2,}").unwrap();
}

/// Normalize text: trim and collapse multiple spaces into single space
fn normalize_text(text: &str) -> String {
    let trimmed = text.trim();
    MULTI_SPACE_REGEX.replace_all(trimmed, " ").to_string()
}

/// Generate URL hash for deduplication
fn url_dedup_hash(url: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    url.hash(&mut hasher);
    hasher.finish()
}

/// Builds the normalized record for one metadata + URL pair.
///
/// `None` when the entry has no usable name or could not be classified.
pub fn build_record(kind: ContentKind, metadata: &EntryMetadata, url: &str) -> Option<ContentRecord> {
    let name = normalize_text(metadata.display_name()?);
    if name.is_empty() {
        return None;
    }

    // The trailing title usually carries the full release text ("Name (2010) 1080p")
    let descriptive = metadata.title.as_deref().unwrap_or(&name);
    let group = metadata.group_title.as_deref().map(normalize_text);
    let parsed = ContentClassifier::parse_title(descriptive);

    let details = match kind {
        ContentKind::Live => ContentDetails::Live(LiveDetails {
            tvg_id: metadata.tvg_id.clone(),
            country: metadata.tvg_country.clone(),
            language: metadata.tvg_language.clone(),
        }),
        ContentKind::Vod => ContentDetails::Vod(VodDetails {
            year: parsed.year,
            quality: parsed.quality,
            genre: group
                .as_deref()
                .and_then(|g| ContentClassifier::genre_for_category(g, ContentKind::Vod)),
            duration_minutes: metadata
                .duration
                .filter(|secs| *secs > 0)
                .map(|secs| (secs / 60) as i32),
        }),
        ContentKind::Series => ContentDetails::Series(SeriesDetails {
            series_name: Some(ContentClassifier::extract_series_name(&name)),
            season: parsed.season,
            episode: parsed.episode,
            year: parsed.year,
            genre: group
                .as_deref()
                .and_then(|g| ContentClassifier::genre_for_category(g, ContentKind::Series)),
        }),
        ContentKind::Unknown => return None,
    };

    let category_name = group
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| kind.default_category_name().to_string());

    Some(ContentRecord {
        external_id: external_id_for_url(url),
        category_id: category_id_for_name(&category_name),
        category_name,
        name,
        playback_url: url.to_string(),
        icon_url: metadata.tvg_logo.clone(),
        details,
    })
}

/// Counters kept while pairing playlist lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairingStats {
    pub saw_header: bool,
    pub metadata_lines: usize,
    pub records: usize,
    /// Metadata replaced by a newer metadata line before its URL arrived
    pub stale_metadata: usize,
    /// URL lines with no pending metadata
    pub orphan_urls: usize,
    /// Pairs without a usable name
    pub dropped: usize,
}

struct PendingEntry {
    line: String,
    metadata: EntryMetadata,
}

/// Line-pairing state machine: a metadata line is held until the next
/// non-comment line, which is taken as its playback URL.
pub struct EntryPairer<'a> {
    classifier: &'a ContentClassifier,
    pending: Option<PendingEntry>,
    stats: PairingStats,
}

impl<'a> EntryPairer<'a> {
    pub fn new(classifier: &'a ContentClassifier) -> Self {
        Self {
            classifier,
            pending: None,
            stats: PairingStats::default(),
        }
    }

    pub fn stats(&self) -> &PairingStats {
        &self.stats
    }

    /// Feeds one raw line; returns a record when the line completes a pair
    pub fn push_line(&mut self, raw: &str) -> Option<ContentRecord> {
        let line = raw.trim();
        if line.is_empty() {
            return None;
        }

        if line.starts_with(EXTINF_PREFIX) {
            if self.pending.is_some() {
                self.stats.stale_metadata += 1;
            }
            self.stats.metadata_lines += 1;
            self.pending = EntryMetadata::parse(line).map(|metadata| PendingEntry {
                line: line.to_string(),
                metadata,
            });
            return None;
        }

        // Other directives (#EXTVLCOPT, #EXTGRP, ...) do not break a pair
        if line.starts_with('#') {
            if line.starts_with(HEADER_LINE) {
                self.stats.saw_header = true;
            }
            return None;
        }

        let Some(pending) = self.pending.take() else {
            self.stats.orphan_urls += 1;
            return None;
        };

        let kind = self.classifier.classify(&pending.line, line);
        match build_record(kind, &pending.metadata, line) {
            Some(record) => {
                self.stats.records += 1;
                Some(record)
            }
            None => {
                self.stats.dropped += 1;
                None
            }
        }
    }
}

/// Streams records out of any buffered reader, one line at a time.
///
/// Fails if a line exceeds the length limit, a read stalls, or the input
/// produced nothing and never declared itself a playlist.
pub fn records_from_reader<'a, R>(
    mut reader: R,
    classifier: &'a ContentClassifier,
) -> impl Stream<Item = Result<ContentRecord>> + Send + 'a
where
    R: AsyncBufRead + Unpin + Send + 'a,
{
    try_stream! {
        let mut pairer = EntryPairer::new(classifier);
        let mut buf: Vec<u8> = Vec::new();

        loop {
            buf.clear();

            let read = tokio::time::timeout(READ_LINE_TIMEOUT, reader.read_until(b'\n', &mut buf))
                .await
                .map_err(|_| anyhow!("Timed out while reading playlist line"))?;
            let bytes_read = read.context("Failed to read playlist line")?;

            if bytes_read == 0 {
                break;
            }

            if buf.len() > MAX_LINE_BYTES {
                Err::<(), anyhow::Error>(anyhow!(
                    "Playlist line exceeds max length of {} bytes",
                    MAX_LINE_BYTES
                ))?;
            }

            // Latin-1 titles are common; invalid bytes become U+FFFD
            let line = String::from_utf8_lossy(&buf);
            if let Some(record) = pairer.push_line(&line) {
                let emitted = pairer.stats().records;
                if emitted % PROGRESS_LOG_INTERVAL == 0 {
                    tracing::info!("Parsed {} playlist entries so far", emitted);
                }
                yield record;
            }
        }

        let stats = pairer.stats().clone();
        if stats.records == 0 && !stats.saw_header {
            Err::<(), anyhow::Error>(anyhow!("Invalid playlist format (missing #EXTM3U header)"))?;
        }

        tracing::info!(
            records = stats.records,
            metadata_lines = stats.metadata_lines,
            stale_metadata = stats.stale_metadata,
            orphan_urls = stats.orphan_urls,
            dropped = stats.dropped,
            "Playlist parse complete"
        );
    }
}

/// Streaming playlist fetcher + parser used as the catalog fallback
pub struct PlaylistStreamParser {
    client: Client,
    classifier: Arc<ContentClassifier>,
    max_retries: u32,
    max_playlist_mb: usize,
}

impl PlaylistStreamParser {
    pub fn new(
        timeouts: HttpTimeouts,
        user_agent: &str,
        max_retries: u32,
        max_playlist_mb: usize,
        classifier: Arc<ContentClassifier>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.request)
            .gzip(true)
            .danger_accept_invalid_certs(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            classifier,
            max_retries,
            max_playlist_mb,
        })
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<Response> {
        let mut attempt = 0;

        loop {
            match self.client.get(url).send().await {
                Ok(resp) => {
                    if resp.status().is_success() {
                        if let Some(len) = resp.content_length() {
                            let max_bytes = (self.max_playlist_mb as u64) * 1024 * 1024;
                            if len > max_bytes {
                                bail!(
                                    "Playlist too large: {:.1}MB (limit {}MB)",
                                    len as f64 / 1024f64 / 1024f64,
                                    self.max_playlist_mb
                                );
                            }
                        }

                        return Ok(resp);
                    }

                    let status = resp.status();
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS && attempt < self.max_retries {
                        let backoff_ms = (1u64 << attempt).saturating_mul(500).min(10_000);
                        tracing::warn!("fetch_retry" = attempt + 1, "reason" = "429", "backoff_ms" = backoff_ms);
                        sleep(Duration::from_millis(backoff_ms)).await;
                        attempt += 1;
                        continue;
                    }

                    let friendly: String = match status {
                        reqwest::StatusCode::NOT_FOUND => "Playlist not found (404)".to_string(),
                        reqwest::StatusCode::FORBIDDEN => "Access denied (403)".to_string(),
                        reqwest::StatusCode::TOO_MANY_REQUESTS => "Too many requests (429)".to_string(),
                        _ => {
                            let reason = status.canonical_reason().unwrap_or("Error");
                            format!("HTTP {}: {}", status.as_u16(), reason)
                        }
                    };

                    bail!("{}", friendly);
                }
                Err(err) => {
                    if attempt < self.max_retries {
                        let backoff_ms = (1u64 << attempt).saturating_mul(500).min(10_000);
                        tracing::warn!("fetch_retry" = attempt + 1, "reason" = "network", "backoff_ms" = backoff_ms);
                        sleep(Duration::from_millis(backoff_ms)).await;
                        attempt += 1;
                        continue;
                    }
                    // get.php URLs carry the account credentials
                    return Err(err.without_url().into());
                }
            }
        }
    }

    /// Fetches a playlist and yields every classified record as it is parsed
    pub fn stream<'a>(&'a self, url: &'a str) -> impl Stream<Item = Result<ContentRecord>> + Send + 'a {
        try_stream! {
            let response = self
                .fetch_with_retry(url)
                .await
                .context("Failed to fetch playlist")?;

            if let Some(len) = response.content_length() {
                tracing::info!("Playlist size: {:.2} MB", len as f64 / 1024.0 / 1024.0);
            }

            // Convert to async reader for line-by-line parsing
            let body = response
                .bytes_stream()
                .map(|result| {
                    result.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.without_url()))
                });
            let reader = Box::pin(BufReader::new(StreamReader::new(body)));

            let records = records_from_reader(reader, &self.classifier);
            tokio::pin!(records);

            while let Some(record) = records.next().await {
                yield record?;
            }
        }
    }

    /// Fetches a playlist and keeps only the records of one kind, skipping
    /// repeated playback URLs
    pub async fn collect_kind(&self, url: &str, kind: ContentKind) -> Result<Vec<ContentRecord>> {
        let stream = self.stream(url);
        tokio::pin!(stream);

        let mut seen_urls: HashSet<u64> = HashSet::new();
        let mut records = Vec::new();
        let mut duplicates_skipped = 0usize;
        let mut other_kinds = 0usize;

        while let Some(record) = stream.next().await {
            let record = record?;
            if record.kind() != kind {
                other_kinds += 1;
                continue;
            }
            if !seen_urls.insert(url_dedup_hash(&record.playback_url)) {
                duplicates_skipped += 1;
                continue;
            }
            records.push(record);
        }

        tracing::info!(
            kind = %kind,
            kept = records.len(),
            other_kinds,
            duplicates_skipped,
            "Playlist fallback filtered"
        );

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PLAYLIST: &str = r#"#EXTM3U
#EXTINF:-1 tvg-name="Inception" tvg-logo="http://img/inception.jpg" group-title="Movies",Inception (2010)
http://p/movie/u/p/1001.mkv
#EXTINF:-1 tvg-id="bbc1",BBC One HD
#EXTVLCOPT:http-user-agent=VLC
http://p/hls/bbc1.m3u8
#EXTINF:-1 group-title="TV Shows",Breaking Bad S01E02
http://p/series/u/p/501.mp4
"#;

    fn parse(content: &str) -> Vec<ContentRecord> {
        let classifier = ContentClassifier::default();
        let mut pairer = EntryPairer::new(&classifier);
        content.lines().filter_map(|line| pairer.push_line(line)).collect()
    }

    #[test]
    fn test_parse_vod_entry() {
        let records = parse(PLAYLIST);
        assert_eq!(records.len(), 3);

        let movie = &records[0];
        assert_eq!(movie.kind(), ContentKind::Vod);
        assert_eq!(movie.name, "Inception");
        assert_eq!(movie.category_name, "Movies");
        assert_eq!(movie.category_id, category_id_for_name("Movies"));
        assert_eq!(movie.external_id, external_id_for_url("http://p/movie/u/p/1001.mkv"));
        assert_eq!(movie.icon_url.as_deref(), Some("http://img/inception.jpg"));
        match &movie.details {
            ContentDetails::Vod(vod) => {
                assert_eq!(vod.year, Some(2010));
                assert_eq!(vod.genre.as_deref(), Some("Movie"));
            }
            other => panic!("unexpected details: {:?}", other),
        }
    }

    #[test]
    fn test_parse_live_entry_defaults() {
        let records = parse(PLAYLIST);
        let live = &records[1];
        assert_eq!(live.kind(), ContentKind::Live);
        assert_eq!(live.name, "BBC One HD");
        assert_eq!(live.category_name, "Live TV");
        assert_eq!(live.category_id, category_id_for_name("Live TV"));
        assert_eq!(live.playback_url, "http://p/hls/bbc1.m3u8");
        match &live.details {
            ContentDetails::Live(details) => assert_eq!(details.tvg_id.as_deref(), Some("bbc1")),
            other => panic!("unexpected details: {:?}", other),
        }
    }

    #[test]
    fn test_parse_series_entry() {
        let records = parse(PLAYLIST);
        match &records[2].details {
            ContentDetails::Series(series) => {
                assert_eq!(series.series_name.as_deref(), Some("Breaking Bad"));
                assert_eq!(series.season, Some(1));
                assert_eq!(series.episode, Some(2));
            }
            other => panic!("unexpected details: {:?}", other),
        }
    }

    #[test]
    fn test_movie_entry_keeps_trailing_title() {
        let records = parse(
            "#EXTM3U\n\
#EXTINF:-1 group-title=\"Movies\" tvg-logo=\"http://x/p.png\",Inception (2010)\n\
http://host/movie/inception.mp4\n",
        );
        assert_eq!(records.len(), 1);
        let movie = &records[0];
        assert_eq!(movie.kind(), ContentKind::Vod);
        assert_eq!(movie.name, "Inception (2010)");
        assert_eq!(movie.icon_url.as_deref(), Some("http://x/p.png"));
        match &movie.details {
            ContentDetails::Vod(vod) => assert_eq!(vod.year, Some(2010)),
            other => panic!("unexpected details: {:?}", other),
        }
    }

    #[test]
    fn test_live_entry_with_tvg_id() {
        let records = parse("#EXTINF:-1 tvg-id=\"bbc1\",BBC One HD\nhttp://host/live/bbc1.m3u8\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind(), ContentKind::Live);
        assert_eq!(records[0].name, "BBC One HD");
        match &records[0].details {
            ContentDetails::Live(details) => assert_eq!(details.tvg_id.as_deref(), Some("bbc1")),
            other => panic!("unexpected details: {:?}", other),
        }
    }

    #[test]
    fn test_stale_metadata_is_discarded() {
        let classifier = ContentClassifier::default();
        let mut pairer = EntryPairer::new(&classifier);
        assert!(pairer.push_line("#EXTINF:-1,First").is_none());
        assert!(pairer.push_line("#EXTINF:-1,Second").is_none());
        let record = pairer.push_line("http://p/live/u/p/2.ts").unwrap();
        assert_eq!(record.name, "Second");
        assert_eq!(pairer.stats().stale_metadata, 1);
    }

    #[test]
    fn test_nameless_and_orphan_entries() {
        let classifier = ContentClassifier::default();
        let mut pairer = EntryPairer::new(&classifier);
        assert!(pairer.push_line("http://p/live/u/p/0.ts").is_none());
        assert!(pairer.push_line(r#"#EXTINF:-1 group-title="News","#).is_none());
        assert!(pairer.push_line("http://p/live/u/p/1.ts").is_none());
        assert_eq!(pairer.stats().orphan_urls, 1);
        assert_eq!(pairer.stats().dropped, 1);
        assert_eq!(pairer.stats().records, 0);
    }

    #[test]
    fn test_non_http_url_lines_are_accepted() {
        let records = parse("#EXTM3U\n#EXTINF:-1 group-title=\"News\",Radio One\nrtmp://p/live/radio1\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].playback_url, "rtmp://p/live/radio1");
    }

    #[test]
    fn test_external_id_is_stable_across_parses() {
        let first: Vec<i64> = parse(PLAYLIST).iter().map(|r| r.external_id).collect();
        let second: Vec<i64> = parse(PLAYLIST).iter().map(|r| r.external_id).collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_records_from_reader() {
        let classifier = ContentClassifier::default();
        let stream = records_from_reader(PLAYLIST.as_bytes(), &classifier);
        tokio::pin!(stream);

        let mut names = Vec::new();
        while let Some(record) = stream.next().await {
            names.push(record.unwrap().name);
        }
        assert_eq!(names, vec!["Inception", "BBC One HD", "Breaking Bad S01E02"]);
    }

    #[tokio::test]
    async fn test_reader_rejects_non_playlist() {
        let classifier = ContentClassifier::default();
        let stream = records_from_reader("<html>not found</html>\n".as_bytes(), &classifier);
        tokio::pin!(stream);

        let first = stream.next().await.unwrap();
        assert!(first.is_err());
    }

    #[tokio::test]
    async fn test_reader_accepts_headerless_playlist_with_entries() {
        let classifier = ContentClassifier::default();
        let content = "#EXTINF:-1,Channel\nhttp://p/live/u/p/9.ts\n";
        let stream = records_from_reader(content.as_bytes(), &classifier);
        tokio::pin!(stream);

        let mut count = 0;
        while let Some(record) = stream.next().await {
            record.unwrap();
            count += 1;
        }
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_reader_rejects_oversized_line() {
        let classifier = ContentClassifier::default();
        let content = format!("#EXTM3U\n#EXTINF:-1,{}\n", "x".repeat(MAX_LINE_BYTES + 1));
        let stream = records_from_reader(content.as_bytes(), &classifier);
        tokio::pin!(stream);

        let first = stream.next().await.unwrap();
        assert!(first.is_err());
    }

    fn parser() -> PlaylistStreamParser {
        let timeouts = HttpTimeouts {
            connect: Duration::from_secs(2),
            request: Duration::from_secs(5),
        };
        PlaylistStreamParser::new(timeouts, "test-agent", 0, 10, Arc::new(ContentClassifier::default()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_collect_kind_filters_and_dedups() {
        let server = MockServer::start().await;
        let body = format!("{}#EXTINF:-1 group-title=\"Movies\",Inception copy\nhttp://p/movie/u/p/1001.mkv\n", PLAYLIST);
        Mock::given(method("GET"))
            .and(path("/get.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let url = format!("{}/get.php", server.uri());
        let movies = parser().collect_kind(&url, ContentKind::Vod).await.unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].name, "Inception");
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get.php"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/get.php", server.uri());
        let err = parser().collect_kind(&url, ContentKind::Live).await.unwrap_err();
        assert!(format!("{:#}", err).contains("404"));
    }

    #[tokio::test]
    async fn test_reader_survives_invalid_utf8() {
        let classifier = ContentClassifier::default();
        let mut content = b"#EXTM3U\n#EXTINF:-1,Channel One\nhttp://p/live/u/p/1.ts\n".to_vec();
        content.extend_from_slice(b"#EXTINF:-1,Caf\xE9 TV\nhttp://p/live/u/p/2.ts\n");
        content.extend_from_slice(b"#EXTINF:-1,Channel Three\nhttp://p/live/u/p/3.ts\n");
        let stream = records_from_reader(&content[..], &classifier);
        tokio::pin!(stream);

        let mut names = Vec::new();
        while let Some(record) = stream.next().await {
            names.push(record.unwrap().name);
        }
        assert_eq!(names, vec!["Channel One", "Caf\u{FFFD} TV", "Channel Three"]);
    }
}
