//! Book metadata lookup (cover image + "title – author" label).
//!
//! # Invariants
//! - Queries shorter than [`MIN_QUERY_CHARS`] after trimming short-circuit to
//!   `None` without a request.
//! - Cover URLs are always returned as `https`.

use super::{RemoteError, RemoteResult};
use log::{debug, warn};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

/// Minimum trimmed query length worth sending.
pub const MIN_QUERY_CHARS: usize = 2;

/// Best-effort enrichment for a typed title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookMetadata {
    pub cover_url: Option<String>,
    /// `"<title> – <authors>"`, or just the title when authors are unknown.
    pub display_title: Option<String>,
}

impl BookMetadata {
    pub fn is_empty(&self) -> bool {
        self.cover_url.is_none() && self.display_title.is_none()
    }
}

/// Metadata source keyed by a free-text title query.
pub trait BookMetadataLookup {
    fn lookup(&self, query: &str) -> RemoteResult<Option<BookMetadata>>;
}

/// Google Books volumes API client.
pub struct GoogleBooksLookup {
    client: Client,
    endpoint: String,
}

impl GoogleBooksLookup {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> RemoteResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl BookMetadataLookup for GoogleBooksLookup {
    fn lookup(&self, query: &str) -> RemoteResult<Option<BookMetadata>> {
        let Some(query) = lookup_query(query) else {
            return Ok(None);
        };

        let response: VolumesResponse = self
            .client
            .get(&self.endpoint)
            .query(&[("q", format!("intitle:{query}")), ("maxResults", "1".to_string())])
            .send()?
            .error_for_status()?
            .json()?;

        let metadata = metadata_from_volumes(response);
        debug!(
            "event=metadata_lookup module=remote status=ok has_cover={} has_title={}",
            metadata.as_ref().is_some_and(|m| m.cover_url.is_some()),
            metadata.as_ref().is_some_and(|m| m.display_title.is_some())
        );
        Ok(metadata)
    }
}

/// Runs `lookup`, folding any failure into `None`.
pub fn lookup_metadata_best_effort(
    lookup: &dyn BookMetadataLookup,
    query: &str,
) -> Option<BookMetadata> {
    match lookup.lookup(query) {
        Ok(metadata) => metadata,
        Err(err) => {
            warn!("event=metadata_lookup module=remote status=error error={err}");
            None
        }
    }
}

/// Parses a raw volumes API body. Exposed for fixtures and alternate transports.
pub fn parse_volumes_response(body: &str) -> RemoteResult<Option<BookMetadata>> {
    let response: VolumesResponse = serde_json::from_str(body)
        .map_err(|err| RemoteError::Service(format!("malformed volumes response: {err}")))?;
    Ok(metadata_from_volumes(response))
}

fn lookup_query(query: &str) -> Option<&str> {
    let trimmed = query.trim();
    if trimmed.chars().count() < MIN_QUERY_CHARS {
        None
    } else {
        Some(trimmed)
    }
}

fn metadata_from_volumes(response: VolumesResponse) -> Option<BookMetadata> {
    let info = response.items.into_iter().next()?.volume_info?;

    let cover_url = info
        .image_links
        .and_then(|links| links.thumbnail.or(links.small_thumbnail))
        .map(|url| force_https(&url));
    let display_title = info
        .title
        .and_then(|title| format_display_title(&title, &info.authors));

    let metadata = BookMetadata {
        cover_url,
        display_title,
    };
    (!metadata.is_empty()).then_some(metadata)
}

fn format_display_title(title: &str, authors: &[String]) -> Option<String> {
    let title = title.trim();
    if title.is_empty() {
        return None;
    }
    let authors: Vec<&str> = authors
        .iter()
        .map(|author| author.trim())
        .filter(|author| !author.is_empty())
        .collect();
    if authors.is_empty() {
        Some(title.to_string())
    } else {
        Some(format!("{title} – {}", authors.join(", ")))
    }
}

fn force_https(url: &str) -> String {
    match url.strip_prefix("http:") {
        Some(rest) => format!("https:{rest}"),
        None => url.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    volume_info: Option<VolumeInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{
        force_https, lookup_metadata_best_effort, lookup_query, parse_volumes_response,
        BookMetadata, BookMetadataLookup,
    };
    use crate::remote::{RemoteError, RemoteResult};

    struct FailingLookup;

    impl BookMetadataLookup for FailingLookup {
        fn lookup(&self, _query: &str) -> RemoteResult<Option<BookMetadata>> {
            Err(RemoteError::Service("offline".to_string()))
        }
    }

    #[test]
    fn parses_cover_and_author_label() {
        let body = r#"{
            "items": [{
                "volumeInfo": {
                    "title": "Dune",
                    "authors": ["Frank Herbert"],
                    "imageLinks": {
                        "smallThumbnail": "http://books.example/small.jpg",
                        "thumbnail": "http://books.example/thumb.jpg"
                    }
                }
            }]
        }"#;
        let metadata = parse_volumes_response(body).unwrap().unwrap();
        assert_eq!(
            metadata.cover_url.as_deref(),
            Some("https://books.example/thumb.jpg")
        );
        assert_eq!(
            metadata.display_title.as_deref(),
            Some("Dune – Frank Herbert")
        );
    }

    #[test]
    fn falls_back_to_small_thumbnail_and_bare_title() {
        let body = r#"{"items":[{"volumeInfo":{"title":"Solaris",
            "imageLinks":{"smallThumbnail":"https://books.example/s.jpg"}}}]}"#;
        let metadata = parse_volumes_response(body).unwrap().unwrap();
        assert_eq!(metadata.cover_url.as_deref(), Some("https://books.example/s.jpg"));
        assert_eq!(metadata.display_title.as_deref(), Some("Solaris"));
    }

    #[test]
    fn empty_result_set_is_none() {
        assert_eq!(parse_volumes_response(r#"{"totalItems":0}"#).unwrap(), None);
        assert_eq!(parse_volumes_response(r#"{"items":[{}]}"#).unwrap(), None);
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(parse_volumes_response("<html>").is_err());
    }

    #[test]
    fn short_queries_are_skipped() {
        assert_eq!(lookup_query(" a "), None);
        assert_eq!(lookup_query(" ab "), Some("ab"));
    }

    #[test]
    fn https_upgrade_leaves_other_schemes_alone() {
        assert_eq!(force_https("http://x/y"), "https://x/y");
        assert_eq!(force_https("https://x/y"), "https://x/y");
    }

    #[test]
    fn best_effort_swallows_failures() {
        assert_eq!(lookup_metadata_best_effort(&FailingLookup, "Dune"), None);
    }
}
