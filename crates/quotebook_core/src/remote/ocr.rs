//! OCR client: image bytes in, recognized text out.
//!
//! # Invariants
//! - Images travel base64-encoded in a JSON body `{"image": "..."}`.
//! - Blank recognized text is reported as `None`, not as an error.

use super::{RemoteError, RemoteResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{info, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Text recognition service.
pub trait OcrClient {
    fn extract_text(&self, image: &[u8]) -> RemoteResult<Option<String>>;
}

/// Client for the HTTP OCR function.
pub struct HttpOcrClient {
    client: Client,
    endpoint: String,
}

impl HttpOcrClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> RemoteResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl OcrClient for HttpOcrClient {
    fn extract_text(&self, image: &[u8]) -> RemoteResult<Option<String>> {
        if image.is_empty() {
            return Err(RemoteError::EmptyImage);
        }

        let started_at = Instant::now();
        let encoded = STANDARD.encode(image);
        let response: OcrResponse = self
            .client
            .post(&self.endpoint)
            .json(&OcrRequest { image: &encoded })
            .send()?
            .error_for_status()?
            .json()?;

        let text = response.into_text()?;
        info!(
            "event=ocr_extract module=remote status=ok image_bytes={} has_text={} duration_ms={}",
            image.len(),
            text.is_some(),
            started_at.elapsed().as_millis()
        );
        Ok(text)
    }
}

/// Runs `client`, folding any failure into `None`.
pub fn extract_text_best_effort(client: &dyn OcrClient, image: &[u8]) -> Option<String> {
    match client.extract_text(image) {
        Ok(text) => text,
        Err(err) => {
            warn!(
                "event=ocr_extract module=remote status=error image_bytes={} error={err}",
                image.len()
            );
            None
        }
    }
}

/// Parses a raw OCR function body. Exposed for fixtures and alternate transports.
pub fn parse_ocr_response(body: &str) -> RemoteResult<Option<String>> {
    let response: OcrResponse = serde_json::from_str(body)
        .map_err(|err| RemoteError::Service(format!("malformed ocr response: {err}")))?;
    response.into_text()
}

/// Appends recognized text to a quote draft, separated by one space.
pub fn append_ocr_text(draft: &str, extracted: &str) -> String {
    let extracted = extracted.trim();
    if extracted.is_empty() {
        return draft.to_string();
    }
    if draft.trim().is_empty() {
        return extracted.to_string();
    }
    if draft.ends_with(char::is_whitespace) {
        format!("{draft}{extracted}")
    } else {
        format!("{draft} {extracted}")
    }
}

#[derive(Debug, Serialize)]
struct OcrRequest<'a> {
    image: &'a str,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    success: Option<bool>,
    #[serde(alias = "quoteText")]
    text: Option<String>,
    error: Option<String>,
}

impl OcrResponse {
    fn into_text(self) -> RemoteResult<Option<String>> {
        if self.success == Some(false) {
            return Err(RemoteError::Service(
                self.error
                    .unwrap_or_else(|| "ocr service reported failure".to_string()),
            ));
        }
        Ok(self
            .text
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        append_ocr_text, extract_text_best_effort, parse_ocr_response, HttpOcrClient, OcrClient,
    };
    use crate::remote::{RemoteError, RemoteResult};
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    struct Unreachable;

    impl OcrClient for Unreachable {
        fn extract_text(&self, _image: &[u8]) -> RemoteResult<Option<String>> {
            Err(RemoteError::Service("timeout".to_string()))
        }
    }

    #[test]
    fn reads_text_field_and_legacy_alias() {
        let body = r#"{"success":true,"text":" Fear is the mind-killer. \n","message":"ok"}"#;
        assert_eq!(
            parse_ocr_response(body).unwrap().as_deref(),
            Some("Fear is the mind-killer.")
        );
        let legacy = r#"{"quoteText":"I must not fear."}"#;
        assert_eq!(
            parse_ocr_response(legacy).unwrap().as_deref(),
            Some("I must not fear.")
        );
    }

    #[test]
    fn blank_text_is_none() {
        let body = r#"{"success":true,"text":"","message":"No text detected in the image."}"#;
        assert_eq!(parse_ocr_response(body).unwrap(), None);
    }

    #[test]
    fn reported_failure_is_an_error() {
        let body = r#"{"success":false,"error":"internal"}"#;
        assert!(matches!(
            parse_ocr_response(body),
            Err(RemoteError::Service(message)) if message == "internal"
        ));
    }

    /// Serves one request with `status` and an empty JSON body.
    fn serve_once(status: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0_u8; 4096];
            loop {
                let read = stream.read(&mut buf).unwrap();
                request.extend_from_slice(&buf[..read]);
                if read == 0 || request_complete(&request) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{{}}"
            );
            stream.write_all(response.as_bytes()).unwrap();
        });
        format!("http://{addr}/ocr")
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    #[test]
    fn empty_image_is_rejected_before_any_request() {
        // Nothing listens here; the request must never be sent.
        let client = HttpOcrClient::new("http://127.0.0.1:9/ocr", Duration::from_secs(1)).unwrap();
        assert!(matches!(
            client.extract_text(&[]),
            Err(RemoteError::EmptyImage)
        ));
    }

    #[test]
    fn non_success_status_is_an_http_error() {
        let endpoint = serve_once("500 Internal Server Error");
        let client = HttpOcrClient::new(endpoint, Duration::from_secs(5)).unwrap();
        assert!(matches!(
            client.extract_text(b"jpeg"),
            Err(RemoteError::Http(_))
        ));
    }

    #[test]
    fn success_status_with_no_text_is_none() {
        let endpoint = serve_once("200 OK");
        let client = HttpOcrClient::new(endpoint, Duration::from_secs(5)).unwrap();
        assert_eq!(client.extract_text(b"jpeg").unwrap(), None);
    }

    #[test]
    fn best_effort_returns_none_on_failure() {
        assert_eq!(extract_text_best_effort(&Unreachable, b"jpeg"), None);
    }

    #[test]
    fn append_joins_with_single_space() {
        assert_eq!(append_ocr_text("", "first"), "first");
        assert_eq!(append_ocr_text("first", "second"), "first second");
        assert_eq!(append_ocr_text("first ", "second"), "first second");
        assert_eq!(append_ocr_text("draft", "   "), "draft");
    }
}
