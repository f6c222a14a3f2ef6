//! Segmentation service client.
//!
//! [`SegmentationBackend`] is the seam between the session and the network.
//! [`HttpBackend`] posts one multipart form per request with reqwest, which
//! runs on top of `fetch` in the browser.

use std::future::Future;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::config::BackendConfig;
use crate::error::SubmitError;
use crate::prompt::{Prompt, SegmentPrompt};

/// Everything needed for one segmentation call.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    /// Original file name of the upload
    pub file_name: String,
    /// MIME type of the upload part
    pub mime_type: String,
    /// Original file bytes, unmodified
    pub bytes: Vec<u8>,
    /// The selection in original image pixels
    pub prompt: Prompt,
}

/// Something that turns an image plus prompt into mask bytes.
pub trait SegmentationBackend {
    /// Perform exactly one attempt. Implementations must not retry.
    fn segment(
        &self,
        request: &PendingRequest,
    ) -> impl Future<Output = Result<Vec<u8>, SubmitError>>;
}

/// Shape of the JSON error body some routes return.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Message to show for a non-success response.
///
/// Uses the `error` field of a JSON body when present, otherwise a generic
/// message naming the status.
pub fn backend_error_message(status: u16, body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => format!("Segmentation failed (HTTP {})", status),
    }
}

/// Build the multipart form for `request`.
pub fn build_form(request: &PendingRequest) -> Result<Form, SubmitError> {
    let part = Part::bytes(request.bytes.clone())
        .file_name(request.file_name.clone())
        .mime_str(&request.mime_type)
        .map_err(SubmitError::invalid_request)?;

    let mut form = Form::new().part(request.prompt.file_field(), part);
    for (name, value) in request.prompt.text_fields()? {
        form = form.text(name, value);
    }
    Ok(form)
}

/// HTTP client for the segmentation service.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpBackend {
    /// Create a client for the configured service.
    pub fn new(config: BackendConfig) -> Result<Self, SubmitError> {
        let builder = reqwest::Client::builder();

        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(std::time::Duration::from_secs(config.timeout_secs));

        let client = builder.build().map_err(SubmitError::transport)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }
}

impl SegmentationBackend for HttpBackend {
    async fn segment(&self, request: &PendingRequest) -> Result<Vec<u8>, SubmitError> {
        let url = self.config.url_for(request.prompt.endpoint());
        let form = build_form(request)?;

        log::debug!("POST {} ({} byte upload)", url, request.bytes.len());

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(SubmitError::transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(SubmitError::transport)?;

        if !status.is_success() {
            let message = backend_error_message(status.as_u16(), &body);
            log::warn!("Backend returned {} for {}: {}", status, url, message);
            return Err(SubmitError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PixelRect;
    use crate::prompt::BoxPrompt;

    #[test]
    fn test_json_error_body_is_shown() {
        assert_eq!(backend_error_message(400, br#"{"error":"bad image"}"#), "bad image");
    }

    #[test]
    fn test_unparsable_body_falls_back() {
        assert_eq!(
            backend_error_message(502, b"<html>Bad Gateway</html>"),
            "Segmentation failed (HTTP 502)"
        );
        assert_eq!(
            backend_error_message(500, br#"{"detail":"oops"}"#),
            "Segmentation failed (HTTP 500)"
        );
        assert_eq!(backend_error_message(500, b""), "Segmentation failed (HTTP 500)");
    }

    #[test]
    fn test_build_form_accepts_request() {
        let request = PendingRequest {
            file_name: "photo.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: vec![1, 2, 3],
            prompt: Prompt::Box(BoxPrompt {
                rect: PixelRect {
                    x1: 1,
                    y1: 2,
                    x2: 3,
                    y2: 4,
                },
            }),
        };
        assert!(build_form(&request).is_ok());
    }

    #[test]
    fn test_build_form_rejects_bad_mime() {
        let request = PendingRequest {
            file_name: "photo.png".to_string(),
            mime_type: "not a mime".to_string(),
            bytes: vec![1, 2, 3],
            prompt: Prompt::Box(BoxPrompt {
                rect: PixelRect {
                    x1: 1,
                    y1: 2,
                    x2: 3,
                    y2: 4,
                },
            }),
        };
        assert!(matches!(
            build_form(&request),
            Err(SubmitError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_client_builds_with_defaults() {
        let backend = HttpBackend::new(BackendConfig::default()).unwrap();
        assert_eq!(backend.config().timeout_secs, 60);
    }

    #[cfg(not(target_arch = "wasm32"))]
    mod loopback {
        use std::io::{ErrorKind, Read, Write};
        use std::net::{TcpListener, TcpStream};
        use std::thread::{self, JoinHandle};

        use super::*;
        use crate::geometry::PixelPoint;
        use crate::prompt::{ColorPrompt, PointPrompt, PromptPoint};

        /// Local server answering exactly one request with a canned response.
        struct OneShotServer {
            listener: TcpListener,
            handle: JoinHandle<String>,
            base_url: String,
        }

        impl OneShotServer {
            fn start(status_line: &'static str, content_type: &'static str, body: Vec<u8>) -> Self {
                let listener = TcpListener::bind("127.0.0.1:0").unwrap();
                let base_url = format!("http://{}", listener.local_addr().unwrap());
                let accept = listener.try_clone().unwrap();
                let handle = thread::spawn(move || {
                    let (mut stream, _) = accept.accept().unwrap();
                    let request = read_request(&mut stream);
                    let head = format!(
                        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        status_line,
                        content_type,
                        body.len()
                    );
                    stream.write_all(head.as_bytes()).unwrap();
                    stream.write_all(&body).unwrap();
                    stream.flush().unwrap();
                    request
                });
                Self {
                    listener,
                    handle,
                    base_url,
                }
            }

            /// Captured request text, after checking no second connection came in.
            fn finish(self) -> String {
                let request = self.handle.join().unwrap();
                self.listener.set_nonblocking(true).unwrap();
                match self.listener.accept() {
                    Err(e) if e.kind() == ErrorKind::WouldBlock => {}
                    other => panic!("unexpected second connection: {:?}", other.map(|c| c.1)),
                }
                request
            }
        }

        fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
            haystack.windows(needle.len()).position(|w| w == needle)
        }

        fn read_request(stream: &mut TcpStream) -> String {
            let mut data = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                data.extend_from_slice(&chunk[..n]);

                let Some(header_end) = find(&data, b"\r\n\r\n") else {
                    continue;
                };
                let head = String::from_utf8_lossy(&data[..header_end]).to_ascii_lowercase();
                let body = &data[header_end + 4..];
                let content_length = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok());
                let complete = match content_length {
                    Some(len) => body.len() >= len,
                    None => body.ends_with(b"0\r\n\r\n"),
                };
                if complete {
                    break;
                }
            }
            String::from_utf8_lossy(&data).into_owned()
        }

        fn backend_for(server: &OneShotServer) -> HttpBackend {
            HttpBackend::new(BackendConfig {
                base_url: server.base_url.clone(),
                timeout_secs: 10,
                ..BackendConfig::default()
            })
            .unwrap()
        }

        fn block_on<F: Future>(future: F) -> F::Output {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap()
                .block_on(future)
        }

        #[test]
        fn test_color_request_wire_format_and_error_body() {
            let server = OneShotServer::start(
                "400 Bad Request",
                "application/json",
                br#"{"error":"bad image"}"#.to_vec(),
            );
            let backend = backend_for(&server);
            let request = PendingRequest {
                file_name: "a.png".to_string(),
                mime_type: "image/png".to_string(),
                bytes: vec![0x89, b'P', b'N', b'G'],
                prompt: Prompt::Color(ColorPrompt {
                    point: PixelPoint::new(7, 9),
                    tolerance: 12.5,
                }),
            };

            let err = block_on(backend.segment(&request)).unwrap_err();
            assert_eq!(
                err,
                SubmitError::Backend {
                    status: 400,
                    message: "bad image".to_string()
                }
            );
            assert_eq!(err.to_string(), "bad image");

            let captured = server.finish();
            assert!(captured.starts_with("POST /segment_color HTTP/1.1\r\n"));
            assert!(captured.contains("name=\"image\"; filename=\"a.png\"\r\nContent-Type: image/png"));
            assert!(captured.contains("name=\"x\"\r\n\r\n7\r\n"));
            assert!(captured.contains("name=\"y\"\r\n\r\n9\r\n"));
            assert!(captured.contains("name=\"tolerance\"\r\n\r\n12.5\r\n"));
            assert!(!captured.contains("name=\"file\""));
        }

        #[test]
        fn test_point_request_returns_mask_bytes() {
            let mask = vec![1u8, 2, 3, 4, 5];
            let server = OneShotServer::start("200 OK", "image/png", mask.clone());
            let backend = backend_for(&server);
            let request = PendingRequest {
                file_name: "photo.jpg".to_string(),
                mime_type: "image/jpeg".to_string(),
                bytes: vec![0xff, 0xd8, 0xff],
                prompt: Prompt::Points(PointPrompt {
                    points: vec![
                        PromptPoint { x: 200, y: 100, label: 1 },
                        PromptPoint { x: 3, y: 4, label: 0 },
                    ],
                }),
            };

            let bytes = block_on(backend.segment(&request)).unwrap();
            assert_eq!(bytes, mask);

            let captured = server.finish();
            assert!(captured.starts_with("POST /segment_point HTTP/1.1\r\n"));
            assert!(captured.contains("name=\"file\"; filename=\"photo.jpg\"\r\nContent-Type: image/jpeg"));
            assert!(captured.contains(
                "name=\"points\"\r\n\r\n[{\"x\":200,\"y\":100,\"label\":1},{\"x\":3,\"y\":4,\"label\":0}]\r\n"
            ));
        }
    }
}
