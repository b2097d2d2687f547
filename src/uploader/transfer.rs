//! Direct writes of file payloads to presigned storage URLs.

use crate::uploader::error::{UploadError, UploadResult};
use crate::uploader::progress::{ProgressCallback, ProgressStream};
use crate::uploader::source::FileEntry;
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client as HttpClient};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Moves one file's bytes to a destination URL
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write the whole payload of `file` to `url`, reporting bytes as they are sent.
    /// Returns once the storage service acknowledged the write.
    async fn put(
        &self,
        url: &str,
        file: &FileEntry,
        progress: Arc<dyn ProgressCallback>,
    ) -> UploadResult<()>;
}

/// [`Transport`] over plain HTTP PUT
pub struct HttpTransport {
    http_client: HttpClient,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration) -> UploadResult<Self> {
        let http_client = HttpClient::builder()
            .connect_timeout(request_timeout)
            .read_timeout(request_timeout)
            .build()?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn put(
        &self,
        url: &str,
        file: &FileEntry,
        progress: Arc<dyn ProgressCallback>,
    ) -> UploadResult<()> {
        debug!(
            target: "uploader::transfer",
            file = %file.name,
            size = file.size,
            "Uploading file to storage (streaming)"
        );

        let stream = file.open_stream().await?;
        let body = Body::wrap_stream(ProgressStream::new(stream, file.size, progress));

        let response = self
            .http_client
            .put(url)
            .header(CONTENT_TYPE, file.content_type())
            .header(CONTENT_LENGTH, file.size)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::StorageStatus {
                status: status.as_u16(),
                message: format_storage_error(&body),
            });
        }

        Ok(())
    }
}

/// Message for a failed write; S3-style XML errors are reduced to code and message
fn format_storage_error(body: &str) -> String {
    if let Some(code) = extract_xml_element(body, "Code") {
        if let Some(message) = extract_xml_element(body, "Message") {
            return format!("{}: {}", code, message);
        }
        return code;
    }
    body.trim().to_string()
}

fn extract_xml_element(xml: &str, tag: &str) -> Option<String> {
    let open_tag = format!("<{}>", tag);
    let close_tag = format!("</{}>", tag);

    let start = xml.find(&open_tag)? + open_tag.len();
    let end = xml[start..].find(&close_tag)?;

    Some(xml[start..start + end].to_string())
}

/// Retry schedule for transient write failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Base delay between retries (exponential backoff)
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Calculate retry delay with exponential backoff
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let delay_ms = base.saturating_mul(1 << attempt.min(10));
        Duration::from_millis(delay_ms).min(self.max_delay)
    }
}

/// Run one write through `transport`, retrying transient failures and
/// giving up as soon as `cancel_token` fires.
pub async fn put_with_retry(
    transport: &dyn Transport,
    url: &str,
    file: &FileEntry,
    progress: Arc<dyn ProgressCallback>,
    retry: &RetryPolicy,
    cancel_token: &CancellationToken,
) -> UploadResult<()> {
    let mut attempt: u32 = 0;
    loop {
        if cancel_token.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        if attempt > 0 {
            let delay = retry.delay_for(attempt);
            debug!(
                target: "uploader::transfer",
                file = %file.name,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying upload"
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel_token.cancelled() => return Err(UploadError::Cancelled),
            }
        }

        let result = tokio::select! {
            r = transport.put(url, file, Arc::clone(&progress)) => r,
            _ = cancel_token.cancelled() => return Err(UploadError::Cancelled),
        };

        match result {
            Ok(()) => return Ok(()),
            Err(e) if e.is_transient() && attempt < retry.max_retries => {
                warn!(
                    target: "uploader::transfer",
                    file = %file.name,
                    error = %e,
                    attempt,
                    "Upload failed, will retry"
                );
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uploader::progress::{FnProgress, NoOpProgress, ProgressUpdate};
    use axum::Router;
    use axum::body::Bytes as AxumBytes;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::put;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    /// Fails with the given errors first, then succeeds
    struct ScriptedTransport {
        failures: Mutex<Vec<UploadError>>,
        calls: AtomicU32,
    }

    impl ScriptedTransport {
        fn new(failures: Vec<UploadError>) -> Self {
            Self {
                failures: Mutex::new(failures),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn put(
            &self,
            _url: &str,
            _file: &FileEntry,
            _progress: Arc<dyn ProgressCallback>,
        ) -> UploadResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut failures = self.failures.lock().unwrap();
            if failures.is_empty() {
                Ok(())
            } else {
                Err(failures.remove(0))
            }
        }
    }

    fn unavailable() -> UploadError {
        UploadError::StorageStatus {
            status: 503,
            message: "SlowDown".into(),
        }
    }

    #[test]
    fn test_retry_delay_backoff() {
        let retry = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        };
        assert_eq!(retry.delay_for(1), Duration::from_millis(1000));
        assert_eq!(retry.delay_for(2), Duration::from_millis(2000));
        assert_eq!(retry.delay_for(8), Duration::from_secs(10));
    }

    #[test]
    fn test_format_storage_error() {
        let xml = "<Error><Code>AccessDenied</Code><Message>Request has expired</Message></Error>";
        assert_eq!(format_storage_error(xml), "AccessDenied: Request has expired");
        assert_eq!(format_storage_error(" plain text "), "plain text");
    }

    #[tokio::test]
    async fn test_transient_failure_retried() {
        let transport = ScriptedTransport::new(vec![unavailable()]);
        let file = FileEntry::from_bytes("a.txt", "abc");
        let result = put_with_retry(
            &transport,
            "http://x",
            &file,
            Arc::new(NoOpProgress),
            &policy(2),
            &CancellationToken::new(),
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_retry_by_default_budget() {
        let transport = ScriptedTransport::new(vec![unavailable()]);
        let file = FileEntry::from_bytes("a.txt", "abc");
        let result = put_with_retry(
            &transport,
            "http://x",
            &file,
            Arc::new(NoOpProgress),
            &policy(0),
            &CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(UploadError::StorageStatus { status: 503, .. })));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let transport = ScriptedTransport::new(vec![UploadError::StorageStatus {
            status: 403,
            message: "denied".into(),
        }]);
        let file = FileEntry::from_bytes("a.txt", "abc");
        let result = put_with_retry(
            &transport,
            "http://x",
            &file,
            Arc::new(NoOpProgress),
            &policy(3),
            &CancellationToken::new(),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_transfer() {
        let transport = ScriptedTransport::new(vec![]);
        let token = CancellationToken::new();
        token.cancel();
        let file = FileEntry::from_bytes("a.txt", "abc");
        let result = put_with_retry(
            &transport,
            "http://x",
            &file,
            Arc::new(NoOpProgress),
            &policy(0),
            &token,
        )
        .await;
        assert!(matches!(result, Err(UploadError::Cancelled)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[derive(Clone, Default)]
    struct Received {
        body: Arc<Mutex<Vec<u8>>>,
        content_type: Arc<Mutex<Option<String>>>,
    }

    async fn spawn_storage(status: StatusCode) -> (String, Received) {
        let received = Received::default();
        let state = received.clone();
        let app = Router::new().route(
            "/bucket/:key",
            put(move |headers: HeaderMap, body: AxumBytes| {
                let state = state.clone();
                async move {
                    *state.body.lock().unwrap() = body.to_vec();
                    *state.content_type.lock().unwrap() = headers
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    (
                        status,
                        "<Error><Code>AccessDenied</Code><Message>Expired</Message></Error>",
                    )
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/bucket/obj", addr), received)
    }

    #[tokio::test]
    async fn test_http_transport_sends_exact_bytes() {
        let (url, received) = spawn_storage(StatusCode::OK).await;
        let data: Vec<u8> = (0..150_000u32).map(|i| (i % 256) as u8).collect();
        let file = FileEntry::from_bytes("photo.png", data.clone());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress = Arc::new(FnProgress(move |u: ProgressUpdate| {
            sink.lock().unwrap().push(u.percent())
        }));

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        transport.put(&url, &file, progress).await.unwrap();

        assert_eq!(*received.body.lock().unwrap(), data);
        assert_eq!(received.content_type.lock().unwrap().as_deref(), Some("image/png"));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_http_transport_gives_up_on_stalled_storage() {
        let app = Router::new().route(
            "/bucket/:key",
            put(|_body: AxumBytes| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                StatusCode::OK
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let file = FileEntry::from_bytes("a.txt", "abc");
        let transport = HttpTransport::new(Duration::from_millis(200)).unwrap();
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            transport.put(
                &format!("http://{}/bucket/obj", addr),
                &file,
                Arc::new(NoOpProgress),
            ),
        )
        .await
        .expect("read timeout should end the write");

        assert!(matches!(result, Err(UploadError::Http(_))));
    }

    #[tokio::test]
    async fn test_http_transport_maps_storage_errors() {
        let (url, _received) = spawn_storage(StatusCode::FORBIDDEN).await;
        let file = FileEntry::from_bytes("a.txt", "abc");
        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();

        let err = transport
            .put(&url, &file, Arc::new(NoOpProgress))
            .await
            .unwrap_err();
        match err {
            UploadError::StorageStatus { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "AccessDenied: Expired");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
