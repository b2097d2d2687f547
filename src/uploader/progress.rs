//! Byte-level progress reporting for direct writes.

use bytes::Bytes;
use futures::Stream;
use std::fmt::{Debug, Formatter};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

/// Progress update information sent to callbacks
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Total file size in bytes
    pub total_size: u64,
    /// Bytes handed to the connection so far
    pub uploaded: u64,
}

impl Debug for ProgressUpdate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Progress: {}% ({} / {})",
            self.percent(),
            format_bytes(self.uploaded),
            format_bytes(self.total_size),
        )
    }
}

impl ProgressUpdate {
    pub fn new(total_size: u64, uploaded: u64) -> Self {
        Self {
            total_size,
            uploaded,
        }
    }

    /// Rounded percentage in `0..=100`. An empty file counts as complete.
    pub fn percent(&self) -> u8 {
        if self.total_size == 0 {
            return 100;
        }
        let uploaded = self.uploaded.min(self.total_size) as u128;
        ((uploaded * 100 + self.total_size as u128 / 2) / self.total_size as u128) as u8
    }
}

/// Format bytes into human-readable string (e.g., "10.5 MB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Trait for receiving progress updates
pub trait ProgressCallback: Send + Sync {
    /// Called when upload progress changes
    fn on_progress(&self, update: ProgressUpdate);
}

/// No-op progress callback implementation
pub struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _update: ProgressUpdate) {}
}

/// Closure-based progress callback
pub struct FnProgress<F>(pub F);

impl<F> ProgressCallback for FnProgress<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn on_progress(&self, update: ProgressUpdate) {
        (self.0)(update)
    }
}

/// Arc wrapper for progress callbacks
impl<T: ProgressCallback + ?Sized> ProgressCallback for Arc<T> {
    fn on_progress(&self, update: ProgressUpdate) {
        (**self).on_progress(update)
    }
}

/// Stream wrapper that reports every piece it yields
pub struct ProgressStream<S> {
    inner: S,
    callback: Arc<dyn ProgressCallback>,
    total_size: u64,
    bytes_sent: u64,
}

impl<S> ProgressStream<S> {
    pub fn new(inner: S, total_size: u64, callback: Arc<dyn ProgressCallback>) -> Self {
        Self {
            inner,
            callback,
            total_size,
            bytes_sent: 0,
        }
    }
}

impl<S> Stream for ProgressStream<S>
where
    S: Stream<Item = Result<Bytes, io::Error>> + Unpin,
{
    type Item = Result<Bytes, io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(bytes))) => {
                self.bytes_sent += bytes.len() as u64;
                let update = ProgressUpdate::new(self.total_size, self.bytes_sent);
                self.callback.on_progress(update);
                Poll::Ready(Some(Ok(bytes)))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{StreamExt, stream};
    use std::sync::Mutex;

    #[test]
    fn test_percent_rounding() {
        assert_eq!(ProgressUpdate::new(0, 0).percent(), 100);
        assert_eq!(ProgressUpdate::new(1000, 0).percent(), 0);
        assert_eq!(ProgressUpdate::new(1000, 4).percent(), 0);
        assert_eq!(ProgressUpdate::new(1000, 5).percent(), 1);
        assert_eq!(ProgressUpdate::new(3, 2).percent(), 67);
        assert_eq!(ProgressUpdate::new(1000, 2000).percent(), 100);
        assert_eq!(ProgressUpdate::new(u64::MAX, u64::MAX).percent(), 100);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }

    #[tokio::test]
    async fn test_stream_reports_cumulative_bytes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: Arc<dyn ProgressCallback> =
            Arc::new(FnProgress(move |u: ProgressUpdate| sink.lock().unwrap().push(u.uploaded)));

        let pieces = vec![
            Ok(Bytes::from_static(b"abc")),
            Ok(Bytes::from_static(b"de")),
        ];
        let wrapped = ProgressStream::new(stream::iter(pieces), 5, callback);
        let out: Vec<_> = wrapped.collect().await;

        assert_eq!(out.len(), 2);
        assert_eq!(*seen.lock().unwrap(), vec![3, 5]);
    }
}
