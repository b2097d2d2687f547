//! Files handed to the uploader and the byte streams read from them.

use bytes::Bytes;
use futures::Stream;
use futures::stream;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio_util::io::ReaderStream;

/// MIME type sent when a file carries none
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Piece size used when streaming in-memory payloads
const MEMORY_PIECE_SIZE: usize = 64 * 1024;

/// Payload stream handed to the HTTP body
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + Sync>>;

/// Where a file's bytes come from
#[derive(Debug, Clone)]
pub enum FileSource {
    /// A file on the local filesystem, read lazily at transfer time
    Path(PathBuf),
    /// A payload already held in memory
    Bytes(Bytes),
}

/// One file selected for upload
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Display and remote name
    pub name: String,
    /// Forward-slash path relative to the selection root, file name included
    /// (e.g. `"Photos/2024/img.png"`)
    pub relative_path: Option<String>,
    pub mime_type: Option<String>,
    pub size: u64,
    pub source: FileSource,
}

impl FileEntry {
    /// Wrap an in-memory payload
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let name = name.into();
        Self {
            mime_type: guess_mime(&name),
            name,
            relative_path: None,
            size: data.len() as u64,
            source: FileSource::Bytes(data),
        }
    }

    /// Describe a local file; size and MIME type are read up front
    pub async fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} has no file name", path.display()),
                )
            })?;

        Ok(Self {
            mime_type: guess_mime(&name),
            name,
            relative_path: None,
            size: metadata.len(),
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    pub fn with_relative_path(mut self, relative_path: impl Into<String>) -> Self {
        self.relative_path = Some(relative_path.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// MIME type to send on the wire
    pub fn content_type(&self) -> &str {
        self.mime_type
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    /// Open a fresh stream over the payload. Each call starts from the first byte.
    pub async fn open_stream(&self) -> io::Result<ByteStream> {
        match &self.source {
            FileSource::Path(path) => {
                let file = tokio::fs::File::open(path).await?;
                Ok(Box::pin(ReaderStream::new(file)))
            }
            FileSource::Bytes(data) => {
                let pieces: Vec<io::Result<Bytes>> = (0..data.len())
                    .step_by(MEMORY_PIECE_SIZE)
                    .map(|start| {
                        let end = (start + MEMORY_PIECE_SIZE).min(data.len());
                        Ok(data.slice(start..end))
                    })
                    .collect();
                Ok(Box::pin(stream::iter(pieces)))
            }
        }
    }
}

fn guess_mime(name: &str) -> Option<String> {
    mime_guess::from_path(name)
        .first()
        .map(|m| m.essence_str().to_string())
}
