//! Byte-range file streaming.
//!
//! Resolves a client-supplied relative path under the library root and
//! answers with the whole file or a single `bytes=` range of it.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use actix_web::HttpResponse;
use actix_web::body::SizedStream;
use actix_web::http::{StatusCode, header};
use actix_web::web::Bytes;
use futures_util::StreamExt;
use futures_util::stream::{self, Stream};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::media_types;

/// Read size for each body chunk.
const CHUNK_SIZE: usize = 64 * 1024;

/// Failures that map to a non-success response on the play endpoint.
#[derive(Debug)]
pub enum StreamError {
    /// Requested path resolves outside the library root.
    Forbidden,
    /// No file at the requested path.
    NotFound,
    /// Range header is malformed or outside `[0, size - 1]`.
    RangeNotSatisfiable { size: u64 },
    /// Unexpected I/O failure.
    Internal(String),
}

impl StreamError {
    /// Convert a stream error into an HTTP response.
    pub fn into_response(self) -> HttpResponse {
        match self {
            StreamError::Forbidden => HttpResponse::Forbidden().body("Forbidden: Access is denied."),
            StreamError::NotFound => HttpResponse::NotFound().body("File not found."),
            StreamError::RangeNotSatisfiable { size } => HttpResponse::RangeNotSatisfiable()
                .insert_header((header::CONTENT_RANGE, format!("bytes */{size}")))
                .insert_header((header::ACCEPT_RANGES, "bytes"))
                .body("Requested range not satisfiable."),
            StreamError::Internal(message) => HttpResponse::InternalServerError().body(message),
        }
    }
}

/// Inclusive byte span within a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered, always at least one.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Per-server streaming settings.
#[derive(Clone, Copy, Debug)]
pub struct StreamOptions {
    /// Longest a single disk read may stall before the response is aborted.
    pub idle_timeout: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30),
        }
    }
}

/// Parse a single `bytes=<start>-[<end>]` range against a file of `size` bytes.
///
/// Returns `None` for anything that cannot be served: other units, suffix
/// ranges, multiple ranges, `start > end`, or bounds past the end of file.
pub fn parse_range(header: &str, size: u64) -> Option<ByteRange> {
    let spec = header.trim().strip_prefix("bytes=")?;
    if spec.contains(',') {
        return None;
    }
    let (start_s, end_s) = spec.split_once('-')?;
    let start = parse_offset(start_s.trim())?;
    let end = match end_s.trim() {
        "" => size.checked_sub(1)?,
        end_s => parse_offset(end_s)?,
    };
    if start > end || end >= size {
        return None;
    }
    Some(ByteRange { start, end })
}

fn parse_offset(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Resolve `requested` beneath the canonical `root`.
///
/// Containment is decided on canonical paths, so `..` segments and symlinks
/// cannot escape the root. The root itself is not a servable file.
pub fn resolve_under_root(root: &Path, requested: &str) -> Result<PathBuf, StreamError> {
    let rel = Path::new(requested);
    if rel
        .components()
        .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
    {
        return Err(StreamError::Forbidden);
    }
    let candidate = root.join(rel);

    match candidate.canonicalize() {
        Ok(canon) => {
            if canon != root && canon.starts_with(root) {
                Ok(canon)
            } else {
                Err(StreamError::Forbidden)
            }
        }
        Err(e) => {
            // Nothing to canonicalize; judge containment on the lexical form.
            let lexical = normalize_lexically(&candidate);
            if lexical == root || !lexical.starts_with(root) {
                Err(StreamError::Forbidden)
            } else if e.kind() == io::ErrorKind::NotFound {
                Err(StreamError::NotFound)
            } else {
                Err(StreamError::Internal(e.to_string()))
            }
        }
    }
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Serve `requested` from `root`, honoring an optional `Range` header value.
pub async fn serve(
    root: &Path,
    requested: &str,
    range_header: Option<&str>,
    options: StreamOptions,
) -> Result<HttpResponse, StreamError> {
    let path = resolve_under_root(root, requested)?;

    let mut file = File::open(&path).await.map_err(io_to_stream_error)?;
    let meta = file.metadata().await.map_err(io_to_stream_error)?;
    if !meta.is_file() {
        return Err(StreamError::NotFound);
    }
    let size = meta.len();
    let content_type = media_types::mime_for_path(&path);

    let range = match range_header {
        Some(raw) => Some(parse_range(raw, size).ok_or(StreamError::RangeNotSatisfiable { size })?),
        None => None,
    };

    let (status, start, len) = match range {
        Some(range) => (StatusCode::PARTIAL_CONTENT, range.start, range.len()),
        None => (StatusCode::OK, 0, size),
    };
    if start > 0 {
        file.seek(io::SeekFrom::Start(start))
            .await
            .map_err(|e| StreamError::Internal(e.to_string()))?;
    }

    tracing::debug!(
        path = %path.display(),
        status = status.as_u16(),
        start,
        len,
        size,
        "streaming track"
    );

    let body = SizedStream::new(len, body_stream(file.take(len), len, options.idle_timeout, path));
    let mut resp = HttpResponse::build(status);
    resp.insert_header((header::CONTENT_TYPE, content_type));
    resp.insert_header((header::ACCEPT_RANGES, "bytes"));
    if let Some(range) = range {
        resp.insert_header((
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", range.start, range.end, size),
        ));
    }
    resp.insert_header((header::CONTENT_LENGTH, len.to_string()));
    Ok(resp.body(body))
}

fn io_to_stream_error(err: io::Error) -> StreamError {
    match err.kind() {
        io::ErrorKind::NotFound => StreamError::NotFound,
        _ => StreamError::Internal(err.to_string()),
    }
}

/// Tracks progress of one response body and reports early termination.
///
/// Dropped together with the body, which also closes the file handle.
struct Transfer {
    path: PathBuf,
    expected: u64,
    sent: u64,
}

impl Drop for Transfer {
    fn drop(&mut self) {
        if self.sent < self.expected {
            tracing::debug!(
                path = %self.path.display(),
                sent = self.sent,
                expected = self.expected,
                "stream ended before completion"
            );
        }
    }
}

struct BodyState<R> {
    reader: ReaderStream<R>,
    idle_timeout: Duration,
    transfer: Transfer,
    failed: bool,
}

/// Pull-based body: one bounded read per poll, so disk reads follow the client.
///
/// The stream owns `reader`; dropping the stream releases it.
fn body_stream<R>(
    reader: R,
    expected: u64,
    idle_timeout: Duration,
    path: PathBuf,
) -> impl Stream<Item = Result<Bytes, io::Error>> + Unpin + 'static
where
    R: AsyncRead + Unpin + 'static,
{
    let state = BodyState {
        reader: ReaderStream::with_capacity(reader, CHUNK_SIZE),
        idle_timeout,
        transfer: Transfer {
            path,
            expected,
            sent: 0,
        },
        failed: false,
    };
    Box::pin(stream::unfold(state, |mut state| async move {
        if state.failed {
            return None;
        }
        match tokio::time::timeout(state.idle_timeout, state.reader.next()).await {
            Ok(Some(Ok(chunk))) => {
                state.transfer.sent += chunk.len() as u64;
                Some((Ok(chunk), state))
            }
            Ok(Some(Err(e))) => {
                tracing::warn!(path = %state.transfer.path.display(), error = %e, "track read failed");
                state.failed = true;
                Some((Err(e), state))
            }
            Ok(None) => None,
            Err(_) => {
                tracing::warn!(path = %state.transfer.path.display(), "track read timed out");
                state.failed = true;
                Some((Err(io::Error::new(io::ErrorKind::TimedOut, "track read timed out")), state))
            }
        }
    }))
}
