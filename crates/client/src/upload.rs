//! Multipart form bodies with upload progress reporting.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures_util::stream;
use hostelmate_shared::ApiError;
use reqwest::multipart::{Form, Part};
use reqwest::Body;

/// Chunk size used when streaming file parts.
const CHUNK_SIZE: usize = 64 * 1024;

/// Receives upload progress as an integer percentage (0..=100).
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// A file attached to an [`UploadForm`].
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub field: String,
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            mime: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// In-memory `multipart/form-data` body.
///
/// Kept as plain parts so the request pipeline can rebuild it when a call is
/// retried after a token refresh.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    fields: Vec<(String, String)>,
    files: Vec<UploadFile>,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, file: UploadFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn files(&self) -> &[UploadFile] {
        &self.files
    }

    /// Bytes of file content that progress is measured against.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.bytes.len() as u64).sum()
    }

    pub(crate) fn to_multipart(&self, on_progress: Option<ProgressFn>) -> Result<Form, ApiError> {
        let tracker = on_progress.map(|cb| Arc::new(ProgressTracker::new(self.total_bytes(), cb)));

        let mut form = Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }

        for file in &self.files {
            let len = file.bytes.len() as u64;
            let body = match &tracker {
                Some(tracker) => Body::wrap_stream(counted_chunks(file.bytes.clone(), tracker.clone())),
                None => Body::from(file.bytes.clone()),
            };
            let mut part = Part::stream_with_length(body, len).file_name(file.file_name.clone());
            if let Some(mime) = &file.mime {
                part = part
                    .mime_str(mime)
                    .map_err(|e| ApiError::Decode(format!("invalid mime type {mime:?}: {e}")))?;
            }
            form = form.part(file.field.clone(), part);
        }

        Ok(form)
    }
}

fn counted_chunks(
    bytes: Bytes,
    tracker: Arc<ProgressTracker>,
) -> impl futures_util::Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    let chunks: Vec<Bytes> = (0..bytes.len())
        .step_by(CHUNK_SIZE)
        .map(|start| bytes.slice(start..(start + CHUNK_SIZE).min(bytes.len())))
        .collect();

    stream::iter(chunks.into_iter().map(move |chunk| {
        tracker.advance(chunk.len() as u64);
        Ok(chunk)
    }))
}

/// Turns byte counters into percentages, reporting each value once.
struct ProgressTracker {
    total: u64,
    state: Mutex<(u64, Option<u8>)>,
    callback: ProgressFn,
}

impl ProgressTracker {
    fn new(total: u64, callback: ProgressFn) -> Self {
        let tracker = Self {
            total,
            state: Mutex::new((0, None)),
            callback,
        };
        if total == 0 {
            tracker.report(100);
        }
        tracker
    }

    fn advance(&self, sent: u64) {
        let percent = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.0 = (state.0 + sent).min(self.total);
            percent_of(state.0, self.total)
        };
        self.report(percent);
    }

    fn report(&self, percent: u8) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.1 == Some(percent) {
                return;
            }
            state.1 = Some(percent);
        }
        (self.callback)(percent);
    }
}

/// `round(sent * 100 / total)`, clamped to 100.
pub fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (sent.saturating_mul(100) + total / 2) / total;
    percent.min(100) as u8
}
