use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Json},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::{Bytes, BytesMut};
use std::io::{self, Write};
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult, GenerationError};
use crate::models::{DownloadFormat, DownloadRequest};
use crate::services::{build_docx, write_pdf};

/// Bytes buffered before a chunk is handed to the response body.
const STREAM_CHUNK_SIZE: usize = 16 * 1024;
const STREAM_CHANNEL_CAPACITY: usize = 8;

type Chunk = Result<Bytes, io::Error>;

pub async fn download_handler(payload: Result<Json<DownloadRequest>, JsonRejection>) -> AppResult<Response> {
    let Json(request) = payload.map_err(|e| {
        warn!(error = %e, "Malformed download request");
        AppError::invalid_request(e.body_text())
    })?;

    let text = request
        .text
        .filter(|text| !text.is_empty())
        .ok_or(AppError::MissingText)?;

    let requested = request.format.unwrap_or_default();
    let format = DownloadFormat::parse(&requested)
        .filter(|format| format.is_server_side())
        .ok_or_else(|| AppError::UnsupportedFormat {
            format: requested.clone(),
        })?;

    info!(format = %requested, characters = text.len(), "Generating download");

    match format {
        DownloadFormat::Pdf => stream_pdf(text).await,
        _ => {
            let bytes = tokio::task::spawn_blocking(move || build_docx(&text)).await??;
            info!(bytes = bytes.len(), "DOCX generated");
            Ok(attachment(format, Body::from(bytes)))
        }
    }
}

/// Generate the PDF on a blocking thread and forward it chunk by chunk.
///
/// The first chunk is awaited before the response is committed, so a failure
/// that happens before any byte is ready still becomes a 500.
async fn stream_pdf(text: String) -> AppResult<Response> {
    let (tx, mut rx) = mpsc::channel::<Chunk>(STREAM_CHANNEL_CAPACITY);

    tokio::task::spawn_blocking(move || {
        let mut writer = ChannelWriter::new(tx.clone());
        match write_pdf(&text, &mut writer) {
            Ok(bytes) => info!(bytes, "PDF streamed"),
            Err(e) => {
                error!(error = %e, "PDF generation failed");
                let _ = tx.blocking_send(Err(io::Error::other(e.to_string())));
            }
        }
    });

    let first = match rx.recv().await {
        Some(Ok(chunk)) => chunk,
        Some(Err(e)) => return Err(GenerationError::Io(e).into()),
        None => return Err(GenerationError::Pdf("generator stopped without output".into()).into()),
    };

    let stream = tokio_stream::once(Ok(first)).chain(ReceiverStream::new(rx));
    Ok(attachment(DownloadFormat::Pdf, Body::from_stream(stream)))
}

fn attachment(format: DownloadFormat, body: Body) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", format.file_name()),
            ),
        ],
        body,
    )
        .into_response()
}

/// `std::io::Write` adapter that feeds a bounded channel from a blocking
/// thread. A dropped receiver surfaces as `BrokenPipe`.
struct ChannelWriter {
    tx: mpsc::Sender<Chunk>,
    buffer: BytesMut,
}

impl ChannelWriter {
    fn new(tx: mpsc::Sender<Chunk>) -> Self {
        Self {
            tx,
            buffer: BytesMut::with_capacity(STREAM_CHUNK_SIZE),
        }
    }

    fn send_buffer(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = self.buffer.split().freeze();
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "download receiver dropped"))
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        if self.buffer.len() >= STREAM_CHUNK_SIZE {
            self.send_buffer()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_writer_chunks_and_flushes() {
        let (tx, mut rx) = mpsc::channel::<Chunk>(64);
        let mut writer = ChannelWriter::new(tx);

        writer.write_all(&vec![b'a'; STREAM_CHUNK_SIZE + 10]).unwrap();
        writer.write_all(b"tail").unwrap();
        writer.flush().unwrap();
        drop(writer);

        let mut received = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            received.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(received.len(), STREAM_CHUNK_SIZE + 14);
        assert!(received.ends_with(b"tail"));
    }

    #[test]
    fn channel_writer_reports_dropped_receiver() {
        let (tx, rx) = mpsc::channel::<Chunk>(1);
        drop(rx);
        let mut writer = ChannelWriter::new(tx);
        writer.write_all(b"data").unwrap();
        let err = writer.flush().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
