//! Where raw payloads come from.
//!
//! A source is shared by every ingestion worker, the same way several producer loops
//! share one Kafka consumer, so `recv` takes `&self`. Implementations must be cancel
//! safe: the pipeline drops in-flight `recv` futures at shutdown, and a payload must
//! not be lost when that happens.
use std::io::{self, BufRead};

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use crate::error::SourceError;
use crate::metrics_consts::{PAYLOADS_TOO_LARGE, SOURCE_ERRORS};

/// An undecoded payload, exactly as the source delivered it.
pub type RawEvent = Vec<u8>;

// Lines read ahead of the ingestion workers
const LINE_BUFFER: usize = 1024;

#[async_trait]
pub trait EventSource: Send + Sync {
    /// Wait for the next payload. `SourceError::Closed` means no more will come.
    async fn recv(&self) -> Result<RawEvent, SourceError>;
}

/// Payloads pushed through a bounded channel. The source closes once every sender is
/// dropped and the buffered payloads are consumed.
pub struct ChannelSource {
    receiver: Mutex<mpsc::Receiver<RawEvent>>,
}

pub fn channel_source(capacity: usize) -> (mpsc::Sender<RawEvent>, ChannelSource) {
    let (tx, rx) = mpsc::channel(capacity);
    let source = ChannelSource {
        receiver: Mutex::new(rx),
    };
    (tx, source)
}

#[async_trait]
impl EventSource for ChannelSource {
    async fn recv(&self) -> Result<RawEvent, SourceError> {
        self.receiver
            .lock()
            .await
            .recv()
            .await
            .ok_or(SourceError::Closed)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Line {
    /// A line without its `\n` or `\r\n` terminator.
    Payload(RawEvent),
    /// A line longer than the limit, skipped. Carries its length in bytes.
    TooLarge(usize),
}

/// Splits a reader on `\n`, never holding more than `max_payload_bytes` of one line.
pub struct LineReader<R> {
    reader: R,
    max_payload_bytes: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R, max_payload_bytes: usize) -> Self {
        Self {
            reader,
            max_payload_bytes,
        }
    }

    /// The next line, or `None` at end of input. A last line without a terminator is
    /// still returned.
    pub fn next_line(&mut self) -> io::Result<Option<Line>> {
        let mut line = Vec::new();
        let mut length = 0;
        let mut too_large = false;

        loop {
            let available = match self.reader.fill_buf() {
                Ok(available) => available,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                if length == 0 {
                    return Ok(None);
                }
                break;
            }

            let newline = available.iter().position(|b| *b == b'\n');
            let chunk = &available[..newline.unwrap_or(available.len())];
            length += chunk.len();
            if length > self.max_payload_bytes {
                too_large = true;
                line = Vec::new();
            } else {
                line.extend_from_slice(chunk);
            }

            let consumed = newline.map_or(chunk.len(), |at| at + 1);
            self.reader.consume(consumed);
            if newline.is_some() {
                break;
            }
        }

        if too_large {
            return Ok(Some(Line::TooLarge(length)));
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(Some(Line::Payload(line)))
    }
}

/// Read newline-delimited payloads from `reader` on a dedicated thread. Blocking reads
/// never hold up the runtime, so a quiet reader can't keep the process alive once the
/// run is over. The source closes at end of input or on a read error.
pub fn line_source<R>(reader: R, max_payload_bytes: usize) -> io::Result<ChannelSource>
where
    R: BufRead + Send + 'static,
{
    let (tx, source) = channel_source(LINE_BUFFER);
    let mut lines = LineReader::new(reader, max_payload_bytes);

    std::thread::Builder::new()
        .name("line-reader".to_owned())
        .spawn(move || loop {
            match lines.next_line() {
                Ok(Some(Line::Payload(payload))) => {
                    // Only fails once the pipeline is gone
                    if tx.blocking_send(payload).is_err() {
                        break;
                    }
                }
                Ok(Some(Line::TooLarge(length))) => {
                    warn!(
                        "skipping {} byte payload, limit is {}",
                        length, max_payload_bytes
                    );
                    metrics::counter!(PAYLOADS_TOO_LARGE).increment(1);
                }
                Ok(None) => {
                    info!("end of input");
                    break;
                }
                Err(e) => {
                    error!("failed to read input: {}", e);
                    metrics::counter!(SOURCE_ERRORS).increment(1);
                    break;
                }
            }
        })?;

    Ok(source)
}

pub fn stdin_source(max_payload_bytes: usize) -> io::Result<ChannelSource> {
    line_source(io::BufReader::new(io::stdin()), max_payload_bytes)
}
