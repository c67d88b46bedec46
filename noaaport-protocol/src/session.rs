//! The per-connection read loop shared by the listener and the client.
//!
//! A session owns one parser and one input stream. It pulls bytes until the
//! peer hangs up, the stream fails, a fatal frame arrives, or `stop`
//! resolves. Nothing that goes wrong inside a session escapes it: the caller
//! gets a [`SessionSummary`] describing how it ended.

use std::ffi::OsString;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, info, warn};

use crate::error::{NoaaportError, Result};
use crate::message::{ParseStats, ParserConfig};
use crate::pdi::PdiFrameParser;
use crate::record::DcpRecord;
use crate::sink::RecordSink;
use crate::time;
use crate::wmo::WmoDcpParser;

/// Outer framing of the byte stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Framing {
    /// SOH / RS / ETX delimited bulletins.
    #[default]
    Direct,
    /// PDI data frames around the same bulletins.
    Pdi,
}

/// Everything a session needs besides its stream and sink.
#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    pub framing: Framing,
    pub parser: ParserConfig,
    /// Base path for raw byte capture. A UTC timestamp suffix is appended.
    pub capture_file: Option<PathBuf>,
    /// End the session if no byte arrives for this long.
    pub idle_timeout: Option<Duration>,
}

/// One parser instance, chosen by [`Framing`].
#[derive(Debug)]
pub enum Parser {
    Direct(WmoDcpParser),
    Pdi(PdiFrameParser),
}

impl Parser {
    pub fn new(framing: Framing, config: ParserConfig) -> Self {
        match framing {
            Framing::Direct => Self::Direct(WmoDcpParser::new(config)),
            Framing::Pdi => Self::Pdi(PdiFrameParser::new(config)),
        }
    }

    pub fn feed(&mut self, byte: u8) -> Result<Option<DcpRecord>> {
        match self {
            Self::Direct(p) => Ok(p.feed(byte)),
            Self::Pdi(p) => p.feed(byte),
        }
    }

    pub fn stats(&self) -> ParseStats {
        match self {
            Self::Direct(p) => p.stats(),
            Self::Pdi(p) => p.stats(),
        }
    }
}

/// Reads a stream one byte at a time, optionally teeing it to a capture file.
pub struct ByteReader<R> {
    reader: BufReader<R>,
    capture: Option<BufWriter<File>>,
    bytes: u64,
}

impl<R: AsyncRead + Unpin> ByteReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            capture: None,
            bytes: 0,
        }
    }

    /// Like [`new`](Self::new), also copying every byte to
    /// `<base>.<YYYYMMDD-HHMMSS>`. A capture file that cannot be created is
    /// logged and skipped.
    pub async fn with_capture(reader: R, base: &Path) -> Self {
        let mut this = Self::new(reader);
        let path = capture_path(base, SystemTime::now());
        match File::create(&path).await {
            Ok(file) => {
                info!(path = %path.display(), "capturing raw data");
                this.capture = Some(BufWriter::new(file));
            }
            Err(e) => warn!(path = %path.display(), error = %e, "cannot open capture file"),
        }
        this
    }

    /// Next byte, or `None` at end of stream.
    pub async fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = match self.reader.read_u8().await {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        };
        self.bytes += 1;
        if let Some(capture) = self.capture.as_mut()
            && let Err(e) = capture.write_u8(byte).await
        {
            warn!(error = %e, "capture write failed, capture disabled");
            self.capture = None;
        }
        Ok(Some(byte))
    }

    /// [`next_byte`](Self::next_byte) with an optional idle limit.
    pub async fn next_byte_within(&mut self, limit: Option<Duration>) -> Result<Option<u8>> {
        match limit {
            Some(limit) => tokio::time::timeout(limit, self.next_byte())
                .await
                .map_err(|_| NoaaportError::IdleTimeout(limit))?
                .map_err(NoaaportError::Io),
            None => self.next_byte().await.map_err(NoaaportError::Io),
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes
    }

    /// Flush and close the capture file, if any.
    pub async fn finish(&mut self) {
        if let Some(mut capture) = self.capture.take()
            && let Err(e) = capture.flush().await
        {
            warn!(error = %e, "capture flush failed");
        }
    }
}

/// `<base>.<YYYYMMDD-HHMMSS>`
pub fn capture_path(base: &Path, at: SystemTime) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(".");
    name.push(time::file_stamp(at));
    PathBuf::from(name)
}

/// How a session ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// Peer closed the stream.
    Eof,
    /// The caller's stop signal fired.
    Stopped,
    /// Read failure, idle timeout, or a fatal frame.
    Failed(NoaaportError),
}

#[derive(Debug)]
pub struct SessionSummary {
    pub end: SessionEnd,
    pub stats: ParseStats,
    pub bytes: u64,
}

impl SessionSummary {
    pub fn stopped(&self) -> bool {
        matches!(self.end, SessionEnd::Stopped)
    }
}

/// Parse `reader` until it ends, handing every record to `sink`.
pub async fn run_session<R, F>(
    reader: R,
    config: &SessionConfig,
    sink: &dyn RecordSink,
    stop: F,
) -> SessionSummary
where
    R: AsyncRead + Unpin,
    F: Future<Output = ()>,
{
    let mut input = match &config.capture_file {
        Some(base) => ByteReader::with_capture(reader, base).await,
        None => ByteReader::new(reader),
    };
    let mut parser = Parser::new(config.framing, config.parser.clone());
    debug!(framing = ?config.framing, "session started");

    tokio::pin!(stop);
    let end = loop {
        let next = tokio::select! {
            biased;
            _ = &mut stop => break SessionEnd::Stopped,
            next = input.next_byte_within(config.idle_timeout) => next,
        };
        match next {
            Ok(Some(byte)) => match parser.feed(byte) {
                Ok(Some(record)) => sink.archive(record),
                Ok(None) => {}
                Err(e) => break SessionEnd::Failed(e),
            },
            Ok(None) => break SessionEnd::Eof,
            Err(e) => break SessionEnd::Failed(e),
        }
    };
    input.finish().await;

    let stats = parser.stats();
    match &end {
        SessionEnd::Failed(e) => warn!(error = %e, bytes = input.bytes_read(), ?stats, "session failed"),
        other => info!(end = ?other, bytes = input.bytes_read(), ?stats, "session ended"),
    }

    SessionSummary {
        end,
        stats,
        bytes: input.bytes_read(),
    }
}
