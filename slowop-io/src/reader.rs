//! Streaming reader for structured log files

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;

use flate2::read::MultiGzDecoder;
use serde::Serialize;
use slowop_format::constants::SLOW_QUERY_MESSAGE;
use slowop_format::{LogRecord, Result};
use tracing::{debug, trace};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Where log lines come from
pub enum InputSource {
    /// Log file on disk, plain or gzip compressed
    Path(PathBuf),
    /// Standard input
    Stdin,
    /// Arbitrary reader, plain or gzip compressed
    Reader(Box<dyn Read + Send>),
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            InputSource::Stdin => f.write_str("Stdin"),
            InputSource::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl InputSource {
    /// On-disk size of the input, when known.
    pub fn size_hint(&self) -> Option<u64> {
        match self {
            InputSource::Path(path) => std::fs::metadata(path).map(|meta| meta.len()).ok(),
            InputSource::Stdin | InputSource::Reader(_) => None,
        }
    }

    /// Open the source as a buffered line reader, decompressing gzip input.
    pub fn into_buf_read(self) -> Result<Box<dyn BufRead + Send>> {
        match self {
            InputSource::Path(path) => decompress_if_gzip(File::open(path)?),
            InputSource::Stdin => decompress_if_gzip(std::io::stdin()),
            InputSource::Reader(reader) => decompress_if_gzip(reader),
        }
    }
}

/// Sniff the gzip magic bytes and wrap the stream in a decoder if present.
fn decompress_if_gzip<R: Read + Send + 'static>(reader: R) -> Result<Box<dyn BufRead + Send>> {
    let mut buffered = BufReader::new(reader);
    let is_gzip = buffered.fill_buf()?.starts_with(&GZIP_MAGIC);
    if is_gzip {
        debug!("gzip input detected");
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(buffered))))
    } else {
        Ok(Box::new(buffered))
    }
}

/// Line level counters collected while reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReaderStats {
    /// Lines consumed from the input
    pub lines_read: u64,
    /// Empty or whitespace-only lines
    pub blank_lines: u64,
    /// Lines that were not a JSON log object
    pub malformed_lines: u64,
    /// Well formed lines whose message is not a slow operation
    pub skipped_messages: u64,
}

/// Iterator over the slow operation records of a line oriented log.
///
/// Malformed lines are counted and skipped. Only I/O failures end the
/// iteration with an error.
pub struct LogReader<R: BufRead> {
    reader: R,
    line: Vec<u8>,
    all_messages: bool,
    stats: ReaderStats,
}

impl<R: BufRead> LogReader<R> {
    /// Reader that yields `Slow query` lines only
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            all_messages: false,
            stats: ReaderStats::default(),
        }
    }

    /// Yield every well formed line regardless of its message
    pub fn with_all_messages(mut self, all_messages: bool) -> Self {
        self.all_messages = all_messages;
        self
    }

    /// Counters so far
    pub fn stats(&self) -> &ReaderStats {
        &self.stats
    }

    fn next_record(&mut self) -> Result<Option<LogRecord>> {
        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line)? == 0 {
                return Ok(None);
            }
            self.stats.lines_read += 1;

            if self.line.iter().all(u8::is_ascii_whitespace) {
                self.stats.blank_lines += 1;
                continue;
            }

            let record: LogRecord = match serde_json::from_slice(&self.line) {
                Ok(record) => record,
                Err(err) => {
                    self.stats.malformed_lines += 1;
                    debug!(line = self.stats.lines_read, error = %err, "skipping malformed line");
                    continue;
                }
            };

            if !self.all_messages && record.message != SLOW_QUERY_MESSAGE {
                self.stats.skipped_messages += 1;
                trace!(line = self.stats.lines_read, msg = %record.message, "skipping message");
                continue;
            }

            return Ok(Some(record));
        }
    }
}

impl<R: BufRead> Iterator for LogReader<R> {
    type Item = Result<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
