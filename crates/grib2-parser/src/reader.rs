//! Message framing over byte streams.
//!
//! Messages are located by the `GRIB` magic and read whole using the total
//! length from section 0. One message is held in memory at a time.

use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::message::Grib2Message;
use crate::tables::Grib2Tables;
use crate::Grib2Error;

const MAGIC: &[u8; 4] = b"GRIB";
const END_MARKER: &[u8; 4] = b"7777";
const INDICATOR_LENGTH: usize = 16;

/// Where the scan for the next message stopped.
enum Scan {
    Magic { skipped: u64 },
    EndOfStream { skipped: u64 },
}

/// Reads GRIB2 messages sequentially from any seekable byte stream.
pub struct Grib2StreamReader<R> {
    inner: R,
    tables: Arc<Grib2Tables>,
    messages_read: usize,
    exhausted: bool,
}

impl<R: Read + Seek> Grib2StreamReader<R> {
    pub fn new(inner: R, tables: Arc<Grib2Tables>) -> Self {
        Self {
            inner,
            tables,
            messages_read: 0,
            exhausted: false,
        }
    }

    /// Number of messages returned since the start of the stream.
    pub fn messages_read(&self) -> usize {
        self.messages_read
    }

    /// Seek back to the first byte so the stream can be read again.
    pub fn rewind(&mut self) -> Result<(), Grib2Error> {
        self.inner.seek(SeekFrom::Start(0))?;
        self.messages_read = 0;
        self.exhausted = false;
        Ok(())
    }

    /// Read and parse the next message. After the end of the stream, or
    /// after an error, returns `Ok(None)` until rewound.
    pub fn next_message(&mut self) -> Result<Option<Grib2Message>, Grib2Error> {
        let raw = match self.next_raw() {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.exhausted = true;
                return Err(e);
            }
        };

        match Grib2Message::parse(raw, &self.tables) {
            Ok(message) => {
                debug!(
                    index = self.messages_read,
                    parameter = message.parameter(),
                    length = message.indicator.message_length,
                    "Parsed GRIB2 message"
                );
                self.messages_read += 1;
                Ok(Some(message))
            }
            Err(e) => {
                self.exhausted = true;
                Err(e)
            }
        }
    }

    /// Read the bytes of the next message without parsing its sections.
    pub fn next_raw(&mut self) -> Result<Option<Bytes>, Grib2Error> {
        if self.exhausted {
            return Ok(None);
        }

        let skipped = match self.scan_to_magic()? {
            Scan::Magic { skipped } => skipped,
            Scan::EndOfStream { skipped: 0 } => {
                self.exhausted = true;
                return Ok(None);
            }
            Scan::EndOfStream { skipped } => {
                self.exhausted = true;
                if self.messages_read == 0 {
                    return Err(Grib2Error::InvalidFormat(format!(
                        "No GRIB message found in {} bytes",
                        skipped
                    )));
                }
                warn!(bytes = skipped, "Ignoring trailing bytes after last GRIB message");
                return Ok(None);
            }
        };

        if skipped > 0 {
            warn!(bytes = skipped, "Skipped bytes before GRIB message");
        }

        let mut header = [0u8; INDICATOR_LENGTH];
        header[..4].copy_from_slice(MAGIC);
        self.read_exact_or_truncated(&mut header[4..8])?;
        let edition = header[7];
        if edition != 2 {
            return Err(Grib2Error::UnsupportedEdition(edition));
        }
        self.read_exact_or_truncated(&mut header[8..])?;

        let length = u64::from_be_bytes([
            header[8], header[9], header[10], header[11], header[12], header[13], header[14],
            header[15],
        ]);
        let length = usize::try_from(length)
            .ok()
            .filter(|&l| l >= INDICATOR_LENGTH + END_MARKER.len())
            .ok_or_else(|| {
                Grib2Error::InvalidFormat(format!("Implausible message length {}", length))
            })?;

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(length)
            .map_err(|_| Grib2Error::InvalidFormat(format!("Cannot buffer {} byte message", length)))?;
        buffer.extend_from_slice(&header);
        buffer.resize(length, 0);
        self.read_exact_or_truncated(&mut buffer[INDICATOR_LENGTH..])?;

        if &buffer[length - END_MARKER.len()..] != END_MARKER {
            return Err(Grib2Error::InvalidFormat(
                "Message does not end with 7777".to_string(),
            ));
        }

        Ok(Some(Bytes::from(buffer)))
    }

    fn read_exact_or_truncated(&mut self, buf: &mut [u8]) -> Result<(), Grib2Error> {
        self.inner.read_exact(buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => {
                Grib2Error::InvalidFormat("Truncated GRIB message".to_string())
            }
            _ => Grib2Error::Io(e),
        })
    }

    fn scan_to_magic(&mut self) -> Result<Scan, Grib2Error> {
        let mut window = [0u8; 4];
        let mut filled = 0usize;
        let mut skipped = 0u64;
        let mut byte = [0u8; 1];

        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => {
                    return Ok(Scan::EndOfStream {
                        skipped: skipped + filled as u64,
                    })
                }
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }

            if filled < window.len() {
                window[filled] = byte[0];
                filled += 1;
            } else {
                window.rotate_left(1);
                window[3] = byte[0];
                skipped += 1;
            }

            if filled == window.len() && &window == MAGIC {
                return Ok(Scan::Magic { skipped });
            }
        }
    }
}

impl<R: Read + Seek> Iterator for Grib2StreamReader<R> {
    type Item = Result<Grib2Message, Grib2Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_message().transpose()
    }
}

/// Reads GRIB2 messages from an in-memory buffer.
pub struct Grib2Reader {
    inner: Grib2StreamReader<Cursor<Bytes>>,
}

impl Grib2Reader {
    pub fn new(data: Bytes, tables: Arc<Grib2Tables>) -> Self {
        Self {
            inner: Grib2StreamReader::new(Cursor::new(data), tables),
        }
    }

    pub fn next_message(&mut self) -> Result<Option<Grib2Message>, Grib2Error> {
        self.inner.next_message()
    }

    pub fn rewind(&mut self) -> Result<(), Grib2Error> {
        self.inner.rewind()
    }

    pub fn messages_read(&self) -> usize {
        self.inner.messages_read()
    }
}

impl Iterator for Grib2Reader {
    type Item = Result<Grib2Message, Grib2Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
