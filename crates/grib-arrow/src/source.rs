//! Where messages come from.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use grib2_parser::{Grib2Error, Grib2Message, Grib2Reader, Grib2StreamReader, Grib2Tables};

use crate::error::{GribArrowError, Result};

/// A forward cursor over the messages of one GRIB file.
pub trait MessageSource {
    /// Decode the next message, or `None` at the end of the file.
    fn next_message(&mut self) -> std::result::Result<Option<Grib2Message>, Grib2Error>;

    /// Go back to the first message.
    fn rewind(&mut self) -> std::result::Result<(), Grib2Error>;

    /// Messages returned since the source was opened or last rewound.
    fn messages_read(&self) -> usize;
}

impl<R: Read + Seek> MessageSource for Grib2StreamReader<R> {
    fn next_message(&mut self) -> std::result::Result<Option<Grib2Message>, Grib2Error> {
        Grib2StreamReader::next_message(self)
    }

    fn rewind(&mut self) -> std::result::Result<(), Grib2Error> {
        Grib2StreamReader::rewind(self)
    }

    fn messages_read(&self) -> usize {
        Grib2StreamReader::messages_read(self)
    }
}

impl MessageSource for Grib2Reader {
    fn next_message(&mut self) -> std::result::Result<Option<Grib2Message>, Grib2Error> {
        Grib2Reader::next_message(self)
    }

    fn rewind(&mut self) -> std::result::Result<(), Grib2Error> {
        Grib2Reader::rewind(self)
    }

    fn messages_read(&self) -> usize {
        Grib2Reader::messages_read(self)
    }
}

/// Open a GRIB file. Nothing is decoded until the first message is read.
pub fn open_file(path: &Path, tables: Arc<Grib2Tables>) -> Result<Box<dyn MessageSource>> {
    let not_found = || GribArrowError::FileNotFound(path.to_path_buf());

    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => not_found(),
        _ => GribArrowError::Io(e),
    })?;
    if !metadata.is_file() {
        return Err(not_found());
    }

    let file = File::open(path)?;
    Ok(Box::new(Grib2StreamReader::new(BufReader::new(file), tables)))
}

/// A source over an in-memory file image.
pub fn from_bytes(data: Bytes, tables: Arc<Grib2Tables>) -> Box<dyn MessageSource> {
    Box::new(Grib2Reader::new(data, tables))
}
