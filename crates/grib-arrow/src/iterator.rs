//! Traversal over the messages of a reader.

use std::iter::FusedIterator;

use tracing::warn;

use crate::error::{GribArrowError, Result};
use crate::message::GribMessage;
use crate::reader::ReaderContext;
use crate::source::MessageSource;

/// Yields one decoded message per step.
///
/// Each step parses the next message and unpacks its grid, so any decode
/// failure (a corrupt or compressed file, an unsupported grid or packing
/// template) is returned from the `next` call that reached it. After a
/// failure, or the end of the file, the iterator yields nothing more.
pub struct MessageIterator<'r> {
    source: &'r mut dyn MessageSource,
    context: &'r ReaderContext,
    pending: Option<GribArrowError>,
    finished: bool,
}

impl<'r> MessageIterator<'r> {
    /// `pending` is reported by the first call to `next`.
    pub(crate) fn new(
        source: &'r mut dyn MessageSource,
        context: &'r ReaderContext,
        pending: Option<GribArrowError>,
    ) -> Self {
        Self {
            source,
            context,
            pending,
            finished: false,
        }
    }

    fn fail(&mut self, message_id: i64, err: GribArrowError) -> GribArrowError {
        self.finished = true;
        warn!(message_id, error = %err, "Failed to decode GRIB message");
        err
    }
}

impl<'r> Iterator for MessageIterator<'r> {
    type Item = Result<GribMessage<'r>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending.take() {
            self.finished = true;
            return Some(Err(err));
        }
        if self.finished {
            return None;
        }

        let message_id = self.source.messages_read() as i64;
        match self.source.next_message() {
            Ok(Some(message)) => {
                let message = GribMessage::new(message, message_id, self.context);
                match message.grid().map(|_| ()) {
                    Ok(()) => Some(Ok(message)),
                    Err(e) => Some(Err(self.fail(message_id, e))),
                }
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => Some(Err(self.fail(message_id, e.into()))),
        }
    }
}

impl FusedIterator for MessageIterator<'_> {}
