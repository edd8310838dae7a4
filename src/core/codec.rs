//! # Feedback Codec
//!
//! [`tokio_util::codec::Decoder`] for the feedback stream, so it can be read
//! through a `FramedRead`. Each complete 38-byte record becomes one
//! [`FeedbackRecord`]; a partial record left when the peer closes is dropped.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::debug;

use crate::core::feedback::{decode_feedback_record, FeedbackRecord, FEEDBACK_RECORD_SIZE};
use crate::error::ProtocolError;

/// Splits the feedback byte stream into [`FeedbackRecord`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct FeedbackCodec;

impl Decoder for FeedbackCodec {
    type Item = FeedbackRecord;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match decode_feedback_record(&src[..]) {
            Some(record) => {
                src.advance(FEEDBACK_RECORD_SIZE);
                Ok(Some(record))
            }
            None => {
                src.reserve(FEEDBACK_RECORD_SIZE - src.len());
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(record) = self.decode(src)? {
            return Ok(Some(record));
        }

        // Partial trailing record: the stream is exhausted, not broken
        if !src.is_empty() {
            debug!(leftover = src.len(), "Discarding partial feedback record");
            src.clear();
        }
        Ok(None)
    }
}
