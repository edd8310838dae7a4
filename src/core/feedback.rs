//! # Feedback Records
//!
//! The feedback service streams fixed 38-byte records naming device tokens
//! that should no longer be targeted:
//!
//! ```text
//! bytes 0..4   : timestamp, seconds since the Unix epoch (u32, big-endian)
//! bytes 4..6   : token length (u16, big-endian, always 32 in practice)
//! bytes 6..38  : device token
//! ```
//!
//! The stream has no terminator. It ends when the peer closes, and a trailing
//! block shorter than 38 bytes is treated as the end rather than an error.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::{BufMut, Bytes, BytesMut};

use crate::core::token::{DeviceToken, TOKEN_SIZE};

/// Size of one feedback record on the wire
pub const FEEDBACK_RECORD_SIZE: usize = 4 + 2 + TOKEN_SIZE;

/// A device token the feedback service reported, and when it did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackRecord {
    pub timestamp: SystemTime,
    pub device_token: DeviceToken,
}

impl FeedbackRecord {
    /// Seconds since the Unix epoch, as carried on the wire
    pub fn unix_timestamp(&self) -> u32 {
        self.timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0)
    }
}

/// Decode one record from the front of `bytes`.
///
/// Returns `None` when fewer than [`FEEDBACK_RECORD_SIZE`] bytes are
/// available. The length field is not checked; the token is always the
/// 32 bytes that follow it.
pub fn decode_feedback_record(bytes: &[u8]) -> Option<FeedbackRecord> {
    if bytes.len() < FEEDBACK_RECORD_SIZE {
        return None;
    }

    let secs = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let mut token = [0u8; TOKEN_SIZE];
    token.copy_from_slice(&bytes[6..FEEDBACK_RECORD_SIZE]);

    Some(FeedbackRecord {
        timestamp: UNIX_EPOCH + Duration::from_secs(u64::from(secs)),
        device_token: DeviceToken::new(token),
    })
}

/// Encode a record the way the feedback service sends it
pub fn encode_feedback_record(timestamp: u32, token: &DeviceToken) -> Bytes {
    let mut buf = BytesMut::with_capacity(FEEDBACK_RECORD_SIZE);
    buf.put_u32(timestamp);
    buf.put_u16(TOKEN_SIZE as u16);
    buf.put_slice(token.as_bytes());
    buf.freeze()
}
