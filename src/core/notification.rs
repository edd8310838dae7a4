//! # Notification Frame
//!
//! Encoding of the outbound "simple push" frame.
//!
//! ```text
//! byte    0      : command (0)
//! bytes   1-2    : token length (u16, big-endian)
//! bytes   3..N   : device token
//! next    2      : payload length (u16, big-endian)
//! rest           : payload (at most 256 bytes)
//! ```
//!
//! The frame has no identifier and the gateway never acknowledges it, so a
//! frame written to a healthy socket may still be dropped silently.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::core::token::DeviceToken;
use crate::error::{ProtocolError, Result};

/// Command byte identifying a simple push frame
pub const COMMAND_SIMPLE_PUSH: u8 = 0;

/// Hard ceiling the gateway puts on a payload
pub const MAX_PAYLOAD_SIZE: usize = 256;

/// Fixed bytes around token and payload: command + two length prefixes
pub const FRAME_OVERHEAD: usize = 1 + 2 + 2;

/// A single notification addressed to one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub device_token: DeviceToken,
    pub payload: Bytes,
}

impl Notification {
    pub fn new(device_token: DeviceToken, payload: impl Into<Bytes>) -> Self {
        Self {
            device_token,
            payload: payload.into(),
        }
    }

    /// Build a notification whose payload is the JSON encoding of `body`
    pub fn json<T: Serialize + ?Sized>(device_token: DeviceToken, body: &T) -> Result<Self> {
        let payload = serde_json::to_vec(body)
            .map_err(|e| ProtocolError::EncodingError(format!("Failed to encode payload: {e}")))?;
        Ok(Self::new(device_token, payload))
    }

    /// Encode into a wire frame
    pub fn encode(&self) -> Result<Bytes> {
        encode_notification(&self.device_token, &self.payload)
    }
}

/// Encode a token and payload into a simple push frame.
///
/// Fails with [`ProtocolError::PayloadTooLarge`] before producing any bytes
/// if the payload exceeds [`MAX_PAYLOAD_SIZE`].
pub fn encode_notification(token: &DeviceToken, payload: &[u8]) -> Result<Bytes> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let token = token.as_bytes();
    let mut buf = BytesMut::with_capacity(FRAME_OVERHEAD + token.len() + payload.len());
    buf.put_u8(COMMAND_SIMPLE_PUSH);
    buf.put_u16(token.len() as u16);
    buf.put_slice(token);
    buf.put_u16(payload.len() as u16);
    buf.put_slice(payload);

    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::token::TOKEN_SIZE;

    fn token() -> DeviceToken {
        DeviceToken::new([0xAA; TOKEN_SIZE])
    }

    #[test]
    fn test_frame_layout() {
        let frame = encode_notification(&token(), b"{}").unwrap();

        assert_eq!(frame.len(), FRAME_OVERHEAD + TOKEN_SIZE + 2);
        assert_eq!(frame[0], COMMAND_SIMPLE_PUSH);
        assert_eq!(&frame[1..3], &[0x00, 0x20]);
        assert_eq!(&frame[3..35], &[0xAA; TOKEN_SIZE]);
        assert_eq!(&frame[35..37], &[0x00, 0x02]);
        assert_eq!(&frame[37..], b"{}");
    }

    #[test]
    fn test_payload_at_ceiling_accepted() {
        let payload = vec![b'x'; MAX_PAYLOAD_SIZE];
        let frame = encode_notification(&token(), &payload).unwrap();
        assert_eq!(&frame[35..37], &[0x01, 0x00]);
        assert_eq!(frame.len(), FRAME_OVERHEAD + TOKEN_SIZE + MAX_PAYLOAD_SIZE);
    }

    #[test]
    fn test_payload_over_ceiling_rejected() {
        let payload = vec![b'x'; MAX_PAYLOAD_SIZE + 1];
        match encode_notification(&token(), &payload) {
            Err(ProtocolError::PayloadTooLarge { size, max }) => {
                assert_eq!(size, 257);
                assert_eq!(max, 256);
            }
            other => panic!("Unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_empty_payload() {
        let frame = encode_notification(&token(), &[]).unwrap();
        assert_eq!(&frame[35..], &[0x00, 0x00]);
    }

    #[test]
    fn test_json_payload() {
        let body = serde_json::json!({ "aps": { "alert": "hi" } });
        let n = Notification::json(token(), &body).unwrap();
        assert_eq!(&n.payload[..], br#"{"aps":{"alert":"hi"}}"#);
        assert_eq!(n.encode().unwrap()[37..], n.payload[..]);
    }

    #[test]
    fn test_unserializable_body_is_encoding_error() {
        // JSON object keys must be strings
        let mut body = std::collections::BTreeMap::new();
        body.insert((1u8, 2u8), "alert");

        match Notification::json(token(), &body) {
            Err(ProtocolError::EncodingError(msg)) => assert!(msg.contains("Failed to encode payload")),
            other => panic!("Unexpected result: {other:?}"),
        }
    }
}
