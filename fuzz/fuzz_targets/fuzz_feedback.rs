#![no_main]

use apns_protocol::core::codec::FeedbackCodec;
use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Arbitrary feedback streams must split into records without panicking
    let mut codec = FeedbackCodec;
    let mut buf = BytesMut::from(data);
    while let Ok(Some(_)) = codec.decode(&mut buf) {}
    let _ = codec.decode_eof(&mut buf);
    assert!(buf.is_empty());
});
