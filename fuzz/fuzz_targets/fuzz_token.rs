#![no_main]

use apns_protocol::core::token::DeviceToken;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Token parsing from untrusted text and bytes
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(token) = DeviceToken::from_hex(s) {
            assert_eq!(DeviceToken::from_hex(&token.to_hex()).ok(), Some(token));
        }
    }
    let _ = DeviceToken::from_bytes(data);
});
