//! # Core Protocol Components
//!
//! Pure encoding and decoding of the two binary wire formats. No I/O, no state.
//!
//! ## Components
//! - **Token**: 32-byte device token with hex parsing
//! - **Notification**: outbound "simple push" frame
//! - **Feedback**: inbound fixed-size feedback records
//! - **Codec**: Tokio decoder that splits the feedback stream into records
//!
//! ## Wire Format
//! ```text
//! Notification: [Command(1)=0] [TokenLen(2)] [Token(N)] [PayloadLen(2)] [Payload(<=256)]
//! Feedback:     [Timestamp(4)] [TokenLen(2)=32] [Token(32)]
//! ```
//!
//! All integers are big-endian.

pub mod codec;
pub mod feedback;
pub mod notification;
pub mod token;
