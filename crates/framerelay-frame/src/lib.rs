//! Length-prefixed message framing for the framerelay wire protocol.
//!
//! Every message is framed with a 2-byte little-endian payload length
//! followed by the payload itself. Relay payloads are UTF-32LE text.
//!
//! No partial reads, no buffer management in user code.

pub mod codec;
pub mod error;
pub mod reader;
pub mod text;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, FrameCodec, FrameConfig, DEFAULT_BUFFER_CAPACITY,
    DEFAULT_MAX_PAYLOAD, HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use text::{decode_utf32, encode_utf32};
pub use writer::FrameWriter;
