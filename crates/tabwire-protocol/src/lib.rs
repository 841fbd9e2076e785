//! tabwire protocol
//!
//! One message unit on the duplex channel is an [`Envelope`]: a caller-assigned
//! correlation id plus either a command payload (inbound) or a result/error
//! (outbound). Envelopes are framed the way browser native messaging frames
//! them: a 32-bit length in native byte order followed by UTF-8 JSON.

mod codec;
mod envelope;
mod error;

pub use codec::{CodecError, EnvelopeCodec, Inbound, MAX_MESSAGE_SIZE, MAX_REPLY_SIZE};
pub use envelope::{Envelope, Request, RequestError};
pub use error::ErrorKind;
