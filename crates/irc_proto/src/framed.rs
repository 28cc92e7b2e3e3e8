//! Bridges a byte stream to [`Message`] via `tokio_util::codec`, so both
//! the client and server connection tasks frame lines the same way
//! instead of hand-rolling buffering on each side.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{self, CodecError};
use crate::icase::ICaseStr;
use crate::message::Message;

#[derive(Debug, Default, Clone, Copy)]
pub struct IrcLineCodec;

impl Decoder for IrcLineCodec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, CodecError> {
        let Some(newline_pos) = src.iter().position(|&b| b == b'\n') else {
            return Ok(None);
        };

        let line = src.split_to(newline_pos + 1);

        let line = std::str::from_utf8(&line[..line.len() - 1])
            .map_err(|e| CodecError::Malformed(format!("invalid utf-8: {e}")))?;
        let line = line.trim_end_matches('\r');

        if line.is_empty() {
            // RFC 1459 2.3: empty messages are silently ignored.
            return self.decode(src);
        }

        codec::parse(line).map(Some)
    }
}

impl Encoder<Message> for IrcLineCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), CodecError> {
        self.encode(item.args, dst)
    }
}

/// Encodes a raw argument list as one outbound frame without requiring a
/// full `Message` (used for client-originated lines, which carry no
/// prefix and usually no tags).
impl Encoder<Vec<ICaseStr>> for IrcLineCodec {
    type Error = CodecError;

    fn encode(&mut self, args: Vec<ICaseStr>, dst: &mut BytesMut) -> Result<(), CodecError> {
        let line = codec::serialize(&args);
        dst.extend_from_slice(line.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_one_line_at_a_time() {
        let mut codec = IrcLineCodec;
        let mut buf = BytesMut::from("PING :abc\r\nNICK bob\r\n");
        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.verb_str(), Some("PING"));
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.verb_str(), Some("NICK"));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn skips_empty_lines() {
        let mut codec = IrcLineCodec;
        let mut buf = BytesMut::from("\r\nNICK bob\r\n");
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(msg.verb_str(), Some("NICK"));
    }
}
