//! Frame and Command Parsing
//!
//! Two layers with different failure consequences:
//!
//! 1. **Frame decoding** pulls `<decimal length>\r\n<payload>` frames off
//!    the byte stream. A malformed frame means the stream position is
//!    unrecoverable, so frame errors terminate the connection.
//! 2. **Command parsing** interprets a complete payload. Command errors
//!    (unknown command, wrong arity, bad TTL) produce an `-ERR` reply and
//!    the connection continues.
//!
//! The decoder is incremental: callers append incoming network data to a
//! buffer and retry. `Ok(Some((payload, consumed)))` means a full frame
//! was decoded and `consumed` bytes should be dropped from the buffer;
//! `Ok(None)` means more data is needed; `Err` means the stream is broken.

use bytes::Bytes;
use thiserror::Error;

use crate::protocol::types::Command;

/// Longest accepted `<decimal length>` header, digits only. 20 digits
/// covers u64; anything longer is garbage.
const MAX_LENGTH_DIGITS: usize = 20;

/// Frame-level errors. All of these close the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The length header contains something other than ASCII digits.
    #[error("invalid frame length header")]
    InvalidLengthHeader,

    /// No CRLF after a plausible length header within the digit limit.
    #[error("frame length header missing CRLF terminator")]
    MissingHeaderTerminator,

    /// The declared payload length exceeds the configured ceiling.
    #[error("frame of {size} bytes exceeds limit of {max}")]
    FrameTooLarge { size: usize, max: usize },
}

/// Command-level errors. These become `-ERR` replies.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command")]
    UnknownCommand,

    #[error("wrong number of arguments for '{0}'")]
    WrongArity(&'static str),

    #[error("PX requires a positive integer in milliseconds")]
    InvalidTtl,
}

/// Incremental decoder for length-prefixed frames.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    max_payload_bytes: usize,
}

impl FrameDecoder {
    /// Creates a decoder that rejects payloads larger than
    /// `max_payload_bytes`.
    pub fn new(max_payload_bytes: usize) -> Self {
        Self { max_payload_bytes }
    }

    /// Attempts to decode one frame from the front of `buf`.
    ///
    /// Returns the payload and the total number of bytes consumed
    /// (header, CRLF, and payload), or `Ok(None)` when the frame is not
    /// yet complete.
    pub fn decode(&self, buf: &[u8]) -> Result<Option<(Bytes, usize)>, FrameError> {
        let header_end = match find_crlf(buf) {
            Some(pos) => pos,
            None => {
                // Without a CRLF yet, the prefix must still look like a
                // length header in progress: digits, optionally ending in
                // the '\r' whose '\n' has not arrived.
                if buf.len() > MAX_LENGTH_DIGITS + 1 {
                    return Err(FrameError::MissingHeaderTerminator);
                }
                let digits = match buf.split_last() {
                    Some((&b'\r', head)) => head,
                    _ => buf,
                };
                if !digits.iter().all(u8::is_ascii_digit) {
                    return Err(FrameError::InvalidLengthHeader);
                }
                return Ok(None);
            }
        };

        if header_end == 0 || header_end > MAX_LENGTH_DIGITS {
            return Err(FrameError::InvalidLengthHeader);
        }

        let header = &buf[..header_end];
        if !header.iter().all(u8::is_ascii_digit) {
            return Err(FrameError::InvalidLengthHeader);
        }

        // Digits only and at most 20 of them; u64 is the worst case.
        let length = std::str::from_utf8(header)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or(FrameError::InvalidLengthHeader)? as usize;

        if length > self.max_payload_bytes {
            return Err(FrameError::FrameTooLarge {
                size: length,
                max: self.max_payload_bytes,
            });
        }

        let payload_start = header_end + 2;
        let total = payload_start + length;
        if buf.len() < total {
            return Ok(None);
        }

        let payload = Bytes::copy_from_slice(&buf[payload_start..total]);
        Ok(Some((payload, total)))
    }
}

/// Parses a complete frame payload into a [`Command`].
pub fn parse_command(payload: &[u8]) -> Result<Command, CommandError> {
    let mut tokens: Vec<&[u8]> = Vec::new();
    for token in payload.split(|b| *b == b' ') {
        if token.is_empty() {
            // Covers the empty payload as well as leading, trailing, or
            // doubled spaces; keys and values are opaque but never empty.
            return Err(CommandError::Empty);
        }
        tokens.push(token);
    }

    let command = tokens[0];
    if command.eq_ignore_ascii_case(b"SET") {
        parse_set(&tokens)
    } else if command.eq_ignore_ascii_case(b"GET") {
        match &tokens[1..] {
            [key] => Ok(Command::Get {
                key: Bytes::copy_from_slice(key),
            }),
            _ => Err(CommandError::WrongArity("GET")),
        }
    } else if command.eq_ignore_ascii_case(b"DEL") {
        match &tokens[1..] {
            [key] => Ok(Command::Del {
                key: Bytes::copy_from_slice(key),
            }),
            _ => Err(CommandError::WrongArity("DEL")),
        }
    } else {
        Err(CommandError::UnknownCommand)
    }
}

fn parse_set(tokens: &[&[u8]]) -> Result<Command, CommandError> {
    match &tokens[1..] {
        [key, value] => Ok(Command::Set {
            key: Bytes::copy_from_slice(key),
            value: Bytes::copy_from_slice(value),
            ttl_ms: None,
        }),
        [key, value, px, ttl] if px.eq_ignore_ascii_case(b"PX") => {
            let ttl_ms = std::str::from_utf8(ttl)
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or(CommandError::InvalidTtl)?;
            Ok(Command::Set {
                key: Bytes::copy_from_slice(key),
                value: Bytes::copy_from_slice(value),
                ttl_ms: Some(ttl_ms),
            })
        }
        _ => Err(CommandError::WrongArity("SET")),
    }
}

/// Position of the first CRLF, if present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder() -> FrameDecoder {
        FrameDecoder::new(1024)
    }

    #[test]
    fn test_decode_complete_frame() {
        let (payload, consumed) = decoder().decode(b"11\r\nSET a hello").unwrap().unwrap();
        assert_eq!(payload, Bytes::from("SET a hello"));
        assert_eq!(consumed, 15);
    }

    #[test]
    fn test_decode_incomplete_header() {
        assert_eq!(decoder().decode(b"11"), Ok(None));
        assert_eq!(decoder().decode(b"11\r"), Ok(None));
        assert_eq!(decoder().decode(b""), Ok(None));
    }

    #[test]
    fn test_decode_incomplete_payload() {
        assert_eq!(decoder().decode(b"11\r\nSET a he"), Ok(None));
    }

    #[test]
    fn test_decode_two_frames_back_to_back() {
        let buf = b"5\r\nGET a5\r\nGET b";
        let (payload, consumed) = decoder().decode(buf).unwrap().unwrap();
        assert_eq!(payload, Bytes::from("GET a"));
        assert_eq!(consumed, 8);

        let (payload, _) = decoder().decode(&buf[consumed..]).unwrap().unwrap();
        assert_eq!(payload, Bytes::from("GET b"));
    }

    #[test]
    fn test_decode_rejects_non_numeric_header() {
        assert_eq!(
            decoder().decode(b"abc\r\nxx"),
            Err(FrameError::InvalidLengthHeader)
        );
        // Garbage is detected even before the CRLF arrives.
        assert_eq!(
            decoder().decode(b"GET a"),
            Err(FrameError::InvalidLengthHeader)
        );
    }

    #[test]
    fn test_decode_rejects_empty_header() {
        assert_eq!(
            decoder().decode(b"\r\nGET a"),
            Err(FrameError::InvalidLengthHeader)
        );
    }

    #[test]
    fn test_decode_rejects_oversized_frame() {
        assert_eq!(
            decoder().decode(b"2048\r\n"),
            Err(FrameError::FrameTooLarge {
                size: 2048,
                max: 1024
            })
        );
    }

    #[test]
    fn test_decode_rejects_unterminated_header() {
        let buf = b"1234567890123456789012";
        assert_eq!(
            decoder().decode(buf),
            Err(FrameError::MissingHeaderTerminator)
        );
    }

    #[test]
    fn test_parse_set_without_ttl() {
        let cmd = parse_command(b"SET a hello").unwrap();
        assert_eq!(
            cmd,
            Command::Set {
                key: Bytes::from("a"),
                value: Bytes::from("hello"),
                ttl_ms: None,
            }
        );
    }

    #[test]
    fn test_parse_set_with_ttl() {
        let cmd = parse_command(b"SET k v PX 200").unwrap();
        assert_eq!(
            cmd,
            Command::Set {
                key: Bytes::from("k"),
                value: Bytes::from("v"),
                ttl_ms: Some(200),
            }
        );
    }

    #[test]
    fn test_parse_command_token_is_case_insensitive() {
        assert!(matches!(
            parse_command(b"set a b").unwrap(),
            Command::Set { .. }
        ));
        assert!(matches!(
            parse_command(b"get a").unwrap(),
            Command::Get { .. }
        ));
        assert!(matches!(
            parse_command(b"SET k v px 100").unwrap(),
            Command::Set {
                ttl_ms: Some(100),
                ..
            }
        ));
    }

    #[test]
    fn test_parse_get_and_del() {
        assert_eq!(
            parse_command(b"GET name").unwrap(),
            Command::Get {
                key: Bytes::from("name")
            }
        );
        assert_eq!(
            parse_command(b"DEL name").unwrap(),
            Command::Del {
                key: Bytes::from("name")
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_arity() {
        assert_eq!(parse_command(b"GET"), Err(CommandError::WrongArity("GET")));
        assert_eq!(
            parse_command(b"GET a b"),
            Err(CommandError::WrongArity("GET"))
        );
        assert_eq!(parse_command(b"SET a"), Err(CommandError::WrongArity("SET")));
        assert_eq!(
            parse_command(b"SET a b EX 10"),
            Err(CommandError::WrongArity("SET"))
        );
        assert_eq!(
            parse_command(b"DEL a b"),
            Err(CommandError::WrongArity("DEL"))
        );
    }

    #[test]
    fn test_parse_rejects_bad_ttl() {
        assert_eq!(
            parse_command(b"SET a b PX abc"),
            Err(CommandError::InvalidTtl)
        );
        assert_eq!(
            parse_command(b"SET a b PX -5"),
            Err(CommandError::InvalidTtl)
        );
        // Zero parses at this layer; the engine rejects it as an invalid
        // argument.
        assert!(matches!(
            parse_command(b"SET a b PX 0").unwrap(),
            Command::Set { ttl_ms: Some(0), .. }
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_and_empty() {
        assert_eq!(parse_command(b"PING"), Err(CommandError::UnknownCommand));
        assert_eq!(parse_command(b""), Err(CommandError::Empty));
        assert_eq!(parse_command(b"GET  a"), Err(CommandError::Empty));
    }

    #[test]
    fn test_parse_binary_safe_key_and_value() {
        let cmd = parse_command(b"SET k\x01 v\x00v").unwrap();
        assert_eq!(
            cmd,
            Command::Set {
                key: Bytes::from(&b"k\x01"[..]),
                value: Bytes::from(&b"v\x00v"[..]),
                ttl_ms: None,
            }
        );
    }
}
