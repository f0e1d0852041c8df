//! Wire Protocol Types
//!
//! KVMemo speaks a length-prefixed text protocol over TCP: one request,
//! one response, no pipelining.
//!
//! ## Request framing
//!
//! ```text
//! <decimal length>\r\n<payload of exactly that many bytes>
//! ```
//!
//! The payload is a space-separated command:
//!
//! ```text
//! SET <key> <value>              store without TTL
//! SET <key> <value> PX <ttl_ms>  store with TTL in milliseconds
//! GET <key>                      fetch a value
//! DEL <key>                      delete a key
//! ```
//!
//! The command token is ASCII case-insensitive.
//!
//! ## Replies
//!
//! Every reply is CRLF-terminated so it is self-delimiting on the stream:
//!
//! ```text
//! +OK\r\n                 write or delete acknowledged
//! $<len>\r\n<value>\r\n   GET hit
//! $-1\r\n                 GET miss (absent or expired)
//! -ERR <cause>\r\n        invalid command, arity, TTL, or internal failure
//! ```

use bytes::Bytes;

/// The CRLF terminator used by the framing and by every reply.
pub const CRLF: &[u8] = b"\r\n";

/// Reply marker for a missing key.
pub const MISS_REPLY: &[u8] = b"$-1\r\n";

/// Reply for an acknowledged write or delete.
pub const OK_REPLY: &[u8] = b"+OK\r\n";

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store `key = value`, optionally expiring after `ttl_ms`.
    Set {
        key: Bytes,
        value: Bytes,
        ttl_ms: Option<u64>,
    },
    /// Fetch the value for `key`.
    Get { key: Bytes },
    /// Delete `key`.
    Del { key: Bytes },
}

/// A reply to a single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `+OK`
    Ok,
    /// `$<len>` followed by the value bytes.
    Value(Bytes),
    /// `$-1`: key absent or expired.
    Miss,
    /// `-ERR <cause>`.
    Error(String),
}

impl Response {
    /// Builds an error reply from anything printable.
    pub fn error(cause: impl std::fmt::Display) -> Self {
        Response::Error(cause.to_string())
    }

    /// Serializes the reply into wire bytes.
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Response::Ok => OK_REPLY.to_vec(),
            Response::Miss => MISS_REPLY.to_vec(),
            Response::Value(value) => {
                let mut out = Vec::with_capacity(value.len() + 16);
                out.extend_from_slice(format!("${}", value.len()).as_bytes());
                out.extend_from_slice(CRLF);
                out.extend_from_slice(value);
                out.extend_from_slice(CRLF);
                out
            }
            Response::Error(cause) => {
                let mut out = Vec::with_capacity(cause.len() + 8);
                out.extend_from_slice(b"-ERR ");
                out.extend_from_slice(cause.as_bytes());
                out.extend_from_slice(CRLF);
                out
            }
        }
    }
}

/// Frames a payload for sending: `<len>\r\n<payload>`.
///
/// Used by tests and client tooling; the server only decodes frames.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 8);
    out.extend_from_slice(payload.len().to_string().as_bytes());
    out.extend_from_slice(CRLF);
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_ok() {
        assert_eq!(Response::Ok.serialize(), b"+OK\r\n");
    }

    #[test]
    fn test_serialize_miss() {
        assert_eq!(Response::Miss.serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_serialize_value() {
        let reply = Response::Value(Bytes::from("hello"));
        assert_eq!(reply.serialize(), b"$5\r\nhello\r\n");
    }

    #[test]
    fn test_serialize_empty_value() {
        let reply = Response::Value(Bytes::new());
        assert_eq!(reply.serialize(), b"$0\r\n\r\n");
    }

    #[test]
    fn test_serialize_binary_value() {
        let reply = Response::Value(Bytes::from(&b"a\x00b"[..]));
        assert_eq!(reply.serialize(), b"$3\r\na\x00b\r\n");
    }

    #[test]
    fn test_serialize_error() {
        let reply = Response::error("unknown command 'FOO'");
        assert_eq!(reply.serialize(), b"-ERR unknown command 'FOO'\r\n");
    }

    #[test]
    fn test_encode_frame() {
        assert_eq!(encode_frame(b"SET a hello"), b"11\r\nSET a hello");
        assert_eq!(encode_frame(b""), b"0\r\n");
    }
}
