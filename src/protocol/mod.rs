//! Wire Protocol Implementation
//!
//! Length-prefixed text protocol: every request is a
//! `<decimal length>\r\n<payload>` frame whose payload is one
//! space-separated command, and every reply is a CRLF-terminated line
//! (with the value body inline for `GET` hits).
//!
//! ## Modules
//!
//! - `types`: `Command` and `Response` plus reply serialization
//! - `parser`: incremental frame decoder and command tokenizer
//!
//! ## Example
//!
//! ```
//! use kvmemo::protocol::{parse_command, Command, FrameDecoder};
//! use bytes::Bytes;
//!
//! let decoder = FrameDecoder::new(1024);
//! let (payload, consumed) = decoder.decode(b"11\r\nSET a hello").unwrap().unwrap();
//! assert_eq!(consumed, 15);
//!
//! let command = parse_command(&payload).unwrap();
//! assert_eq!(
//!     command,
//!     Command::Set { key: Bytes::from("a"), value: Bytes::from("hello"), ttl_ms: None }
//! );
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse_command, CommandError, FrameDecoder, FrameError};
pub use types::{encode_frame, Command, Response, CRLF, MISS_REPLY, OK_REPLY};
