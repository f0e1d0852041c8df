//! Connection Management
//!
//! One async task per accepted client. The task owns a read buffer, pulls
//! length-prefixed frames off the stream, executes each command against
//! the shared engine, and writes the reply before reading the next
//! request. Framing violations close the connection; command errors reply
//! `-ERR` and continue.
//!
//! The accept loop itself lives in the binary (`main.rs`), which also
//! enforces the connection cap.

pub mod handler;

pub use handler::{
    handle_connection, ConnectionError, ConnectionHandler, ConnectionStats,
    COMMAND_OVERHEAD_BYTES,
};
