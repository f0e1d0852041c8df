//! Command Execution
//!
//! The thin layer between the wire protocol and the engine: takes a parsed
//! [`Command`], runs it, and shapes the result into a [`Response`].
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  Frame decoder  │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │     Engine      │  (storage module)
//! └─────────────────┘
//! ```
//!
//! Engine errors become `-ERR` replies; they never close the connection.
//! A `DEL` always acknowledges with `+OK` so that whether the key existed
//! is not observable.

use std::sync::Arc;

use crate::protocol::{Command, Response};
use crate::storage::Engine;

/// Executes commands against a shared engine.
///
/// Cloneable; each connection carries its own copy over the same engine.
#[derive(Clone)]
pub struct CommandHandler {
    engine: Arc<Engine>,
}

impl CommandHandler {
    /// Creates a handler over the given engine.
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// Runs one command and returns its reply.
    pub fn execute(&self, command: Command) -> Response {
        match command {
            Command::Set { key, value, ttl_ms } => {
                match self.engine.set(key, value, ttl_ms) {
                    Ok(()) => Response::Ok,
                    Err(err) => Response::error(err),
                }
            }
            Command::Get { key } => match self.engine.get(&key) {
                Some(value) => Response::Value(value),
                None => Response::Miss,
            },
            Command::Del { key } => {
                self.engine.delete(&key);
                Response::Ok
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use bytes::Bytes;

    fn handler() -> CommandHandler {
        let engine = Arc::new(Engine::new(&Config::default()).unwrap());
        CommandHandler::new(engine)
    }

    fn set(key: &str, value: &str, ttl_ms: Option<u64>) -> Command {
        Command::Set {
            key: Bytes::from(key.to_string()),
            value: Bytes::from(value.to_string()),
            ttl_ms,
        }
    }

    fn get(key: &str) -> Command {
        Command::Get {
            key: Bytes::from(key.to_string()),
        }
    }

    fn del(key: &str) -> Command {
        Command::Del {
            key: Bytes::from(key.to_string()),
        }
    }

    #[test]
    fn test_set_then_get() {
        let handler = handler();

        assert_eq!(handler.execute(set("a", "hello", None)), Response::Ok);
        assert_eq!(
            handler.execute(get("a")),
            Response::Value(Bytes::from("hello"))
        );
    }

    #[test]
    fn test_get_missing_key_is_a_miss() {
        let handler = handler();
        assert_eq!(handler.execute(get("nope")), Response::Miss);
    }

    #[test]
    fn test_del_acknowledges_regardless_of_presence() {
        let handler = handler();

        handler.execute(set("a", "v", None));
        assert_eq!(handler.execute(del("a")), Response::Ok);
        // Deleting again looks exactly the same.
        assert_eq!(handler.execute(del("a")), Response::Ok);
        assert_eq!(handler.execute(get("a")), Response::Miss);
    }

    #[test]
    fn test_zero_ttl_becomes_error_reply() {
        let handler = handler();
        let reply = handler.execute(set("a", "v", Some(0)));
        assert!(matches!(reply, Response::Error(_)));
        // The rejected write left nothing behind.
        assert_eq!(handler.execute(get("a")), Response::Miss);
    }

    #[test]
    fn test_oversized_value_becomes_error_reply() {
        let config = Config {
            max_value_bytes: 2,
            ..Config::default()
        };
        let handler = CommandHandler::new(Arc::new(Engine::new(&config).unwrap()));

        let reply = handler.execute(set("a", "abc", None));
        assert!(matches!(reply, Response::Error(_)));
    }
}
