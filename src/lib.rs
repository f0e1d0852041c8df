//! # KVMemo - An In-Memory Key-Value Storage Engine
//!
//! KVMemo is an in-memory key-value store with per-key TTL expiration, a
//! bounded memory budget with LRU eviction, and a length-prefixed TCP text
//! protocol.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              KVMemo                                 │
//! │                                                                     │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐              │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │              │
//! │  │ (listener)  │    │  handler    │    │  handler    │              │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘              │
//! │                                               │                     │
//! │  ┌─────────────┐    ┌──────────────────────────▼──────────────────┐ │
//! │  │   Frame     │    │                  Engine                     │ │
//! │  │   decoder   │    │  ┌────────┐ ┌────────┐ ┌────────┐           │ │
//! │  │             │    │  │Shard 0 │ │Shard 1 │ │...N    │  ShardSet │ │
//! │  └─────────────┘    │  └────────┘ └────────┘ └────────┘           │ │
//! │                     │                                             │ │
//! │                     │  global TtlIndex    EvictionManager         │ │
//! │                     └──────────▲──────────────────▲───────────────┘ │
//! │                                │                  │                 │
//! │                     ┌──────────┴───────┐   inline on write pressure │
//! │                     │   TtlSweeper     │                            │
//! │                     │ (background task)│                            │
//! │                     └──────────────────┘                            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use kvmemo::commands::CommandHandler;
//! use kvmemo::config::Config;
//! use kvmemo::connection::{handle_connection, ConnectionStats, COMMAND_OVERHEAD_BYTES};
//! use kvmemo::storage::{Engine, TtlSweeper};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let engine = Arc::new(Engine::new(&config).unwrap());
//!     let _sweeper = TtlSweeper::start(
//!         Arc::clone(&engine),
//!         Duration::from_millis(config.ttl_sweep_interval_ms),
//!     );
//!
//!     let stats = Arc::new(ConnectionStats::new());
//!     let max_payload = config.max_value_bytes + COMMAND_OVERHEAD_BYTES;
//!     let listener = TcpListener::bind(config.bind_address()).await.unwrap();
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         let commands = CommandHandler::new(Arc::clone(&engine));
//!         let stats = Arc::clone(&stats);
//!         tokio::spawn(handle_connection(stream, addr, commands, stats, max_payload));
//!     }
//! }
//! ```
//!
//! ## Wire protocol
//!
//! Requests are `<decimal length>\r\n<payload>` frames; the payload is one
//! of:
//!
//! - `SET <key> <value>` and `SET <key> <value> PX <ttl_ms>`
//! - `GET <key>`
//! - `DEL <key>`
//!
//! Replies are `+OK`, `$<len>\r\n<value>`, `$-1` for a miss, or
//! `-ERR <cause>`, each CRLF-terminated.
//!
//! ## Design highlights
//!
//! - **Sharded storage**: the keyspace is hash-partitioned over
//!   independently locked shards; operations on different shards never
//!   contend.
//! - **Lazy + active expiry**: an expired key is hidden (and reclaimed) by
//!   the read that finds it, and a background sweeper reclaims the keys
//!   nobody reads.
//! - **Budgeted memory**: every entry charges an estimate against a fixed
//!   budget; crossing it evicts least recently used keys inline until the
//!   store fits again.
//! - **Injectable clock**: TTL logic consumes time through a trait, so
//!   tests drive expiry deterministically.
//!
//! ## Module overview
//!
//! - [`storage`]: sharded store, TTL indexes, engine, background sweeper
//! - [`eviction`]: memory tracker, eviction policies, eviction manager
//! - [`protocol`]: frame decoding and command/reply types
//! - [`commands`]: command dispatch against the engine
//! - [`connection`]: per-client connection handling
//! - [`config`]: configuration surface and validation
//! - [`clock`]: wall/monotonic time capability

pub mod clock;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod eviction;
pub mod protocol;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use commands::CommandHandler;
pub use config::{Config, EvictionPolicyKind};
pub use connection::{handle_connection, ConnectionStats};
pub use error::{KvError, KvResult};
pub use protocol::{Command, Response};
pub use storage::{Engine, TtlSweeper};

/// Version of KVMemo.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
