//! Storage Engine Module
//!
//! The core of KVMemo: a sharded, concurrently accessed key-value store
//! with TTL expiry and capacity-bounded shards, orchestrated by the
//! [`Engine`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                             │
//! │                                                             │
//! │   ShardSet                 TtlIndex          EvictionManager│
//! │  ┌─────────┐┌─────────┐   (global map of    (policy + byte │
//! │  │ Shard 0 ││ Shard N │    deadline -> keys) ledger)       │
//! │  │ entries ││ entries │                                    │
//! │  │ recency ││ recency │                                    │
//! │  │ ttl     ││ ttl     │                                    │
//! │  └─────────┘└─────────┘                                    │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │ process_expired()
//!              ┌─────────────┴─────────────┐
//!              │        TtlSweeper         │
//!              │  (background tokio task)  │
//!              └───────────────────────────┘
//! ```
//!
//! Expired keys are reclaimed two ways: lazily when a read notices the
//! deadline has passed, and actively by the background sweeper, so memory
//! is recovered even for keys that are never touched again.

pub mod engine;
pub mod entry;
pub mod recency;
pub mod shard;
pub mod sweeper;
pub mod ttl_index;

pub use engine::Engine;
pub use entry::{charge_for, Entry, ENTRY_OVERHEAD};
pub use recency::RecencyList;
pub use shard::{GetOutcome, SetOutcome, Shard, ShardSet};
pub use sweeper::TtlSweeper;
pub use ttl_index::TtlIndex;
