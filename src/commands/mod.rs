//! Command Processing Layer
//!
//! Receives parsed wire commands, executes them against the storage
//! engine, and produces the reply to send back. Argument validation lives
//! in the engine so that every caller (network or embedded) gets the same
//! behavior; this layer only translates outcomes into wire replies.

pub mod handler;

pub use handler::CommandHandler;
