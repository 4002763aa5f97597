//! livetally - live row-count synchronization with polling fallback.
//!
//! Keeps a displayed integer equal to the number of rows in a remote table
//! on a Supabase-style backend. Change notifications from a realtime
//! websocket channel are the primary mechanism; when the channel cannot be
//! established within a grace period (or dies later), a poll timer re-queries
//! the count on a fixed interval instead. Every refresh is an authoritative
//! count-only query, so the displayed value can go stale under total backend
//! unavailability but can never drift or reset.
//!
//! # Modules
//!
//! - [`sync`] - The synchronizer core: grace period, poll fallback, lifecycle
//! - [`transport`] - The backend abstraction plus the PostgREST/realtime
//!   implementations
//! - [`domain`] - Filters and change events shared across layers
//! - [`config`] - TOML configuration and logging setup
//! - [`error`] - Error types for the crate
//! - [`cli`] - Command definitions for the `livetally` binary
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use livetally::sync::{CountSynchronizer, SyncConfig};
//! use livetally::transport::SupabaseTransport;
//!
//! # async fn demo() {
//! let transport = Arc::new(SupabaseTransport::new(
//!     "https://xyz.supabase.co".into(),
//!     "wss://xyz.supabase.co/realtime/v1".into(),
//!     "anon-key".into(),
//! ));
//! let sync = CountSynchronizer::new(transport, SyncConfig::new("patients"));
//! let mut handle = sync.start(|count| println!("patients: {count}"));
//! // ... later
//! handle.stop();
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod sync;
pub mod transport;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
