//! HealthSync - Main Library
//!
//! HealthSync is the network-adaptive synchronization core of a
//! health-records client. It decides per request whether the direct api or
//! a degraded sms channel should be used, keeps cached records fresh with a
//! throttled background sync, and never loses appointments booked while
//! offline.
//!
//! # Module Structure
//!
//! - **`shared`** - Types every layer agrees on
//!   - Error taxonomy, sync events
//!   - Application configuration (TOML + builder)
//!
//! - **`client`** - The sync core and its injected capabilities
//!   - Connection classification, speed probe, method selection
//!   - Resource fetching with api → sms fallback
//!   - Sync orchestrator with periodic timer and interval guard
//!   - Offline appointment queue
//!   - SQLite key-value persistence
//!
//! # Feature Flags
//!
//! - **`agent`** - Builds the `healthsync-agent` binary (adds
//!   `tracing-subscriber` and `dotenv`)
//!
//! # Usage
//!
//! ```rust,no_run
//! use healthsync::client::{Config, HealthSync};
//! use healthsync::client::http::ReqwestHttpClient;
//! use healthsync::client::local_db::MemoryStore;
//! use healthsync::client::network::{NetworkSnapshot, WatchNetworkSource};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let network = Arc::new(WatchNetworkSource::new(NetworkSnapshot::wifi()));
//! let app = HealthSync::new(
//!     Config::new(),
//!     network.clone(),
//!     Arc::new(ReqwestHttpClient::new()),
//!     Arc::new(MemoryStore::new()),
//! )
//! .await;
//!
//! app.init().await;
//! app.add_sync_listener(|event| println!("sync {}", event.status()));
//!
//! // Platform bridge reports a transition; a restore sync follows
//! network.update(NetworkSnapshot::offline());
//! network.update(NetworkSnapshot::wifi());
//! # }
//! ```
//!
//! # Thread Safety
//!
//! Shared state lives behind `Arc` with `tokio::sync::RwLock`/`Mutex`.
//! Only one sync cycle runs at a time process-wide; extra triggers during a
//! cycle are dropped.
//!
//! # Error Handling
//!
//! - `SyncError` in `shared::error` is the crate-wide taxonomy
//! - Detection and probe failures degrade to the sms method instead of
//!   erroring
//! - Storage failures at startup degrade to in-memory operation

/// Shared types and data structures
pub mod shared;

/// Adaptive sync core
pub mod client;
