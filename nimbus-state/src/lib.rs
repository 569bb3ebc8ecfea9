//! Nimbus State Management
//!
//! Persists the resources Nimbus manages. Every entry is keyed by the
//! resource ID the remote service assigned, which is what later reads,
//! updates and deletes are addressed by.
//!
//! # Overview
//!
//! - **StateFile**: All managed resources, plus serial and lineage
//! - **StateBackend**: A trait for state storage backends
//! - **LockInfo**: Lock held while a process modifies the state
//!
//! # Example
//!
//! ```ignore
//! use nimbus_state::{LocalBackend, StateBackend, StateFile};
//!
//! let backend = LocalBackend::with_path("nimbus.state.json".into());
//! let lock = backend.acquire_lock("import").await?;
//! let mut state = backend.read_state().await?.unwrap_or_default();
//! state.upsert_resource(resource);
//! state.increment_serial();
//! backend.write_state(&state).await?;
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

// Re-export main types for convenience
pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend};
pub use backends::{LocalBackend, create_backend};
pub use lock::LockInfo;
pub use state::{ResourceState, StateFile};
