mod config;
mod http;
mod remote;
mod service;

// Public API of the sync subsystem.
pub use crate::error::SyncError;
pub use config::{DEFAULT_DEBOUNCE_MS, SyncConfig};
pub use http::HttpRemoteStore;
pub use remote::{RecordingRemote, RemoteError, RemoteStore};
pub use service::{SessionSyncService, SyncHandle};
