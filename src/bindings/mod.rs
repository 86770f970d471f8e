//! Binding store module
//!
//! Loads and persists the hotkey bindings, the toggle pair and the
//! indicator preference.

mod kv;
mod store;

use std::path::PathBuf;

pub use kv::{FileStore, KeyValueStore};
pub use store::{BindingChange, BindingSet, BindingStore, TogglePair};

#[cfg(test)]
pub use kv::MemoryStore;

/// Errors that can occur while persisting settings
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to encode setting: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("setting {key} is not valid UTF-8")]
    NotUtf8 { key: String },

    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
