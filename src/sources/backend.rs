//! Seam between the directory and the OS input source service

use serde::{Deserialize, Serialize};

/// A selectable keyboard input source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSource {
    /// Stable OS identifier, e.g. `com.apple.keylayout.Russian`
    pub id: String,
    /// Localized display name
    pub name: String,
}

impl InputSource {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// An enumerated source together with the OS handle used to select it
#[derive(Debug, Clone)]
pub struct NativeSource<H> {
    pub source: InputSource,
    pub handle: H,
}

/// OS input source service
///
/// All calls are treated as fast and synchronous and are made from the
/// owner context only.
pub trait InputSourceBackend {
    /// Opaque OS handle for a source
    type Handle: Clone;

    /// Enumerate every selectable keyboard input source
    fn enumerate(&self) -> Vec<NativeSource<Self::Handle>>;

    /// Identifier of the source the OS reports as active right now
    fn current_id(&self) -> Option<String>;

    /// Ask the OS to activate a source
    fn select(&self, handle: &Self::Handle);
}
