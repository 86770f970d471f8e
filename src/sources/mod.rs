//! Input source module
//!
//! Enumerates the OS keyboard input sources, resolves the active one and
//! issues selection commands.

mod backend;
mod directory;
mod short_code;
#[cfg(target_os = "macos")]
mod tis;

pub use backend::{InputSource, InputSourceBackend, NativeSource};
pub use directory::Directory;
pub use short_code::short_code;

/// Backend for the platform the daemon runs on
#[cfg(target_os = "macos")]
pub type SystemBackend = tis::TisBackend;

/// Backend for the platform the daemon runs on
#[cfg(not(target_os = "macos"))]
pub type SystemBackend = EmptyBackend;

/// Backend with no input sources, for platforms without TIS
#[cfg(not(target_os = "macos"))]
#[derive(Debug, Default)]
pub struct EmptyBackend;

#[cfg(not(target_os = "macos"))]
impl InputSourceBackend for EmptyBackend {
    type Handle = ();

    fn enumerate(&self) -> Vec<NativeSource<()>> {
        Vec::new()
    }

    fn current_id(&self) -> Option<String> {
        None
    }

    fn select(&self, _handle: &()) {}
}
