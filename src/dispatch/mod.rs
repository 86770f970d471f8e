//! Hotkey dispatch module
//!
//! Turns a captured chord into an action and a consume/pass-through
//! verdict, and tracks the recording session.

mod dispatcher;
mod recording;

pub use dispatcher::{Action, Dispatcher, Verdict};
pub use recording::{RecordingCallback, RecordingSession, RecordingTarget};
