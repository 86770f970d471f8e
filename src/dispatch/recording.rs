//! Recording sessions for capturing a new binding

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hotkey::Chord;

/// Role a recorded chord will be bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RecordingTarget {
    /// The toggle hotkey
    Toggle,
    /// The direct hotkey for one input source id
    Source(String),
}

impl fmt::Display for RecordingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingTarget::Toggle => write!(f, "toggle"),
            RecordingTarget::Source(id) => write!(f, "source {}", id),
        }
    }
}

/// Called once with the captured chord, on the owner context
pub type RecordingCallback = Box<dyn FnOnce(&RecordingTarget, Chord) + Send>;

/// A live recording session
///
/// Dropping a session abandons it without calling back.
pub struct RecordingSession {
    target: RecordingTarget,
    callback: RecordingCallback,
}

impl RecordingSession {
    pub fn new(target: RecordingTarget, callback: RecordingCallback) -> Self {
        Self { target, callback }
    }

    pub fn target(&self) -> &RecordingTarget {
        &self.target
    }

    /// End the session with a captured chord
    pub fn complete(self, chord: Chord) -> RecordingTarget {
        (self.callback)(&self.target, chord);
        self.target
    }
}

impl fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingSession")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}
