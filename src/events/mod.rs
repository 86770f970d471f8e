//! Events module for owner-context notifications
//!
//! Broadcast to subscribed control clients so an external UI can render
//! the indicator and keep its settings view in sync.

use serde::{Deserialize, Serialize};

use crate::dispatch::RecordingTarget;
use crate::hotkey::Chord;

/// Events emitted by the owner context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToggleEvent {
    /// An input source was activated
    SourceSelected {
        id: String,
        name: String,
    },

    /// The indicator should show this code
    IndicatorShown {
        code: String,
    },

    /// A recording session began
    RecordingStarted {
        target: RecordingTarget,
    },

    /// The live recording session was abandoned
    RecordingCancelled,

    /// A recording session captured a chord and bound it
    BindingRecorded {
        target: RecordingTarget,
        chord: Chord,
    },

    /// Hotkeys, toggle pair or preferences were changed
    BindingsChanged,
}

impl std::fmt::Display for ToggleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToggleEvent::SourceSelected { id, .. } => write!(f, "SOURCE_SELECTED ({})", id),
            ToggleEvent::IndicatorShown { code } => write!(f, "INDICATOR_SHOWN ({})", code),
            ToggleEvent::RecordingStarted { target } => {
                write!(f, "RECORDING_STARTED ({})", target)
            }
            ToggleEvent::RecordingCancelled => write!(f, "RECORDING_CANCELLED"),
            ToggleEvent::BindingRecorded { target, chord } => {
                write!(f, "BINDING_RECORDED ({} = {})", target, chord)
            }
            ToggleEvent::BindingsChanged => write!(f, "BINDINGS_CHANGED"),
        }
    }
}
