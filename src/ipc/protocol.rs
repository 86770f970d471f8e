//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bindings::TogglePair;
use crate::dispatch::RecordingTarget;
use crate::engine::EngineSnapshot;
use crate::events::ToggleEvent;
use crate::hotkey::Chord;
use crate::sources::InputSource;

/// Requests from UI to daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request current daemon status
    GetStatus,

    /// List the cataloged input sources
    ListSources,

    /// Re-enumerate input sources, then list them
    RefreshSources,

    /// Current hotkeys and preferences
    GetBindings,

    /// Set or clear the toggle hotkey
    SetToggleHotkey { chord: Option<Chord> },

    /// Set or clear the hotkey for one input source
    SetLanguageHotkey {
        source_id: String,
        chord: Option<Chord>,
    },

    /// Choose the two sources the toggle alternates between
    SetToggleLanguages {
        first: Option<String>,
        second: Option<String>,
    },

    /// Turn the on-screen indicator on or off
    SetShowIndicator { enabled: bool },

    /// Bind the next key chord pressed anywhere to `target`
    StartRecording { target: RecordingTarget },

    /// Abandon the live recording session
    CancelRecording,

    /// Activate an input source
    SelectSource { id: String },

    /// Same as pressing the toggle hotkey, without the indicator
    Toggle,

    /// Subscribe to event notifications
    Subscribe,
}

/// Responses from daemon to UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Current daemon status
    Status(DaemonStatus),

    /// Input source catalog
    Sources {
        sources: Vec<InputSource>,
        current: Option<InputSource>,
    },

    /// Configured hotkeys
    Bindings(BindingsView),

    /// Result of a select or toggle; `None` when nothing was switched
    Selected { source: Option<InputSource> },

    /// Request accepted
    Ack,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Push notification from daemon to UI (for subscribed clients)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Event { event: ToggleEvent },
}

/// Full daemon status snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Whether the event tap is installed
    pub hotkeys_enabled: bool,

    /// Active input source as reported by the OS
    pub current_source: Option<InputSource>,

    /// Number of cataloged input sources
    pub source_count: usize,

    /// Role being recorded, if any
    pub recording: Option<RecordingTarget>,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

/// Hotkeys and preferences as shown to the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingsView {
    pub toggle_hotkey: Option<Chord>,
    pub language_hotkeys: BTreeMap<String, Chord>,
    pub toggle_languages: TogglePair,
    pub show_indicator: bool,
}

impl From<EngineSnapshot> for BindingsView {
    fn from(snapshot: EngineSnapshot) -> Self {
        Self {
            toggle_hotkey: snapshot.bindings.toggle_chord,
            language_hotkeys: snapshot.bindings.source_chords,
            toggle_languages: snapshot.bindings.toggle_sources,
            show_indicator: snapshot.show_indicator,
        }
    }
}
