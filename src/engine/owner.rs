//! The owner context
//!
//! Owns the bindings, the directory and the recording session. Every read
//! and mutation arrives as a `Command` on one channel and is handled to
//! completion before the next, so no two mutations interleave.

use std::time::Instant;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::bindings::{BindingChange, BindingSet, BindingStore, KeyValueStore, StoreError};
use crate::dispatch::{
    Action, Dispatcher, RecordingCallback, RecordingSession, RecordingTarget, Verdict,
};
use crate::events::ToggleEvent;
use crate::hotkey::Chord;
use crate::sources::{InputSource, InputSourceBackend};

use super::switcher::Switcher;

/// Requests handled by the owner context
pub enum Command {
    /// Resolve a key-down; the reply goes back to the event tap thread
    ///
    /// Past `deadline` the tap has already passed the key through, so the
    /// chord must not be acted on.
    Dispatch {
        chord: Chord,
        deadline: Instant,
        reply: std::sync::mpsc::SyncSender<Verdict>,
    },
    StartRecording {
        target: RecordingTarget,
        callback: RecordingCallback,
    },
    CancelRecording,
    Update {
        change: BindingChange,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    Select {
        id: String,
        reply: oneshot::Sender<Option<InputSource>>,
    },
    Toggle {
        reply: oneshot::Sender<Option<InputSource>>,
    },
    Refresh {
        reply: oneshot::Sender<usize>,
    },
    Snapshot {
        reply: oneshot::Sender<EngineSnapshot>,
    },
}

/// Point-in-time view of the owner state
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    pub sources: Vec<InputSource>,
    /// Active source as reported by the OS
    pub current: Option<InputSource>,
    pub bindings: BindingSet,
    pub show_indicator: bool,
    pub recording: Option<RecordingTarget>,
}

/// Hotkey engine: dispatcher, switcher and bindings in one place
pub struct Engine<B: InputSourceBackend, K: KeyValueStore> {
    switcher: Switcher<B>,
    bindings: BindingStore<K>,
    dispatcher: Dispatcher,
    events: broadcast::Sender<ToggleEvent>,
}

impl<B: InputSourceBackend, K: KeyValueStore> Engine<B, K> {
    /// Create the engine and load the input source catalog
    pub fn new(
        switcher: Switcher<B>,
        bindings: BindingStore<K>,
        events: broadcast::Sender<ToggleEvent>,
    ) -> Self {
        let mut engine = Self {
            switcher,
            bindings,
            dispatcher: Dispatcher::new(),
            events,
        };
        engine.refresh();
        engine
    }

    /// Process commands until every sender is gone
    pub async fn run(&mut self, mut commands: mpsc::Receiver<Command>) {
        info!("engine started");

        while let Some(command) = commands.recv().await {
            self.handle_command(command);
        }

        info!("engine stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Dispatch {
                chord,
                deadline,
                reply,
            } => {
                if Instant::now() >= deadline {
                    debug!(%chord, "dispatch expired, key already passed through");
                    return;
                }
                let verdict = self.dispatch(chord);
                // The tap thread may have given up waiting.
                let _ = reply.send(verdict);
            }
            Command::StartRecording { target, callback } => {
                self.start_recording(target, callback);
            }
            Command::CancelRecording => self.cancel_recording(),
            Command::Update { change, reply } => {
                let _ = reply.send(self.update(change));
            }
            Command::Select { id, reply } => {
                let _ = reply.send(self.select(&id));
            }
            Command::Toggle { reply } => {
                let _ = reply.send(self.toggle(false));
            }
            Command::Refresh { reply } => {
                let _ = reply.send(self.refresh());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    /// Resolve a chord and carry out its action
    pub fn dispatch(&mut self, chord: Chord) -> Verdict {
        let action = self.dispatcher.resolve(chord, self.bindings.bindings());
        let verdict = action.verdict();

        match action {
            Action::Capture { session, chord } => self.complete_recording(session, chord),
            Action::Toggle => {
                debug!(%chord, "toggle hotkey");
                self.toggle(true);
            }
            Action::Select(id) => {
                debug!(%chord, id = %id, "input source hotkey");
                let indicate = self.bindings.show_indicator();
                if let Some(source) = self.switcher.select(&id, indicate) {
                    self.emit_selected(source);
                }
            }
            Action::PassThrough => {}
        }

        verdict
    }

    /// Start capturing the next chord for `target`
    pub fn start_recording(&mut self, target: RecordingTarget, callback: RecordingCallback) {
        info!(%target, "recording hotkey");
        self.dispatcher
            .start_recording(RecordingSession::new(target.clone(), callback));
        self.emit(ToggleEvent::RecordingStarted { target });
    }

    pub fn cancel_recording(&mut self) {
        if let Some(target) = self.dispatcher.cancel_recording() {
            info!(%target, "recording cancelled");
            self.emit(ToggleEvent::RecordingCancelled);
        }
    }

    pub fn update(&mut self, change: BindingChange) -> Result<(), StoreError> {
        debug!(?change, "updating bindings");
        self.bindings.apply(change)?;
        self.emit(ToggleEvent::BindingsChanged);
        Ok(())
    }

    /// Select a source on request, without the indicator
    pub fn select(&mut self, id: &str) -> Option<InputSource> {
        let source = self.switcher.select(id, false)?;
        self.emit_selected(source.clone());
        Some(source)
    }

    fn toggle(&mut self, from_hotkey: bool) -> Option<InputSource> {
        let indicate = from_hotkey && self.bindings.show_indicator();
        let source = self
            .switcher
            .perform_toggle(&self.bindings.bindings().toggle_sources, indicate)?;
        self.emit_selected(source.clone());
        Some(source)
    }

    pub fn refresh(&mut self) -> usize {
        self.switcher.refresh()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let directory = self.switcher.directory();
        EngineSnapshot {
            sources: directory.sources().to_vec(),
            current: directory.current_source().cloned(),
            bindings: self.bindings.bindings().clone(),
            show_indicator: self.bindings.show_indicator(),
            recording: self.dispatcher.recording_target().cloned(),
        }
    }

    /// Bind the captured chord to the session's role, then call back
    fn complete_recording(&mut self, session: RecordingSession, chord: Chord) {
        let result = match session.target() {
            RecordingTarget::Toggle => self.bindings.set_toggle_chord(Some(chord)),
            RecordingTarget::Source(id) => self.bindings.set_source_chord(id, Some(chord)),
        };
        if let Err(e) = result {
            warn!(?e, "failed to persist recorded hotkey");
        }

        let target = session.complete(chord);
        info!(%target, %chord, "hotkey recorded");
        self.emit(ToggleEvent::BindingsChanged);
    }

    fn emit_selected(&self, source: InputSource) {
        self.emit(ToggleEvent::SourceSelected {
            id: source.id,
            name: source.name,
        });
    }

    fn emit(&self, event: ToggleEvent) {
        debug!(%event, "emitting event");
        let _ = self.events.send(event);
    }
}
