//! Chord matching with fixed priority
//!
//! Priority, highest first:
//! 1. a live recording session captures any chord
//! 2. the toggle chord
//! 3. a per-source chord, scanned in id order
//!
//! Anything else passes through untouched. The same chord may be bound to
//! several roles; the order above picks the winner.

use tracing::debug;

use crate::bindings::BindingSet;
use crate::hotkey::Chord;

use super::recording::{RecordingSession, RecordingTarget};

/// What the event tap should do with a key-down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Swallow the event
    Consume,
    /// Deliver the event normally
    PassThrough,
}

/// Outcome of matching one chord
#[derive(Debug)]
pub enum Action {
    /// The recording session captured the chord
    Capture {
        session: RecordingSession,
        chord: Chord,
    },
    /// Toggle between the configured pair
    Toggle,
    /// Select a specific input source
    Select(String),
    /// Not ours
    PassThrough,
}

impl Action {
    pub fn verdict(&self) -> Verdict {
        match self {
            Action::PassThrough => Verdict::PassThrough,
            _ => Verdict::Consume,
        }
    }
}

/// Resolves chords to actions and holds the recording session
#[derive(Debug, Default)]
pub struct Dispatcher {
    recording: Option<RecordingSession>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start recording, replacing any session already in flight
    pub fn start_recording(&mut self, session: RecordingSession) {
        if let Some(previous) = self.recording.replace(session) {
            debug!(replaced = %previous.target(), "recording session replaced");
        }
    }

    /// Abandon the live session, if any
    pub fn cancel_recording(&mut self) -> Option<RecordingTarget> {
        self.recording.take().map(|session| session.target().clone())
    }

    pub fn recording_target(&self) -> Option<&RecordingTarget> {
        self.recording.as_ref().map(RecordingSession::target)
    }

    /// Match a chord against the session and the bindings
    ///
    /// Only the recording slot is mutated, and only when it captures.
    pub fn resolve(&mut self, chord: Chord, bindings: &BindingSet) -> Action {
        if let Some(session) = self.recording.take() {
            return Action::Capture { session, chord };
        }

        if bindings.toggle_chord == Some(chord) {
            return Action::Toggle;
        }

        for (id, bound) in &bindings.source_chords {
            if *bound == chord {
                return Action::Select(id.clone());
            }
        }

        Action::PassThrough
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::Modifiers;

    fn chord(key_code: u32) -> Chord {
        Chord::new(key_code, Modifiers::CONTROL | Modifiers::OPTION)
    }

    fn session(target: RecordingTarget) -> RecordingSession {
        RecordingSession::new(target, Box::new(|_, _| {}))
    }

    #[test]
    fn test_unbound_passes_through() {
        let mut dispatcher = Dispatcher::new();
        let action = dispatcher.resolve(chord(49), &BindingSet::default());
        assert!(matches!(action, Action::PassThrough));
        assert_eq!(action.verdict(), Verdict::PassThrough);
    }

    #[test]
    fn test_toggle_beats_source() {
        let mut bindings = BindingSet::default();
        bindings.toggle_chord = Some(chord(49));
        bindings.source_chords.insert("ru".to_string(), chord(49));

        let mut dispatcher = Dispatcher::new();
        let action = dispatcher.resolve(chord(49), &bindings);
        assert!(matches!(action, Action::Toggle));
        assert_eq!(action.verdict(), Verdict::Consume);
    }

    #[test]
    fn test_source_match() {
        let mut bindings = BindingSet::default();
        bindings.toggle_chord = Some(chord(49));
        bindings.source_chords.insert("de".to_string(), chord(2));

        let mut dispatcher = Dispatcher::new();
        match dispatcher.resolve(chord(2), &bindings) {
            Action::Select(id) => assert_eq!(id, "de"),
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_shared_source_chord_is_deterministic() {
        let mut bindings = BindingSet::default();
        bindings.source_chords.insert("ru".to_string(), chord(3));
        bindings.source_chords.insert("de".to_string(), chord(3));

        let mut dispatcher = Dispatcher::new();
        for _ in 0..5 {
            match dispatcher.resolve(chord(3), &bindings) {
                Action::Select(id) => assert_eq!(id, "de"),
                other => panic!("unexpected action: {:?}", other),
            }
        }
    }

    #[test]
    fn test_recording_overrides_bindings() {
        let mut bindings = BindingSet::default();
        bindings.toggle_chord = Some(chord(49));

        let mut dispatcher = Dispatcher::new();
        dispatcher.start_recording(session(RecordingTarget::Toggle));

        match dispatcher.resolve(chord(49), &bindings) {
            Action::Capture { session, chord: captured } => {
                assert_eq!(session.target(), &RecordingTarget::Toggle);
                assert_eq!(captured, chord(49));
            }
            other => panic!("unexpected action: {:?}", other),
        }

        // Session ends after one capture.
        assert!(dispatcher.recording_target().is_none());
        assert!(matches!(
            dispatcher.resolve(chord(49), &bindings),
            Action::Toggle
        ));
    }

    #[test]
    fn test_second_recording_replaces_first() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.start_recording(session(RecordingTarget::Toggle));
        dispatcher.start_recording(session(RecordingTarget::Source("de".to_string())));

        assert_eq!(
            dispatcher.recording_target(),
            Some(&RecordingTarget::Source("de".to_string()))
        );
    }

    #[test]
    fn test_cancel_recording() {
        let mut dispatcher = Dispatcher::new();
        assert!(dispatcher.cancel_recording().is_none());

        dispatcher.start_recording(session(RecordingTarget::Toggle));
        assert_eq!(dispatcher.cancel_recording(), Some(RecordingTarget::Toggle));
        assert!(matches!(
            dispatcher.resolve(chord(1), &BindingSet::default()),
            Action::PassThrough
        ));
    }
}
