//! Cloneable handle to the owner context

use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::bindings::{BindingChange, StoreError};
use crate::dispatch::{RecordingCallback, RecordingTarget, Verdict};
use crate::hotkey::Chord;
use crate::sources::InputSource;

use super::owner::{Command, EngineSnapshot};

/// Longest the event tap thread waits for a verdict
///
/// Well below the OS tap timeout, after which the tap gets disabled.
pub const HANDOFF_TIMEOUT: Duration = Duration::from_millis(250);

/// Errors talking to the owner context
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine is not running")]
    Closed,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Sends commands to the engine
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
}

impl EngineHandle {
    pub fn new(commands: mpsc::Sender<Command>) -> Self {
        Self { commands }
    }

    /// Synchronous hand-off from the event tap thread
    ///
    /// Falls back to pass-through when the engine is busy, gone, or too
    /// slow to answer.
    pub fn dispatch_blocking(&self, chord: Chord) -> Verdict {
        let (reply_tx, reply_rx) = std::sync::mpsc::sync_channel(1);
        let deadline = Instant::now() + HANDOFF_TIMEOUT;

        if let Err(e) = self.commands.try_send(Command::Dispatch {
            chord,
            deadline,
            reply: reply_tx,
        }) {
            warn!(%chord, error = %e, "engine unavailable, passing key through");
            return Verdict::PassThrough;
        }

        match reply_rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(%chord, ?e, "no verdict from engine, passing key through");
                Verdict::PassThrough
            }
        }
    }

    pub async fn start_recording(
        &self,
        target: RecordingTarget,
        callback: RecordingCallback,
    ) -> Result<(), EngineError> {
        self.send(Command::StartRecording { target, callback })
            .await
    }

    pub async fn cancel_recording(&self) -> Result<(), EngineError> {
        self.send(Command::CancelRecording).await
    }

    /// Drop any live recording session without waiting for the engine
    pub fn abandon_recording(&self) {
        if self.commands.try_send(Command::CancelRecording).is_err() {
            debug!("engine unavailable, recording not abandoned");
        }
    }

    pub async fn update(&self, change: BindingChange) -> Result<(), EngineError> {
        self.request(|reply| Command::Update { change, reply })
            .await?
            .map_err(EngineError::from)
    }

    pub async fn select(&self, id: String) -> Result<Option<InputSource>, EngineError> {
        self.request(|reply| Command::Select { id, reply }).await
    }

    pub async fn toggle(&self) -> Result<Option<InputSource>, EngineError> {
        self.request(|reply| Command::Toggle { reply }).await
    }

    pub async fn refresh(&self) -> Result<usize, EngineError> {
        self.request(|reply| Command::Refresh { reply }).await
    }

    pub async fn snapshot(&self) -> Result<EngineSnapshot, EngineError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    async fn send(&self, command: Command) -> Result<(), EngineError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| EngineError::Closed)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(command(reply_tx)).await?;
        reply_rx.await.map_err(|_| EngineError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast;

    use super::*;
    use crate::bindings::{BindingStore, MemoryStore};
    use crate::engine::{Engine, Switcher};
    use crate::hotkey::Modifiers;
    use crate::sources::Directory;
    use crate::testing::{FakeBackend, RecordingIndicator};

    fn spawn_engine(backend: FakeBackend) -> EngineHandle {
        let switcher = Switcher::new(
            Directory::new(backend),
            Box::new(RecordingIndicator::default()),
        );
        let (events, _) = broadcast::channel(16);
        let mut engine = Engine::new(switcher, BindingStore::load(MemoryStore::default()), events);

        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move { engine.run(rx).await });
        EngineHandle::new(tx)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_dispatch_round_trip() {
        let backend = FakeBackend::with_sources(&[("en", "English"), ("ru", "Russian")]);
        let handle = spawn_engine(backend.clone());
        let chord = Chord::new(49, Modifiers::CONTROL | Modifiers::OPTION);

        handle
            .update(BindingChange::ToggleSources {
                first: Some("en".to_string()),
                second: Some("ru".to_string()),
            })
            .await
            .unwrap();
        handle
            .update(BindingChange::ToggleHotkey { chord: Some(chord) })
            .await
            .unwrap();
        backend.set_current(Some("ru"));

        let tap_handle = handle.clone();
        let verdict = tokio::task::spawn_blocking(move || tap_handle.dispatch_blocking(chord))
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::Consume);
        assert_eq!(backend.selected(), vec!["en"]);

        let unbound = Chord::new(0, Modifiers::NONE);
        let tap_handle = handle.clone();
        let verdict = tokio::task::spawn_blocking(move || tap_handle.dispatch_blocking(unbound))
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::PassThrough);
    }

    #[tokio::test]
    async fn test_requests_reach_engine() {
        let backend = FakeBackend::with_sources(&[("en", "English"), ("de", "German")]);
        let handle = spawn_engine(backend.clone());

        assert_eq!(handle.refresh().await.unwrap(), 2);
        let selected = handle.select("de".to_string()).await.unwrap();
        assert_eq!(selected.map(|s| s.name), Some("German".to_string()));
        assert!(handle.select("fr".to_string()).await.unwrap().is_none());

        handle
            .start_recording(RecordingTarget::Toggle, Box::new(|_, _| {}))
            .await
            .unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.recording, Some(RecordingTarget::Toggle));
        assert_eq!(snapshot.current.map(|s| s.id), Some("de".to_string()));

        handle.abandon_recording();
        assert!(handle.snapshot().await.unwrap().recording.is_none());
    }

    /// Engine configured with the en/ru toggle on ⌃⌥Space, current "ru",
    /// and not yet polling its commands
    fn idle_engine(
        backend: &FakeBackend,
    ) -> (Engine<FakeBackend, MemoryStore>, EngineHandle, mpsc::Receiver<Command>) {
        let switcher = Switcher::new(
            Directory::new(backend.clone()),
            Box::new(RecordingIndicator::default()),
        );
        let (events, _) = broadcast::channel(16);
        let mut engine = Engine::new(switcher, BindingStore::load(MemoryStore::default()), events);
        engine
            .update(BindingChange::ToggleSources {
                first: Some("en".to_string()),
                second: Some("ru".to_string()),
            })
            .unwrap();
        engine
            .update(BindingChange::ToggleHotkey {
                chord: Some(Chord::new(49, Modifiers::CONTROL | Modifiers::OPTION)),
            })
            .unwrap();
        backend.set_current(Some("ru"));

        let (tx, rx) = mpsc::channel(8);
        (engine, EngineHandle::new(tx), rx)
    }

    #[test]
    fn test_late_dispatch_is_not_acted_on() {
        let backend = FakeBackend::with_sources(&[("en", "English"), ("ru", "Russian")]);
        let (mut engine, handle, rx) = idle_engine(&backend);
        let chord = Chord::new(49, Modifiers::CONTROL | Modifiers::OPTION);

        assert_eq!(handle.dispatch_blocking(chord), Verdict::PassThrough);

        // The engine only gets to the queued dispatch after the tap gave up.
        drop(handle);
        tokio_test::block_on(engine.run(rx));

        assert!(backend.selected().is_empty());
    }

    #[test]
    fn test_late_dispatch_does_not_complete_recording() {
        let backend = FakeBackend::with_sources(&[("en", "English"), ("ru", "Russian")]);
        let (mut engine, handle, rx) = idle_engine(&backend);
        let called = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = std::sync::Arc::clone(&called);
        engine.start_recording(
            RecordingTarget::Source("en".to_string()),
            Box::new(move |_, _| flag.store(true, std::sync::atomic::Ordering::SeqCst)),
        );

        let typed = Chord::new(0, Modifiers::NONE);
        assert_eq!(handle.dispatch_blocking(typed), Verdict::PassThrough);

        drop(handle);
        tokio_test::block_on(engine.run(rx));

        let snapshot = engine.snapshot();
        assert_eq!(
            snapshot.recording,
            Some(RecordingTarget::Source("en".to_string()))
        );
        assert!(snapshot.bindings.source_chords.is_empty());
        assert!(!called.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn test_dispatch_without_engine_passes_through() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = EngineHandle::new(tx);
        assert_eq!(
            handle.dispatch_blocking(Chord::new(1, Modifiers::NONE)),
            Verdict::PassThrough
        );
    }

    #[test]
    fn test_requests_without_engine_fail() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = EngineHandle::new(tx);
        let result = tokio_test::block_on(handle.refresh());
        assert!(matches!(result, Err(EngineError::Closed)));
    }
}
