//! Global key-down interceptor using macOS CGEventTap
//!
//! The tap runs on a dedicated thread with its own CFRunLoop. Each key-down
//! is handed synchronously to the engine, and the event is swallowed when
//! the engine says so.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::engine::EngineHandle;

/// Errors that can occur installing the interceptor
#[derive(Debug, thiserror::Error)]
pub enum InterceptError {
    #[error("failed to create event tap - check Accessibility permissions")]
    PermissionDenied,

    #[error("failed to attach event tap to run loop")]
    RunLoopSource,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),

    #[error("listener thread exited before reporting")]
    ThreadExited,

    #[error("global key interception is not supported on this platform")]
    Unsupported,
}

/// System-wide key-down interceptor
pub struct EventInterceptor {
    engine: EngineHandle,
    running: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl EventInterceptor {
    pub fn new(engine: EngineHandle) -> Self {
        Self {
            engine,
            running: Arc::new(AtomicBool::new(false)),
            thread: Mutex::new(None),
        }
    }

    /// Install the event tap
    ///
    /// Does nothing if already installed. Blocks until the listener thread
    /// reports whether the tap could be created.
    pub fn install(&self) -> Result<(), InterceptError> {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("interceptor already installed");
            return Ok(());
        }

        let engine = self.engine.clone();
        let running = Arc::clone(&self.running);
        let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel(1);

        let spawned = thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                info!("hotkey listener thread started");
                run_event_loop(engine, Arc::clone(&running), ready_tx);
                running.store(false, Ordering::SeqCst);
                info!("hotkey listener thread stopped");
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(InterceptError::ThreadSpawn(e.to_string()));
            }
        };

        let result = ready_rx.recv().unwrap_or(Err(InterceptError::ThreadExited));
        if result.is_err() {
            self.running.store(false, Ordering::SeqCst);
            let _ = handle.join();
            return result;
        }

        if let Ok(mut thread) = self.thread.lock() {
            *thread = Some(handle);
        }
        Ok(())
    }

    /// Remove the event tap; safe to call when not installed
    pub fn uninstall(&self) {
        self.running.store(false, Ordering::SeqCst);

        let handle = match self.thread.lock() {
            Ok(mut thread) => thread.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("hotkey listener thread panicked");
            }
            info!("interceptor uninstalled");
        }

        // No more key-downs will arrive to complete it.
        self.engine.abandon_recording();
    }

    /// Check if the tap is currently installed
    pub fn is_installed(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for EventInterceptor {
    fn drop(&mut self) {
        self.uninstall();
    }
}

type ReadySender = std::sync::mpsc::SyncSender<Result<(), InterceptError>>;

/// Run the CFRunLoop with the event tap until `running` is cleared
#[cfg(target_os = "macos")]
fn run_event_loop(engine: EngineHandle, running: Arc<AtomicBool>, ready: ReadySender) {
    use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
    use core_graphics::event::{
        CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement,
        CGEventTapProxy, CGEventType,
    };

    use super::keys::Chord;
    use crate::dispatch::Verdict;

    let disabled = Arc::new(AtomicBool::new(false));
    let tap_disabled = Arc::clone(&disabled);

    // Must answer quickly: the OS disables slow taps.
    let callback = move |_proxy: CGEventTapProxy,
                         event_type: CGEventType,
                         event: &CGEvent|
          -> Option<CGEvent> {
        match event_type {
            CGEventType::KeyDown => {
                let chord = Chord::from_event(event);
                if engine.dispatch_blocking(chord) == Verdict::Consume {
                    debug!(%chord, "key consumed");
                    // A null event is dropped by the window server.
                    event.set_type(CGEventType::Null);
                }
            }
            CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                warn!("event tap disabled by the system, will re-enable");
                tap_disabled.store(true, Ordering::SeqCst);
            }
            _ => {}
        }
        // None hands the (possibly nulled) original event back.
        None
    };

    let tap = match CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::Default,
        vec![CGEventType::KeyDown],
        callback,
    ) {
        Ok(tap) => tap,
        Err(()) => {
            let _ = ready.send(Err(InterceptError::PermissionDenied));
            return;
        }
    };

    let run_loop_source = match tap.mach_port.create_runloop_source(0) {
        Ok(source) => source,
        Err(()) => {
            let _ = ready.send(Err(InterceptError::RunLoopSource));
            return;
        }
    };

    let run_loop = CFRunLoop::get_current();
    unsafe {
        run_loop.add_source(&run_loop_source, kCFRunLoopCommonModes);
    }
    tap.enable();

    info!("event tap created and enabled");
    let _ = ready.send(Ok(()));

    while running.load(Ordering::SeqCst) {
        // Wake periodically to notice uninstall and re-enable requests.
        unsafe {
            CFRunLoop::run_in_mode(
                kCFRunLoopDefaultMode,
                std::time::Duration::from_millis(100),
                true,
            );
        }

        if disabled.swap(false, Ordering::SeqCst) {
            tap.enable();
            info!("event tap re-enabled");
        }
    }

    unsafe {
        run_loop.remove_source(&run_loop_source, kCFRunLoopCommonModes);
    }
    // The tap is released when it goes out of scope.
}

#[cfg(not(target_os = "macos"))]
fn run_event_loop(_engine: EngineHandle, _running: Arc<AtomicBool>, ready: ReadySender) {
    let _ = ready.send(Err(InterceptError::Unsupported));
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn interceptor() -> EventInterceptor {
        let (tx, _rx) = mpsc::channel(32);
        EventInterceptor::new(EngineHandle::new(tx))
    }

    #[test]
    fn test_interceptor_creation() {
        assert!(!interceptor().is_installed());
    }

    #[test]
    fn test_uninstall_when_not_installed() {
        let interceptor = interceptor();
        interceptor.uninstall();
        interceptor.uninstall();
        assert!(!interceptor.is_installed());
    }

    #[tokio::test]
    async fn test_uninstall_abandons_recording() {
        use std::sync::atomic::AtomicBool;

        use tokio::sync::broadcast;

        use crate::bindings::{BindingStore, MemoryStore};
        use crate::dispatch::RecordingTarget;
        use crate::engine::{Engine, Switcher};
        use crate::sources::Directory;
        use crate::testing::{FakeBackend, RecordingIndicator};

        let switcher = Switcher::new(
            Directory::new(FakeBackend::with_sources(&[("en", "English")])),
            Box::new(RecordingIndicator::default()),
        );
        let (events, _) = broadcast::channel(16);
        let mut engine = Engine::new(switcher, BindingStore::load(MemoryStore::default()), events);
        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move { engine.run(rx).await });
        let handle = EngineHandle::new(tx);

        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        handle
            .start_recording(
                RecordingTarget::Toggle,
                Box::new(move |_, _| flag.store(true, Ordering::SeqCst)),
            )
            .await
            .unwrap();

        let interceptor = EventInterceptor::new(handle.clone());
        interceptor.uninstall();

        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.recording.is_none());
        assert!(snapshot.bindings.toggle_chord.is_none());
        assert!(!called.load(Ordering::SeqCst));
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn test_install_unsupported_leaves_uninstalled() {
        let interceptor = interceptor();
        assert!(matches!(
            interceptor.install(),
            Err(InterceptError::Unsupported)
        ));
        assert!(!interceptor.is_installed());
    }
}
