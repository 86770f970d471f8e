//! Test doubles shared by the unit tests

use std::sync::{Arc, Mutex};

use crate::indicator::Indicator;
use crate::sources::{InputSource, InputSourceBackend, NativeSource};

#[derive(Debug, Default)]
struct FakeState {
    sources: Vec<InputSource>,
    current: Option<String>,
    selected: Vec<String>,
}

/// In-memory OS input source service
///
/// Clones share state so a test can keep one copy to steer the "OS" while
/// the directory owns another. Selecting a source makes it current, like
/// the real service.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn with_sources(sources: &[(&str, &str)]) -> Self {
        let backend = Self::default();
        backend.set_sources(sources);
        backend
    }

    pub fn set_sources(&self, sources: &[(&str, &str)]) {
        self.state.lock().unwrap().sources = sources
            .iter()
            .map(|(id, name)| InputSource::new(*id, *name))
            .collect();
    }

    /// Change the active source behind the directory's back
    pub fn set_current(&self, id: Option<&str>) {
        self.state.lock().unwrap().current = id.map(str::to_string);
    }

    /// Every id passed to `select`, in call order
    pub fn selected(&self) -> Vec<String> {
        self.state.lock().unwrap().selected.clone()
    }
}

impl InputSourceBackend for FakeBackend {
    type Handle = String;

    fn enumerate(&self) -> Vec<NativeSource<String>> {
        self.state
            .lock()
            .unwrap()
            .sources
            .iter()
            .map(|source| NativeSource {
                source: source.clone(),
                handle: source.id.clone(),
            })
            .collect()
    }

    fn current_id(&self) -> Option<String> {
        self.state.lock().unwrap().current.clone()
    }

    fn select(&self, handle: &String) {
        let mut state = self.state.lock().unwrap();
        state.selected.push(handle.clone());
        state.current = Some(handle.clone());
    }
}

/// Indicator that remembers every code it was asked to show
#[derive(Debug, Clone, Default)]
pub struct RecordingIndicator {
    shown: Arc<Mutex<Vec<String>>>,
}

impl RecordingIndicator {
    pub fn shown(&self) -> Vec<String> {
        self.shown.lock().unwrap().clone()
    }
}

impl Indicator for RecordingIndicator {
    fn show(&self, code: &str) {
        self.shown.lock().unwrap().push(code.to_string());
    }
}
