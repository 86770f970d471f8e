//! Catalog of selectable input sources
//!
//! Holds the last enumeration from the OS. The active source is always
//! re-read from the backend; the cached copy is kept only for reporting.

use std::collections::HashMap;

use tracing::{debug, info};

use super::backend::{InputSource, InputSourceBackend};

/// Directory of the OS input sources
pub struct Directory<B: InputSourceBackend> {
    backend: B,
    catalog: Vec<InputSource>,
    handles: HashMap<String, B::Handle>,
    /// Last observed active source, refreshed after refresh/select
    cached_current: Option<InputSource>,
}

impl<B: InputSourceBackend> Directory<B> {
    /// Create an empty directory; call `refresh` before use
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            catalog: Vec::new(),
            handles: HashMap::new(),
            cached_current: None,
        }
    }

    /// Re-enumerate the OS sources and replace the catalog wholesale
    pub fn refresh(&mut self) -> usize {
        let mut catalog = Vec::new();
        let mut handles = HashMap::new();

        for native in self.backend.enumerate() {
            if handles.contains_key(&native.source.id) {
                debug!(id = %native.source.id, "duplicate input source ignored");
                continue;
            }
            handles.insert(native.source.id.clone(), native.handle);
            catalog.push(native.source);
        }

        self.catalog = catalog;
        self.handles = handles;
        self.cached_current = self.current_source().cloned();

        info!(count = self.catalog.len(), "input sources loaded");
        self.catalog.len()
    }

    pub fn sources(&self) -> &[InputSource] {
        &self.catalog
    }

    pub fn get(&self, id: &str) -> Option<&InputSource> {
        self.catalog.iter().find(|source| source.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handles.contains_key(id)
    }

    /// Identifier the OS reports as active, straight from the backend
    pub fn live_current_id(&self) -> Option<String> {
        self.backend.current_id()
    }

    /// Active source resolved against the catalog
    ///
    /// `None` when the OS reports nothing or a source the catalog does not
    /// know.
    pub fn current_source(&self) -> Option<&InputSource> {
        let id = self.live_current_id()?;
        self.get(&id)
    }

    /// Active source as of the last refresh or select
    pub fn cached_current(&self) -> Option<&InputSource> {
        self.cached_current.as_ref()
    }

    /// Select a source by id; unknown ids are ignored
    pub fn select(&mut self, id: &str) -> Option<InputSource> {
        let Some(handle) = self.handles.get(id) else {
            debug!(id, "select ignored, unknown input source");
            return None;
        };
        self.backend.select(handle);

        let selected = self.get(id).cloned();
        self.cached_current = self.current_source().cloned();
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    fn directory() -> (Directory<FakeBackend>, FakeBackend) {
        let backend = FakeBackend::with_sources(&[
            ("com.apple.keylayout.US", "U.S."),
            ("com.apple.keylayout.Russian", "Russian"),
            ("com.apple.keylayout.German", "German"),
        ]);
        let mut directory = Directory::new(backend.clone());
        directory.refresh();
        (directory, backend)
    }

    #[test]
    fn test_refresh_is_stable() {
        let (mut directory, _) = directory();
        let first = directory.sources().to_vec();
        directory.refresh();
        assert_eq!(directory.sources(), first.as_slice());
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_refresh_drops_duplicates() {
        let backend = FakeBackend::with_sources(&[("en", "English"), ("en", "English again")]);
        let mut directory = Directory::new(backend);
        assert_eq!(directory.refresh(), 1);
        assert_eq!(directory.sources()[0].name, "English");
    }

    #[test]
    fn test_refresh_replaces_catalog() {
        let (mut directory, backend) = directory();
        backend.set_sources(&[("ru", "Russian")]);
        directory.refresh();
        assert_eq!(directory.sources().len(), 1);
        assert!(!directory.contains("com.apple.keylayout.US"));
        assert!(directory.contains("ru"));
    }

    #[test]
    fn test_current_source_reads_os() {
        let (directory, backend) = directory();
        backend.set_current(Some("com.apple.keylayout.German"));
        assert_eq!(
            directory.current_source().map(|s| s.name.as_str()),
            Some("German")
        );

        backend.set_current(Some("com.apple.keylayout.Hebrew"));
        assert!(directory.current_source().is_none());

        backend.set_current(None);
        assert!(directory.current_source().is_none());
    }

    #[test]
    fn test_select_unknown_is_noop() {
        let (mut directory, backend) = directory();
        assert!(directory.select("com.apple.keylayout.Hebrew").is_none());
        assert!(backend.selected().is_empty());
    }

    #[test]
    fn test_select_updates_cache() {
        let (mut directory, backend) = directory();
        let selected = directory.select("com.apple.keylayout.Russian");
        assert_eq!(selected.map(|s| s.name), Some("Russian".to_string()));
        assert_eq!(backend.selected(), vec!["com.apple.keylayout.Russian"]);
        assert_eq!(
            directory.cached_current().map(|s| s.id.as_str()),
            Some("com.apple.keylayout.Russian")
        );
    }
}
