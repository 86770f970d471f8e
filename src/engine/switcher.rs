//! Toggle and direct-select semantics on top of the directory

use tracing::{debug, info};

use crate::bindings::TogglePair;
use crate::indicator::Indicator;
use crate::sources::{short_code, Directory, InputSource, InputSourceBackend};

/// Switches input sources and drives the indicator
pub struct Switcher<B: InputSourceBackend> {
    directory: Directory<B>,
    indicator: Box<dyn Indicator>,
}

impl<B: InputSourceBackend> Switcher<B> {
    pub fn new(directory: Directory<B>, indicator: Box<dyn Indicator>) -> Self {
        Self {
            directory,
            indicator,
        }
    }

    pub fn directory(&self) -> &Directory<B> {
        &self.directory
    }

    pub fn refresh(&mut self) -> usize {
        self.directory.refresh()
    }

    /// Select a source by id, optionally showing its code
    ///
    /// Unknown ids do nothing and return `None`.
    pub fn select(&mut self, id: &str, indicate: bool) -> Option<InputSource> {
        let source = self.directory.select(id)?;
        info!(id = %source.id, name = %source.name, "input source selected");

        if indicate {
            self.indicator.show(&short_code(&source));
        }
        Some(source)
    }

    /// Alternate between the two sources of `pair`
    ///
    /// The decision uses the source the OS reports right now, never the
    /// directory's cached value. When the active source is neither of the
    /// pair, the first one wins.
    pub fn perform_toggle(&mut self, pair: &TogglePair, indicate: bool) -> Option<InputSource> {
        let Some((first, second)) = pair.ids() else {
            debug!("toggle ignored, pair not configured");
            return None;
        };
        if !self.directory.contains(first) || !self.directory.contains(second) {
            debug!(first, second, "toggle ignored, pair not in catalog");
            return None;
        }

        let current = self.directory.live_current_id();
        let target = match current.as_deref() {
            Some(id) if id == first => second,
            Some(id) if id == second => first,
            _ => first,
        };

        debug!(
            ?current,
            cached = ?self.directory.cached_current().map(|s| s.id.as_str()),
            target,
            "toggling input source"
        );
        self.select(target, indicate)
    }
}
