//! Hotkey bindings and their persistence

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::hotkey::Chord;

use super::kv::KeyValueStore;
use super::StoreError;

const TOGGLE_HOTKEY: &str = "toggleHotkey";
const LANGUAGE_HOTKEYS: &str = "languageHotkeys";
const TOGGLE_LANGUAGE_1: &str = "toggleLanguage1";
const TOGGLE_LANGUAGE_2: &str = "toggleLanguage2";
const SHOW_INDICATOR: &str = "showLanguagePopup";

/// The two input sources the toggle hotkey alternates between
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TogglePair {
    pub first: Option<String>,
    pub second: Option<String>,
}

impl TogglePair {
    /// Both ids, if both are configured
    pub fn ids(&self) -> Option<(&str, &str)> {
        Some((self.first.as_deref()?, self.second.as_deref()?))
    }
}

/// All configured hotkeys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSet {
    pub toggle_chord: Option<Chord>,
    /// Input source id to its direct hotkey
    pub source_chords: BTreeMap<String, Chord>,
    pub toggle_sources: TogglePair,
}

/// A single configuration change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingChange {
    ToggleHotkey {
        chord: Option<Chord>,
    },
    SourceHotkey {
        source_id: String,
        chord: Option<Chord>,
    },
    ToggleSources {
        first: Option<String>,
        second: Option<String>,
    },
    ShowIndicator {
        enabled: bool,
    },
}

/// Bindings plus preferences, written through to a key/value store
pub struct BindingStore<K: KeyValueStore> {
    kv: K,
    bindings: BindingSet,
    show_indicator: bool,
}

impl<K: KeyValueStore> BindingStore<K> {
    /// Load everything from `kv`
    ///
    /// Each field decodes on its own; a malformed value leaves only that
    /// field at its default.
    pub fn load(kv: K) -> Self {
        let toggle_chord = decode::<Chord>(&kv, TOGGLE_HOTKEY);
        let source_chords =
            decode::<BTreeMap<String, Chord>>(&kv, LANGUAGE_HOTKEYS).unwrap_or_default();
        let toggle_sources = TogglePair {
            first: decode_string(&kv, TOGGLE_LANGUAGE_1),
            second: decode_string(&kv, TOGGLE_LANGUAGE_2),
        };
        let show_indicator = decode::<bool>(&kv, SHOW_INDICATOR).unwrap_or(true);

        debug!(
            toggle = toggle_chord.is_some(),
            sources = source_chords.len(),
            "bindings loaded"
        );

        Self {
            kv,
            bindings: BindingSet {
                toggle_chord,
                source_chords,
                toggle_sources,
            },
            show_indicator,
        }
    }

    pub fn bindings(&self) -> &BindingSet {
        &self.bindings
    }

    pub fn show_indicator(&self) -> bool {
        self.show_indicator
    }

    pub fn set_toggle_chord(&mut self, chord: Option<Chord>) -> Result<(), StoreError> {
        self.bindings.toggle_chord = chord;
        self.save()
    }

    /// Bind or unbind the direct hotkey for one source
    pub fn set_source_chord(&mut self, id: &str, chord: Option<Chord>) -> Result<(), StoreError> {
        match chord {
            Some(chord) => {
                self.bindings.source_chords.insert(id.to_string(), chord);
            }
            None => {
                self.bindings.source_chords.remove(id);
            }
        }
        self.save()
    }

    pub fn set_toggle_sources(
        &mut self,
        first: Option<String>,
        second: Option<String>,
    ) -> Result<(), StoreError> {
        self.bindings.toggle_sources = TogglePair { first, second };
        self.save()
    }

    pub fn set_show_indicator(&mut self, enabled: bool) -> Result<(), StoreError> {
        self.show_indicator = enabled;
        self.save()
    }

    pub fn apply(&mut self, change: BindingChange) -> Result<(), StoreError> {
        match change {
            BindingChange::ToggleHotkey { chord } => self.set_toggle_chord(chord),
            BindingChange::SourceHotkey { source_id, chord } => {
                self.set_source_chord(&source_id, chord)
            }
            BindingChange::ToggleSources { first, second } => {
                self.set_toggle_sources(first, second)
            }
            BindingChange::ShowIndicator { enabled } => self.set_show_indicator(enabled),
        }
    }

    /// Write every field to the key/value store
    pub fn save(&mut self) -> Result<(), StoreError> {
        match &self.bindings.toggle_chord {
            Some(chord) => self.kv.set(TOGGLE_HOTKEY, &serde_json::to_vec(chord)?)?,
            None => self.kv.remove(TOGGLE_HOTKEY),
        }

        self.kv.set(
            LANGUAGE_HOTKEYS,
            &serde_json::to_vec(&self.bindings.source_chords)?,
        )?;

        for (key, id) in [
            (TOGGLE_LANGUAGE_1, &self.bindings.toggle_sources.first),
            (TOGGLE_LANGUAGE_2, &self.bindings.toggle_sources.second),
        ] {
            match id {
                Some(id) => self.kv.set(key, id.as_bytes())?,
                None => self.kv.remove(key),
            }
        }

        self.kv
            .set(SHOW_INDICATOR, &serde_json::to_vec(&self.show_indicator)?)?;

        self.kv.flush()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> K {
        self.kv
    }
}

fn decode<T: DeserializeOwned>(kv: &impl KeyValueStore, key: &str) -> Option<T> {
    let bytes = kv.get(key)?;
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, ?e, "ignoring malformed setting");
            None
        }
    }
}

fn decode_string(kv: &impl KeyValueStore, key: &str) -> Option<String> {
    let bytes = kv.get(key)?;
    match String::from_utf8(bytes) {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, "ignoring non-UTF-8 setting");
            None
        }
    }
}
