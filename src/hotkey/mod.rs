//! Hotkey module for global keyboard interception
//!
//! Uses macOS CGEventTap to see every key-down before normal delivery and
//! swallow the ones the engine claims.

mod keys;
mod listener;
mod trust;

pub use keys::Chord;
#[cfg(test)]
pub use keys::Modifiers;
pub use listener::EventInterceptor;
pub use trust::{ensure_trusted, AccessibilityTrust};
