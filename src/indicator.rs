//! On-screen indicator seam
//!
//! Rendering and the auto-dismiss timer belong to the UI process; the
//! daemon only announces which code to show.

use tokio::sync::broadcast;
use tracing::debug;

use crate::events::ToggleEvent;

/// Fire-and-forget indicator collaborator
pub trait Indicator: Send {
    fn show(&self, code: &str);
}

/// Indicator that forwards codes to subscribed UI clients
pub struct EventIndicator {
    events: broadcast::Sender<ToggleEvent>,
}

impl EventIndicator {
    pub fn new(events: broadcast::Sender<ToggleEvent>) -> Self {
        Self { events }
    }
}

impl Indicator for EventIndicator {
    fn show(&self, code: &str) {
        debug!(code, "showing indicator");
        // No subscribers is fine: nothing is on screen to update.
        let _ = self.events.send(ToggleEvent::IndicatorShown {
            code: code.to_string(),
        });
    }
}
