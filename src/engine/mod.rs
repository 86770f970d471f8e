//! Engine module: the owner context and its toggle/select logic
//!
//! All mutable hotkey state lives in `Engine`, which runs as a single task
//! fed by `EngineHandle`s held by the event tap and the control server.

mod handle;
mod owner;
mod switcher;

pub use handle::{EngineError, EngineHandle};
pub use owner::{Engine, EngineSnapshot};
pub use switcher::Switcher;
