//! Side effects of a completed watch: chat text and task derivation.
mod render;
mod task;

pub use render::{COMPLEX_OBJECT, UNKNOWN_USER, completion_message, render_value};
pub use task::derive_task;
