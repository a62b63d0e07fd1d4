//! Window creation and keyboard translation on top of winit.

pub mod keys;
pub mod window;

pub use keys::map_key;
pub use window::{create_window, PlatformConfig};
