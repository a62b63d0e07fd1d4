use std::sync::Arc;
use winit::dpi::LogicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "Codequest".to_string(),
            width: 960,
            height: 640,
            resizable: false,
        }
    }
}

impl PlatformConfig {
    pub fn attributes(&self) -> WindowAttributes {
        WindowAttributes::default()
            .with_title(&self.title)
            .with_inner_size(LogicalSize::new(self.width.max(1), self.height.max(1)))
            .with_resizable(self.resizable)
    }
}

pub fn create_window(
    event_loop: &ActiveEventLoop,
    config: &PlatformConfig,
) -> Result<Arc<Window>, String> {
    let window = event_loop
        .create_window(config.attributes())
        .map_err(|e| format!("Failed to create window '{}': {e}", config.title))?;
    log::info!(
        "Window created: '{}' {}x{}",
        config.title,
        config.width,
        config.height
    );
    Ok(Arc::new(window))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_a_fixed_size_window() {
        let config = PlatformConfig::default();
        assert_eq!((config.width, config.height), (960, 640));
        assert!(!config.resizable);
    }
}
