use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("Failed to load image {origin}: {reason}")]
    ImageLoad { origin: String, reason: String },

    #[error("Invalid atlas layout: {0}")]
    Layout(String),
}

impl AtlasError {
    pub fn image_load(origin: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ImageLoad {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }
}
