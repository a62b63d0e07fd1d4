//! Sprite atlas building: decode a generated character sheet, matte out its
//! flat background, and slice it into one walk cycle per facing.

pub mod cache;
pub mod error;
pub mod matte;
pub mod metadata;
pub mod sheet;
pub mod source;

pub use cache::AtlasCache;
pub use error::AtlasError;
pub use sheet::{build_atlas, AtlasConfig, SpriteAnimation, SpriteAtlas, SpriteFrame};
pub use source::ImageSource;
