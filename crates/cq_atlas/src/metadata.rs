//! JSON description of a built atlas, written next to its matted PNG so a
//! render layer can draw frames without re-slicing the sheet.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use cq_core::Direction;

use crate::sheet::{SpriteAtlas, SpriteFrame, FRAMES_PER_ANIMATION};

pub const METADATA_VERSION: &str = "0.1";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AtlasMetadata {
    pub version: String,
    pub atlas_id: String,
    pub texture: AtlasTexture,
    pub frame_width: u32,
    pub frame_height: u32,
    pub animations: Vec<AnimationMetadata>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AtlasTexture {
    pub path: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnimationMetadata {
    pub name: String,
    pub direction: Direction,
    pub ticks_per_frame: u32,
    pub frames: Vec<SpriteFrame>,
}

impl AtlasMetadata {
    pub fn from_atlas(atlas: &SpriteAtlas, atlas_id: &str, texture_path: &str) -> Self {
        let (width, height) = atlas.image().dimensions();
        Self {
            version: METADATA_VERSION.to_string(),
            atlas_id: atlas_id.to_string(),
            texture: AtlasTexture {
                path: texture_path.to_string(),
                width,
                height,
            },
            frame_width: atlas.frame_width,
            frame_height: atlas.frame_height,
            animations: atlas
                .animations()
                .iter()
                .map(|animation| AnimationMetadata {
                    name: animation.name.to_string(),
                    direction: animation.direction,
                    ticks_per_frame: animation.ticks_per_frame,
                    frames: animation.frames.to_vec(),
                })
                .collect(),
        }
    }
}

pub fn load_atlas_metadata_from_path(path: &Path) -> Result<AtlasMetadata, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read atlas metadata {}: {e}", path.display()))?;
    let metadata: AtlasMetadata = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse atlas metadata {}: {e}", path.display()))?;
    validate_metadata(&metadata)?;
    Ok(metadata)
}

fn validate_metadata(metadata: &AtlasMetadata) -> Result<(), String> {
    if metadata.version != METADATA_VERSION {
        return Err(format!(
            "Atlas validation failed: unsupported version '{}'",
            metadata.version
        ));
    }
    if metadata.texture.width == 0 || metadata.texture.height == 0 {
        return Err("Atlas validation failed: texture width/height must be > 0".to_string());
    }

    let mut directions = HashSet::new();
    for animation in &metadata.animations {
        if !directions.insert(animation.direction) {
            return Err(format!(
                "Atlas validation failed: duplicate animation for direction '{}'",
                animation.direction
            ));
        }
        if animation.frames.len() != FRAMES_PER_ANIMATION {
            return Err(format!(
                "Atlas validation failed: animation '{}' has {} frames, expected {}",
                animation.name,
                animation.frames.len(),
                FRAMES_PER_ANIMATION
            ));
        }
        for frame in &animation.frames {
            let right = u64::from(frame.x) + u64::from(frame.width);
            let bottom = u64::from(frame.y) + u64::from(frame.height);
            if frame.width == 0 || frame.height == 0 {
                return Err(format!(
                    "Atlas validation failed: animation '{}' has a zero-sized frame",
                    animation.name
                ));
            }
            if right > u64::from(metadata.texture.width)
                || bottom > u64::from(metadata.texture.height)
            {
                return Err(format!(
                    "Atlas validation failed: animation '{}' frame exceeds texture bounds",
                    animation.name
                ));
            }
        }
    }
    if directions.len() != 4 {
        return Err(format!(
            "Atlas validation failed: expected 4 directions, found {}",
            directions.len()
        ));
    }
    Ok(())
}
