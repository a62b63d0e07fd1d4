//! Slicing a 4x4 character sheet into per-facing walk cycles.
//!
//! Rows are facings (down, left, right, up), columns are the four
//! walk-cycle frames. Frame boundaries are whole pixels computed by
//! floor division so adjacent frames never share a column of pixels.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use cq_core::Direction;

use crate::error::AtlasError;
use crate::matte::remove_background;
use crate::source::ImageSource;

pub const SHEET_ROWS: u32 = 4;
pub const FRAMES_PER_ANIMATION: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteFrame {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteAnimation {
    pub name: &'static str,
    pub direction: Direction,
    pub frames: [SpriteFrame; FRAMES_PER_ANIMATION],
    /// Movement-loop ticks per frame advance.
    pub ticks_per_frame: u32,
}

/// Optional overrides for sheets that do not follow the default grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    pub offset_x: u32,
    pub offset_y: u32,
    pub frame_width: Option<u32>,
    pub frame_height: Option<u32>,
    /// Columns in the sheet. Only the first four are used.
    pub columns: u32,
    pub ticks_per_frame: u32,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            offset_x: 0,
            offset_y: 0,
            frame_width: None,
            frame_height: None,
            columns: FRAMES_PER_ANIMATION as u32,
            ticks_per_frame: 6,
        }
    }
}

/// A matted sheet plus its four walk cycles. Shared read-only between every
/// entity of the same creature type.
#[derive(Debug, Clone)]
pub struct SpriteAtlas {
    image: RgbaImage,
    animations: [SpriteAnimation; 4],
    pub frame_width: u32,
    pub frame_height: u32,
    pub cleared_pixels: usize,
}

impl SpriteAtlas {
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn animations(&self) -> &[SpriteAnimation; 4] {
        &self.animations
    }

    pub fn animation(&self, direction: Direction) -> &SpriteAnimation {
        &self.animations[direction.sheet_row() as usize]
    }

    /// Frame rect for a walk-cycle index. The index wraps.
    pub fn frame(&self, direction: Direction, index: usize) -> SpriteFrame {
        self.animation(direction).frames[index % FRAMES_PER_ANIMATION]
    }

    /// Copy of one frame's pixels.
    pub fn frame_image(&self, direction: Direction, index: usize) -> RgbaImage {
        let frame = self.frame(direction, index);
        image::imageops::crop_imm(&self.image, frame.x, frame.y, frame.width, frame.height)
            .to_image()
    }

    /// Flat-colored stand-in used while a real sheet is loading or after it
    /// failed. Each facing gets its own shade so turning stays visible.
    pub fn placeholder(frame_width: u32, frame_height: u32, ticks_per_frame: u32) -> Self {
        const SHADES: [[u8; 4]; 4] = [
            [70, 110, 200, 255],
            [70, 170, 120, 255],
            [200, 150, 60, 255],
            [160, 80, 170, 255],
        ];
        let frame_width = frame_width.max(1);
        let frame_height = frame_height.max(1);
        let image = RgbaImage::from_fn(
            frame_width * FRAMES_PER_ANIMATION as u32,
            frame_height * SHEET_ROWS,
            |_, y| image::Rgba(SHADES[(y / frame_height).min(SHEET_ROWS - 1) as usize]),
        );
        let animations = Direction::SHEET_ORDER.map(|direction| SpriteAnimation {
            name: direction.animation_name(),
            direction,
            frames: [0u32, 1, 2, 3].map(|column| SpriteFrame {
                x: column * frame_width,
                y: direction.sheet_row() * frame_height,
                width: frame_width,
                height: frame_height,
            }),
            ticks_per_frame: ticks_per_frame.max(1),
        });
        Self {
            image,
            animations,
            frame_width,
            frame_height,
            cleared_pixels: 0,
        }
    }
}

/// Compute the four walk cycles for a sheet of the given size.
pub fn slice_sheet(
    width: u32,
    height: u32,
    config: &AtlasConfig,
) -> Result<[SpriteAnimation; 4], AtlasError> {
    if (config.columns as usize) < FRAMES_PER_ANIMATION {
        return Err(AtlasError::Layout(format!(
            "sheet needs at least {} columns, config has {}",
            FRAMES_PER_ANIMATION, config.columns
        )));
    }
    let frame_width = config
        .frame_width
        .unwrap_or(width.saturating_sub(config.offset_x) / config.columns);
    let frame_height = config
        .frame_height
        .unwrap_or(height.saturating_sub(config.offset_y) / SHEET_ROWS);
    if frame_width == 0 || frame_height == 0 {
        return Err(AtlasError::Layout(format!(
            "{}x{} sheet yields zero-sized frames ({}x{})",
            width, height, frame_width, frame_height
        )));
    }

    let right = u64::from(config.offset_x) + u64::from(frame_width) * FRAMES_PER_ANIMATION as u64;
    let bottom = u64::from(config.offset_y) + u64::from(frame_height) * u64::from(SHEET_ROWS);
    if right > u64::from(width) || bottom > u64::from(height) {
        return Err(AtlasError::Layout(format!(
            "frames extend to {}x{} but the sheet is {}x{}",
            right, bottom, width, height
        )));
    }

    Ok(Direction::SHEET_ORDER.map(|direction| {
        let y = config.offset_y + direction.sheet_row() * frame_height;
        let frames = [0u32, 1, 2, 3].map(|column| SpriteFrame {
            x: config.offset_x + column * frame_width,
            y,
            width: frame_width,
            height: frame_height,
        });
        SpriteAnimation {
            name: direction.animation_name(),
            direction,
            frames,
            ticks_per_frame: config.ticks_per_frame.max(1),
        }
    }))
}

/// Matte and slice an already decoded sheet. `image` is not modified.
pub fn build_atlas_from_image(
    image: &RgbaImage,
    config: &AtlasConfig,
) -> Result<SpriteAtlas, AtlasError> {
    let (width, height) = image.dimensions();
    let animations = slice_sheet(width, height, config)?;
    let mut processed = image.clone();
    let cleared_pixels = remove_background(&mut processed);
    let frame = animations[0].frames[0];
    Ok(SpriteAtlas {
        image: processed,
        animations,
        frame_width: frame.width,
        frame_height: frame.height,
        cleared_pixels,
    })
}

pub fn build_atlas(source: &ImageSource, config: &AtlasConfig) -> Result<SpriteAtlas, AtlasError> {
    let image = source.load()?;
    let atlas = build_atlas_from_image(&image, config)?;
    log::debug!(
        "Built atlas from {}: {}x{} frames, {} background pixels cleared",
        source.describe(),
        atlas.frame_width,
        atlas.frame_height,
        atlas.cleared_pixels
    );
    Ok(atlas)
}
