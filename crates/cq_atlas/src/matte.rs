//! Background matting for generated sprite sheets.
//!
//! Image generators hand back opaque sheets on a flat white or light-gray
//! backdrop. Any pixel that is near-white, or light and nearly colorless,
//! gets alpha 0. Dark and saturated pixels are left alone.

use image::{Rgba, RgbaImage};

/// Every channel above this is treated as white.
pub const WHITE_THRESHOLD: u8 = 220;
/// Every channel above this and within [`GRAY_TOLERANCE`] of each other is
/// treated as light gray.
pub const GRAY_THRESHOLD: u8 = 200;
pub const GRAY_TOLERANCE: u8 = 20;

pub fn is_background(pixel: &Rgba<u8>) -> bool {
    let [r, g, b, _] = pixel.0;
    if r > WHITE_THRESHOLD && g > WHITE_THRESHOLD && b > WHITE_THRESHOLD {
        return true;
    }
    r > GRAY_THRESHOLD
        && g > GRAY_THRESHOLD
        && b > GRAY_THRESHOLD
        && r.abs_diff(g) < GRAY_TOLERANCE
        && g.abs_diff(b) < GRAY_TOLERANCE
        && r.abs_diff(b) < GRAY_TOLERANCE
}

/// Clear the alpha of every background pixel in place. Returns how many
/// pixels were cleared.
pub fn remove_background(image: &mut RgbaImage) -> usize {
    let mut cleared = 0;
    for pixel in image.pixels_mut() {
        if is_background(pixel) {
            pixel.0[3] = 0;
            cleared += 1;
        }
    }
    cleared
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_becomes_transparent() {
        let mut image = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255]));
        assert_eq!(remove_background(&mut image), 4);
        assert_eq!(image.get_pixel(1, 1).0[3], 0);
    }

    #[test]
    fn dark_pixel_is_untouched() {
        let mut image = RgbaImage::from_pixel(1, 1, Rgba([10, 10, 10, 255]));
        assert_eq!(remove_background(&mut image), 0);
        assert_eq!(image.get_pixel(0, 0), &Rgba([10, 10, 10, 255]));
    }

    #[test]
    fn light_gray_is_background() {
        assert!(is_background(&Rgba([205, 210, 215, 255])));
        assert!(is_background(&Rgba([221, 221, 221, 255])));
    }

    #[test]
    fn light_but_tinted_pixel_is_kept() {
        // All channels above 200 but red and blue are 25 apart.
        assert!(!is_background(&Rgba([230, 215, 205, 255])));
        // Pale skin tone: one channel at or below 200.
        assert!(!is_background(&Rgba([240, 210, 200, 255])));
    }

    #[test]
    fn threshold_edges_are_exclusive() {
        assert!(!is_background(&Rgba([200, 200, 200, 255])));
        assert!(is_background(&Rgba([201, 201, 201, 255])));
    }

    #[test]
    fn mixed_image_only_clears_background() {
        let mut image = RgbaImage::from_pixel(4, 1, Rgba([250, 250, 250, 255]));
        image.put_pixel(2, 0, Rgba([120, 40, 40, 255]));
        assert_eq!(remove_background(&mut image), 3);
        assert_eq!(image.get_pixel(2, 0).0[3], 255);
    }
}
