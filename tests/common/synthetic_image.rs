use patchmatch::image::ImageRgbF;
use patchmatch::mask::{Mask, PixelLabel};

/// Generates a smooth two-axis color gradient.
pub fn gradient_rgb(width: usize, height: usize) -> ImageRgbF {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    let mut img = ImageRgbF::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let u = x as f32 / width as f32;
            let v = y as f32 / height as f32;
            img.set(x, y, [u, v, 0.5 * (u + v)]);
        }
    }
    img
}

/// Mask that is valid everywhere.
pub fn all_valid(width: usize, height: usize) -> Mask {
    Mask::new_filled(width, height, PixelLabel::Valid)
}

/// Mask valid only on the horizontal strip `y0..=y1`.
pub fn strip_mask(width: usize, height: usize, y0: usize, y1: usize) -> Mask {
    Mask::from_fn(width, height, |_, y| {
        if y >= y0 && y <= y1 {
            PixelLabel::Valid
        } else {
            PixelLabel::Hole
        }
    })
}

/// Mask with a centered square hole of half-side `hole_half`.
pub fn centered_hole(width: usize, height: usize, hole_half: i32) -> Mask {
    let cx = width as i32 / 2;
    let cy = height as i32 / 2;
    Mask::from_fn(width, height, |x, y| {
        if (x as i32 - cx).abs() <= hole_half && (y as i32 - cy).abs() <= hole_half {
            PixelLabel::Hole
        } else {
            PixelLabel::Valid
        }
    })
}

/// Inverse of `strip_mask`: valid everywhere except the strip.
pub fn strip_complement_mask(width: usize, height: usize, y0: usize, y1: usize) -> Mask {
    Mask::from_fn(width, height, |_, y| {
        if y >= y0 && y <= y1 {
            PixelLabel::Hole
        } else {
            PixelLabel::Valid
        }
    })
}
