//! I/O helpers at the crate boundary.
//!
//! - `load_rgb_image`: read a PNG/JPEG/EXR/etc. into an owned float RGB buffer.
//! - `load_mask_image`: read a grayscale image as a hole/valid mask.
//! - `save_rgbf_image` / `load_rgbf_image`: float round-trip through OpenEXR.
//! - `write_nnf_image` / `read_nnf_image`: persist a nearest-neighbor field as
//!   its 3-component centers image.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::ImageRgbF;
use crate::error::PatchMatchError;
use crate::mask::{Mask, PixelLabel};
use crate::nnf::NearestNeighborField;
use image::DynamicImage;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Gray levels above this threshold count as valid mask pixels.
const MASK_VALID_THRESHOLD: u8 = 127;

/// Load an image from disk and convert to 3-channel f32 (components in [0, 1]
/// for integer inputs).
pub fn load_rgb_image(path: &Path) -> Result<ImageRgbF, PatchMatchError> {
    let img = image::open(path)
        .map_err(|e| PatchMatchError::io(path, format!("failed to open image: {e}")))?
        .into_rgb32f();
    let width = img.width() as usize;
    let height = img.height() as usize;
    let pixels = pack_rgb(img.into_raw());
    Ok(ImageRgbF::from_pixels(width, height, pixels))
}

/// Load a grayscale image as a mask: pixels brighter than 127 are valid,
/// the rest are hole.
pub fn load_mask_image(path: &Path) -> Result<Mask, PatchMatchError> {
    let img = image::open(path)
        .map_err(|e| PatchMatchError::io(path, format!("failed to open mask: {e}")))?
        .into_luma8();
    let width = img.width() as usize;
    let height = img.height() as usize;
    let data = img.into_raw();
    Ok(Mask::from_fn(width, height, |x, y| {
        if data[y * width + x] > MASK_VALID_THRESHOLD {
            PixelLabel::Valid
        } else {
            PixelLabel::Hole
        }
    }))
}

/// Save a float image to OpenEXR, preserving component values exactly.
pub fn save_rgbf_image(img: &ImageRgbF, path: &Path) -> Result<(), PatchMatchError> {
    ensure_parent_dir(path)?;
    let mut raw = Vec::with_capacity(img.w * img.h * 3);
    for y in 0..img.h {
        for px in img.row(y) {
            raw.extend_from_slice(px);
        }
    }
    let buffer = image::Rgb32FImage::from_raw(img.w as u32, img.h as u32, raw)
        .ok_or_else(|| PatchMatchError::io(path, "failed to assemble image buffer"))?;
    DynamicImage::ImageRgb32F(buffer)
        .save(path)
        .map_err(|e| PatchMatchError::io(path, format!("failed to save image: {e}")))
}

/// Load a float image previously written by [`save_rgbf_image`].
pub fn load_rgbf_image(path: &Path) -> Result<ImageRgbF, PatchMatchError> {
    load_rgb_image(path)
}

/// Write a nearest-neighbor field as its centers image
/// `(center_x, center_y, best_score)`.
pub fn write_nnf_image(nnf: &NearestNeighborField, path: &Path) -> Result<(), PatchMatchError> {
    save_rgbf_image(&nnf.centers_image(), path)
}

/// Reconstruct a nearest-neighbor field from a centers image written by
/// [`write_nnf_image`]. Every match becomes the patch of `patch_radius`
/// around the stored center; NaN scores mark explicitly unfilled pixels.
pub fn read_nnf_image(
    path: &Path,
    patch_radius: u32,
    k: usize,
) -> Result<NearestNeighborField, PatchMatchError> {
    let centers = load_rgbf_image(path)?;
    Ok(NearestNeighborField::from_centers_image(
        &centers,
        patch_radius,
        k,
    ))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), PatchMatchError> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| PatchMatchError::io(path, format!("failed to serialize JSON: {e}")))?;
    fs::write(path, json)
        .map_err(|e| PatchMatchError::io(path, format!("failed to write JSON: {e}")))
}

fn ensure_parent_dir(path: &Path) -> Result<(), PatchMatchError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| PatchMatchError::io(parent, format!("failed to create: {e}")))?;
        }
    }
    Ok(())
}

fn pack_rgb(raw: Vec<f32>) -> Vec<[f32; 3]> {
    raw.chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect()
}
