//! Image decoding and model input preparation.

use crate::config::ClassifierPreset;
use crate::constants::detector::LETTERBOX_FILL;
use crate::error::{Error, Result};
use image::imageops::FilterType;
use image::{DynamicImage, ImageDecoder, ImageReader, RgbImage};
use std::path::Path;

/// Decode an image file, applying its EXIF orientation.
pub fn open_image(path: &Path) -> Result<DynamicImage> {
    let decode_error = |source: image::ImageError| Error::ImageDecode {
        path: path.to_path_buf(),
        source,
    };

    let reader = ImageReader::open(path)
        .and_then(ImageReader::with_guessed_format)
        .map_err(|e| decode_error(e.into()))?;
    let mut decoder = reader.into_decoder().map_err(decode_error)?;
    let orientation = decoder.orientation().map_err(decode_error)?;
    let mut image = DynamicImage::from_decoder(decoder).map_err(decode_error)?;
    image.apply_orientation(orientation);

    Ok(image)
}

/// Geometry of a letterboxed image, used to map detections back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Scale applied to the source image.
    pub ratio: f32,
    /// Left padding in model pixels.
    pub pad_x: f32,
    /// Top padding in model pixels.
    pub pad_y: f32,
    /// Source image width.
    pub width: u32,
    /// Source image height.
    pub height: u32,
}

impl Letterbox {
    /// Compute the letterbox for an image of `width`x`height` into a square of `size`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn new(width: u32, height: u32, size: u32) -> (Self, u32, u32) {
        let ratio = (size as f32 / width as f32).min(size as f32 / height as f32);
        let new_w = ((width as f32 * ratio).round() as u32).clamp(1, size);
        let new_h = ((height as f32 * ratio).round() as u32).clamp(1, size);
        let pad_x = (size - new_w) / 2;
        let pad_y = (size - new_h) / 2;

        (
            Self {
                ratio,
                pad_x: pad_x as f32,
                pad_y: pad_y as f32,
                width,
                height,
            },
            new_w,
            new_h,
        )
    }

    /// Map a model-space point back to normalized source coordinates.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_normalized(&self, x: f32, y: f32) -> (f32, f32) {
        let sx = (x - self.pad_x) / self.ratio / self.width as f32;
        let sy = (y - self.pad_y) / self.ratio / self.height as f32;
        (sx.clamp(0.0, 1.0), sy.clamp(0.0, 1.0))
    }
}

/// Letterbox an image into a `size`x`size` CHW tensor scaled to 0..1.
pub fn letterbox(image: &DynamicImage, size: u32) -> (Vec<f32>, Letterbox) {
    let (geometry, new_w, new_h) = Letterbox::new(image.width(), image.height(), size);

    let resized: RgbImage = if new_w == image.width() && new_h == image.height() {
        image.to_rgb8()
    } else {
        image
            .resize_exact(new_w, new_h, FilterType::Triangle)
            .to_rgb8()
    };

    let side = size as usize;
    let plane = side * side;
    let mut data = vec![f32::from(LETTERBOX_FILL) / 255.0; 3 * plane];

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (off_x, off_y) = (geometry.pad_x as usize, geometry.pad_y as usize);
    for (x, y, pixel) in resized.enumerate_pixels() {
        let idx = (y as usize + off_y) * side + x as usize + off_x;
        let [r, g, b] = pixel.0;
        data[idx] = f32::from(r) / 255.0;
        data[plane + idx] = f32::from(g) / 255.0;
        data[2 * plane + idx] = f32::from(b) / 255.0;
    }

    (data, geometry)
}

/// Output size when the shorter side of `w`x`h` becomes `short`.
///
/// The longer side is truncated, never rounded, and is at least `size`.
#[allow(clippy::cast_possible_truncation)]
fn resize_dims(w: u32, h: u32, short: u32, size: u32) -> (u32, u32) {
    let scale = |long: u32, side: u32| {
        let scaled = u64::from(long) * u64::from(short) / u64::from(side);
        (scaled.min(u64::from(u32::MAX)) as u32).max(size)
    };
    if w <= h {
        (short, scale(h, w))
    } else {
        (scale(w, h), short)
    }
}

/// Append the classifier input for one crop to `out` (CHW, normalized).
///
/// The shorter side is resized to the preset's resize size, then the
/// center `input_size` square is taken.
#[allow(clippy::cast_possible_truncation)]
pub fn classifier_input(crop: &DynamicImage, preset: &ClassifierPreset, out: &mut Vec<f32>) {
    let size = preset.input_size;
    let short = preset.resize_size();
    let (w, h) = (crop.width().max(1), crop.height().max(1));

    let (new_w, new_h) = resize_dims(w, h, short, size);

    let resized = crop.resize_exact(new_w, new_h, FilterType::CatmullRom);
    let left = (new_w - size) / 2;
    let top = (new_h - size) / 2;
    let cropped = resized.crop_imm(left, top, size, size).to_rgb8();

    let plane = (size * size) as usize;
    let start = out.len();
    out.resize(start + 3 * plane, 0.0);
    let tensor = &mut out[start..];

    for (x, y, pixel) in cropped.enumerate_pixels() {
        let idx = (y * size + x) as usize;
        for (c, value) in pixel.0.iter().enumerate() {
            tensor[c * plane + idx] = (f32::from(*value) / 255.0 - preset.mean[c]) / preset.std[c];
        }
    }
}
