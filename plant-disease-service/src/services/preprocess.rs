//! Image decoding and tensor preparation for the classifier.

use super::classifier::ClassifierError;
use image::imageops::FilterType;

/// Number of colour channels fed to the model.
pub const CHANNELS: usize = 3;

/// A single-image batch in NHWC layout with raw 0-255 intensities.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    pub shape: [usize; 4],
    pub data: Vec<f32>,
}

/// Decode `bytes`, stretch to `size`×`size` and flatten as R, G, B, ...
///
/// Alpha is discarded and greyscale is expanded so the batch always carries
/// three channels.
pub fn prepare_image(bytes: &[u8], size: u32) -> Result<ImageTensor, ClassifierError> {
    let img = image::load_from_memory(bytes).map_err(|e| ClassifierError::Decode(e.to_string()))?;

    tracing::debug!(
        width = img.width(),
        height = img.height(),
        color = ?img.color(),
        "Decoded upload"
    );

    let resized = img.resize_exact(size, size, FilterType::CatmullRom);
    let rgb = resized.to_rgb8();
    let data: Vec<f32> = rgb.into_raw().into_iter().map(f32::from).collect();

    Ok(ImageTensor {
        shape: [1, size as usize, size as usize, CHANNELS],
        data,
    })
}
