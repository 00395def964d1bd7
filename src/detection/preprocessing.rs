use image::{DynamicImage, GrayImage};
use image::imageops::FilterType;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;

/// Resize by percentage; 100 returns the image unchanged
pub fn resize_percent(img: &DynamicImage, scale_percent: u32) -> DynamicImage {
    if scale_percent == 100 {
        return img.clone();
    }
    let width = ((img.width() as u64 * scale_percent as u64) / 100).max(1) as u32;
    let height = ((img.height() as u64 * scale_percent as u64) / 100).max(1) as u32;
    // Triangle averages over the source footprint when shrinking
    img.resize_exact(width, height, FilterType::Triangle)
}

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Apply Gaussian blur to reduce noise
pub fn apply_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    gaussian_blur_f32(img, sigma)
}

/// Detect edges using Canny edge detector
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    canny(img, low_threshold, high_threshold)
}
