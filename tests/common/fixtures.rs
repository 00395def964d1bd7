use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use tempfile::NamedTempFile;

pub const BACKGROUND: Rgb<u8> = Rgb([40, 40, 40]);
pub const COIN: Rgb<u8> = Rgb([200, 180, 120]);

/// Flat coins seen from above: (x, y, radius) per coin
pub fn coin_image(width: u32, height: u32, coins: &[(i32, i32, i32)]) -> DynamicImage {
    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);
    for &(x, y, r) in coins {
        draw_filled_circle_mut(&mut img, (x, y), r, COIN);
    }
    DynamicImage::ImageRgb8(img)
}

/// A 1 centavo (radius 60) and a 1 real coin at the matching scale
pub fn cent_and_real() -> DynamicImage {
    coin_image(460, 240, &[(100, 120, CENT_RADIUS), (320, 120, REAL_RADIUS)])
}

pub const CENT_RADIUS: i32 = 60;
/// 60 * 27 / 17, rounded
pub const REAL_RADIUS: i32 = 95;

/// Saves `img` as a PNG temp file.
/// The file will be automatically cleaned up when dropped.
pub fn save_temp_png(img: &DynamicImage) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    img.save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}
