use image::{DynamicImage, ImageReader};
use std::path::{Path, PathBuf};

use crate::error::{CoinError, Result};

/// Load and decode an image file
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    reader.decode().map_err(|source| CoinError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })
}

/// Something that hands out frames on request
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<DynamicImage>;

    /// Human-readable description for log lines
    fn describe(&self) -> String;
}

/// Frame source that re-reads an image file on every capture
pub struct FileFrameSource {
    path: PathBuf,
}

impl FileFrameSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FrameSource for FileFrameSource {
    fn next_frame(&mut self) -> Result<DynamicImage> {
        load_image(&self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Frame source serving a frame already in memory
pub struct StillFrameSource {
    frame: DynamicImage,
}

impl StillFrameSource {
    pub fn new(frame: DynamicImage) -> Self {
        Self { frame }
    }
}

impl FrameSource for StillFrameSource {
    fn next_frame(&mut self) -> Result<DynamicImage> {
        Ok(self.frame.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory {}x{} frame", self.frame.width(), self.frame.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_image(Path::new("/nonexistent/coins.jpg")).unwrap_err();
        assert!(matches!(err, CoinError::Io(_)));
    }

    #[test]
    fn test_garbage_file_is_image_load_error() {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        std::fs::write(file.path(), b"not an image").unwrap();
        let err = load_image(file.path()).unwrap_err();
        assert!(matches!(err, CoinError::ImageLoad { .. }));
    }

    #[test]
    fn test_file_frame_source_reads_png() {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        image::RgbImage::new(12, 8).save(file.path()).unwrap();
        let mut source = FileFrameSource::new(file.path());
        assert_eq!(source.next_frame().unwrap().width(), 12);
    }
}
