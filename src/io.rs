use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use thiserror::Error;

/// Default file name offered by the save dialog.
pub const DEFAULT_SAVE_NAME: &str = "gemini-co-drawing.png";

#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Encode pixels as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, IoError> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// Decode any supported image bytes (PNG, JPEG, WEBP) into RGBA.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, IoError> {
    Ok(image::load_from_memory(bytes)?.into_rgba8())
}

pub fn load_image(path: &Path) -> Result<RgbaImage, IoError> {
    let bytes = std::fs::read(path)?;
    decode_image(&bytes)
}

pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), IoError> {
    let bytes = encode_png(image)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Scale `image` to exactly `width`×`height` and flatten it onto white.
pub fn fit_onto_white(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let scaled = if image.dimensions() == (width, height) {
        image.clone()
    } else {
        image::imageops::resize(image, width, height, image::imageops::FilterType::Triangle)
    };
    let mut out = RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut out, &scaled, 0, 0);
    out
}

/// Remembers where the last drawing went so repeated saves start there.
#[derive(Default)]
pub struct FileHandler {
    pub last_save_path: Option<PathBuf>,
}

impl FileHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the user for a PNG destination.
    pub fn save_dialog(&self) -> Option<PathBuf> {
        let mut dialog = rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .set_file_name(DEFAULT_SAVE_NAME);
        if let Some(dir) = self.last_save_path.as_deref().and_then(Path::parent) {
            dialog = dialog.set_directory(dir);
        }
        dialog.save_file().map(|path| with_png_extension(&path))
    }

    /// Write the drawing and remember the location.
    pub fn save(&mut self, image: &RgbaImage, path: &Path) -> Result<(), IoError> {
        save_png(image, path)?;
        self.last_save_path = Some(path.to_path_buf());
        log_info!("Saved drawing to {}", path.display());
        Ok(())
    }
}

fn with_png_extension(path: &Path) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("png") => path.to_path_buf(),
        _ => path.with_extension("png"),
    }
}
