/// Image intake
///
/// Loads the user's prescription photo from a picked or dropped path,
/// validates it, and decodes it once into a shared pixel buffer. The crop
/// editor, the result-pane preview, and the submission rasterizer all
/// borrow the same decoded image; nothing downstream re-reads the file.
///
/// Validation rules run in order, first failure wins, and their messages
/// are shown verbatim next to the upload control.
use std::path::PathBuf;
use std::sync::Arc;

use iced::widget::image::Handle;
use iced::Size;
use image::DynamicImage;
use thiserror::Error;
use tokio::task;

/// Largest accepted upload (5 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Why an upload was rejected. The `Display` strings are user-facing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("Please upload a file.")]
    Missing,
    #[error("File size must be less than 5MB.")]
    TooLarge,
    #[error("Only .jpg and .png files are accepted.")]
    UnsupportedType,
    #[error("The file could not be decoded as an image.")]
    Undecodable,
}

/// The currently selected file and its decoded preview.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    /// Where the file came from
    pub path: PathBuf,
    /// Size of the file on disk
    pub byte_size: u64,
    /// Sniffed MIME type ("image/jpeg" or "image/png")
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
    /// Decoded pixels, shared with the submission rasterizer
    pub pixels: Arc<DynamicImage>,
    /// Render handle for the crop editor and preview surfaces
    pub handle: Handle,
}

impl SelectedFile {
    /// Source dimensions in the f32 units the crop geometry works in.
    pub fn image_size(&self) -> Size {
        Size::new(self.width as f32, self.height as f32)
    }
}

/// Check the raw bytes against the upload rules and return the sniffed
/// MIME type. Presence, then size, then type; first failure wins.
pub fn validate(bytes: &[u8]) -> Result<&'static str, UploadError> {
    if bytes.is_empty() {
        return Err(UploadError::Missing);
    }
    if bytes.len() as u64 > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge);
    }
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Jpeg) => Ok("image/jpeg"),
        Ok(image::ImageFormat::Png) => Ok("image/png"),
        _ => Err(UploadError::UnsupportedType),
    }
}

/// Load and validate an image for editing.
///
/// The read is async; decoding is CPU-bound and runs on the blocking pool.
pub async fn load(path: PathBuf) -> Result<SelectedFile, UploadError> {
    let bytes = tokio::fs::read(&path).await.map_err(|error| {
        log::warn!("Could not read {}: {}", path.display(), error);
        UploadError::Missing
    })?;

    let mime = validate(&bytes)?;

    task::spawn_blocking(move || decode(path, bytes, mime))
        .await
        .map_err(|error| {
            log::error!("Decode task failed: {}", error);
            UploadError::Undecodable
        })?
}

/// Blocking decode of validated bytes into a `SelectedFile`.
fn decode(path: PathBuf, bytes: Vec<u8>, mime: &'static str) -> Result<SelectedFile, UploadError> {
    let byte_size = bytes.len() as u64;

    let decoded = image::load_from_memory(&bytes).map_err(|error| {
        log::warn!("Could not decode {}: {}", path.display(), error);
        UploadError::Undecodable
    })?;

    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let handle = Handle::from_rgba(width, height, rgba.into_raw());

    log::info!(
        "📷 Loaded {} ({}x{}, {} bytes, {})",
        path.display(),
        width,
        height,
        byte_size,
        mime
    );

    Ok(SelectedFile {
        path,
        byte_size,
        mime,
        width,
        height,
        pixels: Arc::new(decoded),
        handle,
    })
}
