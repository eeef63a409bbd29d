/// Submission client for the prediction endpoint
///
/// Rasterizes the current crop to a PNG blob and POSTs it as multipart
/// form data. The endpoint answers HTTP 2xx with a JSON body containing
/// `predicted_text`; anything else is a failure. Exactly one request is
/// issued per invocation.
use std::io::Cursor;
use std::sync::Arc;

use image::DynamicImage;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tokio::task;

use crate::state::crop::CropRect;

/// Multipart field name the endpoint reads the upload from.
pub const IMAGE_FIELD: &str = "image";
/// Filename attached to the uploaded crop.
pub const IMAGE_FILENAME: &str = "cropped-image.png";

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("failed to encode the cropped region: {0}")]
    Encode(#[from] image::ImageError),
    #[error("encode task failed: {0}")]
    Task(String),
    #[error("request to the prediction endpoint failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("prediction endpoint returned {status}: {body}")]
    Endpoint { status: StatusCode, body: String },
}

/// Successful response body from the prediction endpoint.
#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    pub predicted_text: String,
}

/// Rasterize the crop region to an in-memory PNG.
///
/// The region is clamped to the image bounds before cropping, so any
/// geometry the editor can produce is encodable.
pub fn encode_crop_png(image: &DynamicImage, crop: CropRect) -> Result<Vec<u8>, image::ImageError> {
    let (x, y, width, height) = crop.to_pixels(image.width(), image.height());
    let cropped = image.crop_imm(x, y, width, height);

    let mut buffer = Cursor::new(Vec::new());
    cropped.write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Submit the crop to the prediction endpoint and return the recognized
/// text. Encoding runs on the blocking pool; the round trip is async.
pub async fn submit(
    client: Client,
    endpoint: String,
    image: Arc<DynamicImage>,
    crop: CropRect,
) -> Result<String, PredictError> {
    let png = task::spawn_blocking(move || encode_crop_png(&image, crop))
        .await
        .map_err(|error| PredictError::Task(error.to_string()))??;

    log::info!("Submitting a {} byte crop to {}", png.len(), endpoint);

    let part = Part::bytes(png)
        .file_name(IMAGE_FILENAME)
        .mime_str("image/png")?;
    let form = Form::new().part(IMAGE_FIELD, part);

    let response = client.post(&endpoint).multipart(form).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PredictError::Endpoint { status, body });
    }

    let parsed: PredictResponse = response.json().await?;
    Ok(parsed.predicted_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(image::RgbaImage::new(width, height))
    }

    #[test]
    fn test_response_parsing() {
        let parsed: PredictResponse =
            serde_json::from_str(r#"{"predicted_text": "Amoxicillin 500mg"}"#).unwrap();
        assert_eq!(parsed.predicted_text, "Amoxicillin 500mg");
    }

    #[test]
    fn test_response_with_unknown_fields() {
        let parsed: PredictResponse =
            serde_json::from_str(r#"{"predicted_text": "ok", "confidence": 0.93}"#).unwrap();
        assert_eq!(parsed.predicted_text, "ok");
    }

    #[test]
    fn test_malformed_response_is_an_error() {
        let parsed = serde_json::from_str::<PredictResponse>(r#"{"error": "No image uploaded"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_encode_produces_png_of_crop_dimensions() {
        let image = test_image(200, 120);
        let crop = CropRect {
            left: 10.0,
            top: 20.0,
            width: 80.0,
            height: 40.0,
        };

        let png = encode_crop_png(&image, crop).unwrap();
        assert_eq!(image::guess_format(&png).unwrap(), image::ImageFormat::Png);

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (80, 40));
    }

    #[test]
    fn test_encode_clamps_out_of_bounds_regions() {
        let image = test_image(50, 50);
        let crop = CropRect {
            left: 45.0,
            top: 45.0,
            width: 400.0,
            height: 100.0,
        };

        let png = encode_crop_png(&image, crop).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (5, 5));
    }
}
