//! Avatar normalisation: every accepted upload is stored as a 250x250 PNG.

use std::io::Cursor;
use std::path::Path;

use image::ImageFormat;
use image::imageops::FilterType;

use crate::validation::ValidationErrors;

/// Largest accepted upload, in bytes.
pub const MAX_AVATAR_BYTES: usize = 1_000_000;
/// Edge length of the stored square avatar.
pub const AVATAR_SIZE: u32 = 250;

const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

fn rejected(message: &str) -> ValidationErrors {
    ValidationErrors::single("avatar", message)
}

/// Check an uploaded file and convert it to the stored PNG form.
pub fn normalize_avatar(file_name: &str, bytes: &[u8]) -> Result<Vec<u8>, ValidationErrors> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    if !extension.is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str())) {
        return Err(rejected("Please upload an image."));
    }

    if bytes.len() > MAX_AVATAR_BYTES {
        return Err(rejected("File too large."));
    }
    if bytes.is_empty() {
        return Err(rejected("Please upload an image."));
    }

    let img = image::load_from_memory(bytes).map_err(|e| {
        tracing::debug!("Rejected undecodable avatar: {}", e);
        rejected("Unable to read image.")
    })?;

    let resized = img.resize_to_fill(AVATAR_SIZE, AVATAR_SIZE, FilterType::Lanczos3);

    let mut png = Vec::new();
    resized
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| {
            tracing::warn!("Failed to encode avatar: {}", e);
            rejected("Unable to read image.")
        })?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageBuffer, Rgb};

    fn create_test_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn test_png_is_resized_to_square() {
        let input = create_test_image(640, 480, ImageFormat::Png);
        let output = normalize_avatar("me.png", &input).unwrap();

        let decoded = image::load_from_memory_with_format(&output, ImageFormat::Png).unwrap();
        assert_eq!(decoded.dimensions(), (AVATAR_SIZE, AVATAR_SIZE));
    }

    #[test]
    fn test_jpeg_becomes_png() {
        let input = create_test_image(100, 300, ImageFormat::Jpeg);
        let output = normalize_avatar("Photo.JPG", &input).unwrap();

        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!(decoded.dimensions(), (AVATAR_SIZE, AVATAR_SIZE));
    }

    #[test]
    fn test_extension_is_checked() {
        let input = create_test_image(10, 10, ImageFormat::Png);
        for name in ["me.gif", "me", "me.png.exe", "png"] {
            let err = normalize_avatar(name, &input).unwrap_err();
            assert_eq!(err.message(), "Please upload an image.", "{}", name);
        }
    }

    #[test]
    fn test_size_limit() {
        let oversized = vec![0u8; MAX_AVATAR_BYTES + 1];
        let err = normalize_avatar("big.png", &oversized).unwrap_err();
        assert!(err.has("avatar"));
        assert_eq!(err.message(), "File too large.");
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let err = normalize_avatar("fake.png", b"not an image").unwrap_err();
        assert_eq!(err.message(), "Unable to read image.");
    }
}
