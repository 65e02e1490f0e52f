use std::io::Cursor;

use image::{DynamicImage, ImageFormat};

/// Decode fetched bytes into an image.
///
/// Failure here is fatal for the job: re-fetching cannot make undecodable
/// content decodable, so there is no retry path.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ConvertError> {
    image::load_from_memory(bytes).map_err(ConvertError::Decode)
}

/// Convert a decoded image to greyscale and encode it as PNG.
///
/// Pure transform, no I/O; identical input pixels yield byte-identical
/// output.
pub fn to_greyscale_png(image: &DynamicImage) -> Result<Vec<u8>, ConvertError> {
    let greyscaled = DynamicImage::ImageLuma8(image.to_luma8());
    let mut out = Cursor::new(Vec::new());
    greyscaled
        .write_to(&mut out, ImageFormat::Png)
        .map_err(ConvertError::Encode)?;
    Ok(out.into_inner())
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Image decode failed: {0}")]
    Decode(image::ImageError),

    #[error("PNG encode failed: {0}")]
    Encode(image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ColorType, ImageBuffer, Rgb};

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

    fn sample_image() -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(32, 16, |x, y| {
            Rgb([(x * 8) as u8, (y * 16) as u8, 200])
        }))
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode(b"definitely not an image"),
            Err(ConvertError::Decode(_))
        ));
    }

    #[test]
    fn decode_accepts_png_bytes() {
        let png = to_greyscale_png(&sample_image()).unwrap();
        let decoded = decode(&png).unwrap();
        assert_eq!(decoded.width(), 32);
        assert_eq!(decoded.height(), 16);
    }

    #[test]
    fn output_is_greyscale_png() {
        let png = to_greyscale_png(&sample_image()).unwrap();
        assert_eq!(&png[..8], PNG_MAGIC);

        let decoded = decode(&png).unwrap();
        assert_eq!(decoded.color(), ColorType::L8);
    }

    #[test]
    fn conversion_is_deterministic() {
        let image = sample_image();
        let first = to_greyscale_png(&image).unwrap();
        let second = to_greyscale_png(&image).unwrap();
        assert_eq!(first, second);
    }
}
