use image::{imageops::FilterType, DynamicImage, ImageFormat};
use std::io::Cursor;

/// Longest edge kept as-is; anything larger is scaled down to this.
pub const MAX_DIMENSION_PX: u32 = 1600;

/// Decoded uploads larger than this are rejected before any work.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024; // 10MB

/// Target size for an image whose longest edge exceeds `max`, keeping the
/// aspect ratio. `None` when no resize is needed.
pub fn fit_within(width: u32, height: u32, max: u32) -> Option<(u32, u32)> {
    if width <= max && height <= max {
        return None;
    }
    let scale = max as f64 / width.max(height) as f64;
    let scaled = |edge: u32| ((edge as f64 * scale).round() as u32).max(1);
    Some((scaled(width), scaled(height)))
}

/// Normalized image ready for storage.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub extension: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Validate that `bytes` is a decodable image and downscale it if too large.
/// Images within bounds keep their original encoding; downscaled ones are
/// re-encoded as JPEG.
pub fn process(bytes: Vec<u8>) -> Result<ProcessedImage, String> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(format!(
            "Image is larger than {} MB",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        ));
    }

    let format = image::guess_format(&bytes).map_err(|_| "Unrecognized image format".to_string())?;
    let img = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| format!("Failed to load image: {}", e))?;
    let (width, height) = (img.width(), img.height());

    match fit_within(width, height, MAX_DIMENSION_PX) {
        None => {
            let (content_type, extension) = describe(format)?;
            Ok(ProcessedImage {
                bytes,
                content_type: content_type.to_string(),
                extension,
                width,
                height,
            })
        }
        Some((new_width, new_height)) => {
            let resized = img.resize(new_width, new_height, FilterType::Lanczos3);
            let bytes = encode_jpeg(resized)?;
            Ok(ProcessedImage {
                bytes,
                content_type: "image/jpeg".to_string(),
                extension: "jpg",
                width: new_width,
                height: new_height,
            })
        }
    }
}

fn describe(format: ImageFormat) -> Result<(&'static str, &'static str), String> {
    match format {
        ImageFormat::Jpeg => Ok(("image/jpeg", "jpg")),
        ImageFormat::Png => Ok(("image/png", "png")),
        ImageFormat::Gif => Ok(("image/gif", "gif")),
        ImageFormat::WebP => Ok(("image/webp", "webp")),
        other => Err(format!("Unsupported image format: {:?}", other)),
    }
}

fn encode_jpeg(img: DynamicImage) -> Result<Vec<u8>, String> {
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Cursor::new(Vec::new());
    rgb.write_to(&mut buf, ImageFormat::Jpeg)
        .map_err(|e| format!("Failed to encode JPEG: {}", e))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([120, 80, 40, 255]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_fit_within() {
        assert_eq!(fit_within(1024, 768, 1600), None);
        assert_eq!(fit_within(1600, 1600, 1600), None);
        assert_eq!(fit_within(3200, 1600, 1600), Some((1600, 800)));
        assert_eq!(fit_within(1000, 4000, 1600), Some((400, 1600)));
        assert_eq!(fit_within(10_000, 1, 1600), Some((1600, 1)));
    }

    #[test]
    fn test_small_image_is_kept() {
        let bytes = png(40, 30);
        let processed = process(bytes.clone()).unwrap();
        assert_eq!(processed.bytes, bytes);
        assert_eq!(processed.content_type, "image/png");
        assert_eq!(processed.extension, "png");
    }

    #[test]
    fn test_large_image_is_downscaled_to_jpeg() {
        let processed = process(png(2000, 1000)).unwrap();
        assert_eq!((processed.width, processed.height), (1600, 800));
        assert_eq!(processed.content_type, "image/jpeg");
        let decoded = image::load_from_memory(&processed.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1600, 800));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(process(b"not an image at all".to_vec()).is_err());
    }
}
