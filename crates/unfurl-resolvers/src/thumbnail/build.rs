//! Image transformations. Everything here is CPU bound and runs on the
//! blocking pool.

use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::webp::WebPDecoder;
use image::imageops::{self, FilterType};
use image::{AnimationDecoder, DynamicImage, Frame, ImageFormat, RgbaImage};
use std::io::Cursor;
use unfurl_core::{Error, Result};

/// Encoded image with the content type to serve it under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Largest size with the same aspect ratio fitting in a `max` square.
/// Never upscales and never returns a zero side.
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    let scale = f64::from(max) / f64::from(width.max(height));
    let scaled = |side: u32| ((f64::from(side) * scale).round() as u32).max(1);
    (scaled(width), scaled(height))
}

/// Single-frame thumbnail. Input that already fits is returned untouched.
/// The output type follows the sniffed input format, not the declared one.
pub fn build_static(bytes: &[u8], max_size: u32) -> Result<Thumbnail> {
    let format = image::guess_format(bytes).map_err(thumbnail_error)?;
    let image = image::load_from_memory_with_format(bytes, format).map_err(thumbnail_error)?;

    let (width, height) = fit_within(image.width(), image.height(), max_size);
    if (width, height) == (image.width(), image.height()) {
        return Ok(Thumbnail {
            bytes: bytes.to_vec(),
            content_type: format.to_mime_type().to_string(),
        });
    }

    let resized = image.resize(width, height, FilterType::Triangle);
    if format == ImageFormat::Jpeg {
        let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
        Ok(Thumbnail {
            bytes: encode(&rgb, ImageFormat::Jpeg)?,
            content_type: "image/jpeg".to_string(),
        })
    } else {
        Ok(Thumbnail {
            bytes: encode(&resized, ImageFormat::Png)?,
            content_type: "image/png".to_string(),
        })
    }
}

/// Multi-frame thumbnail, always re-encoded as a looping GIF. Input with
/// fewer than two frames is rejected so the caller can fall back to
/// [`build_static`].
pub fn build_animated(bytes: &[u8], mime_type: &str, max_size: u32) -> Result<Thumbnail> {
    let frames = match mime_type {
        "image/gif" => GifDecoder::new(Cursor::new(bytes))
            .map_err(thumbnail_error)?
            .into_frames()
            .collect_frames(),
        "image/webp" => WebPDecoder::new(Cursor::new(bytes))
            .map_err(thumbnail_error)?
            .into_frames()
            .collect_frames(),
        other => {
            return Err(Error::Thumbnail(format!("{other} cannot be animated")));
        }
    }
    .map_err(thumbnail_error)?;

    if frames.len() < 2 {
        return Err(Error::Thumbnail(format!(
            "expected an animation, found {} frame(s)",
            frames.len()
        )));
    }

    let resized = frames.into_iter().map(|frame| {
        let delay = frame.delay();
        let (left, top) = (frame.left(), frame.top());
        let buffer = frame.into_buffer();
        let (width, height) = fit_within(buffer.width(), buffer.height(), max_size);
        if (width, height) == (buffer.width(), buffer.height()) {
            Frame::from_parts(buffer, left, top, delay)
        } else {
            let buffer = imageops::resize(&buffer, width, height, FilterType::Triangle);
            Frame::from_parts(buffer, 0, 0, delay)
        }
    });

    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut out);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(thumbnail_error)?;
        encoder.encode_frames(resized).map_err(thumbnail_error)?;
    }

    Ok(Thumbnail {
        bytes: out,
        content_type: "image/gif".to_string(),
    })
}

/// Scale every image to the height of the shortest one and lay them out
/// left to right. The result is a PNG.
pub fn build_collage(images: &[Vec<u8>]) -> Result<Thumbnail> {
    let decoded = images
        .iter()
        .map(|bytes| image::load_from_memory(bytes).map_err(thumbnail_error))
        .collect::<Result<Vec<_>>>()?;

    let height = decoded
        .iter()
        .map(DynamicImage::height)
        .min()
        .ok_or_else(|| Error::Thumbnail("collage needs at least one image".to_string()))?;

    let scaled: Vec<RgbaImage> = decoded
        .into_iter()
        .map(|image| {
            if image.height() == height {
                image.to_rgba8()
            } else {
                let width = (u64::from(image.width()) * u64::from(height)
                    / u64::from(image.height()))
                .max(1) as u32;
                image.resize_exact(width, height, FilterType::Triangle).to_rgba8()
            }
        })
        .collect();

    let width: u32 = scaled.iter().map(RgbaImage::width).sum();
    let mut canvas = RgbaImage::new(width, height);
    let mut x = 0i64;
    for image in &scaled {
        imageops::overlay(&mut canvas, image, x, 0);
        x += i64::from(image.width());
    }

    Ok(Thumbnail {
        bytes: encode(&DynamicImage::ImageRgba8(canvas), ImageFormat::Png)?,
        content_type: "image/png".to_string(),
    })
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).map_err(thumbnail_error)?;
    Ok(out.into_inner())
}

fn thumbnail_error(err: image::ImageError) -> Error {
    Error::Thumbnail(err.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Delay, Rgba};

    pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]));
        encode(&DynamicImage::ImageRgba8(image), ImageFormat::Png).unwrap()
    }

    pub(crate) fn gif(width: u32, height: u32, frames: usize) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut out);
            for i in 0..frames {
                let shade = (i * 60) as u8;
                let buffer = RgbaImage::from_pixel(width, height, Rgba([shade, 0, 0, 255]));
                encoder
                    .encode_frame(Frame::from_parts(
                        buffer,
                        0,
                        0,
                        Delay::from_numer_denom_ms(100, 1),
                    ))
                    .unwrap();
            }
        }
        out
    }

    #[test]
    fn test_fit_within() {
        assert_eq!(fit_within(100, 50, 300), (100, 50));
        assert_eq!(fit_within(600, 300, 300), (300, 150));
        assert_eq!(fit_within(300, 900, 300), (100, 300));
        assert_eq!(fit_within(10_000, 1, 300), (300, 1));
    }

    #[test]
    fn test_static_keeps_small_images() {
        let bytes = png(20, 10);
        let thumbnail = build_static(&bytes, 300).unwrap();
        assert_eq!(thumbnail.bytes, bytes);
        assert_eq!(thumbnail.content_type, "image/png");
    }

    #[test]
    fn test_static_downscales() {
        let thumbnail = build_static(&png(600, 200), 300).unwrap();
        assert_eq!(thumbnail.content_type, "image/png");

        let decoded = image::load_from_memory(&thumbnail.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (300, 100));
    }

    #[test]
    fn test_static_rejects_garbage() {
        assert!(matches!(
            build_static(b"not an image", 300),
            Err(Error::Thumbnail(_))
        ));
    }

    #[test]
    fn test_animated_resizes_frames() {
        let thumbnail = build_animated(&gif(400, 400, 3), "image/gif", 100).unwrap();
        assert_eq!(thumbnail.content_type, "image/gif");

        let frames = GifDecoder::new(Cursor::new(thumbnail.bytes))
            .unwrap()
            .into_frames()
            .collect_frames()
            .unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].buffer().dimensions(), (100, 100));
    }

    #[test]
    fn test_animated_needs_two_frames() {
        assert!(build_animated(&gif(10, 10, 1), "image/gif", 100).is_err());
        assert!(build_animated(&png(10, 10), "image/gif", 100).is_err());
    }

    #[test]
    fn test_collage_uses_shortest_height() {
        let collage = build_collage(&[png(100, 100), png(40, 20)]).unwrap();
        let decoded = image::load_from_memory(&collage.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (60, 20));
    }

    #[test]
    fn test_collage_of_nothing_fails() {
        assert!(build_collage(&[]).is_err());
    }
}
