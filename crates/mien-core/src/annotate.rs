//! Draw recognition results onto an image.
//!
//! Hollow green boxes around detected faces with the resolved name under each
//! box, matching what the result page shows. Label text needs a TTF font from
//! the host system; when none is available the boxes are still drawn and only
//! the text is skipped.

use crate::types::BoundingBox;
use ab_glyph::{FontArc, PxScale};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: i32 = 2;
const LABEL_SCALE: f32 = 20.0;
const LABEL_OFFSET_Y: i32 = 4;
const JPEG_QUALITY: u8 = 90;

/// Stock font locations tried in order when `MIEN_LABEL_FONT` is not set.
const FONT_CANDIDATES: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
];

/// One face to draw: where it is and what to call it.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub bbox: BoundingBox,
    pub label: String,
}

/// Load a TTF for label drawing.
///
/// Tries the override first, then the stock candidates. Returns `None` when no
/// usable font exists; annotation then degrades to boxes without text.
pub fn load_label_font(override_path: Option<&Path>) -> Option<FontArc> {
    let candidates: Vec<PathBuf> = override_path
        .map(Path::to_path_buf)
        .into_iter()
        .chain(FONT_CANDIDATES.iter().map(PathBuf::from))
        .collect();

    for path in &candidates {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                if override_path == Some(path.as_path()) {
                    tracing::warn!(path = %path.display(), error = %err, "label font unreadable");
                }
                continue;
            }
        };
        match FontArc::try_from_vec(bytes) {
            Ok(font) => {
                tracing::info!(path = %path.display(), "label font loaded");
                return Some(font);
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "not a usable font file");
            }
        }
    }

    tracing::warn!("no label font found; faces will be boxed but not labeled on the image");
    None
}

/// Draw every annotation onto the image in place.
///
/// Boxes and text are clipped to the image; an off-image box is a no-op,
/// never a panic.
pub fn draw_annotations(image: &mut RgbImage, annotations: &[Annotation], font: Option<&FontArc>) {
    for annotation in annotations {
        draw_box(image, &annotation.bbox);
        if let Some(font) = font {
            draw_label(image, &annotation.bbox, &annotation.label, font);
        }
    }
}

fn draw_box(image: &mut RgbImage, bbox: &BoundingBox) {
    let x = bbox.x.round() as i32;
    let y = bbox.y.round() as i32;
    let w = bbox.width.round().max(1.0) as i32;
    let h = bbox.height.round().max(1.0) as i32;

    for t in 0..BOX_THICKNESS {
        let rw = w - 2 * t;
        let rh = h - 2 * t;
        if rw < 1 || rh < 1 {
            break;
        }
        let rect = Rect::at(x + t, y + t).of_size(rw as u32, rh as u32);
        draw_hollow_rect_mut(image, rect, BOX_COLOR);
    }
}

fn draw_label(image: &mut RgbImage, bbox: &BoundingBox, label: &str, font: &FontArc) {
    let x = bbox.x.round() as i32;
    let y2 = (bbox.y + bbox.height).round() as i32;

    // Below the box's bottom-left corner, pulled back inside the image when
    // the box touches the bottom edge.
    let max_y = image.height() as i32 - LABEL_SCALE as i32;
    let label_y = (y2 + LABEL_OFFSET_Y).min(max_y).max(0);
    let label_x = x.max(0);

    draw_text_mut(
        image,
        BOX_COLOR,
        label_x,
        label_y,
        PxScale::from(LABEL_SCALE),
        font,
        label,
    );
}

/// Encode the annotated image as JPEG bytes for the result page.
pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    image.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x: f32, y: f32, w: f32, h: f32) -> BoundingBox {
        BoundingBox {
            x, y, width: w, height: h, confidence: 0.9, landmarks: None,
        }
    }

    fn annotation(x: f32, y: f32, w: f32, h: f32) -> Annotation {
        Annotation { bbox: bbox(x, y, w, h), label: "test".into() }
    }

    #[test]
    fn test_draw_box_colors_border() {
        let mut image = RgbImage::new(100, 100);
        draw_annotations(&mut image, &[annotation(10.0, 10.0, 30.0, 30.0)], None);

        // Border pixel painted green, interior untouched.
        assert_eq!(image.get_pixel(10, 10).0, [0, 255, 0]);
        assert_eq!(image.get_pixel(25, 25).0, [0, 0, 0]);
    }

    #[test]
    fn test_draw_box_thickness() {
        let mut image = RgbImage::new(100, 100);
        draw_annotations(&mut image, &[annotation(10.0, 10.0, 30.0, 30.0)], None);

        // Two nested outlines → the pixel one step inside is green too.
        assert_eq!(image.get_pixel(11, 11).0, [0, 255, 0]);
        assert_eq!(image.get_pixel(12, 12).0, [0, 0, 0]);
    }

    #[test]
    fn test_draw_box_off_image_is_noop() {
        let mut image = RgbImage::new(50, 50);
        draw_annotations(&mut image, &[annotation(-200.0, -200.0, 20.0, 20.0)], None);
        // Nothing to assert beyond "did not panic"; spot-check a pixel.
        assert_eq!(image.get_pixel(25, 25).0, [0, 0, 0]);
    }

    #[test]
    fn test_draw_box_degenerate_size() {
        let mut image = RgbImage::new(50, 50);
        draw_annotations(&mut image, &[annotation(10.0, 10.0, 0.2, 0.2)], None);
        assert_eq!(image.get_pixel(10, 10).0, [0, 255, 0]);
    }

    #[test]
    fn test_encode_jpeg_magic_bytes() {
        let image = RgbImage::from_pixel(32, 32, Rgb([200, 100, 50]));
        let bytes = encode_jpeg(&image).unwrap();
        assert!(bytes.len() > 2);
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
    }
}
