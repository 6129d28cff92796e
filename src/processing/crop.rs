//! Transparent-border cropping.

use serde::Serialize;

/// Smallest rectangle containing every pixel with non-zero alpha.
///
/// `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    /// First column with content.
    pub left: u32,
    /// First row with content.
    pub top: u32,
    /// One past the last column with content.
    pub right: u32,
    /// One past the last row with content.
    pub bottom: u32,
}

impl BoundingBox {
    /// Width of the box.
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    /// Height of the box.
    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// Grows the box by `padding` on every side, clamped to `width`×`height`.
    pub fn expand(&self, padding: u32, width: u32, height: u32) -> Self {
        Self {
            left: self.left.saturating_sub(padding),
            top: self.top.saturating_sub(padding),
            right: self.right.saturating_add(padding).min(width),
            bottom: self.bottom.saturating_add(padding).min(height),
        }
    }
}

/// Dimensions before and after a crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropReport {
    /// Original (width, height).
    pub original: (u32, u32),
    /// New (width, height).
    pub cropped: (u32, u32),
    /// Rows removed from the top.
    pub top: u32,
    /// Rows removed from the bottom.
    pub bottom: u32,
    /// Columns removed from the left.
    pub left: u32,
    /// Columns removed from the right.
    pub right: u32,
}

impl CropReport {
    fn new(width: u32, height: u32, crop: BoundingBox) -> Self {
        Self {
            original: (width, height),
            cropped: (crop.width(), crop.height()),
            top: crop.top,
            bottom: height - crop.bottom,
            left: crop.left,
            right: width - crop.right,
        }
    }
}

impl std::fmt::Display for CropReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} -> {}x{} (removed T:{} B:{} L:{} R:{})",
            self.original.0,
            self.original.1,
            self.cropped.0,
            self.cropped.1,
            self.top,
            self.bottom,
            self.left,
            self.right
        )
    }
}

/// What an auto-crop pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CropOutcome {
    /// Every pixel is transparent; nothing to keep.
    SkippedFullyTransparent,
    /// Content already touches all four edges.
    SkippedNoBorder,
    /// The bitmap was cropped.
    Cropped(CropReport),
}

impl CropOutcome {
    /// True if the bitmap changed.
    pub fn is_cropped(&self) -> bool {
        matches!(self, Self::Cropped(_))
    }
}

/// Finds the bounding box of non-transparent pixels in one pass.
#[cfg(feature = "transparency")]
pub fn bounding_box(image: &image::RgbaImage) -> Option<BoundingBox> {
    let mut bbox: Option<BoundingBox> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel.0[3] == 0 {
            continue;
        }
        bbox = Some(match bbox {
            None => BoundingBox {
                left: x,
                top: y,
                right: x + 1,
                bottom: y + 1,
            },
            Some(b) => BoundingBox {
                left: b.left.min(x),
                top: b.top.min(y),
                right: b.right.max(x + 1),
                bottom: b.bottom.max(y + 1),
            },
        });
    }
    bbox
}

/// Crops transparent borders in place, keeping `padding` pixels around
/// the content where the image allows it.
#[cfg(feature = "transparency")]
pub fn auto_crop_transparent(image: &mut image::RgbaImage, padding: u32) -> CropOutcome {
    let (width, height) = image.dimensions();
    let Some(bbox) = bounding_box(image) else {
        return CropOutcome::SkippedFullyTransparent;
    };

    let full = BoundingBox {
        left: 0,
        top: 0,
        right: width,
        bottom: height,
    };
    if bbox == full && padding == 0 {
        return CropOutcome::SkippedNoBorder;
    }

    let crop = bbox.expand(padding, width, height);
    *image = image::imageops::crop_imm(&*image, crop.left, crop.top, crop.width(), crop.height())
        .to_image();
    CropOutcome::Cropped(CropReport::new(width, height, crop))
}

#[cfg(all(test, feature = "transparency"))]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    const OPAQUE: Rgba<u8> = Rgba([200, 10, 10, 255]);

    fn block_image() -> RgbaImage {
        RgbaImage::from_fn(10, 10, |x, y| {
            if (4..=5).contains(&x) && (4..=5).contains(&y) {
                OPAQUE
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    #[test]
    fn test_bounding_box() {
        let bbox = bounding_box(&block_image()).unwrap();
        assert_eq!(
            bbox,
            BoundingBox {
                left: 4,
                top: 4,
                right: 6,
                bottom: 6
            }
        );
    }

    #[test]
    fn test_crop_without_padding() {
        let mut img = block_image();
        let outcome = auto_crop_transparent(&mut img, 0);
        assert_eq!(img.dimensions(), (2, 2));
        assert!(img.pixels().all(|p| *p == OPAQUE));
        let CropOutcome::Cropped(report) = outcome else {
            panic!("expected a crop, got {outcome:?}");
        };
        assert_eq!(report.original, (10, 10));
        assert_eq!(report.cropped, (2, 2));
        assert_eq!((report.top, report.bottom, report.left, report.right), (4, 4, 4, 4));
        assert_eq!(
            report.to_string(),
            "10x10 -> 2x2 (removed T:4 B:4 L:4 R:4)"
        );
    }

    #[test]
    fn test_crop_with_padding() {
        let mut img = block_image();
        let outcome = auto_crop_transparent(&mut img, 1);
        assert!(outcome.is_cropped());
        assert_eq!(img.dimensions(), (4, 4));
        assert_eq!(*img.get_pixel(1, 1), OPAQUE);
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_padding_clamped_to_bounds() {
        let mut img = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 0]));
        img.put_pixel(0, 9, OPAQUE);
        let outcome = auto_crop_transparent(&mut img, 3);
        assert_eq!(img.dimensions(), (4, 4));
        let CropOutcome::Cropped(report) = outcome else {
            panic!("expected a crop");
        };
        assert_eq!((report.left, report.bottom), (0, 0));
        assert_eq!((report.top, report.right), (6, 6));
    }

    #[test]
    fn test_second_pass_is_noop() {
        let mut img = block_image();
        auto_crop_transparent(&mut img, 0);
        let once = img.clone();
        assert_eq!(auto_crop_transparent(&mut img, 0), CropOutcome::SkippedNoBorder);
        assert_eq!(img, once);
    }

    #[test]
    fn test_fully_transparent() {
        let mut img = RgbaImage::new(8, 5);
        assert_eq!(
            auto_crop_transparent(&mut img, 0),
            CropOutcome::SkippedFullyTransparent
        );
        assert_eq!(img.dimensions(), (8, 5));
    }

    #[test]
    fn test_empty_bitmap() {
        let mut img = RgbaImage::new(0, 0);
        assert_eq!(
            auto_crop_transparent(&mut img, 2),
            CropOutcome::SkippedFullyTransparent
        );
    }

    #[test]
    fn test_full_extent_with_padding_keeps_size() {
        let mut img = RgbaImage::from_pixel(3, 3, OPAQUE);
        let outcome = auto_crop_transparent(&mut img, 2);
        assert!(outcome.is_cropped());
        assert_eq!(img.dimensions(), (3, 3));
    }
}
