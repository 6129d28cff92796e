//! Green-screen background removal.

use serde::Serialize;

/// Default distance green must lead red and blue by.
pub const DEFAULT_TOLERANCE: u8 = 50;

/// Minimum green channel value for a pixel to count as background.
const MIN_GREEN: u8 = 100;

/// Result of a background removal pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GreenScreenReport {
    /// Pixels made fully transparent.
    pub cleared: u64,
    /// Pixels in the bitmap.
    pub total: u64,
}

impl GreenScreenReport {
    /// Share of pixels cleared, in percent. Zero for an empty bitmap.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.cleared as f64 / self.total as f64
        }
    }
}

impl std::fmt::Display for GreenScreenReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} pixels ({:.1}%) made transparent",
            self.cleared,
            self.percent()
        )
    }
}

/// True if the pixel is dominated by green.
pub fn is_green(r: u8, g: u8, b: u8, tolerance: u8) -> bool {
    let (r, g, b, t) = (r as u16, g as u16, b as u16, tolerance as u16);
    g > MIN_GREEN as u16 && g > r + t && g > b + t
}

/// Clears every green pixel to `(0, 0, 0, 0)`.
#[cfg(feature = "transparency")]
pub fn remove_green_screen(image: &mut image::RgbaImage, tolerance: u8) -> GreenScreenReport {
    let total = image.width() as u64 * image.height() as u64;
    let mut cleared = 0;
    for pixel in image.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        if is_green(r, g, b, tolerance) {
            *pixel = image::Rgba([0, 0, 0, 0]);
            cleared += 1;
        }
    }
    GreenScreenReport { cleared, total }
}

#[cfg(all(test, feature = "transparency"))]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    fn framed_green_square() -> RgbaImage {
        RgbaImage::from_fn(20, 20, |x, y| {
            if (5..15).contains(&x) && (5..15).contains(&y) {
                GREEN
            } else {
                RED
            }
        })
    }

    #[test]
    fn test_is_green_thresholds() {
        assert!(is_green(0, 255, 0, 50));
        assert!(!is_green(0, 100, 0, 50)); // needs g > 100
        assert!(is_green(0, 101, 0, 50));
        assert!(!is_green(150, 200, 0, 50)); // 200 is not > 150 + 50
        assert!(is_green(149, 200, 0, 50));
        assert!(!is_green(0, 200, 150, 50));
        assert!(!is_green(250, 255, 250, 255)); // no u8 overflow
    }

    #[test]
    fn test_clears_green_interior_only() {
        let mut img = framed_green_square();
        let report = remove_green_screen(&mut img, DEFAULT_TOLERANCE);

        assert_eq!(report.cleared, 100);
        assert_eq!(report.total, 400);
        assert!((report.percent() - 25.0).abs() < f64::EPSILON);

        let border = img.pixels().filter(|p| **p == RED).count();
        let clear = img.pixels().filter(|p| **p == CLEAR).count();
        assert_eq!(border, 300);
        assert_eq!(clear, 100);
    }

    #[test]
    fn test_idempotent() {
        let mut img = RgbaImage::from_fn(16, 16, |x, y| {
            Rgba([(x * 16) as u8, (y * 16) as u8 + 15, ((x + y) * 8) as u8, 200])
        });
        remove_green_screen(&mut img, 30);
        let once = img.clone();
        let second = remove_green_screen(&mut img, 30);
        assert_eq!(img, once);
        assert_eq!(second.cleared, 0);
    }

    #[test]
    fn test_leaves_alpha_of_other_pixels() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([10, 20, 30, 77]));
        img.put_pixel(1, 0, Rgba([0, 250, 0, 12]));
        let report = remove_green_screen(&mut img, DEFAULT_TOLERANCE);
        assert_eq!(report.cleared, 1);
        assert_eq!(*img.get_pixel(0, 0), Rgba([10, 20, 30, 77]));
        assert_eq!(*img.get_pixel(1, 0), CLEAR);
    }

    #[test]
    fn test_empty_bitmap() {
        let mut img = RgbaImage::new(0, 0);
        let report = remove_green_screen(&mut img, DEFAULT_TOLERANCE);
        assert_eq!(report.cleared, 0);
        assert_eq!(report.percent(), 0.0);
        assert_eq!(report.to_string(), "0 pixels (0.0%) made transparent");
    }
}
