//! Local pixel processing: green-screen removal and auto-crop.
//!
//! The bitmap functions operate on an in-memory [`image::RgbaImage`]. The
//! `*_file` functions decode a file, run one pass and re-encode it in
//! place. Both need the `transparency` feature; without it the file
//! functions return [`crate::GenImgError::CapabilityUnavailable`] and leave the
//! file alone.

mod crop;
mod green_screen;

pub use crop::{BoundingBox, CropOutcome, CropReport};
pub use green_screen::{is_green, GreenScreenReport, DEFAULT_TOLERANCE};

#[cfg(feature = "transparency")]
pub use crop::{auto_crop_transparent, bounding_box};
#[cfg(feature = "transparency")]
pub use green_screen::remove_green_screen;

use crate::error::Result;
use serde::Serialize;
use std::path::Path;

/// Returns true if this build can decode and encode images.
pub fn is_available() -> bool {
    cfg!(feature = "transparency")
}

/// Removes the green background of the image at `path`, rewriting it.
pub fn remove_green_screen_file(path: impl AsRef<Path>, tolerance: u8) -> Result<GreenScreenReport> {
    let path = path.as_ref();
    #[cfg(feature = "transparency")]
    {
        let mut image = codec::load_rgba(path)?;
        let report = remove_green_screen(&mut image, tolerance);
        codec::save_rgba(&image, path)?;
        tracing::debug!(path = %path.display(), cleared = report.cleared, "removed green background");
        Ok(report)
    }
    #[cfg(not(feature = "transparency"))]
    {
        let _ = tolerance;
        Err(unavailable(path))
    }
}

/// Crops transparent borders of the image at `path`, rewriting it only
/// when something was cropped.
pub fn auto_crop_file(path: impl AsRef<Path>, padding: u32) -> Result<CropOutcome> {
    let path = path.as_ref();
    #[cfg(feature = "transparency")]
    {
        let mut image = codec::load_rgba(path)?;
        let outcome = auto_crop_transparent(&mut image, padding);
        if outcome.is_cropped() {
            codec::save_rgba(&image, path)?;
        }
        tracing::debug!(path = %path.display(), ?outcome, "auto-crop finished");
        Ok(outcome)
    }
    #[cfg(not(feature = "transparency"))]
    {
        let _ = padding;
        Err(unavailable(path))
    }
}

#[cfg(not(feature = "transparency"))]
fn unavailable(path: &Path) -> crate::error::GenImgError {
    crate::error::GenImgError::CapabilityUnavailable(format!(
        "cannot process {}: built without the `transparency` feature",
        path.display()
    ))
}

/// What the transparency passes did to a generated image.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostProcessReport {
    /// Background removal result.
    pub background: Option<GreenScreenReport>,
    /// Auto-crop result.
    pub crop: Option<CropOutcome>,
    /// Why post-processing stopped early, if it did.
    pub warning: Option<String>,
}

impl PostProcessReport {
    /// Runs background removal followed by auto-crop on `path`.
    ///
    /// Failures are recorded as a warning; the file keeps whatever the last
    /// successful pass wrote.
    pub fn run(path: &Path) -> Self {
        let mut report = Self::default();
        match remove_green_screen_file(path, DEFAULT_TOLERANCE) {
            Ok(bg) => report.background = Some(bg),
            Err(e) => {
                tracing::warn!(path = %path.display(), "background removal skipped: {e}");
                report.warning = Some(e.to_string());
                return report;
            }
        }
        match auto_crop_file(path, 0) {
            Ok(crop) => report.crop = Some(crop),
            Err(e) => {
                tracing::warn!(path = %path.display(), "auto-crop skipped: {e}");
                report.warning = Some(e.to_string());
            }
        }
        report
    }

    /// Renders the report as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(feature = "transparency")]
mod codec {
    use crate::error::Result;
    use std::io::Cursor;
    use std::path::Path;

    /// Decodes by content, since generated files may not match their extension.
    pub(super) fn load_rgba(path: &Path) -> Result<image::RgbaImage> {
        let bytes = std::fs::read(path)?;
        Ok(image::load_from_memory(&bytes)?.to_rgba8())
    }

    /// Encodes into memory first so a failed encode leaves the file intact.
    pub(super) fn save_rgba(image: &image::RgbaImage, path: &Path) -> Result<()> {
        let format = image::ImageFormat::from_path(path).unwrap_or(image::ImageFormat::Png);
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format)?;
        std::fs::write(path, buf.into_inner())?;
        Ok(())
    }
}
