//! Options for creating a blank volume image.

use std::path::Path;

use crate::engine::VolumeEngine;
use crate::error::{CoreError, CoreResult};
use crate::path;

/// Smallest image that can be created (an 800K floppy).
pub const MIN_IMAGE_BYTES: u64 = 800 * 1024;

/// Largest image that can be created.
pub const MAX_IMAGE_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Size offered by default.
pub const DEFAULT_IMAGE_BYTES: u64 = 8 * 1024 * 1024;

/// Longest volume name HFS accepts.
pub const MAX_VOLUME_NAME_LEN: usize = 27;

/// Formats a size the way the new-image dialog shows it.
pub fn binary_size_string(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let value = bytes as f64;
    if value >= GIB {
        format!("{:.2} GiB", value / GIB)
    } else if value >= MIB {
        format!("{:.1} MiB", value / MIB)
    } else {
        format!("{:.0} KiB", value / KIB)
    }
}

/// Size and name of an image about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImageOptions {
    pub size_bytes: u64,
    pub volume_name: String,
}

impl Default for NewImageOptions {
    fn default() -> Self {
        Self {
            size_bytes: DEFAULT_IMAGE_BYTES,
            volume_name: path::PLACEHOLDER_NAME.to_string(),
        }
    }
}

impl NewImageOptions {
    pub fn new(size_bytes: u64, volume_name: impl Into<String>) -> Self {
        Self {
            size_bytes,
            volume_name: volume_name.into(),
        }
    }

    /// Cuts `name` to the longest volume name accepted.
    pub fn clamp_name(name: &str) -> String {
        name.chars().take(MAX_VOLUME_NAME_LEN).collect()
    }

    /// The size line shown under the size control.
    pub fn size_label(&self) -> String {
        format!(
            "{}  (min {}, max {})",
            binary_size_string(self.size_bytes),
            binary_size_string(MIN_IMAGE_BYTES),
            binary_size_string(MAX_IMAGE_BYTES)
        )
    }

    /// Checks the options and returns the trimmed volume name.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidArgument`] if the size is out of range.
    /// - [`CoreError::InvalidName`] if the name is empty, too long or
    ///   contains `:`.
    pub fn validate(&self) -> CoreResult<String> {
        if !(MIN_IMAGE_BYTES..=MAX_IMAGE_BYTES).contains(&self.size_bytes) {
            return Err(CoreError::InvalidArgument(format!(
                "image size must be between {} and {}",
                binary_size_string(MIN_IMAGE_BYTES),
                binary_size_string(MAX_IMAGE_BYTES)
            )));
        }
        let name = path::validate_name(&self.volume_name)?;
        if name.chars().count() > MAX_VOLUME_NAME_LEN {
            return Err(CoreError::InvalidName(format!(
                "volume names are at most {MAX_VOLUME_NAME_LEN} characters"
            )));
        }
        Ok(name)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Validates the options and asks `engine` to create the image.
    pub fn create<E: VolumeEngine>(&self, engine: &E, image: &Path) -> CoreResult<()> {
        let name = self.validate()?;
        engine.create_image(image, self.size_bytes, &name)?;
        tracing::info!(
            "created {} ({}) named {name}",
            image.display(),
            binary_size_string(self.size_bytes)
        );
        Ok(())
    }
}
