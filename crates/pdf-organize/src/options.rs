use crate::types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Assembly configuration. Passed explicitly into every assembly call.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AssemblyOptions {
    /// Stamp the 1-based output position at the bottom of each page
    pub add_page_numbers: bool,

    /// Orientation of pages created for image sources
    pub image_orientation: ImageOrientation,

    /// Largest page an image source may produce
    pub image_page_limit: PaperSize,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            add_page_numbers: false,
            image_orientation: ImageOrientation::Auto,
            image_page_limit: PaperSize::A4,
        }
    }
}

impl AssemblyOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options: Self = serde_json::from_slice(&bytes)
            .map_err(|e| OrganizeError::Config(format!("Failed to parse config: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| OrganizeError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        let (width_mm, height_mm) = self.image_page_limit.dimensions_mm();
        if !(width_mm > 0.0 && height_mm > 0.0) || !width_mm.is_finite() || !height_mm.is_finite()
        {
            return Err(OrganizeError::Config(format!(
                "Image page limit must be positive, got {}x{} mm",
                width_mm, height_mm
            )));
        }
        Ok(())
    }
}
