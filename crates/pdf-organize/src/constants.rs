//! Shared constants for ingestion and assembly
//!
//! This module centralizes magic numbers used while building output pages.

// =============================================================================
// Unit Conversion
// =============================================================================

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f32 = 72.0 / 25.4; // ≈ 2.83465

/// Convert millimeters to points
#[inline]
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

// =============================================================================
// Default Page Dimensions
// =============================================================================

/// Default page width in points (US Letter: 8.5" × 11")
pub const DEFAULT_PAGE_WIDTH_PT: f32 = 612.0;

/// Default page height in points (US Letter)
pub const DEFAULT_PAGE_HEIGHT_PT: f32 = 792.0;

/// Used when a page carries no readable MediaBox
pub const DEFAULT_PAGE_DIMENSIONS: (f32, f32) = (DEFAULT_PAGE_WIDTH_PT, DEFAULT_PAGE_HEIGHT_PT);

// =============================================================================
// Thumbnails
// =============================================================================

/// Uniform scale applied to a page when rendering its thumbnail
pub const THUMBNAIL_SCALE: f32 = 0.5;

// =============================================================================
// Page Numbers
// =============================================================================

/// Font size for page numbers (points)
pub const PAGE_NUMBER_FONT_SIZE: f32 = 12.0;

/// Distance of the number's baseline from the visual bottom edge (points)
pub const PAGE_NUMBER_OFFSET: f32 = 20.0;

/// Gray level of the page number fill (0 = black, 1 = white)
pub const PAGE_NUMBER_GRAY: f32 = 0.5;

/// Helvetica advance width of a digit, as a fraction of the font size
pub const HELVETICA_DIGIT_WIDTH_RATIO: f32 = 0.556;

/// Resource name under which the page number font is registered
pub const PAGE_NUMBER_FONT_NAME: &str = "FPgNum";

// =============================================================================
// Output
// =============================================================================

/// PDF version written by assembly
pub const OUTPUT_PDF_VERSION: &str = "1.7";

/// Prefix of the default download file name
pub const DEFAULT_OUTPUT_PREFIX: &str = "merged-pdf";
