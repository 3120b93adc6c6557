//! Pixel to EMU conversion.
//!
//! WordprocessingML sizes drawings in English Metric Units (914 400 per
//! inch). Browser pixels are 1/96 inch; the conversion goes through points
//! (1/72 inch) and inches, and truncates toward zero.

/// Pixels per inch assumed for source images.
pub const PIXELS_PER_INCH: u64 = 96;

/// Points per inch.
pub const POINTS_PER_INCH: u64 = 72;

/// English Metric Units per inch.
pub const EMU_PER_INCH: u64 = 914_400;

/// EMUs per point; exact, since 914 400 is divisible by 72.
const EMU_PER_POINT: u64 = EMU_PER_INCH / POINTS_PER_INCH;

/// Convert a pixel length to EMUs, truncating.
///
/// `points = px * 72 / 96`, `inches = points / 72`, `emu = inches * 914400`.
/// Carried out in integers with every division last, so the result is
/// exactly `floor(px * 914400 / 96)`, which is `px * 9525`.
///
/// ```
/// use html2wordml::pixels_to_emu;
///
/// assert_eq!(pixels_to_emu(96), 914_400);
/// assert_eq!(pixels_to_emu(1), 9_525);
/// ```
pub fn pixels_to_emu(px: u32) -> u64 {
    // px * 72/96 points, each point EMU_PER_POINT EMUs.
    u64::from(px) * POINTS_PER_INCH * EMU_PER_POINT / PIXELS_PER_INCH
}
