//! Pure calculation functions for rotated image dimensions.
//!
//! All functions here are pure and testable without any I/O or images. They
//! predict what the graphics suite will produce for `-rotate <angle>` so
//! callers can know output dimensions without running the tool.
//!
//! Two calibrated models are available:
//!
//! | Model | Rule | 40×20 @ 5° |
//! |---|---|---|
//! | [`RotationModel::Enclosing`] | `ceil(extent - tolerance)` of the rotated corners | 42×24 |
//! | [`RotationModel::Rasterizer`] | truncated projections with a 0.5 term and imprecision nudge | 41×23 |
//!
//! Both return the exact (possibly swapped) input for multiples of 90°.

/// Default slack subtracted before rounding enclosing extents up.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Default imprecision nudge for the rasterizer model.
pub const DEFAULT_IMPRECISION: f64 = -1e-5;

/// How bounding dimensions of a rotated rectangle are rounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RotationModel {
    /// Smallest integer box that encloses the rotated corners.
    ///
    /// Extents are reduced by `tolerance` before rounding up so that values a
    /// hair above an integer (floating-point noise) do not gain a pixel.
    Enclosing { tolerance: f64 },
    /// Truncation rule of the reference rasterizer.
    ///
    /// `imprecision` is applied with the sign of `sin`/`cos` to any projection
    /// whose distance from an integer is below its magnitude.
    Rasterizer { imprecision: f64 },
}

impl RotationModel {
    pub fn enclosing() -> Self {
        RotationModel::Enclosing {
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn rasterizer() -> Self {
        RotationModel::Rasterizer {
            imprecision: DEFAULT_IMPRECISION,
        }
    }
}

impl Default for RotationModel {
    fn default() -> Self {
        Self::enclosing()
    }
}

/// Bounding `(width, height)` of a `width`×`height` rectangle rotated by
/// `angle` degrees, using the default model.
///
/// # Examples
/// ```
/// # use magick_exec::imaging::rotated_dimensions;
/// assert_eq!(rotated_dimensions(40, 20, 90.0), (20, 40));
/// assert_eq!(rotated_dimensions(40, 20, 5.0), (42, 24));
/// ```
pub fn rotated_dimensions(width: u32, height: u32, angle: f64) -> (u32, u32) {
    rotated_bounding_box(width, height, angle, RotationModel::default())
}

/// Bounding `(width, height)` of a rotated rectangle under `model`.
///
/// Angles may be negative or fractional. A non-finite angle is treated as no
/// rotation.
pub fn rotated_bounding_box(
    width: u32,
    height: u32,
    angle: f64,
    model: RotationModel,
) -> (u32, u32) {
    if !angle.is_finite() {
        return (width, height);
    }
    if angle.rem_euclid(90.0) == 0.0 {
        let quarter_turns = (angle / 90.0).round() as i64;
        return if quarter_turns.rem_euclid(2) == 1 {
            (height, width)
        } else {
            (width, height)
        };
    }

    let rad = angle.to_radians();
    let (sin, cos) = rad.sin_cos();
    let (w, h) = (width as f64, height as f64);

    match model {
        RotationModel::Enclosing { tolerance } => {
            if width == 0 || height == 0 {
                return (0, 0);
            }
            let extent_x = w * cos.abs() + h * sin.abs();
            let extent_y = w * sin.abs() + h * cos.abs();
            (
                round_up(extent_x - tolerance),
                round_up(extent_y - tolerance),
            )
        }
        RotationModel::Rasterizer { imprecision } => {
            let cos_imp = imprecision * cos.signum();
            let sin_imp = imprecision * sin.signum();
            let bw = truncate_abs(fix_imprecision(w * cos, cos_imp))
                + truncate_abs(fix_imprecision(h * sin + 0.5, sin_imp));
            let bh = truncate_abs(fix_imprecision(w * sin, sin_imp))
                + truncate_abs(fix_imprecision(h * cos + 0.5, cos_imp));
            (bw, bh)
        }
    }
}

/// Nudges `value` by `imprecision` when it lies within `|imprecision|` of an integer.
pub fn fix_imprecision(value: f64, imprecision: f64) -> f64 {
    let frac = (value.trunc() - value).abs();
    let delta = frac.min(1.0 - frac);
    if delta < imprecision.abs() {
        value + imprecision
    } else {
        value
    }
}

fn round_up(extent: f64) -> u32 {
    extent.ceil().max(0.0) as u32
}

fn truncate_abs(value: f64) -> u32 {
    value.trunc().abs() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Right angles
    // =========================================================================

    #[test]
    fn right_angles_are_exact() {
        for model in [RotationModel::enclosing(), RotationModel::rasterizer()] {
            assert_eq!(rotated_bounding_box(40, 20, 0.0, model), (40, 20));
            assert_eq!(rotated_bounding_box(40, 20, 90.0, model), (20, 40));
            assert_eq!(rotated_bounding_box(40, 20, 180.0, model), (40, 20));
            assert_eq!(rotated_bounding_box(40, 20, 270.0, model), (20, 40));
            assert_eq!(rotated_bounding_box(40, 20, -90.0, model), (20, 40));
            assert_eq!(rotated_bounding_box(40, 20, 720.0, model), (40, 20));
        }
    }

    #[test]
    fn right_angles_keep_zero_sizes() {
        assert_eq!(rotated_dimensions(0, 20, 90.0), (20, 0));
        assert_eq!(rotated_dimensions(0, 0, 180.0), (0, 0));
    }

    #[test]
    fn non_finite_angle_is_no_rotation() {
        assert_eq!(rotated_dimensions(40, 20, f64::NAN), (40, 20));
        assert_eq!(rotated_dimensions(40, 20, f64::INFINITY), (40, 20));
    }

    // =========================================================================
    // Enclosing model
    // =========================================================================

    #[test]
    fn enclosing_reference_values() {
        assert_eq!(rotated_dimensions(40, 20, 5.0), (42, 24));
        assert_eq!(rotated_dimensions(40, 20, -10.0), (43, 27));
    }

    #[test]
    fn enclosing_is_symmetric_in_sign_for_size() {
        assert_eq!(rotated_dimensions(40, 20, 30.0), rotated_dimensions(40, 20, -30.0));
    }

    #[test]
    fn enclosing_square_at_45_degrees() {
        // 100 * sqrt(2) = 141.42...
        assert_eq!(rotated_dimensions(100, 100, 45.0), (142, 142));
    }

    #[test]
    fn enclosing_tolerance_absorbs_float_noise() {
        // Near-right angle whose exact extents sit barely above an integer.
        let model = RotationModel::Enclosing { tolerance: 1e-6 };
        let (w, h) = rotated_bounding_box(1, 1, 1e-9, model);
        assert_eq!((w, h), (1, 1));
    }

    #[test]
    fn enclosing_zero_dimension_is_empty() {
        assert_eq!(rotated_dimensions(0, 20, 5.0), (0, 0));
        assert_eq!(rotated_dimensions(40, 0, 33.0), (0, 0));
    }

    // =========================================================================
    // Rasterizer model
    // =========================================================================

    #[test]
    fn rasterizer_formula_values() {
        assert_eq!(
            rotated_bounding_box(40, 20, 5.0, RotationModel::rasterizer()),
            (41, 23)
        );
    }

    #[test]
    fn rasterizer_stays_within_side_sum() {
        for angle in [-170.0, -95.5, -45.0, -1.0, 1.0, 45.0, 135.0, 359.0] {
            let (w, h) = rotated_bounding_box(40, 20, angle, RotationModel::rasterizer());
            assert!(w <= 40 + 20 && h <= 40 + 20, "{angle}: {w}x{h}");
        }
    }

    #[test]
    fn fix_imprecision_only_near_integers() {
        assert_eq!(fix_imprecision(3.4, -1e-5), 3.4);
        assert_eq!(fix_imprecision(3.0, -1e-5), 3.0 - 1e-5);
        assert_eq!(fix_imprecision(2.999_999_5, -1e-5), 2.999_999_5 - 1e-5);
        assert_eq!(fix_imprecision(2.5, 0.0), 2.5);
    }

    #[test]
    fn imprecision_changes_truncation_at_exact_integers() {
        // Projection lands on exactly 20.0: the nudge pulls it below before truncation.
        assert_eq!(fix_imprecision(20.0, -1e-5).trunc(), 19.0);
        assert_eq!(fix_imprecision(20.0, 1e-5).trunc(), 20.0);
    }
}
