//! Pure calculation functions for target dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;
use crate::bounds::BoundsSpec;

/// The intermediate sizes produced by each scaling phase.
///
/// `after_upscale` is `None` when the original already met the minimum on
/// both axes; `after_downscale` is `None` when the (possibly upscaled) size
/// already fit inside the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalePlan {
    pub original: Dimensions,
    pub after_upscale: Option<Dimensions>,
    pub after_downscale: Option<Dimensions>,
}

impl ScalePlan {
    /// The final size after both phases.
    pub fn target(&self) -> Dimensions {
        self.after_downscale
            .or(self.after_upscale)
            .unwrap_or(self.original)
    }

    /// True when the final size differs from the original.
    pub fn needs_resize(&self) -> bool {
        self.target() != self.original
    }
}

/// Multiply both axes by `scale`, truncating toward zero.
///
/// `as u32` saturates, so an absurd upscale can never wrap around.
fn scale_dimensions(dims: Dimensions, scale: f64) -> Dimensions {
    Dimensions {
        width: (dims.width as f64 * scale) as u32,
        height: (dims.height as f64 * scale) as u32,
    }
}

/// Run the upscale-then-downscale passes and keep every intermediate size.
///
/// 1. If either axis is below its minimum, scale both axes by the *larger*
///    of `min_w / w` and `min_h / h`.
/// 2. If the result exceeds the maximum on either axis, scale both axes by
///    the *smaller* of `max_w / w` and `max_h / h`.
///
/// Pixel sizes are truncated at each phase, never rounded, so the maximum is
/// never overshot by a rounding step.
///
/// The caller must pass non-zero original dimensions.
pub fn plan_target_size(original: Dimensions, bounds: &BoundsSpec) -> ScalePlan {
    let (min, max) = (bounds.min, bounds.max);

    let after_upscale = (original.width < min.width || original.height < min.height).then(|| {
        let scale = f64::max(
            min.width as f64 / original.width as f64,
            min.height as f64 / original.height as f64,
        );
        scale_dimensions(original, scale)
    });

    let current = after_upscale.unwrap_or(original);
    let after_downscale = (current.width > max.width || current.height > max.height).then(|| {
        let scale = f64::min(
            max.width as f64 / current.width as f64,
            max.height as f64 / current.height as f64,
        );
        scale_dimensions(current, scale)
    });

    ScalePlan {
        original,
        after_upscale,
        after_downscale,
    }
}

/// Calculate the normalized size of an image for the given bounds.
///
/// # Examples
/// ```
/// # use docfit::bounds::Category;
/// # use docfit::imaging::{Dimensions, compute_target_size};
/// let signature = Category::Signature.standard_bounds();
/// let target = compute_target_size(Dimensions::new(100, 50), &signature);
/// assert_eq!(target, Dimensions::new(354, 177));
/// ```
pub fn compute_target_size(original: Dimensions, bounds: &BoundsSpec) -> Dimensions {
    plan_target_size(original, bounds).target()
}
