//! Affine mapping of a data range onto normalized texture values.

use crate::array::NumericArray;

/// Guard band in LUT texels kept free at each end so that bilinear filtering
/// of the table never blends the under/over entries into in-range values.
pub const LUT_MARGIN: f32 = 3.1;

/// Effective data range used for normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorRange {
    pub vmin: f32,
    pub vmax: f32,
}

impl Default for ColorRange {
    fn default() -> Self {
        Self {
            vmin: 0.0,
            vmax: 1.0,
        }
    }
}

impl ColorRange {
    pub fn new(vmin: f32, vmax: f32) -> Self {
        Self { vmin, vmax }.sanitized()
    }

    /// Explicit bounds win; missing bounds come from the data.
    pub fn resolve(vmin: Option<f32>, vmax: Option<f32>, array: &NumericArray) -> Self {
        let data = match (vmin, vmax) {
            (Some(_), Some(_)) => None,
            _ => array.min_max(),
        };
        let lo = vmin.or(data.map(|(lo, _)| lo as f32)).unwrap_or(0.0);
        let hi = vmax.or(data.map(|(_, hi)| hi as f32)).unwrap_or(1.0);
        Self::new(lo, hi)
    }

    fn sanitized(self) -> Self {
        if !self.vmin.is_finite() || !self.vmax.is_finite() || self.vmin == self.vmax {
            Self::default()
        } else {
            self
        }
    }

    pub fn is_degenerate(vmin: f32, vmax: f32) -> bool {
        !vmin.is_finite() || !vmax.is_finite() || vmin == vmax
    }
}

/// Returns `(bias, scale)` such that `v * scale + bias` maps `vmin..vmax`
/// onto `0..1`, or onto the interior of a LUT of `lut_width` texels.
pub fn compute_bias_scale(vmin: f32, vmax: f32, lut_width: Option<usize>) -> (f32, f32) {
    compute_bias_scale_with_margin(vmin, vmax, lut_width, LUT_MARGIN)
}

pub fn compute_bias_scale_with_margin(
    vmin: f32,
    vmax: f32,
    lut_width: Option<usize>,
    margin: f32,
) -> (f32, f32) {
    let ColorRange { vmin, vmax } = ColorRange::new(vmin, vmax);
    let span = vmax - vmin;
    match lut_width {
        Some(width) if width > 1 => {
            let s = width as f32;
            let scale = ((s - margin) / (s - 1.0)) / span;
            let bias = 1.0 / (s - 1.0) - vmin * scale;
            (bias, scale)
        }
        _ => (-vmin / span, 1.0 / span),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_range_maps_to_unit_interval() {
        let (bias, scale) = compute_bias_scale(-2.0, 6.0, None);
        assert!((-2.0 * scale + bias).abs() < 1e-6);
        assert!((6.0 * scale + bias - 1.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_range_falls_back_to_unit() {
        assert_eq!(compute_bias_scale(3.0, 3.0, None), (0.0, 1.0));
        assert_eq!(compute_bias_scale(f32::NAN, 1.0, None), (0.0, 1.0));
    }

    #[test]
    fn resolve_prefers_explicit_bounds() {
        let a = NumericArray::from_f32(vec![3], vec![1.0, 4.0, 9.0]).unwrap();
        let r = ColorRange::resolve(Some(0.0), None, &a);
        assert_eq!(r, ColorRange { vmin: 0.0, vmax: 9.0 });
    }
}
