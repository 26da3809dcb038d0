use fieldview::array::NumericArray;
use fieldview::rescale::{ColorRange, LUT_MARGIN, compute_bias_scale};

fn close(a: f32, b: f32) {
    assert!((a - b).abs() <= 1e-5, "{a} vs {b}");
}

#[test]
fn endpoints_map_to_unit_interval() {
    for (vmin, vmax) in [(0.0, 1.0), (-3.0, 5.0), (100.0, 250.0), (-1e-3, 1e-3)] {
        let (bias, scale) = compute_bias_scale(vmin, vmax, None);
        close(vmin * scale + bias, 0.0);
        close(vmax * scale + bias, 1.0);
    }
}

#[test]
fn transfer_can_be_inverted() {
    let (vmin, vmax) = (-2.5_f32, 7.5_f32);
    let (bias, scale) = compute_bias_scale(vmin, vmax, None);
    for v in [-2.5_f32, -1.0, 0.0, 3.3, 7.5] {
        let mapped = v * scale + bias;
        close((mapped - bias) / scale, v);
    }
}

#[test]
fn degenerate_range_behaves_like_unit_range() {
    let unit = compute_bias_scale(0.0, 1.0, None);
    assert_eq!(compute_bias_scale(5.0, 5.0, None), unit);
    assert_eq!(compute_bias_scale(f32::NAN, 1.0, None), unit);
    assert_eq!(compute_bias_scale(0.0, f32::INFINITY, None), unit);
}

#[test]
fn lut_range_lands_inside_the_guard_band() {
    let width = 514;
    let (bias, scale) = compute_bias_scale(0.0, 1.0, Some(width));
    let s = width as f32;
    close(bias, 1.0 / (s - 1.0));
    close(1.0 * scale + bias, (s - LUT_MARGIN) / (s - 1.0) + 1.0 / (s - 1.0));
    assert!(0.0 * scale + bias > 0.0);
    assert!(1.0 * scale + bias < 1.0);
}

#[test]
fn single_texel_lut_falls_back_to_plain_mapping() {
    assert_eq!(
        compute_bias_scale(0.0, 2.0, Some(1)),
        compute_bias_scale(0.0, 2.0, None)
    );
}

#[test]
fn missing_bounds_come_from_data() {
    let array = NumericArray::from_f32(vec![4], vec![-1.0, f32::NAN, 3.0, 0.5]).unwrap();
    assert_eq!(
        ColorRange::resolve(None, None, &array),
        ColorRange { vmin: -1.0, vmax: 3.0 }
    );
    assert_eq!(
        ColorRange::resolve(Some(0.0), None, &array),
        ColorRange { vmin: 0.0, vmax: 3.0 }
    );
}

#[test]
fn constant_data_resolves_to_unit_range() {
    let array = NumericArray::from_f32(vec![3], vec![2.0; 3]).unwrap();
    assert_eq!(ColorRange::resolve(None, None, &array), ColorRange::default());
}
