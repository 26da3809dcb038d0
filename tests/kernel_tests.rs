use fieldview::kernel::{KERNEL_RESOLUTION, KernelParams, build_kernel, mitchell_netravali};

#[test]
fn taps_are_mirror_symmetric() {
    for params in [
        KernelParams::B_SPLINE,
        KernelParams::RECOMMENDED,
        KernelParams::CATMULL_ROM,
    ] {
        let table = build_kernel(KERNEL_RESOLUTION, params);
        let rows = table.rows();
        let n = rows.len();
        for i in 0..n {
            let mirror = rows[n - 1 - i];
            assert!(
                (rows[i][1] - mirror[2]).abs() < 1e-6,
                "row {i} of {params:?}: {:?} vs {:?}",
                rows[i],
                mirror
            );
            assert!((rows[i][0] - mirror[3]).abs() < 1e-6);
        }
    }
}

#[test]
fn b_spline_weights_sum_to_one() {
    let table = build_kernel(64, KernelParams::B_SPLINE);
    for row in table.rows() {
        let sum: f32 = row.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5, "{row:?}");
    }
}

#[test]
fn filter_is_even_with_compact_support() {
    let KernelParams { a, b } = KernelParams::RECOMMENDED;
    for x in [0.0_f32, 0.25, 0.9, 1.5, 1.99] {
        assert_eq!(mitchell_netravali(-x, a, b), mitchell_netravali(x, a, b));
    }
    assert_eq!(mitchell_netravali(2.0, a, b), 0.0);
    assert_eq!(mitchell_netravali(-3.5, a, b), 0.0);
}

#[test]
fn texels_are_four_per_row() {
    let table = build_kernel(KERNEL_RESOLUTION, KernelParams::default());
    assert_eq!(table.resolution(), KERNEL_RESOLUTION);
    assert_eq!(table.texels().len(), KERNEL_RESOLUTION * 4);
    assert_eq!(table.params(), KernelParams::B_SPLINE);
}
