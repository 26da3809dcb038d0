//! Mitchell–Netravali reconstruction filter sampled into a lookup table.

/// Default number of rows in the kernel table.
pub const KERNEL_RESOLUTION: usize = 256;

/// Filter shape parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelParams {
    pub a: f32,
    pub b: f32,
}

impl KernelParams {
    /// Cubic B-spline, the smoothest member of the family.
    pub const B_SPLINE: Self = Self { a: 1.0, b: 0.0 };
    pub const RECOMMENDED: Self = Self {
        a: 1.0 / 3.0,
        b: 1.0 / 3.0,
    };
    pub const CATMULL_ROM: Self = Self { a: 0.5, b: 0.0 };
}

impl Default for KernelParams {
    fn default() -> Self {
        Self::B_SPLINE
    }
}

pub fn mitchell_netravali(x: f32, a: f32, b: f32) -> f32 {
    let x = x.abs();
    let x2 = x * x;
    let x3 = x2 * x;
    if x < 1.0 {
        ((12.0 - 9.0 * a - 6.0 * b) * x3 + (-18.0 + 12.0 * a + 6.0 * b) * x2 + (6.0 - 2.0 * a))
            / 6.0
    } else if x < 2.0 {
        ((-a - 6.0 * b) * x3 + (6.0 * a + 30.0 * b) * x2 + (-12.0 * a - 48.0 * b) * x
            + (8.0 * a + 24.0 * b))
            / 6.0
    } else {
        0.0
    }
}

/// Four filter weights per row, one row per sub-texel offset in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelTable {
    rows: Vec<[f32; 4]>,
    params: KernelParams,
}

impl KernelTable {
    pub fn rows(&self) -> &[[f32; 4]] {
        &self.rows
    }

    pub fn resolution(&self) -> usize {
        self.rows.len()
    }

    pub fn params(&self) -> KernelParams {
        self.params
    }

    /// Row-major RGBA floats ready for upload.
    pub fn texels(&self) -> Vec<f32> {
        self.rows.iter().flatten().copied().collect()
    }
}

pub fn build_kernel(resolution: usize, params: KernelParams) -> KernelTable {
    let resolution = resolution.max(2);
    let last = (resolution - 1) as f32;
    let KernelParams { a, b } = params;
    let rows = (0..resolution)
        .map(|i| {
            let x = i as f32 / last;
            [
                mitchell_netravali(x + 1.0, a, b),
                mitchell_netravali(x, a, b),
                mitchell_netravali(1.0 - x, a, b),
                mitchell_netravali(2.0 - x, a, b),
            ]
        })
        .collect();
    KernelTable { rows, params }
}
