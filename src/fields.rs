//! Procedural and file-backed data sources for panels.

use std::f32::consts::PI;
use std::path::Path;

use palette::{FromColor, Hsv, Srgb};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scene_model::FieldConfig;
use tracing::debug;

use crate::array::{NumericArray, SharedArray, shared};
use crate::error::Result;

enum Animation {
    None,
    Ripple {
        width: usize,
        height: usize,
        speed: f32,
    },
    Life {
        width: usize,
        height: usize,
    },
}

/// Owns the shared array of one panel and, for animated sources, the state
/// needed to advance it.
pub struct FieldSource {
    array: SharedArray,
    animation: Animation,
    time: f32,
}

impl FieldSource {
    pub fn from_config(cfg: &FieldConfig) -> Result<Self> {
        let (array, animation) = match cfg {
            FieldConfig::Sombrero { width, height } => (sombrero(*width, *height), Animation::None),
            FieldConfig::Gaussian {
                width,
                height,
                sigma,
            } => (gaussian(*width, *height, *sigma), Animation::None),
            FieldConfig::Checkerboard {
                width,
                height,
                cells,
            } => (checkerboard(*width, *height, *cells), Animation::None),
            FieldConfig::Ripple {
                width,
                height,
                speed,
            } => (
                ripple(*width, *height, 0.0),
                Animation::Ripple {
                    width: *width,
                    height: *height,
                    speed: *speed,
                },
            ),
            FieldConfig::Gradient { width, height } => (gradient(*width, *height), Animation::None),
            FieldConfig::Noise {
                width,
                height,
                seed,
            } => (noise(*width, *height, &mut rng(*seed)), Animation::None),
            FieldConfig::GameOfLife {
                width,
                height,
                seed,
                density,
            } => (
                life_seed(*width, *height, *density, &mut rng(*seed)),
                Animation::Life {
                    width: *width,
                    height: *height,
                },
            ),
            FieldConfig::ColorWheel { size } => (color_wheel(*size), Animation::None),
            FieldConfig::Image { path, color } => (load_image(path, *color)?, Animation::None),
        };
        Ok(Self {
            array: shared(array),
            animation,
            time: 0.0,
        })
    }

    /// Handle to hand to an [`crate::image::Image`].
    pub fn array(&self) -> SharedArray {
        SharedArray::clone(&self.array)
    }

    pub fn is_animated(&self) -> bool {
        !matches!(self.animation, Animation::None)
    }

    /// Moves animated sources forward by `dt` seconds, in place. Returns
    /// whether the data changed.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.time += dt;
        match self.animation {
            Animation::None => false,
            Animation::Ripple {
                width,
                height,
                speed,
            } => {
                let phase = self.time * speed;
                let mut array = self.array.write();
                match array.as_f32_mut() {
                    Some(values) => {
                        fill_ripple(values, width, height, phase);
                        true
                    }
                    None => false,
                }
            }
            Animation::Life { width, height } => {
                let mut array = self.array.write();
                match array.as_u8_mut() {
                    Some(cells) => life_step(cells, width, height),
                    None => false,
                }
            }
        }
    }
}

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Maps pixel `(i, j)` to `[-extent, extent]²`.
fn coords(i: usize, j: usize, width: usize, height: usize, extent: f32) -> (f32, f32) {
    let u = if width > 1 { j as f32 / (width - 1) as f32 } else { 0.5 };
    let v = if height > 1 { i as f32 / (height - 1) as f32 } else { 0.5 };
    ((u * 2.0 - 1.0) * extent, (v * 2.0 - 1.0) * extent)
}

fn scalar(width: usize, height: usize, f: impl Fn(f32, f32) -> f32, extent: f32) -> NumericArray {
    let mut values = Vec::with_capacity(width * height);
    for i in 0..height {
        for j in 0..width {
            let (x, y) = coords(i, j, width, height, extent);
            values.push(f(x, y));
        }
    }
    let mut array = NumericArray::zeros(vec![height, width]);
    if let Some(dst) = array.as_f32_mut() {
        dst.copy_from_slice(&values);
    }
    array
}

pub fn sombrero(width: usize, height: usize) -> NumericArray {
    scalar(
        width,
        height,
        |x, y| {
            let r = (x * x + y * y).sqrt();
            if r < 1e-6 { 1.0 } else { r.sin() / r }
        },
        10.0,
    )
}

pub fn gaussian(width: usize, height: usize, sigma: f32) -> NumericArray {
    let two_s2 = 2.0 * sigma * sigma;
    scalar(width, height, |x, y| (-(x * x + y * y) / two_s2).exp(), 1.0)
}

pub fn checkerboard(width: usize, height: usize, cells: usize) -> NumericArray {
    let cells = cells.max(1);
    let mut array = NumericArray::zeros(vec![height, width]);
    if let Some(values) = array.as_f32_mut() {
        for i in 0..height {
            for j in 0..width {
                let ci = i * cells / height.max(1);
                let cj = j * cells / width.max(1);
                values[i * width + j] = ((ci + cj) % 2) as f32;
            }
        }
    }
    array
}

pub fn gradient(width: usize, height: usize) -> NumericArray {
    scalar(width, height, |x, _| (x + 1.0) / 2.0, 1.0)
}

pub fn ripple(width: usize, height: usize, phase: f32) -> NumericArray {
    let mut array = NumericArray::zeros(vec![height, width]);
    if let Some(values) = array.as_f32_mut() {
        fill_ripple(values, width, height, phase);
    }
    array
}

fn fill_ripple(values: &mut [f32], width: usize, height: usize, phase: f32) {
    for i in 0..height {
        for j in 0..width {
            let (x, y) = coords(i, j, width, height, 1.0);
            let r = (x * x + y * y).sqrt();
            values[i * width + j] = (4.0 * PI * r - phase).sin() * (-2.0 * r).exp();
        }
    }
}

pub fn noise(width: usize, height: usize, rng: &mut impl Rng) -> NumericArray {
    let mut array = NumericArray::zeros(vec![height, width]);
    if let Some(values) = array.as_f32_mut() {
        values.iter_mut().for_each(|v| *v = rng.random::<f32>());
    }
    array
}

fn life_seed(width: usize, height: usize, density: f32, rng: &mut impl Rng) -> NumericArray {
    let cells = (0..width * height)
        .map(|_| u8::from(rng.random::<f32>() < density))
        .collect();
    NumericArray::from_u8(vec![height, width], cells)
        .unwrap_or_else(|_| NumericArray::zeros(vec![height, width]))
}

/// One generation of Conway's rules on a torus. Returns whether any cell changed.
pub fn life_step(cells: &mut [u8], width: usize, height: usize) -> bool {
    if width == 0 || height == 0 || cells.len() != width * height {
        return false;
    }
    let prev = cells.to_vec();
    let mut changed = false;
    for i in 0..height {
        for j in 0..width {
            let mut neighbours = 0;
            for di in [height - 1, 0, 1] {
                for dj in [width - 1, 0, 1] {
                    if di == 0 && dj == 0 {
                        continue;
                    }
                    let ni = (i + di) % height;
                    let nj = (j + dj) % width;
                    neighbours += usize::from(prev[ni * width + nj] > 0);
                }
            }
            let alive = prev[i * width + j] > 0;
            let next = matches!((alive, neighbours), (true, 2) | (_, 3));
            let value = u8::from(next);
            if cells[i * width + j] != value {
                cells[i * width + j] = value;
                changed = true;
            }
        }
    }
    changed
}

/// Hue by angle, saturation by radius; an `(size, size, 3)` float RGB array.
pub fn color_wheel(size: usize) -> NumericArray {
    let mut values = Vec::with_capacity(size * size * 3);
    for i in 0..size {
        for j in 0..size {
            let (x, y) = coords(i, j, size, size, 1.0);
            let r = (x * x + y * y).sqrt();
            let rgb = if r > 1.0 {
                Srgb::new(0.0, 0.0, 0.0)
            } else {
                let hsv: Hsv = Hsv::new(y.atan2(x).to_degrees(), r, 1.0);
                Srgb::from_color(hsv)
            };
            values.extend_from_slice(&[rgb.red, rgb.green, rgb.blue]);
        }
    }
    NumericArray::from_f32(vec![size, size, 3], values)
        .unwrap_or_else(|_| NumericArray::zeros(vec![size, size, 3]))
}

/// Decodes a PNG or JPEG into `(h, w)` grey or `(h, w, 3)` RGB bytes.
pub fn load_image(path: &Path, color: bool) -> Result<NumericArray> {
    let decoded = image::open(path)?;
    let (w, h) = (decoded.width() as usize, decoded.height() as usize);
    debug!(path = %path.display(), w, h, color, "decoded field image");
    if color {
        NumericArray::from_u8(vec![h, w, 3], decoded.to_rgb8().into_raw())
    } else {
        NumericArray::from_u8(vec![h, w], decoded.to_luma8().into_raw())
    }
}
