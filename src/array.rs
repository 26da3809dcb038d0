//! Caller-owned numeric buffers handed to images.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Error, Result};

/// Element storage of a [`NumericArray`].
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Element type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    U8,
    U16,
    I32,
    F32,
    F64,
}

impl Dtype {
    pub fn name(self) -> &'static str {
        match self {
            Dtype::U8 => "u8",
            Dtype::U16 => "u16",
            Dtype::I32 => "i32",
            Dtype::F32 => "f32",
            Dtype::F64 => "f64",
        }
    }
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::U8(v) => v.len(),
            ArrayData::U16(v) => v.len(),
            ArrayData::I32(v) => v.len(),
            ArrayData::F32(v) => v.len(),
            ArrayData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> Dtype {
        match self {
            ArrayData::U8(_) => Dtype::U8,
            ArrayData::U16(_) => Dtype::U16,
            ArrayData::I32(_) => Dtype::I32,
            ArrayData::F32(_) => Dtype::F32,
            ArrayData::F64(_) => Dtype::F64,
        }
    }
}

/// Dense row-major buffer with an explicit shape.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray {
    shape: Vec<usize>,
    data: ArrayData,
}

impl NumericArray {
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::IncompatibleShape {
                reason: format!("{} elements supplied for {} slots", data.len(), expected),
                shape,
            });
        }
        Ok(Self { shape, data })
    }

    pub fn from_f32(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        Self::new(shape, ArrayData::F32(data))
    }

    pub fn from_u8(shape: Vec<usize>, data: Vec<u8>) -> Result<Self> {
        Self::new(shape, ArrayData::U8(data))
    }

    /// Zero-filled f32 array.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            shape,
            data: ArrayData::F32(vec![0.0; len]),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn dtype(&self) -> Dtype {
        self.data.dtype()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Mutable view of f32 elements, if the array holds f32 data.
    pub fn as_f32_mut(&mut self) -> Option<&mut [f32]> {
        match &mut self.data {
            ArrayData::F32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u8_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.data {
            ArrayData::U8(v) => Some(v),
            _ => None,
        }
    }

    /// Replaces contents and shape in one step.
    pub fn replace(&mut self, shape: Vec<usize>, data: ArrayData) -> Result<()> {
        *self = Self::new(shape, data)?;
        Ok(())
    }

    /// Minimum and maximum over finite-or-infinite values, skipping NaN.
    ///
    /// Returns `None` for empty or all-NaN arrays.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        fn fold<I: Iterator<Item = f64>>(iter: I) -> Option<(f64, f64)> {
            iter.filter(|v| !v.is_nan()).fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
        }
        match &self.data {
            ArrayData::U8(v) => fold(v.iter().map(|&x| f64::from(x))),
            ArrayData::U16(v) => fold(v.iter().map(|&x| f64::from(x))),
            ArrayData::I32(v) => fold(v.iter().map(|&x| f64::from(x))),
            ArrayData::F32(v) => fold(v.iter().map(|&x| f64::from(x))),
            ArrayData::F64(v) => fold(v.iter().copied()),
        }
    }
}

/// Handle shared between the caller, who mutates the data, and the images
/// that read it on every update.
pub type SharedArray = Arc<RwLock<NumericArray>>;

pub fn shared(array: NumericArray) -> SharedArray {
    Arc::new(RwLock::new(array))
}
