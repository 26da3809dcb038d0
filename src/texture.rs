//! Array → GPU texture ingestion.

use std::fmt;

use tracing::debug;

use crate::array::{ArrayData, NumericArray};
use crate::error::{Error, Result};
use crate::gpu::{Backend, PixelTransfer, Renderer, TexelData, TextureDesc, TextureId};

/// Channel layout of the source data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Alpha,
    LuminanceAlpha,
    Rgb,
    Rgba,
}

impl TextureFormat {
    pub fn channels(self) -> usize {
        match self {
            TextureFormat::Alpha => 1,
            TextureFormat::LuminanceAlpha => 2,
            TextureFormat::Rgb => 3,
            TextureFormat::Rgba => 4,
        }
    }

    /// Index of the alpha component within one texel, if the format has one.
    pub fn alpha_channel(self) -> Option<usize> {
        match self {
            TextureFormat::Alpha => Some(0),
            TextureFormat::LuminanceAlpha => Some(1),
            TextureFormat::Rgb => None,
            TextureFormat::Rgba => Some(3),
        }
    }

    /// RGB and RGBA carry their own color; other formats hold scalars.
    pub fn is_color(self) -> bool {
        matches!(self, TextureFormat::Rgb | TextureFormat::Rgba)
    }

    pub fn storage(self) -> StorageFormat {
        match self {
            TextureFormat::Alpha => StorageFormat::Alpha16,
            TextureFormat::LuminanceAlpha => StorageFormat::LuminanceAlpha16,
            TextureFormat::Rgb => StorageFormat::Rgb16,
            TextureFormat::Rgba => StorageFormat::Rgba16,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TextureFormat::Alpha => "A",
            TextureFormat::LuminanceAlpha => "LA",
            TextureFormat::Rgb => "RGB",
            TextureFormat::Rgba => "RGBA",
        }
    }

    fn from_channels(k: usize) -> Option<Self> {
        match k {
            1 => Some(TextureFormat::Alpha),
            2 => Some(TextureFormat::LuminanceAlpha),
            3 => Some(TextureFormat::Rgb),
            4 => Some(TextureFormat::Rgba),
            _ => None,
        }
    }
}

impl fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    D1,
    D2,
}

/// Storage class with 16 bits of precision per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageFormat {
    Alpha16,
    LuminanceAlpha16,
    Rgb16,
    Rgba16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    Float32,
    UnsignedByte,
}

/// Result of format inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureLayout {
    pub target: TextureTarget,
    pub format: TextureFormat,
    pub width: usize,
    /// Zero for 1D targets.
    pub height: usize,
}

/// Derives target, format and extents from an array shape.
///
/// Rank-2 arrays are ambiguous: `(M, 3)` and `(M, 4)` read as 1D RGB(A)
/// textures of length `M` unless the hint is [`TextureFormat::Rgba`], which
/// forces the 2D single-channel reading of size `N × M`. Any other rank-2
/// shape reads as a 2D alpha texture.
pub fn infer_layout(shape: &[usize], hint: Option<TextureFormat>) -> Result<TextureLayout> {
    let incompatible = |reason: &str| Error::IncompatibleShape {
        shape: shape.to_vec(),
        reason: reason.to_string(),
    };
    let mismatch = |format: TextureFormat| Error::FormatMismatch {
        shape: shape.to_vec(),
        format: format.name().to_string(),
    };

    if shape.is_empty() || shape.len() > 3 {
        return Err(incompatible(&format!("rank {} is not supported", shape.len())));
    }
    if shape.contains(&0) {
        return Err(incompatible("zero-sized dimension"));
    }

    let one_d = |format| TextureLayout {
        target: TextureTarget::D1,
        format,
        width: shape[0],
        height: 0,
    };

    match *shape {
        [_] => match hint {
            None | Some(TextureFormat::Alpha) => Ok(one_d(TextureFormat::Alpha)),
            Some(other) => Err(mismatch(other)),
        },
        [m, k] => {
            use TextureFormat::*;
            match (k, hint) {
                (1, None | Some(Alpha)) => Ok(one_d(Alpha)),
                (2, None | Some(LuminanceAlpha)) => Ok(one_d(LuminanceAlpha)),
                (3, None | Some(Rgb)) => Ok(one_d(Rgb)),
                (4, None) => Ok(one_d(Rgba)),
                (_, None | Some(Rgba)) => Ok(TextureLayout {
                    target: TextureTarget::D2,
                    format: Alpha,
                    width: k,
                    height: m,
                }),
                (_, Some(other)) => Err(mismatch(other)),
            }
        }
        [m, n, k] => {
            let format = TextureFormat::from_channels(k)
                .ok_or_else(|| incompatible(&format!("{k} channels per texel")))?;
            if let Some(hint) = hint {
                if hint != format {
                    return Err(mismatch(hint));
                }
            }
            Ok(TextureLayout {
                target: TextureTarget::D2,
                format,
                width: n,
                height: m,
            })
        }
        _ => Err(incompatible("unsupported rank")),
    }
}

pub(crate) fn source_type(array: &NumericArray) -> Result<SourceType> {
    match array.data() {
        ArrayData::F32(_) => Ok(SourceType::Float32),
        ArrayData::U8(_) => Ok(SourceType::UnsignedByte),
        _ => Err(Error::UnsupportedDtype {
            dtype: array.dtype().name(),
        }),
    }
}

fn texels(array: &NumericArray) -> Result<TexelData<'_>> {
    match array.data() {
        ArrayData::F32(v) => Ok(TexelData::F32(v)),
        ArrayData::U8(v) => Ok(TexelData::U8(v)),
        _ => Err(Error::UnsupportedDtype {
            dtype: array.dtype().name(),
        }),
    }
}

/// One backend texture mirroring a caller-owned array.
#[derive(Debug)]
pub struct GpuTexture {
    id: TextureId,
    live: bool,
    label: String,
    hint: Option<TextureFormat>,
    layout: TextureLayout,
    source: SourceType,
    shape: Vec<usize>,
    transfer: PixelTransfer,
}

impl GpuTexture {
    /// Validates the array, allocates storage and uploads it unscaled.
    pub fn build<B: Backend>(
        renderer: &mut Renderer<B>,
        label: &str,
        array: &NumericArray,
        hint: Option<TextureFormat>,
    ) -> Result<Self> {
        let source = source_type(array)?;
        let layout = infer_layout(array.shape(), hint)?;
        let id = renderer
            .backend_mut()
            .create_texture(&describe(label, layout, source))?;
        debug!(
            label,
            target = ?layout.target,
            format = %layout.format,
            width = layout.width,
            height = layout.height,
            "texture allocated"
        );
        let mut texture = Self {
            id,
            live: true,
            label: label.to_string(),
            hint,
            layout,
            source,
            shape: array.shape().to_vec(),
            transfer: PixelTransfer::IDENTITY,
        };
        texture.upload(renderer, array, PixelTransfer::IDENTITY)?;
        Ok(texture)
    }

    /// Re-uploads the whole array. Bias and scale only take effect for float
    /// data on a 2D target; everything else is uploaded unscaled.
    ///
    /// Storage is reallocated when the array shape changed since the last
    /// upload. Returns the transfer that was actually applied.
    pub fn update<B: Backend>(
        &mut self,
        renderer: &mut Renderer<B>,
        array: &NumericArray,
        bias: f32,
        scale: f32,
    ) -> Result<PixelTransfer> {
        if !self.live {
            return Err(Error::StaleTexture(self.id));
        }
        if array.shape() != self.shape.as_slice() || source_type(array)? != self.source {
            self.reallocate(renderer, array)?;
        }
        let transfer = if self.source == SourceType::Float32 && self.layout.target == TextureTarget::D2
        {
            PixelTransfer { bias, scale }
        } else {
            PixelTransfer::IDENTITY
        };
        self.upload(renderer, array, transfer)?;
        Ok(transfer)
    }

    /// Replaces storage to match a reshaped array, keeping the original hint.
    pub fn reallocate<B: Backend>(
        &mut self,
        renderer: &mut Renderer<B>,
        array: &NumericArray,
    ) -> Result<()> {
        if !self.live {
            return Err(Error::StaleTexture(self.id));
        }
        let source = source_type(array)?;
        let layout = infer_layout(array.shape(), self.hint)?;
        let id = renderer
            .backend_mut()
            .create_texture(&describe(&self.label, layout, source))?;
        renderer.backend_mut().delete_texture(self.id);
        debug!(
            label = %self.label,
            old = ?self.shape,
            new = ?array.shape(),
            "texture reallocated for new shape"
        );
        self.id = id;
        self.layout = layout;
        self.source = source;
        self.shape = array.shape().to_vec();
        Ok(())
    }

    fn upload<B: Backend>(
        &mut self,
        renderer: &mut Renderer<B>,
        array: &NumericArray,
        transfer: PixelTransfer,
    ) -> Result<()> {
        renderer
            .backend_mut()
            .write_texture(self.id, texels(array)?, transfer)?;
        self.transfer = transfer;
        Ok(())
    }

    pub fn destroy<B: Backend>(&mut self, renderer: &mut Renderer<B>) {
        if self.live {
            renderer.backend_mut().delete_texture(self.id);
            self.live = false;
        }
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn target(&self) -> TextureTarget {
        self.layout.target
    }

    pub fn format(&self) -> TextureFormat {
        self.layout.format
    }

    pub fn storage(&self) -> StorageFormat {
        self.layout.format.storage()
    }

    pub fn source_type(&self) -> SourceType {
        self.source
    }

    pub fn width(&self) -> usize {
        self.layout.width
    }

    pub fn height(&self) -> usize {
        self.layout.height
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Pixel transfer applied by the most recent upload.
    pub fn transfer(&self) -> PixelTransfer {
        self.transfer
    }
}

fn describe(label: &str, layout: TextureLayout, source: SourceType) -> TextureDesc {
    TextureDesc {
        label: label.to_string(),
        target: layout.target,
        format: layout.format,
        source,
        width: layout.width as u32,
        height: layout.height as u32,
    }
}
