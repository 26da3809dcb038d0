//! GPU binding capability and the renderer context that owns it.

pub mod headless;
pub mod wgpu_backend;

use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::figure::Viewport;
use crate::kernel::{KERNEL_RESOLUTION, KernelParams, build_kernel};
use crate::shader::ShaderKey;
use crate::texture::{SourceType, TextureFormat, TextureTarget};

pub use headless::HeadlessBackend;
pub use wgpu_backend::WgpuBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub(crate) u64);

#[derive(Debug, Clone, PartialEq)]
pub struct TextureDesc {
    pub label: String,
    pub target: TextureTarget,
    pub format: TextureFormat,
    pub source: SourceType,
    pub width: u32,
    /// Zero for 1D textures.
    pub height: u32,
}

impl TextureDesc {
    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height.max(1) as usize
    }

    /// Number of scalar components an upload must supply.
    pub fn value_count(&self) -> usize {
        self.texel_count() * self.format.channels()
    }
}

/// Borrowed upload payload.
#[derive(Debug, Clone, Copy)]
pub enum TexelData<'a> {
    F32(&'a [f32]),
    U8(&'a [u8]),
}

impl TexelData<'_> {
    pub fn len(&self) -> usize {
        match self {
            TexelData::F32(v) => v.len(),
            TexelData::U8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values as GL would see them: floats unchanged, bytes normalized.
    pub fn to_normalized(&self) -> Vec<f32> {
        match self {
            TexelData::F32(v) => v.to_vec(),
            TexelData::U8(v) => v.iter().map(|&b| f32::from(b) / 255.0).collect(),
        }
    }
}

/// Affine remap `v * scale + bias` applied to the alpha component on upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelTransfer {
    pub bias: f32,
    pub scale: f32,
}

impl PixelTransfer {
    pub const IDENTITY: Self = Self {
        bias: 0.0,
        scale: 1.0,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn apply(&self, value: f32) -> f32 {
        value * self.scale + self.bias
    }

    /// Applies the transfer in place to the alpha component of every texel.
    pub fn apply_to_alpha(&self, format: TextureFormat, values: &mut [f32]) {
        let Some(alpha) = format.alpha_channel() else {
            return;
        };
        if self.is_identity() {
            return;
        }
        for texel in values.chunks_exact_mut(format.channels()) {
            texel[alpha] = self.apply(texel[alpha]);
        }
    }
}

/// WGSL module ready for compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramSource {
    pub label: String,
    pub key: ShaderKey,
    pub wgsl: String,
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("shader program `{label}` failed to compile:\n{log}")]
pub struct ShaderCompileError {
    pub label: String,
    pub log: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
}

/// Destination rectangle in viewport pixels, origin at the bottom left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Texture coordinates at the quad edges. `t0` is sampled at the bottom edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexCoords {
    pub s0: f32,
    pub s1: f32,
    pub t0: f32,
    pub t1: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuadDraw {
    /// `None` draws through the built-in nearest blit.
    pub program: Option<ProgramId>,
    pub texture: TextureId,
    pub lut: Option<TextureId>,
    pub kernel: Option<TextureId>,
    pub rect: Rect,
    pub texcoords: TexCoords,
}

/// Texture, program and draw primitives the core needs from a GPU.
pub trait Backend {
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId>;

    /// Uploads a full image. Fails with [`Error::StaleTexture`] for unknown ids.
    fn write_texture(
        &mut self,
        id: TextureId,
        texels: TexelData<'_>,
        transfer: PixelTransfer,
    ) -> Result<()>;

    fn delete_texture(&mut self, id: TextureId);

    fn compile_program(&mut self, source: &ProgramSource)
    -> Result<ProgramId, ShaderCompileError>;

    fn delete_program(&mut self, id: ProgramId);

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) -> Result<()>;

    fn set_viewport(&mut self, viewport: Viewport);

    fn clear(&mut self, color: [f32; 4]);

    fn fill_rect(&mut self, area: Viewport, color: [f32; 4]);

    fn draw_quad(&mut self, draw: &QuadDraw) -> Result<()>;
}

/// What to do when a shader variant does not compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShaderFailurePolicy {
    /// Surface the compiler log as an error.
    #[default]
    Abort,
    /// Warn and draw through the fixed blit instead.
    Degrade,
}

/// Rendering context: the backend plus state shared by every image.
pub struct Renderer<B: Backend> {
    backend: B,
    policy: ShaderFailurePolicy,
    kernel_params: KernelParams,
    kernel_resolution: usize,
    kernel: Option<TextureId>,
}

impl<B: Backend> Renderer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            policy: ShaderFailurePolicy::default(),
            kernel_params: KernelParams::default(),
            kernel_resolution: KERNEL_RESOLUTION,
            kernel: None,
        }
    }

    pub fn with_policy(mut self, policy: ShaderFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Must be called before the first bicubic image is created.
    pub fn with_kernel(mut self, params: KernelParams, resolution: usize) -> Self {
        self.kernel_params = params;
        self.kernel_resolution = resolution;
        self
    }

    pub fn policy(&self) -> ShaderFailurePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: ShaderFailurePolicy) {
        self.policy = policy;
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Shared bicubic weight table, uploaded on first use.
    pub fn kernel_texture(&mut self) -> Result<TextureId> {
        if let Some(id) = self.kernel {
            return Ok(id);
        }
        let table = build_kernel(self.kernel_resolution, self.kernel_params);
        let desc = TextureDesc {
            label: "bicubic-kernel".to_string(),
            target: TextureTarget::D1,
            format: TextureFormat::Rgba,
            source: SourceType::Float32,
            width: table.resolution() as u32,
            height: 0,
        };
        let id = self.backend.create_texture(&desc)?;
        self.backend
            .write_texture(id, TexelData::F32(&table.texels()), PixelTransfer::IDENTITY)?;
        debug!(resolution = table.resolution(), "bicubic kernel uploaded");
        self.kernel = Some(id);
        Ok(id)
    }

    /// Compiles a program, honoring the failure policy.
    ///
    /// Under [`ShaderFailurePolicy::Degrade`] a failed compile yields `Ok(None)`.
    pub fn compile(&mut self, source: &ProgramSource) -> Result<Option<ProgramId>> {
        match self.backend.compile_program(source) {
            Ok(id) => Ok(Some(id)),
            Err(err) => match self.policy {
                ShaderFailurePolicy::Abort => Err(Error::ShaderCompile(err)),
                ShaderFailurePolicy::Degrade => {
                    warn!(
                        label = %err.label,
                        log = %err.log,
                        "shader compile failed; falling back to plain blit"
                    );
                    Ok(None)
                }
            },
        }
    }
}
