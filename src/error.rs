use thiserror::Error;

use crate::figure::NodeId;
use crate::gpu::{ProgramId, ShaderCompileError, TextureId};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Library error type for fieldview operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Only 32-bit float and 8-bit unsigned sources can be uploaded.
    #[error("unsupported element type {dtype}; expected f32 or u8")]
    UnsupportedDtype { dtype: &'static str },

    /// Rank or extents fit none of the accepted texture layouts.
    #[error(
        "incompatible array shape {shape:?}: {reason} \
         (expected (M), (M,1..4), (M,N) or (M,N,1..4))"
    )]
    IncompatibleShape { shape: Vec<usize>, reason: String },

    /// An explicit format hint disagrees with the array shape.
    #[error("format {format} does not match array shape {shape:?}")]
    FormatMismatch { shape: Vec<usize>, format: String },

    #[error(transparent)]
    ShaderCompile(#[from] ShaderCompileError),

    /// The texture was destroyed or is unknown to the backend.
    #[error("texture {0:?} is no longer valid")]
    StaleTexture(TextureId),

    #[error("shader program {0:?} is no longer valid")]
    StaleProgram(ProgramId),

    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    #[error("figure node {0:?} does not exist")]
    UnknownNode(NodeId),

    /// Failure reported by the GPU binding layer.
    #[error("backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}
