//! Shader variant selection and WGSL assembly.

use std::fmt;
use std::str::FromStr;

use crate::gpu::ProgramSource;
use crate::texture::TextureFormat;

const COMMON: &str = include_str!("common.wgsl");
const VERTEX: &str = include_str!("vertex.wgsl");
const VERTEX_ELEVATION: &str = include_str!("vertex_elevation.wgsl");
const NEAREST: &str = include_str!("nearest.wgsl");
const BILINEAR: &str = include_str!("bilinear.wgsl");
const BICUBIC: &str = include_str!("bicubic.wgsl");
const LUT: &str = include_str!("lut.wgsl");
const GRID: &str = include_str!("grid.wgsl");
const LIGHT: &str = include_str!("light.wgsl");

/// Standalone solid-fill module used for frame backgrounds.
pub const FILL: &str = include_str!("fill.wgsl");

/// Mesh resolution of the elevation vertex stage, per axis.
pub const ELEVATION_SEGMENTS: u32 = 128;

/// Uniform names understood by every program.
pub mod uniform {
    pub const PIXEL: &str = "pixel";
    pub const ELEVATION: &str = "elevation";
    pub const GRIDSIZE: &str = "gridsize";
    pub const GRIDWIDTH: &str = "gridwidth";
    pub const LIGHT_POSITION: &str = "light_position";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interpolation {
    #[default]
    Nearest,
    Bilinear,
    Bicubic,
}

impl Interpolation {
    pub fn name(self) -> &'static str {
        match self {
            Interpolation::Nearest => "nearest",
            Interpolation::Bilinear => "bilinear",
            Interpolation::Bicubic => "bicubic",
        }
    }

    /// Next mode in nearest → bilinear → bicubic order, wrapping around.
    pub fn cycle(self) -> Self {
        match self {
            Interpolation::Nearest => Interpolation::Bilinear,
            Interpolation::Bilinear => Interpolation::Bicubic,
            Interpolation::Bicubic => Interpolation::Nearest,
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Interpolation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" => Ok(Interpolation::Nearest),
            "bilinear" => Ok(Interpolation::Bilinear),
            "bicubic" => Ok(Interpolation::Bicubic),
            other => Err(format!("unknown interpolation `{other}`")),
        }
    }
}

/// Everything that decides which program an image needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderKey {
    pub interpolation: Interpolation,
    pub use_lut: bool,
    pub lighted: bool,
    pub has_grid: bool,
    pub has_elevation: bool,
}

impl ShaderKey {
    pub fn label(&self) -> String {
        let mut label = format!("{}", self.interpolation);
        for (on, name) in [
            (self.use_lut, "lut"),
            (self.has_grid, "grid"),
            (self.lighted, "light"),
            (self.has_elevation, "elevation"),
        ] {
            if on {
                label.push('+');
                label.push_str(name);
            }
        }
        label
    }

    /// Vertices issued per draw of a program with this key.
    pub fn vertex_count(&self) -> u32 {
        if self.has_elevation {
            ELEVATION_SEGMENTS * ELEVATION_SEGMENTS * 6
        } else {
            6
        }
    }
}

/// Image state relevant to shader selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderRequest {
    pub interpolation: Interpolation,
    pub has_colormap: bool,
    pub lighted: bool,
    pub has_grid: bool,
    pub has_elevation: bool,
}

/// Picks the program variant for a texture format, or `None` when the plain
/// nearest blit suffices.
///
/// Color formats never use a colormap. Scalar formats use the LUT stage
/// whenever a colormap is present, whatever the interpolation. Lighting,
/// grid and elevation always need a program.
pub fn select_key(format: TextureFormat, request: &ShaderRequest) -> Option<ShaderKey> {
    let use_lut = !format.is_color() && request.has_colormap;
    let extras = request.lighted || request.has_grid || request.has_elevation;
    let needed = use_lut || extras || request.interpolation != Interpolation::Nearest;
    needed.then_some(ShaderKey {
        interpolation: request.interpolation,
        use_lut,
        lighted: request.lighted,
        has_grid: request.has_grid,
        has_elevation: request.has_elevation,
    })
}

/// Concatenates the WGSL stages for `key` into one module with `vs_main` and
/// `fs_main` entry points.
pub fn assemble(key: ShaderKey) -> ProgramSource {
    let mut wgsl = String::with_capacity(8 * 1024);
    wgsl.push_str(COMMON);
    wgsl.push_str(match key.interpolation {
        Interpolation::Nearest => NEAREST,
        Interpolation::Bilinear => BILINEAR,
        Interpolation::Bicubic => BICUBIC,
    });
    wgsl.push_str(if key.has_elevation {
        VERTEX_ELEVATION
    } else {
        VERTEX
    });
    if key.use_lut {
        wgsl.push_str(LUT);
    }
    if key.has_grid {
        wgsl.push_str(GRID);
    }
    if key.lighted {
        wgsl.push_str(LIGHT);
    }

    wgsl.push_str(
        "\n@fragment\nfn fs_main(in: VsOut) -> @location(0) vec4<f32> {\n    \
         let texel = interpolate(in.uv);\n    \
         let value = texel.a;\n    \
         var color = resolve(texel);\n",
    );
    if key.use_lut {
        wgsl.push_str("    color = lut_lookup(value);\n");
    }
    if key.has_grid {
        wgsl.push_str("    color = apply_grid(color, in.uv, value);\n");
    }
    if key.lighted {
        wgsl.push_str("    color = apply_light(color, in.uv);\n");
    }
    wgsl.push_str("    return color;\n}\n");

    ProgramSource {
        label: key.label(),
        key,
        wgsl,
    }
}

/// Program used for images without one: nearest sampling, no stages.
pub fn plain() -> ProgramSource {
    let mut source = assemble(ShaderKey {
        interpolation: Interpolation::Nearest,
        use_lut: false,
        lighted: false,
        has_grid: false,
        has_elevation: false,
    });
    source.label = "plain-blit".to_string();
    source
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(interpolation: Interpolation, has_colormap: bool) -> ShaderRequest {
        ShaderRequest {
            interpolation,
            has_colormap,
            lighted: false,
            has_grid: false,
            has_elevation: false,
        }
    }

    #[test]
    fn label_lists_enabled_stages() {
        let key = ShaderKey {
            interpolation: Interpolation::Bicubic,
            use_lut: true,
            lighted: true,
            has_grid: false,
            has_elevation: false,
        };
        assert_eq!(key.label(), "bicubic+lut+light");
    }

    #[test]
    fn stages_follow_key() {
        let key = select_key(TextureFormat::Alpha, &request(Interpolation::Bilinear, true)).unwrap();
        let source = assemble(key);
        assert!(source.wgsl.contains("fn vs_main"));
        assert!(source.wgsl.contains("fn fs_main"));
        assert!(source.wgsl.contains("fn lut_lookup"));
        assert!(!source.wgsl.contains("fn apply_grid"));
        assert!(!source.wgsl.contains("kernel_weights"));
    }

    #[test]
    fn interpolation_parses_case_insensitively() {
        assert_eq!("Bicubic".parse::<Interpolation>(), Ok(Interpolation::Bicubic));
        assert!("cubic".parse::<Interpolation>().is_err());
        assert_eq!(Interpolation::Bicubic.cycle(), Interpolation::Nearest);
    }
}
