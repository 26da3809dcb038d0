//! Colormapped, interpolated view of a caller-owned array.

use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::array::SharedArray;
use crate::colormap::{Colormap, DEFAULT_LUT_SAMPLES};
use crate::error::{Error, Result};
use crate::gpu::{
    Backend, PixelTransfer, ProgramId, QuadDraw, Rect, Renderer, TexCoords, TexelData,
    TextureDesc, TextureId, UniformValue,
};
use crate::rescale::{ColorRange, compute_bias_scale};
use crate::shader::{self, Interpolation, ShaderKey, ShaderRequest, select_key, uniform};
use crate::texture::{GpuTexture, SourceType, TextureFormat, TextureTarget};

/// Which edge array row 0 is drawn along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    #[default]
    Lower,
    Upper,
}

impl FromStr for Origin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lower" => Ok(Origin::Lower),
            "upper" => Ok(Origin::Upper),
            other => Err(format!("unknown origin `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageOptions {
    /// Explicit channel layout; see [`crate::texture::infer_layout`].
    pub format: Option<TextureFormat>,
    pub colormap: Option<Arc<Colormap>>,
    pub lut_samples: usize,
    pub vmin: Option<f32>,
    pub vmax: Option<f32>,
    pub interpolation: Interpolation,
    pub origin: Origin,
    pub lighted: bool,
    pub gridsize: [f32; 3],
    pub gridwidth: [f32; 3],
    pub elevation: f32,
    pub light_position: [f32; 3],
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            format: None,
            colormap: Some(Colormap::default_shared()),
            lut_samples: DEFAULT_LUT_SAMPLES,
            vmin: None,
            vmax: None,
            interpolation: Interpolation::Nearest,
            origin: Origin::Lower,
            lighted: false,
            gridsize: [0.0; 3],
            gridwidth: [1.0; 3],
            elevation: 0.0,
            light_position: [0.0, 1.0, 2.0],
        }
    }
}

/// Requested changes; `None` leaves a property untouched.
#[derive(Debug, Clone, Default)]
pub struct ConfigDelta {
    pub colormap: Option<Option<Arc<Colormap>>>,
    pub vmin: Option<Option<f32>>,
    pub vmax: Option<Option<f32>>,
    pub interpolation: Option<Interpolation>,
    pub origin: Option<Origin>,
    pub lighted: Option<bool>,
    pub gridsize: Option<[f32; 3]>,
    pub gridwidth: Option<[f32; 3]>,
    pub elevation: Option<f32>,
    pub light_position: Option<[f32; 3]>,
}

impl ConfigDelta {
    pub fn is_empty(&self) -> bool {
        self.colormap.is_none()
            && self.vmin.is_none()
            && self.vmax.is_none()
            && self.interpolation.is_none()
            && self.origin.is_none()
            && self.lighted.is_none()
            && self.gridsize.is_none()
            && self.gridwidth.is_none()
            && self.elevation.is_none()
            && self.light_position.is_none()
    }
}

/// What a [`Image::configure`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigOutcome {
    pub program_rebuilt: bool,
    pub lut_rebuilt: bool,
    /// Range or LUT changed; the next [`Image::update`] picks it up.
    pub needs_update: bool,
}

#[derive(Debug, Clone, Copy)]
struct LutTexture {
    id: TextureId,
    width: usize,
}

pub struct Image {
    label: String,
    array: SharedArray,
    texture: GpuTexture,
    lut: Option<LutTexture>,
    program: Option<ProgramId>,
    key: Option<ShaderKey>,
    options: ImageOptions,
    range: ColorRange,
    rebuilds: usize,
}

impl Image {
    /// Uploads the array, selects a program and performs the first update.
    pub fn create<B: Backend>(
        renderer: &mut Renderer<B>,
        label: &str,
        array: SharedArray,
        options: ImageOptions,
    ) -> Result<Self> {
        let texture = {
            let data = array.read();
            GpuTexture::build(renderer, label, &data, options.format)?
        };
        let mut image = Self {
            label: label.to_string(),
            array,
            texture,
            lut: None,
            program: None,
            key: None,
            options,
            range: ColorRange::default(),
            rebuilds: 0,
        };
        if let Err(err) = image.finish_create(renderer) {
            image.destroy(renderer);
            return Err(err);
        }
        debug!(
            label,
            format = %image.texture.format(),
            program = ?image.key.map(|k| k.label()),
            "image created"
        );
        Ok(image)
    }

    fn finish_create<B: Backend>(&mut self, renderer: &mut Renderer<B>) -> Result<()> {
        if let Some(map) = self.options.colormap.clone() {
            self.lut = Some(upload_lut(
                renderer,
                &self.label,
                &map,
                self.options.lut_samples,
            )?);
        }
        self.sync_program(renderer)?;
        self.update(renderer)?;
        Ok(())
    }

    /// Re-reads the shared array and re-uploads it with the current range.
    ///
    /// Call after every in-place mutation of the array; nothing polls it.
    pub fn update<B: Backend>(&mut self, renderer: &mut Renderer<B>) -> Result<PixelTransfer> {
        let array = Arc::clone(&self.array);
        let data = array.read();

        let reshaped = data.shape() != self.texture.shape();
        if reshaped {
            self.texture.reallocate(renderer, &data)?;
            self.sync_program(renderer)?;
            self.push_uniforms(renderer)?;
        }

        let range = ColorRange::resolve(self.options.vmin, self.options.vmax, &data);
        let lut_width = self.active_lut().map(|lut| lut.width);
        let (bias, scale) = compute_bias_scale(range.vmin, range.vmax, lut_width);
        let transfer = self.texture.update(renderer, &data, bias, scale)?;
        self.range = range;
        trace!(
            label = %self.label,
            vmin = range.vmin,
            vmax = range.vmax,
            bias = transfer.bias,
            scale = transfer.scale,
            "image updated"
        );
        Ok(transfer)
    }

    /// Draws the image into `x, y, w, h` of the current viewport.
    pub fn blit<B: Backend>(
        &self,
        renderer: &mut Renderer<B>,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    ) -> Result<()> {
        if !self.texture.is_live() {
            return Err(Error::StaleTexture(self.texture.id()));
        }
        let (t0, t1) = match self.options.origin {
            Origin::Lower => (0.0, 1.0),
            Origin::Upper => (1.0, 0.0),
        };
        let kernel = match (self.program, self.key) {
            (Some(_), Some(key)) if key.interpolation == Interpolation::Bicubic => {
                Some(renderer.kernel_texture()?)
            }
            _ => None,
        };
        let draw = QuadDraw {
            program: self.program,
            texture: self.texture.id(),
            lut: self.active_lut().map(|lut| lut.id),
            kernel,
            rect: Rect {
                x,
                y,
                width: w,
                height: h,
            },
            texcoords: TexCoords {
                s0: 0.0,
                s1: 1.0,
                t0,
                t1,
            },
        };
        renderer.backend_mut().draw_quad(&draw)
    }

    /// Applies a set of property changes, deciding in one place whether the
    /// program must be rebuilt or only its uniforms refreshed.
    ///
    /// A program is rebuilt only when the shader key changes: switching
    /// interpolation, gaining or losing the LUT stage, or toggling lighting,
    /// grid or elevation between absent and present. Value changes of an
    /// already present feature only update uniforms. Range changes are
    /// stored and take effect on the next [`Image::update`].
    pub fn configure<B: Backend>(
        &mut self,
        renderer: &mut Renderer<B>,
        delta: ConfigDelta,
    ) -> Result<ConfigOutcome> {
        let mut outcome = ConfigOutcome::default();
        let had_lut = self.active_lut().map(|lut| lut.width);
        let previous = self.options.clone();
        let previous_lut = self.lut;

        // The new LUT is uploaded before anything is replaced.
        let mut fresh_lut = None;
        if let Some(colormap) = &delta.colormap {
            if let Some(map) = colormap {
                fresh_lut = Some(upload_lut(
                    renderer,
                    &self.label,
                    map,
                    self.options.lut_samples,
                )?);
            }
            self.lut = fresh_lut;
            self.options.colormap = colormap.clone();
            outcome.lut_rebuilt = true;
            outcome.needs_update = true;
        }
        if let Some(vmin) = delta.vmin {
            self.options.vmin = vmin;
            outcome.needs_update = true;
        }
        if let Some(vmax) = delta.vmax {
            self.options.vmax = vmax;
            outcome.needs_update = true;
        }
        if let Some(interpolation) = delta.interpolation {
            self.options.interpolation = interpolation;
        }
        if let Some(origin) = delta.origin {
            self.options.origin = origin;
        }
        if let Some(lighted) = delta.lighted {
            self.options.lighted = lighted;
        }
        if let Some(gridsize) = delta.gridsize {
            self.options.gridsize = gridsize;
        }
        if let Some(gridwidth) = delta.gridwidth {
            self.options.gridwidth = gridwidth;
        }
        if let Some(elevation) = delta.elevation {
            self.options.elevation = elevation;
        }
        if let Some(light_position) = delta.light_position {
            self.options.light_position = light_position;
        }

        let synced = match self.sync_program(renderer) {
            Ok(false) => self.push_uniforms(renderer).map(|()| false),
            other => other,
        };
        match synced {
            Ok(rebuilt) => outcome.program_rebuilt = rebuilt,
            Err(err) => {
                if let Some(lut) = fresh_lut {
                    renderer.backend_mut().delete_texture(lut.id);
                }
                self.lut = previous_lut;
                self.options = previous;
                debug!(label = %self.label, error = %err, "configure rolled back");
                return Err(err);
            }
        }
        if outcome.lut_rebuilt {
            if let Some(old) = previous_lut {
                renderer.backend_mut().delete_texture(old.id);
            }
        }

        if had_lut != self.active_lut().map(|lut| lut.width) {
            outcome.needs_update = true;
        }
        Ok(outcome)
    }

    pub fn set_colormap<B: Backend>(
        &mut self,
        renderer: &mut Renderer<B>,
        colormap: Option<Arc<Colormap>>,
    ) -> Result<ConfigOutcome> {
        self.configure(
            renderer,
            ConfigDelta {
                colormap: Some(colormap),
                ..Default::default()
            },
        )
    }

    pub fn set_interpolation<B: Backend>(
        &mut self,
        renderer: &mut Renderer<B>,
        interpolation: Interpolation,
    ) -> Result<ConfigOutcome> {
        self.configure(
            renderer,
            ConfigDelta {
                interpolation: Some(interpolation),
                ..Default::default()
            },
        )
    }

    pub fn set_lighted<B: Backend>(
        &mut self,
        renderer: &mut Renderer<B>,
        lighted: bool,
    ) -> Result<ConfigOutcome> {
        self.configure(
            renderer,
            ConfigDelta {
                lighted: Some(lighted),
                ..Default::default()
            },
        )
    }

    pub fn set_gridsize<B: Backend>(
        &mut self,
        renderer: &mut Renderer<B>,
        gridsize: [f32; 3],
    ) -> Result<ConfigOutcome> {
        self.configure(
            renderer,
            ConfigDelta {
                gridsize: Some(gridsize),
                ..Default::default()
            },
        )
    }

    pub fn set_gridwidth<B: Backend>(
        &mut self,
        renderer: &mut Renderer<B>,
        gridwidth: [f32; 3],
    ) -> Result<ConfigOutcome> {
        self.configure(
            renderer,
            ConfigDelta {
                gridwidth: Some(gridwidth),
                ..Default::default()
            },
        )
    }

    pub fn set_elevation<B: Backend>(
        &mut self,
        renderer: &mut Renderer<B>,
        elevation: f32,
    ) -> Result<ConfigOutcome> {
        self.configure(
            renderer,
            ConfigDelta {
                elevation: Some(elevation),
                ..Default::default()
            },
        )
    }

    pub fn set_vmin<B: Backend>(
        &mut self,
        renderer: &mut Renderer<B>,
        vmin: Option<f32>,
    ) -> Result<ConfigOutcome> {
        self.configure(
            renderer,
            ConfigDelta {
                vmin: Some(vmin),
                ..Default::default()
            },
        )
    }

    pub fn set_vmax<B: Backend>(
        &mut self,
        renderer: &mut Renderer<B>,
        vmax: Option<f32>,
    ) -> Result<ConfigOutcome> {
        self.configure(
            renderer,
            ConfigDelta {
                vmax: Some(vmax),
                ..Default::default()
            },
        )
    }

    pub fn set_origin<B: Backend>(
        &mut self,
        renderer: &mut Renderer<B>,
        origin: Origin,
    ) -> Result<ConfigOutcome> {
        self.configure(
            renderer,
            ConfigDelta {
                origin: Some(origin),
                ..Default::default()
            },
        )
    }

    /// Releases the texture, the LUT and the program.
    pub fn destroy<B: Backend>(&mut self, renderer: &mut Renderer<B>) {
        self.texture.destroy(renderer);
        if let Some(lut) = self.lut.take() {
            renderer.backend_mut().delete_texture(lut.id);
        }
        if let Some(program) = self.program.take() {
            renderer.backend_mut().delete_program(program);
        }
        self.key = None;
        debug!(label = %self.label, "image destroyed");
    }

    fn request(&self) -> ShaderRequest {
        ShaderRequest {
            interpolation: self.options.interpolation,
            has_colormap: self.options.colormap.is_some(),
            lighted: self.options.lighted,
            has_grid: self.options.gridsize.iter().any(|v| *v != 0.0),
            has_elevation: self.options.elevation != 0.0,
        }
    }

    /// Recompiles when the selected key differs from the current one.
    ///
    /// The current program stays in place until its replacement compiled, so
    /// an error leaves the image exactly as it was.
    fn sync_program<B: Backend>(&mut self, renderer: &mut Renderer<B>) -> Result<bool> {
        let key = select_key(self.texture.format(), &self.request());
        if key == self.key {
            return Ok(false);
        }
        let program = match key {
            Some(key) => {
                if key.interpolation == Interpolation::Bicubic {
                    renderer.kernel_texture()?;
                }
                let program = renderer.compile(&shader::assemble(key))?;
                if let Some(program) = program {
                    if let Err(err) = self.push_uniforms_to(renderer, program) {
                        renderer.backend_mut().delete_program(program);
                        return Err(err);
                    }
                }
                self.rebuilds += 1;
                program
            }
            None => None,
        };
        if let Some(old) = std::mem::replace(&mut self.program, program) {
            renderer.backend_mut().delete_program(old);
        }
        self.key = key;
        debug!(
            label = %self.label,
            program = ?key.map(|k| k.label()),
            rebuilds = self.rebuilds,
            "shader program rebuilt"
        );
        Ok(true)
    }

    fn push_uniforms<B: Backend>(&self, renderer: &mut Renderer<B>) -> Result<()> {
        match self.program {
            Some(program) => self.push_uniforms_to(renderer, program),
            None => Ok(()),
        }
    }

    fn push_uniforms_to<B: Backend>(
        &self,
        renderer: &mut Renderer<B>,
        program: ProgramId,
    ) -> Result<()> {
        let width = self.texture.width().max(1) as f32;
        let height = self.texture.height().max(1) as f32;
        let backend = renderer.backend_mut();
        backend.set_uniform(
            program,
            uniform::PIXEL,
            UniformValue::Vec2([1.0 / width, 1.0 / height]),
        )?;
        backend.set_uniform(
            program,
            uniform::ELEVATION,
            UniformValue::Float(self.options.elevation),
        )?;
        backend.set_uniform(
            program,
            uniform::GRIDSIZE,
            UniformValue::Vec3(self.options.gridsize),
        )?;
        backend.set_uniform(
            program,
            uniform::GRIDWIDTH,
            UniformValue::Vec3(self.options.gridwidth),
        )?;
        backend.set_uniform(
            program,
            uniform::LIGHT_POSITION,
            UniformValue::Vec3(self.options.light_position),
        )?;
        Ok(())
    }

    /// LUT in use by the active program, if any.
    fn active_lut(&self) -> Option<LutTexture> {
        match (self.program, self.key) {
            (Some(_), Some(key)) if key.use_lut => self.lut,
            _ => None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn array(&self) -> &SharedArray {
        &self.array
    }

    pub fn texture(&self) -> &GpuTexture {
        &self.texture
    }

    pub fn format(&self) -> TextureFormat {
        self.texture.format()
    }

    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    pub fn shader_key(&self) -> Option<ShaderKey> {
        self.key
    }

    pub fn options(&self) -> &ImageOptions {
        &self.options
    }

    pub fn interpolation(&self) -> Interpolation {
        self.options.interpolation
    }

    pub fn origin(&self) -> Origin {
        self.options.origin
    }

    pub fn colormap(&self) -> Option<&Arc<Colormap>> {
        self.options.colormap.as_ref()
    }

    /// Range applied by the most recent update.
    pub fn range(&self) -> ColorRange {
        self.range
    }

    pub fn transfer(&self) -> PixelTransfer {
        self.texture.transfer()
    }

    pub fn lut_texture(&self) -> Option<TextureId> {
        self.lut.map(|lut| lut.id)
    }

    pub fn lut_width(&self) -> Option<usize> {
        self.lut.map(|lut| lut.width)
    }

    /// Number of program compilations since creation.
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }
}

fn upload_lut<B: Backend>(
    renderer: &mut Renderer<B>,
    label: &str,
    colormap: &Colormap,
    samples: usize,
) -> Result<LutTexture> {
    let table = colormap.lut(samples);
    let values: Vec<f32> = table.iter().flatten().copied().collect();
    let desc = TextureDesc {
        label: format!("{label}-lut"),
        target: TextureTarget::D1,
        format: TextureFormat::Rgb,
        source: SourceType::Float32,
        width: table.len() as u32,
        height: 0,
    };
    let backend = renderer.backend_mut();
    let id = backend.create_texture(&desc)?;
    backend.write_texture(id, TexelData::F32(&values), PixelTransfer::IDENTITY)?;
    trace!(label, colormap = colormap.name(), width = table.len(), "lut uploaded");
    Ok(LutTexture {
        id,
        width: table.len(),
    })
}
