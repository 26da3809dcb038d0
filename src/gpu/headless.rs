//! In-memory backend that records every call. Used by tests and `--dry-run`.

use std::collections::BTreeMap;

use super::{
    Backend, PixelTransfer, ProgramId, ProgramSource, QuadDraw, ShaderCompileError, TexelData,
    TextureDesc, TextureId, UniformValue,
};
use crate::error::{Error, Result};
use crate::figure::Viewport;

#[derive(Debug, Clone)]
pub struct HeadlessTexture {
    pub desc: TextureDesc,
    /// Values after pixel transfer, bytes normalized to `[0, 1]`.
    pub values: Vec<f32>,
    pub uploads: usize,
    pub last_transfer: PixelTransfer,
}

#[derive(Debug, Clone)]
pub struct HeadlessProgram {
    pub source: ProgramSource,
    pub uniforms: BTreeMap<String, UniformValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear([f32; 4]),
    Fill { area: Viewport, color: [f32; 4] },
    Quad { viewport: Viewport, draw: QuadDraw },
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_id: u64,
    textures: BTreeMap<TextureId, HeadlessTexture>,
    programs: BTreeMap<ProgramId, HeadlessProgram>,
    viewport: Viewport,
    draws: Vec<DrawCommand>,
    compiles: usize,
    program_deletes: usize,
    fail_next_compile: Option<String>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Makes the next `compile_program` call fail with `log`.
    pub fn fail_next_compile(&mut self, log: impl Into<String>) {
        self.fail_next_compile = Some(log.into());
    }

    pub fn texture(&self, id: TextureId) -> Option<&HeadlessTexture> {
        self.textures.get(&id)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn program(&self, id: ProgramId) -> Option<&HeadlessProgram> {
        self.programs.get(&id)
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn compile_count(&self) -> usize {
        self.compiles
    }

    pub fn program_delete_count(&self) -> usize {
        self.program_deletes
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn draws(&self) -> &[DrawCommand] {
        &self.draws
    }

    pub fn quads(&self) -> impl Iterator<Item = (&Viewport, &QuadDraw)> {
        self.draws.iter().filter_map(|cmd| match cmd {
            DrawCommand::Quad { viewport, draw } => Some((viewport, draw)),
            _ => None,
        })
    }

    pub fn take_draws(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.draws)
    }
}

impl Backend for HeadlessBackend {
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId> {
        if desc.width == 0 {
            return Err(Error::Backend(format!(
                "texture `{}` has zero width",
                desc.label
            )));
        }
        let id = TextureId(self.next());
        self.textures.insert(
            id,
            HeadlessTexture {
                desc: desc.clone(),
                values: vec![0.0; desc.value_count()],
                uploads: 0,
                last_transfer: PixelTransfer::IDENTITY,
            },
        );
        Ok(id)
    }

    fn write_texture(
        &mut self,
        id: TextureId,
        texels: TexelData<'_>,
        transfer: PixelTransfer,
    ) -> Result<()> {
        let texture = self.textures.get_mut(&id).ok_or(Error::StaleTexture(id))?;
        let expected = texture.desc.value_count();
        if texels.len() != expected {
            return Err(Error::Backend(format!(
                "texture `{}` expects {} values, got {}",
                texture.desc.label,
                expected,
                texels.len()
            )));
        }
        let mut values = texels.to_normalized();
        transfer.apply_to_alpha(texture.desc.format, &mut values);
        texture.values = values;
        texture.uploads += 1;
        texture.last_transfer = transfer;
        Ok(())
    }

    fn delete_texture(&mut self, id: TextureId) {
        self.textures.remove(&id);
    }

    fn compile_program(
        &mut self,
        source: &ProgramSource,
    ) -> Result<ProgramId, ShaderCompileError> {
        self.compiles += 1;
        if let Some(log) = self.fail_next_compile.take() {
            return Err(ShaderCompileError {
                label: source.label.clone(),
                log,
            });
        }
        for entry in ["fn vs_main", "fn fs_main"] {
            if !source.wgsl.contains(entry) {
                return Err(ShaderCompileError {
                    label: source.label.clone(),
                    log: format!("missing entry point `{}`", &entry[3..]),
                });
            }
        }
        let id = ProgramId(self.next());
        self.programs.insert(
            id,
            HeadlessProgram {
                source: source.clone(),
                uniforms: BTreeMap::new(),
            },
        );
        Ok(id)
    }

    fn delete_program(&mut self, id: ProgramId) {
        if self.programs.remove(&id).is_some() {
            self.program_deletes += 1;
        }
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) -> Result<()> {
        let entry = self
            .programs
            .get_mut(&program)
            .ok_or(Error::StaleProgram(program))?;
        entry.uniforms.insert(name.to_string(), value);
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.draws.push(DrawCommand::Clear(color));
    }

    fn fill_rect(&mut self, area: Viewport, color: [f32; 4]) {
        self.draws.push(DrawCommand::Fill { area, color });
    }

    fn draw_quad(&mut self, draw: &QuadDraw) -> Result<()> {
        if !self.textures.contains_key(&draw.texture) {
            return Err(Error::StaleTexture(draw.texture));
        }
        if let Some(program) = draw.program {
            if !self.programs.contains_key(&program) {
                return Err(Error::StaleProgram(program));
            }
        }
        self.draws.push(DrawCommand::Quad {
            viewport: self.viewport,
            draw: draw.clone(),
        });
        Ok(())
    }
}
