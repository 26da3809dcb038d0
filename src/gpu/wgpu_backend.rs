//! [`Backend`] on top of a wgpu device.
//!
//! Draw calls are recorded between [`WgpuBackend::begin_frame`] and
//! [`WgpuBackend::end_frame`] and replayed into a single render pass. Every
//! texture is stored as a 2D texture; 1D textures are `width x 1`.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use tracing::{debug, warn};
use wgpu::util::DeviceExt;

use super::{
    Backend, PixelTransfer, ProgramId, ProgramSource, QuadDraw, ShaderCompileError, TexelData,
    TextureDesc, TextureId, UniformValue,
};
use crate::error::{Error, Result};
use crate::figure::Viewport;
use crate::shader::{self, uniform};
use crate::texture::{SourceType, TextureFormat};

/// Mirrors `Params` in `common.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct QuadUniform {
    rect: [f32; 4],
    texcoords: [f32; 4],
    pixel: [f32; 4],
    gridsize: [f32; 4],
    gridwidth: [f32; 4],
    light_position: [f32; 4],
}

/// Mirrors `Fill` in `fill.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct FillUniform {
    rect: [f32; 4],
    color: [f32; 4],
}

/// Uniform values a program keeps between draws.
#[derive(Clone, Copy, Debug)]
struct ProgramState {
    pixel: [f32; 3],
    gridsize: [f32; 3],
    gridwidth: [f32; 3],
    light_position: [f32; 3],
}

impl Default for ProgramState {
    fn default() -> Self {
        Self {
            pixel: [0.0; 3],
            gridsize: [0.0; 3],
            gridwidth: [1.0; 3],
            light_position: [0.0, 1.0, 2.0],
        }
    }
}

struct Program {
    pipeline: wgpu::RenderPipeline,
    state: ProgramState,
    vertex_count: u32,
}

struct Allocation {
    desc: TextureDesc,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// Scissor rectangle in target pixels, origin at the top left.
#[derive(Clone, Copy, Debug)]
struct Scissor {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

enum FrameOp {
    Quad {
        program: Option<ProgramId>,
        bind_group: wgpu::BindGroup,
        scissor: Scissor,
        vertices: u32,
    },
    Fill {
        bind_group: wgpu::BindGroup,
        scissor: Scissor,
    },
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,
    size: (u32, u32),
    bind_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    fill_layout: wgpu::BindGroupLayout,
    fill_pipeline: wgpu::RenderPipeline,
    plain: wgpu::RenderPipeline,
    dummy: wgpu::TextureView,
    next_id: u64,
    textures: HashMap<TextureId, Allocation>,
    programs: HashMap<ProgramId, Program>,
    viewport: Viewport,
    clear_color: [f32; 4],
    ops: Vec<FrameOp>,
}

impl WgpuBackend {
    /// Builds the shared pipelines for render targets of `format`.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, format: wgpu::TextureFormat) -> Result<Self> {
        let texture_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let uniform_entry = wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("image-bgl"),
            entries: &[
                uniform_entry,
                texture_entry(1),
                texture_entry(2),
                texture_entry(3),
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("image-pipeline-layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });

        let fill_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("fill-bgl"),
            entries: &[uniform_entry],
        });
        let fill_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("fill-pipeline-layout"),
            bind_group_layouts: &[&fill_layout],
            push_constant_ranges: &[],
        });
        let fill_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fill-shader"),
            source: wgpu::ShaderSource::Wgsl(shader::FILL.into()),
        });
        let fill_pipeline = build_pipeline(
            &device,
            "fill-pipeline",
            &fill_pipeline_layout,
            &fill_module,
            ("vs_fill", "fs_fill"),
            format,
        );

        let plain_source = shader::plain();
        let plain = compile_scoped(&device, &pipeline_layout, &plain_source, format)?;

        let dummy = device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("unbound-texture"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::R32Float,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            device,
            queue,
            format,
            size: (1, 1),
            bind_layout,
            pipeline_layout,
            fill_layout,
            fill_pipeline,
            plain,
            dummy,
            next_id: 0,
            textures: HashMap::new(),
            programs: HashMap::new(),
            viewport: Viewport::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            ops: Vec::new(),
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Starts recording a frame for a target of `width x height` pixels.
    pub fn begin_frame(&mut self, width: u32, height: u32) {
        self.size = (width.max(1), height.max(1));
        self.ops.clear();
        self.viewport = Viewport {
            x: 0,
            y: 0,
            width: self.size.0,
            height: self.size.1,
        };
    }

    /// Replays the recorded frame into `target` and submits it.
    pub fn end_frame(&mut self, target: &wgpu::TextureView) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("fieldview-encoder"),
            });
        self.encode(&mut encoder, target);
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn encode(&mut self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let ops = std::mem::take(&mut self.ops);
        let [r, g, b, a] = self.clear_color.map(f64::from);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("fieldview-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        for op in &ops {
            match op {
                FrameOp::Quad {
                    program,
                    bind_group,
                    scissor,
                    vertices,
                } => {
                    let pipeline = match program {
                        Some(id) => match self.programs.get(id) {
                            Some(program) => &program.pipeline,
                            None => continue,
                        },
                        None => &self.plain,
                    };
                    pass.set_pipeline(pipeline);
                    pass.set_bind_group(0, bind_group, &[]);
                    pass.set_scissor_rect(scissor.x, scissor.y, scissor.width, scissor.height);
                    pass.draw(0..*vertices, 0..1);
                }
                FrameOp::Fill {
                    bind_group,
                    scissor,
                } => {
                    pass.set_pipeline(&self.fill_pipeline);
                    pass.set_bind_group(0, bind_group, &[]);
                    pass.set_scissor_rect(scissor.x, scissor.y, scissor.width, scissor.height);
                    pass.draw(0..6, 0..1);
                }
            }
        }
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Clamps a bottom-left viewport to the target and flips it to top-left.
    fn scissor(&self, area: Viewport) -> Option<Scissor> {
        let (tw, th) = (i64::from(self.size.0), i64::from(self.size.1));
        let x0 = i64::from(area.x).clamp(0, tw);
        let x1 = (i64::from(area.x) + i64::from(area.width)).clamp(0, tw);
        let y0 = i64::from(area.y).clamp(0, th);
        let y1 = (i64::from(area.y) + i64::from(area.height)).clamp(0, th);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Scissor {
            x: x0 as u32,
            y: (th - y1) as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }

    /// Converts a rectangle in viewport pixels to target clip space.
    fn clip_rect(&self, x: f32, y: f32, width: f32, height: f32) -> [f32; 4] {
        let (tw, th) = (self.size.0 as f32, self.size.1 as f32);
        let px = self.viewport.x as f32 + x;
        let py = self.viewport.y as f32 + y;
        [
            -1.0 + 2.0 * px / tw,
            -1.0 + 2.0 * py / th,
            2.0 * width / tw,
            2.0 * height / th,
        ]
    }

    fn view(&self, id: Option<TextureId>) -> Result<&wgpu::TextureView> {
        match id {
            Some(id) => self
                .textures
                .get(&id)
                .map(|alloc| &alloc.view)
                .ok_or(Error::StaleTexture(id)),
            None => Ok(&self.dummy),
        }
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    (vs, fs): (&str, &str),
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some(vs),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(fs),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Compiles inside a validation scope so WGSL errors come back as values.
fn compile_scoped(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    source: &ProgramSource,
    format: wgpu::TextureFormat,
) -> Result<wgpu::RenderPipeline, ShaderCompileError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&source.label),
        source: wgpu::ShaderSource::Wgsl(source.wgsl.as_str().into()),
    });
    let pipeline = build_pipeline(
        device,
        &source.label,
        layout,
        &module,
        ("vs_main", "fs_main"),
        format,
    );
    match pollster::block_on(device.pop_error_scope()) {
        None => Ok(pipeline),
        Some(err) => Err(ShaderCompileError {
            label: source.label.clone(),
            log: err.to_string(),
        }),
    }
}

fn storage_format(format: TextureFormat, source: SourceType) -> wgpu::TextureFormat {
    match (source, format) {
        (SourceType::Float32, TextureFormat::Alpha) => wgpu::TextureFormat::R32Float,
        (SourceType::Float32, TextureFormat::LuminanceAlpha) => wgpu::TextureFormat::Rg32Float,
        (SourceType::Float32, _) => wgpu::TextureFormat::Rgba32Float,
        (SourceType::UnsignedByte, TextureFormat::Alpha) => wgpu::TextureFormat::R8Unorm,
        (SourceType::UnsignedByte, TextureFormat::LuminanceAlpha) => wgpu::TextureFormat::Rg8Unorm,
        (SourceType::UnsignedByte, _) => wgpu::TextureFormat::Rgba8Unorm,
    }
}

/// Channels actually stored; RGB is widened to RGBA.
fn stored_channels(format: TextureFormat) -> usize {
    match format {
        TextureFormat::Rgb => 4,
        other => other.channels(),
    }
}

fn format_code(format: TextureFormat) -> f32 {
    match format {
        TextureFormat::Alpha => 0.0,
        TextureFormat::LuminanceAlpha => 1.0,
        TextureFormat::Rgb | TextureFormat::Rgba => 2.0,
    }
}

/// Applies the transfer and packs texels the way the storage format wants them.
fn pack(desc: &TextureDesc, texels: TexelData<'_>, transfer: PixelTransfer) -> Vec<u8> {
    let widen = desc.format == TextureFormat::Rgb;
    match (desc.source, texels) {
        (SourceType::UnsignedByte, TexelData::U8(bytes)) if transfer.is_identity() => {
            if widen {
                bytes
                    .chunks_exact(3)
                    .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], u8::MAX])
                    .collect()
            } else {
                bytes.to_vec()
            }
        }
        (SourceType::UnsignedByte, texels) => {
            let mut values = texels.to_normalized();
            transfer.apply_to_alpha(desc.format, &mut values);
            widen_rgb(values, widen, 1.0)
                .into_iter()
                .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
                .collect()
        }
        (SourceType::Float32, texels) => {
            let mut values = texels.to_normalized();
            transfer.apply_to_alpha(desc.format, &mut values);
            let values = widen_rgb(values, widen, 1.0);
            bytemuck::cast_slice(&values).to_vec()
        }
    }
}

fn widen_rgb(values: Vec<f32>, widen: bool, alpha: f32) -> Vec<f32> {
    if !widen {
        return values;
    }
    values
        .chunks_exact(3)
        .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], alpha])
        .collect()
}

impl Backend for WgpuBackend {
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId> {
        let limit = self.device.limits().max_texture_dimension_2d;
        let (width, height) = (desc.width, desc.height.max(1));
        if width == 0 || width > limit || height > limit {
            return Err(Error::Backend(format!(
                "texture `{}` of {}x{} exceeds the device limit of {}",
                desc.label, width, height, limit
            )));
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: storage_format(desc.format, desc.source),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = TextureId(self.next());
        debug!(label = %desc.label, width, height, format = %desc.format, "texture allocated");
        self.textures.insert(
            id,
            Allocation {
                desc: desc.clone(),
                texture,
                view,
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
        let alloc = self.textures.get(&id).ok_or(Error::StaleTexture(id))?;
        let desc = &alloc.desc;
        if texels.len() != desc.value_count() {
            return Err(Error::Backend(format!(
                "texture `{}` expects {} values, got {}",
                desc.label,
                desc.value_count(),
                texels.len()
            )));
        }
        let bytes = pack(desc, texels, transfer);
        let (width, height) = (desc.width, desc.height.max(1));
        let texel_size = match desc.source {
            SourceType::Float32 => 4,
            SourceType::UnsignedByte => 1,
        } * stored_channels(desc.format) as u32;
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &alloc.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * texel_size),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn delete_texture(&mut self, id: TextureId) {
        if let Some(alloc) = self.textures.remove(&id) {
            alloc.texture.destroy();
        }
    }

    fn compile_program(
        &mut self,
        source: &ProgramSource,
    ) -> Result<ProgramId, ShaderCompileError> {
        let pipeline = compile_scoped(&self.device, &self.pipeline_layout, source, self.format)?;
        let id = ProgramId(self.next());
        self.programs.insert(
            id,
            Program {
                pipeline,
                state: ProgramState::default(),
                vertex_count: source.key.vertex_count(),
            },
        );
        Ok(id)
    }

    fn delete_program(&mut self, id: ProgramId) {
        self.programs.remove(&id);
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) -> Result<()> {
        let state = &mut self
            .programs
            .get_mut(&program)
            .ok_or(Error::StaleProgram(program))?
            .state;
        match (name, value) {
            (uniform::PIXEL, UniformValue::Vec2([x, y])) => {
                state.pixel[0] = x;
                state.pixel[1] = y;
            }
            (uniform::ELEVATION, UniformValue::Float(v)) => state.pixel[2] = v,
            (uniform::GRIDSIZE, UniformValue::Vec3(v)) => state.gridsize = v,
            (uniform::GRIDWIDTH, UniformValue::Vec3(v)) => state.gridwidth = v,
            (uniform::LIGHT_POSITION, UniformValue::Vec3(v)) => state.light_position = v,
            _ => {
                warn!(name, ?value, "ignoring unknown uniform");
            }
        }
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.ops.clear();
        self.clear_color = color;
    }

    fn fill_rect(&mut self, area: Viewport, color: [f32; 4]) {
        let Some(scissor) = self.scissor(area) else {
            return;
        };
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("fill-uniform"),
                contents: bytemuck::bytes_of(&FillUniform {
                    rect: [-1.0, -1.0, 2.0, 2.0],
                    color,
                }),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fill-bind-group"),
            layout: &self.fill_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        self.ops.push(FrameOp::Fill {
            bind_group,
            scissor,
        });
    }

    fn draw_quad(&mut self, draw: &QuadDraw) -> Result<()> {
        let format = self
            .textures
            .get(&draw.texture)
            .map(|alloc| alloc.desc.format)
            .ok_or(Error::StaleTexture(draw.texture))?;
        let (state, vertices) = match draw.program {
            Some(id) => {
                let program = self.programs.get(&id).ok_or(Error::StaleProgram(id))?;
                (program.state, program.vertex_count)
            }
            None => (ProgramState::default(), 6),
        };
        let Some(scissor) = self.scissor(self.viewport) else {
            return Ok(());
        };

        let tc = draw.texcoords;
        let [px, py, elevation] = state.pixel;
        let widen = |v: [f32; 3]| [v[0], v[1], v[2], 0.0];
        let params = QuadUniform {
            rect: self.clip_rect(draw.rect.x, draw.rect.y, draw.rect.width, draw.rect.height),
            texcoords: [tc.s0, tc.s1, tc.t0, tc.t1],
            pixel: [px, py, elevation, format_code(format)],
            gridsize: widen(state.gridsize),
            gridwidth: widen(state.gridwidth),
            light_position: widen(state.light_position),
        };
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("image-uniform"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("image-bind-group"),
            layout: &self.bind_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(self.view(Some(draw.texture))?),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(self.view(draw.lut)?),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(self.view(draw.kernel)?),
                },
            ],
        });
        self.ops.push(FrameOp::Quad {
            program: draw.program,
            bind_group,
            scissor,
            vertices,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::TextureTarget;

    fn desc(format: TextureFormat, source: SourceType, width: u32) -> TextureDesc {
        TextureDesc {
            label: "t".into(),
            target: TextureTarget::D1,
            format,
            source,
            width,
            height: 0,
        }
    }

    #[test]
    fn rgb_bytes_are_widened_with_opaque_alpha() {
        let d = desc(TextureFormat::Rgb, SourceType::UnsignedByte, 2);
        let bytes = pack(&d, TexelData::U8(&[1, 2, 3, 4, 5, 6]), PixelTransfer::IDENTITY);
        assert_eq!(bytes, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn float_alpha_gets_transfer() {
        let d = desc(TextureFormat::Alpha, SourceType::Float32, 2);
        let transfer = PixelTransfer {
            bias: 0.5,
            scale: 0.5,
        };
        let bytes = pack(&d, TexelData::F32(&[0.0, 1.0]), transfer);
        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(values, vec![0.5, 1.0]);
    }

    #[test]
    fn uniform_layout_matches_wgsl() {
        assert_eq!(std::mem::size_of::<QuadUniform>(), 96);
        assert_eq!(std::mem::size_of::<FillUniform>(), 32);
    }
}
