use fieldview::Error;
use fieldview::array::{ArrayData, NumericArray, shared};
use fieldview::colormap::Colormap;
use fieldview::gpu::{HeadlessBackend, Renderer, ShaderFailurePolicy, UniformValue};
use fieldview::image::{ConfigDelta, Image, ImageOptions, Origin};
use fieldview::shader::Interpolation;
use fieldview::texture::TextureFormat;
use std::sync::Arc;

fn close(a: f32, b: f32) {
    assert!((a - b).abs() < 1e-5, "{a} vs {b}");
}

fn ramp(rows: usize, cols: usize) -> NumericArray {
    let n = rows * cols;
    let values = (0..n).map(|i| i as f32 / (n - 1) as f32).collect();
    NumericArray::from_f32(vec![rows, cols], values).unwrap()
}

fn plain_options() -> ImageOptions {
    ImageOptions {
        colormap: None,
        ..ImageOptions::default()
    }
}

#[test]
fn range_change_rescales_on_next_update() {
    let mut renderer = Renderer::new(HeadlessBackend::new());
    let options = ImageOptions {
        vmin: Some(0.0),
        vmax: Some(1.0),
        interpolation: Interpolation::Nearest,
        ..plain_options()
    };
    let mut image = Image::create(&mut renderer, "a", shared(ramp(100, 100)), options).unwrap();

    let transfer = image.update(&mut renderer).unwrap();
    close(transfer.bias, 0.0);
    close(transfer.scale, 1.0);

    let outcome = image.set_vmax(&mut renderer, Some(2.0)).unwrap();
    assert!(outcome.needs_update);
    assert!(!outcome.program_rebuilt);
    let transfer = image.update(&mut renderer).unwrap();
    close(transfer.bias, 0.0);
    close(transfer.scale, 0.5);

    let stored = renderer
        .backend()
        .texture(image.texture().id())
        .unwrap();
    close(*stored.values.last().unwrap(), 0.5);
}

#[test]
fn grid_program_is_rebuilt_only_when_grid_appears() {
    let mut renderer = Renderer::new(HeadlessBackend::new());
    let mut image = Image::create(&mut renderer, "grid", shared(ramp(8, 8)), plain_options()).unwrap();
    assert_eq!(image.rebuild_count(), 0);
    assert!(image.program().is_none());

    let outcome = image.set_gridsize(&mut renderer, [0.0, 0.0, 0.0]).unwrap();
    assert!(!outcome.program_rebuilt);
    assert_eq!(image.rebuild_count(), 0);
    assert_eq!(renderer.backend().compile_count(), 0);

    let outcome = image.set_gridsize(&mut renderer, [5.0, 5.0, 1.0]).unwrap();
    assert!(outcome.program_rebuilt);
    assert_eq!(image.rebuild_count(), 1);
    assert_eq!(renderer.backend().compile_count(), 1);

    let outcome = image.set_gridsize(&mut renderer, [3.0, 3.0, 1.0]).unwrap();
    assert!(!outcome.program_rebuilt);
    assert_eq!(image.rebuild_count(), 1);
    assert_eq!(renderer.backend().compile_count(), 1);

    let program = image.program().unwrap();
    let uniforms = &renderer.backend().program(program).unwrap().uniforms;
    assert_eq!(
        uniforms.get("gridsize"),
        Some(&UniformValue::Vec3([3.0, 3.0, 1.0]))
    );
}

#[test]
fn configure_batches_changes_into_one_rebuild() {
    let mut renderer = Renderer::new(HeadlessBackend::new());
    let mut image = Image::create(&mut renderer, "batch", shared(ramp(8, 8)), plain_options()).unwrap();
    let delta = ConfigDelta {
        interpolation: Some(Interpolation::Bilinear),
        lighted: Some(true),
        elevation: Some(0.5),
        ..Default::default()
    };
    let outcome = image.configure(&mut renderer, delta).unwrap();
    assert!(outcome.program_rebuilt);
    assert_eq!(image.rebuild_count(), 1);
    let key = image.shader_key().unwrap();
    assert!(key.lighted && key.has_elevation && !key.use_lut);
    assert_eq!(key.label(), "bilinear+light+elevation");

    // Back to the plain blit drops the program.
    let delta = ConfigDelta {
        interpolation: Some(Interpolation::Nearest),
        lighted: Some(false),
        elevation: Some(0.0),
        ..Default::default()
    };
    image.configure(&mut renderer, delta).unwrap();
    assert!(image.program().is_none());
    assert_eq!(renderer.backend().program_count(), 0);
}

#[test]
fn scalar_data_with_colormap_uses_the_lut_range() {
    let mut renderer = Renderer::new(HeadlessBackend::new());
    let mut image = Image::create(
        &mut renderer,
        "mapped",
        shared(ramp(4, 5)),
        ImageOptions::default(),
    )
    .unwrap();
    let key = image.shader_key().unwrap();
    assert!(key.use_lut);
    assert_eq!(key.interpolation, Interpolation::Nearest);

    // (4, 5) is a scalar field; (4, 4) would read as a 1D RGBA strip.
    assert_eq!(image.format(), TextureFormat::Alpha);
    let width = image.lut_width().unwrap();
    let transfer = image.update(&mut renderer).unwrap();
    let s = width as f32;
    close(transfer.scale, (s - 3.1) / (s - 1.0));
    close(transfer.bias, 1.0 / (s - 1.0));

    let lut = renderer.backend().texture(image.lut_texture().unwrap()).unwrap();
    assert_eq!(lut.desc.format, TextureFormat::Rgb);
    assert_eq!(lut.desc.width as usize, width);
}

#[test]
fn color_data_ignores_the_colormap() {
    let mut renderer = Renderer::new(HeadlessBackend::new());
    let rgb = NumericArray::from_f32(vec![2, 2, 3], vec![0.5; 12]).unwrap();
    let image = Image::create(&mut renderer, "rgb", shared(rgb), ImageOptions::default()).unwrap();
    assert_eq!(image.format(), TextureFormat::Rgb);
    assert!(image.shader_key().is_none());
}

#[test]
fn removing_the_colormap_switches_back_to_unit_range() {
    let mut renderer = Renderer::new(HeadlessBackend::new());
    let mut image = Image::create(
        &mut renderer,
        "unmap",
        shared(ramp(4, 5)),
        ImageOptions::default(),
    )
    .unwrap();
    let outcome = image.set_colormap(&mut renderer, None).unwrap();
    assert!(outcome.lut_rebuilt && outcome.needs_update && outcome.program_rebuilt);
    assert!(image.lut_texture().is_none());
    let transfer = image.update(&mut renderer).unwrap();
    close(transfer.bias, 0.0);
    close(transfer.scale, 1.0);

    let hot = Arc::new(Colormap::by_name("hot").unwrap());
    image.set_colormap(&mut renderer, Some(hot)).unwrap();
    assert_eq!(image.colormap().unwrap().name(), "hot");
    assert!(image.shader_key().unwrap().use_lut);
}

#[test]
fn bicubic_images_share_one_kernel() {
    let mut renderer = Renderer::new(HeadlessBackend::new());
    let options = ImageOptions {
        interpolation: Interpolation::Bicubic,
        ..plain_options()
    };
    let a = Image::create(&mut renderer, "a", shared(ramp(4, 5)), options.clone()).unwrap();
    let b = Image::create(&mut renderer, "b", shared(ramp(6, 6)), options).unwrap();
    a.blit(&mut renderer, 0.0, 0.0, 10.0, 10.0).unwrap();
    b.blit(&mut renderer, 0.0, 0.0, 10.0, 10.0).unwrap();
    let kernels: Vec<_> = renderer
        .backend()
        .quads()
        .map(|(_, draw)| draw.kernel)
        .collect();
    assert_eq!(kernels.len(), 2);
    assert!(kernels[0].is_some());
    assert_eq!(kernels[0], kernels[1]);
    // Two images plus the shared kernel table.
    assert_eq!(renderer.backend().texture_count(), 3);
}

#[test]
fn origin_flips_texture_coordinates() {
    let mut renderer = Renderer::new(HeadlessBackend::new());
    let mut image = Image::create(&mut renderer, "flip", shared(ramp(4, 5)), plain_options()).unwrap();
    image.blit(&mut renderer, 1.0, 2.0, 30.0, 40.0).unwrap();
    image.set_origin(&mut renderer, Origin::Upper).unwrap();
    image.blit(&mut renderer, 1.0, 2.0, 30.0, 40.0).unwrap();

    let draws: Vec<_> = renderer.backend().quads().map(|(_, d)| d.clone()).collect();
    assert_eq!((draws[0].texcoords.t0, draws[0].texcoords.t1), (0.0, 1.0));
    assert_eq!((draws[1].texcoords.t0, draws[1].texcoords.t1), (1.0, 0.0));
    assert_eq!(draws[1].rect.x, 1.0);
    assert_eq!(draws[1].rect.height, 40.0);
    assert!(draws[1].program.is_none());
}

#[test]
fn failed_compile_aborts_by_default() {
    let mut renderer = Renderer::new(HeadlessBackend::new());
    renderer.backend_mut().fail_next_compile("syntax error at 3:1");
    let options = ImageOptions {
        interpolation: Interpolation::Bilinear,
        ..plain_options()
    };
    let err = Image::create(&mut renderer, "broken", shared(ramp(4, 5)), options)
        .err()
        .unwrap();
    assert!(matches!(err, Error::ShaderCompile(_)));
    assert!(err.to_string().contains("syntax error"), "{err}");
    assert_eq!(renderer.backend().texture_count(), 0);
}

#[test]
fn failed_compile_degrades_to_plain_blit() {
    let mut renderer =
        Renderer::new(HeadlessBackend::new()).with_policy(ShaderFailurePolicy::Degrade);
    renderer.backend_mut().fail_next_compile("syntax error");
    let options = ImageOptions {
        interpolation: Interpolation::Bilinear,
        ..plain_options()
    };
    let image = Image::create(&mut renderer, "degraded", shared(ramp(4, 5)), options).unwrap();
    assert!(image.program().is_none());
    image.blit(&mut renderer, 0.0, 0.0, 4.0, 4.0).unwrap();
    let (_, draw) = renderer.backend().quads().last().unwrap();
    assert!(draw.program.is_none());
    assert!(draw.lut.is_none());
}

#[test]
fn in_place_mutation_is_visible_after_update() {
    let mut renderer = Renderer::new(HeadlessBackend::new());
    let array = shared(NumericArray::zeros(vec![2, 2]));
    let options = ImageOptions {
        vmin: Some(0.0),
        vmax: Some(1.0),
        ..plain_options()
    };
    let mut image = Image::create(&mut renderer, "live", Arc::clone(&array), options).unwrap();
    array.write().as_f32_mut().unwrap()[3] = 1.0;
    image.update(&mut renderer).unwrap();
    let stored = renderer.backend().texture(image.texture().id()).unwrap();
    assert_eq!(stored.values, vec![0.0, 0.0, 0.0, 1.0]);
}

#[test]
fn reshaped_array_reallocates_on_update() {
    let mut renderer = Renderer::new(HeadlessBackend::new());
    let array = shared(NumericArray::zeros(vec![2, 2]));
    let mut image = Image::create(&mut renderer, "reshape", Arc::clone(&array), plain_options()).unwrap();
    array
        .write()
        .replace(vec![3, 5], ArrayData::F32(vec![0.25; 15]))
        .unwrap();
    image.update(&mut renderer).unwrap();
    assert_eq!(image.texture().shape(), &[3, 5]);
    assert_eq!((image.texture().width(), image.texture().height()), (5, 3));
}

#[test]
fn destroyed_image_reports_stale_texture() {
    let mut renderer = Renderer::new(HeadlessBackend::new());
    let mut image = Image::create(&mut renderer, "gone", shared(ramp(4, 5)), plain_options()).unwrap();
    image.destroy(&mut renderer);
    assert!(matches!(
        image.update(&mut renderer),
        Err(Error::StaleTexture(_))
    ));
    assert!(matches!(
        image.blit(&mut renderer, 0.0, 0.0, 1.0, 1.0),
        Err(Error::StaleTexture(_))
    ));
    assert_eq!(renderer.backend().texture_count(), 0);
}

fn mapped_image(renderer: &mut Renderer<HeadlessBackend>) -> Image {
    Image::create(renderer, "mapped", shared(ramp(8, 8)), ImageOptions::default()).unwrap()
}

#[test]
fn failed_rebuild_keeps_the_working_program() {
    let mut renderer = Renderer::new(HeadlessBackend::new());
    let mut image = mapped_image(&mut renderer);
    let key = image.shader_key();
    let program = image.program();
    let lut = image.lut_texture();
    assert!(key.unwrap().use_lut && program.is_some());

    renderer.backend_mut().fail_next_compile("bicubic: undefined symbol");
    let err = image
        .set_interpolation(&mut renderer, Interpolation::Bicubic)
        .unwrap_err();
    assert!(matches!(err, Error::ShaderCompile(_)));

    assert_eq!(image.shader_key(), key);
    assert_eq!(image.program(), program);
    assert_eq!(image.lut_texture(), lut);
    assert_eq!(image.interpolation(), Interpolation::Nearest);
    assert!(renderer.backend().program(program.unwrap()).is_some());

    let transfer = image.update(&mut renderer).unwrap();
    let s = image.lut_width().unwrap() as f32;
    close(transfer.scale, (s - 3.1) / (s - 1.0));

    image.blit(&mut renderer, 0.0, 0.0, 8.0, 8.0).unwrap();
    let (_, draw) = renderer.backend().quads().last().unwrap();
    assert_eq!(draw.program, program);
    assert_eq!(draw.lut, lut);
}

#[test]
fn failed_colormap_change_releases_the_new_lut() {
    let mut renderer = Renderer::new(HeadlessBackend::new());
    let mut image =
        Image::create(&mut renderer, "bare", shared(ramp(8, 8)), plain_options()).unwrap();
    let textures = renderer.backend().texture_count();

    renderer.backend_mut().fail_next_compile("lut stage rejected");
    let hot = Arc::new(Colormap::by_name("hot").unwrap());
    assert!(image.set_colormap(&mut renderer, Some(hot)).is_err());

    assert!(image.colormap().is_none());
    assert!(image.lut_texture().is_none());
    assert!(image.shader_key().is_none());
    assert_eq!(renderer.backend().texture_count(), textures);
}

#[test]
fn swapping_colormaps_replaces_the_lut() {
    let mut renderer = Renderer::new(HeadlessBackend::new());
    let mut image = mapped_image(&mut renderer);
    let old = image.lut_texture().unwrap();
    let textures = renderer.backend().texture_count();

    let hot = Arc::new(Colormap::by_name("hot").unwrap());
    let outcome = image.set_colormap(&mut renderer, Some(hot)).unwrap();
    assert!(outcome.lut_rebuilt && !outcome.program_rebuilt);
    assert_ne!(image.lut_texture(), Some(old));
    assert!(renderer.backend().texture(old).is_none());
    assert_eq!(renderer.backend().texture_count(), textures);
}

#[test]
fn degraded_rebuild_falls_back_to_plain_blit() {
    let mut renderer =
        Renderer::new(HeadlessBackend::new()).with_policy(ShaderFailurePolicy::Degrade);
    let mut image = mapped_image(&mut renderer);
    assert!(image.program().is_some());

    renderer.backend_mut().fail_next_compile("bilinear: out of registers");
    image
        .set_interpolation(&mut renderer, Interpolation::Bilinear)
        .unwrap();
    assert!(image.program().is_none());
    assert_eq!(image.interpolation(), Interpolation::Bilinear);
    assert_eq!(renderer.backend().program_count(), 0);

    let transfer = image.update(&mut renderer).unwrap();
    close(transfer.bias, 0.0);
    close(transfer.scale, 1.0);

    image.blit(&mut renderer, 0.0, 0.0, 8.0, 8.0).unwrap();
    let (_, draw) = renderer.backend().quads().last().unwrap();
    assert!(draw.program.is_none());
    assert!(draw.lut.is_none());
}
