use fieldview::command::Command;
use fieldview::config::SceneConfig;
use fieldview::figure::Viewport;
use fieldview::gpu::headless::DrawCommand;
use fieldview::gpu::{HeadlessBackend, Renderer};
use fieldview::scene::Scene;

const SCENE: &str = r##"
window:
  background: "#000000"
layout:
  cols: 2
panels:
  - name: left
    field:
      kind: gaussian
      width: 16
      height: 16
    image:
      colormap: none
  - name: right
    cell: [1, 0]
    frame:
      aspect: 1.0
      background: "#ffffff"
      foreground: "#ff0000"
    field:
      kind: ripple
      width: 16
      height: 16
"##;

fn build() -> (Scene, Renderer<HeadlessBackend>) {
    let cfg: SceneConfig = serde_yaml::from_str(SCENE).unwrap();
    let cfg = cfg.validated().unwrap();
    let mut renderer = Renderer::new(HeadlessBackend::new());
    let scene = Scene::build(cfg, &mut renderer, 400.0, 200.0).unwrap();
    (scene, renderer)
}

#[test]
fn panels_get_their_viewports() {
    let (scene, _renderer) = build();
    let viewports = scene.viewports().unwrap();
    assert_eq!(
        viewports,
        vec![
            ("left", Viewport { x: 0, y: 0, width: 200, height: 200 }),
            ("right", Viewport { x: 200, y: 0, width: 200, height: 200 }),
        ]
    );
    assert!(scene.is_animated());
    assert!(scene.panel("left").unwrap().image().shader_key().is_none());
    assert!(scene.panel("right").unwrap().image().shader_key().unwrap().use_lut);
}

#[test]
fn draw_paints_frames_around_images() {
    let (mut scene, mut renderer) = build();
    scene.draw(&mut renderer).unwrap();
    let draws = renderer.backend_mut().take_draws();

    assert_eq!(draws[0], DrawCommand::Clear([0.0, 0.0, 0.0, 1.0]));
    let quads: Vec<_> = draws
        .iter()
        .filter_map(|d| match d {
            DrawCommand::Quad { viewport, draw } => Some((*viewport, draw.rect)),
            _ => None,
        })
        .collect();
    assert_eq!(quads.len(), 2);
    assert_eq!(quads[1].0.x, 200);
    assert_eq!((quads[1].1.width, quads[1].1.height), (200.0, 200.0));

    let fills: Vec<_> = draws
        .iter()
        .filter_map(|d| match d {
            DrawCommand::Fill { area, color } => Some((*area, *color)),
            _ => None,
        })
        .collect();
    assert_eq!(fills.len(), 5);
    assert_eq!(fills[0].1, [1.0, 1.0, 1.0, 1.0]);
    assert!(fills[1..].iter().all(|(_, c)| *c == [1.0, 0.0, 0.0, 1.0]));
    assert!(fills[1..].iter().all(|(a, _)| a.width == 1 || a.height == 1));
}

#[test]
fn commands_reach_the_named_panel() {
    let (mut scene, mut renderer) = build();
    let reply = scene.handle(&mut renderer, Command::parse("interp left bilinear").unwrap());
    assert_eq!(reply, Ok("left: bilinear".to_string()));

    let reply = scene.handle(&mut renderer, Command::parse("interp right bicubic").unwrap());
    assert_eq!(reply, Ok("right: bicubic+lut".to_string()));

    let reply = scene.handle(&mut renderer, Command::parse("range left 0 2").unwrap());
    assert!(reply.is_ok());
    let range = scene.panel("left").unwrap().image().range();
    assert_eq!((range.vmin, range.vmax), (0.0, 2.0));

    let reply = scene.handle(&mut renderer, Command::parse("update nope").unwrap());
    assert_eq!(reply, Err("no panel named `nope`".to_string()));

    assert!(!scene.quit_requested());
    scene.handle(&mut renderer, Command::Quit).unwrap();
    assert!(scene.quit_requested());
}

#[test]
fn click_focuses_and_key_bindings_follow_focus() {
    let (mut scene, mut renderer) = build();
    assert_eq!(scene.click((300.0, 100.0)), Some("right"));
    assert_eq!(scene.focused(), Some("right"));

    scene.toggle_light(&mut renderer);
    assert!(scene.panel("right").unwrap().image().options().lighted);
    assert!(!scene.panel("left").unwrap().image().options().lighted);

    assert_eq!(scene.click((-10.0, -10.0)), None);
    assert_eq!(scene.focused(), None);

    scene.toggle_grid(&mut renderer);
    for panel in scene.panels() {
        assert_eq!(panel.image().options().gridsize, [16.0, 16.0, 8.0]);
    }
}

#[test]
fn colormap_cycle_starts_at_first_name() {
    let (mut scene, mut renderer) = build();
    scene.click((10.0, 10.0));
    assert_eq!(scene.focused(), Some("left"));
    scene.cycle_colormap(&mut renderer);
    let left = scene.panel("left").unwrap().image();
    assert_eq!(left.colormap().unwrap().name(), "ice-and-fire");
    assert!(left.shader_key().unwrap().use_lut);
}

#[test]
fn colormap_cycle_wraps_to_the_first_name() {
    let (mut scene, mut renderer) = build();
    let last = scene.config().colormap_names().last().cloned().unwrap();
    let reply = scene.handle(
        &mut renderer,
        Command::parse(&format!("cmap left {last}")).unwrap(),
    );
    assert!(reply.is_ok(), "{reply:?}");
    assert_eq!(scene.panel("left").unwrap().image().colormap().unwrap().name(), last);

    scene.click((10.0, 10.0));
    scene.cycle_colormap(&mut renderer);
    let left = scene.panel("left").unwrap().image();
    assert_eq!(left.colormap().unwrap().name(), "ice-and-fire");
}

#[test]
fn animated_fields_advance_and_reupload() {
    let (mut scene, mut renderer) = build();
    let texture = scene.panel("right").unwrap().image().texture().id();
    let uploads = renderer.backend().texture(texture).unwrap().uploads;
    assert_eq!(scene.advance(&mut renderer, 0.1).unwrap(), 1);
    assert_eq!(
        renderer.backend().texture(texture).unwrap().uploads,
        uploads + 1
    );
}

#[test]
fn resize_moves_every_panel() {
    let (mut scene, _renderer) = build();
    scene.resize(800.0, 400.0);
    let viewports = scene.viewports().unwrap();
    assert_eq!(viewports[1].1, Viewport { x: 400, y: 0, width: 400, height: 400 });
}

#[test]
fn destroy_releases_gpu_objects() {
    let (mut scene, mut renderer) = build();
    scene.destroy(&mut renderer);
    assert_eq!(renderer.backend().texture_count(), 0);
    assert_eq!(renderer.backend().program_count(), 0);
}
