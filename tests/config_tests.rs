use std::io::Write;
use std::time::Duration;

use fieldview::config::{FieldConfig, SceneConfig, ShaderFailureMode};
use fieldview::figure::FigureTree;
use fieldview::gpu::ShaderFailurePolicy;
use fieldview::image::Origin;
use fieldview::shader::Interpolation;
use fieldview::texture::TextureFormat;

fn parse(yaml: &str) -> SceneConfig {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn parse_kebab_case_scene() {
    let cfg = parse(
        r##"
window:
  width: 640
  height: 480
  title: demo
  background: "#102030"
  redraw-interval: 25ms
layout:
  cols: [1.0, 2.0]
  rows: 1
  border: 0.01
shader-failure: degrade
shell:
  enabled: false
  queue-capacity: 4
panels:
  - name: left
    field:
      kind: gaussian
      width: 32
      height: 16
      sigma: 0.5
    image:
      colormap: hot
      interpolation: bicubic
      origin: upper
      vmin: -1.0
  - name: right
    cell: [1, 0]
    field:
      kind: color-wheel
      size: 8
    image:
      format: rgb
"##,
    )
    .validated()
    .unwrap();

    assert_eq!(cfg.window.title, "demo");
    assert_eq!(cfg.window.redraw_interval, Duration::from_millis(25));
    assert!(!cfg.shell.enabled);
    assert_eq!(cfg.shell.queue_capacity, 4);
    assert_eq!(cfg.shader_failure, ShaderFailureMode::Degrade);
    assert_eq!(cfg.shader_policy(), ShaderFailurePolicy::Degrade);
    assert_eq!(
        cfg.panels[0].field,
        FieldConfig::Gaussian {
            width: 32,
            height: 16,
            sigma: 0.5
        }
    );

    let left = cfg.image_options(&cfg.panels[0]).unwrap();
    assert_eq!(left.colormap.as_ref().unwrap().name(), "hot");
    assert_eq!(left.interpolation, Interpolation::Bicubic);
    assert_eq!(left.origin, Origin::Upper);
    assert_eq!(left.vmin, Some(-1.0));
    assert_eq!(left.vmax, None);

    let right = cfg.image_options(&cfg.panels[1]).unwrap();
    assert_eq!(right.format, Some(TextureFormat::Rgb));

    let clear = cfg.clear_color();
    assert!((clear[0] - 16.0 / 255.0).abs() < 1e-6);
    assert_eq!(clear[3], 1.0);
}

#[test]
fn defaults_fill_a_minimal_scene() {
    let cfg = parse("panels:\n  - name: only\n").validated().unwrap();
    assert_eq!((cfg.window.width, cfg.window.height), (1024, 768));
    assert!(cfg.shell.enabled);
    assert_eq!(cfg.shader_policy(), ShaderFailurePolicy::Abort);
    assert_eq!(cfg.clear_color(), [0.0, 0.0, 0.0, 1.0]);
    let options = cfg.image_options(&cfg.panels[0]).unwrap();
    assert!(options.colormap.is_some());
    assert_eq!(options.interpolation, Interpolation::Nearest);
}

#[test]
fn user_colormaps_shadow_builtins() {
    let cfg = parse(
        r##"
colormaps:
  hot:
    points: [[0.0, "#000000"], [1.0, "#00ff00"]]
  sea:
    points: [[0.0, "#000033"], [0.5, "#0000ff"], [1.0, "#ffffff"]]
    over: "#ff0000"
panels:
  - name: p
    image:
      colormap: sea
"##,
    )
    .validated()
    .unwrap();
    let hot = cfg.colormap("hot").unwrap();
    assert_eq!(hot.sample(1.0), [0.0, 1.0, 0.0]);
    let names = cfg.colormap_names();
    assert_eq!(&names[..2], &["hot".to_string(), "sea".to_string()]);
    assert!(names.contains(&"ice-and-fire".to_string()));
    assert_eq!(cfg.colormap("sea").unwrap().lut(4).last(), Some(&[1.0, 0.0, 0.0]));
}

#[test]
fn none_colormap_disables_the_lut() {
    let cfg = parse("panels:\n  - name: p\n    image:\n      colormap: none\n")
        .validated()
        .unwrap();
    assert!(cfg.image_options(&cfg.panels[0]).unwrap().colormap.is_none());
}

#[test]
fn invalid_scenes_are_rejected() {
    let cases = [
        ("panels: []\n", "at least one panel"),
        (
            "panels:\n  - name: a\n  - name: a\n    cell: [0, 0]\n    split: {side: right, size: 0.5}\n",
            "more than one panel",
        ),
        (
            "panels:\n  - name: a\n    image:\n      colormap: nope\n",
            "neither built in",
        ),
        (
            "window:\n  background: blue\npanels:\n  - name: a\n",
            "not a #rrggbb",
        ),
        (
            "panels:\n  - name: a\n    frame:\n      foreground: \"#12\"\n",
            "not a #rrggbb",
        ),
        (
            "colormaps:\n  bad:\n    points: [[0.0, \"#000000\"]]\npanels:\n  - name: a\n",
            "at least two",
        ),
        (
            "layout:\n  cols: 2\npanels:\n  - name: a\n    cell: [2, 0]\n",
            "falls outside",
        ),
    ];
    for (yaml, needle) in cases {
        let err = parse(yaml).validated().unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains(needle), "{yaml}: {chain}");
    }
}

#[test]
fn split_carves_from_the_panel_on_the_same_cell() {
    let cfg = parse(
        r#"
layout:
  cols: 2
panels:
  - name: big
  - name: strip
    split: {side: right, size: 0.25}
  - name: other
    cell: [1, 0]
"#,
    )
    .validated()
    .unwrap();
    let mut tree = FigureTree::new(800.0, 200.0);
    let placed = cfg.place_panels(&mut tree).unwrap();
    let big = tree.viewport(placed[0].content).unwrap();
    let strip = tree.viewport(placed[1].content).unwrap();
    let other = tree.viewport(placed[2].content).unwrap();
    assert_eq!((big.x, big.width), (0, 300));
    assert_eq!((strip.x, strip.width), (300, 100));
    assert_eq!((other.x, other.width), (400, 400));
}

#[test]
fn load_scene_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "window:\n  width: 320\n  height: 200\npanels:\n  - name: file\n    field:\n      kind: noise\n      seed: 3\n"
    )
    .unwrap();
    let cfg = SceneConfig::from_yaml_file(file.path())
        .unwrap()
        .validated()
        .unwrap();
    assert_eq!(cfg.window.width, 320);
    assert_eq!(
        cfg.panels[0].field,
        FieldConfig::Noise {
            width: 256,
            height: 256,
            seed: Some(3)
        }
    );
}

#[test]
fn missing_file_is_an_error() {
    assert!(SceneConfig::from_yaml_file("/definitely/not/a/scene.yaml").is_err());
}
