use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, ensure};
use serde::Deserialize;

pub use scene_model::{
    ColormapConfig, FieldConfig, FormatConfig, FrameConfig, GridConfig, ImageConfig,
    InterpolationConfig, OriginConfig, PanelConfig, ShaderFailureMode, ShellConfig, SideConfig,
    SplitConfig, TracksConfig, WindowConfig,
};

use crate::colormap::{Colormap, parse_hex_rgb, parse_hex_rgba};
use crate::figure::{FigureTree, FrameStyle, GridSpec, NodeId, Side, Tracks};
use crate::gpu::ShaderFailurePolicy;
use crate::image::{ImageOptions, Origin};
use crate::shader::Interpolation;
use crate::texture::TextureFormat;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct SceneConfig {
    pub window: WindowConfig,
    /// Top-level grid the panels are placed on.
    pub layout: GridConfig,
    pub panels: Vec<PanelConfig>,
    /// User colormaps, looked up before the built-in ones.
    pub colormaps: BTreeMap<String, ColormapConfig>,
    pub shell: ShellConfig,
    pub shader_failure: ShaderFailureMode,
}

/// Where a panel ended up in the figure tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelNodes {
    /// Figure carved out of the grid for the panel.
    pub figure: NodeId,
    /// Node the image is drawn into; the frame when one is configured.
    pub content: NodeId,
}

impl SceneConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        self.window.validate("window")?;
        self.layout.validate("layout")?;
        self.shell.validate("shell")?;
        if let Some(bg) = &self.window.background {
            ensure!(
                parse_hex_rgb(bg).is_some(),
                "window.background `{}` is not a #rrggbb color",
                bg
            );
        }

        for (name, map) in &self.colormaps {
            let prefix = format!("colormaps.{name}");
            map.validate(&prefix)?;
            self.build_colormap(name, map)
                .with_context(|| format!("invalid {prefix}"))?;
        }

        ensure!(!self.panels.is_empty(), "panels must list at least one panel");
        let mut names = BTreeSet::new();
        let mut cells = BTreeSet::new();
        for (idx, panel) in self.panels.iter().enumerate() {
            let prefix = format!("panels[{idx}]");
            panel.validate(&prefix, &self.layout)?;
            ensure!(
                names.insert(panel.name.as_str()),
                "{}.name `{}` is used by more than one panel",
                prefix,
                panel.name
            );
            let first_in_cell = cells.insert((panel.cell, panel.span));
            ensure!(
                first_in_cell || panel.split.is_some(),
                "{}.cell is already taken; add a split to share it",
                prefix
            );
            if let Some(name) = &panel.image.colormap {
                ensure!(
                    name.eq_ignore_ascii_case("none") || self.colormap(name).is_some(),
                    "{}.image.colormap `{}` is neither built in nor listed under colormaps",
                    prefix,
                    name
                );
            }
            if let Some(frame) = &panel.frame {
                for color in [&frame.foreground, &frame.background].into_iter().flatten() {
                    ensure!(
                        parse_hex_rgba(color).is_some(),
                        "{}.frame color `{}` is not a #rrggbb color",
                        prefix,
                        color
                    );
                }
            }
        }
        Ok(self)
    }

    fn build_colormap(&self, name: &str, map: &ColormapConfig) -> Result<Colormap> {
        let mut points = Vec::with_capacity(map.points.len());
        for (pos, hex) in &map.points {
            let color = parse_hex_rgb(hex).ok_or_else(|| anyhow!("`{hex}` is not a #rrggbb color"))?;
            points.push((*pos, color));
        }
        let mut colormap =
            Colormap::new(name, points).ok_or_else(|| anyhow!("control points are invalid"))?;
        if let Some(hex) = &map.under {
            let color = parse_hex_rgb(hex).ok_or_else(|| anyhow!("under `{hex}` is not a color"))?;
            colormap = colormap.with_under(color);
        }
        if let Some(hex) = &map.over {
            let color = parse_hex_rgb(hex).ok_or_else(|| anyhow!("over `{hex}` is not a color"))?;
            colormap = colormap.with_over(color);
        }
        Ok(colormap)
    }

    /// Named colormap, user maps first.
    pub fn colormap(&self, name: &str) -> Option<Arc<Colormap>> {
        match self.colormaps.get(name) {
            Some(map) => self.build_colormap(name, map).ok().map(Arc::new),
            None => Colormap::by_name(name).map(Arc::new),
        }
    }

    /// Every colormap a panel may cycle through, user maps first.
    pub fn colormap_names(&self) -> Vec<String> {
        self.colormaps
            .keys()
            .cloned()
            .chain(Colormap::builtin_names().iter().map(|n| n.to_string()))
            .collect()
    }

    pub fn shader_policy(&self) -> ShaderFailurePolicy {
        match self.shader_failure {
            ShaderFailureMode::Abort => ShaderFailurePolicy::Abort,
            ShaderFailureMode::Degrade => ShaderFailurePolicy::Degrade,
        }
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.window
            .background
            .as_deref()
            .and_then(parse_hex_rgba)
            .unwrap_or([0.0, 0.0, 0.0, 1.0])
    }

    pub fn grid_spec(&self) -> GridSpec {
        GridSpec {
            cols: tracks(&self.layout.cols),
            rows: tracks(&self.layout.rows),
            border: f64::from(self.layout.border),
        }
    }

    pub fn image_options(&self, panel: &PanelConfig) -> Result<ImageOptions> {
        let cfg = &panel.image;
        let colormap = match cfg.colormap.as_deref() {
            None => ImageOptions::default().colormap,
            Some(name) if name.eq_ignore_ascii_case("none") => None,
            Some(name) => Some(
                self.colormap(name)
                    .ok_or_else(|| anyhow!("unknown colormap `{name}`"))?,
            ),
        };
        Ok(ImageOptions {
            format: cfg.format.map(texture_format),
            colormap,
            vmin: cfg.vmin,
            vmax: cfg.vmax,
            interpolation: interpolation(cfg.interpolation),
            origin: match cfg.origin {
                OriginConfig::Lower => Origin::Lower,
                OriginConfig::Upper => Origin::Upper,
            },
            lighted: cfg.lighted,
            gridsize: cfg.gridsize,
            gridwidth: cfg.gridwidth,
            elevation: cfg.elevation,
            ..ImageOptions::default()
        })
    }

    /// Places every panel on `tree`, in panel order.
    ///
    /// A panel with a split carves its piece out of the panel that already
    /// occupies the same cell, or out of a fresh cell figure otherwise.
    pub fn place_panels(&self, tree: &mut FigureTree) -> Result<Vec<PanelNodes>> {
        let grid = self.grid_spec();
        let main = tree.main();
        let mut by_cell: BTreeMap<([u32; 2], [u32; 2]), NodeId> = BTreeMap::new();
        let mut placed = Vec::with_capacity(self.panels.len());
        for panel in &self.panels {
            let key = (panel.cell, panel.span);
            let existing = by_cell.get(&key).copied();
            let base = match existing {
                Some(node) => node,
                None => {
                    let node = tree
                        .add_figure(
                            main,
                            &grid,
                            (panel.cell[0] as usize, panel.cell[1] as usize),
                            (panel.span[0] as usize, panel.span[1] as usize),
                        )
                        .with_context(|| format!("placing panel `{}`", panel.name))?;
                    by_cell.insert(key, node);
                    node
                }
            };
            let figure = match &panel.split {
                Some(split) => tree
                    .split(base, side(split.side), f64::from(split.size))
                    .with_context(|| format!("splitting panel `{}`", panel.name))?,
                None => base,
            };
            let content = match &panel.frame {
                Some(frame) => tree.add_frame(
                    figure,
                    [f64::from(frame.size[0]), f64::from(frame.size[1])],
                    Some(f64::from(frame.aspect)),
                    frame_style(frame),
                )?,
                None => figure,
            };
            placed.push(PanelNodes { figure, content });
        }
        Ok(placed)
    }
}

fn tracks(cfg: &TracksConfig) -> Tracks {
    match cfg {
        TracksConfig::Count(n) => Tracks::Count(*n as usize),
        TracksConfig::Fractional(f) => Tracks::Fractional(f64::from(*f)),
        TracksConfig::Weights(w) => Tracks::Weights(w.iter().map(|v| f64::from(*v)).collect()),
    }
}

fn side(cfg: SideConfig) -> Side {
    match cfg {
        SideConfig::Left => Side::Left,
        SideConfig::Right => Side::Right,
        SideConfig::Top => Side::Top,
        SideConfig::Bottom => Side::Bottom,
    }
}

fn interpolation(cfg: InterpolationConfig) -> Interpolation {
    match cfg {
        InterpolationConfig::Nearest => Interpolation::Nearest,
        InterpolationConfig::Bilinear => Interpolation::Bilinear,
        InterpolationConfig::Bicubic => Interpolation::Bicubic,
    }
}

fn texture_format(cfg: FormatConfig) -> TextureFormat {
    match cfg {
        FormatConfig::Alpha => TextureFormat::Alpha,
        FormatConfig::LuminanceAlpha => TextureFormat::LuminanceAlpha,
        FormatConfig::Rgb => TextureFormat::Rgb,
        FormatConfig::Rgba => TextureFormat::Rgba,
    }
}

fn frame_style(cfg: &FrameConfig) -> FrameStyle {
    let defaults = FrameStyle::default();
    FrameStyle {
        foreground: cfg
            .foreground
            .as_deref()
            .and_then(parse_hex_rgba)
            .unwrap_or(defaults.foreground),
        background: cfg
            .background
            .as_deref()
            .and_then(parse_hex_rgba)
            .unwrap_or(defaults.background),
    }
}
