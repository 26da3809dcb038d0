//! Panels laid out on a figure tree, independent of the window system.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::command::{Command, Reply};
use crate::config::{PanelNodes, SceneConfig};
use crate::fields::FieldSource;
use crate::figure::{FigureTree, FrameStyle, NodeKind, Viewport};
use crate::gpu::{Backend, Renderer};
use crate::image::{ConfigDelta, Image};

pub struct Panel {
    name: String,
    nodes: PanelNodes,
    field: FieldSource,
    image: Image,
}

impl Panel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> PanelNodes {
        self.nodes
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn field(&self) -> &FieldSource {
        &self.field
    }
}

pub struct Scene {
    config: SceneConfig,
    tree: FigureTree,
    panels: Vec<Panel>,
    colormaps: Vec<String>,
    focus: Option<usize>,
    quit: bool,
}

impl Scene {
    /// Places the panels for a `width x height` window and uploads their data.
    pub fn build<B: Backend>(
        config: SceneConfig,
        renderer: &mut Renderer<B>,
        width: f64,
        height: f64,
    ) -> Result<Self> {
        renderer.set_policy(config.shader_policy());
        let mut tree = FigureTree::new(width, height);
        let placed = config.place_panels(&mut tree)?;
        let mut panels = Vec::with_capacity(placed.len());
        for (panel, nodes) in config.panels.iter().zip(placed) {
            let field = FieldSource::from_config(&panel.field)
                .with_context(|| format!("failed to build field for panel `{}`", panel.name))?;
            let options = config.image_options(panel)?;
            let image = Image::create(renderer, &panel.name, field.array(), options)
                .with_context(|| format!("failed to create image for panel `{}`", panel.name))?;
            debug!(panel = %panel.name, format = %image.format(), "panel ready");
            panels.push(Panel {
                name: panel.name.clone(),
                nodes,
                field,
                image,
            });
        }
        let colormaps = config.colormap_names();
        Ok(Self {
            config,
            tree,
            panels,
            colormaps,
            focus: None,
            quit: false,
        })
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn tree(&self) -> &FigureTree {
        &self.tree
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn panel(&self, name: &str) -> Option<&Panel> {
        self.panels.iter().find(|p| p.name == name)
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    pub fn is_animated(&self) -> bool {
        self.panels.iter().any(|p| p.field.is_animated())
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.tree.resize(width, height);
    }

    /// Content viewport of every panel, in panel order.
    pub fn viewports(&self) -> Result<Vec<(&str, Viewport)>> {
        let mut out = Vec::with_capacity(self.panels.len());
        for panel in &self.panels {
            out.push((panel.name.as_str(), self.tree.viewport(panel.nodes.content)?));
        }
        Ok(out)
    }

    /// Advances animated fields by `dt` seconds and re-uploads what changed.
    pub fn advance<B: Backend>(&mut self, renderer: &mut Renderer<B>, dt: f32) -> Result<usize> {
        let mut updated = 0;
        for panel in &mut self.panels {
            if panel.field.advance(dt) {
                panel.image.update(renderer)?;
                updated += 1;
            }
        }
        Ok(updated)
    }

    pub fn draw<B: Backend>(&mut self, renderer: &mut Renderer<B>) -> Result<()> {
        renderer.backend_mut().clear(self.config.clear_color());
        for panel in &mut self.panels {
            let content = panel.nodes.content;
            let viewport = self.tree.viewport(content)?;
            let style = match self.tree.kind(content)? {
                NodeKind::Frame { style, .. } => Some(style),
                _ => None,
            };
            if let Some(style) = style {
                renderer.backend_mut().fill_rect(viewport, style.background);
            }
            renderer.backend_mut().set_viewport(viewport);
            let (w, h) = (viewport.width as f32, viewport.height as f32);
            panel.image.blit(renderer, 0.0, 0.0, w, h)?;
            if let Some(style) = style {
                draw_border(renderer.backend_mut(), viewport, style);
            }
        }
        Ok(())
    }

    /// Handles one queued command on the render thread.
    pub fn handle<B: Backend>(&mut self, renderer: &mut Renderer<B>, command: Command) -> Reply {
        match command {
            Command::Quit => {
                self.quit = true;
                Ok("quitting".to_string())
            }
            Command::Redraw => Ok("redraw scheduled".to_string()),
            Command::Update { panel } => {
                let image = self.image_mut(&panel)?;
                let transfer = image.update(renderer).map_err(|e| e.to_string())?;
                Ok(format!(
                    "{panel}: bias {:.4} scale {:.4}",
                    transfer.bias, transfer.scale
                ))
            }
            Command::SetRange { panel, vmin, vmax } => {
                let delta = ConfigDelta {
                    vmin: Some(vmin),
                    vmax: Some(vmax),
                    ..Default::default()
                };
                self.configure(renderer, &panel, delta)
            }
            Command::Configure { panel, delta } => self.configure(renderer, &panel, delta),
        }
    }

    fn image_mut(&mut self, name: &str) -> Result<&mut Image, String> {
        self.panels
            .iter_mut()
            .find(|p| p.name == name)
            .map(|p| &mut p.image)
            .ok_or_else(|| format!("no panel named `{name}`"))
    }

    fn configure<B: Backend>(
        &mut self,
        renderer: &mut Renderer<B>,
        panel: &str,
        delta: ConfigDelta,
    ) -> Reply {
        let image = self.image_mut(panel)?;
        let outcome = image.configure(renderer, delta).map_err(|e| e.to_string())?;
        if outcome.needs_update {
            image.update(renderer).map_err(|e| e.to_string())?;
        }
        let program = image
            .shader_key()
            .map_or_else(|| "plain".to_string(), |key| key.label());
        Ok(format!("{panel}: {program}"))
    }

    /// Focuses the panel under a window point, origin bottom left.
    pub fn click(&mut self, point: (f64, f64)) -> Option<&str> {
        let mut current = self.tree.node_at(point);
        while let Some(id) = current {
            if let Some(idx) = self
                .panels
                .iter()
                .position(|p| p.nodes.content == id || p.nodes.figure == id)
            {
                self.focus = Some(idx);
                let name = self.panels[idx].name.as_str();
                info!(panel = name, x = point.0, y = point.1, "panel selected");
                return Some(name);
            }
            current = self.tree.parent(id).ok().flatten();
        }
        self.focus = None;
        None
    }

    pub fn focused(&self) -> Option<&str> {
        self.focus.map(|idx| self.panels[idx].name.as_str())
    }

    /// Applies `delta_for` to the focused panel, or to every panel without focus.
    fn for_targets<B: Backend>(
        &mut self,
        renderer: &mut Renderer<B>,
        delta_for: impl Fn(&Image, &[String]) -> ConfigDelta,
    ) {
        let targets: Vec<usize> = match self.focus {
            Some(idx) => vec![idx],
            None => (0..self.panels.len()).collect(),
        };
        for idx in targets {
            let delta = delta_for(&self.panels[idx].image, &self.colormaps);
            let name = self.panels[idx].name.clone();
            if let Err(err) = self.configure(renderer, &name, delta) {
                warn!(panel = %name, error = %err, "key binding failed");
            }
        }
    }

    pub fn cycle_interpolation<B: Backend>(&mut self, renderer: &mut Renderer<B>) {
        self.for_targets(renderer, |image, _| ConfigDelta {
            interpolation: Some(image.interpolation().cycle()),
            ..Default::default()
        });
    }

    pub fn toggle_grid<B: Backend>(&mut self, renderer: &mut Renderer<B>) {
        self.for_targets(renderer, |image, _| {
            let on = image.options().gridsize.iter().any(|v| *v != 0.0);
            ConfigDelta {
                gridsize: Some(if on { [0.0; 3] } else { [16.0, 16.0, 8.0] }),
                ..Default::default()
            }
        });
    }

    pub fn toggle_light<B: Backend>(&mut self, renderer: &mut Renderer<B>) {
        self.for_targets(renderer, |image, _| ConfigDelta {
            lighted: Some(!image.options().lighted),
            ..Default::default()
        });
    }

    /// Steps to the next colormap name, wrapping from the last to the first.
    /// A panel without a colormap starts at the first name.
    pub fn cycle_colormap<B: Backend>(&mut self, renderer: &mut Renderer<B>) {
        let config = self.config.clone();
        self.for_targets(renderer, move |image, names| {
            let current = image.colormap().map(|c| c.name().to_string());
            let next = match current.and_then(|n| names.iter().position(|m| *m == n)) {
                Some(idx) => names.get((idx + 1) % names.len()),
                None => names.first(),
            };
            ConfigDelta {
                colormap: Some(next.and_then(|name| config.colormap(name))),
                ..Default::default()
            }
        });
    }

    pub fn destroy<B: Backend>(&mut self, renderer: &mut Renderer<B>) {
        for panel in &mut self.panels {
            panel.image.destroy(renderer);
        }
    }
}

/// One-pixel outline just inside `area`.
fn draw_border<B: Backend>(backend: &mut B, area: Viewport, style: FrameStyle) {
    if area.is_empty() {
        return;
    }
    let color = style.foreground;
    let top = area.y + area.height as i32 - 1;
    let right = area.x + area.width as i32 - 1;
    let horizontal = |y| Viewport {
        x: area.x,
        y,
        width: area.width,
        height: 1,
    };
    let vertical = |x| Viewport {
        x,
        y: area.y,
        width: 1,
        height: area.height,
    };
    backend.fill_rect(horizontal(area.y), color);
    backend.fill_rect(horizontal(top), color);
    backend.fill_rect(vertical(area.x), color);
    backend.fill_rect(vertical(right), color);
}
