use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, ensure};
use serde::Deserialize;

pub use field::FieldConfig;
pub use image::{FormatConfig, ImageConfig, InterpolationConfig, OriginConfig};
pub use layout::{FrameConfig, GridConfig, SideConfig, SplitConfig, TracksConfig};

mod layout {
    use super::*;

    /// Track specification for one axis of a grid.
    ///
    /// `2` means two equal tracks, `2.5` means two full tracks plus a half
    /// track, and a list gives explicit relative weights.
    #[derive(Debug, Clone, Deserialize, PartialEq)]
    #[serde(untagged)]
    pub enum TracksConfig {
        Count(u32),
        Fractional(f32),
        Weights(Vec<f32>),
    }

    impl Default for TracksConfig {
        fn default() -> Self {
            Self::Count(1)
        }
    }

    impl TracksConfig {
        /// Number of addressable tracks (a fractional remainder counts as one).
        pub fn len(&self) -> usize {
            match self {
                Self::Count(n) => *n as usize,
                Self::Fractional(f) => {
                    let whole = f.trunc();
                    whole as usize + usize::from(*f - whole > 0.0)
                }
                Self::Weights(w) => w.len(),
            }
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        pub fn validate(&self, prefix: &str) -> Result<()> {
            match self {
                Self::Count(n) => ensure!(*n > 0, "{} must be at least 1", prefix),
                Self::Fractional(f) => {
                    ensure!(f.is_finite() && *f > 0.0, "{} must be positive", prefix)
                }
                Self::Weights(w) => {
                    ensure!(!w.is_empty(), "{} must list at least one weight", prefix);
                    ensure!(
                        w.iter().all(|v| v.is_finite() && *v >= 0.0),
                        "{} weights must be non-negative",
                        prefix
                    );
                    ensure!(
                        w.iter().sum::<f32>() > 0.0,
                        "{} weights must not all be zero",
                        prefix
                    );
                }
            }
            Ok(())
        }
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "kebab-case", default)]
    pub struct GridConfig {
        pub cols: TracksConfig,
        pub rows: TracksConfig,
        /// Fraction of the parent extent reserved on each side of every cell.
        pub border: f32,
    }

    impl Default for GridConfig {
        fn default() -> Self {
            Self {
                cols: TracksConfig::default(),
                rows: TracksConfig::default(),
                border: 0.0,
            }
        }
    }

    impl GridConfig {
        pub fn validate(&self, prefix: &str) -> Result<()> {
            self.cols.validate(&format!("{prefix}.cols"))?;
            self.rows.validate(&format!("{prefix}.rows"))?;
            ensure!(
                self.border.is_finite() && self.border >= 0.0,
                "{}.border must be non-negative",
                prefix
            );
            let widest = self.cols.len().max(self.rows.len()) as f32;
            ensure!(
                2.0 * widest * self.border < 1.0,
                "{}.border leaves no room for cells",
                prefix
            );
            Ok(())
        }
    }

    #[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "kebab-case")]
    pub enum SideConfig {
        Left,
        Right,
        Top,
        Bottom,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub struct SplitConfig {
        pub side: SideConfig,
        pub size: f32,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "kebab-case", default)]
    pub struct FrameConfig {
        pub size: [f32; 2],
        pub aspect: f32,
        pub foreground: Option<String>,
        pub background: Option<String>,
    }

    impl Default for FrameConfig {
        fn default() -> Self {
            Self {
                size: [1.0, 1.0],
                aspect: 1.0,
                foreground: None,
                background: None,
            }
        }
    }

    impl FrameConfig {
        pub fn validate(&self, prefix: &str) -> Result<()> {
            ensure!(
                self.aspect.is_finite() && self.aspect > 0.0,
                "{}.aspect must be positive",
                prefix
            );
            ensure!(
                self.size.iter().all(|v| v.is_finite() && *v > 0.0 && *v <= 1.0),
                "{}.size must be within (0, 1]",
                prefix
            );
            for (field, value) in [
                ("foreground", &self.foreground),
                ("background", &self.background),
            ] {
                if let Some(color) = value {
                    ensure!(
                        !color.trim().is_empty(),
                        "{}.{} must not be blank when provided",
                        prefix,
                        field
                    );
                }
            }
            Ok(())
        }
    }
}

mod image {
    use super::*;

    #[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
    #[serde(rename_all = "kebab-case")]
    pub enum InterpolationConfig {
        #[default]
        Nearest,
        Bilinear,
        Bicubic,
    }

    #[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
    #[serde(rename_all = "kebab-case")]
    pub enum OriginConfig {
        #[default]
        Lower,
        Upper,
    }

    #[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "kebab-case")]
    pub enum FormatConfig {
        Alpha,
        LuminanceAlpha,
        Rgb,
        Rgba,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "kebab-case", default)]
    pub struct ImageConfig {
        /// Colormap name; `none` disables colormapping, absent picks the default map.
        pub colormap: Option<String>,
        pub vmin: Option<f32>,
        pub vmax: Option<f32>,
        pub interpolation: InterpolationConfig,
        pub origin: OriginConfig,
        pub format: Option<FormatConfig>,
        pub lighted: bool,
        pub gridsize: [f32; 3],
        pub gridwidth: [f32; 3],
        pub elevation: f32,
    }

    impl Default for ImageConfig {
        fn default() -> Self {
            Self {
                colormap: None,
                vmin: None,
                vmax: None,
                interpolation: InterpolationConfig::default(),
                origin: OriginConfig::default(),
                format: None,
                lighted: false,
                gridsize: [0.0; 3],
                gridwidth: [1.0; 3],
                elevation: 0.0,
            }
        }
    }

    impl ImageConfig {
        pub fn validate(&self, prefix: &str) -> Result<()> {
            if let (Some(lo), Some(hi)) = (self.vmin, self.vmax) {
                ensure!(
                    lo.is_finite() && hi.is_finite() && lo < hi,
                    "{}.vmin must be below {}.vmax",
                    prefix,
                    prefix
                );
            }
            ensure!(
                self.gridsize.iter().all(|v| v.is_finite() && *v >= 0.0),
                "{}.gridsize must be non-negative",
                prefix
            );
            ensure!(
                self.gridwidth.iter().all(|v| v.is_finite() && *v > 0.0),
                "{}.gridwidth must be positive",
                prefix
            );
            ensure!(
                self.elevation.is_finite(),
                "{}.elevation must be finite",
                prefix
            );
            if let Some(name) = &self.colormap {
                ensure!(
                    !name.trim().is_empty(),
                    "{}.colormap must not be blank when provided",
                    prefix
                );
            }
            Ok(())
        }
    }
}

mod field {
    use super::*;

    const fn default_extent() -> usize {
        256
    }

    const fn default_sigma() -> f32 {
        0.25
    }

    const fn default_cells() -> usize {
        8
    }

    const fn default_speed() -> f32 {
        1.0
    }

    const fn default_density() -> f32 {
        0.2
    }

    /// Data source feeding one panel.
    #[derive(Debug, Clone, Deserialize, PartialEq)]
    #[serde(tag = "kind", rename_all = "kebab-case")]
    pub enum FieldConfig {
        #[serde(rename_all = "kebab-case")]
        Sombrero {
            #[serde(default = "default_extent")]
            width: usize,
            #[serde(default = "default_extent")]
            height: usize,
        },
        #[serde(rename_all = "kebab-case")]
        Gaussian {
            #[serde(default = "default_extent")]
            width: usize,
            #[serde(default = "default_extent")]
            height: usize,
            #[serde(default = "default_sigma")]
            sigma: f32,
        },
        #[serde(rename_all = "kebab-case")]
        Checkerboard {
            #[serde(default = "default_extent")]
            width: usize,
            #[serde(default = "default_extent")]
            height: usize,
            #[serde(default = "default_cells")]
            cells: usize,
        },
        #[serde(rename_all = "kebab-case")]
        Ripple {
            #[serde(default = "default_extent")]
            width: usize,
            #[serde(default = "default_extent")]
            height: usize,
            #[serde(default = "default_speed")]
            speed: f32,
        },
        #[serde(rename_all = "kebab-case")]
        Gradient {
            #[serde(default = "default_extent")]
            width: usize,
            #[serde(default = "default_extent")]
            height: usize,
        },
        #[serde(rename_all = "kebab-case")]
        Noise {
            #[serde(default = "default_extent")]
            width: usize,
            #[serde(default = "default_extent")]
            height: usize,
            #[serde(default)]
            seed: Option<u64>,
        },
        #[serde(rename_all = "kebab-case")]
        GameOfLife {
            #[serde(default = "default_extent")]
            width: usize,
            #[serde(default = "default_extent")]
            height: usize,
            #[serde(default)]
            seed: Option<u64>,
            #[serde(default = "default_density")]
            density: f32,
        },
        #[serde(rename_all = "kebab-case")]
        ColorWheel {
            #[serde(default = "default_extent")]
            size: usize,
        },
        #[serde(rename_all = "kebab-case")]
        Image {
            path: PathBuf,
            #[serde(default)]
            color: bool,
        },
    }

    impl Default for FieldConfig {
        fn default() -> Self {
            Self::Sombrero {
                width: default_extent(),
                height: default_extent(),
            }
        }
    }

    impl FieldConfig {
        pub fn validate(&self, prefix: &str) -> Result<()> {
            match self {
                Self::Sombrero { width, height }
                | Self::Gradient { width, height }
                | Self::Noise { width, height, .. } => {
                    ensure_extent(prefix, *width, *height)?;
                }
                Self::Gaussian {
                    width,
                    height,
                    sigma,
                } => {
                    ensure_extent(prefix, *width, *height)?;
                    ensure!(
                        sigma.is_finite() && *sigma > 0.0,
                        "{}.sigma must be positive",
                        prefix
                    );
                }
                Self::Checkerboard {
                    width,
                    height,
                    cells,
                } => {
                    ensure_extent(prefix, *width, *height)?;
                    ensure!(*cells > 0, "{}.cells must be at least 1", prefix);
                }
                Self::Ripple {
                    width,
                    height,
                    speed,
                } => {
                    ensure_extent(prefix, *width, *height)?;
                    ensure!(speed.is_finite(), "{}.speed must be finite", prefix);
                }
                Self::GameOfLife {
                    width,
                    height,
                    density,
                    ..
                } => {
                    ensure_extent(prefix, *width, *height)?;
                    ensure!(
                        (0.0..=1.0).contains(density),
                        "{}.density must be within [0, 1]",
                        prefix
                    );
                }
                Self::ColorWheel { size } => {
                    ensure!(*size > 1, "{}.size must be at least 2", prefix);
                }
                Self::Image { path, .. } => {
                    ensure!(
                        !path.as_os_str().is_empty(),
                        "{}.path must not be empty",
                        prefix
                    );
                }
            }
            Ok(())
        }

        /// Whether the source changes over time.
        pub fn is_animated(&self) -> bool {
            matches!(self, Self::Ripple { .. } | Self::GameOfLife { .. })
        }
    }

    fn ensure_extent(prefix: &str, width: usize, height: usize) -> Result<()> {
        ensure!(
            width > 0 && height > 0,
            "{}.width and {}.height must be positive",
            prefix,
            prefix
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub background: Option<String>,
    #[serde(with = "humantime_serde")]
    pub redraw_interval: Duration,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            title: "fieldview".to_string(),
            background: None,
            redraw_interval: Duration::from_millis(16),
        }
    }
}

impl WindowConfig {
    pub fn validate(&self, prefix: &str) -> Result<()> {
        ensure!(
            self.width > 0 && self.height > 0,
            "{}.width and {}.height must be positive",
            prefix,
            prefix
        );
        ensure!(
            !self.redraw_interval.is_zero(),
            "{}.redraw-interval must be greater than zero",
            prefix
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PanelConfig {
    pub name: String,
    pub cell: [u32; 2],
    pub span: [u32; 2],
    pub split: Option<SplitConfig>,
    pub frame: Option<FrameConfig>,
    pub field: FieldConfig,
    pub image: ImageConfig,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            cell: [0, 0],
            span: [1, 1],
            split: None,
            frame: None,
            field: FieldConfig::default(),
            image: ImageConfig::default(),
        }
    }
}

impl PanelConfig {
    pub fn validate(&self, prefix: &str, grid: &GridConfig) -> Result<()> {
        ensure!(
            !self.name.trim().is_empty(),
            "{}.name must not be blank",
            prefix
        );
        ensure!(
            self.span[0] > 0 && self.span[1] > 0,
            "{}.span must be at least 1x1",
            prefix
        );
        let [col, row] = self.cell;
        let [w, h] = self.span;
        ensure!(
            (col + w) as usize <= grid.cols.len() && (row + h) as usize <= grid.rows.len(),
            "{}.cell [{}, {}] with span [{}, {}] falls outside the {}x{} grid",
            prefix,
            col,
            row,
            w,
            h,
            grid.cols.len(),
            grid.rows.len()
        );
        if let Some(split) = &self.split {
            ensure!(
                split.size.is_finite() && split.size > 0.0 && split.size < 1.0,
                "{}.split.size must be within (0, 1)",
                prefix
            );
        }
        if let Some(frame) = &self.frame {
            frame.validate(&format!("{prefix}.frame"))?;
        }
        self.field.validate(&format!("{prefix}.field"))?;
        self.image.validate(&format!("{prefix}.image"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct ColormapConfig {
    /// `[position, "#rrggbb"]` control points.
    pub points: Vec<(f32, String)>,
    pub under: Option<String>,
    pub over: Option<String>,
}

impl ColormapConfig {
    pub fn validate(&self, prefix: &str) -> Result<()> {
        ensure!(
            self.points.len() >= 2,
            "{}.points needs at least two control points",
            prefix
        );
        ensure!(
            self.points
                .iter()
                .all(|(pos, _)| pos.is_finite() && (0.0..=1.0).contains(pos)),
            "{}.points positions must be within [0, 1]",
            prefix
        );
        ensure!(
            self.points.windows(2).all(|pair| pair[0].0 <= pair[1].0),
            "{}.points must be sorted by position",
            prefix
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ShellConfig {
    pub enabled: bool,
    pub queue_capacity: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_capacity: 32,
        }
    }
}

impl ShellConfig {
    pub fn validate(&self, prefix: &str) -> Result<()> {
        ensure!(
            self.queue_capacity > 0,
            "{}.queue-capacity must be at least 1",
            prefix
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ShaderFailureMode {
    #[default]
    Abort,
    Degrade,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_accept_counts_fractions_and_weights() {
        let count: TracksConfig = serde_yaml::from_str("3").unwrap();
        assert_eq!(count, TracksConfig::Count(3));
        assert_eq!(count.len(), 3);

        let frac: TracksConfig = serde_yaml::from_str("2.5").unwrap();
        assert_eq!(frac, TracksConfig::Fractional(2.5));
        assert_eq!(frac.len(), 3);

        let weights: TracksConfig = serde_yaml::from_str("[1.0, 2.0]").unwrap();
        assert_eq!(weights.len(), 2);
    }

    #[test]
    fn panel_outside_grid_is_rejected() {
        let grid: GridConfig = serde_yaml::from_str("cols: 2\nrows: 1\n").unwrap();
        let panel: PanelConfig = serde_yaml::from_str(
            r#"
name: left
cell: [1, 0]
span: [2, 1]
"#,
        )
        .unwrap();
        let err = panel.validate("panels[0]", &grid).unwrap_err();
        assert!(err.to_string().contains("falls outside"));
    }

    #[test]
    fn field_kinds_parse_with_defaults() {
        let field: FieldConfig = serde_yaml::from_str("kind: gaussian\nwidth: 64\n").unwrap();
        assert_eq!(
            field,
            FieldConfig::Gaussian {
                width: 64,
                height: 256,
                sigma: 0.25
            }
        );
        assert!(!field.is_animated());

        let life: FieldConfig = serde_yaml::from_str("kind: game-of-life\nseed: 7\n").unwrap();
        assert!(life.is_animated());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let image: ImageConfig = serde_yaml::from_str("vmin: 2.0\nvmax: 1.0\n").unwrap();
        assert!(image.validate("image").is_err());
    }

    #[test]
    fn window_interval_parses_humantime() {
        let window: WindowConfig = serde_yaml::from_str("redraw-interval: 40ms\n").unwrap();
        assert_eq!(window.redraw_interval, Duration::from_millis(40));
        assert_eq!(window.width, 1024);
    }
}
