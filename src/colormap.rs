//! Piecewise-linear colormaps and their lookup tables.

use std::str::FromStr;
use std::sync::Arc;

use palette::Srgb;

/// Interior samples in a materialized LUT.
pub const DEFAULT_LUT_SAMPLES: usize = 512;

#[derive(Debug, Clone, PartialEq)]
pub struct Colormap {
    name: String,
    points: Vec<(f32, [f32; 3])>,
    under: Option<[f32; 3]>,
    over: Option<[f32; 3]>,
}

impl Colormap {
    /// Builds a map from control points sorted by position.
    ///
    /// Returns `None` for fewer than two points, positions outside `[0, 1]`
    /// or unsorted positions.
    pub fn new(name: impl Into<String>, points: Vec<(f32, [f32; 3])>) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        if points
            .iter()
            .any(|(pos, _)| !pos.is_finite() || !(0.0..=1.0).contains(pos))
        {
            return None;
        }
        if points.windows(2).any(|pair| pair[0].0 > pair[1].0) {
            return None;
        }
        Some(Self {
            name: name.into(),
            points,
            under: None,
            over: None,
        })
    }

    pub fn with_under(mut self, color: [f32; 3]) -> Self {
        self.under = Some(color);
        self
    }

    pub fn with_over(mut self, color: [f32; 3]) -> Self {
        self.over = Some(color);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[(f32, [f32; 3])] {
        &self.points
    }

    /// Color at `t`, clamped to the first and last control points.
    pub fn sample(&self, t: f32) -> [f32; 3] {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        if !(t > first.0) {
            return first.1;
        }
        if t >= last.0 {
            return last.1;
        }
        for pair in self.points.windows(2) {
            let (p0, c0) = pair[0];
            let (p1, c1) = pair[1];
            if t <= p1 {
                let span = p1 - p0;
                let f = if span > 0.0 { (t - p0) / span } else { 1.0 };
                return [
                    c0[0] + (c1[0] - c0[0]) * f,
                    c0[1] + (c1[1] - c0[1]) * f,
                    c0[2] + (c1[2] - c0[2]) * f,
                ];
            }
        }
        last.1
    }

    /// `[under, samples..., over]`, `samples + 2` RGB entries in total.
    pub fn lut(&self, samples: usize) -> Vec<[f32; 3]> {
        let samples = samples.max(2);
        let last = (samples - 1) as f32;
        let mut table = Vec::with_capacity(samples + 2);
        table.push(self.under.unwrap_or(self.points[0].1));
        table.extend((0..samples).map(|i| self.sample(i as f32 / last)));
        table.push(
            self.over
                .unwrap_or(self.points[self.points.len() - 1].1),
        );
        table
    }

    /// Names of the built-in maps accepted by [`Colormap::by_name`].
    pub fn builtin_names() -> &'static [&'static str] {
        &[
            "ice-and-fire",
            "hot",
            "ice",
            "fire",
            "grey",
            "grey-r",
            "reds",
            "greens",
            "blues",
            "jet",
            "dark-red",
            "dark-green",
            "dark-blue",
            "light-red",
            "light-green",
            "light-blue",
        ]
    }

    /// Built-in map by kebab-case name.
    pub fn by_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase().replace('_', "-");
        let points: Vec<(f32, [f32; 3])> = match name.as_str() {
            "ice-and-fire" | "iceandfire" => return Some(Self::ice_and_fire()),
            "hot" => vec![
                (0.00, [0.0, 0.0, 0.0]),
                (0.33, [1.0, 0.0, 0.0]),
                (0.66, [1.0, 1.0, 0.0]),
                (1.00, [1.0, 1.0, 1.0]),
            ],
            "ice" => vec![
                (0.00, [0.0, 0.0, 1.0]),
                (0.50, [0.5, 0.5, 1.0]),
                (1.00, [1.0, 1.0, 1.0]),
            ],
            "fire" => vec![
                (0.00, [1.0, 1.0, 1.0]),
                (0.50, [1.0, 1.0, 0.0]),
                (1.00, [1.0, 0.0, 0.0]),
            ],
            "grey" | "gray" => vec![(0.0, [0.0, 0.0, 0.0]), (1.0, [1.0, 1.0, 1.0])],
            "grey-r" | "gray-r" => vec![(0.0, [1.0, 1.0, 1.0]), (1.0, [0.0, 0.0, 0.0])],
            "reds" => vec![(0.0, [1.0, 1.0, 1.0]), (1.0, [1.0, 0.0, 0.0])],
            "greens" => vec![(0.0, [1.0, 1.0, 1.0]), (1.0, [0.0, 1.0, 0.0])],
            "blues" => vec![(0.0, [1.0, 1.0, 1.0]), (1.0, [0.0, 0.0, 1.0])],
            "jet" => vec![
                (0.000, [0.0, 0.0, 0.5]),
                (0.110, [0.0, 0.0, 1.0]),
                (0.125, [0.0, 0.0, 1.0]),
                (0.340, [0.0, 1.0, 1.0]),
                (0.375, [0.0, 1.0, 1.0]),
                (0.640, [1.0, 1.0, 0.0]),
                (0.650, [1.0, 1.0, 0.0]),
                (0.890, [1.0, 0.0, 0.0]),
                (0.910, [1.0, 0.0, 0.0]),
                (1.000, [0.5, 0.0, 0.0]),
            ],
            "dark-red" => vec![(0.0, [0.0, 0.0, 0.0]), (1.0, [1.0, 0.0, 0.0])],
            "dark-green" => vec![(0.0, [0.0, 0.0, 0.0]), (1.0, [0.0, 1.0, 0.0])],
            "dark-blue" => vec![(0.0, [0.0, 0.0, 0.0]), (1.0, [0.0, 0.0, 1.0])],
            "light-red" => vec![(0.0, [1.0, 1.0, 1.0]), (1.0, [1.0, 0.0, 0.0])],
            "light-green" => vec![(0.0, [1.0, 1.0, 1.0]), (1.0, [0.0, 1.0, 0.0])],
            "light-blue" => vec![(0.0, [1.0, 1.0, 1.0]), (1.0, [0.0, 0.0, 1.0])],
            _ => return None,
        };
        Self::new(name, points)
    }

    pub fn ice_and_fire() -> Self {
        Self {
            name: "ice-and-fire".to_string(),
            points: vec![
                (0.00, [0.0, 0.0, 1.0]),
                (0.25, [0.0, 0.5, 1.0]),
                (0.50, [1.0, 1.0, 1.0]),
                (0.75, [1.0, 1.0, 0.0]),
                (1.00, [1.0, 0.0, 0.0]),
            ],
            under: None,
            over: None,
        }
    }

    /// Shared handle to the default map.
    pub fn default_shared() -> Arc<Self> {
        Arc::new(Self::ice_and_fire())
    }
}

/// Parses `#rrggbb` into sRGB components in `[0, 1]`.
pub fn parse_hex_rgb(input: &str) -> Option<[f32; 3]> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let rgb = Srgb::<u8>::from_str(trimmed).ok()?;
    let rgb: Srgb<f32> = rgb.into_format();
    Some([rgb.red, rgb.green, rgb.blue])
}

/// Parses `#rrggbb` into opaque RGBA, still sRGB encoded.
///
/// Surfaces are configured without the sRGB suffix, so these values reach
/// the framebuffer unchanged.
pub fn parse_hex_rgba(input: &str) -> Option<[f32; 4]> {
    let [r, g, b] = parse_hex_rgb(input)?;
    Some([r, g, b, 1.0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lut_brackets_samples_with_under_and_over() {
        let map = Colormap::by_name("grey")
            .unwrap()
            .with_under([0.0, 0.0, 1.0])
            .with_over([1.0, 0.0, 0.0]);
        let lut = map.lut(5);
        assert_eq!(lut.len(), 7);
        assert_eq!(lut[0], [0.0, 0.0, 1.0]);
        assert_eq!(lut[1], [0.0, 0.0, 0.0]);
        assert_eq!(lut[3], [0.5, 0.5, 0.5]);
        assert_eq!(lut[5], [1.0, 1.0, 1.0]);
        assert_eq!(lut[6], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn every_builtin_resolves() {
        for name in Colormap::builtin_names() {
            assert!(Colormap::by_name(name).is_some(), "{name}");
        }
        assert!(Colormap::by_name("viridis").is_none());
    }

    #[test]
    fn unsorted_points_are_rejected() {
        let points = vec![(0.8, [0.0; 3]), (0.2, [1.0; 3])];
        assert!(Colormap::new("bad", points).is_none());
    }

    #[test]
    fn hex_colors_parse() {
        assert_eq!(parse_hex_rgb("#ff0000"), Some([1.0, 0.0, 0.0]));
        assert_eq!(parse_hex_rgb("nope"), None);
        assert_eq!(parse_hex_rgba("#00ff00"), Some([0.0, 1.0, 0.0, 1.0]));
    }

    #[test]
    fn documented_maps_are_builtin() {
        let listed = [
            "grey",
            "grey-r",
            "hot",
            "fire",
            "ice",
            "ice-and-fire",
            "reds",
            "greens",
            "blues",
            "jet",
        ];
        for name in listed {
            assert!(Colormap::builtin_names().contains(&name), "{name} not listed");
            assert_eq!(Colormap::by_name(name).map(|m| m.name().to_string()), Some(name.to_string()));
        }
    }

    #[test]
    fn jet_runs_from_dark_blue_to_dark_red() {
        let jet = Colormap::by_name("jet").unwrap();
        assert_eq!(jet.sample(0.0), [0.0, 0.0, 0.5]);
        let mid = jet.sample(0.5);
        let f = (0.5 - 0.375) / (0.64 - 0.375);
        assert!((mid[0] - f).abs() < 1e-6 && mid[1] == 1.0 && (mid[2] - (1.0 - f)).abs() < 1e-6);
        assert_eq!(jet.sample(1.0), [0.5, 0.0, 0.0]);
        assert_eq!(Colormap::by_name("reds").unwrap().sample(0.0), [1.0, 1.0, 1.0]);
    }
}
