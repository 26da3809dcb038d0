//! Packs a grid of arrays side by side, sized by their pixel dimensions.
//!
//! Each row is as tall as its tallest array and each column as wide as its
//! widest one. A [`Cell::SpanDown`] below an array (or [`Cell::SpanRight`]
//! beside it) lets the array overflow into the next row (column); whatever
//! the spanned tracks cannot absorb is added to the last track of the span.

use crate::error::{Error, Result};
use crate::image::Origin;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Array { rows: usize, cols: usize, zoom: f64 },
    /// Continuation of the array above.
    SpanDown,
    /// Continuation of the array to the left.
    SpanRight,
    Empty,
}

impl Cell {
    pub fn array(rows: usize, cols: usize) -> Self {
        Cell::Array {
            rows,
            cols,
            zoom: 1.0,
        }
    }

    pub fn zoomed(rows: usize, cols: usize, zoom: f64) -> Self {
        Cell::Array { rows, cols, zoom }
    }

    fn extent(&self) -> Option<(f64, f64)> {
        match *self {
            Cell::Array { rows, cols, zoom } => Some((rows as f64 * zoom, cols as f64 * zoom)),
            _ => None,
        }
    }
}

/// Outer margin in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Border {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl From<f64> for Border {
    fn from(all: f64) -> Self {
        Self {
            top: all,
            right: all,
            bottom: all,
            left: all,
        }
    }
}

/// `(horizontal, vertical)`.
impl From<(f64, f64)> for Border {
    fn from((h, v): (f64, f64)) -> Self {
        Self {
            top: v,
            right: h,
            bottom: v,
            left: h,
        }
    }
}

/// `(top, right, bottom, left)`.
impl From<(f64, f64, f64, f64)> for Border {
    fn from((top, right, bottom, left): (f64, f64, f64, f64)) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

/// Where one array landed, in units of the overall extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub row: usize,
    pub col: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arrangement {
    /// Overall `(width, height)` normalized so the longer side is 1.
    pub aspect: (f64, f64),
    pub items: Vec<Placement>,
}

pub fn arrange(
    grid: &[Vec<Cell>],
    padding: f64,
    border: impl Into<Border>,
    origin: Origin,
) -> Result<Arrangement> {
    let border = border.into();
    let nrows = grid.len();
    let ncols = grid.iter().map(Vec::len).max().unwrap_or(0);
    if nrows == 0 || ncols == 0 {
        return Err(Error::InvalidLayout("nothing to arrange".into()));
    }
    let cell = |i: usize, j: usize| grid.get(i).and_then(|row| row.get(j)).copied().unwrap_or(Cell::Empty);

    let mut heights = vec![0.0_f64; nrows];
    let mut widths = vec![0.0_f64; ncols];

    // Arrays that do not span.
    for i in 0..nrows {
        for j in 0..ncols {
            let Some((h, w)) = cell(i, j).extent() else {
                continue;
            };
            if cell(i + 1, j) != Cell::SpanDown {
                heights[i] = heights[i].max(h + padding);
            }
            if cell(i, j + 1) != Cell::SpanRight {
                widths[j] = widths[j].max(w + padding);
            }
        }
    }

    // Spanning arrays push their remainder into the last spanned track.
    for i in 0..nrows {
        for j in 0..ncols {
            let Some((h, w)) = cell(i, j).extent() else {
                continue;
            };
            if cell(i + 1, j) == Cell::SpanDown {
                let last = (i + 1..nrows)
                    .take_while(|k| cell(*k, j) == Cell::SpanDown)
                    .last()
                    .unwrap_or(i);
                let rest = h - heights[i..last].iter().sum::<f64>();
                heights[last] = heights[last].max(rest + padding);
            }
            if cell(i, j + 1) == Cell::SpanRight {
                let last = (j + 1..ncols)
                    .take_while(|k| cell(i, *k) == Cell::SpanRight)
                    .last()
                    .unwrap_or(j);
                let rest = w - widths[j..last].iter().sum::<f64>();
                widths[last] = widths[last].max(rest + padding);
            }
        }
    }

    let total_w = widths.iter().sum::<f64>() - padding + border.left + border.right;
    let total_h = heights.iter().sum::<f64>() - padding + border.top + border.bottom;
    if !(total_w > 0.0 && total_h > 0.0) {
        return Err(Error::InvalidLayout(format!(
            "arrangement has no area ({total_w} x {total_h})"
        )));
    }

    let mut items = Vec::new();
    for i in 0..nrows {
        for j in 0..ncols {
            let Some((h, w)) = cell(i, j).extent() else {
                continue;
            };
            let height = h / total_h;
            let mut y = (border.top + heights[..i].iter().sum::<f64>()) / total_h;
            if origin == Origin::Lower {
                y = 1.0 - y - height;
            }
            items.push(Placement {
                row: i,
                col: j,
                x: (border.left + widths[..j].iter().sum::<f64>()) / total_w,
                y,
                width: w / total_w,
                height,
            });
        }
    }

    let aspect = if total_w > total_h {
        (1.0, total_h / total_w)
    } else {
        (total_w / total_h, 1.0)
    };
    Ok(Arrangement { aspect, items })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_array_fills_the_arrangement() {
        let out = arrange(&[vec![Cell::array(10, 20)]], 0.0, 0.0, Origin::Lower).unwrap();
        assert_eq!(out.aspect, (1.0, 0.5));
        let item = out.items[0];
        assert_eq!((item.x, item.y, item.width, item.height), (0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn empty_grid_is_rejected() {
        assert!(matches!(
            arrange(&[], 1.0, 1.0, Origin::Lower),
            Err(Error::InvalidLayout(_))
        ));
    }
}
