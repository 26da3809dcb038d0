//! Recursive figure layout.
//!
//! A [`FigureTree`] is an arena of nodes. Every node stores its size and
//! position relative to its parent; absolute geometry is derived on every
//! query by walking the parent chain up to the root, which holds the window
//! size in pixels. Nothing is cached, so a [`FigureTree::resize`] is
//! reflected by the very next query.
//!
//! Coordinates follow the framebuffer convention: the origin is the bottom
//! left corner and y grows upwards.

use std::str::FromStr;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Absolute pixel rectangle, origin at the bottom left of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Inclusive on every edge.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (x0, y0) = (f64::from(self.x), f64::from(self.y));
        x >= x0 && x <= x0 + f64::from(self.width) && y >= y0 && y <= y0 + f64::from(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Rectangle in root-relative units, where the window spans `[0, 1]²`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Region {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn intersection_area(&self, other: &Region) -> f64 {
        let w = (self.x + self.width).min(other.x + other.width) - self.x.max(other.x);
        let h = (self.y + self.height).min(other.y + other.height) - self.y.max(other.y);
        w.max(0.0) * h.max(0.0)
    }
}

/// Track specification along one grid axis.
#[derive(Debug, Clone, PartialEq)]
pub enum Tracks {
    /// `n` equal tracks.
    Count(usize),
    /// `⌊f⌋` full tracks plus one track of the fractional remainder.
    Fractional(f64),
    /// Explicit relative weights.
    Weights(Vec<f64>),
}

impl Tracks {
    pub fn weights(&self) -> Result<Vec<f64>> {
        let weights = match self {
            Tracks::Count(n) => vec![1.0; *n],
            Tracks::Fractional(f) => {
                if !f.is_finite() || *f <= 0.0 {
                    return Err(Error::InvalidLayout(format!(
                        "fractional track count {f} must be positive"
                    )));
                }
                let whole = f.trunc();
                let mut weights = vec![1.0; whole as usize];
                let rest = f - whole;
                if rest > 0.0 {
                    weights.push(rest);
                }
                weights
            }
            Tracks::Weights(w) => w.clone(),
        };
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::InvalidLayout(
                "track weights must be finite and non-negative".into(),
            ));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(Error::InvalidLayout(
                "grid needs at least one track of positive weight".into(),
            ));
        }
        Ok(weights)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    pub cols: Tracks,
    pub rows: Tracks,
    /// Fraction of the parent extent reserved on each side of every cell.
    pub border: f64,
}

impl GridSpec {
    pub fn new(cols: Tracks, rows: Tracks) -> Self {
        Self {
            cols,
            rows,
            border: 0.0,
        }
    }

    /// `cols x rows` equal cells.
    pub fn uniform(cols: usize, rows: usize) -> Self {
        Self::new(Tracks::Count(cols), Tracks::Count(rows))
    }

    pub fn with_border(mut self, border: f64) -> Self {
        self.border = border;
        self
    }
}

/// Returns `(start, extent)` of the span `[index, index + span)` along one axis.
fn track_span(weights: &[f64], border: f64, index: usize, span: usize) -> Result<(f64, f64)> {
    let n = weights.len();
    if span == 0 {
        return Err(Error::InvalidLayout("cell span must be at least 1".into()));
    }
    if index + span > n {
        return Err(Error::InvalidLayout(format!(
            "cells {}..{} exceed the {} available tracks",
            index,
            index + span,
            n
        )));
    }
    if !border.is_finite() || border < 0.0 {
        return Err(Error::InvalidLayout(format!(
            "border {border} must be non-negative"
        )));
    }
    let free = 1.0 - 2.0 * n as f64 * border;
    if free <= 0.0 {
        return Err(Error::InvalidLayout(format!(
            "border {border} leaves no room for {n} tracks"
        )));
    }
    let total: f64 = weights.iter().sum();
    let extent = |i: usize| weights[..i].iter().sum::<f64>() / total * free;
    let start = extent(index) + (2 * index + 1) as f64 * border;
    let end = extent(index + span) + (2 * (index + span) - 1) as f64 * border;
    Ok((start, end - start))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            "top" => Ok(Side::Top),
            "bottom" => Ok(Side::Bottom),
            other => Err(format!("unknown side `{other}`")),
        }
    }
}

/// Colors a frame paints behind and around its content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStyle {
    pub foreground: [f32; 4],
    pub background: [f32; 4],
}

impl Default for FrameStyle {
    fn default() -> Self {
        Self {
            foreground: [0.0, 0.0, 0.0, 1.0],
            background: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    Root { width: f64, height: f64 },
    Figure,
    Frame { aspect: Option<f64>, style: FrameStyle },
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    size: [f64; 2],
    position: [f64; 2],
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct FigureTree {
    nodes: Vec<Option<Node>>,
    root: NodeId,
    main: NodeId,
}

impl FigureTree {
    /// Root sized to the window plus one full-size main figure.
    pub fn new(width: f64, height: f64) -> Self {
        let mut tree = Self {
            nodes: vec![Some(Node {
                kind: NodeKind::Root { width, height },
                size: [1.0, 1.0],
                position: [0.0, 0.0],
                parent: None,
                children: Vec::new(),
            })],
            root: NodeId(0),
            main: NodeId(0),
        };
        tree.main = tree.push(NodeKind::Figure, tree.root, [1.0, 1.0], [0.0, 0.0]);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Full-size figure everything else hangs off.
    pub fn main(&self) -> NodeId {
        self.main
    }

    /// Updates the window size; all geometry follows on the next query.
    pub fn resize(&mut self, width: f64, height: f64) {
        if let Some(Some(node)) = self.nodes.get_mut(self.root.0) {
            node.kind = NodeKind::Root { width, height };
        }
    }

    fn push(&mut self, kind: NodeKind, parent: NodeId, size: [f64; 2], position: [f64; 2]) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node {
            kind,
            size,
            position,
            parent: Some(parent),
            children: Vec::new(),
        }));
        if let Some(Some(parent)) = self.nodes.get_mut(parent.0) {
            parent.children.push(id);
        }
        id
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(Error::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(Error::UnknownNode(id))
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    pub fn kind(&self, id: NodeId) -> Result<NodeKind> {
        Ok(self.node(id)?.kind)
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(&self.node(id)?.children)
    }

    /// Size relative to the parent.
    pub fn relative_size(&self, id: NodeId) -> Result<[f64; 2]> {
        Ok(self.node(id)?.size)
    }

    /// Position relative to the parent.
    pub fn relative_position(&self, id: NodeId) -> Result<[f64; 2]> {
        Ok(self.node(id)?.position)
    }

    /// Carves a grid cell range out of `parent` and adds it as a new child.
    ///
    /// `position` is the `(col, row)` of the first cell, `size` the number of
    /// `(cols, rows)` spanned. Rows are counted from the bottom.
    pub fn add_figure(
        &mut self,
        parent: NodeId,
        grid: &GridSpec,
        position: (usize, usize),
        size: (usize, usize),
    ) -> Result<NodeId> {
        self.node(parent)?;
        let cols = grid.cols.weights()?;
        let rows = grid.rows.weights()?;
        let (x, w) = track_span(&cols, grid.border, position.0, size.0)?;
        let (y, h) = track_span(&rows, grid.border, position.1, size.1)?;
        if w <= 0.0 || h <= 0.0 {
            return Err(Error::InvalidLayout(format!(
                "cell range at {position:?} spanning {size:?} has no area"
            )));
        }
        Ok(self.push(NodeKind::Figure, parent, [w, h], [x, y]))
    }

    /// Splits `id` in two along `side`.
    ///
    /// The new sibling takes fraction `size` of the node's extent on that
    /// side and the node shrinks in place to keep the rest. The sibling is
    /// appended to the same parent. Chained splits subdivide further.
    pub fn split(&mut self, id: NodeId, side: Side, size: f64) -> Result<NodeId> {
        if !(size > 0.0 && size < 1.0) {
            return Err(Error::InvalidLayout(format!(
                "split size {size} must lie strictly between 0 and 1"
            )));
        }
        let node = self.node(id)?;
        let Some(parent) = node.parent else {
            return Err(Error::InvalidLayout("the root cannot be split".into()));
        };
        if matches!(node.kind, NodeKind::Frame { .. }) {
            return Err(Error::InvalidLayout("frames cannot be split".into()));
        }
        let [w, h] = node.size;
        let [x, y] = node.position;
        let (kept, added) = match side {
            Side::Right => {
                let w1 = (1.0 - size) * w;
                (([w1, h], [x, y]), ([size * w, h], [x + w1, y]))
            }
            Side::Left => {
                let w2 = size * w;
                (([(1.0 - size) * w, h], [x + w2, y]), ([w2, h], [x, y]))
            }
            Side::Top => {
                let h1 = (1.0 - size) * h;
                (([w, h1], [x, y]), ([w, size * h], [x, y + h1]))
            }
            Side::Bottom => {
                let h2 = size * h;
                (([w, (1.0 - size) * h], [x, y + h2]), ([w, h2], [x, y]))
            }
        };
        let node = self.node_mut(id)?;
        node.size = kept.0;
        node.position = kept.1;
        Ok(self.push(NodeKind::Figure, parent, added.0, added.1))
    }

    /// Adds a frame inside `figure`, centered, optionally locked to `aspect`
    /// (width over height).
    pub fn add_frame(
        &mut self,
        figure: NodeId,
        size: [f64; 2],
        aspect: Option<f64>,
        style: FrameStyle,
    ) -> Result<NodeId> {
        self.node(figure)?;
        if size.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(Error::InvalidLayout(format!(
                "frame size {size:?} must be positive"
            )));
        }
        if let Some(aspect) = aspect {
            if !aspect.is_finite() || aspect <= 0.0 {
                return Err(Error::InvalidLayout(format!(
                    "frame aspect {aspect} must be positive"
                )));
            }
        }
        Ok(self.push(
            NodeKind::Frame { aspect, style },
            figure,
            size,
            [0.0, 0.0],
        ))
    }

    /// Removes `id` and its subtree, children before parents.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        if id == self.root || id == self.main {
            return Err(Error::InvalidLayout(
                "the root and main figure cannot be removed".into(),
            ));
        }
        let parent = self.node(id)?.parent;
        let mut order = Vec::new();
        self.post_order(id, &mut order)?;
        for node in order {
            if let Some(slot) = self.nodes.get_mut(node.0) {
                *slot = None;
            }
        }
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|c| *c != id);
        }
        Ok(())
    }

    fn post_order(&self, id: NodeId, out: &mut Vec<NodeId>) -> Result<()> {
        for child in &self.node(id)?.children {
            self.post_order(*child, out)?;
        }
        out.push(id);
        Ok(())
    }

    /// Pixel width and height, with a frame's aspect lock applied.
    fn extent(&self, id: NodeId) -> Result<(f64, f64)> {
        let node = self.node(id)?;
        let Some(parent) = node.parent else {
            return match node.kind {
                NodeKind::Root { width, height } => Ok((width, height)),
                _ => Err(Error::UnknownNode(id)),
            };
        };
        let (pw, ph) = self.extent(parent)?;
        let (w, h) = (node.size[0] * pw, node.size[1] * ph);
        Ok(match node.kind {
            NodeKind::Frame {
                aspect: Some(aspect),
                ..
            } => {
                if h > 0.0 && w / h > aspect {
                    (aspect * h, h)
                } else {
                    (w, w / aspect)
                }
            }
            _ => (w, h),
        })
    }

    pub fn width(&self, id: NodeId) -> Result<f64> {
        Ok(self.extent(id)?.0)
    }

    pub fn height(&self, id: NodeId) -> Result<f64> {
        Ok(self.extent(id)?.1)
    }

    /// Offset from the parent's origin in pixels.
    fn offset(&self, id: NodeId) -> Result<(f64, f64)> {
        let node = self.node(id)?;
        let Some(parent) = node.parent else {
            return Ok((0.0, 0.0));
        };
        let (pw, ph) = self.extent(parent)?;
        match node.kind {
            NodeKind::Frame { .. } => {
                let (w, h) = self.extent(id)?;
                Ok(((pw - w) / 2.0, (ph - h) / 2.0))
            }
            _ => Ok((node.position[0] * pw, node.position[1] * ph)),
        }
    }

    pub fn x(&self, id: NodeId) -> Result<f64> {
        Ok(self.offset(id)?.0)
    }

    pub fn y(&self, id: NodeId) -> Result<f64> {
        Ok(self.offset(id)?.1)
    }

    /// Absolute position of the node's origin in window pixels.
    pub fn absolute(&self, id: NodeId) -> Result<(f64, f64)> {
        let (x, y) = self.offset(id)?;
        match self.node(id)?.parent {
            Some(parent) => {
                let (px, py) = self.absolute(parent)?;
                Ok((x + px, y + py))
            }
            None => Ok((x, y)),
        }
    }

    pub fn abs_x(&self, id: NodeId) -> Result<f64> {
        Ok(self.absolute(id)?.0)
    }

    pub fn abs_y(&self, id: NodeId) -> Result<f64> {
        Ok(self.absolute(id)?.1)
    }

    /// Rounded absolute rectangle.
    pub fn viewport(&self, id: NodeId) -> Result<Viewport> {
        let (x, y) = self.absolute(id)?;
        let (w, h) = self.extent(id)?;
        Ok(Viewport {
            x: x.round() as i32,
            y: y.round() as i32,
            width: w.round().max(0.0) as u32,
            height: h.round().max(0.0) as u32,
        })
    }

    /// Unrounded rectangle in root-relative units.
    pub fn region(&self, id: NodeId) -> Result<Region> {
        let (rw, rh) = self.extent(self.root)?;
        let (x, y) = self.absolute(id)?;
        let (w, h) = self.extent(id)?;
        if rw <= 0.0 || rh <= 0.0 {
            return Err(Error::InvalidLayout("window has no area".into()));
        }
        Ok(Region {
            x: x / rw,
            y: y / rh,
            width: w / rw,
            height: h / rh,
        })
    }

    /// Nodes without children, in draw order (depth first, insertion order).
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_leaves(self.root, &mut out);
        out
    }

    fn collect_leaves(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let Ok(node) = self.node(id) else {
            return;
        };
        if node.children.is_empty() {
            out.push(id);
        }
        for child in &node.children {
            self.collect_leaves(*child, out);
        }
    }

    /// Whether a window point lies inside the node's viewport.
    pub fn contains(&self, id: NodeId, point: (f64, f64)) -> Result<bool> {
        Ok(self.viewport(id)?.contains(point.0, point.1))
    }

    /// Deepest node under a window point, preferring the last drawn.
    pub fn node_at(&self, point: (f64, f64)) -> Option<NodeId> {
        self.hit(self.root, point)
    }

    fn hit(&self, id: NodeId, point: (f64, f64)) -> Option<NodeId> {
        if !self.contains(id, point).ok()? {
            return None;
        }
        let node = self.node(id).ok()?;
        node.children
            .iter()
            .rev()
            .find_map(|child| self.hit(*child, point))
            .or(Some(id))
    }
}
