//! Layout label types and geometry primitives.
//!
//! These are the labels stored on a [`LayoutGraph`](crate::LayoutGraph). Engines read sizes and
//! spacing from them and write positions back.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankDir {
    #[default]
    TB,
    BT,
    LR,
    RL,
}

impl RankDir {
    /// `true` when ranks advance along the x axis.
    pub fn is_horizontal(self) -> bool {
        matches!(self, RankDir::LR | RankDir::RL)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphLabel {
    pub rankdir: RankDir,
    pub nodesep: f64,
    pub ranksep: f64,
    pub edgesep: f64,
    pub marginx: f64,
    pub marginy: f64,
    /// Padding between a compound node's box and its descendants.
    pub cluster_padding: f64,
    /// Written by the engine: overall extent of the laid-out graph.
    pub width: f64,
    pub height: f64,
}

impl Default for GraphLabel {
    fn default() -> Self {
        Self {
            rankdir: RankDir::TB,
            nodesep: 50.0,
            ranksep: 50.0,
            edgesep: 20.0,
            marginx: 0.0,
            marginy: 0.0,
            cluster_padding: 8.0,
            width: 0.0,
            height: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeLabel {
    pub width: f64,
    pub height: f64,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub rank: Option<i32>,
    pub order: Option<usize>,
}

impl NodeLabel {
    pub fn sized(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Center-based rectangle, once the node has been positioned.
    pub fn rect(&self) -> Option<Rect> {
        Some(Rect::from_center(self.x?, self.y?, self.width, self.height))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeLabel {
    /// Size of the edge label, zero when the edge has none.
    pub width: f64,
    pub height: f64,
    pub minlen: usize,
    pub weight: f64,
    /// Set by the engine when the edge was reversed to break a cycle.
    pub reversed: bool,
    /// Free-form metadata carried through layout untouched.
    pub extras: BTreeMap<String, serde_json::Value>,

    pub x: Option<f64>,
    pub y: Option<f64>,
    pub points: Vec<Point>,
}

impl Default for EdgeLabel {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            minlen: 1,
            weight: 1.0,
            reversed: false,
            extras: BTreeMap::new(),
            x: None,
            y: None,
            points: Vec::new(),
        }
    }
}

impl EdgeLabel {
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extras.get(key).and_then(serde_json::Value::as_str)
    }

    pub fn set_extra_str(&mut self, key: &str, value: impl Into<String>) {
        self.extras
            .insert(key.to_string(), serde_json::Value::String(value.into()));
    }
}

/// Axis-aligned rectangle stored by center and size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn from_center(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_min_max(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            x: (min_x + max_x) / 2.0,
            y: (min_y + max_y) / 2.0,
            width: (max_x - min_x).max(0.0),
            height: (max_y - min_y).max(0.0),
        }
    }

    pub fn min_x(&self) -> f64 {
        self.x - self.width / 2.0
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn min_y(&self) -> f64 {
        self.y - self.height / 2.0
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x,
            y: self.y,
        }
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_min_max(
            self.min_x().min(other.min_x()),
            self.min_y().min(other.min_y()),
            self.max_x().max(other.max_x()),
            self.max_y().max(other.max_y()),
        )
    }

    pub fn pad(&self, px: f64, py: f64) -> Rect {
        Rect::from_center(self.x, self.y, self.width + 2.0 * px, self.height + 2.0 * py)
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    pub fn contains(&self, p: Point) -> bool {
        (p.x - self.x).abs() < self.width / 2.0 && (p.y - self.y).abs() < self.height / 2.0
    }
}
