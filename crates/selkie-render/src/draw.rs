//! Node drawing and edge routing collaborators.
//!
//! The renderer never draws anything itself: it asks a [`NodeDrawer`] for the size of every
//! leaf and an [`EdgeRouter`] for the final polyline of every edge. The defaults produce plain
//! label boxes and clip edge paths at the boundary of collapsed or compound clusters.

use selkie_layered::Rect;
use serde::{Deserialize, Serialize};

use crate::model::{LayoutPoint, NodeInput};
use crate::text::{TextMeasurer, TextStyle};

const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width >= 0.0 && self.height >= 0.0
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct DrawError {
    pub message: String,
}

impl DrawError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub trait NodeDrawer {
    fn draw(
        &self,
        node: &NodeInput,
        measurer: &dyn TextMeasurer,
        style: &TextStyle,
    ) -> Result<Size, DrawError>;
}

/// Sizes a node from its explicit `width`/`height`, or from its label plus padding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelBoxDrawer {
    pub padding: f64,
}

impl Default for LabelBoxDrawer {
    fn default() -> Self {
        Self { padding: 15.0 }
    }
}

impl NodeDrawer for LabelBoxDrawer {
    fn draw(
        &self,
        node: &NodeInput,
        measurer: &dyn TextMeasurer,
        style: &TextStyle,
    ) -> Result<Size, DrawError> {
        let size = match (node.width, node.height) {
            (Some(width), Some(height)) => Size::new(width, height),
            (width, height) => {
                let text = node.label.as_deref().unwrap_or(node.id.as_str());
                let metrics = measurer.measure(text, style);
                let padding = node.padding.unwrap_or(self.padding);
                Size::new(
                    width.unwrap_or(metrics.width + 2.0 * padding),
                    height.unwrap_or(metrics.height + 2.0 * padding),
                )
            }
        };
        if !size.is_valid() {
            return Err(DrawError::new(format!(
                "invalid node size {}x{}",
                size.width, size.height
            )));
        }
        Ok(size)
    }
}

/// Everything a router needs to finish one edge, in the coordinates of the level it was laid
/// out in.
#[derive(Debug, Clone, Copy)]
pub struct EdgeRoute<'a> {
    pub edge_id: &'a str,
    pub points: &'a [LayoutPoint],
    pub start: Option<Rect>,
    pub end: Option<Rect>,
    pub from_cluster: Option<Rect>,
    pub to_cluster: Option<Rect>,
}

pub trait EdgeRouter {
    fn route(&self, route: &EdgeRoute<'_>) -> Result<Vec<LayoutPoint>, DrawError>;
}

/// Cuts edge paths where they enter the box of the cluster they were redirected from or to.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterClipRouter;

impl EdgeRouter for ClusterClipRouter {
    fn route(&self, route: &EdgeRoute<'_>) -> Result<Vec<LayoutPoint>, DrawError> {
        if route.points.is_empty() {
            return Err(DrawError::new("edge has no routing points"));
        }
        if route
            .points
            .iter()
            .any(|p| !(p.x.is_finite() && p.y.is_finite()))
        {
            return Err(DrawError::new("edge has non-finite routing points"));
        }

        let mut points = route.points.to_vec();
        if let Some(boundary) = route.to_cluster {
            points = cut_path_at_intersect(&points, &boundary);
        }
        if let Some(boundary) = route.from_cluster {
            points.reverse();
            points = cut_path_at_intersect(&points, &boundary);
            points.reverse();
        }
        Ok(dedup_consecutive_points(&points))
    }
}

fn outside(boundary: &Rect, p: &LayoutPoint) -> bool {
    (p.x - boundary.x).abs() >= boundary.width / 2.0
        || (p.y - boundary.y).abs() >= boundary.height / 2.0
}

/// Point where the segment from `outside_point` to `inside_point` crosses the boundary.
fn boundary_crossing(boundary: &Rect, outside_point: &LayoutPoint, inside_point: &LayoutPoint) -> LayoutPoint {
    fn entry(from: f64, to: f64, min: f64, max: f64) -> f64 {
        let span = to - from;
        if span.abs() <= EPS {
            return 0.0;
        }
        if from < min {
            (min - from) / span
        } else if from > max {
            (max - from) / span
        } else {
            0.0
        }
    }

    let tx = entry(outside_point.x, inside_point.x, boundary.min_x(), boundary.max_x());
    let ty = entry(outside_point.y, inside_point.y, boundary.min_y(), boundary.max_y());
    let t = tx.max(ty).clamp(0.0, 1.0);
    LayoutPoint::new(
        outside_point.x + t * (inside_point.x - outside_point.x),
        outside_point.y + t * (inside_point.y - outside_point.y),
    )
}

/// Keeps the path up to the first point inside `boundary` and replaces that point with the
/// crossing of the boundary. A path that already starts inside never crosses into it and is
/// returned unchanged.
pub fn cut_path_at_intersect(input: &[LayoutPoint], boundary: &Rect) -> Vec<LayoutPoint> {
    let mut out: Vec<LayoutPoint> = Vec::with_capacity(input.len() + 1);
    let Some(first) = input.first() else {
        return out;
    };
    if !outside(boundary, first) {
        return input.to_vec();
    }
    let mut last_outside = *first;
    for point in input {
        if outside(boundary, point) {
            last_outside = *point;
            out.push(*point);
            continue;
        }
        let crossing = boundary_crossing(boundary, &last_outside, point);
        if !out
            .iter()
            .any(|p| (p.x - crossing.x).abs() <= EPS && (p.y - crossing.y).abs() <= EPS)
        {
            out.push(crossing);
        }
        break;
    }
    out
}

pub fn dedup_consecutive_points(input: &[LayoutPoint]) -> Vec<LayoutPoint> {
    let mut out: Vec<LayoutPoint> = Vec::with_capacity(input.len());
    for p in input {
        if out
            .last()
            .is_some_and(|prev| (prev.x - p.x).abs() <= EPS && (prev.y - p.y).abs() <= EPS)
        {
            continue;
        }
        out.push(*p);
    }
    out
}
