//! Edge routing: straight three-point polylines clipped at node borders.

use crate::model::{Point, Rect};
use crate::util::intersect_rect;
use crate::LayoutGraph;
use tracing::trace;

pub(crate) fn route_edges(g: &mut LayoutGraph) {
    let loop_reach = g.graph().nodesep / 2.0;
    for key in g.edge_keys() {
        let v_rect = g.node(&key.v).and_then(|n| n.rect());
        let w_rect = g.node(&key.w).and_then(|n| n.rect());
        let (Some(v_rect), Some(w_rect)) = (v_rect, w_rect) else {
            trace!(edge = %key, "skipping route for unpositioned endpoint");
            continue;
        };

        let points = if key.is_self_loop() {
            self_loop_points(v_rect, loop_reach)
        } else {
            straight_points(v_rect, w_rect)
        };
        let mid = points[points.len() / 2];
        if let Some(label) = g.edge_mut_by_key(&key) {
            label.x = Some(mid.x);
            label.y = Some(mid.y);
            label.points = points;
        }
    }
}

fn straight_points(v: Rect, w: Rect) -> Vec<Point> {
    let mid = Point {
        x: (v.x + w.x) / 2.0,
        y: (v.y + w.y) / 2.0,
    };
    if v.contains(mid) || w.contains(mid) {
        return vec![v.center(), mid, w.center()];
    }
    vec![intersect_rect(v, mid), mid, intersect_rect(w, mid)]
}

fn self_loop_points(r: Rect, reach: f64) -> Vec<Point> {
    let right = r.max_x();
    let dy = r.height / 4.0;
    vec![
        Point { x: right, y: r.y - dy },
        Point { x: right + reach, y: r.y - dy },
        Point { x: right + reach, y: r.y },
        Point { x: right + reach, y: r.y + dy },
        Point { x: right, y: r.y + dy },
    ]
}
