//! Recursive rendering of a prepared graph tree.
//!
//! Each level is laid out after all of its collapsed clusters: their sub-graphs are rendered
//! first, the resulting sizes go into the placeholders, the level is laid out, and the
//! sub-graph geometry is then translated onto the placeholder's final position.

use futures::future::{FutureExt, LocalBoxFuture, join_all};
use indexmap::IndexMap;
use selkie_layered::graphlib::alg;
use selkie_layered::{LayoutGraph, NodeLabel, Rect};
use tracing::{debug, error, trace, warn};

use crate::RenderOptions;
use crate::adjust::{PreparedGraph, adjust_clusters_and_edges};
use crate::config::LayoutConfig;
use crate::context::RenderContext;
use crate::draw::{EdgeRoute, Size};
use crate::model::{
    Bounds, GraphInput, ItemFailure, ItemKind, LayoutCluster, LayoutEdge, LayoutLabel, LayoutNode,
    LayoutPoint, LayoutResult, NodeInput,
};
use crate::text::TextStyle;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
struct ClusterBox {
    rect: Rect,
    collapsed: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct EdgeGeometry {
    points: Vec<LayoutPoint>,
    label: Option<LayoutLabel>,
    from_cluster: Option<String>,
    to_cluster: Option<String>,
}

/// Geometry of one level, plus everything absorbed from the levels below it.
#[derive(Debug, Clone, Default)]
struct Fragment {
    nodes: IndexMap<String, Rect>,
    clusters: IndexMap<String, ClusterBox>,
    edges: IndexMap<String, EdgeGeometry>,
    /// Box of the injected cluster node of a sub-graph.
    root: Option<Rect>,
}

impl Fragment {
    fn corners(&self) -> Vec<(f64, f64)> {
        let mut out = Vec::new();
        let rects = self
            .nodes
            .values()
            .chain(self.clusters.values().map(|c| &c.rect))
            .chain(self.root.iter());
        for r in rects {
            out.push((r.min_x(), r.min_y()));
            out.push((r.max_x(), r.max_y()));
        }
        for e in self.edges.values() {
            out.extend(e.points.iter().map(|p| (p.x, p.y)));
            if let Some(l) = &e.label {
                out.push((l.x - l.width / 2.0, l.y - l.height / 2.0));
                out.push((l.x + l.width / 2.0, l.y + l.height / 2.0));
            }
        }
        out
    }

    fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.corners())
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        for r in self.nodes.values_mut() {
            r.translate(dx, dy);
        }
        for c in self.clusters.values_mut() {
            c.rect.translate(dx, dy);
        }
        if let Some(r) = self.root.as_mut() {
            r.translate(dx, dy);
        }
        for e in self.edges.values_mut() {
            for p in &mut e.points {
                p.x += dx;
                p.y += dy;
            }
            if let Some(l) = e.label.as_mut() {
                l.x += dx;
                l.y += dy;
            }
        }
    }

    fn absorb(&mut self, other: Fragment) {
        self.nodes.extend(other.nodes);
        self.clusters.extend(other.clusters);
        self.edges.extend(other.edges);
    }
}

/// Lays out `input` and returns the geometry of every node, edge and cluster.
pub(crate) async fn render_graph(input: &GraphInput, options: &RenderOptions) -> Result<LayoutResult> {
    let mut ctx = RenderContext::new(input.config.clone());
    let graph = ctx.build_graph(input)?;
    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        direction = ?ctx.config.direction,
        "rendering graph"
    );

    let mut prepared = adjust_clusters_and_edges(graph, &mut ctx)?;
    let fragment = render_level(&mut prepared, &mut ctx, options).await?;
    let result = assemble(fragment, &ctx)?;
    if !result.failures.is_empty() {
        warn!(failures = result.failures.len(), "render finished with per-item failures");
    }
    Ok(result)
}

fn render_level<'a>(
    prepared: &'a mut PreparedGraph,
    ctx: &'a mut RenderContext,
    options: &'a RenderOptions,
) -> LocalBoxFuture<'a, Result<Fragment>> {
    async move {
        if let Some(first) = prepared.copy_failures.first() {
            return Err(Error::Inconsistent {
                message: format!(
                    "{} edge(s) could not be copied; first: {first}",
                    prepared.copy_failures.len()
                ),
            });
        }
        if let Some(root) = prepared.root_cluster_id.clone() {
            inject_root_cluster_node(&mut prepared.graph, &root);
        }

        let mut children: Vec<(String, Fragment)> = Vec::new();
        let ids: Vec<String> = prepared.extracted.keys().cloned().collect();
        for id in ids {
            let nodesep = prepared.graph.graph().nodesep;
            let ranksep = prepared.graph.graph().ranksep;
            let Some(child) = prepared.extracted.get_mut(&id) else {
                continue;
            };
            if child.depth > ctx.config.max_depth {
                error!(cluster = %id, limit = ctx.config.max_depth, "graph too deeply nested");
                return Err(Error::DepthExceeded {
                    cluster: id,
                    limit: ctx.config.max_depth,
                });
            }
            let label = child.graph.graph_mut();
            label.nodesep = nodesep;
            label.ranksep = ranksep + ctx.config.cluster_rank_spacing_increment;

            let fragment = render_level(child, &mut *ctx, options).await?;
            let (width, height) = fragment
                .bounds()
                .map(|b| (b.width(), b.height()))
                .unwrap_or((0.0, 0.0));
            let Some(placeholder) = prepared.graph.node_mut(&id) else {
                return Err(Error::Inconsistent {
                    message: format!("missing placeholder node for cluster `{id}`"),
                });
            };
            placeholder.width = width.max(1.0);
            placeholder.height = height.max(1.0);
            debug!(cluster = %id, width, height, "sized collapsed cluster");
            children.push((id, fragment));
        }

        measure_level(prepared, ctx, options).await?;
        check_edge_endpoints(prepared, ctx)?;
        options.engine.layout(&mut prepared.graph)?;
        apply_title_margins(prepared, &ctx.config);

        let mut fragment = collect_fragment(prepared, options, &mut ctx.failures)?;
        for (id, mut child) in children {
            let Some(placeholder) = fragment.clusters.get(&id).map(|c| c.rect) else {
                return Err(Error::Inconsistent {
                    message: format!("collapsed cluster `{id}` was not laid out"),
                });
            };
            let Some(bounds) = child.bounds() else {
                continue;
            };
            let dx = placeholder.x - (bounds.min_x + bounds.max_x) / 2.0;
            let dy = placeholder.y - (bounds.min_y + bounds.max_y) / 2.0;
            trace!(cluster = %id, dx, dy, "translating sub-graph");
            child.translate(dx, dy);
            fragment.absorb(child);
        }
        Ok(fragment)
    }
    .boxed_local()
}

/// Adds the cluster a sub-graph was extracted from as a compound node owning every top-level
/// node, so the engine computes the padded cluster box.
fn inject_root_cluster_node(graph: &mut LayoutGraph, root_id: &str) {
    if !graph.has_node(root_id) {
        graph.set_node(root_id, NodeLabel::sized(1.0, 1.0));
    }
    for id in graph.node_ids() {
        if id != root_id && graph.parent(&id).is_none() {
            graph.set_parent(id, root_id);
        }
    }
}

fn fallback_size(node: &NodeInput) -> Size {
    let sane = |v: Option<f64>| v.filter(|v| v.is_finite() && *v >= 0.0).unwrap_or(0.0);
    Size::new(sane(node.width), sane(node.height))
}

/// Sizes every leaf of the level with the node drawer and every edge label with the text
/// measurer. Drawer failures are recorded and the node keeps a fallback size.
async fn measure_level(
    prepared: &mut PreparedGraph,
    ctx: &mut RenderContext,
    options: &RenderOptions,
) -> Result<()> {
    let graph = &prepared.graph;
    let root = prepared.root_cluster_id.as_deref();
    let leaves: Vec<String> = graph
        .nodes()
        .filter(|id| {
            !graph.has_children(id) && !prepared.extracted.contains_key(*id) && Some(*id) != root
        })
        .map(str::to_string)
        .collect();

    let style = TextStyle::with_size(ctx.config.font_size);
    let drawer = options.drawer.as_ref();
    let measurer = options.text_measurer.as_ref();

    let mut jobs = Vec::with_capacity(leaves.len());
    for id in &leaves {
        let Some(node) = ctx.nodes.get(id) else {
            return Err(Error::Inconsistent {
                message: format!("node `{id}` is not part of the input graph"),
            });
        };
        let style = &style;
        jobs.push(async move { (id, node, drawer.draw(node, measurer, style)) });
    }
    let drawn = join_all(jobs).await;

    let mut failures = Vec::new();
    let mut sizes = Vec::with_capacity(drawn.len());
    for (id, node, result) in drawn {
        let size = match result {
            Ok(size) => size,
            Err(err) => {
                warn!(node = %id, error = %err, "node could not be drawn, using fallback size");
                failures.push(ItemFailure {
                    kind: ItemKind::Node,
                    id: id.clone(),
                    message: err.message,
                });
                fallback_size(node)
            }
        };
        sizes.push((id, size));
    }

    let labels: Vec<_> = prepared
        .graph
        .edge_entries()
        .filter_map(|(key, label)| {
            let text = label
                .extra_str("id")
                .and_then(|id| ctx.edges.get(id))
                .and_then(|e| e.input.label.as_deref())
                .filter(|t| !t.is_empty())?;
            Some((key.clone(), text))
        })
        .map(|(key, text)| {
            let style = &style;
            async move { (key, measurer.measure(text, style)) }
        })
        .collect();
    let measured = join_all(labels).await;

    for (id, size) in sizes {
        if let Some(n) = prepared.graph.node_mut(id) {
            n.width = size.width;
            n.height = size.height;
        }
    }
    for (key, metrics) in measured {
        if let Some(e) = prepared.graph.edge_mut_by_key(&key) {
            e.width = metrics.width;
            e.height = metrics.height;
        }
    }
    ctx.failures.extend(failures);
    Ok(())
}

/// Every edge of a level must still carry its id and connect nodes the render knows about.
fn check_edge_endpoints(prepared: &PreparedGraph, ctx: &RenderContext) -> Result<()> {
    for (key, label) in prepared.graph.edge_entries() {
        let Some(id) = label.extra_str("id") else {
            return Err(Error::Inconsistent {
                message: format!("edge {key} lost its id during flattening"),
            });
        };
        for end in [&key.v, &key.w] {
            let known = prepared.graph.has_node(end)
                && (ctx.nodes.contains_key(end.as_str()) || ctx.clusters.contains(end));
            if !known {
                return Err(Error::Inconsistent {
                    message: format!(
                        "edge `{id}` references `{end}`, which is neither a laid out node nor a registered cluster"
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Reserves room for cluster titles: collapsed clusters move down by the whole margin,
/// expanded clusters grow by it, and everything else moves down by half of it.
fn apply_title_margins(prepared: &mut PreparedGraph, config: &LayoutConfig) {
    let total = config.sub_graph_title_margin.total();
    if total == 0.0 {
        return;
    }
    for id in alg::hierarchy_order(&prepared.graph) {
        let collapsed = prepared.extracted.contains_key(&id);
        let expanded = prepared.graph.has_children(&id);
        let Some(n) = prepared.graph.node_mut(&id) else {
            continue;
        };
        if collapsed {
            n.y = n.y.map(|y| y + total);
        } else if expanded {
            n.height += total;
        } else {
            n.y = n.y.map(|y| y + total / 2.0);
        }
    }
    for key in prepared.graph.edge_keys() {
        if let Some(e) = prepared.graph.edge_mut_by_key(&key) {
            for p in &mut e.points {
                p.y += total / 2.0;
            }
            e.y = e.y.map(|y| y + total / 2.0);
        }
    }
}

fn collect_fragment(
    prepared: &PreparedGraph,
    options: &RenderOptions,
    failures: &mut Vec<ItemFailure>,
) -> Result<Fragment> {
    let graph = &prepared.graph;
    let root = prepared.root_cluster_id.as_deref();
    let rect_of = |id: &str| graph.node(id).and_then(NodeLabel::rect);

    let mut fragment = Fragment::default();
    for id in alg::hierarchy_order(graph) {
        let Some(rect) = rect_of(&id) else {
            return Err(Error::Inconsistent {
                message: format!("node `{id}` was not positioned by the layout engine"),
            });
        };
        if Some(id.as_str()) == root {
            fragment.root = Some(rect);
        } else if prepared.extracted.contains_key(&id) {
            fragment.clusters.insert(id, ClusterBox { rect, collapsed: true });
        } else if graph.has_children(&id) {
            fragment.clusters.insert(id, ClusterBox { rect, collapsed: false });
        } else {
            fragment.nodes.insert(id, rect);
        }
    }

    for (key, label) in graph.edge_entries() {
        let Some(id) = label.extra_str("id") else {
            continue;
        };
        let points: Vec<LayoutPoint> = label
            .points
            .iter()
            .map(|p| LayoutPoint::new(p.x, p.y))
            .collect();
        let from_cluster = label.extra_str("fromCluster").map(str::to_string);
        let to_cluster = label.extra_str("toCluster").map(str::to_string);
        let route = EdgeRoute {
            edge_id: id,
            points: &points,
            start: rect_of(&key.v),
            end: rect_of(&key.w),
            from_cluster: from_cluster.as_deref().and_then(rect_of),
            to_cluster: to_cluster.as_deref().and_then(rect_of),
        };
        let routed = match options.router.route(&route) {
            Ok(routed) => routed,
            Err(err) => {
                warn!(edge = id, error = %err, "edge could not be routed, keeping engine points");
                failures.push(ItemFailure {
                    kind: ItemKind::Edge,
                    id: id.to_string(),
                    message: err.message,
                });
                points.clone()
            }
        };
        let text = match (label.x, label.y) {
            (Some(x), Some(y)) if label.width > 0.0 || label.height > 0.0 => Some(LayoutLabel {
                x,
                y,
                width: label.width,
                height: label.height,
            }),
            _ => None,
        };
        fragment.edges.insert(
            id.to_string(),
            EdgeGeometry {
                points: routed,
                label: text,
                from_cluster,
                to_cluster,
            },
        );
    }
    Ok(fragment)
}

/// Maps the merged geometry back onto the input, in input order.
fn assemble(fragment: Fragment, ctx: &RenderContext) -> Result<LayoutResult> {
    let missing = |what: &str, id: &str| Error::Inconsistent {
        message: format!("{what} `{id}` is missing from the layout"),
    };

    let mut nodes = Vec::with_capacity(ctx.nodes.len());
    for (id, input) in &ctx.nodes {
        let (rect, is_cluster) = match (fragment.nodes.get(id), fragment.clusters.get(id)) {
            (Some(rect), _) => (*rect, false),
            (None, Some(cluster)) => (cluster.rect, true),
            (None, None) => return Err(missing("node", id)),
        };
        nodes.push(LayoutNode {
            id: id.clone(),
            parent_id: input.parent_id.clone(),
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            is_cluster,
            synthetic: ctx.is_synthetic(id),
        });
    }

    let mut clusters = Vec::with_capacity(ctx.clusters.len());
    for record in ctx.clusters.iter() {
        let Some(cluster) = fragment.clusters.get(&record.id) else {
            return Err(missing("cluster", &record.id));
        };
        clusters.push(LayoutCluster {
            id: record.id.clone(),
            parent_id: ctx.nodes.get(&record.id).and_then(|n| n.parent_id.clone()),
            x: cluster.rect.x,
            y: cluster.rect.y,
            width: cluster.rect.width,
            height: cluster.rect.height,
            collapsed: cluster.collapsed,
            depth: ctx.depth_of(&record.id),
        });
    }

    let mut edges = Vec::with_capacity(ctx.edges.len());
    for (id, planned) in &ctx.edges {
        let Some(geometry) = fragment.edges.get(id) else {
            return Err(missing("edge", id));
        };
        edges.push(LayoutEdge {
            id: id.clone(),
            start: planned.input.start.clone(),
            end: planned.input.end.clone(),
            from_cluster: geometry.from_cluster.clone(),
            to_cluster: geometry.to_cluster.clone(),
            points: geometry.points.clone(),
            label: geometry.label,
            arrow_type_start: planned.input.arrow_type_start.clone(),
            arrow_type_end: planned.input.arrow_type_end.clone(),
        });
    }

    Ok(LayoutResult {
        nodes,
        edges,
        clusters,
        bounds: fragment.bounds(),
        failures: ctx.failures.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use selkie_layered::graphlib::GraphOptions;

    #[test]
    fn injected_root_owns_top_level_nodes() {
        let mut g = LayoutGraph::new(GraphOptions::compound_multigraph());
        g.set_node("a", NodeLabel::default());
        g.set_node("I", NodeLabel::default());
        g.set_node("i", NodeLabel::default());
        g.set_parent("i", "I");
        inject_root_cluster_node(&mut g, "R");
        assert_eq!(g.parent("a"), Some("R"));
        assert_eq!(g.parent("I"), Some("R"));
        assert_eq!(g.parent("i"), Some("I"));
        assert_eq!(g.parent("R"), None);
    }

    #[test]
    fn sub_graph_beyond_the_limit_is_not_rendered() {
        let input = GraphInput {
            nodes: vec![
                NodeInput::new("G"),
                NodeInput::new("a").with_parent("G"),
            ],
            ..Default::default()
        };
        let mut ctx = RenderContext::new(input.config.clone());
        let graph = ctx.build_graph(&input).unwrap();
        let mut prepared = adjust_clusters_and_edges(graph, &mut ctx).unwrap();
        prepared.extracted.get_mut("G").unwrap().depth = ctx.config.max_depth + 1;

        let options = RenderOptions::default();
        let result = futures::executor::block_on(render_level(&mut prepared, &mut ctx, &options));
        let Err(err) = result else {
            panic!("expected the depth limit to stop the render");
        };
        assert!(matches!(err, Error::DepthExceeded { cluster, limit: 10 } if cluster == "G"));
    }

    #[test]
    fn fragment_translation_moves_everything() {
        let mut f = Fragment::default();
        f.nodes.insert("a".into(), Rect::from_center(0.0, 0.0, 10.0, 10.0));
        f.edges.insert(
            "e".into(),
            EdgeGeometry {
                points: vec![LayoutPoint::new(1.0, 1.0)],
                label: None,
                from_cluster: None,
                to_cluster: None,
            },
        );
        f.translate(5.0, -5.0);
        assert_eq!(f.nodes["a"].x, 5.0);
        assert_eq!(f.edges["e"].points[0], LayoutPoint::new(6.0, -4.0));
        let b = f.bounds().unwrap();
        assert_eq!((b.min_x, b.min_y, b.max_x, b.max_y), (0.0, -10.0, 10.0, 0.0));
    }
}
