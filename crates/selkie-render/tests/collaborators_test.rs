use std::sync::{Arc, Mutex};

use selkie_layered::{LayeredLayout, RankDir};
use selkie_render::{
    DrawError, EdgeInput, EdgeRoute, EdgeRouter, EngineError, Error, GraphInput, ItemKind,
    LayoutEngine, LayoutGraph, LayoutPoint, NodeDrawer, NodeInput, RenderOptions, Size,
    TextMeasurer, TextStyle, render, render_sync,
};

#[derive(Debug, Clone, PartialEq)]
struct Pass {
    nodes: Vec<String>,
    sizes: Vec<(String, f64, f64)>,
    ranksep: f64,
    rankdir: RankDir,
}

#[derive(Default)]
struct RecordingEngine {
    passes: Mutex<Vec<Pass>>,
}

impl LayoutEngine for RecordingEngine {
    fn layout(&self, graph: &mut LayoutGraph) -> Result<(), EngineError> {
        let pass = Pass {
            nodes: graph.node_ids(),
            sizes: graph
                .nodes()
                .filter_map(|id| graph.node(id).map(|n| (id.to_string(), n.width, n.height)))
                .collect(),
            ranksep: graph.graph().ranksep,
            rankdir: graph.graph().rankdir,
        };
        self.passes.lock().unwrap().push(pass);
        LayeredLayout.layout(graph)
    }
}

fn nested() -> GraphInput {
    GraphInput {
        nodes: vec![
            NodeInput::new("O"),
            NodeInput::new("I").with_parent("O"),
            NodeInput::new("i1").with_parent("I"),
            NodeInput::new("i2").with_parent("I"),
            NodeInput::new("x"),
        ],
        edges: vec![EdgeInput::new("e1", "i1", "i2"), EdgeInput::new("e2", "x", "O")],
        ..Default::default()
    }
}

#[test]
fn inner_clusters_are_laid_out_before_their_parents() {
    let engine = Arc::new(RecordingEngine::default());
    let options = RenderOptions {
        engine: engine.clone(),
        ..Default::default()
    };
    let result = render_sync(&nested(), &options).unwrap();

    let passes = engine.passes.lock().unwrap().clone();
    assert_eq!(passes.len(), 3);
    let has = |pass: &Pass, id: &str| pass.nodes.iter().any(|n| n == id);

    assert!(has(&passes[0], "i1") && has(&passes[0], "I"));
    assert!(has(&passes[1], "I") && !has(&passes[1], "i1"));
    assert!(has(&passes[2], "O") && has(&passes[2], "x") && !has(&passes[2], "I"));

    // The placeholder for I was sized from the inner pass before the middle pass ran.
    let inner = result.cluster("I").unwrap();
    let (_, w, h) = passes[1]
        .sizes
        .iter()
        .find(|(id, _, _)| id == "I")
        .cloned()
        .unwrap();
    assert!((w - inner.width).abs() < 1e-9);
    assert!((h - inner.height).abs() < 1e-9);
    assert!(w > 1.0 && h > 1.0);
}

#[test]
fn nested_levels_alternate_direction_and_widen_rank_spacing() {
    let engine = Arc::new(RecordingEngine::default());
    let options = RenderOptions {
        engine: engine.clone(),
        ..Default::default()
    };
    render_sync(&nested(), &options).unwrap();

    let passes = engine.passes.lock().unwrap();
    let summary: Vec<(f64, RankDir)> = passes.iter().map(|p| (p.ranksep, p.rankdir)).collect();
    assert_eq!(
        summary,
        [(100.0, RankDir::TB), (75.0, RankDir::LR), (50.0, RankDir::TB)]
    );
}

struct FailingDrawer;

impl NodeDrawer for FailingDrawer {
    fn draw(
        &self,
        node: &NodeInput,
        _measurer: &dyn TextMeasurer,
        _style: &TextStyle,
    ) -> Result<Size, DrawError> {
        if node.id == "bad" {
            return Err(DrawError::new("shape `cloud` is not supported"));
        }
        Ok(Size::new(20.0, 10.0))
    }
}

#[test]
fn drawer_failures_degrade_only_the_failing_node() {
    let input = GraphInput {
        nodes: vec![NodeInput::new("good"), NodeInput::new("bad").with_size(12.0, 6.0)],
        edges: vec![EdgeInput::new("e", "good", "bad")],
        ..Default::default()
    };
    let options = RenderOptions {
        drawer: Arc::new(FailingDrawer),
        ..Default::default()
    };
    let result = render_sync(&input, &options).unwrap();

    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].kind, ItemKind::Node);
    assert_eq!(result.failures[0].id, "bad");
    let bad = result.node("bad").unwrap();
    assert_eq!((bad.width, bad.height), (12.0, 6.0));
    assert_eq!(result.node("good").unwrap().width, 20.0);

    let err = result.into_strict().unwrap_err();
    assert!(matches!(err, Error::ItemFailures { count: 1, .. }));
}

struct RejectingRouter;

impl EdgeRouter for RejectingRouter {
    fn route(&self, route: &EdgeRoute<'_>) -> Result<Vec<LayoutPoint>, DrawError> {
        if route.edge_id == "skip" {
            return Err(DrawError::new("no path"));
        }
        Ok(route.points.to_vec())
    }
}

#[test]
fn router_failures_keep_engine_points() {
    let input = GraphInput {
        nodes: vec![NodeInput::new("a"), NodeInput::new("b")],
        edges: vec![EdgeInput::new("skip", "a", "b"), EdgeInput::new("keep", "b", "a")],
        ..Default::default()
    };
    let options = RenderOptions {
        router: Arc::new(RejectingRouter),
        ..Default::default()
    };
    let result = render_sync(&input, &options).unwrap();
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].kind, ItemKind::Edge);
    assert!(!result.edge("skip").unwrap().points.is_empty());
}

struct BrokenEngine;

impl LayoutEngine for BrokenEngine {
    fn layout(&self, _graph: &mut LayoutGraph) -> Result<(), EngineError> {
        Err(EngineError::new("out of paper"))
    }
}

#[test]
fn engine_failures_abort_the_render() {
    let options = RenderOptions {
        engine: Arc::new(BrokenEngine),
        ..Default::default()
    };
    let err = render_sync(&nested(), &options).unwrap_err();
    assert!(matches!(err, Error::Engine(e) if e.message == "out of paper"));
}

#[test]
fn async_and_blocking_entry_points_agree() {
    let options = RenderOptions::default();
    let input = nested();
    let blocking = render_sync(&input, &options).unwrap();
    let awaited = futures::executor::block_on(render(&input, &options)).unwrap();
    assert_eq!(blocking, awaited);
}
