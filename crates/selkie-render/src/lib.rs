#![forbid(unsafe_code)]

//! Headless layout of compound graphs.
//!
//! Nodes may be nested inside clusters and edges may cross cluster boundaries. The graph is
//! flattened into levels a plain layered engine can handle, each level is laid out bottom-up,
//! and the results are composed back into one coordinate space.
//!
//! ```no_run
//! use selkie_render::{GraphInput, RenderOptions, render_sync};
//!
//! let input = GraphInput::from_json_str(r#"{"nodes":[{"id":"a"},{"id":"b"}],
//!     "edges":[{"id":"e","start":"a","end":"b"}]}"#)?;
//! let result = render_sync(&input, &RenderOptions::default())?;
//! assert_eq!(result.nodes.len(), 2);
//! # Ok::<(), selkie_render::Error>(())
//! ```

pub mod adjust;
pub mod cluster;
pub mod config;
pub mod context;
pub mod descendants;
pub mod draw;
pub mod engine;
pub mod model;
mod render;
pub mod self_loop;
pub mod text;

pub use config::{Direction, LayoutConfig, TitleMargin};
pub use draw::{ClusterClipRouter, DrawError, EdgeRoute, EdgeRouter, LabelBoxDrawer, NodeDrawer, Size};
pub use engine::{EngineError, LayoutEngine};
pub use model::{
    Bounds, EdgeInput, GraphInput, ItemFailure, ItemKind, LayoutCluster, LayoutEdge, LayoutLabel,
    LayoutNode, LayoutPoint, LayoutResult, NodeInput,
};
pub use selkie_layered::{LayoutGraph, Rect};
pub use text::{DeterministicTextMeasurer, TextMeasurer, TextMetrics, TextStyle};

use selkie_layered::LayeredLayout;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("duplicate node id `{id}`")]
    DuplicateNode { id: String },
    #[error("duplicate edge id `{id}`")]
    DuplicateEdge { id: String },
    #[error("node `{node}` names unknown parent `{parent}`")]
    UnknownParent { node: String, parent: String },
    #[error("edge `{edge}` references unknown node `{node}`")]
    UnknownNode { edge: String, node: String },
    #[error("parent cycle detected at node `{node}`")]
    ParentCycle { node: String },
    #[error("graph too deeply nested: cluster `{cluster}` exceeds the depth limit of {limit}")]
    DepthExceeded { cluster: String, limit: usize },
    #[error("structural inconsistency: {message}")]
    Inconsistent { message: String },
    #[error("invalid layout configuration: {message}")]
    InvalidConfig { message: String },
    #[error("layout engine failed: {0}")]
    Engine(#[from] EngineError),
    #[error("{count} item(s) failed to render; first: {first}")]
    ItemFailures { count: usize, first: String },
    #[error("graph JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Collaborators used by a render call.
#[derive(Clone)]
pub struct RenderOptions {
    pub engine: Arc<dyn LayoutEngine + Send + Sync>,
    pub drawer: Arc<dyn NodeDrawer + Send + Sync>,
    pub router: Arc<dyn EdgeRouter + Send + Sync>,
    pub text_measurer: Arc<dyn TextMeasurer + Send + Sync>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            engine: Arc::new(LayeredLayout),
            drawer: Arc::new(LabelBoxDrawer::default()),
            router: Arc::new(ClusterClipRouter),
            text_measurer: Arc::new(DeterministicTextMeasurer::default()),
        }
    }
}

impl RenderOptions {
    /// Default collaborators, with the node drawer padding taken from `config`.
    pub fn for_config(config: &LayoutConfig) -> Self {
        Self {
            drawer: Arc::new(LabelBoxDrawer {
                padding: config.node_padding,
            }),
            ..Default::default()
        }
    }
}

/// Lays out `input`. Every call works on its own state; concurrent calls do not interact.
pub async fn render(input: &GraphInput, options: &RenderOptions) -> Result<LayoutResult> {
    render::render_graph(input, options).await
}

/// Blocking variant of [`render`].
pub fn render_sync(input: &GraphInput, options: &RenderOptions) -> Result<LayoutResult> {
    futures::executor::block_on(render(input, options))
}
