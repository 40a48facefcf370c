use selkie_layered::{LayeredLayout, LayoutError, LayoutGraph};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<LayoutError> for EngineError {
    fn from(err: LayoutError) -> Self {
        Self::new(err.to_string())
    }
}

/// A layered layout engine.
///
/// Given a compound graph whose leaves carry `width`/`height`, an engine must assign `x`/`y`
/// centers to every node, boxes to compound nodes, and `points` to every edge. Node ids,
/// parent links and edge keys must be left untouched.
pub trait LayoutEngine {
    fn layout(&self, graph: &mut LayoutGraph) -> Result<(), EngineError>;
}

impl LayoutEngine for LayeredLayout {
    fn layout(&self, graph: &mut LayoutGraph) -> Result<(), EngineError> {
        Ok(self.run(graph)?)
    }
}
