//! Graph configuration options.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphOptions {
    pub multigraph: bool,
    pub compound: bool,
}

impl GraphOptions {
    /// Options used by every layout pass: parallel edges and clusters are both allowed.
    pub fn compound_multigraph() -> Self {
        Self {
            multigraph: true,
            compound: true,
        }
    }
}
