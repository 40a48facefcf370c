//! Graph container APIs used by `selkie-layered` and `selkie-render`.
//!
//! The container is always directed. Two switches change its shape:
//! - `multigraph`: edges between the same pair of nodes are told apart by an optional name;
//! - `compound`: nodes may own child nodes (clusters).

#![forbid(unsafe_code)]

mod graph;

pub mod alg;

pub use graph::{EdgeKey, Graph, GraphOptions};
