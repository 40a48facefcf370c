use selkie_graphlib::alg::{depth, hierarchy_order, lowest_common_parent};
use selkie_graphlib::{EdgeKey, Graph, GraphOptions};

fn graph() -> Graph<(), (), ()> {
    Graph::new(GraphOptions::compound_multigraph())
}

#[test]
fn hierarchy_order_lists_parents_before_children() {
    let mut g = graph();
    g.ensure_node("root1");
    g.set_parent("a", "root1");
    g.set_parent("b", "root1");
    g.set_parent("a1", "a");
    g.ensure_node("root2");

    assert_eq!(
        hierarchy_order(&g),
        vec!["root1", "root2", "a", "b", "a1"]
    );
}

#[test]
fn depth_and_lowest_common_parent_follow_parent_links() {
    let mut g = graph();
    g.set_parent("x", "inner");
    g.set_parent("inner", "outer");
    g.set_parent("y", "outer");

    assert_eq!(depth(&g, "x"), 2);
    assert_eq!(depth(&g, "outer"), 0);
    assert_eq!(
        lowest_common_parent(&g, "x", "y").as_deref(),
        Some("outer")
    );
    assert_eq!(lowest_common_parent(&g, "outer", "y"), None);
}

#[test]
fn edges_keep_insertion_order_after_removal() {
    let mut g = graph();
    g.set_edge_named("a", "b", Some("e1"), None);
    g.set_edge_named("b", "c", Some("e2"), None);
    g.set_edge_named("a", "c", Some("e3"), None);
    assert!(g.remove_edge("b", "c", Some("e2")));

    let names: Vec<_> = g.edges().filter_map(|k| k.name.clone()).collect();
    assert_eq!(names, vec!["e1", "e3"]);
    assert!(g.has_edge("a", "c", Some("e3")));
    assert!(!g.has_edge("a", "c", Some("e2")));
}

#[test]
fn node_edges_and_neighbours_are_collected_per_node() {
    let mut g = graph();
    g.set_edge("a", "b");
    g.set_edge("c", "a");
    g.set_edge_named("a", "b", Some("parallel"), None);

    assert_eq!(g.node_edges("a").len(), 3);
    assert_eq!(g.successors("a"), vec!["b"]);
    assert_eq!(g.predecessors("a"), vec!["c"]);
    assert_eq!(g.sources(), vec!["c"]);
    assert_eq!(g.out_edges("a", Some("b")).len(), 2);
    assert_eq!(
        g.in_edges("b", None),
        vec![
            EdgeKey::new("a", "b", None::<String>),
            EdgeKey::new("a", "b", Some("parallel")),
        ]
    );
}

#[test]
fn flat_graph_ignores_parent_links() {
    let mut g: Graph<(), (), ()> = Graph::new(GraphOptions::default());
    g.set_parent("a", "p");
    assert_eq!(g.parent("a"), None);
    assert!(!g.has_node("a"));
}
