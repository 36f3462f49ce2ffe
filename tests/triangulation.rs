use bnet::graph::{node_set, Dag, UndiGraph};
use bnet::triangulation::{OrderedEliminationStrategy, Triangulation, TriangulationConfig};

use proptest::prelude::*;

use std::collections::BTreeMap;


/// A number of nodes and a list of candidate edges between them
fn graph_strategy() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..12).prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n), 0..(3 * n))))
}


fn undigraph(n: usize, edges: &[(usize, usize)]) -> UndiGraph {
    let mut graph = UndiGraph::new();
    for i in 0..n {
        graph.add_node_with_id(i).unwrap();
    }
    for &(a, b) in edges.iter().filter(|(a, b)| a != b) {
        graph.add_edge(a, b).unwrap();
    }
    graph
}


/// Arcs only go from smaller to larger ids, so the graph is acyclic
fn dag(n: usize, edges: &[(usize, usize)]) -> Dag {
    let mut dag = Dag::new();
    for i in 0..n {
        dag.add_node_with_id(i).unwrap();
    }
    for &(a, b) in edges.iter().filter(|(a, b)| a != b) {
        dag.add_arc(a.min(b), a.max(b)).unwrap();
    }
    dag
}


fn domain_sizes(n: usize) -> BTreeMap<usize, usize> {
    (0..n).map(|i| (i, 2 + i % 3)).collect()
}


proptest! {
    #[test]
    fn triangulated_graph_is_chordal((n, edges) in graph_strategy()) {
        let graph = undigraph(n, &edges);
        let mut triangulation = Triangulation::default();
        triangulation.set_graph(&graph, &domain_sizes(n)).unwrap();

        let triangulated = triangulation.triangulated_graph().unwrap().clone();
        prop_assert!(triangulated.is_chordal());
        for (a, b) in graph.edges() {
            prop_assert!(triangulated.exists_edge(a, b));
        }
        for &(a, b) in triangulation.fill_ins().unwrap() {
            prop_assert!(!graph.exists_edge(a, b));
            prop_assert!(triangulated.exists_edge(a, b));
        }

        let mut order = triangulation.elimination_order().unwrap().to_vec();
        order.sort();
        prop_assert_eq!((0..n).collect::<Vec<_>>(), order);
    }

    #[test]
    fn imposed_order_is_followed((n, edges) in graph_strategy()) {
        let graph = undigraph(n, &edges);
        let order: Vec<usize> = (0..n).rev().collect();
        let mut triangulation = Triangulation::new(OrderedEliminationStrategy::new(order.clone()));
        triangulation.set_graph(&graph, &domain_sizes(n)).unwrap();

        prop_assert_eq!(&order[..], triangulation.elimination_order().unwrap());
        prop_assert!(triangulation.triangulated_graph().unwrap().is_chordal());
    }

    #[test]
    fn junction_tree_has_running_intersection((n, edges) in graph_strategy()) {
        let moral = dag(n, &edges).moral_graph();
        let config = TriangulationConfig::default().with_quasi_ratio(0.9).with_weight_threshold(0.2);
        let mut triangulation = Triangulation::with_config(config);
        triangulation.set_graph(&moral, &domain_sizes(n)).unwrap();

        let junction_tree = triangulation.junction_tree().unwrap().clone();
        prop_assert!(junction_tree.is_junction_tree());

        // every family of the DAG fits in a clique
        for (a, b) in moral.edges() {
            prop_assert!(triangulation.clique_containing(&node_set(vec![a, b])).is_ok());
        }
        for node in 0..n {
            let clique = triangulation.created_clique(node).unwrap();
            prop_assert!(junction_tree.clique(clique).unwrap().contains(&node));
        }
    }
}
