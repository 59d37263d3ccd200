//! End-to-end matching scenarios, plus a brute-force cross-check of the counts.

use std::sync::atomic::{AtomicBool, Ordering};

use multigraph::{CsrMatrix, Graph};
use templar::{Config, FilterSet, Search, SolutionTree, Update};

fn graph(n: usize, channels: Vec<(&str, Vec<(usize, usize, u32)>)>) -> Graph {
    let names = channels.iter().map(|(name, _)| (*name).to_owned()).collect();
    let adjs = channels
        .into_iter()
        .map(|(_, triplets)| CsrMatrix::from_triplets(n, n, triplets))
        .collect();
    Graph::from_indexed_nodes("g", n, names, adjs)
}

fn single_channel(n: usize, triplets: Vec<(usize, usize, u32)>) -> Graph {
    graph(n, vec![("0", triplets)])
}

fn run(template: Graph, world: Graph, config: Config) -> SolutionTree {
    let search = Search::new(template, world, config).expect("search setup failed");
    search.run(|_| {}, &AtomicBool::new(false))
}

fn count(template: Graph, world: Graph) -> u128 {
    run(template, world, Config::default()).isomorphism_count()
}

/// Every injective map of template nodes to world nodes, checked directly against the
/// multiplicity dominance condition.  Exponential, so only for tiny instances.
fn brute_force_count(template: &Graph, world: &Graph) -> u128 {
    fn recurse(template: &Graph, world: &Graph, assignment: &mut Vec<usize>) -> u128 {
        let t = assignment.len();
        if t == template.n_nodes() {
            return 1;
        }
        let mut total = 0;
        for w in 0..world.n_nodes() {
            if assignment.contains(&w) {
                continue;
            }
            assignment.push(w);
            let consistent = (0..template.n_channels()).all(|c| {
                (0..assignment.len()).all(|u| {
                    (0..assignment.len()).all(|v| {
                        world.adj(c).get(assignment[u], assignment[v])
                            >= template.adj(c).get(u, v)
                    })
                })
            });
            if consistent {
                total += recurse(template, world, assignment);
            }
            assignment.pop();
        }
        total
    }
    recurse(template, world, &mut Vec::new())
}

/// A complete directed graph (an edge in both directions between every pair).
fn complete(n: usize) -> Graph {
    let mut triplets = Vec::new();
    for i in 0..n {
        for j in 0..n {
            if i != j {
                triplets.push((i, j, 1));
            }
        }
    }
    single_channel(n, triplets)
}

#[test]
fn two_disjoint_edges_in_k4() {
    // 4 template nodes, all classes trivial, but the world is fully symmetric: all 24 ordered
    // injections are isomorphisms and the compression finds them in a single match event.
    let template = single_channel(4, vec![(0, 1, 1), (2, 3, 1)]);
    let tree = run(template, complete(4), Config::default());
    assert_eq!(tree.isomorphism_count(), 24);
    assert_eq!(tree.match_count(), 1);
}

#[test]
fn triangle_in_itself() {
    let triangle = vec![(0, 1, 1), (1, 2, 1), (2, 0, 1)];
    let tree = run(
        single_channel(3, triangle.clone()),
        single_channel(3, triangle),
        Config::default(),
    );
    // The three rotations, one frame each
    assert_eq!(tree.isomorphism_count(), 3);
    assert_eq!(tree.match_count(), 3);
}

#[test]
fn missing_channel_gives_zero_matches() {
    // The template needs the edge in both channels; the world only carries channel "a"
    let template = graph(2, vec![("a", vec![(0, 1, 1)]), ("b", vec![(0, 1, 1)])]);
    let world = graph(2, vec![("a", vec![(0, 1, 1)]), ("b", vec![])]);
    let tree = run(template, world, Config::default());
    assert_eq!(tree.isomorphism_count(), 0);
    assert!(tree.is_unsatisfiable());
}

#[test]
fn self_loops_filter_down_to_loop_nodes() {
    let template = single_channel(1, vec![(0, 0, 1)]);
    // Three self-loop nodes, two plain nodes
    let world = single_channel(5, vec![(0, 0, 1), (2, 2, 1), (4, 4, 1), (1, 3, 1)]);
    let search = Search::new(template, world, Config::default()).unwrap();
    // Filtering reduces the world to exactly the loop nodes
    assert_eq!(search.world().n_nodes(), 3);
    let tree = search.run(|_| {}, &AtomicBool::new(false));
    assert_eq!(tree.isomorphism_count(), 3);
}

#[test]
fn equivalent_template_pair_counts_twice_from_one_leaf() {
    // 0 -> 1 -> 2 -> {3, 4}; nodes 3 and 4 are structurally equivalent
    let edges = vec![(0, 1, 1), (1, 2, 1), (2, 3, 1), (2, 4, 1)];
    let template = single_channel(5, edges.clone());
    let world = single_channel(5, edges);
    let search = Search::new(template, world, Config::default()).unwrap();
    assert_eq!(search.candidate_structure().supernode_count(), 4);

    let tree = search.run(|_| {}, &AtomicBool::new(false));
    // One valid assignment up to swapping 3 and 4
    assert_eq!(tree.isomorphism_count(), 2);
    assert_eq!(tree.match_count(), 1);
    assert_eq!(tree.paths().len(), 1);
}

#[test]
fn cap_iso_stops_early_with_a_valid_prefix() {
    // An edge template in a directed 100-cycle: 100 isomorphisms, none interchangeable
    let cycle: Vec<(usize, usize, u32)> = (0..100).map(|i| (i, (i + 1) % 100, 1)).collect();
    let template = single_channel(2, vec![(0, 1, 1)]);
    let world = single_channel(100, cycle);
    let config = Config {
        cap_iso: Some(10),
        ..Config::default()
    };
    let tree = run(template, world, config);
    assert!(tree.isomorphism_count() >= 10);
    assert!(tree.isomorphism_count() <= 11);
    // Each match was recorded exactly once
    assert_eq!(u128::from(tree.match_count()), tree.isomorphism_count());
    assert_eq!(tree.paths().len() as u64, tree.match_count());
}

#[test]
fn cap_matches_stops_after_n_events() {
    let template = single_channel(2, vec![(0, 1, 1)]);
    let cycle: Vec<(usize, usize, u32)> = (0..50).map(|i| (i, (i + 1) % 50, 1)).collect();
    let world = single_channel(50, cycle);
    let config = Config {
        cap_matches: Some(5),
        ..Config::default()
    };
    let tree = run(template, world, config);
    assert_eq!(tree.match_count(), 5);
}

#[test]
fn abort_flag_stops_the_search() {
    let template = single_channel(2, vec![(0, 1, 1)]);
    let tree = {
        let search = Search::new(template, complete(6), Config::default()).unwrap();
        let flag = AtomicBool::new(false);
        flag.store(true, Ordering::SeqCst); // aborted before the first frame
        let mut saw_aborting = false;
        let tree = search.run(
            |update| {
                if matches!(update, Update::Aborting) {
                    saw_aborting = true;
                }
            },
            &flag,
        );
        assert!(saw_aborting);
        tree
    };
    assert_eq!(tree.isomorphism_count(), 0);
}

#[test]
fn completion_update_is_sent() {
    let template = single_channel(2, vec![(0, 1, 1)]);
    let world = single_channel(3, vec![(0, 1, 1), (1, 2, 1)]);
    let search = Search::new(template, world, Config::default()).unwrap();
    let mut updates = Vec::new();
    search.run(|u| updates.push(u), &AtomicBool::new(false));
    assert!(matches!(updates.last(), Some(Update::Complete)));
    let n_matches = updates
        .iter()
        .filter(|u| matches!(u, Update::Match { .. }))
        .count();
    assert_eq!(n_matches, 2);
}

#[test]
fn channel_mismatch_is_an_error() {
    let template = graph(2, vec![("a", vec![(0, 1, 1)])]);
    let world = graph(2, vec![("b", vec![(0, 1, 1)])]);
    assert!(Search::new(template, world, Config::default()).is_err());
}

#[test]
fn signal_nodes_cover_participating_worlds() {
    // Template edge into a world with two disjoint edges and one stray node
    let template = single_channel(2, vec![(0, 1, 1)]);
    let world = single_channel(5, vec![(0, 1, 1), (2, 3, 1)]);
    let tree = run(template, world, Config::default());
    assert_eq!(tree.isomorphism_count(), 2);
    assert_eq!(
        tree.signal_nodes().into_iter().collect::<Vec<_>>(),
        vec![0, 1, 2, 3]
    );
}

#[test]
fn multiplicities_must_dominate() {
    // Doubled template edge fits only the doubled world edge
    let template = single_channel(2, vec![(0, 1, 2)]);
    let world = single_channel(4, vec![(0, 1, 2), (2, 3, 1)]);
    assert_eq!(count(template, world), 1);
}

#[test]
fn all_filters_agree_with_cheap_filters_on_counts() {
    let template = single_channel(3, vec![(0, 1, 1), (1, 2, 1), (2, 0, 1)]);
    let world = complete(5);
    let cheap = run(
        single_channel(3, vec![(0, 1, 1), (1, 2, 1), (2, 0, 1)]),
        complete(5),
        Config::default(),
    );
    let all = run(
        template,
        world,
        Config {
            filter_set: FilterSet::All,
            ..Config::default()
        },
    );
    assert_eq!(cheap.isomorphism_count(), all.isomorphism_count());
    assert_eq!(cheap.isomorphism_count(), 60); // 5 * 4 * 3 ordered triangles
}

#[test]
fn counts_match_brute_force_on_asymmetric_worlds() {
    let template = single_channel(3, vec![(0, 1, 1), (1, 2, 1)]);
    // A lopsided world: a path, a triangle and a chord
    let world = single_channel(
        6,
        vec![(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 4, 1), (4, 2, 1), (1, 4, 1)],
    );
    let expected = brute_force_count(
        &single_channel(3, vec![(0, 1, 1), (1, 2, 1)]),
        &single_channel(
            6,
            vec![(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 4, 1), (4, 2, 1), (1, 4, 1)],
        ),
    );
    assert_eq!(count(template, world), expected);
}

#[test]
fn counts_match_brute_force_on_multichannel_worlds() {
    let template = graph(
        2,
        vec![("a", vec![(0, 1, 1)]), ("b", vec![(1, 0, 1)])],
    );
    let world = graph(
        4,
        vec![
            ("a", vec![(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 0, 1)]),
            ("b", vec![(1, 0, 1), (3, 2, 1), (0, 3, 1)]),
        ],
    );
    let expected = brute_force_count(
        &graph(2, vec![("a", vec![(0, 1, 1)]), ("b", vec![(1, 0, 1)])]),
        &graph(
            4,
            vec![
                ("a", vec![(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 0, 1)]),
                ("b", vec![(1, 0, 1), (3, 2, 1), (0, 3, 1)]),
            ],
        ),
    );
    assert_eq!(count(template, world), expected);
}
