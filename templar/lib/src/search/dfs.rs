//! The recursive matcher: a depth-first search with restorable state.
//!
//! Every frame owns a clone of the candidate structure, so that the candidate-matrix narrowing
//! done on the way down is undone by simply returning.  The partial match is the only state
//! threaded through the whole path; it is pushed before each descent and popped after.
//!
//! World-side compression: at each frame the candidates of the chosen supernode are partitioned
//! into structural-equivalence classes of the working world.  Swapping two equivalent, unmatched
//! world nodes is a world automorphism fixing everything else, so only one representative image
//! per class signature is explored and the solution tree is told how many interchangeable
//! variants it stands for.

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use multigraph::structural_classes;

use crate::{
    search::{ordering, Config, MatchEntry, PartialMatch, Progress, Search, Update},
    solution::SolutionTree,
    structure::CandidateStructure,
    supernode::{Supernode, SupernodeIdx},
};

const ITERS_BETWEEN_PROGRESS_UPDATES: usize = 10_000;

/// Searches the candidate structure for isomorphisms.
pub(crate) fn search(
    search: &Search,
    mut update_fn: impl FnMut(Update),
    abort_flag: &AtomicBool,
) -> SolutionTree {
    let mut tree = SolutionTree::new(
        search.initial_ordering().to_vec(),
        search.candidate_structure().supernode_count(),
        search.config().count_only,
    );
    let mut ctx = Ctx {
        update_fn: &mut update_fn,
        abort_flag,
        config: search.config(),
        iter_count: 0,
        aborted: false,
    };
    let cs = search.candidate_structure();

    // A failed satisfiability check here means filtering already emptied some class; the search
    // would discover the same at its first frame, but there's no point cloning for that.
    if cs.check_satisfiability() {
        let mut pm = PartialMatch::new(cs.supernode_count());
        match_frame(cs.clone(), &mut pm, &mut tree, &mut ctx);
    }

    ctx.send_progress(&tree, 0);
    (ctx.update_fn)(if ctx.aborted {
        Update::Aborting
    } else {
        Update::Complete
    });
    tree
}

/// Per-search mutable state threaded through the recursion alongside the partial match.
struct Ctx<'s> {
    update_fn: &'s mut dyn FnMut(Update),
    abort_flag: &'s AtomicBool,
    config: &'s Config,
    iter_count: usize,
    aborted: bool,
}

impl Ctx<'_> {
    fn send_progress(&mut self, tree: &SolutionTree, depth: usize) {
        (self.update_fn)(Update::Progress(Progress {
            iter_count: self.iter_count,
            n_isomorphisms: tree.isomorphism_count(),
            n_match_events: tree.match_count(),
            depth,
            aborting: self.aborted,
        }));
    }
}

/// One frame of the DFS.  Returns `false` to unwind the entire search (abort or cap hit).
fn match_frame(
    mut cs: CandidateStructure,
    pm: &mut PartialMatch,
    tree: &mut SolutionTree,
    ctx: &mut Ctx,
) -> bool {
    ctx.iter_count += 1;
    if ctx.abort_flag.load(AtomicOrdering::Relaxed) {
        ctx.aborted = true;
        return false;
    }
    if ctx.iter_count % ITERS_BETWEEN_PROGRESS_UPDATES == 0 {
        ctx.send_progress(tree, pm.len());
    }

    // Base case: every supernode is bound
    if pm.len() == cs.supernode_count() {
        tree.add_solution(pm);
        log::debug!(
            "found a match; isomorphism count now {}",
            tree.isomorphism_count()
        );
        (ctx.update_fn)(Update::Match {
            entries: pm.entries().to_vec(),
            n_isomorphisms: tree.isomorphism_count(),
        });
        if caps_reached(ctx.config, tree) {
            ctx.aborted = true;
            return false;
        }
        return true;
    }

    // Propagate the latest binding, and re-filter only when it narrowed anything
    if let Some(last) = pm.last() {
        let (sn, image) = (last.supernode, last.image.clone());
        if cs.update_candidates(sn, &image) {
            let cleared = cs.run_cheap_filters();
            if cleared > 0 {
                log::debug!("depth {}: filters cleared {cleared} bits", pm.len());
            }
        }
    }
    if !cs.check_satisfiability() {
        return true; // dead branch, not an error
    }

    let next = ordering::next_supernode(&cs, pm);
    for option in candidate_options(&cs, pm, next) {
        if !is_joinable(pm, &cs, next, &option.image) {
            continue;
        }
        pm.push(option);
        let keep_going = match_frame(cs.clone(), pm, tree, ctx);
        pm.pop();
        if !keep_going {
            return false;
        }
    }
    true
}

fn caps_reached(config: &Config, tree: &SolutionTree) -> bool {
    let iso_capped = config
        .cap_iso
        .is_some_and(|cap| tree.isomorphism_count() >= cap);
    let match_capped = config
        .cap_matches
        .is_some_and(|cap| tree.match_count() >= cap);
    iso_capped || match_capped
}

/// Joinability: can `image` be bound to `sn` on top of `pm`?
///
/// Requires (i) all-different: the image avoids every already-matched world vertex, (ii) the
/// clique condition on the image, and (iii) a candidate-edge to every already-matched neighbour
/// supernode, in the direction of each superedge, in every channel.
pub fn is_joinable(
    pm: &PartialMatch,
    cs: &CandidateStructure,
    sn: SupernodeIdx,
    image: &Supernode,
) -> bool {
    debug_assert!(!pm.is_matched(sn), "joining an already-bound supernode");
    debug_assert_eq!(
        cs.supernode(sn).len(),
        image.len(),
        "image size must match the supernode"
    );

    if !pm.is_disjoint_from_matched(image) {
        return false;
    }
    if !cs.supernode_clique_and_cand_node_clique(sn, image) {
        return false;
    }
    for channel in 0..cs.template().n_channels() {
        for &inbr in cs.incoming_neighbors(sn, channel) {
            if let Some(nbr_image) = pm.image_of(inbr) {
                if !cs.has_cand_edge((inbr, nbr_image), (sn, image), channel) {
                    return false;
                }
            }
        }
        for &onbr in cs.outgoing_neighbors(sn, channel) {
            if let Some(nbr_image) = pm.image_of(onbr) {
                if !cs.has_cand_edge((sn, image), (onbr, nbr_image), channel) {
                    return false;
                }
            }
        }
    }
    true
}

/// The candidate images of `sn`, compressed by world-side equivalence.
///
/// Candidates are first partitioned into structural-equivalence classes of the working world
/// (matched vertices excluded, so each class swap fixes the rest of the partial match).  Every
/// `|sn|`-subset of the candidates then belongs to exactly one *signature* (how many vertices
/// it draws from each class), and all subsets with the same signature are automorphic images of
/// each other.  One representative per signature is returned, weighted by the number of subsets
/// it stands for; its participants are every vertex of the classes it draws from.
pub(crate) fn candidate_options(
    cs: &CandidateStructure,
    pm: &PartialMatch,
    sn: SupernodeIdx,
) -> Vec<MatchEntry> {
    let k = cs.supernode(sn).len();
    let candidates: Vec<usize> = cs
        .candidate_vertices(sn)
        .into_iter()
        .filter(|&w| !pm.is_world_vertex_matched(w))
        .collect();
    if candidates.len() < k {
        return Vec::new();
    }

    let classes = structural_classes(cs.world(), &candidates);
    let mut options = Vec::new();
    let mut counts = vec![0usize; classes.len()];
    build_signatures(sn, &classes, k, 0, &mut counts, &mut options);

    // Small classes first: fewer variants means a cheaper subtree to prove or refute
    options.sort_by(|a, b| (a.n_variants, &a.image).cmp(&(b.n_variants, &b.image)));
    options
}

/// Recursively enumerates the class signatures `(counts[0], counts[1], ...)` summing to `k`,
/// emitting one representative entry per signature.
fn build_signatures(
    sn: SupernodeIdx,
    classes: &[Vec<usize>],
    remaining: usize,
    class_idx: usize,
    counts: &mut Vec<usize>,
    options: &mut Vec<MatchEntry>,
) {
    if remaining == 0 {
        let image = Supernode::new(
            classes
                .iter()
                .zip(counts.iter())
                .flat_map(|(class, &take)| class.iter().copied().take(take)),
        );
        let participants = Supernode::new(
            classes
                .iter()
                .zip(counts.iter())
                .filter(|&(_, &take)| take > 0)
                .flat_map(|(class, _)| class.iter().copied()),
        );
        let n_variants = classes
            .iter()
            .zip(counts.iter())
            .map(|(class, &take)| binomial(class.len(), take))
            .product();
        options.push(MatchEntry {
            supernode: sn,
            image,
            participants,
            n_variants,
        });
        return;
    }
    if class_idx == classes.len() {
        return;
    }
    // Leave enough candidates in the remaining classes to reach the target size
    let available_later: usize = classes[class_idx + 1..].iter().map(Vec::len).sum();
    let min_take = remaining.saturating_sub(available_later);
    let max_take = remaining.min(classes[class_idx].len());
    for take in min_take..=max_take {
        counts[class_idx] = take;
        build_signatures(sn, classes, remaining - take, class_idx + 1, counts, options);
    }
    counts[class_idx] = 0;
}

fn binomial(n: usize, k: usize) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result = 1u64;
    for i in 0..k {
        result = result * (n - i) as u64 / (i + 1) as u64;
    }
    result
}
