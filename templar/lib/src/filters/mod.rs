//! The constraint-propagation filter pipeline.
//!
//! Every filter is a monotone operator on the candidate matrix: it may only *clear* bits.  The
//! pipeline runs its filters round-robin until a full round clears nothing, which terminates
//! because the matrix only shrinks.  An all-zero row at any point means the instance is
//! unsatisfiable; filters don't treat that specially, the matcher reads it off the matrix.

mod elimination;
mod neighborhood;
mod stats;
mod topology;

pub use elimination::elimination_filter;
pub use neighborhood::neighborhood_filter;
pub use stats::stats_filter;
pub use topology::topology_filter;

use multigraph::Graph;

use crate::candidates::CandidateMatrix;

/// Which filters the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSet {
    /// Statistics and topology only: cheap enough to re-run at every search frame.
    Cheap,
    /// The cheap filters plus all-different elimination and the neighborhood (Hall condition)
    /// filter.  Worth it once, before the search starts.
    All,
}

impl FilterSet {
    fn run_round(self, template: &Graph, world: &Graph, m: &mut CandidateMatrix) -> usize {
        let mut cleared = stats_filter(template, world, m);
        cleared += topology_filter(template, world, m);
        if self == FilterSet::All {
            cleared += elimination_filter(template, world, m);
            cleared += neighborhood_filter(template, world, m, 0);
        }
        cleared
    }
}

/// Runs the selected filters to a joint fixpoint.  Returns the total number of bits cleared.
pub fn run_to_fixpoint(
    template: &Graph,
    world: &Graph,
    m: &mut CandidateMatrix,
    set: FilterSet,
) -> usize {
    let mut total = 0;
    loop {
        let cleared = set.run_round(template, world, m);
        total += cleared;
        if cleared == 0 {
            return total;
        }
        log::debug!("filter round cleared {cleared} candidate bits");
        if m.first_empty_row().is_some() {
            // Unsatisfiable; no point polishing the rest of the matrix
            return total;
        }
    }
}

/// The world nodes which are still a candidate for at least one template node.
///
/// When this is a strict subset of the world, the caller can induce the world subgraph on it and
/// [`compact`](CandidateMatrix::compact_world) the matrix: dropped nodes can never appear in a
/// match.
pub fn live_world_nodes(m: &CandidateMatrix) -> Vec<usize> {
    (0..m.n_world())
        .filter(|&w| m.is_candidate_for_any(w))
        .collect()
}
