//! The search driver, along with the code for interacting with in-progress searches.

mod dfs;
mod ordering;
mod partial_match;

pub use partial_match::{MatchEntry, PartialMatch};

use std::sync::{atomic::AtomicBool, Arc};

use multigraph::{structural_partition, Graph};

use crate::{
    candidates::CandidateMatrix,
    filters::{self, FilterSet},
    solution::SolutionTree,
    structure::CandidateStructure,
    supernode::SupernodeIdx,
    Error,
};

pub use dfs::is_joinable;

/// Handle to a subgraph-isomorphism search.
///
/// [`Search::new`] does all the up-front work (partitioning the template into supernodes,
/// seeding and filtering the candidate matrix, reducing the world) and reports problems with
/// the inputs as errors.  **The search itself doesn't start until [`Search::run`] is called.**
#[derive(Debug)]
pub struct Search {
    template: Arc<Graph>,
    cs: CandidateStructure,
    /// The static ordering; fixes the solution tree's reporting order.
    initial_ordering: Vec<SupernodeIdx>,
    config: Config,
}

impl Search {
    /// Prepares a search for every injective homomorphism of `template` into `world`.
    ///
    /// The two graphs must agree on their channel lists (see
    /// [`align_channels`](multigraph::edgelist::align_channels) for getting them to agree).
    pub fn new(template: Graph, world: Graph, config: Config) -> crate::Result<Self> {
        if template.n_nodes() == 0 {
            return Err(Error::EmptyTemplate);
        }
        if template.channels() != world.channels() {
            return Err(Error::ChannelMismatch {
                template: template.channels().to_vec(),
                world: world.channels().to_vec(),
            });
        }

        let template = Arc::new(template);
        let classes = structural_partition(&template);
        log::info!(
            "template: {} nodes in {} supernodes",
            template.n_nodes(),
            classes.n_classes()
        );

        // Seed the candidate matrix and run the configured filters to a fixpoint, shrinking the
        // world whenever nodes drop out of every candidate set.  Removing nodes lowers degrees,
        // which can give the filters fresh traction, hence the outer loop.
        let mut world = world;
        let mut matrix = CandidateMatrix::full(template.n_nodes(), world.n_nodes());
        loop {
            let cleared =
                filters::run_to_fixpoint(&template, &world, &mut matrix, config.filter_set);
            log::debug!("filter fixpoint cleared {cleared} bits");
            if matrix.first_empty_row().is_some() {
                break; // unsatisfiable; the search will simply find nothing
            }
            let live = filters::live_world_nodes(&matrix);
            if live.len() == world.n_nodes() {
                break;
            }
            log::info!("world reduced from {} to {} nodes", world.n_nodes(), live.len());
            world = world.subgraph(&live);
            matrix = matrix.compact_world(&live);
        }

        let cs = CandidateStructure::new(template.clone(), classes, world, matrix);
        let initial_ordering = ordering::initial_ordering(&cs);
        Ok(Self {
            template,
            cs,
            initial_ordering,
            config,
        })
    }

    /// Runs the search, **blocking the current thread** until the solution space is exhausted,
    /// a cap is hit, or an abort is signalled through `abort_flag`.
    ///
    /// `update_fn` receives [`Update`]s as the search progresses; the final update is always
    /// [`Update::Complete`] or [`Update::Aborting`].  The returned [`SolutionTree`] is complete
    /// on a normal finish and a valid prefix of the enumeration otherwise.
    pub fn run(&self, update_fn: impl FnMut(Update), abort_flag: &AtomicBool) -> SolutionTree {
        dfs::search(self, update_fn, abort_flag)
    }

    #[inline]
    pub fn template(&self) -> &Graph {
        &self.template
    }

    /// The working world: the input world with all filtered-out nodes removed.  Node names are
    /// preserved, so world vertices in solutions resolve through this graph.
    #[inline]
    pub fn world(&self) -> &Graph {
        self.cs.world()
    }

    #[inline]
    pub fn candidate_structure(&self) -> &CandidateStructure {
        &self.cs
    }

    #[inline]
    pub fn initial_ordering(&self) -> &[SupernodeIdx] {
        &self.initial_ordering
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Configuration options for a [`Search`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Which filters run, both up-front and (the cheap subset) at every search frame.
    pub filter_set: FilterSet,
    /// Skip building the explicit solution tree; only count.
    pub count_only: bool,
    /// Stop once the isomorphism count reaches this value.  The final count may overshoot by
    /// the weight of the match that crossed the cap.
    pub cap_iso: Option<u128>,
    /// Stop after this many recorded match events.
    pub cap_matches: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filter_set: FilterSet::Cheap,
            count_only: false,
            cap_iso: None,
            cap_matches: None,
        }
    }
}

/// Update message from an in-progress [`Search`].
#[derive(Debug, Clone)]
pub enum Update {
    /// A new match has been recorded.
    Match {
        entries: Vec<MatchEntry>,
        /// The isomorphism count including this match.
        n_isomorphisms: u128,
    },
    /// Periodic progress report.
    Progress(Progress),
    /// The search is unwinding after an abort signal or a cap.
    Aborting,
    /// The search explored the whole space.
    Complete,
}

/// How much of a [`Search`] has been done so far.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    /// How many frames the matcher has entered.
    pub iter_count: usize,
    pub n_isomorphisms: u128,
    pub n_match_events: u64,
    /// Depth of the current partial match.
    pub depth: usize,
    /// True if the search is in the process of aborting.
    pub aborting: bool,
}
