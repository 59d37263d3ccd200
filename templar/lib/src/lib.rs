//! A subgraph isomorphism counting and enumeration engine for multichannel directed
//! multigraphs with edge multiplicities.
//!
//! Given a small *template* graph and a large *world* graph over the same channels, the engine
//! enumerates every injective homomorphism of the template into the world: a mapping of
//! template nodes to distinct world nodes under which every channel's edge multiplicities are
//! dominated by the world's.  Three ideas keep the search tractable:
//!
//! - a **candidate matrix** maintained by a pipeline of monotone [`filters`], which prunes
//!   impossible template-to-world assignments before and during the search;
//! - **supernodes**: structurally interchangeable template nodes are collapsed into one matching
//!   unit, and interchangeable world nodes are matched once and counted combinatorially, so
//!   permutation blow-up never reaches the search tree;
//! - an **adaptive ordering** that always branches on the supernode with the fewest candidates.
//!
//! The entry point is [`Search`]: build one with [`Search::new`] (this runs the filters), then
//! call [`Search::run`] with an update callback and an abort flag, and read the results off the
//! returned [`SolutionTree`].

#![deny(clippy::all)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod bipartite;
pub mod candidates;
pub mod filters;
pub mod search;
pub mod solution;
pub mod structure;
pub mod supernode;

pub use candidates::CandidateMatrix;
pub use filters::FilterSet;
pub use search::{Config, MatchEntry, PartialMatch, Progress, Search, Update};
pub use solution::SolutionTree;
pub use structure::CandidateStructure;
pub use supernode::{SuperTemplateNode, Supernode, SupernodeIdx};

/// The errors produced when setting up a [`Search`].
///
/// Note what is *not* here: an unsatisfiable instance is not an error (the search completes
/// normally with a count of zero), and neither is cancellation (the partial solution tree is
/// returned as-is).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The template and world disagree on their channel lists.
    ChannelMismatch {
        template: Vec<String>,
        world: Vec<String>,
    },
    /// The template has no nodes.
    EmptyTemplate,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ChannelMismatch { template, world } => write!(
                f,
                "template channels {template:?} don't match world channels {world:?}"
            ),
            Error::EmptyTemplate => write!(f, "the template graph has no nodes"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
