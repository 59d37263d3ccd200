//! Command-line driver for the templar matching engine.

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::Context;
use colored::Colorize;
use itertools::Itertools;
use log::LevelFilter;
use multigraph::{edgelist::align_channels, formats, Graph};
use structopt::StructOpt;
use templar::{Config, FilterSet, Search, SolutionTree, Update};

use self::{cache::DatasetCache, job::JobFile};

mod cache;
mod job;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "templar",
    about = "Subgraph isomorphism counting and enumeration on multichannel multigraphs."
)]
struct Args {
    /// Print progress information while running
    #[structopt(short, long, global = true)]
    verbose: bool,
    /// Print debugging information (implies --verbose)
    #[structopt(short, long, global = true)]
    debug: bool,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Parse the input graphs and populate the dataset cache
    Load {
        #[structopt(flatten)]
        input: InputArgs,
    },
    /// Run the filter pipeline and write the surviving candidates to the cache
    Filter {
        #[structopt(flatten)]
        input: InputArgs,
        /// Which filters to run: "cheap" or "all"
        #[structopt(long, default_value = "cheap")]
        filters: FilterArg,
    },
    /// Enumerate every isomorphism of the template into the world
    Match {
        #[structopt(flatten)]
        input: InputArgs,
        /// Which filters to run before the search: "cheap" or "all"
        #[structopt(long, default_value = "cheap")]
        filters: FilterArg,
        /// Only count isomorphisms; skip building the solution tree
        #[structopt(long)]
        count_only: bool,
        /// Stop once the isomorphism count reaches this value
        #[structopt(long, value_name = "N")]
        cap_iso: Option<u128>,
        /// Stop after this many recorded matches
        #[structopt(long, value_name = "N")]
        cap_matches: Option<u64>,
    },
}

#[derive(Debug, StructOpt)]
struct InputArgs {
    /// Template graph file in the native format
    #[structopt(long, value_name = "FILE")]
    template: Option<PathBuf>,
    /// World graph file in the native format
    #[structopt(long, value_name = "FILE")]
    world: Option<PathBuf>,
    /// TOML job file describing the inputs
    #[structopt(long, value_name = "FILE")]
    job: Option<PathBuf>,
    /// Dataset cache directory
    #[structopt(long, value_name = "DIR")]
    cache: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
struct FilterArg(FilterSet);

impl std::str::FromStr for FilterArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "cheap" => Ok(FilterArg(FilterSet::Cheap)),
            "all" => Ok(FilterArg(FilterSet::All)),
            other => anyhow::bail!("unknown filter set {other:?} (expected \"cheap\" or \"all\")"),
        }
    }
}

fn main() {
    let args = Args::from_args();

    let level = match (args.debug, args.verbose) {
        (true, _) => LevelFilter::Debug,
        (false, true) => LevelFilter::Info,
        (false, false) => LevelFilter::Warn,
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .expect("logger initialised twice");

    if let Err(e) = run(args.command) {
        eprintln!("{} {e:#}", "error:".bright_red().bold());
        std::process::exit(1);
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Load { input } => {
            let (template, world) = load_graphs(&input)?;
            println!(
                "loaded template {} ({} nodes) and world {} ({} nodes) over channels [{}]",
                template.name().bold(),
                template.n_nodes(),
                world.name().bold(),
                world.n_nodes(),
                template.channels().iter().join(", "),
            );
            Ok(())
        }
        Command::Filter { input, filters } => {
            let (template, world) = load_graphs(&input)?;
            let config = Config {
                filter_set: filters.0,
                ..Config::default()
            };
            let search = Search::new(template, world, config)?;
            report_filtering(&search);
            if let Some(cache) = dataset_cache(&input)? {
                cache.store_candidates(search.candidate_structure().candidates(), search.world())?;
                println!("candidates written to {}", cache.dir().display());
            }
            Ok(())
        }
        Command::Match {
            input,
            filters,
            count_only,
            cap_iso,
            cap_matches,
        } => {
            let (template, world) = load_graphs(&input)?;
            let config = Config {
                filter_set: filters.0,
                count_only,
                cap_iso,
                cap_matches,
            };
            let search = Search::new(template, world, config)?;
            report_filtering(&search);

            // Ctrl-C requests a graceful stop; the partial count is still reported
            let abort_flag = Arc::new(AtomicBool::new(false));
            let handler_flag = Arc::clone(&abort_flag);
            ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))
                .context("installing the Ctrl-C handler")?;

            let tree = search.run(
                |update| match update {
                    Update::Match { n_isomorphisms, .. } => {
                        log::info!("match found; isomorphism count {n_isomorphisms}");
                    }
                    Update::Progress(p) => {
                        log::info!(
                            "{} frames, {} isomorphisms, depth {}",
                            p.iter_count,
                            p.n_isomorphisms,
                            p.depth
                        );
                    }
                    Update::Aborting => log::warn!("stopping early"),
                    Update::Complete => log::info!("search space exhausted"),
                },
                &abort_flag,
            );
            report_solutions(&search, &tree);
            Ok(())
        }
    }
}

/// Resolves the input graphs: from the cache when fresh, else from `--template`/`--world` or the
/// job file (populating the cache for next time).  Channel lists are reconciled so the engine
/// sees both graphs over the same channels.
fn load_graphs(input: &InputArgs) -> anyhow::Result<(Graph, Graph)> {
    let cache = dataset_cache(input)?;
    if let Some(cache) = &cache {
        if cache.is_fresh(&input_paths(input)) {
            if let Some((template, world)) = cache.load_graphs()? {
                log::info!("using cached graphs from {}", cache.dir().display());
                return Ok((template, world));
            }
        }
    }

    let (template, world) = match (&input.job, &input.template, &input.world) {
        (Some(job_path), None, None) => {
            let job = JobFile::read(job_path)?;
            job.load_graphs(job_path)?
        }
        (None, Some(template), Some(world)) => {
            let t = formats::read_graph_file(template)
                .with_context(|| format!("reading {}", template.display()))?;
            let w = formats::read_graph_file(world)
                .with_context(|| format!("reading {}", world.display()))?;
            (t, w)
        }
        _ => anyhow::bail!("pass either --job FILE, or both --template FILE and --world FILE"),
    };

    // Pad missing channels with zero matrices so both graphs carry the union
    let template = align_channels(&template, world.channels());
    let world = align_channels(&world, template.channels());

    if let Some(cache) = &cache {
        cache.store_graphs(&template, &world)?;
        log::info!("cached parsed graphs in {}", cache.dir().display());
    }
    Ok((template, world))
}

fn dataset_cache(input: &InputArgs) -> anyhow::Result<Option<DatasetCache>> {
    let Some(root) = &input.cache else {
        return Ok(None);
    };
    let name = match (&input.job, &input.template) {
        (Some(job_path), _) => JobFile::read(job_path)?
            .name
            .unwrap_or_else(|| file_stem(job_path)),
        (None, Some(template)) => file_stem(template),
        (None, None) => "dataset".to_owned(),
    };
    Ok(Some(DatasetCache::new(root, &name)))
}

fn input_paths(input: &InputArgs) -> Vec<PathBuf> {
    if let Some(job_path) = &input.job {
        match JobFile::read(job_path) {
            Ok(job) => job.input_paths(job_path),
            Err(_) => vec![job_path.clone()],
        }
    } else {
        [&input.template, &input.world]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }
}

fn file_stem(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_owned())
}

fn report_filtering(search: &Search) {
    let cs = search.candidate_structure();
    println!(
        "{} supernodes over {} template nodes; world narrowed to {} nodes",
        cs.supernode_count(),
        search.template().n_nodes(),
        search.world().n_nodes(),
    );
    if log::log_enabled!(log::Level::Info) {
        for (idx, sn) in cs.supernodes().iter_enumerated() {
            log::info!(
                "supernode {} has {} candidates",
                sn.display_name(search.template()),
                cs.candidate_count(idx),
            );
        }
    }
}

fn report_solutions(search: &Search, tree: &SolutionTree) {
    if tree.is_unsatisfiable() {
        println!("{}", "no isomorphisms found".yellow().bold());
        return;
    }
    println!(
        "{} {}",
        "isomorphisms:".bright_green().bold(),
        tree.isomorphism_count()
    );
    println!(
        "{} match events, {} signal nodes",
        tree.match_count(),
        tree.signal_nodes().len()
    );
    if log::log_enabled!(log::Level::Info) {
        let world = search.world();
        let template = search.template();
        for (sn_idx, images) in tree.candidate_sets() {
            let sn = search.candidate_structure().supernode(sn_idx);
            log::info!(
                "template {} matched {}",
                sn.display_name(template),
                images.iter().map(|i| i.display_name(world)).join(", "),
            );
        }
    }
}
