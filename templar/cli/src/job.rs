//! TOML job files: a declarative description of a matching job's inputs.
//!
//! A job file names the template and world sources.  Each source is either a graph file in one
//! of the supported formats or a raw edgelist with its column layout spelled out:
//!
//! ```toml
//! name = "transactions"
//!
//! [world]
//! edgelist = "world.csv"
//! src_col = 0
//! dst_col = 1
//! channel_col = 2
//! delimiter = ","
//! skip_lines = 1
//!
//! [template]
//! graph = "template.graph"
//! ```
//!
//! Relative paths are resolved against the job file's directory.

use std::path::{Path, PathBuf};

use anyhow::Context;
use multigraph::{edgelist, formats, EdgelistSpec, Graph};
use serde::Deserialize;

/// A parsed job file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobFile {
    /// Dataset name; also names the cache subdirectory.
    pub name: Option<String>,
    pub template: GraphSource,
    pub world: GraphSource,
}

impl JobFile {
    /// Reads and parses a job file.
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("can't read job file {}", path.display()))?;
        let job: JobFile = toml::from_str(&text)
            .with_context(|| format!("can't parse job file {}", path.display()))?;
        Ok(job)
    }

    /// Loads both graphs, resolving paths against the job file's directory.
    pub fn load_graphs(&self, job_path: &Path) -> anyhow::Result<(Graph, Graph)> {
        let base = job_path.parent().unwrap_or_else(|| Path::new("."));
        let template = self.template.load(base).context("loading the template")?;
        let world = self.world.load(base).context("loading the world")?;
        Ok((template, world))
    }

    /// Every input file the job reads; used for cache freshness checks.
    pub fn input_paths(&self, job_path: &Path) -> Vec<PathBuf> {
        let base = job_path.parent().unwrap_or_else(|| Path::new("."));
        let mut paths = vec![job_path.to_path_buf()];
        paths.extend(self.template.path(base));
        paths.extend(self.world.path(base));
        paths
    }
}

/// One graph input: exactly one of the format fields must be set.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphSource {
    /// Native multichannel format.
    pub graph: Option<PathBuf>,
    /// Solnon adjacency-list format (single channel).
    pub solnon: Option<PathBuf>,
    /// Gfd labelled-vertex format (single channel).
    pub gfd: Option<PathBuf>,
    /// CSV-like edgelist.
    pub edgelist: Option<PathBuf>,

    /* Edgelist options */
    pub src_col: Option<usize>,
    pub dst_col: Option<usize>,
    pub channel_col: Option<usize>,
    /// Field delimiter, a single character.
    pub delimiter: Option<String>,
    pub skip_lines: Option<usize>,
}

impl GraphSource {
    /// The input file this source reads, resolved against `base`.
    fn path(&self, base: &Path) -> Option<PathBuf> {
        self.graph
            .as_ref()
            .or(self.solnon.as_ref())
            .or(self.gfd.as_ref())
            .or(self.edgelist.as_ref())
            .map(|p| base.join(p))
    }

    /// Loads the graph.
    pub fn load(&self, base: &Path) -> anyhow::Result<Graph> {
        let n_sources = [&self.graph, &self.solnon, &self.gfd, &self.edgelist]
            .iter()
            .filter(|p| p.is_some())
            .count();
        anyhow::ensure!(
            n_sources == 1,
            "a graph source needs exactly one of `graph`, `solnon`, `gfd` or `edgelist`"
        );

        if let Some(path) = &self.graph {
            let path = base.join(path);
            return formats::read_graph_file(&path)
                .with_context(|| format!("reading {}", path.display()));
        }
        if let Some(path) = &self.solnon {
            let path = base.join(path);
            let file = std::fs::File::open(&path)
                .with_context(|| format!("opening {}", path.display()))?;
            return formats::read_solnon(std::io::BufReader::new(file))
                .with_context(|| format!("reading {}", path.display()));
        }
        if let Some(path) = &self.gfd {
            let path = base.join(path);
            let file = std::fs::File::open(&path)
                .with_context(|| format!("opening {}", path.display()))?;
            return formats::read_gfd(std::io::BufReader::new(file))
                .with_context(|| format!("reading {}", path.display()));
        }

        let path = base.join(self.edgelist.as_ref().expect("checked above"));
        let spec = self.edgelist_spec()?;
        edgelist::read_edgelist_file(&path, &spec, None, None)
            .with_context(|| format!("reading {}", path.display()))
    }

    fn edgelist_spec(&self) -> anyhow::Result<EdgelistSpec> {
        let defaults = EdgelistSpec::default();
        let delimiter = match &self.delimiter {
            None => defaults.delimiter,
            Some(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => anyhow::bail!("`delimiter` must be a single character, got {s:?}"),
                }
            }
        };
        Ok(EdgelistSpec {
            src_col: self.src_col.unwrap_or(defaults.src_col),
            dst_col: self.dst_col.unwrap_or(defaults.dst_col),
            channel_col: self.channel_col,
            delimiter,
            skip_lines: self.skip_lines.unwrap_or(defaults.skip_lines),
        })
    }
}
