//! The dataset cache: parsed inputs and filter results, laid out one directory per dataset.
//!
//! Parsing a large edgelist dominates start-up time, so `load` writes the parsed graphs into
//! the cache and later commands read them back instead of re-parsing.  The layout is plain
//! text: the node and channel lists, one sparse-matrix file per channel for the world and the
//! template, and the boolean candidate matrix after filtering.  The cache is read-mostly: it
//! is rebuilt whenever any input file is newer than it.

use std::{
    fs,
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::Context;
use multigraph::{CsrMatrix, Graph};
use templar::CandidateMatrix;

/// Handle on one dataset's cache directory.
#[derive(Debug, Clone)]
pub struct DatasetCache {
    dir: PathBuf,
}

impl DatasetCache {
    /// A cache living at `root/<dataset name>`.
    pub fn new(root: &Path, name: &str) -> Self {
        Self {
            dir: root.join(name),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// True iff the cache exists and is newer than every input file.
    pub fn is_fresh(&self, inputs: &[PathBuf]) -> bool {
        let Some(cache_time) = modification_time(&self.stamp_path()) else {
            return false;
        };
        inputs
            .iter()
            .all(|input| match modification_time(input) {
                Some(input_time) => input_time <= cache_time,
                None => false, // missing input: force a rebuild so the error surfaces
            })
    }

    /// Writes the parsed template and world.
    pub fn store_graphs(&self, template: &Graph, world: &Graph) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating cache dir {}", self.dir.display()))?;
        self.store_graph("template", template)?;
        self.store_graph("world", world)?;
        fs::write(self.stamp_path(), b"")?;
        Ok(())
    }

    /// Reads the graphs back, or `None` when the cache is incomplete.
    pub fn load_graphs(&self) -> anyhow::Result<Option<(Graph, Graph)>> {
        if !self.stamp_path().exists() {
            return Ok(None);
        }
        let template = self.load_graph("template")?;
        let world = self.load_graph("world")?;
        Ok(Some((template, world)))
    }

    /// Writes the filtered candidate matrix: the surviving world nodes on the first line, then
    /// one 0/1 row per template node.
    pub fn store_candidates(
        &self,
        matrix: &CandidateMatrix,
        world: &Graph,
    ) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join("candidates.txt");
        let mut file = fs::File::create(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        writeln!(file, "{}", world.nodes().join(" "))?;
        for t in 0..matrix.n_template() {
            let row: String = (0..matrix.n_world())
                .map(|w| if matrix.is_candidate(t, w) { '1' } else { '0' })
                .collect();
            writeln!(file, "{row}")?;
        }
        Ok(())
    }

    /* Per-graph layout */

    fn store_graph(&self, prefix: &str, g: &Graph) -> anyhow::Result<()> {
        fs::write(
            self.dir.join(format!("{prefix}_nodes.txt")),
            g.nodes().join("\n") + "\n",
        )?;
        fs::write(
            self.dir.join(format!("{prefix}_channels.txt")),
            g.channels().join("\n") + "\n",
        )?;
        for (c, channel) in g.channels().iter().enumerate() {
            let path = self.dir.join(format!("{prefix}_{channel}.mtx"));
            let mut file = fs::File::create(&path)
                .with_context(|| format!("creating {}", path.display()))?;
            for (src, dst, count) in g.edges(c) {
                writeln!(file, "{src} {dst} {count}")?;
            }
        }
        Ok(())
    }

    fn load_graph(&self, prefix: &str) -> anyhow::Result<Graph> {
        let nodes = read_lines(&self.dir.join(format!("{prefix}_nodes.txt")))?;
        let channels = read_lines(&self.dir.join(format!("{prefix}_channels.txt")))?;
        let mut adjs = Vec::with_capacity(channels.len());
        for channel in &channels {
            let path = self.dir.join(format!("{prefix}_{channel}.mtx"));
            let file = fs::File::open(&path)
                .with_context(|| format!("opening {}", path.display()))?;
            let mut triplets = Vec::new();
            for (line_no, line) in BufReader::new(file).lines().enumerate() {
                let line = line?;
                let fields: Vec<&str> = line.split_whitespace().collect();
                let [src, dst, count] = fields.as_slice() else {
                    anyhow::bail!("{}:{}: malformed matrix row", path.display(), line_no + 1);
                };
                triplets.push((src.parse()?, dst.parse()?, count.parse()?));
            }
            adjs.push(CsrMatrix::from_triplets(nodes.len(), nodes.len(), triplets));
        }
        Ok(Graph::new(prefix, nodes, channels, adjs))
    }

    fn stamp_path(&self) -> PathBuf {
        self.dir.join("cache.stamp")
    }
}

fn modification_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn read_lines(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(text.lines().map(str::to_owned).collect())
}
