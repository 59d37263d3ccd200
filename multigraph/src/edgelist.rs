//! Edgelist ingestion: building a [`Graph`] from a CSV-like file of `src, dst[, channel]` rows.
//!
//! Rows with the same endpoints and channel accumulate into the edge's multiplicity.  Datasets
//! in the wild are messy, so a caller can install a *repair* hook which gets a chance to rewrite
//! (or drop) each raw edge before it is counted.

use std::{
    collections::HashMap,
    io::{self, BufRead},
    path::Path,
};

use itertools::Itertools;

use crate::{formats::ReadError, matrix::CsrMatrix, Graph};

/// How to interpret the columns of an edgelist file.
#[derive(Debug, Clone)]
pub struct EdgelistSpec {
    pub src_col: usize,
    pub dst_col: usize,
    /// Column holding the channel name.  `None` puts every edge in a single channel `"0"`.
    pub channel_col: Option<usize>,
    pub delimiter: char,
    /// Header lines to skip before the first data row.
    pub skip_lines: usize,
}

impl Default for EdgelistSpec {
    fn default() -> Self {
        Self {
            src_col: 0,
            dst_col: 1,
            channel_col: None,
            delimiter: ',',
            skip_lines: 1,
        }
    }
}

/// Per-edge repair hook: maps `(src, dst, channel)` to a replacement, or `None` to drop the edge.
pub type RepairFn<'a> =
    dyn Fn(&str, &str, Option<&str>) -> Option<(String, String, Option<String>)> + 'a;

/// Reads an edgelist into a [`Graph`].
///
/// If `nodes` is given, it fixes the node ordering and any edge mentioning an unknown node is an
/// error; otherwise nodes are numbered in order of first appearance.  Channels are sorted by
/// name, so two files with the same channel set load into the same channel order.
pub fn read_edgelist(
    reader: impl BufRead,
    spec: &EdgelistSpec,
    nodes: Option<&[String]>,
    repair: Option<&RepairFn>,
) -> Result<Graph, ReadError> {
    let fixed_nodes = nodes.is_some();
    let mut node_list: Vec<String> = nodes.map(<[String]>::to_vec).unwrap_or_default();
    let mut node_idxs: HashMap<String, usize> = node_list
        .iter()
        .enumerate()
        .map(|(i, n)| (n.clone(), i))
        .collect();
    // Channel name -> (src, dst) -> multiplicity
    let mut channel_edges: HashMap<String, HashMap<(usize, usize), u32>> = HashMap::new();

    let needed_cols = spec
        .src_col
        .max(spec.dst_col)
        .max(spec.channel_col.unwrap_or(0));

    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line_idx < spec.skip_lines {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        let line_no = line_idx + 1;
        let fields: Vec<&str> = line.split(spec.delimiter).map(str::trim).collect();
        if fields.len() <= needed_cols {
            return Err(ReadError::Parse {
                line: line_no,
                msg: format!("expected at least {} columns, found {}", needed_cols + 1, fields.len()),
            });
        }

        let raw_src = fields[spec.src_col];
        let raw_dst = fields[spec.dst_col];
        let raw_channel = spec.channel_col.map(|c| fields[c]);

        let (src, dst, channel) = match repair {
            Some(repair) => match repair(raw_src, raw_dst, raw_channel) {
                Some(repaired) => repaired,
                None => continue, // dropped by the repair hook
            },
            None => (
                raw_src.to_owned(),
                raw_dst.to_owned(),
                raw_channel.map(str::to_owned),
            ),
        };
        let channel = channel.unwrap_or_else(|| "0".to_owned());

        let mut idx_of = |name: String| -> Result<usize, ReadError> {
            match node_idxs.get(&name) {
                Some(&i) => Ok(i),
                None if fixed_nodes => Err(ReadError::Parse {
                    line: line_no,
                    msg: format!("unknown node {name:?}"),
                }),
                None => {
                    let i = node_list.len();
                    node_list.push(name.clone());
                    node_idxs.insert(name, i);
                    Ok(i)
                }
            }
        };
        let src_idx = idx_of(src)?;
        let dst_idx = idx_of(dst)?;
        *channel_edges
            .entry(channel)
            .or_default()
            .entry((src_idx, dst_idx))
            .or_insert(0) += 1;
    }

    let n_nodes = node_list.len();
    let channels: Vec<String> = channel_edges.keys().cloned().sorted().collect();
    let adjs = channels
        .iter()
        .map(|c| {
            CsrMatrix::from_triplets(
                n_nodes,
                n_nodes,
                channel_edges[c].iter().map(|(&(s, d), &m)| (s, d, m)),
            )
        })
        .collect();
    Ok(Graph::new("edgelist", node_list, channels, adjs))
}

/// Reads an edgelist from a file.  See [`read_edgelist`].
pub fn read_edgelist_file(
    path: impl AsRef<Path>,
    spec: &EdgelistSpec,
    nodes: Option<&[String]>,
    repair: Option<&RepairFn>,
) -> Result<Graph, ReadError> {
    read_edgelist(
        io::BufReader::new(std::fs::File::open(path)?),
        spec,
        nodes,
        repair,
    )
}

/// Rebuilds `g` over the union of its own channels and `channels`, padding missing channels with
/// zero matrices.  Afterwards `g.channels()` equals the union, sorted by name.
///
/// Matching a template against a world requires both graphs to agree on the channel set; this is
/// the reconciliation step that makes them agree.
pub fn align_channels(g: &Graph, channels: &[String]) -> Graph {
    let union: Vec<String> = g
        .channels()
        .iter()
        .chain(channels)
        .cloned()
        .sorted()
        .dedup()
        .collect();
    let adjs = union
        .iter()
        .map(|c| match g.channel_idx(c) {
            Some(idx) => g.adj(idx).clone(),
            None => CsrMatrix::zeros(g.n_nodes(), g.n_nodes()),
        })
        .collect();
    Graph::with_labels(
        g.name(),
        g.nodes().to_vec(),
        union,
        adjs,
        g.labels().map(<[String]>::to_vec),
    )
}
