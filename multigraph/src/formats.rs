//! On-disk graph formats.
//!
//! Three formats are supported:
//!
//! - the *native* multichannel format: graph name, node count and channel count, followed by one
//!   block per channel listing `src dst count` records;
//! - *solnon*, a per-channel adjacency-list format (first line is the node count, then one line
//!   per node giving its successor count and successors);
//! - *gfd*, a labelled-vertex per-channel format (`#name`, node count, one label per node, edge
//!   count, then one `src dst` line per edge).
//!
//! Node identities in all three formats are positional, so graphs read back get nodes named
//! `"0"`, `"1"`, ....  Writing and re-reading a graph preserves nodes, channels and every
//! per-channel multiplicity.

use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use crate::{matrix::CsrMatrix, Graph};

/// Error produced when reading any of the graph formats.
#[derive(Debug)]
pub enum ReadError {
    Io(io::Error),
    /// The file didn't match the expected shape.  `line` is 1-based.
    Parse {
        line: usize,
        msg: String,
    },
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Io(e) => write!(f, "io error: {e}"),
            ReadError::Parse { line, msg } => write!(f, "parse error on line {line}: {msg}"),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::Io(e) => Some(e),
            ReadError::Parse { .. } => None,
        }
    }
}

impl From<io::Error> for ReadError {
    fn from(e: io::Error) -> Self {
        ReadError::Io(e)
    }
}

/// Line-by-line reader which tracks the current line number for error reporting.
struct Lines<R> {
    reader: R,
    line_no: usize,
}

impl<R: BufRead> Lines<R> {
    fn new(reader: R) -> Self {
        Self { reader, line_no: 0 }
    }

    /// Reads the next line, without its terminator.  Hitting EOF is a parse error, since every
    /// format knows how many lines it expects.
    fn next(&mut self) -> Result<String, ReadError> {
        let mut buf = String::new();
        self.line_no += 1;
        if self.reader.read_line(&mut buf)? == 0 {
            return Err(self.error("unexpected end of file"));
        }
        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        Ok(buf)
    }

    fn next_number<T: std::str::FromStr>(&mut self, what: &str) -> Result<T, ReadError> {
        let line = self.next()?;
        line.trim()
            .parse()
            .map_err(|_| self.error(format!("expected {what}, found {line:?}")))
    }

    fn error(&self, msg: impl Into<String>) -> ReadError {
        ReadError::Parse {
            line: self.line_no,
            msg: msg.into(),
        }
    }
}

fn parse_fields<const N: usize>(
    lines: &Lines<impl BufRead>,
    line: &str,
) -> Result<[usize; N], ReadError> {
    let mut fields = [0usize; N];
    let mut iter = line.split_whitespace();
    for field in &mut fields {
        let raw = iter
            .next()
            .ok_or_else(|| lines.error(format!("expected {N} fields, found {line:?}")))?;
        *field = raw
            .parse()
            .map_err(|_| lines.error(format!("bad number {raw:?}")))?;
    }
    if iter.next().is_some() {
        return Err(lines.error(format!("expected {N} fields, found {line:?}")));
    }
    Ok(fields)
}

/* Native multichannel format */

/// Reads a graph in the native multichannel format.
pub fn read_graph(reader: impl BufRead) -> Result<Graph, ReadError> {
    let mut lines = Lines::new(reader);
    let name = lines.next()?;
    let n_nodes: usize = lines.next_number("node count")?;
    let n_channels: usize = lines.next_number("channel count")?;

    let mut channels = Vec::with_capacity(n_channels);
    let mut adjs = Vec::with_capacity(n_channels);
    for _ in 0..n_channels {
        let channel = lines.next()?;
        // The per-channel header counts edges *with multiplicity*, so records keep coming until
        // their counts add up to it.
        let n_edges: u64 = lines.next_number("edge count")?;
        let mut triplets = Vec::new();
        let mut seen = 0u64;
        while seen < n_edges {
            let line = lines.next()?;
            let [src, dst, count] = parse_fields(&lines, &line)?;
            if src >= n_nodes || dst >= n_nodes {
                return Err(lines.error(format!("edge ({src}, {dst}) out of bounds")));
            }
            if count == 0 {
                return Err(lines.error("edge record with zero count"));
            }
            triplets.push((src, dst, count as u32));
            seen += count as u64;
        }
        if seen > n_edges {
            return Err(lines.error(format!(
                "edge counts add up to {seen}, but the channel header says {n_edges}"
            )));
        }
        channels.push(channel);
        adjs.push(CsrMatrix::from_triplets(n_nodes, n_nodes, triplets));
    }
    Ok(Graph::from_indexed_nodes(name, n_nodes, channels, adjs))
}

/// Writes a graph in the native multichannel format.
pub fn write_graph(g: &Graph, mut w: impl Write) -> io::Result<()> {
    writeln!(w, "{}", g.name())?;
    writeln!(w, "{}", g.n_nodes())?;
    writeln!(w, "{}", g.n_channels())?;
    for c in 0..g.n_channels() {
        writeln!(w, "{}", g.channels()[c])?;
        writeln!(w, "{}", g.n_edges(c))?;
        for (src, dst, count) in g.edges(c) {
            writeln!(w, "{src} {dst} {count}")?;
        }
    }
    Ok(())
}

/// Reads a graph from a file in the native multichannel format.
pub fn read_graph_file(path: impl AsRef<Path>) -> Result<Graph, ReadError> {
    read_graph(io::BufReader::new(std::fs::File::open(path)?))
}

/// Writes a graph to a file in the native multichannel format.
pub fn write_graph_file(g: &Graph, path: impl AsRef<Path>) -> io::Result<()> {
    write_graph(g, io::BufWriter::new(std::fs::File::create(path)?))
}

/* Solnon adjacency-list format */

/// Reads a single-channel graph in solnon format.  The channel is named `"0"`.
///
/// Each of the `n` per-node lines lists the node's successor count followed by its successors;
/// a successor may be repeated to encode multiplicity.
pub fn read_solnon(reader: impl BufRead) -> Result<Graph, ReadError> {
    let mut lines = Lines::new(reader);
    let n_nodes: usize = lines.next_number("node count")?;
    let mut triplets = Vec::new();
    for src in 0..n_nodes {
        let line = lines.next()?;
        let mut fields = line.split_whitespace();
        let n_succs: usize = fields
            .next()
            .ok_or_else(|| lines.error("missing successor count"))?
            .parse()
            .map_err(|_| lines.error(format!("bad successor count in {line:?}")))?;
        let succs: Vec<usize> = fields
            .map(|f| {
                f.parse()
                    .map_err(|_| lines.error(format!("bad successor {f:?}")))
            })
            .collect::<Result<_, _>>()?;
        if succs.len() != n_succs {
            return Err(lines.error(format!(
                "expected {n_succs} successors, found {}",
                succs.len()
            )));
        }
        for dst in succs {
            if dst >= n_nodes {
                return Err(lines.error(format!("successor {dst} out of bounds")));
            }
            triplets.push((src, dst, 1));
        }
    }
    Ok(Graph::from_indexed_nodes(
        "solnon",
        n_nodes,
        vec!["0".to_owned()],
        vec![CsrMatrix::from_triplets(n_nodes, n_nodes, triplets)],
    ))
}

/// Writes one channel of a graph in solnon format.
pub fn write_solnon_channel(g: &Graph, channel: usize, mut w: impl Write) -> io::Result<()> {
    writeln!(w, "{}", g.n_nodes())?;
    for src in 0..g.n_nodes() {
        let mut succs = Vec::new();
        for (dst, count) in g.adj(channel).row(src) {
            for _ in 0..count {
                succs.push(dst.to_string());
            }
        }
        write!(w, "{}", succs.len())?;
        for s in &succs {
            write!(w, " {s}")?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/* Gfd labelled-vertex format */

/// Reads a single-channel graph in gfd format.  The channel is named `"0"`; vertex labels are
/// kept on the graph.
pub fn read_gfd(reader: impl BufRead) -> Result<Graph, ReadError> {
    let mut lines = Lines::new(reader);
    let header = lines.next()?;
    let name = header
        .strip_prefix('#')
        .ok_or_else(|| lines.error("gfd header must start with '#'"))?
        .to_owned();
    let n_nodes: usize = lines.next_number("node count")?;
    let labels: Vec<String> = (0..n_nodes)
        .map(|_| lines.next())
        .collect::<Result<_, _>>()?;
    let n_edges: u64 = lines.next_number("edge count")?;
    let mut triplets = Vec::new();
    for _ in 0..n_edges {
        let line = lines.next()?;
        let [src, dst] = parse_fields(&lines, &line)?;
        if src >= n_nodes || dst >= n_nodes {
            return Err(lines.error(format!("edge ({src}, {dst}) out of bounds")));
        }
        triplets.push((src, dst, 1));
    }
    let nodes = (0..n_nodes).map(|i| i.to_string()).collect();
    Ok(Graph::with_labels(
        name,
        nodes,
        vec!["0".to_owned()],
        vec![CsrMatrix::from_triplets(n_nodes, n_nodes, triplets)],
        Some(labels),
    ))
}

/// Writes one channel of a graph in gfd format.  Unlabelled graphs get the dummy label `"A"`.
/// Multiplicities are unrolled into repeated edge lines.
pub fn write_gfd_channel(g: &Graph, channel: usize, mut w: impl Write) -> io::Result<()> {
    writeln!(w, "#{}", g.name())?;
    writeln!(w, "{}", g.n_nodes())?;
    for i in 0..g.n_nodes() {
        match g.labels() {
            Some(labels) => writeln!(w, "{}", labels[i])?,
            None => writeln!(w, "A")?,
        }
    }
    writeln!(w, "{}", g.n_edges(channel))?;
    for (src, dst, count) in g.edges(channel) {
        for _ in 0..count {
            writeln!(w, "{src} {dst}")?;
        }
    }
    Ok(())
}

/// Appends `_<channel>` to a file name ahead of its extension, for the per-channel formats
/// applied to multichannel graphs.
pub fn channel_file_name(path: impl AsRef<Path>, channel: &str) -> PathBuf {
    let path = path.as_ref();
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let mut name = format!("{stem}_{channel}");
    if let Some(ext) = path.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    use super::*;

    fn example() -> Graph {
        Graph::from_indexed_nodes(
            "example",
            4,
            vec!["call".to_owned(), "email".to_owned()],
            vec![
                CsrMatrix::from_triplets(4, 4, vec![(0, 1, 2), (1, 2, 1), (3, 3, 1)]),
                CsrMatrix::from_triplets(4, 4, vec![(2, 0, 1)]),
            ],
        )
    }

    fn to_native_string(g: &Graph) -> String {
        let mut buf = Vec::new();
        write_graph(g, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn native_format_shape() {
        let text = to_native_string(&example());
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("example"));
        assert_eq!(lines.next(), Some("4"));
        assert_eq!(lines.next(), Some("2"));
        assert_eq!(lines.next(), Some("call"));
        assert_eq!(lines.next(), Some("4")); // 2 + 1 + 1 edges with multiplicity
    }

    #[test]
    fn native_round_trip() {
        let g = example();
        let read = read_graph(to_native_string(&g).as_bytes()).unwrap();
        assert_eq!(read.n_nodes(), g.n_nodes());
        assert_eq!(read.channels(), g.channels());
        for c in 0..g.n_channels() {
            assert_eq!(read.adj(c), g.adj(c));
        }
    }

    #[test]
    fn native_truncated_input_is_an_error() {
        let text = to_native_string(&example());
        let truncated = &text[..text.len() - 2];
        assert!(matches!(
            read_graph(truncated.as_bytes()),
            Err(ReadError::Parse { .. })
        ));
    }

    #[test]
    fn native_rejects_garbage() {
        let err = read_graph("name\nnot-a-number\n".as_bytes());
        match err {
            Err(ReadError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn solnon_round_trip() {
        let g = Graph::from_indexed_nodes(
            "solnon",
            3,
            vec!["0".to_owned()],
            vec![CsrMatrix::from_triplets(3, 3, vec![(0, 1, 2), (2, 0, 1)])],
        );
        let mut buf = Vec::new();
        write_solnon_channel(&g, 0, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "3\n2 1 1\n0\n1 0\n");
        let read = read_solnon(text.as_bytes()).unwrap();
        assert_eq!(read.adj(0), g.adj(0));
    }

    #[test]
    fn gfd_round_trip_keeps_labels() {
        let g = Graph::with_labels(
            "gfd",
            vec!["0".to_owned(), "1".to_owned()],
            vec!["0".to_owned()],
            vec![CsrMatrix::from_triplets(2, 2, vec![(0, 1, 2)])],
            Some(vec!["A".to_owned(), "B".to_owned()]),
        );
        let mut buf = Vec::new();
        write_gfd_channel(&g, 0, &mut buf).unwrap();
        let read = read_gfd(buf.as_slice()).unwrap();
        assert_eq!(read.name(), "gfd");
        assert_eq!(read.labels(), Some(&["A".to_owned(), "B".to_owned()][..]));
        assert_eq!(read.adj(0), g.adj(0));
    }

    #[test]
    fn channel_file_names() {
        assert_eq!(
            channel_file_name("world.graph", "5"),
            PathBuf::from("world_5.graph")
        );
        assert_eq!(channel_file_name("world", "a"), PathBuf::from("world_a"));
    }

    /// A small random multichannel graph for round-trip property tests.
    #[derive(Debug, Clone)]
    struct SmallGraph(Graph);

    impl Arbitrary for SmallGraph {
        fn arbitrary(g: &mut Gen) -> Self {
            let n_nodes = usize::arbitrary(g) % 6 + 1;
            let n_channels = usize::arbitrary(g) % 3 + 1;
            let channels = (0..n_channels).map(|c| format!("ch{c}")).collect();
            let adjs = (0..n_channels)
                .map(|_| {
                    let n_entries = usize::arbitrary(g) % 8;
                    let triplets: Vec<_> = (0..n_entries)
                        .map(|_| {
                            (
                                usize::arbitrary(g) % n_nodes,
                                usize::arbitrary(g) % n_nodes,
                                u32::arbitrary(g) % 3 + 1,
                            )
                        })
                        .collect();
                    CsrMatrix::from_triplets(n_nodes, n_nodes, triplets)
                })
                .collect();
            SmallGraph(Graph::from_indexed_nodes("qc", n_nodes, channels, adjs))
        }
    }

    #[quickcheck]
    fn native_round_trip_preserves_everything(g: SmallGraph) -> bool {
        let read = read_graph(to_native_string(&g.0).as_bytes()).unwrap();
        read.n_nodes() == g.0.n_nodes()
            && read.channels() == g.0.channels()
            && (0..g.0.n_channels()).all(|c| read.adj(c) == g.0.adj(c))
    }
}
