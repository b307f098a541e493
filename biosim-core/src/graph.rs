use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node {id} is out of bounds for a graph of size {size}")]
    NodeOutOfBounds { id: usize, size: usize },
    #[error("node {id} is already registered")]
    NodeTaken { id: usize },
    #[error("edge {from}->{to} references a node out of bounds for a graph of size {size}")]
    EdgeOutOfBounds { from: usize, to: usize, size: usize },
    #[error("edge {from}->{to} references an unregistered node")]
    EdgeEndpointMissing { from: usize, to: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub weight: f32,
}

/// Edges walked from a source to a sink, in traversal order.
pub type Path = Vec<Edge>;

/// Directed graph over a fixed number of node slots.
///
/// The adjacency matrix is `size * size`, row-major by source. Each cell holds a 1-based index
/// into `edges`, with 0 meaning no edge, so edge existence and lookup are both O(1).
#[derive(Debug, Clone)]
pub struct ConnectionGraph<N> {
    size: usize,
    matrix: Vec<usize>,
    nodes: Vec<Option<N>>,
    edges: Vec<Edge>,
}

impl<N> ConnectionGraph<N> {
    pub fn new(size: usize) -> Self {
        let mut nodes = Vec::with_capacity(size);
        nodes.resize_with(size, || None);
        Self {
            size,
            matrix: vec![0; size * size],
            nodes,
            edges: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn add_node(&mut self, id: usize, node: N) -> Result<(), GraphError> {
        let size = self.size;
        let slot = self
            .nodes
            .get_mut(id)
            .ok_or(GraphError::NodeOutOfBounds { id, size })?;
        if slot.is_some() {
            return Err(GraphError::NodeTaken { id });
        }
        *slot = Some(node);
        Ok(())
    }

    pub fn node(&self, id: usize) -> Option<&N> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    /// Adds a directed edge. A second edge between the same ordered pair is ignored, so the
    /// first weight written wins.
    pub fn add_edge(&mut self, from: usize, to: usize, weight: f32) -> Result<(), GraphError> {
        if from >= self.size || to >= self.size {
            return Err(GraphError::EdgeOutOfBounds {
                from,
                to,
                size: self.size,
            });
        }
        if self.nodes[from].is_none() || self.nodes[to].is_none() {
            return Err(GraphError::EdgeEndpointMissing { from, to });
        }

        let offset = self.matrix_offset(from, to);
        if self.matrix[offset] != 0 {
            return Ok(());
        }
        self.edges.push(Edge { from, to, weight });
        self.matrix[offset] = self.edges.len();
        Ok(())
    }

    pub fn edge(&self, from: usize, to: usize) -> Option<&Edge> {
        if from >= self.size || to >= self.size {
            return None;
        }
        match self.matrix[self.matrix_offset(from, to)] {
            0 => None,
            slot => Some(&self.edges[slot - 1]),
        }
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Row-major position of `(from, to)` in the adjacency matrix. Unique per ordered pair.
    pub fn matrix_offset(&self, from: usize, to: usize) -> usize {
        from * self.size + to
    }

    /// Outgoing neighbours of `from` in ascending id order.
    pub fn neighbours_from(&self, from: usize) -> Vec<usize> {
        if from >= self.size {
            return Vec::new();
        }
        let row = &self.matrix[from * self.size..(from + 1) * self.size];
        row.iter()
            .enumerate()
            .filter(|(_, slot)| **slot != 0)
            .map(|(to, _)| to)
            .collect()
    }

    /// Enumerates every loop-free walk from a source that stops at the first sink it reaches.
    ///
    /// Breadth-first over partial node paths. The number of paths is exponential in the worst
    /// case; genome graphs stay small enough for that to be fine.
    pub fn paths_between(&self, sources: &[usize], sinks: &[usize]) -> Vec<Path> {
        let mut is_sink = vec![false; self.size];
        for &sink in sinks {
            if let Some(flag) = is_sink.get_mut(sink) {
                *flag = true;
            }
        }

        let mut todo: VecDeque<Vec<usize>> = sources
            .iter()
            .filter(|&&source| source < self.size)
            .map(|&source| vec![source])
            .collect();
        let mut paths = Vec::new();

        while let Some(current) = todo.pop_front() {
            let Some(&last) = current.last() else {
                continue;
            };
            for next in self.neighbours_from(last) {
                if current.contains(&next) {
                    continue;
                }
                let mut extended = current.clone();
                extended.push(next);
                if is_sink[next] {
                    paths.push(self.edge_path(&extended));
                } else {
                    todo.push_back(extended);
                }
            }
        }

        paths
    }

    fn edge_path(&self, nodes: &[usize]) -> Path {
        nodes
            .windows(2)
            .map(|pair| {
                let slot = self.matrix[self.matrix_offset(pair[0], pair[1])];
                debug_assert!(slot != 0, "path must follow existing edges");
                self.edges[slot - 1]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn graph_with_nodes(size: usize) -> ConnectionGraph<&'static str> {
        let mut graph = ConnectionGraph::new(size);
        for id in 0..size {
            graph.add_node(id, "node").expect("node should register");
        }
        graph
    }

    fn node_sequence(path: &Path) -> Vec<usize> {
        let mut nodes = vec![path[0].from];
        nodes.extend(path.iter().map(|edge| edge.to));
        nodes
    }

    #[test]
    fn add_node_rejects_out_of_bounds_and_duplicates() {
        let mut graph = ConnectionGraph::new(2);
        assert_eq!(graph.add_node(0, 'a'), Ok(()));
        assert_eq!(graph.add_node(0, 'b'), Err(GraphError::NodeTaken { id: 0 }));
        assert_eq!(
            graph.add_node(2, 'c'),
            Err(GraphError::NodeOutOfBounds { id: 2, size: 2 })
        );
        assert_eq!(graph.node(0), Some(&'a'));
        assert_eq!(graph.node(1), None);
    }

    #[test]
    fn add_edge_validates_endpoints() {
        let mut graph = ConnectionGraph::new(3);
        graph.add_node(0, ()).expect("node 0");
        graph.add_node(1, ()).expect("node 1");
        assert_eq!(
            graph.add_edge(0, 3, 1.0),
            Err(GraphError::EdgeOutOfBounds {
                from: 0,
                to: 3,
                size: 3
            })
        );
        assert_eq!(
            graph.add_edge(0, 2, 1.0),
            Err(GraphError::EdgeEndpointMissing { from: 0, to: 2 })
        );
        assert_eq!(graph.add_edge(0, 1, 1.0), Ok(()));
    }

    #[test]
    fn duplicate_edge_keeps_first_weight() {
        let mut graph = graph_with_nodes(2);
        graph.add_edge(0, 1, 0.25).expect("first edge");
        graph.add_edge(0, 1, -0.75).expect("duplicate edge is a no-op");
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.edge(0, 1).map(|edge| edge.weight), Some(0.25));
        assert!(graph.edge(1, 0).is_none());
    }

    #[test]
    fn neighbours_are_ascending() {
        let mut graph = graph_with_nodes(4);
        graph.add_edge(0, 3, 1.0).expect("edge");
        graph.add_edge(0, 1, 1.0).expect("edge");
        graph.add_edge(0, 2, 1.0).expect("edge");
        assert_eq!(graph.neighbours_from(0), vec![1, 2, 3]);
        assert!(graph.neighbours_from(1).is_empty());
        assert!(graph.neighbours_from(9).is_empty());
    }

    #[test]
    fn chain_yields_single_path() {
        let mut graph = graph_with_nodes(3);
        graph.add_edge(0, 1, 0.1).expect("edge");
        graph.add_edge(1, 2, 0.2).expect("edge");

        let paths = graph.paths_between(&[0], &[2]);
        assert_eq!(paths.len(), 1);
        assert_eq!(node_sequence(&paths[0]), vec![0, 1, 2]);
        assert_eq!(paths[0][1].weight, 0.2);
    }

    #[test]
    fn branching_graph_reaches_every_reachable_sink() {
        let mut graph = graph_with_nodes(9);
        for (from, to) in [(0, 3), (0, 4), (1, 4), (4, 1), (2, 5), (4, 7), (4, 8)] {
            graph.add_edge(from, to, 1.0).expect("edge");
        }

        let paths = graph.paths_between(&[0, 1, 2], &[6, 7, 8]);
        let sequences: HashSet<Vec<usize>> = paths.iter().map(node_sequence).collect();
        let expected: HashSet<Vec<usize>> = [
            vec![0, 4, 7],
            vec![0, 4, 8],
            vec![1, 4, 7],
            vec![1, 4, 8],
        ]
        .into_iter()
        .collect();
        assert_eq!(sequences, expected);
        assert_eq!(paths.len(), 4);
    }

    #[test]
    fn walks_stop_at_first_sink() {
        let mut graph = graph_with_nodes(3);
        graph.add_edge(0, 1, 1.0).expect("edge");
        graph.add_edge(1, 2, 1.0).expect("edge");

        let paths = graph.paths_between(&[0], &[1, 2]);
        assert_eq!(paths.len(), 1);
        assert_eq!(node_sequence(&paths[0]), vec![0, 1]);
    }

    #[test]
    fn cyclic_graph_paths_never_repeat_nodes() {
        let mut graph = graph_with_nodes(6);
        for (from, to) in [
            (0, 1),
            (1, 2),
            (2, 1),
            (2, 3),
            (3, 1),
            (3, 0),
            (1, 4),
            (3, 5),
            (2, 2),
        ] {
            graph.add_edge(from, to, 1.0).expect("edge");
        }

        let paths = graph.paths_between(&[0], &[4, 5]);
        assert!(!paths.is_empty());
        for path in &paths {
            let nodes = node_sequence(path);
            let unique: HashSet<usize> = nodes.iter().copied().collect();
            assert_eq!(unique.len(), nodes.len(), "path {nodes:?} repeats a node");
            for pair in path.windows(2) {
                assert_eq!(pair[0].to, pair[1].from);
            }
        }
    }

    #[test]
    fn unreachable_sink_yields_no_paths() {
        let mut graph = graph_with_nodes(3);
        graph.add_edge(1, 2, 1.0).expect("edge");
        assert!(graph.paths_between(&[0], &[2]).is_empty());
        assert!(graph.paths_between(&[], &[2]).is_empty());
    }
}
