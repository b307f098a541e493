use crate::brain::{Connection, ConnectionSink, ConnectionSource, NeuralNet};
use crate::graph::{ConnectionGraph, GraphError};
use biosim_types::{Action, Gene, Genome, Sensor};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

pub const DEFAULT_MIN_CONNECTIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("malformed connection graph: {0}")]
    Graph(#[from] GraphError),
    /// Recoverable: the genome should be replaced, not treated as a failure.
    #[error("network has {connections} connections, fewer than the required {minimum}")]
    TooSimple { connections: usize, minimum: usize },
}

/// Value identity of a brain node, used as the interning key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Sensor(Sensor),
    Neuron(usize),
    Action(Action),
}

impl NodeKey {
    fn source_of(gene: &Gene, neuron_slots: usize) -> NodeKey {
        if gene.source_is_sensor {
            NodeKey::Sensor(Sensor::from_gene_id(gene.source_id))
        } else {
            NodeKey::Neuron(gene.source_id as usize % neuron_slots)
        }
    }

    fn sink_of(gene: &Gene, neuron_slots: usize) -> NodeKey {
        if gene.sink_is_action {
            NodeKey::Action(Action::from_gene_id(gene.sink_id))
        } else {
            NodeKey::Neuron(gene.sink_id as usize % neuron_slots)
        }
    }
}

/// Assigns dense ids to node keys in first-seen order.
#[derive(Default)]
struct NodeInterner {
    ids: HashMap<NodeKey, usize>,
}

impl NodeInterner {
    /// Returns the id and whether this call created it.
    fn intern(&mut self, key: NodeKey) -> (usize, bool) {
        let next = self.ids.len();
        match self.ids.get(&key) {
            Some(&id) => (id, false),
            None => {
                self.ids.insert(key, next);
                (next, true)
            }
        }
    }
}

/// Turns genomes into runnable brains, keeping only genes on some sensor-to-action path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkCompiler {
    min_connections: usize,
}

impl Default for NetworkCompiler {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CONNECTIONS)
    }
}

impl NetworkCompiler {
    pub fn new(min_connections: usize) -> Self {
        Self { min_connections }
    }

    pub fn min_connections(&self) -> usize {
        self.min_connections
    }

    pub fn compile(&self, genome: &Genome) -> Result<NeuralNet, CompileError> {
        let neuron_slots = genome.neuron_count.max(1) as usize;
        let (graph, sources, sinks) = build_graph(genome, neuron_slots)?;
        let paths = graph.paths_between(&sources, &sinks);

        let mut net = NeuralNet::with_neuron_slots(neuron_slots);
        let mut seen = HashSet::new();
        for edge in paths.iter().flatten() {
            if !seen.insert(graph.matrix_offset(edge.from, edge.to)) {
                continue;
            }
            let source = match graph.node(edge.from) {
                Some(NodeKey::Sensor(sensor)) => ConnectionSource::Sensor {
                    sensor: *sensor,
                    slot: net.sensor_slot(*sensor),
                },
                Some(NodeKey::Neuron(id)) => {
                    net.ensure_neuron(*id);
                    ConnectionSource::Neuron(*id)
                }
                Some(NodeKey::Action(_)) | None => {
                    unreachable!("path edges start at sensors or neurons")
                }
            };
            let sink = match graph.node(edge.to) {
                Some(NodeKey::Action(action)) => ConnectionSink::Action(*action),
                Some(NodeKey::Neuron(id)) => {
                    net.ensure_neuron(*id);
                    ConnectionSink::Neuron(*id)
                }
                Some(NodeKey::Sensor(_)) | None => {
                    unreachable!("path edges end at neurons or actions")
                }
            };
            net.push_connection(Connection {
                source,
                sink,
                multiplier: edge.weight,
            });
        }

        let connections = net.connections().len();
        if connections < self.min_connections {
            return Err(CompileError::TooSimple {
                connections,
                minimum: self.min_connections,
            });
        }
        Ok(net)
    }
}

type GenomeGraph = (ConnectionGraph<NodeKey>, Vec<usize>, Vec<usize>);

fn build_graph(genome: &Genome, neuron_slots: usize) -> Result<GenomeGraph, GraphError> {
    // Every gene contributes at most two new nodes.
    let mut graph = ConnectionGraph::new(genome.genes.len() * 2);
    let mut interner = NodeInterner::default();
    let mut sensors = Vec::new();
    let mut actions = Vec::new();

    for gene in &genome.genes {
        let source = NodeKey::source_of(gene, neuron_slots);
        let (source_id, added) = interner.intern(source);
        if added {
            graph.add_node(source_id, source)?;
            if matches!(source, NodeKey::Sensor(_)) {
                sensors.push(source_id);
            }
        }

        let sink = NodeKey::sink_of(gene, neuron_slots);
        let (sink_id, added) = interner.intern(sink);
        if added {
            graph.add_node(sink_id, sink)?;
            if matches!(sink, NodeKey::Action(_)) {
                actions.push(sink_id);
            }
        }

        graph.add_edge(source_id, sink_id, gene.multiplier())?;
    }

    Ok((graph, sensors, actions))
}
