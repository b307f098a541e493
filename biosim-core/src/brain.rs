use biosim_types::{Action, Sensor};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

/// Accumulator level a neuron must exceed to fire once.
const FIRING_THRESHOLD: f32 = 1.0;
/// Firing events processed per evaluation. Anything still queued afterwards is dropped.
pub const MAX_FIRINGS_PER_STEP: usize = 10;

/// Supplies raw sensor values to a brain. Implemented by whoever owns the world-facing state.
pub trait SensorReader {
    fn read(&self, sensor: Sensor) -> f32;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("connection reads sensor slot {slot} but the net has {sensors} sensors")]
    SensorSlotOutOfRange { slot: usize, sensors: usize },
    #[error("connection targets neuron {id} which was never instantiated")]
    MissingNeuron { id: usize },
    #[error("sensor {sensor} produced a non-finite value")]
    NonFiniteSensor { sensor: Sensor },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSource {
    /// `slot` indexes the net's sensor list.
    Sensor { sensor: Sensor, slot: usize },
    Neuron(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSink {
    Action(Action),
    Neuron(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    pub source: ConnectionSource,
    pub sink: ConnectionSink,
    /// Always within [-1, 1].
    pub multiplier: f32,
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            ConnectionSource::Sensor { sensor, .. } => write!(f, "{sensor}")?,
            ConnectionSource::Neuron(id) => write!(f, "N{id}")?,
        }
        write!(f, " -[{:.6}]-> ", self.multiplier)?;
        match self.sink {
            ConnectionSink::Action(action) => write!(f, "{action}"),
            ConnectionSink::Neuron(id) => write!(f, "N{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Neuron {
    id: usize,
    /// Carries over between steps; only a rebuilt brain starts from zero.
    accumulator: f32,
}

impl Neuron {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }
}

/// Squashed per-action outputs of one evaluation, indexed by `Action::index`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ActionVector([f32; Action::COUNT]);

impl ActionVector {
    pub fn get(&self, action: Action) -> f32 {
        self.0[action.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Action, f32)> + '_ {
        Action::ALL.into_iter().zip(self.0.iter().copied())
    }
}

/// A compiled brain: the sensors it reads, its lazily created neurons, and the connections
/// that survived dead-gene elimination.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NeuralNet {
    sensors: Vec<Sensor>,
    neurons: Vec<Option<Neuron>>,
    connections: Vec<Connection>,
}

impl NeuralNet {
    pub(crate) fn with_neuron_slots(neuron_slots: usize) -> Self {
        let mut neurons = Vec::with_capacity(neuron_slots);
        neurons.resize_with(neuron_slots, || None);
        Self {
            sensors: Vec::new(),
            neurons,
            connections: Vec::new(),
        }
    }

    /// Slot of `sensor` in the sensor list, appending it on first use.
    pub(crate) fn sensor_slot(&mut self, sensor: Sensor) -> usize {
        if let Some(slot) = self.sensors.iter().position(|known| *known == sensor) {
            return slot;
        }
        self.sensors.push(sensor);
        self.sensors.len() - 1
    }

    pub(crate) fn ensure_neuron(&mut self, id: usize) {
        if id >= self.neurons.len() {
            self.neurons.resize_with(id + 1, || None);
        }
        self.neurons[id].get_or_insert(Neuron {
            id,
            accumulator: 0.0,
        });
    }

    pub(crate) fn push_connection(&mut self, connection: Connection) {
        self.connections.push(connection);
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn neuron(&self, id: usize) -> Option<&Neuron> {
        self.neurons.get(id).and_then(Option::as_ref)
    }

    pub fn active_neuron_count(&self) -> usize {
        self.neurons.iter().flatten().count()
    }

    /// Runs one step: sensor connections first, then queued neuron firings breadth-first up to
    /// [`MAX_FIRINGS_PER_STEP`], then `tanh` over every action slot.
    pub fn evaluate<S: SensorReader + ?Sized>(
        &mut self,
        reader: &S,
    ) -> Result<ActionVector, EvalError> {
        let mut inputs = Vec::with_capacity(self.sensors.len());
        for &sensor in &self.sensors {
            let value = reader.read(sensor);
            if !value.is_finite() {
                return Err(EvalError::NonFiniteSensor { sensor });
            }
            inputs.push(value);
        }

        let mut actions = [0.0f32; Action::COUNT];
        let mut firings = VecDeque::new();

        for connection in &self.connections {
            let ConnectionSource::Sensor { slot, .. } = connection.source else {
                continue;
            };
            let value = *inputs.get(slot).ok_or(EvalError::SensorSlotOutOfRange {
                slot,
                sensors: inputs.len(),
            })?;
            deliver(
                connection.sink,
                connection.multiplier * value,
                &mut self.neurons,
                &mut actions,
                &mut firings,
            )?;
        }

        let mut processed = 0;
        while processed < MAX_FIRINGS_PER_STEP {
            let Some(fired) = firings.pop_front() else {
                break;
            };
            processed += 1;
            for connection in &self.connections {
                if connection.source != ConnectionSource::Neuron(fired) {
                    continue;
                }
                deliver(
                    connection.sink,
                    connection.multiplier,
                    &mut self.neurons,
                    &mut actions,
                    &mut firings,
                )?;
            }
        }

        for value in &mut actions {
            *value = value.tanh();
        }
        Ok(ActionVector(actions))
    }

    /// Sorted connection lines. Two nets with the same (source, multiplier, sink) triples render
    /// identically whatever order their nodes were interned in.
    pub fn canonical_string(&self) -> String {
        let mut lines: Vec<String> = self.connections.iter().map(ToString::to_string).collect();
        lines.sort();
        lines.join("\n")
    }
}

impl fmt::Display for NeuralNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_string())
    }
}

fn deliver(
    sink: ConnectionSink,
    value: f32,
    neurons: &mut [Option<Neuron>],
    actions: &mut [f32; Action::COUNT],
    firings: &mut VecDeque<usize>,
) -> Result<(), EvalError> {
    match sink {
        ConnectionSink::Action(action) => actions[action.index()] += value,
        ConnectionSink::Neuron(id) => {
            let neuron = neurons
                .get_mut(id)
                .and_then(Option::as_mut)
                .ok_or(EvalError::MissingNeuron { id })?;
            neuron.accumulator += value;
            // Subtract rather than reset: a large jump fires several times.
            while neuron.accumulator > FIRING_THRESHOLD {
                neuron.accumulator -= FIRING_THRESHOLD;
                firings.push_back(id);
            }
        }
    }
    Ok(())
}
