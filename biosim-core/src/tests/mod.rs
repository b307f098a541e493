pub(super) use super::*;
pub(super) use crate::brain::{Connection, ConnectionSink, ConnectionSource};
pub(super) use biosim_types::{Action, Area, Coord, Gene, Genome, Sensor};

mod movement_resolution;
mod support;
