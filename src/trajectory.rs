//! Driver loop stepping an engine and recording frames.

use crate::config::OutputConfig;
use crate::engine::Engine;
use crate::model::{Position, State};
use crate::population::StateCounts;
use anyhow::{Context, Result};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

/// Agent positions, grouped by state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub susceptible: Vec<Position>,
    pub infected: Vec<Position>,
    pub removed: Vec<Position>,
}

impl Frame {
    pub fn capture(engine: &Engine) -> Self {
        Self {
            susceptible: engine.query_positions(State::Susceptible),
            infected: engine.query_positions(State::Infected),
            removed: engine.query_positions(State::Removed),
        }
    }
}

/// Record of the simulation at a single step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Simulation step.
    pub step: usize,

    /// Number of agents in each state.
    pub counts: StateCounts,

    /// Agent positions (optional).
    pub frame: Option<Frame>,
}

impl Record {
    pub fn capture(engine: &Engine, save_positions: bool) -> Self {
        Self {
            step: engine.step_count(),
            counts: engine.state_counts(),
            frame: save_positions.then(|| Frame::capture(engine)),
        }
    }
}

/// Step `engine` until `max_steps` or until no agent is infected, and
/// write a record every `steps_per_save` steps to a binary file.
///
/// The initial and the final state are always recorded.
pub fn perform_simulation<P: AsRef<Path>>(
    engine: &mut Engine,
    output: &OutputConfig,
    file: P,
) -> Result<()> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file);

    let record = Record::capture(engine, output.save_positions);
    encode::write(&mut writer, &record).context("failed to serialize record")?;

    while engine.step_count() < output.max_steps && !engine.is_over() {
        engine.step();

        let step = engine.step_count();
        let is_last = step == output.max_steps || engine.is_over();
        if step % output.steps_per_save != 0 && !is_last {
            continue;
        }

        let record = Record::capture(engine, output.save_positions);
        encode::write(&mut writer, &record).context("failed to serialize record")?;

        let progress = 100.0 * step as f64 / output.max_steps as f64;
        log::info!("completed {progress:06.2}%");
    }

    if engine.is_over() && engine.step_count() < output.max_steps {
        log::info!("epidemic ended after {} steps", engine.step_count());
    }

    writer.flush().context("failed to flush writer stream")?;

    Ok(())
}

/// Read every record of a file written by [`perform_simulation`].
pub fn read_records<P: AsRef<Path>>(file: P) -> Result<Vec<Record>> {
    let file = file.as_ref();
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let mut reader = BufReader::new(file);

    let mut records = Vec::new();
    while !reader
        .fill_buf()
        .context("failed to fill reader buffer")?
        .is_empty()
    {
        let record = decode::from_read(&mut reader).context("failed to deserialize record")?;
        records.push(record);
    }

    Ok(records)
}
