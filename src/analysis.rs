use crate::population::StateCounts;
use crate::stats::{Accumulator, AccumulatorReport};
use crate::trajectory::Record;
use anyhow::{Context, Result};
use rmp_serde::encode;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Epidemic summary of a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub n_agents: usize,

    /// Largest recorded number of infected agents and its step.
    pub peak_infected: usize,
    pub peak_step: usize,

    /// First recorded step without infected agents, if any.
    pub end_step: Option<usize>,

    pub final_step: usize,
    pub final_counts: StateCounts,

    /// Fraction of the population that was infected at some point.
    pub attack_rate: f64,
}

impl RunSummary {
    pub fn from_records(records: &[Record]) -> Result<Self> {
        let first = records.first().context("trajectory has no records")?;
        let last = records.last().context("trajectory has no records")?;

        let mut peak_infected = 0;
        let mut peak_step = first.step;
        for rec in records {
            if rec.counts.infected > peak_infected {
                peak_infected = rec.counts.infected;
                peak_step = rec.step;
            }
        }

        let end_step = records
            .iter()
            .find(|rec| rec.counts.infected == 0)
            .map(|rec| rec.step);

        let n_agents = first.counts.total();
        let ever_infected = (first.counts.infected + first.counts.susceptible)
            .checked_sub(last.counts.susceptible)
            .context("susceptible count grew during the run")?;

        Ok(Self {
            n_agents,
            peak_infected,
            peak_step,
            end_step,
            final_step: last.step,
            final_counts: last.counts,
            attack_rate: ever_infected as f64 / n_agents as f64,
        })
    }

    pub fn save<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        write_named(self, file.as_ref())
    }
}

/// Statistics over the summaries of every run.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct SimReport {
    pub n_runs: usize,
    pub n_ended: usize,
    pub peak_infected: AccumulatorReport,
    pub peak_step: AccumulatorReport,
    pub end_step: AccumulatorReport,
    pub attack_rate: AccumulatorReport,
}

#[derive(Default)]
pub struct Analyzer {
    n_runs: usize,
    peak_infected: Accumulator,
    peak_step: Accumulator,
    end_step: Accumulator,
    attack_rate: Accumulator,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_summary(&mut self, summary: &RunSummary) {
        self.n_runs += 1;
        self.peak_infected.add(summary.peak_infected as f64);
        self.peak_step.add(summary.peak_step as f64);
        if let Some(end_step) = summary.end_step {
            self.end_step.add(end_step as f64);
        }
        self.attack_rate.add(summary.attack_rate);
    }

    pub fn report(&self) -> SimReport {
        let end_step = self.end_step.report();
        SimReport {
            n_runs: self.n_runs,
            n_ended: end_step.n_vals,
            peak_infected: self.peak_infected.report(),
            peak_step: self.peak_step.report(),
            end_step,
            attack_rate: self.attack_rate.report(),
        }
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        write_named(&self.report(), file.as_ref())
    }
}

fn write_named<T: Serialize>(val: &T, file: &Path) -> Result<()> {
    let file_handle = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file_handle);
    encode::write_named(&mut writer, val).context("failed to serialize results")?;
    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}
