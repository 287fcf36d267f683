use crate::analysis::{Analyzer, RunSummary};
use crate::config::Config;
use crate::engine::Engine;
use crate::trajectory::{perform_simulation, read_records};
use anyhow::{Context, Result};
use glob::glob;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Simulation directory holding a `config.toml` and one directory per run.
pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    /// Simulate a new run and write its trajectory.
    pub fn create_run(&self) -> Result<()> {
        let run_idx = self.count_run_dirs().context("failed to count run dirs")?;

        let seed = self.cfg.init.seed.wrapping_add(run_idx as u64);
        let mut engine = Engine::with_removed_seeds(
            self.cfg.init.n_agents,
            self.cfg.init.n_removed,
            self.cfg.model.clone(),
            seed,
        )
        .context("failed to construct engine")?;

        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let res = perform_simulation(&mut engine, &self.cfg.output, self.trajectory_file(run_idx))
            .context("failed to perform simulation");
        if res.is_err() {
            // Every run dir must hold a complete trajectory.
            fs::remove_dir_all(&run_dir).ok();
            log::info!("removed {run_dir:?}");
        }

        res
    }

    /// Summarize every run and aggregate the summaries.
    pub fn analyze_sim(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;

        let mut analyzer = Analyzer::new();
        for run_idx in 0..n_runs {
            let trajectory_file = self.trajectory_file(run_idx);
            let records = read_records(&trajectory_file)
                .with_context(|| format!("failed to read {trajectory_file:?}"))?;

            let summary =
                RunSummary::from_records(&records).context("failed to summarize run")?;
            log::debug!("run {run_idx}: {summary:?}");

            summary
                .save(self.summary_file(run_idx))
                .context("failed to save summary")?;
            analyzer.add_summary(&summary);
        }

        analyzer
            .save_results(self.results_file())
            .context("failed to save results")?;
        log::info!("analyzed {n_runs} runs");

        Ok(())
    }

    /// Remove every run directory and the aggregated results.
    pub fn clean_sim(&self) -> Result<()> {
        for run_dir in self.run_dirs().context("failed to list run dirs")? {
            fs::remove_dir_all(&run_dir)
                .with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }

        let results_file = self.results_file();
        if results_file.exists() {
            fs::remove_file(&results_file)
                .with_context(|| format!("failed to remove {results_file:?}"))?;
        }

        Ok(())
    }

    fn run_dirs(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let run_dirs = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .collect();
        Ok(run_dirs)
    }

    fn count_run_dirs(&self) -> Result<usize> {
        Ok(self.run_dirs()?.len())
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    fn trajectory_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("trajectory.msgpack")
    }

    fn summary_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("summary.msgpack")
    }

    fn results_file(&self) -> PathBuf {
        self.sim_dir.join("results.msgpack")
    }
}
