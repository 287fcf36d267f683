use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_value::Value;
use std::{collections::BTreeMap, fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Epidemic model parameters.
///
/// Every field is optional when deserializing: missing keys keep their
/// default value and unknown keys are rejected.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Params {
    /// Contact distance below which an infection can happen.
    #[serde(alias = "inf_dist", alias = "infectionRadius")]
    pub infection_radius: f64,
    /// Number of steps an agent stays infectious before being removed.
    #[serde(alias = "inf_dur", alias = "infectionDuration")]
    pub infection_duration: u32,
    /// Transmission probability per contact and step.
    #[serde(alias = "inf_prob", alias = "infectionProbability")]
    pub infection_probability: f64,
    /// Displacement of every agent per step.
    #[serde(alias = "move_dist", alias = "moveStep")]
    pub move_step: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            infection_radius: 0.03,
            infection_duration: 14,
            infection_probability: 0.2,
            move_step: 0.01,
        }
    }
}

impl Params {
    /// Merge a key-value mapping over the default parameters.
    ///
    /// Keys may use either the short (`inf_dist`) or the long
    /// (`infectionRadius`) spelling.
    ///
    /// # Errors
    /// Returns an error if a key is unknown, a value has the wrong type,
    /// or the resulting parameters are invalid.
    pub fn from_overrides<I, K>(overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let map: BTreeMap<Value, Value> = overrides
            .into_iter()
            .map(|(key, val)| (Value::String(key.into()), val))
            .collect();

        let params: Params = Value::Map(map)
            .deserialize_into()
            .context("failed to deserialize parameter overrides")?;

        params.validate().context("failed to validate params")?;

        Ok(params)
    }

    /// Check that every parameter lies in its valid domain.
    pub fn validate(&self) -> Result<()> {
        if !(self.infection_radius > 0.0 && self.infection_radius.is_finite()) {
            bail!(
                "infection radius must be positive and finite, but is {:?}",
                self.infection_radius
            );
        }
        check_num(self.infection_probability, 0.0..=1.0)
            .context("invalid infection probability")?;
        check_num(self.move_step, 0.0..=1.0).context("invalid move step")?;
        Ok(())
    }
}

/// Initial condition of every run.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitConfig {
    /// Number of agents.
    pub n_agents: usize,
    /// Number of agents seeded as removed next to the infected one.
    #[serde(default)]
    pub n_removed: usize,
    /// Base seed; run `k` is seeded with `seed + k`.
    #[serde(default)]
    pub seed: u64,
}

/// Output cadence of every run.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Maximum number of steps per run.
    pub max_steps: usize,
    /// Number of steps between recorded frames.
    pub steps_per_save: usize,
    /// Record agent positions in every frame.
    #[serde(default = "default_save_positions")]
    pub save_positions: bool,
}

fn default_save_positions() -> bool {
    true
}

/// Simulation configuration.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub model: Params,
    pub init: InitConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.model.validate().context("invalid model params")?;

        check_num(self.init.n_agents, 1..=1_000_000).context("invalid number of agents")?;
        check_num(self.init.n_removed, 0..self.init.n_agents)
            .context("invalid number of removed seed agents")?;

        check_num(self.output.max_steps, 1..=1_000_000).context("invalid maximum number of steps")?;
        check_num(self.output.steps_per_save, 1..=self.output.max_steps)
            .context("invalid number of steps per save")?;

        Ok(())
    }
}

/// Check that `num` lies in `range`.
pub fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_accept_both_spellings() {
        let params = Params::from_overrides([
            ("inf_dist", Value::F64(0.05)),
            ("infectionDuration", Value::U32(3)),
        ])
        .unwrap();

        assert_eq!(params.infection_radius, 0.05);
        assert_eq!(params.infection_duration, 3);
        assert_eq!(params.infection_probability, 0.2);
        assert_eq!(params.move_step, 0.01);
    }

    #[test]
    fn empty_overrides_give_defaults() {
        let params = Params::from_overrides(Vec::<(String, Value)>::new()).unwrap();
        assert_eq!(params, Params::default());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let res = Params::from_overrides([("inf_speed", Value::F64(0.1))]);
        assert!(res.is_err());
    }

    #[test]
    fn out_of_domain_values_are_rejected() {
        assert!(Params::from_overrides([("inf_dist", Value::F64(0.0))]).is_err());
        assert!(Params::from_overrides([("inf_dist", Value::F64(-0.1))]).is_err());
        assert!(Params::from_overrides([("inf_prob", Value::F64(1.5))]).is_err());
        assert!(Params::from_overrides([("inf_prob", Value::F64(-0.5))]).is_err());
        assert!(Params::from_overrides([("move_dist", Value::F64(-0.01))]).is_err());
        assert!(Params::from_overrides([("inf_dur", Value::I64(-1))]).is_err());
    }

    #[test]
    fn config_parses_from_toml() {
        let config: Config = toml::from_str(
            r#"
[model]
inf_dist = 0.05
inf_prob = 0.5

[init]
n_agents = 200
seed = 3

[output]
max_steps = 100
steps_per_save = 10
"#,
        )
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.model.infection_radius, 0.05);
        assert_eq!(config.model.infection_duration, 14);
        assert_eq!(config.init.n_removed, 0);
        assert!(config.output.save_positions);
    }

    #[test]
    fn config_rejects_too_many_removed_seeds() {
        let config: Config = toml::from_str(
            r#"
[init]
n_agents = 2
n_removed = 2

[output]
max_steps = 10
steps_per_save = 1
"#,
        )
        .unwrap();

        assert!(config.validate().is_err());
    }
}
