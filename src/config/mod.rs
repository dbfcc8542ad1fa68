//! Run configuration: which conditions, targets and correlations a
//! trending run evaluates
//!
//! A configuration is either built in code with [`TrendingConfig::builder`],
//! loaded from JSON, or taken from [`presets`].
//!
//! ```rust
//! use telemetry_trending::condition::Predicate;
//! use telemetry_trending::config::{Cadence, ConditionSpec, TrendingConfig};
//!
//! # fn main() -> telemetry_trending::Result<()> {
//! let config = TrendingConfig::builder(Cadence::FifteenMinute)
//!     .group(
//!         "exposure idle",
//!         vec![ConditionSpec::new("INRSD_EXP_STAT", Predicate::NotEqualsLabel("STARTED".into()))],
//!         ["INRSH_HK_P15V", "INRSH_HK_N15V"],
//!     )
//!     .unconditioned(["GP_ZPSVOLT"])
//!     .build()?;
//!
//! let json = serde_json::to_string(&config)?;
//! assert_eq!(TrendingConfig::from_json_str(&json)?, config);
//! # Ok(())
//! # }
//! ```

pub mod presets;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::condition::Predicate;
use crate::{Error, Result};

/// Batch boundary driving one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    /// Whole-day batch of change-only telemetry
    Daily,
    /// 15-minute window of high-rate telemetry
    FifteenMinute,
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => f.write_str("daily"),
            Self::FifteenMinute => f.write_str("15min"),
        }
    }
}

/// One predicate over one mnemonic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    /// Source mnemonic
    pub mnemonic: String,
    /// Predicate over its values
    pub predicate: Predicate,
}

impl ConditionSpec {
    /// Create a condition spec.
    #[must_use]
    pub fn new(mnemonic: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            predicate,
        }
    }
}

/// Targets reduced while all conditions of the group hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    /// Name used in logs
    pub name: String,
    /// Conjunction of these conditions
    pub conditions: Vec<ConditionSpec>,
    /// Mnemonics to filter and reduce
    pub targets: Vec<String>,
    /// Target → table overrides; other targets are stored under their own
    /// mnemonic
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tables: BTreeMap<String, String>,
}

impl ConditionGroup {
    /// Create a group whose targets are stored under their own mnemonics.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, conditions: Vec<ConditionSpec>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            conditions,
            targets: targets.into_iter().map(Into::into).collect(),
            tables: BTreeMap::new(),
        }
    }

    /// Store `target` under `table` instead of its mnemonic.
    #[must_use]
    pub fn with_table(mut self, target: impl Into<String>, table: impl Into<String>) -> Self {
        self.tables.insert(target.into(), table.into());
        self
    }

    /// Table the reduction of `target` is written to.
    #[must_use]
    pub fn table_for<'s>(&'s self, target: &'s str) -> &'s str {
        self.tables.get(target).map_or(target, String::as_str)
    }
}

/// Named analog channel of a lamp correlation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    /// Short name used in table keys ("CURR")
    pub name: String,
    /// Source mnemonic
    pub mnemonic: String,
}

/// Transition-to-label correlation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LampSpec {
    /// Flag mnemonic whose transitions delimit activations
    pub event: String,
    /// State opening an activation
    #[serde(default = "default_on_state")]
    pub on_state: String,
    /// State closing an activation
    #[serde(default = "default_off_state")]
    pub off_state: String,
    /// Mnemonic naming the selected device
    pub label: String,
    /// Analog channels reduced per activation
    pub channels: Vec<ChannelSpec>,
    /// Labels meaning "no device selected"
    #[serde(default)]
    pub ignored_labels: Vec<String>,
    /// Table name prefix
    #[serde(default = "default_lamp_prefix")]
    pub table_prefix: String,
}

/// Completion-event position correlation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelSpec {
    /// Move-status mnemonic
    pub event: String,
    /// Status marking a completed move
    #[serde(default = "default_completion_state")]
    pub completion_state: String,
    /// Position-label mnemonic
    pub label: String,
    /// Ratio readback mnemonic (also the table prefix)
    pub ratio: String,
    /// Labels not attributed
    #[serde(default)]
    pub ignored_labels: Vec<String>,
}

/// Nominal-matching position correlation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NominalWheelSpec {
    /// Position-label mnemonic
    pub label: String,
    /// Ratio readback mnemonic (also the table prefix)
    pub ratio: String,
    /// Conditions under which readbacks are trusted (empty: always)
    #[serde(default)]
    pub validity: Vec<ConditionSpec>,
    /// Expected readback per position
    pub nominals: BTreeMap<String, f64>,
    /// Labels not attributed
    #[serde(default)]
    pub ignored_labels: Vec<String>,
}

fn default_on_state() -> String {
    "ON".to_string()
}

fn default_off_state() -> String {
    "OFF".to_string()
}

fn default_lamp_prefix() -> String {
    "LAMP".to_string()
}

fn default_completion_state() -> String {
    "SUCCESS".to_string()
}

/// Everything one trending run evaluates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingConfig {
    /// Batch boundary
    pub cadence: Cadence,
    /// Conditioned targets
    #[serde(default)]
    pub groups: Vec<ConditionGroup>,
    /// Mnemonics reduced over all their samples
    #[serde(default)]
    pub unconditioned: Vec<String>,
    /// Lamp correlations
    #[serde(default)]
    pub lamps: Vec<LampSpec>,
    /// Completion-event wheel correlations
    #[serde(default)]
    pub wheels: Vec<WheelSpec>,
    /// Nominal-matching wheel correlations
    #[serde(default)]
    pub nominal_wheels: Vec<NominalWheelSpec>,
}

impl TrendingConfig {
    /// Start building a configuration.
    #[must_use]
    pub fn builder(cadence: Cadence) -> TrendingConfigBuilder {
        TrendingConfigBuilder::new(cadence)
    }

    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] for malformed JSON and [`Error::Config`] if
    /// validation fails.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise as
    /// [`TrendingConfig::from_json_str`].
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Check the configuration for definitions a run cannot evaluate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        for group in &self.groups {
            if group.conditions.is_empty() {
                return Err(Error::Config(format!("group '{}' has no conditions", group.name)));
            }
            check_predicates(&group.conditions, &group.name)?;
            if let Some(target) = group.tables.keys().find(|t| !group.targets.contains(t)) {
                return Err(Error::Config(format!(
                    "group '{}' names a table for {target}, which it does not target",
                    group.name
                )));
            }
        }
        self.check_continuous_tables()?;

        for lamp in &self.lamps {
            if lamp.on_state == lamp.off_state {
                return Err(Error::Config(format!(
                    "lamp correlation on {} uses '{}' as both on and off state",
                    lamp.event, lamp.on_state
                )));
            }
            if lamp.channels.is_empty() {
                return Err(Error::Config(format!(
                    "lamp correlation on {} has no channels",
                    lamp.event
                )));
            }
            let mut names = BTreeSet::new();
            if let Some(dup) = lamp.channels.iter().find(|c| !names.insert(c.name.as_str())) {
                return Err(Error::Config(format!(
                    "lamp correlation on {} repeats channel '{}'",
                    lamp.event, dup.name
                )));
            }
        }

        for wheel in &self.nominal_wheels {
            check_predicates(&wheel.validity, &wheel.ratio)?;
            if let Some((label, _)) = wheel.nominals.iter().find(|(_, v)| !v.is_finite()) {
                return Err(Error::Config(format!(
                    "nominal for {} position {label} is not finite",
                    wheel.ratio
                )));
            }
        }

        Ok(())
    }

    /// Every conditioned and unconditioned reduction needs its own table.
    fn check_continuous_tables(&self) -> Result<()> {
        let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
        let writers = self
            .groups
            .iter()
            .flat_map(|g| g.targets.iter().map(move |t| (g.table_for(t), g.name.as_str())))
            .chain(self.unconditioned.iter().map(|m| (m.as_str(), "unconditioned")));

        for (table, owner) in writers {
            if let Some(first) = owners.insert(table, owner) {
                return Err(Error::Config(format!(
                    "table {table} is written by both '{first}' and '{owner}'"
                )));
            }
        }
        Ok(())
    }
}

fn check_predicates(conditions: &[ConditionSpec], owner: &str) -> Result<()> {
    for spec in conditions {
        let reference = match &spec.predicate {
            Predicate::EqualsNumber(v) | Predicate::GreaterThan(v) | Predicate::LessThan(v) => *v,
            Predicate::EqualsLabel(_) | Predicate::NotEqualsLabel(_) => continue,
        };
        if !reference.is_finite() {
            return Err(Error::Config(format!(
                "{owner}: threshold on {} is not finite",
                spec.mnemonic
            )));
        }
    }
    Ok(())
}

/// Builder for [`TrendingConfig`].
#[derive(Debug)]
pub struct TrendingConfigBuilder {
    config: TrendingConfig,
}

impl TrendingConfigBuilder {
    /// Create an empty builder for a cadence.
    #[must_use]
    pub const fn new(cadence: Cadence) -> Self {
        Self {
            config: TrendingConfig {
                cadence,
                groups: Vec::new(),
                unconditioned: Vec::new(),
                lamps: Vec::new(),
                wheels: Vec::new(),
                nominal_wheels: Vec::new(),
            },
        }
    }

    /// Add a condition group.
    #[must_use]
    pub fn group<I, S>(mut self, name: impl Into<String>, conditions: Vec<ConditionSpec>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.groups.push(ConditionGroup::new(name, conditions, targets));
        self
    }

    /// Add a prepared condition group, e.g. one with table overrides.
    #[must_use]
    pub fn condition_group(mut self, group: ConditionGroup) -> Self {
        self.config.groups.push(group);
        self
    }

    /// Add mnemonics reduced without conditions.
    #[must_use]
    pub fn unconditioned<I, S>(mut self, mnemonics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config
            .unconditioned
            .extend(mnemonics.into_iter().map(Into::into));
        self
    }

    /// Add a lamp correlation.
    #[must_use]
    pub fn lamp(mut self, lamp: LampSpec) -> Self {
        self.config.lamps.push(lamp);
        self
    }

    /// Add a completion-event wheel correlation.
    #[must_use]
    pub fn wheel(mut self, wheel: WheelSpec) -> Self {
        self.config.wheels.push(wheel);
        self
    }

    /// Add a nominal-matching wheel correlation.
    #[must_use]
    pub fn nominal_wheel(mut self, wheel: NominalWheelSpec) -> Self {
        self.config.nominal_wheels.push(wheel);
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if validation fails.
    pub fn build(self) -> Result<TrendingConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
