//! Scenario file schema
//!
//! A scenario describes one rehearsal: the reference clock, the data sources
//! feeding it, how the simulation is paced, and the calibration settings. The
//! clock and every source name a registry kind plus free-form JSON parameters
//! that the kind's factory understands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use framelock_core::CalibrationConfig;

fn default_tick_rate() -> f64 {
    30.0
}

fn default_warmup_ticks() -> u32 {
    30
}

fn default_steady_ticks() -> u32 {
    120
}

/// One rehearsal: clock, sources, pacing and calibration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Label used in logs and the report. Defaults to the file stem.
    #[serde(default)]
    pub name: Option<String>,

    /// The reference clock actor.
    pub clock: ActorSpec,

    /// Simulation ticks per second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: f64,

    /// Ticks to run before calibration starts, letting buffers fill.
    #[serde(default = "default_warmup_ticks")]
    pub warmup_ticks: u32,

    /// Ticks of steady-state presentation after calibration.
    #[serde(default = "default_steady_ticks")]
    pub steady_ticks: u32,

    /// Calibration settings; omitted fields keep the engine defaults.
    #[serde(default)]
    pub calibration: CalibrationConfig,

    /// The data sources to synchronize.
    pub sources: Vec<ActorSpec>,
}

impl Scenario {
    /// Loads and parses a scenario file, filling the name from the file stem
    /// when the scenario does not carry one.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        let mut scenario: Scenario = serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse scenario {}", path.display()))?;
        if scenario.name.is_none() {
            scenario.name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned());
        }
        Ok(scenario)
    }

    /// The scenario's label.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("scenario")
    }

    /// Seconds of simulated time each tick covers.
    pub fn tick_seconds(&self) -> f64 {
        if self.tick_rate > 0.0 {
            1.0 / self.tick_rate
        } else {
            1.0 / default_tick_rate()
        }
    }
}

/// A clock or source to build through the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorSpec {
    /// Registry kind, e.g. `manual` or `synthetic`.
    pub kind: String,

    /// Display name. Defaults to the kind.
    #[serde(default)]
    pub name: Option<String>,

    /// Parameters handed to the kind's factory. `null` means all defaults.
    #[serde(default)]
    pub params: Value,
}

impl ActorSpec {
    /// The actor's display name.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.kind)
    }
}
