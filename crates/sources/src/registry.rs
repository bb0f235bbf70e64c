//! Startup-built table mapping source kinds to factories.

use std::collections::HashMap;

use serde_json::Value;

use framelock_core::{Error, Result};

use crate::{
    ManualClock, ManualClockConfig, ScriptedDataSource, ScriptedSourceConfig, SimulatedClock,
    SimulatedSource, SyntheticDataSource, SyntheticSourceConfig, SystemClock, SystemClockConfig,
};

/// Factory producing a steppable clock from JSON parameters.
pub type ClockFactory = Box<dyn Fn(&str, &Value) -> Result<Box<dyn SimulatedClock>>>;

/// Factory producing a steppable data source from JSON parameters.
pub type SourceFactory = Box<dyn Fn(&str, &Value) -> Result<Box<dyn SimulatedSource>>>;

/// Explicit kind-to-factory table for building scenario actors.
///
/// Scenario files name each actor by a kind string; the registry resolves
/// the kind to a factory and hands it the actor's name and JSON parameters.
/// Unknown kinds are an error, `null` parameters mean all defaults.
pub struct SourceRegistry {
    clocks: HashMap<String, ClockFactory>,
    sources: HashMap<String, SourceFactory>,
}

impl SourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            clocks: HashMap::new(),
            sources: HashMap::new(),
        }
    }

    /// Creates a registry with the built-in kinds registered.
    ///
    /// Clocks: `manual`, `system`. Sources: `synthetic`, `scripted`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_clock("manual", |name: &str, params: &Value| {
            let config: ManualClockConfig = serde_json::from_value(params.clone())?;
            Ok(Box::new(ManualClock::from_config(name, config)))
        });
        registry.register_clock("system", |name: &str, params: &Value| {
            let config: SystemClockConfig = serde_json::from_value(params.clone())?;
            Ok(Box::new(SystemClock::from_config(name, config)))
        });
        registry.register_source("synthetic", |name: &str, params: &Value| {
            let config: SyntheticSourceConfig = serde_json::from_value(params.clone())?;
            Ok(Box::new(SyntheticDataSource::new(name, config)))
        });
        registry.register_source("scripted", |name: &str, params: &Value| {
            let config: ScriptedSourceConfig = serde_json::from_value(params.clone())?;
            Ok(Box::new(ScriptedDataSource::new(name, config)))
        });
        registry
    }

    /// Registers a clock factory under `kind`, replacing any previous one.
    pub fn register_clock(
        &mut self,
        kind: impl Into<String>,
        factory: impl Fn(&str, &Value) -> Result<Box<dyn SimulatedClock>> + 'static,
    ) {
        self.clocks.insert(kind.into(), Box::new(factory));
    }

    /// Registers a source factory under `kind`, replacing any previous one.
    pub fn register_source(
        &mut self,
        kind: impl Into<String>,
        factory: impl Fn(&str, &Value) -> Result<Box<dyn SimulatedSource>> + 'static,
    ) {
        self.sources.insert(kind.into(), Box::new(factory));
    }

    /// Builds a clock of the given kind.
    pub fn create_clock(
        &self,
        kind: &str,
        name: &str,
        params: &Value,
    ) -> Result<Box<dyn SimulatedClock>> {
        let factory = self
            .clocks
            .get(kind)
            .ok_or_else(|| Error::UnknownSourceKind(kind.to_string()))?;
        factory(name, &normalized(params))
    }

    /// Builds a data source of the given kind.
    pub fn create_source(
        &self,
        kind: &str,
        name: &str,
        params: &Value,
    ) -> Result<Box<dyn SimulatedSource>> {
        let factory = self
            .sources
            .get(kind)
            .ok_or_else(|| Error::UnknownSourceKind(kind.to_string()))?;
        factory(name, &normalized(params))
    }

    /// Registered clock kinds, sorted.
    pub fn clock_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.clocks.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Registered source kinds, sorted.
    pub fn source_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn normalized(params: &Value) -> Value {
    if params.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        params.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framelock_core::{FrameRate, FrameTime};
    use serde_json::json;

    #[test]
    fn test_default_registry_lists_builtin_kinds() {
        let registry = SourceRegistry::with_defaults();
        assert_eq!(registry.clock_kinds(), ["manual", "system"]);
        assert_eq!(registry.source_kinds(), ["scripted", "synthetic"]);
    }

    #[test]
    fn test_creates_a_manual_clock_with_params() {
        let registry = SourceRegistry::with_defaults();
        let params = json!({
            "frame_rate": { "numerator": 24, "denominator": 1 },
            "start_frame": 100,
        });
        let clock = registry.create_clock("manual", "clock-a", &params).unwrap();

        let handle = clock.timecode_source();
        let clock_ref = handle.borrow();
        assert_eq!(clock_ref.display_name(), "clock-a");
        assert_eq!(clock_ref.frame_rate(), FrameRate::new(24, 1));
        let time = clock_ref.current_time().unwrap();
        assert_eq!(time.time, FrameTime::new(100));
    }

    #[test]
    fn test_creates_a_synthetic_source_with_params() {
        let registry = SourceRegistry::with_defaults();
        let params = json!({ "latency_frames": 5, "max_buffer_size": 9 });
        let source = registry.create_source("synthetic", "cam", &params).unwrap();

        let handle = source.data_source();
        let source_ref = handle.borrow();
        assert_eq!(source_ref.display_name(), "cam");
        assert_eq!(source_ref.max_buffer_size(), Some(9));
    }

    #[test]
    fn test_null_params_mean_defaults() {
        let registry = SourceRegistry::with_defaults();
        let source = registry
            .create_source("synthetic", "cam", &Value::Null)
            .unwrap();
        let handle = source.data_source();
        assert_eq!(handle.borrow().frame_rate(), FrameRate::new(30, 1));
    }

    #[test]
    fn test_unknown_kind_is_an_error() {
        let registry = SourceRegistry::with_defaults();
        let err = registry
            .create_source("missing", "cam", &Value::Null)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownSourceKind(kind) if kind == "missing"));

        let err = registry
            .create_clock("missing", "clock", &Value::Null)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownSourceKind(_)));
    }

    #[test]
    fn test_bad_params_surface_as_json_errors() {
        let registry = SourceRegistry::with_defaults();
        let err = registry
            .create_source("synthetic", "cam", &json!({ "latency_frames": "three" }))
            .unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_custom_factories_can_be_registered() {
        let mut registry = SourceRegistry::new();
        registry.register_source("pulse", |name: &str, _params: &Value| {
            let config = SyntheticSourceConfig {
                latency_frames: 1,
                ..Default::default()
            };
            Ok(Box::new(SyntheticDataSource::new(name, config)))
        });

        assert_eq!(registry.source_kinds(), ["pulse"]);
        let source = registry.create_source("pulse", "beat", &Value::Null).unwrap();
        let handle = source.data_source();
        assert_eq!(handle.borrow().display_name(), "beat");
    }
}
