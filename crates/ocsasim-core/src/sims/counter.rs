//! Controllable counter sim.
//!
//! Publishes a sawtooth count and accepts commands changing its direction,
//! step and bounds while running.

use ocsasim_proto::{Command, Component, DataRecordSchema};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::{
    config::CounterConfig,
    error::ConfigError,
    generator::{CounterState, next_count},
    simulation::{CommandOutcome, Simulation},
};

const DATASTREAM_DEFINITION: &str = "http://bottsinc.com/def/ControllableCounter";
const CONTROL_DEFINITION: &str = "http://bottsinc.com/def/ControllableCounterControl";

/// Settings a command may carry. Absent keys leave the setting alone.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CounterSettings {
    set_count_down: Option<bool>,
    set_step: Option<i64>,
    set_lower_bound: Option<i64>,
    set_upper_bound: Option<i64>,
}

impl CounterSettings {
    fn from_command(command: &Command) -> Result<Self, String> {
        serde_json::from_value(Value::Object(command.parameters.clone()))
            .map_err(|e| format!("invalid parameter: {e}"))
    }
}

/// Counter whose direction, step and bounds can be changed by command.
#[derive(Debug, Clone)]
pub struct ControllableCounter {
    state: CounterState,
}

impl ControllableCounter {
    /// Create a counter starting at `config.lower_bound`.
    pub fn new(config: CounterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { state: CounterState::from_config(&config) })
    }

    /// Current state.
    pub fn state(&self) -> &CounterState {
        &self.state
    }

    fn result(&self) -> Map<String, Value> {
        let s = &self.state;
        let mut result = Map::new();
        result.insert("count".to_string(), json!(s.count));
        result.insert("countDown".to_string(), json!(s.count_down));
        result.insert("step".to_string(), json!(s.step));
        result.insert("lowerBound".to_string(), json!(s.lower_bound));
        result.insert("upperBound".to_string(), json!(s.upper_bound));
        result
    }
}

impl Default for ControllableCounter {
    fn default() -> Self {
        Self { state: CounterState::from_config(&CounterConfig::default()) }
    }
}

impl Simulation for ControllableCounter {
    fn kind(&self) -> &'static str {
        "ControllableCounter"
    }

    fn datastream_schema(&self) -> DataRecordSchema {
        DataRecordSchema::new(
            "Controllable Counter",
            "A simple controllable counter simulation",
            DATASTREAM_DEFINITION,
        )
        .with_field(Component::timestamp())
        .with_field(Component::count("count", "Count", "http://bottsinc.com/def/CounterSim"))
        .with_field(Component::boolean("countDown", "Count Down", "http://bottsinc.com/def/CountDown"))
        .with_field(Component::count("step", "Step", "http://bottsinc.com/def/Step"))
        .with_field(Component::count("lowerBound", "Lower Bound", "http://bottsinc.com/def/LowerBound"))
        .with_field(Component::count("upperBound", "Upper Bound", "http://bottsinc.com/def/UpperBound"))
    }

    fn control_schema(&self) -> Option<DataRecordSchema> {
        let schema = DataRecordSchema::new(
            "Controllable Counter Control",
            "Control stream for the controllable counter simulation",
            CONTROL_DEFINITION,
        )
        .with_field(Component::boolean(
            "setCountDown",
            "Set Count Down",
            "http://bottsinc.com/def/SetCountDown",
        ))
        .with_field(Component::count("setStep", "Set Step", "http://bottsinc.com/def/SetStep"))
        .with_field(Component::count(
            "setLowerBound",
            "Set Lower Bound",
            "http://bottsinc.com/def/SetLowerBound",
        ))
        .with_field(Component::count(
            "setUpperBound",
            "Set Upper Bound",
            "http://bottsinc.com/def/SetUpperBound",
        ));
        Some(schema)
    }

    fn tick(&mut self, _tick: u64) -> Map<String, Value> {
        self.state.count = next_count(&self.state);
        self.result()
    }

    fn apply_command(&mut self, command: &Command) -> CommandOutcome {
        let settings = match CounterSettings::from_command(command) {
            Ok(settings) => settings,
            Err(reason) => return CommandOutcome::Rejected { reason },
        };

        // Build the candidate first so a rejected command changes nothing.
        let mut next = self.state;
        if let Some(count_down) = settings.set_count_down {
            next.count_down = count_down;
        }
        if let Some(step) = settings.set_step {
            next.step = step;
        }
        if let Some(lower) = settings.set_lower_bound {
            next.lower_bound = lower;
        }
        if let Some(upper) = settings.set_upper_bound {
            next.upper_bound = upper;
        }

        if next == self.state {
            return CommandOutcome::Unchanged;
        }
        if next.step <= 0 {
            return CommandOutcome::Rejected { reason: format!("step must be positive, got {}", next.step) };
        }
        if next.lower_bound > next.upper_bound {
            return CommandOutcome::Rejected {
                reason: format!(
                    "lower bound {} exceeds upper bound {}",
                    next.lower_bound, next.upper_bound
                ),
            };
        }

        next.count = next.count.clamp(next.lower_bound, next.upper_bound);
        self.state = next;
        CommandOutcome::Updated
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn command(parameters: Value) -> Command {
        serde_json::from_value(json!({"id": "c1", "parameters": parameters})).unwrap()
    }

    fn counter() -> ControllableCounter {
        ControllableCounter::new(CounterConfig::default()).unwrap()
    }

    #[test]
    fn starts_at_lower_bound() {
        let sim = ControllableCounter::new(CounterConfig {
            lower_bound: 5,
            upper_bound: 50,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(sim.state().count, 5);
    }

    #[test]
    fn rejects_invalid_config() {
        let result = ControllableCounter::new(CounterConfig { step: -1, ..Default::default() });
        assert!(matches!(result, Err(ConfigError::InvalidStep(-1))));
    }

    #[test]
    fn tick_reports_state_after_update() {
        let mut sim = counter();
        let result = sim.tick(1);

        assert_eq!(result["count"], json!(10));
        assert_eq!(result["countDown"], json!(false));
        assert_eq!(result["step"], json!(10));
        assert_eq!(result["lowerBound"], json!(0));
        assert_eq!(result["upperBound"], json!(100));
        assert_eq!(result.len(), 5);
    }

    #[test]
    fn step_change_applies_to_later_ticks() {
        let mut sim = counter();
        sim.tick(1);
        sim.tick(2);

        assert_eq!(sim.apply_command(&command(json!({"setStep": 20}))), CommandOutcome::Updated);
        assert_eq!(sim.tick(3)["count"], json!(40));
        assert_eq!(sim.tick(4)["count"], json!(60));
    }

    #[test]
    fn count_down_flips_once() {
        let mut sim = counter();
        let cmd = command(json!({"setCountDown": true}));

        assert_eq!(sim.apply_command(&cmd), CommandOutcome::Updated);
        assert_eq!(sim.state().sign(), -1);
        assert_eq!(sim.apply_command(&cmd), CommandOutcome::Unchanged);
        assert_eq!(sim.state().sign(), -1);
    }

    #[test]
    fn equal_values_are_unchanged() {
        let mut sim = counter();
        let cmd = command(json!({"setStep": 10, "setLowerBound": 0, "setUpperBound": 100}));
        assert_eq!(sim.apply_command(&cmd), CommandOutcome::Unchanged);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut sim = counter();
        assert_eq!(sim.apply_command(&command(json!({"setColour": "red"}))), CommandOutcome::Unchanged);
        assert_eq!(
            sim.apply_command(&command(json!({"setColour": "red", "setStep": 5}))),
            CommandOutcome::Updated
        );
        assert_eq!(sim.state().step, 5);
    }

    #[test]
    fn wrong_type_is_rejected() {
        let mut sim = counter();
        let outcome = sim.apply_command(&command(json!({"setStep": "ten"})));

        assert!(matches!(outcome, CommandOutcome::Rejected { .. }));
        assert_eq!(sim.state().step, 10);
    }

    #[test]
    fn inverted_bounds_reject_whole_command() {
        let mut sim = counter();
        let before = *sim.state();
        let outcome =
            sim.apply_command(&command(json!({"setStep": 30, "setLowerBound": 200, "setCountDown": true})));

        assert!(matches!(outcome, CommandOutcome::Rejected { .. }));
        assert_eq!(*sim.state(), before);
    }

    #[test]
    fn non_positive_step_is_rejected() {
        let mut sim = counter();
        let outcome = sim.apply_command(&command(json!({"setStep": 0})));
        assert!(matches!(outcome, CommandOutcome::Rejected { .. }));
    }

    #[test]
    fn narrowing_bounds_clamps_count() {
        let mut sim = counter();
        for tick in 1..=8 {
            sim.tick(tick);
        }
        assert_eq!(sim.state().count, 80);

        assert_eq!(sim.apply_command(&command(json!({"setUpperBound": 50}))), CommandOutcome::Updated);
        assert_eq!(sim.state().count, 50);
        assert!(sim.state().in_bounds());
    }

    #[test]
    fn control_schema_lists_settings() {
        let schema = counter().control_schema().unwrap();
        let names: Vec<_> = schema.field_names().collect();
        assert_eq!(names, ["setCountDown", "setStep", "setLowerBound", "setUpperBound"]);
    }

    #[test]
    fn datastream_schema_matches_result_fields() {
        let mut sim = counter();
        let schema = sim.datastream_schema();
        let result = sim.tick(1);

        for name in schema.field_names().filter(|n| *n != "timestamp") {
            assert!(result.contains_key(name), "result missing {name}");
        }
    }

    proptest! {
        #[test]
        fn prop_commands_preserve_invariants(
            commands in prop::collection::vec(
                (
                    prop::option::of(any::<bool>()),
                    prop::option::of(-5i64..50),
                    prop::option::of(-100i64..100),
                    prop::option::of(-100i64..100),
                ),
                1..24,
            ),
        ) {
            let mut sim = counter();
            for (tick, (count_down, step, lower, upper)) in commands.into_iter().enumerate() {
                let mut params = Map::new();
                if let Some(v) = count_down { params.insert("setCountDown".into(), json!(v)); }
                if let Some(v) = step { params.insert("setStep".into(), json!(v)); }
                if let Some(v) = lower { params.insert("setLowerBound".into(), json!(v)); }
                if let Some(v) = upper { params.insert("setUpperBound".into(), json!(v)); }

                let cmd = Command::new(format!("c{tick}"), params);
                let first = sim.apply_command(&cmd);
                let s = *sim.state();
                prop_assert!(s.in_bounds());
                prop_assert!(s.step > 0);

                // Re-sending the same command never changes anything.
                let again = sim.apply_command(&cmd);
                if first != CommandOutcome::Updated {
                    prop_assert_eq!(&again, &first);
                } else {
                    prop_assert_eq!(again, CommandOutcome::Unchanged);
                }
                prop_assert_eq!(*sim.state(), s);

                sim.tick(tick as u64 + 1);
                prop_assert!(sim.state().in_bounds());
            }
        }
    }
}
