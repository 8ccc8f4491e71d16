//! Fuzz target for the [`CommandProcessor`] driving a controllable counter
//!
//! Hostile command payloads must never corrupt counter state
//!
//! # Strategy
//!
//! - Raw bytes: arbitrary payloads straight off the control stream
//! - Structured commands: recognized keys with extreme or mistyped values
//! - Interleaving: ticks between commands, as the generator loop does
//!
//! # Invariants
//!
//! - `lower_bound <= count <= upper_bound` after every command and tick
//! - `step > 0` always
//! - At most one status per command, echoing the command id
//! - `COMPLETED` iff state changed; `FAILED` leaves state untouched
//! - Malformed payloads produce no status and no change
//! - NEVER panic on any input

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ocsasim_core::{CommandProcessor, ControllableCounter, CounterConfig, Simulation};
use ocsasim_proto::{Command, StatusCode};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Arbitrary)]
enum FuzzValue {
    Int(i64),
    Bool(bool),
    Float(f64),
    Text(String),
    Null,
}

impl FuzzValue {
    fn to_json(&self) -> Value {
        match self {
            Self::Int(v) => json!(v),
            Self::Bool(v) => json!(v),
            Self::Float(v) => json!(v),
            Self::Text(v) => json!(v),
            Self::Null => Value::Null,
        }
    }
}

#[derive(Debug, Clone, Arbitrary)]
enum FuzzEvent {
    Raw(Vec<u8>),
    Command {
        id: String,
        count_down: Option<FuzzValue>,
        step: Option<FuzzValue>,
        lower: Option<FuzzValue>,
        upper: Option<FuzzValue>,
        extra: Option<(String, FuzzValue)>,
    },
    Tick,
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzInput {
    acknowledge_noop: bool,
    lower: i16,
    span: u16,
    step: u16,
    events: Vec<FuzzEvent>,
}

fn encode(event: &FuzzEvent) -> Option<(Option<String>, Vec<u8>)> {
    match event {
        FuzzEvent::Raw(bytes) => {
            let id = Command::decode(bytes).ok().map(|c| c.id);
            Some((id, bytes.clone()))
        },
        FuzzEvent::Command { id, count_down, step, lower, upper, extra } => {
            let mut parameters = Map::new();
            let keys = [
                ("setCountDown", count_down),
                ("setStep", step),
                ("setLowerBound", lower),
                ("setUpperBound", upper),
            ];
            for (key, value) in keys {
                if let Some(value) = value {
                    parameters.insert(key.to_string(), value.to_json());
                }
            }
            if let Some((key, value)) = extra {
                parameters.insert(key.clone(), value.to_json());
            }
            let command = Command::new(id.clone(), parameters);
            Some((Some(command.id.clone()), command.encode().ok()?))
        },
        FuzzEvent::Tick => None,
    }
}

fuzz_target!(|input: FuzzInput| {
    let config = CounterConfig {
        lower_bound: i64::from(input.lower),
        upper_bound: i64::from(input.lower) + i64::from(input.span),
        step: i64::from(input.step).max(1),
        count_down: false,
    };
    let Ok(mut counter) = ControllableCounter::new(config) else { return };
    let processor = CommandProcessor::new(input.acknowledge_noop);

    for (tick, event) in input.events.iter().enumerate() {
        let Some((id, raw)) = encode(event) else {
            counter.tick(tick as u64 + 1);
            assert!(counter.state().in_bounds(), "tick left bounds: {:?}", counter.state());
            continue;
        };

        let before = *counter.state();
        let status = processor.process(&mut counter, &raw);
        let after = *counter.state();

        assert!(after.in_bounds(), "command left bounds: {:?}", after);
        assert!(after.step > 0, "command made step non-positive: {:?}", after);

        match (&id, &status) {
            (None, Some(status)) => panic!("status {:?} for malformed payload", status),
            (None, None) => assert_eq!(before, after, "malformed payload changed state"),
            (Some(id), Some(status)) => {
                assert_eq!(&status.command_id, id, "status must echo command id");
                match status.status_code {
                    StatusCode::Completed => assert_ne!(before, after, "COMPLETED without change"),
                    StatusCode::Failed | StatusCode::Noop => {
                        assert_eq!(before, after, "{:?} changed state", status.status_code)
                    },
                }
            },
            (Some(_), None) => assert_eq!(before, after, "silent command changed state"),
        }
    }
});
