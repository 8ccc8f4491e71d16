//! Controllable counter running end to end: ticks, commands, statuses.

use std::{sync::Arc, time::Duration};

use chrono::TimeDelta;
use ocsasim_core::{
    ControlStreamId, ControllableCounter, CounterConfig, DatastreamId, Environment, Sim, SimConfig,
};
use ocsasim_harness::{MemoryHub, TestEnv};
use ocsasim_proto::StatusCode;
use serde_json::json;

const INTERVAL: Duration = Duration::from_secs(5);

struct Running {
    hub: Arc<MemoryHub>,
    env: TestEnv,
    sim: Sim<ControllableCounter, MemoryHub, TestEnv>,
    datastream: DatastreamId,
    control: ControlStreamId,
}

impl Running {
    async fn start(config: SimConfig, counter: CounterConfig) -> Self {
        let hub = Arc::new(MemoryHub::new());
        let env = TestEnv::new(3);
        let mut sim = Sim::new(
            ControllableCounter::new(counter).unwrap(),
            config.with_interval(INTERVAL),
            Arc::clone(&hub),
            env.clone(),
        )
        .unwrap();

        sim.insert().await.unwrap();
        let resources = sim.resources().cloned().unwrap();
        sim.start().await.unwrap();

        Self {
            hub,
            env,
            sim,
            datastream: resources.datastream,
            control: resources.control_stream.unwrap(),
        }
    }

    async fn default() -> Self {
        Self::start(SimConfig::named("Counter"), CounterConfig::default()).await
    }

    fn counts(&self) -> Vec<i64> {
        self.hub
            .observations(&self.datastream)
            .iter()
            .map(|obs| obs.result["count"].as_i64().unwrap())
            .collect()
    }

    fn command(&self, raw: serde_json::Value) {
        self.hub.send_command(&self.control, raw.to_string()).unwrap();
    }

    fn statuses(&self) -> Vec<(String, StatusCode)> {
        self.hub
            .statuses(&self.control)
            .into_iter()
            .map(|status| (status.command_id, status.status_code))
            .collect()
    }
}

/// Sleep until `secs` after the sim started.
async fn advance_to(env: &TestEnv, secs: f64) {
    let target = Duration::from_secs_f64(secs);
    tokio::time::sleep(target.saturating_sub(env.elapsed())).await;
}

#[tokio::test(start_paused = true)]
async fn first_tick_fires_immediately() {
    let run = Running::default().await;
    advance_to(&run.env, 0.5).await;
    assert_eq!(run.counts(), [10]);
}

#[tokio::test(start_paused = true)]
async fn counts_in_a_sawtooth() {
    let run = Running::default().await;
    advance_to(&run.env, 52.5).await;

    assert_eq!(run.counts(), [10, 20, 30, 40, 50, 60, 70, 80, 90, 0, 10]);
}

#[tokio::test(start_paused = true)]
async fn observations_are_stamped_per_tick() {
    let run = Running::default().await;
    advance_to(&run.env, 11.0).await;

    let observations = run.hub.observations(&run.datastream);
    assert_eq!(observations.len(), 3);
    for (k, obs) in observations.iter().enumerate() {
        let expected = run.env.epoch() + TimeDelta::seconds(5 * k as i64);
        assert_eq!(obs.result_time, expected);
        assert_eq!(obs.phenomenon_time, obs.result_time);
        assert_eq!(obs.result["step"], json!(10));
        assert_eq!(obs.result["countDown"], json!(false));
    }
}

#[tokio::test(start_paused = true)]
async fn step_change_mid_sequence() {
    let run = Running::default().await;
    advance_to(&run.env, 12.0).await;
    assert_eq!(run.counts(), [10, 20, 30]);

    run.command(json!({"id": "c1", "parameters": {"setStep": 20}}));
    advance_to(&run.env, 22.0).await;

    assert_eq!(run.counts(), [10, 20, 30, 50, 70]);
    let statuses = run.hub.statuses(&run.control);
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].command_id, "c1");
    assert_eq!(statuses[0].status_code, StatusCode::Completed);
    assert_eq!(statuses[0].message, "Command processed successfully");
}

#[tokio::test(start_paused = true)]
async fn count_down_wraps_to_upper_bound() {
    let run = Running::default().await;
    advance_to(&run.env, 6.0).await;
    assert_eq!(run.counts(), [10, 20]);

    run.command(json!({"id": "down", "parameters": {"setCountDown": true}}));
    advance_to(&run.env, 16.0).await;

    assert_eq!(run.counts(), [10, 20, 10, 100]);
}

#[tokio::test(start_paused = true)]
async fn repeated_command_completes_once() {
    let run = Running::default().await;
    advance_to(&run.env, 1.0).await;

    run.command(json!({"id": "a", "parameters": {"setCountDown": true}}));
    run.command(json!({"id": "b", "parameters": {"setCountDown": true}}));
    advance_to(&run.env, 2.0).await;

    assert_eq!(run.statuses(), [("a".to_string(), StatusCode::Completed)]);
}

#[tokio::test(start_paused = true)]
async fn no_effect_command_acknowledged_when_enabled() {
    let config = SimConfig { acknowledge_noop: true, ..SimConfig::named("Counter") };
    let run = Running::start(config, CounterConfig::default()).await;
    advance_to(&run.env, 1.0).await;

    run.command(json!({"id": "a", "parameters": {"setStep": 15}}));
    run.command(json!({"id": "b", "parameters": {"setStep": 15}}));
    advance_to(&run.env, 2.0).await;

    assert_eq!(
        run.statuses(),
        [("a".to_string(), StatusCode::Completed), ("b".to_string(), StatusCode::Noop)]
    );
}

#[tokio::test(start_paused = true)]
async fn no_effect_and_malformed_commands_are_silent() {
    let run = Running::default().await;
    advance_to(&run.env, 1.0).await;

    run.command(json!({"id": "same", "parameters": {"setStep": 10, "setLowerBound": 0}}));
    run.command(json!({"id": "unknown", "parameters": {"setSpeed": 3}}));
    run.command(json!({"parameters": {"setStep": 99}}));
    run.hub.send_command(&run.control, "not json").unwrap();
    advance_to(&run.env, 6.0).await;

    assert!(run.statuses().is_empty());
    assert_eq!(run.counts(), [10, 20]);
}

#[tokio::test(start_paused = true)]
async fn invalid_bounds_fail_atomically() {
    let run = Running::default().await;
    advance_to(&run.env, 1.0).await;

    run.command(json!({"id": "bad", "parameters": {"setStep": 1, "setLowerBound": 500}}));
    run.command(json!({"id": "neg", "parameters": {"setStep": -3}}));
    run.command(json!({"id": "type", "parameters": {"setUpperBound": "high"}}));
    advance_to(&run.env, 6.0).await;

    assert_eq!(
        run.statuses(),
        [
            ("bad".to_string(), StatusCode::Failed),
            ("neg".to_string(), StatusCode::Failed),
            ("type".to_string(), StatusCode::Failed),
        ]
    );
    assert_eq!(run.counts(), [10, 20]);
}

#[tokio::test(start_paused = true)]
async fn narrowed_bounds_clamp_next_observation() {
    let run = Running::default().await;
    advance_to(&run.env, 31.0).await;
    assert_eq!(run.counts().last(), Some(&70));

    run.command(json!({"id": "narrow", "parameters": {"setUpperBound": 40, "setLowerBound": 20}}));
    advance_to(&run.env, 36.0).await;

    let observations = run.hub.observations(&run.datastream);
    let last = &observations.last().unwrap().result;
    assert_eq!(last["lowerBound"], json!(20));
    assert_eq!(last["upperBound"], json!(40));
    // Clamped to 40, then the next step reaches the upper bound and wraps.
    assert_eq!(last["count"], json!(20));
}

#[tokio::test(start_paused = true)]
async fn publish_failures_do_not_stop_ticking() {
    let run = Running::default().await;
    advance_to(&run.env, 1.0).await;

    run.hub.set_reject_publish(true);
    advance_to(&run.env, 11.0).await;
    run.hub.set_reject_publish(false);
    advance_to(&run.env, 16.0).await;

    assert_eq!(run.counts(), [10, 40]);
}

#[tokio::test(start_paused = true)]
async fn nothing_published_after_stop() {
    let mut run = Running::default().await;
    advance_to(&run.env, 12.0).await;
    run.command(json!({"id": "late", "parameters": {"setStep": 25}}));
    tokio::time::sleep(Duration::from_millis(1)).await;

    run.sim.stop().await.unwrap();
    let observations = run.hub.observations(&run.datastream).len();
    let statuses = run.statuses();

    tokio::time::sleep(Duration::from_secs(60)).await;
    // The subscriber is gone with the listener, so the hub refuses delivery.
    let late = json!({"id": "after", "parameters": {"setStep": 30}}).to_string();
    assert!(run.hub.send_command(&run.control, late).is_err());
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(observations, 3);
    assert_eq!(run.hub.observations(&run.datastream).len(), observations);
    assert_eq!(statuses, [("late".to_string(), StatusCode::Completed)]);
    assert_eq!(run.statuses(), statuses);
    assert_eq!(run.sim.simulation().unwrap().state().step, 25);
}

#[tokio::test(start_paused = true)]
async fn queued_commands_do_not_hold_back_due_tick() {
    let mut run = Running::default().await;
    // Every publish takes 2 s: tick 1 lands at 2 s and the next tick is due at 7 s.
    run.hub.set_publish_delay(Duration::from_secs(2));
    advance_to(&run.env, 2.5).await;
    assert_eq!(run.counts(), [10]);

    // Ten changing commands are 20 s of status publishing. The due tick runs
    // after the one in flight at 7 s, publishing at 10.5 s.
    for step in 1..=10 {
        run.command(json!({"id": format!("s{step}"), "parameters": {"setStep": step}}));
    }
    advance_to(&run.env, 12.0).await;

    assert_eq!(run.counts().len(), 2);
    assert_eq!(run.statuses().len(), 3);
    run.hub.set_publish_delay(Duration::ZERO);
    run.sim.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn closed_command_stream_keeps_generator_running() {
    let mut run = Running::default().await;
    advance_to(&run.env, 1.0).await;

    run.hub.close_commands(&run.control);
    advance_to(&run.env, 11.0).await;

    assert_eq!(run.counts(), [10, 20, 30]);
    run.sim.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn sim_ids_come_from_environment() {
    let hub = Arc::new(MemoryHub::new());
    let env = TestEnv::new(11);
    let expected = TestEnv::new(11).random_u64();

    let sim = Sim::new(ControllableCounter::default(), SimConfig::named("Id"), hub, env).unwrap();
    assert_eq!(sim.id().instance, expected);
    assert_eq!(sim.id().name, "Id");
}
