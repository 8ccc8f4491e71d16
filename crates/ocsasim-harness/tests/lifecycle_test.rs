//! Lifecycle transitions of a `Sim` against the in-memory hub.

use std::{sync::Arc, time::Duration};

use ocsasim_core::{
    ControllableCounter, GpsSim, PathConfig, Sim, SimConfig, SimControl, SimError, SimPhase,
};
use ocsasim_harness::{MemoryHub, TestEnv};

type CounterSim = Sim<ControllableCounter, MemoryHub, TestEnv>;

fn counter_sim(hub: &Arc<MemoryHub>, env: &TestEnv) -> CounterSim {
    let config = SimConfig::named("Lifecycle Counter").with_interval(Duration::from_secs(5));
    Sim::new(ControllableCounter::default(), config, Arc::clone(hub), env.clone()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn full_lifecycle() {
    let hub = Arc::new(MemoryHub::new());
    let mut sim = counter_sim(&hub, &TestEnv::new(1));
    assert_eq!(sim.phase(), SimPhase::Created);

    sim.insert().await.unwrap();
    assert_eq!(sim.phase(), SimPhase::Registered);
    let resources = sim.resources().cloned().unwrap();
    assert!(resources.control_stream.is_some());

    sim.start().await.unwrap();
    assert_eq!(sim.phase(), SimPhase::Running);
    assert!(sim.simulation().is_none());

    tokio::time::sleep(Duration::from_millis(500)).await;
    sim.stop().await.unwrap();
    assert_eq!(sim.phase(), SimPhase::Stopped);
    assert_eq!(sim.simulation().unwrap().state().count, 10);
}

#[tokio::test(start_paused = true)]
async fn insert_registers_system_and_streams() {
    let hub = Arc::new(MemoryHub::new());
    let mut sim = counter_sim(&hub, &TestEnv::new(1));
    sim.insert().await.unwrap();

    let system = hub.system_named("lifecycleCounter").unwrap();
    assert_eq!(system.description.label, "Lifecycle Counter");
    assert_eq!(system.description.urn, "urn:OCSASim:ControllableCounter:lifecycleCounter");

    let datastreams = hub.datastreams_of(&system.id);
    let control_streams = hub.control_streams_of(&system.id);
    assert_eq!(datastreams.len(), 1);
    assert_eq!(control_streams.len(), 1);

    let schema = hub.datastream_schema(&datastreams[0]).unwrap();
    assert_eq!(schema.definition, "http://bottsinc.com/def/ControllableCounter");
    let control = hub.control_schema(&control_streams[0]).unwrap();
    assert_eq!(control.fields.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn wrong_phase_is_rejected_without_change() {
    let hub = Arc::new(MemoryHub::new());
    let mut sim = counter_sim(&hub, &TestEnv::new(1));

    let err = sim.start().await.unwrap_err();
    assert!(matches!(err, SimError::InvalidTransition { operation: "start", phase: SimPhase::Created }));
    assert!(!err.is_fatal());
    assert_eq!(sim.phase(), SimPhase::Created);

    let err = sim.stop().await.unwrap_err();
    assert!(matches!(err, SimError::InvalidTransition { operation: "stop", .. }));
    assert_eq!(sim.phase(), SimPhase::Created);

    sim.insert().await.unwrap();
    let err = sim.insert().await.unwrap_err();
    assert!(matches!(err, SimError::InvalidTransition { phase: SimPhase::Registered, .. }));
    assert_eq!(sim.phase(), SimPhase::Registered);
    assert!(sim.resources().is_some());
}

#[tokio::test(start_paused = true)]
async fn stopped_is_terminal() {
    let hub = Arc::new(MemoryHub::new());
    let mut sim = counter_sim(&hub, &TestEnv::new(1));
    sim.insert().await.unwrap();
    sim.start().await.unwrap();
    sim.stop().await.unwrap();

    for err in [sim.insert().await, sim.start().await, sim.stop().await] {
        assert!(matches!(err, Err(SimError::InvalidTransition { phase: SimPhase::Stopped, .. })));
    }
    assert_eq!(sim.phase(), SimPhase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn registration_failure_is_fatal() {
    let hub = Arc::new(MemoryHub::new());
    hub.set_unreachable(true);
    let mut sim = counter_sim(&hub, &TestEnv::new(1));

    let err = sim.insert().await.unwrap_err();
    assert!(matches!(err, SimError::Registration { .. }));
    assert!(err.is_fatal());
    assert_eq!(sim.phase(), SimPhase::Stopped);

    hub.set_unreachable(false);
    assert!(matches!(sim.start().await, Err(SimError::InvalidTransition { .. })));
}

#[tokio::test(start_paused = true)]
async fn channel_failure_is_fatal() {
    let hub = Arc::new(MemoryHub::new());
    let mut sim = counter_sim(&hub, &TestEnv::new(1));
    sim.insert().await.unwrap();

    hub.set_unreachable(true);
    let err = sim.start().await.unwrap_err();
    assert!(matches!(err, SimError::Channel { .. }));
    assert_eq!(sim.phase(), SimPhase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn duplicate_system_is_rejected() {
    let hub = Arc::new(MemoryHub::new());
    let env = TestEnv::new(1);
    let mut first = counter_sim(&hub, &env);
    let mut second = counter_sim(&hub, &env);

    first.insert().await.unwrap();
    assert!(matches!(second.insert().await, Err(SimError::Registration { .. })));
    assert_ne!(first.id(), second.id());
}

#[tokio::test(start_paused = true)]
async fn stop_times_out_on_stuck_publish() {
    let hub = Arc::new(MemoryHub::new());
    hub.set_stall_publish(true);

    let config = SimConfig { stop_timeout: Duration::from_secs(2), ..SimConfig::named("Stuck") };
    let mut sim = Sim::new(ControllableCounter::default(), config, Arc::clone(&hub), TestEnv::new(1)).unwrap();
    sim.insert().await.unwrap();
    sim.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(hub.live_publishers(), 2);

    let err = sim.stop().await.unwrap_err();
    assert!(matches!(err, SimError::StopTimeout(d) if d == Duration::from_secs(2)));
    assert_eq!(sim.phase(), SimPhase::Stopped);
    assert!(sim.simulation().is_none());
    // Aborted loops are gone, along with the stuck publish, once stop returns.
    assert_eq!(hub.live_publishers(), 0);
}

#[tokio::test(start_paused = true)]
async fn clean_stop_releases_publishers() {
    let hub = Arc::new(MemoryHub::new());
    let mut sim = counter_sim(&hub, &TestEnv::new(1));
    sim.insert().await.unwrap();
    sim.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(hub.live_publishers(), 2);

    sim.stop().await.unwrap();
    assert_eq!(hub.live_publishers(), 0);
}

#[tokio::test(start_paused = true)]
async fn dropping_running_sim_stops_publishing() {
    let hub = Arc::new(MemoryHub::new());
    let mut sim = counter_sim(&hub, &TestEnv::new(1));
    sim.insert().await.unwrap();
    let datastream = sim.resources().unwrap().datastream.clone();
    sim.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    drop(sim);
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(hub.observations(&datastream).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn sims_of_different_kinds_behind_one_handle() {
    let hub = Arc::new(MemoryHub::new());
    let env = TestEnv::new(9);

    let counter = counter_sim(&hub, &env);
    let gps = Sim::new(
        GpsSim::new(PathConfig::default()).unwrap(),
        SimConfig::named("Sim GPS").with_interval(Duration::from_secs(2)),
        Arc::clone(&hub),
        env.clone(),
    )
    .unwrap();

    let mut sims: Vec<Box<dyn SimControl>> = vec![Box::new(counter), Box::new(gps)];
    for sim in &mut sims {
        sim.insert().await.unwrap();
        sim.start().await.unwrap();
    }
    tokio::time::sleep(Duration::from_secs(3)).await;
    for sim in &mut sims {
        sim.stop().await.unwrap();
        assert_eq!(sim.phase(), SimPhase::Stopped);
    }

    assert_eq!(hub.systems().len(), 2);
}
