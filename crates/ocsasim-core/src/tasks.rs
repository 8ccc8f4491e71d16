//! The two loops of a running sim.
//!
//! The generator loop owns the [`Simulation`] and is the only code that
//! mutates it. The listener loop never touches state: it forwards raw command
//! bytes to the generator over a bounded queue, so commands and ticks are
//! applied in a single total order.
//!
//! ```text
//!  Subscriber ──recv──► listener ──mpsc──► generator ──► datastream Publisher
//!                                             │
//!                                             └────────► status Publisher
//! ```

use std::time::Duration;

use bytes::Bytes;
use ocsasim_proto::Observation;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::{
    env::Environment,
    hub::{Publisher, Subscriber},
    processor::CommandProcessor,
    simulation::Simulation,
};

/// Everything the generator loop owns while it runs.
pub(crate) struct GeneratorLoop<S, E> {
    pub(crate) sim: String,
    pub(crate) simulation: S,
    pub(crate) env: E,
    pub(crate) interval: Duration,
    pub(crate) datastream: Box<dyn Publisher>,
    /// Raw commands forwarded by the listener; `None` if not controllable.
    pub(crate) commands: Option<mpsc::Receiver<Bytes>>,
    /// Where command statuses go.
    pub(crate) status: Option<Box<dyn Publisher>>,
    pub(crate) processor: CommandProcessor,
    pub(crate) cancel: CancellationToken,
}

impl<S: Simulation, E: Environment> GeneratorLoop<S, E> {
    /// Tick until cancelled, then drain forwarded commands and hand the
    /// simulation back.
    pub(crate) async fn run(self) -> S {
        let Self {
            sim,
            mut simulation,
            env,
            interval,
            datastream,
            mut commands,
            status,
            processor,
            cancel,
        } = self;
        let mut ticks: u64 = 0;
        let mut delay = Duration::ZERO;

        'ticks: loop {
            let sleep = env.sleep(delay);
            tokio::pin!(sleep);

            // Commands arriving mid-interval are applied without resetting
            // the timer. A due tick wins over queued commands.
            loop {
                tokio::select! {
                    biased;

                    () = cancel.cancelled() => break 'ticks,

                    () = &mut sleep => break,

                    raw = next_command(&mut commands) => match raw {
                        Some(raw) => {
                            handle_command(&sim, &mut simulation, processor, status.as_deref(), &raw).await;
                        },
                        // Listener gone and queue empty: nothing left to drain.
                        None => {
                            debug!(sim = %sim, "command queue closed");
                            commands = None;
                        },
                    },
                }
            }

            ticks += 1;
            let result = simulation.tick(ticks);
            let observation = Observation::at(env.now(), result);
            match observation.encode() {
                Ok(payload) => {
                    trace!(sim = %sim, tick = ticks, "publishing observation");
                    if let Err(e) = datastream.publish(Bytes::from(payload)).await {
                        warn!(sim = %sim, tick = ticks, error = %e, "observation publish failed");
                    }
                },
                Err(e) => warn!(sim = %sim, tick = ticks, error = %e, "observation encode failed"),
            }

            delay = interval;
        }

        if let Some(mut queue) = commands {
            queue.close();
            let mut drained = 0usize;
            while let Ok(raw) = queue.try_recv() {
                handle_command(&sim, &mut simulation, processor, status.as_deref(), &raw).await;
                drained += 1;
            }
            if drained > 0 {
                debug!(sim = %sim, drained, "applied queued commands before exit");
            }
        }

        debug!(sim = %sim, ticks, "generator loop exited");
        simulation
    }
}

/// Next forwarded command, or pending forever for sims without a control
/// stream.
async fn next_command(commands: &mut Option<mpsc::Receiver<Bytes>>) -> Option<Bytes> {
    match commands {
        Some(queue) => queue.recv().await,
        None => std::future::pending().await,
    }
}

async fn handle_command<S: Simulation>(
    sim: &str,
    simulation: &mut S,
    processor: CommandProcessor,
    publisher: Option<&dyn Publisher>,
    raw: &[u8],
) {
    let Some(publisher) = publisher else { return };
    let Some(status) = processor.process(simulation, raw) else { return };

    match status.encode() {
        Ok(payload) => {
            if let Err(e) = publisher.publish(Bytes::from(payload)).await {
                warn!(sim = %sim, command_id = %status.command_id, error = %e, "status publish failed");
            }
        },
        Err(e) => warn!(sim = %sim, command_id = %status.command_id, error = %e, "status encode failed"),
    }
}

/// Forward raw commands from the hub to the generator until cancelled or
/// either side closes.
pub(crate) async fn run_listener(
    sim: String,
    mut commands: Box<dyn Subscriber>,
    forward: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
) {
    loop {
        let raw = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            raw = commands.recv() => raw,
        };

        let Some(raw) = raw else {
            debug!(sim = %sim, "command stream closed by hub");
            break;
        };

        let bytes = raw.len();
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!(sim = %sim, bytes, "stopping before command was queued, dropping command");
                break;
            },
            sent = forward.send(raw) => {
                if sent.is_err() {
                    warn!(sim = %sim, bytes, "generator gone, dropping command");
                    break;
                }
            },
        }
    }

    debug!(sim = %sim, "listener loop exited");
}
