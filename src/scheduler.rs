// Cycle scheduler: drives fixed-interval probe cycles over the registry's targets.
// Each cycle probes in batches of at most `concurrency_ceiling`, joins every batch, then writes all
// outcomes into history at once and publishes the resulting frame.

use crate::error::{MonitorError, MonitorResult};
use crate::history_repo::HistoryRepo;
use crate::models::{Frame, SchedulerState, Target};
use crate::probe_repo::{ProbeGateway, probe_sample};
use crate::registry::TargetRegistry;
use futures_util::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval, interval_at};
use tracing::Instrument;

/// Rate limit for the "no receivers" log line (frames are emitted every cycle).
const NO_RECEIVERS_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Shared stores and channels the scheduler reads from and publishes to.
pub struct SchedulerDeps {
    pub registry: Arc<TargetRegistry>,
    pub history: Arc<HistoryRepo>,
    pub gateway: Arc<dyn ProbeGateway>,
    pub frames_tx: broadcast::Sender<Frame>,
}

pub struct SchedulerConfig {
    /// Hard budget for one probe; the gateway's own wait should be shorter.
    pub probe_timeout: Duration,
    /// How often the running loop logs "monitor stats" at INFO.
    pub stats_log_interval: Duration,
}

#[derive(Default)]
struct RunControl {
    stop_tx: Option<watch::Sender<bool>>,
    tasks: Vec<JoinHandle<()>>,
}

struct Inner {
    registry: Arc<TargetRegistry>,
    history: Arc<HistoryRepo>,
    gateway: Arc<dyn ProbeGateway>,
    frames_tx: broadcast::Sender<Frame>,
    probe_timeout: Duration,
    stats_log_interval: Duration,
    state_tx: watch::Sender<SchedulerState>,
    control: Mutex<RunControl>,
    // One cycle at a time, even while a stopped loop drains and a restarted one begins.
    cycle_lock: tokio::sync::Mutex<()>,
    next_seq: AtomicU64,
    cycles_completed: AtomicU64,
    latest_frame: RwLock<Frame>,
    last_no_receivers_log: Mutex<Option<Instant>>,
}

/// Cheap to clone; all clones drive the same scheduler.
#[derive(Clone)]
pub struct CycleScheduler {
    inner: Arc<Inner>,
}

impl CycleScheduler {
    pub fn new(deps: SchedulerDeps, config: SchedulerConfig) -> Self {
        let SchedulerDeps {
            registry,
            history,
            gateway,
            frames_tx,
        } = deps;
        let (state_tx, _) = watch::channel(SchedulerState::Idle);
        Self {
            inner: Arc::new(Inner {
                registry,
                history,
                gateway,
                frames_tx,
                probe_timeout: config.probe_timeout,
                stats_log_interval: config.stats_log_interval,
                state_tx,
                control: Mutex::new(RunControl::default()),
                cycle_lock: tokio::sync::Mutex::new(()),
                next_seq: AtomicU64::new(0),
                cycles_completed: AtomicU64::new(0),
                latest_frame: RwLock::new(Frame::default()),
                last_no_receivers_log: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.inner.state_tx.borrow()
    }

    pub fn subscribe_frames(&self) -> broadcast::Receiver<Frame> {
        self.inner.frames_tx.subscribe()
    }

    /// Frame of the most recently completed cycle (empty before the first one).
    pub fn latest_frame(&self) -> Frame {
        self.inner
            .latest_frame
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn cycles_completed(&self) -> u64 {
        self.inner.cycles_completed.load(Ordering::Relaxed)
    }

    /// Starts the cycle loop. The first cycle begins immediately.
    pub fn start(&self, period: Duration, concurrency_ceiling: usize) -> MonitorResult<()> {
        if period.is_zero() {
            return Err(MonitorError::InvalidSchedule(
                "cycle interval must be > 0".into(),
            ));
        }
        let ceiling = concurrency_ceiling.max(1);

        let mut control = self
            .inner
            .control
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.state() == SchedulerState::Running {
            return Err(MonitorError::AlreadyRunning);
        }
        control.tasks.retain(|t| !t.is_finished());

        let (stop_tx, stop_rx) = watch::channel(false);
        let inner = self.inner.clone();
        let loop_span = tracing::span!(
            tracing::Level::DEBUG,
            "cycle_loop",
            interval_ms = period.as_millis() as u64,
            ceiling
        );
        control.tasks.push(tokio::spawn(
            run_loop(inner, period, ceiling, stop_rx).instrument(loop_span),
        ));
        control.stop_tx = Some(stop_tx);
        self.inner.state_tx.send_replace(SchedulerState::Running);
        tracing::info!(
            interval_ms = period.as_millis() as u64,
            concurrency_ceiling = ceiling,
            "monitor started"
        );
        Ok(())
    }

    /// Requests a stop. Probes already dispatched finish and are recorded; no new cycle starts.
    /// A no-op unless running.
    pub fn stop(&self) {
        let mut control = self
            .inner
            .control
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.state() != SchedulerState::Running {
            return;
        }
        if let Some(stop_tx) = control.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        self.inner.state_tx.send_replace(SchedulerState::Stopped);
        tracing::info!("monitor stopped");
    }

    /// Stops and waits for every loop (including one still draining) to finish its cycle.
    pub async fn shutdown(&self) {
        self.stop();
        let tasks = {
            let mut control = self
                .inner
                .control
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut control.tasks)
        };
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, operation = "shutdown", "cycle loop ended abnormally");
            }
        }
        tracing::debug!("scheduler drained");
    }

    /// Runs exactly one cycle outside the loop. Refused while the loop is running.
    pub async fn run_single_cycle(&self, concurrency_ceiling: usize) -> MonitorResult<Frame> {
        if self.state() == SchedulerState::Running {
            return Err(MonitorError::AlreadyRunning);
        }
        Ok(self.inner.run_cycle(concurrency_ceiling.max(1), None).await)
    }

    /// Replaces the monitored target set. Takes effect from the next cycle; history of addresses
    /// no longer monitored is discarded.
    pub fn replace_targets(&self, targets: Vec<Target>) {
        let dropped = self.inner.registry.replace(targets);
        if !dropped.is_empty() {
            self.inner.history.retain_registered(&self.inner.registry);
        }
    }
}

async fn run_loop(
    inner: Arc<Inner>,
    period: Duration,
    ceiling: usize,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut stats_tick = interval_at(
        Instant::now() + inner.stats_log_interval,
        inner.stats_log_interval,
    );
    stats_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            changed = stop_rx.changed() => {
                // Err: the scheduler dropped its sender, which is also a stop.
                if changed.is_err() || *stop_rx.borrow() {
                    tracing::debug!("cycle loop exiting");
                    break;
                }
            }
            _ = tick.tick() => {
                inner.run_cycle(ceiling, Some(&stop_rx)).await;
            }
            _ = stats_tick.tick() => {
                tracing::info!(
                    cycles_completed = inner.cycles_completed.load(Ordering::Relaxed),
                    targets = inner.registry.len(),
                    frame_subscribers = inner.frames_tx.receiver_count(),
                    "monitor stats"
                );
            }
        }
    }
}

impl Inner {
    async fn run_cycle(&self, ceiling: usize, stop: Option<&watch::Receiver<bool>>) -> Frame {
        let _cycle = self.cycle_lock.lock().await;
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let started = Instant::now();
        let targets = self.registry.list();

        let mut outcomes = Vec::with_capacity(targets.len());
        let mut batches = 0usize;
        for batch in targets.chunks(ceiling) {
            if stop.is_some_and(|rx| *rx.borrow()) {
                tracing::debug!(
                    cycle = seq,
                    skipped = targets.len() - outcomes.len(),
                    "stop observed; remaining batches skipped"
                );
                break;
            }
            let samples = join_all(batch.iter().map(|t| {
                probe_sample(self.gateway.as_ref(), &t.address, seq, self.probe_timeout)
            }))
            .await;
            outcomes.extend(batch.iter().map(|t| t.address.clone()).zip(samples));
            batches += 1;
        }

        let frame = self.history.record_cycle(seq, &self.registry, outcomes);

        *self
            .latest_frame
            .write()
            .unwrap_or_else(PoisonError::into_inner) = frame.clone();
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            cycle = seq,
            targets = targets.len(),
            batches,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "cycle complete"
        );
        self.publish(frame.clone());
        frame
    }

    fn publish(&self, frame: Frame) {
        if self.frames_tx.send(frame).is_err() {
            let mut last = self
                .last_no_receivers_log
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if last.is_none_or(|t| t.elapsed() >= NO_RECEIVERS_LOG_INTERVAL) {
                tracing::debug!(
                    operation = "broadcast_frame",
                    "No active WebSocket clients; broadcast channel has no receivers"
                );
                *last = Some(Instant::now());
            }
        }
    }
}
