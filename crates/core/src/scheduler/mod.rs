//! Audio-synchronized scene scheduling.
//!
//! [`SceneScheduler`] decides which scene of a plan is active for the
//! transport's current playback position, pushes the scene to the prompt
//! sink whenever the active scene changes, and keeps the two in step through
//! a pair of timers:
//!
//! - a one-shot **boundary timer** armed for the start of the next scene, so
//!   transitions land on the boundary without per-tick polling, and
//! - a recurring **drift check** that re-resolves the active scene from the
//!   live position and realigns whenever the boundary path misfired (timer
//!   slop, a stalled transport, a throttled host).
//!
//! Both triggers funnel into one idempotent reconcile step, so correctness
//! does not depend on which of them fires first. Every state transition
//! bumps an epoch counter under the state lock before new timers are armed;
//! a callback from a previous epoch observes the bump and bails, so a stale
//! timer can never act on newer state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::SchedulerConfig;
use crate::error::{DreamSyncError, Result};
use crate::scene::{Scene, ScenePlan};
use crate::sink::SceneSink;
use crate::timeline::locate;
use crate::transport::Transport;

/// Lifecycle phase of a scheduler.
///
/// `Idle → Running ⇄ Paused → Stopped`; `Stopped` is terminal. One scheduler
/// serves one plan and one playback session — loading a new track means
/// building a fresh instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Paused,
    Stopped,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Running => write!(f, "running"),
            Phase::Paused => write!(f, "paused"),
            Phase::Stopped => write!(f, "stopped"),
        }
    }
}

type SceneChangedFn = Box<dyn Fn(usize) + Send + Sync>;

/// Schedules scene applications against live audio playback.
pub struct SceneScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    scenes: Vec<Scene>,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn SceneSink>,
    scene_changed: std::sync::Mutex<Option<SceneChangedFn>>,
    drift_period: Duration,
    state: Mutex<Core>,
}

struct Core {
    phase: Phase,
    /// Index of the last scene pushed to the sink; `None` until the first
    /// apply.
    current: Option<usize>,
    /// Bumped on every timer cancellation. Timer callbacks capture the epoch
    /// they were armed under and bail if it has moved on.
    epoch: u64,
    boundary: Option<JoinHandle<()>>,
    drift: Option<JoinHandle<()>>,
}

impl SceneScheduler {
    /// Creates a scheduler for a normalized plan with the default drift
    /// period.
    pub fn new(
        plan: &ScenePlan,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn SceneSink>,
    ) -> Result<Self> {
        Self::with_config(plan, transport, sink, SchedulerConfig::default())
    }

    pub fn with_config(
        plan: &ScenePlan,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn SceneSink>,
        config: SchedulerConfig,
    ) -> Result<Self> {
        if plan.scenes.is_empty() {
            return Err(DreamSyncError::InvalidPlan(
                "cannot schedule an empty scene plan".to_string(),
            ));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                scenes: plan.scenes.clone(),
                transport,
                sink,
                scene_changed: std::sync::Mutex::new(None),
                drift_period: config.drift_check_period(),
                state: Mutex::new(Core {
                    phase: Phase::Idle,
                    current: None,
                    epoch: 0,
                    boundary: None,
                    drift: None,
                }),
            }),
        })
    }

    /// Registers a callback invoked synchronously whenever the active scene
    /// index changes (UI highlighting). Keep it lightweight; it runs under
    /// the scheduler's state lock.
    pub fn on_scene_changed(&self, callback: impl Fn(usize) + Send + Sync + 'static) {
        if let Ok(mut slot) = self.inner.scene_changed.lock() {
            *slot = Some(Box::new(callback));
        }
    }

    /// Starts playback from the beginning of the track.
    ///
    /// Rewinds the transport, begins playback, applies the first scene, and
    /// arms the boundary timer and drift check. If the transport refuses to
    /// play, the scheduler is left `Idle` so the caller may retry.
    pub async fn start(&self) -> Result<()> {
        let mut core = self.inner.state.lock().await;
        if core.phase != Phase::Idle {
            return Err(DreamSyncError::InvalidPhase {
                op: "start",
                phase: core.phase,
            });
        }

        self.inner.transport.seek_to(0.0);
        self.inner.transport.play().await?;

        core.phase = Phase::Running;
        self.inner.reconcile(&mut core).await;
        self.inner.arm_boundary(&mut core);
        self.inner.arm_drift_check(&mut core);
        Ok(())
    }

    /// Pauses playback. Cancels both timers before touching the transport so
    /// no stale callback can fire after the transition. No-op unless
    /// `Running`.
    pub async fn pause(&self) {
        let mut core = self.inner.state.lock().await;
        if core.phase != Phase::Running {
            return;
        }
        Inner::cancel_timers(&mut core);
        self.inner.transport.pause();
        core.phase = Phase::Paused;
    }

    /// Resumes playback from the paused position, re-applying the active
    /// scene only if it changed while paused (an external seek may have moved
    /// the position). Leaves the scheduler `Paused` if the transport refuses
    /// to play.
    pub async fn resume(&self) -> Result<()> {
        let mut core = self.inner.state.lock().await;
        if core.phase != Phase::Paused {
            return Err(DreamSyncError::InvalidPhase {
                op: "resume",
                phase: core.phase,
            });
        }

        self.inner.transport.play().await?;

        core.phase = Phase::Running;
        self.inner.reconcile(&mut core).await;
        self.inner.arm_boundary(&mut core);
        self.inner.arm_drift_check(&mut core);
        Ok(())
    }

    /// Reconciles after the transport position was changed externally.
    ///
    /// Must be called by whoever moved the position. Applies the scene at
    /// the new position if it differs from the current one, then re-arms the
    /// boundary timer (only while actually playing) and the drift check.
    /// Does not change the Running/Paused phase. No-op from `Idle`/`Stopped`.
    pub async fn seek(&self) {
        let mut core = self.inner.state.lock().await;
        if !matches!(core.phase, Phase::Running | Phase::Paused) {
            return;
        }

        Inner::cancel_timers(&mut core);
        self.inner.reconcile(&mut core).await;

        if core.phase == Phase::Running {
            if !self.inner.transport.is_paused() {
                self.inner.arm_boundary(&mut core);
            }
            self.inner.arm_drift_check(&mut core);
        }
    }

    /// Tears the session down: cancels all timers, pauses the transport, and
    /// enters the terminal `Stopped` phase. Safe to call from any phase.
    pub async fn stop(&self) {
        let mut core = self.inner.state.lock().await;
        if core.phase == Phase::Stopped {
            return;
        }
        Inner::cancel_timers(&mut core);
        self.inner.transport.pause();
        core.phase = Phase::Stopped;
    }

    pub async fn phase(&self) -> Phase {
        self.inner.state.lock().await.phase
    }

    /// Index of the most recently applied scene, or `None` before the first
    /// apply.
    pub async fn current_scene(&self) -> Option<usize> {
        self.inner.state.lock().await.current
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.inner.scenes
    }
}

impl Drop for SceneScheduler {
    fn drop(&mut self) {
        // Best effort: if the state lock is free, make sure no timer task
        // outlives the handle. `stop()` is the reliable teardown path.
        if let Ok(mut core) = self.inner.state.try_lock() {
            Inner::cancel_timers(&mut core);
        }
    }
}

impl Inner {
    fn cancel_timers(core: &mut Core) {
        core.epoch = core.epoch.wrapping_add(1);
        if let Some(handle) = core.boundary.take() {
            handle.abort();
        }
        if let Some(handle) = core.drift.take() {
            handle.abort();
        }
    }

    /// The single apply-if-changed step shared by `start`/`resume`/`seek`,
    /// the boundary timer, and the drift check.
    ///
    /// Resolves the active scene from the transport's live position and, if
    /// it differs from the last applied index, records it, notifies the
    /// change callback, and pushes the scene to the sink. A sink failure is
    /// logged and swallowed: the index stays updated so the schedule remains
    /// consistent, and the next trigger will fire regardless.
    async fn reconcile(&self, core: &mut Core) {
        let position = self.transport.position_secs();
        let idx = locate(&self.scenes, position);
        if core.current == Some(idx) {
            return;
        }
        core.current = Some(idx);

        if let Ok(slot) = self.scene_changed.lock() {
            if let Some(callback) = slot.as_ref() {
                callback(idx);
            }
        }

        let scene = &self.scenes[idx];
        tracing::info!(
            scene = idx + 1,
            total = self.scenes.len(),
            position,
            "applying scene"
        );
        if let Err(err) = self.sink.apply_scene(scene).await {
            tracing::warn!(scene = idx, error = %err, "scene sink rejected update");
        }
    }

    /// Arms the one-shot timer for the next scene boundary. No timer is
    /// armed once the last scene is active; the drift check keeps running.
    fn arm_boundary(self: &Arc<Self>, core: &mut Core) {
        if let Some(handle) = core.boundary.take() {
            handle.abort();
        }

        let next = core.current.map_or(0, |i| i + 1);
        if next >= self.scenes.len() {
            return;
        }

        let delay = (self.scenes[next].start_sec - self.transport.position_secs()).max(0.0);
        let epoch = core.epoch;
        let inner = Arc::clone(self);
        core.boundary = Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
            inner.boundary_fired(epoch).await;
        }));
    }

    async fn boundary_fired(self: Arc<Self>, epoch: u64) {
        let mut core = self.state.lock().await;
        if core.epoch != epoch || core.phase != Phase::Running || self.transport.is_paused() {
            return;
        }

        // This task is the armed timer; drop the handle so re-arming below
        // does not abort the currently running callback.
        core.boundary = None;

        // Re-resolve from the live position instead of assuming `current + 1`
        // so any drift accumulated during the wait is absorbed here.
        self.reconcile(&mut core).await;
        self.arm_boundary(&mut core);
    }

    /// Arms the recurring drift check. Runs for as long as the scheduler is
    /// `Running`; it is the authority of last resort that keeps the applied
    /// scene consistent with true playback position when the boundary timer
    /// misfires.
    fn arm_drift_check(self: &Arc<Self>, core: &mut Core) {
        if let Some(handle) = core.drift.take() {
            handle.abort();
        }

        let epoch = core.epoch;
        let period = self.drift_period;
        let inner = Arc::clone(self);
        core.drift = Some(tokio::spawn(async move {
            let mut ticks = tokio::time::interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of an interval completes immediately; skip it so
            // checks start one period from now.
            ticks.tick().await;
            loop {
                ticks.tick().await;
                if !inner.drift_tick(epoch).await {
                    return;
                }
            }
        }));
    }

    /// One drift-check pass. Returns `false` once the loop should end.
    async fn drift_tick(self: &Arc<Self>, epoch: u64) -> bool {
        let mut core = self.state.lock().await;
        if core.epoch != epoch || core.phase != Phase::Running {
            return false;
        }
        if self.transport.is_paused() {
            return true;
        }

        let idx = locate(&self.scenes, self.transport.position_secs());
        if core.current != Some(idx) {
            tracing::warn!(
                believed = ?core.current,
                actual = idx,
                "drift detected, realigning scene"
            );
            self.reconcile(&mut core).await;
            self.arm_boundary(&mut core);
        }
        true
    }
}
