//! Playback transport abstraction and a simulated implementation.
//!
//! The scheduler never owns audio decoding or output; it only needs a small
//! control surface over whatever is actually playing the track. [`Transport`]
//! is that seam. [`SimulatedTransport`] drives the same contract from the
//! tokio clock, which is what the CLI demo and the test suite run against.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::Result;

/// Control surface over the audio playback owned by the host environment.
///
/// The transport's position is the single shared mutable resource of the
/// system: while a scheduler is active, only the scheduler should drive
/// `play`/`pause`, and any external change to the position must be followed
/// by a [`crate::SceneScheduler::seek`] call so the scheduler can reconcile.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Current playback position in seconds. Monotonically non-decreasing
    /// while playing, except across an explicit [`Transport::seek_to`].
    fn position_secs(&self) -> f64;

    /// Moves the playback position. Does not change the playing/paused state.
    fn seek_to(&self, seconds: f64);

    /// Begins or resumes playback. May fail if the host environment refuses
    /// to start playback (autoplay policy, device loss).
    async fn play(&self) -> Result<()>;

    /// Pauses playback, freezing the position.
    fn pause(&self);

    fn is_paused(&self) -> bool;

    /// Resolves once the position has reached the end of the track.
    async fn ended(&self);
}

/// Clock-backed transport that "plays" a track of a fixed duration.
///
/// Position advances with `tokio::time` while playing and freezes while
/// paused, so tests running under a paused runtime get fully deterministic
/// playback.
#[derive(Debug)]
pub struct SimulatedTransport {
    duration_sec: f64,
    state: Mutex<ClockState>,
}

#[derive(Debug)]
struct ClockState {
    /// Position accumulated up to the last pause or seek.
    base_sec: f64,
    /// Set while playing; elapsed time since this instant is added to
    /// `base_sec`.
    playing_since: Option<Instant>,
}

impl SimulatedTransport {
    pub fn new(duration_sec: f64) -> Self {
        Self {
            duration_sec,
            state: Mutex::new(ClockState {
                base_sec: 0.0,
                playing_since: None,
            }),
        }
    }

    pub fn duration_sec(&self) -> f64 {
        self.duration_sec
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClockState> {
        // The lock is only held for field reads/writes, never across await
        // points, so poisoning can only come from a panicking test.
        self.state.lock().expect("transport clock poisoned")
    }
}

impl ClockState {
    fn position(&self, cap: f64) -> f64 {
        let live = match self.playing_since {
            Some(since) => self.base_sec + since.elapsed().as_secs_f64(),
            None => self.base_sec,
        };
        live.min(cap)
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    fn position_secs(&self) -> f64 {
        self.lock().position(self.duration_sec)
    }

    fn seek_to(&self, seconds: f64) {
        let mut state = self.lock();
        state.base_sec = seconds.clamp(0.0, self.duration_sec);
        if state.playing_since.is_some() {
            state.playing_since = Some(Instant::now());
        }
    }

    async fn play(&self) -> Result<()> {
        let mut state = self.lock();
        if state.playing_since.is_none() {
            state.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&self) {
        let mut state = self.lock();
        state.base_sec = state.position(self.duration_sec);
        state.playing_since = None;
    }

    fn is_paused(&self) -> bool {
        self.lock().playing_since.is_none()
    }

    async fn ended(&self) {
        loop {
            let remaining = self.duration_sec - self.position_secs();
            if remaining <= 0.0 {
                return;
            }
            // While paused the remaining time does not shrink, so poll at a
            // coarse interval rather than sleeping for the whole remainder.
            let nap = remaining.clamp(0.01, 0.1);
            tokio::time::sleep(Duration::from_secs_f64(nap)).await;
        }
    }
}
