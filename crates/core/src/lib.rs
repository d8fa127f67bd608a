//! Core library for the Dreamsync application.
//!
//! Dreamsync keeps an AI-generated visual stream in step with a narrated
//! audio track: a plan of time-boxed scene prompts is resolved against the
//! live playback position, and the scene that contains the current moment is
//! pushed to a remote prompt sink. Each module owns a distinct subsystem —
//! the scene data model, plan normalization, time-to-scene resolution, the
//! playback transport, and the scheduler that ties them together.

pub mod config;
pub mod error;
pub mod plan;
pub mod scene;
pub mod scheduler;
pub mod sink;
pub mod timeline;
pub mod transport;

pub use config::{AppConfig, PlanConfig, SchedulerConfig};
pub use error::{DreamSyncError, Result};
pub use plan::{normalize_plan, RawControlNet, RawScene, RawScenePlan};
pub use scene::{ControlNet, Scene, ScenePlan};
pub use scheduler::{Phase, SceneScheduler};
pub use sink::{LoggingSink, SceneSink};
pub use timeline::locate;
pub use transport::{SimulatedTransport, Transport};
