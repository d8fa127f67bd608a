//! Prompt-apply sink: the downstream consumer of scene changes.

use async_trait::async_trait;

use crate::error::Result;
use crate::scene::Scene;

/// Asynchronous sink that pushes a scene's visual parameters to a remote
/// generation stream.
///
/// Latency is unknown and variable (a network round trip in production), and
/// the call may fail if the remote stream is not ready. The scheduler treats
/// each call as an idempotent "set current scene": it awaits the call, logs a
/// failure, and moves on — retry policy belongs to the sink implementation,
/// not the scheduler.
#[async_trait]
pub trait SceneSink: Send + Sync {
    async fn apply_scene(&self, scene: &Scene) -> Result<()>;
}

/// Sink that only logs the applied scene. Useful for dry runs of a plan
/// without a live rendering stream.
#[derive(Debug, Default)]
pub struct LoggingSink;

#[async_trait]
impl SceneSink for LoggingSink {
    async fn apply_scene(&self, scene: &Scene) -> Result<()> {
        let preview: String = scene.prompt.chars().take(50).collect();
        tracing::info!(
            id = %scene.id,
            start = scene.start_sec,
            end = scene.end_sec,
            prompt = %preview,
            "scene applied"
        );
        Ok(())
    }
}
