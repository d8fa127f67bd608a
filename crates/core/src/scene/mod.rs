use serde::{Deserialize, Serialize};

/// A time-boxed visual-prompt directive covering `[start_sec, end_sec)`.
///
/// The prompt payload (`prompt`, `negative_prompt`, `steps`, `controlnets`)
/// is forwarded verbatim to the prompt sink; the scheduler never interprets
/// it. Wire names are camelCase to match the plan-generation JSON schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Opaque unique identifier, stable for the lifetime of a plan.
    pub id: String,
    pub start_sec: f64,
    pub end_sec: f64,
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controlnets: Vec<ControlNet>,
}

impl Scene {
    /// Duration of the scene in seconds.
    pub fn duration_sec(&self) -> f64 {
        self.end_sec - self.start_sec
    }

    /// Whether `t` falls inside the scene's half-open interval.
    pub fn contains(&self, t: f64) -> bool {
        self.start_sec <= t && t < self.end_sec
    }
}

/// Controlnet directive attached to a scene, forwarded untouched to the
/// rendering stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlNet {
    pub model_id: String,
    pub preprocessor: String,
    pub conditioning_scale: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Ordered, gapless, full-coverage sequence of scenes for one audio track.
///
/// Invariants (established by [`crate::plan::normalize_plan`], assumed by the
/// scheduler): scenes are sorted ascending by `start_sec`, the first scene
/// starts at 0, `scenes[i].end_sec == scenes[i + 1].start_sec`, and the last
/// scene ends at `duration_sec`. A plan is immutable once handed to a
/// scheduler; loading a new track means building a new plan and a new
/// scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenePlan {
    pub duration_sec: f64,
    pub scenes: Vec<Scene>,
}

impl ScenePlan {
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}
