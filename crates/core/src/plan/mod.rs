//! Normalization of raw, model-generated scene timelines.
//!
//! The plan generator is a language model: it is asked for a sorted, gapless
//! timeline but cannot be trusted to produce one. This module turns its raw
//! output into a [`ScenePlan`] that satisfies the coverage invariant the
//! scheduler assumes — sorted scenes, first start at 0, adjacent boundaries
//! equal, last end at the track duration.

use serde::Deserialize;
use uuid::Uuid;

use crate::config::PlanConfig;
use crate::error::{DreamSyncError, Result};
use crate::scene::{ControlNet, Scene, ScenePlan};

/// Scene plan as emitted by the generator, before any validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawScenePlan {
    #[serde(default)]
    pub duration_sec: Option<f64>,
    pub scenes: Vec<RawScene>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawScene {
    #[serde(default)]
    pub id: Option<String>,
    pub start_sec: f64,
    pub end_sec: f64,
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub steps: Option<f64>,
    #[serde(default)]
    pub controlnets: Option<Vec<RawControlNet>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawControlNet {
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub preprocessor: Option<String>,
    #[serde(default)]
    pub conditioning_scale: Option<f64>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// Normalizes a raw plan against the actual track duration.
///
/// Rules, in order: sort by start time; keep at most
/// [`PlanConfig::max_scenes`] scenes; floor each start into `[0, ∞)` and ceil
/// each end into `(-∞, duration]` (whole seconds, as the generator is asked
/// for); drop scenes whose interval is empty after clamping; clamp `steps`
/// and controlnet conditioning scales into their configured ranges; drop
/// controlnets missing a model or preprocessor; mint a uuid for any scene
/// without an id. Finally the kept scenes are stitched into full coverage:
/// the first starts at 0, each scene ends where the next begins, and the
/// last ends at `duration_sec`.
pub fn normalize_plan(
    raw: &RawScenePlan,
    duration_sec: f64,
    config: &PlanConfig,
) -> Result<ScenePlan> {
    if !(duration_sec > 0.0) {
        return Err(DreamSyncError::InvalidPlan(format!(
            "track duration must be positive, got {duration_sec}"
        )));
    }
    if raw.scenes.is_empty() {
        return Err(DreamSyncError::InvalidPlan(
            "generator returned no scenes".to_string(),
        ));
    }

    let mut sorted: Vec<&RawScene> = raw.scenes.iter().collect();
    sorted.sort_by(|a, b| a.start_sec.total_cmp(&b.start_sec));

    let mut scenes = Vec::new();
    for raw_scene in sorted.into_iter().take(config.max_scenes) {
        let start_sec = raw_scene.start_sec.max(0.0).floor();
        let end_sec = raw_scene.end_sec.min(duration_sec).ceil();
        if start_sec >= end_sec {
            continue;
        }

        let steps = raw_scene.steps.map(|s| {
            (s.round() as i64).clamp(config.min_steps as i64, config.max_steps as i64) as u32
        });

        let controlnets = raw_scene
            .controlnets
            .iter()
            .flatten()
            .filter_map(|cn| normalize_controlnet(cn, config))
            .collect();

        scenes.push(Scene {
            id: raw_scene
                .id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            start_sec,
            end_sec,
            prompt: raw_scene.prompt.clone(),
            negative_prompt: raw_scene.negative_prompt.clone().unwrap_or_default(),
            steps,
            controlnets,
        });
    }

    if scenes.is_empty() {
        return Err(DreamSyncError::InvalidPlan(
            "no usable scenes after normalization".to_string(),
        ));
    }

    // Stitch full coverage: no gaps, no overlaps, exact track bounds.
    scenes[0].start_sec = 0.0;
    for i in 1..scenes.len() {
        scenes[i - 1].end_sec = scenes[i].start_sec;
    }
    if let Some(last) = scenes.last_mut() {
        last.end_sec = duration_sec;
    }

    Ok(ScenePlan {
        duration_sec,
        scenes,
    })
}

fn normalize_controlnet(raw: &RawControlNet, config: &PlanConfig) -> Option<ControlNet> {
    let model_id = raw.model_id.clone().filter(|m| !m.is_empty())?;
    let preprocessor = raw.preprocessor.clone().filter(|p| !p.is_empty())?;

    let conditioning_scale = raw
        .conditioning_scale
        .unwrap_or(config.min_conditioning_scale)
        .clamp(config.min_conditioning_scale, config.max_conditioning_scale);

    Some(ControlNet {
        model_id,
        preprocessor,
        conditioning_scale,
        enabled: raw.enabled.unwrap_or(true),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_scene(start: f64, end: f64) -> RawScene {
        RawScene {
            id: Some(format!("s-{start}-{end}")),
            start_sec: start,
            end_sec: end,
            prompt: "a drowsy cloud kingdom".to_string(),
            negative_prompt: None,
            steps: None,
            controlnets: None,
        }
    }

    fn raw_plan(scenes: Vec<RawScene>) -> RawScenePlan {
        RawScenePlan {
            duration_sec: None,
            scenes,
        }
    }

    #[test]
    fn sorts_and_stitches_full_coverage() {
        let raw = raw_plan(vec![
            raw_scene(20.0, 30.0),
            raw_scene(0.0, 12.0),
            raw_scene(12.0, 20.0),
        ]);

        let plan = normalize_plan(&raw, 30.0, &PlanConfig::default()).unwrap();
        assert_eq!(plan.scenes.len(), 3);
        assert_eq!(plan.scenes[0].start_sec, 0.0);
        for pair in plan.scenes.windows(2) {
            assert_eq!(pair[0].end_sec, pair[1].start_sec);
        }
        assert_eq!(plan.scenes.last().unwrap().end_sec, 30.0);
    }

    #[test]
    fn repairs_gaps_and_overlaps() {
        // 0-10, 8-14 (overlap), 18-28 (gap): stitching makes each scene end
        // where the next one starts.
        let raw = raw_plan(vec![
            raw_scene(0.0, 10.0),
            raw_scene(8.0, 14.0),
            raw_scene(18.0, 28.0),
        ]);

        let plan = normalize_plan(&raw, 30.0, &PlanConfig::default()).unwrap();
        assert_eq!(plan.scenes[0].end_sec, 8.0);
        assert_eq!(plan.scenes[1].end_sec, 18.0);
        assert_eq!(plan.scenes[2].end_sec, 30.0);
    }

    #[test]
    fn drops_scenes_with_empty_intervals() {
        let raw = raw_plan(vec![
            raw_scene(0.0, 10.0),
            raw_scene(10.0, 10.0),
            raw_scene(12.0, 4.0),
            raw_scene(10.0, 20.0),
        ]);

        let plan = normalize_plan(&raw, 20.0, &PlanConfig::default()).unwrap();
        assert_eq!(plan.scenes.len(), 2);
    }

    #[test]
    fn clamps_times_to_whole_seconds_within_track() {
        let raw = raw_plan(vec![raw_scene(-3.7, 10.2), raw_scene(10.2, 99.0)]);

        let plan = normalize_plan(&raw, 20.0, &PlanConfig::default()).unwrap();
        assert_eq!(plan.scenes[0].start_sec, 0.0);
        assert_eq!(plan.scenes[0].end_sec, 10.0);
        assert_eq!(plan.scenes[1].end_sec, 20.0);
    }

    #[test]
    fn caps_scene_count() {
        let scenes = (0..40).map(|i| raw_scene(i as f64, (i + 1) as f64)).collect();
        let plan = normalize_plan(&raw_plan(scenes), 40.0, &PlanConfig::default()).unwrap();
        assert_eq!(plan.scenes.len(), 24);
        assert_eq!(plan.scenes.last().unwrap().end_sec, 40.0);
    }

    #[test]
    fn mints_ids_for_anonymous_scenes() {
        let mut scene = raw_scene(0.0, 10.0);
        scene.id = None;
        let plan = normalize_plan(&raw_plan(vec![scene]), 10.0, &PlanConfig::default()).unwrap();
        assert!(!plan.scenes[0].id.is_empty());
    }

    #[test]
    fn clamps_steps_into_configured_range() {
        let mut low = raw_scene(0.0, 5.0);
        low.steps = Some(-10.0);
        let mut high = raw_scene(5.0, 10.0);
        high.steps = Some(400.0);
        let mut unset = raw_scene(10.0, 15.0);
        unset.steps = None;

        let plan = normalize_plan(
            &raw_plan(vec![low, high, unset]),
            15.0,
            &PlanConfig::default(),
        )
        .unwrap();
        assert_eq!(plan.scenes[0].steps, Some(1));
        assert_eq!(plan.scenes[1].steps, Some(100));
        assert_eq!(plan.scenes[2].steps, None);
    }

    #[test]
    fn filters_and_clamps_controlnets() {
        let mut scene = raw_scene(0.0, 10.0);
        scene.controlnets = Some(vec![
            RawControlNet {
                model_id: Some("pose-model".to_string()),
                preprocessor: Some("pose_tensorrt".to_string()),
                conditioning_scale: Some(0.9),
                enabled: None,
            },
            RawControlNet {
                model_id: None,
                preprocessor: Some("canny".to_string()),
                conditioning_scale: Some(0.3),
                enabled: Some(true),
            },
        ]);

        let plan = normalize_plan(&raw_plan(vec![scene]), 10.0, &PlanConfig::default()).unwrap();
        let controlnets = &plan.scenes[0].controlnets;
        assert_eq!(controlnets.len(), 1);
        assert_eq!(controlnets[0].conditioning_scale, 0.6);
        assert!(controlnets[0].enabled);
    }

    #[test]
    fn rejects_unusable_plans() {
        let empty = raw_plan(Vec::new());
        assert!(matches!(
            normalize_plan(&empty, 30.0, &PlanConfig::default()),
            Err(DreamSyncError::InvalidPlan(_))
        ));

        let degenerate = raw_plan(vec![raw_scene(5.0, 5.0)]);
        assert!(matches!(
            normalize_plan(&degenerate, 30.0, &PlanConfig::default()),
            Err(DreamSyncError::InvalidPlan(_))
        ));

        let zero_duration = raw_plan(vec![raw_scene(0.0, 5.0)]);
        assert!(matches!(
            normalize_plan(&zero_duration, 0.0, &PlanConfig::default()),
            Err(DreamSyncError::InvalidPlan(_))
        ));
    }
}
