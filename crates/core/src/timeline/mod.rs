//! Resolution of a playback time to the scene that contains it.

use crate::scene::Scene;

/// Returns the index of the scene whose `[start_sec, end_sec)` interval
/// contains `t`, given an ordered, gapless scene list.
///
/// Binary search, `O(log n)`, no hidden state; safe to call at arbitrary
/// frequency from both the boundary timer and the drift check. Times before
/// the first scene clamp to index 0 and times at or past the last scene's
/// end clamp to the last index, so a minor plan defect (or a negative
/// position reported by a glitchy transport) can never produce an
/// out-of-range index. A time exactly on a boundary belongs to the later
/// scene.
pub fn locate(scenes: &[Scene], t: f64) -> usize {
    if scenes.is_empty() {
        return 0;
    }

    let mut lo: isize = 0;
    let mut hi: isize = scenes.len() as isize - 1;

    while lo <= hi {
        let mid = (lo + hi) / 2;
        let scene = &scenes[mid as usize];

        if t < scene.start_sec {
            hi = mid - 1;
        } else if t >= scene.end_sec {
            lo = mid + 1;
        } else {
            return mid as usize;
        }
    }

    // Search fell through: `t` is outside the plan's coverage. Clamp the
    // fallback into range so negative times resolve to the first scene and
    // times past the end resolve to the last.
    (lo - 1).clamp(0, scenes.len() as isize - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(id: &str, start: f64, end: f64) -> Scene {
        Scene {
            id: id.to_string(),
            start_sec: start,
            end_sec: end,
            prompt: format!("scene {id}"),
            negative_prompt: String::new(),
            steps: None,
            controlnets: Vec::new(),
        }
    }

    fn plan(bounds: &[(f64, f64)]) -> Vec<Scene> {
        bounds
            .iter()
            .enumerate()
            .map(|(i, &(start, end))| scene(&i.to_string(), start, end))
            .collect()
    }

    #[test]
    fn resolves_unique_containing_scene() {
        let scenes = plan(&[(0.0, 5.0), (5.0, 10.0), (10.0, 15.0)]);

        for (t, expected) in [
            (0.0, 0),
            (2.5, 0),
            (4.999, 0),
            (5.0, 1),
            (9.999, 1),
            (10.0, 2),
            (14.9, 2),
        ] {
            assert_eq!(locate(&scenes, t), expected, "t = {t}");
        }
    }

    #[test]
    fn boundary_belongs_to_the_later_scene() {
        let scenes = plan(&[(0.0, 5.0), (5.0, 10.0), (10.0, 15.0)]);
        assert_eq!(locate(&scenes, 5.0), 1);
        assert_eq!(locate(&scenes, 10.0), 2);
    }

    #[test]
    fn negative_times_clamp_to_first_scene() {
        let scenes = plan(&[(0.0, 5.0), (5.0, 10.0)]);
        assert_eq!(locate(&scenes, -0.001), 0);
        assert_eq!(locate(&scenes, -100.0), 0);
    }

    #[test]
    fn times_past_the_end_clamp_to_last_scene() {
        let scenes = plan(&[(0.0, 5.0), (5.0, 10.0)]);
        assert_eq!(locate(&scenes, 10.0), 1);
        assert_eq!(locate(&scenes, 1e6), 1);
    }

    #[test]
    fn single_scene_plan_always_resolves_to_it() {
        let scenes = plan(&[(0.0, 30.0)]);
        for t in [-1.0, 0.0, 15.0, 29.999, 30.0, 99.0] {
            assert_eq!(locate(&scenes, t), 0);
        }
    }

    #[test]
    fn exhaustive_sweep_matches_linear_scan() {
        let scenes = plan(&[(0.0, 1.0), (1.0, 4.0), (4.0, 4.5), (4.5, 9.0), (9.0, 12.0)]);

        let mut t = 0.0;
        while t < 12.0 {
            let expected = scenes
                .iter()
                .position(|s| s.contains(t))
                .expect("gapless plan covers t");
            assert_eq!(locate(&scenes, t), expected, "t = {t}");
            t += 0.05;
        }
    }

    #[test]
    fn empty_list_resolves_to_zero() {
        assert_eq!(locate(&[], 3.0), 0);
    }
}
