//! Levels and experience.
//!
//! `xp` counts progress inside the current level, so a normalized value
//! always satisfies `xp < xp_required_for_level(level)`. Level-ups fold the
//! requirement out of `xp` one level at a time, with an iteration guard;
//! hitting the guard stops the fold and keeps whatever state was reached.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coerce::{finite_number, non_negative_int};

pub const XP_PER_LEVEL: u64 = 100;
const REWARD_LEVEL_UP_GUARD: u32 = 200;
const NORMALIZE_LEVEL_UP_GUARD: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterStats {
    pub level: u32,
    pub xp: u64,
}

impl Default for CharacterStats {
    fn default() -> Self {
        Self { level: 1, xp: 0 }
    }
}

impl CharacterStats {
    /// Restore the level/xp invariant, rolling surplus xp into levels.
    pub fn normalized(self) -> Self {
        roll_forward(self.level.max(1), self.xp, NORMALIZE_LEVEL_UP_GUARD)
    }

    pub fn xp_to_next_level(&self) -> u64 {
        xp_required_for_level(self.level).saturating_sub(self.xp)
    }

    /// Progress through the current level in `[0, 1]`, for HUD bars.
    pub fn progress_fraction(&self) -> f32 {
        let required = xp_required_for_level(self.level);
        (self.xp as f64 / required as f64).clamp(0.0, 1.0) as f32
    }
}

pub fn xp_required_for_level(level: u32) -> u64 {
    XP_PER_LEVEL * u64::from(level.max(1))
}

fn roll_forward(mut level: u32, mut xp: u64, guard: u32) -> CharacterStats {
    let mut iterations = 0;
    while xp >= xp_required_for_level(level) && iterations < guard {
        xp -= xp_required_for_level(level);
        level = level.saturating_add(1);
        iterations += 1;
    }
    if iterations == guard && xp >= xp_required_for_level(level) {
        log::warn!(
            "Level-up guard of {} iterations hit at level {} with {} xp left",
            guard,
            level,
            xp
        );
    }
    CharacterStats { level, xp }
}

/// Add a reward. Anything that is not a positive finite number is ignored.
pub fn apply_xp_reward(stats: CharacterStats, reward: f64) -> CharacterStats {
    if !reward.is_finite() || reward <= 0.0 {
        return stats;
    }
    let gained = reward.floor() as u64;
    let base = stats.normalized();
    roll_forward(
        base.level,
        base.xp.saturating_add(gained),
        REWARD_LEVEL_UP_GUARD,
    )
    .normalized()
}

/// Coerce an arbitrary persisted value into valid stats. Older saves stored
/// lifetime xp instead of per-level xp; those roll forward into levels.
pub fn normalize_character_stats(raw: &Value) -> CharacterStats {
    let Some(object) = raw.as_object() else {
        return CharacterStats::default();
    };
    let level = match finite_number(object.get("level")) {
        Some(n) if n >= 1.0 => n.floor().min(f64::from(u32::MAX)) as u32,
        _ => 1,
    };
    let xp = non_negative_int(object.get("xp"), 0);
    CharacterStats { level, xp }.normalized()
}

/// Parse stored text. Missing or malformed text yields the defaults.
pub fn parse_character_stats(text: Option<&str>) -> CharacterStats {
    let Some(text) = text else {
        return CharacterStats::default();
    };
    match serde_json::from_str::<Value>(text) {
        Ok(raw) => normalize_character_stats(&raw),
        Err(err) => {
            log::warn!("Discarding unreadable character stats: {err}");
            CharacterStats::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stats(level: u32, xp: u64) -> CharacterStats {
        CharacterStats { level, xp }
    }

    #[test]
    fn requirement_is_hundred_per_level() {
        for level in 1..=50 {
            assert_eq!(xp_required_for_level(level), 100 * u64::from(level));
        }
        assert_eq!(xp_required_for_level(0), 100);
    }

    #[test]
    fn zero_and_negative_rewards_are_identity() {
        let start = stats(4, 120);
        assert_eq!(apply_xp_reward(start, 0.0), start);
        assert_eq!(apply_xp_reward(start, -5.0), start);
        assert_eq!(apply_xp_reward(start, f64::NAN), start);
        assert_eq!(apply_xp_reward(start, f64::INFINITY), start);
    }

    #[test]
    fn reward_levels_up_along_the_curve() {
        // 100 takes level 1 to 2; level 2 needs 200 more.
        assert_eq!(apply_xp_reward(stats(1, 0), 250.0), stats(2, 150));
        assert_eq!(apply_xp_reward(stats(1, 0), 300.0), stats(3, 0));
        assert_eq!(apply_xp_reward(stats(1, 0), 650.0), stats(4, 50));
    }

    #[test]
    fn fractional_reward_is_floored() {
        assert_eq!(apply_xp_reward(stats(1, 10), 89.9), stats(1, 99));
        assert_eq!(apply_xp_reward(stats(1, 10), 0.5), stats(1, 10));
    }

    #[test]
    fn huge_reward_stops_at_guard_without_hanging() {
        let result = apply_xp_reward(stats(1, 0), 1e18);
        // 200 reward iterations plus 500 normalization iterations.
        assert_eq!(result.level, 701);
        assert!(result.xp >= xp_required_for_level(result.level));
    }

    #[test]
    fn legacy_cumulative_xp_rolls_forward() {
        let normalized = normalize_character_stats(&json!({ "level": 1, "xp": 350 }));
        assert_eq!(normalized, stats(3, 50));
        assert!(normalized.xp < xp_required_for_level(normalized.level));
    }

    #[test]
    fn garbage_normalizes_to_defaults() {
        assert_eq!(normalize_character_stats(&json!(null)), CharacterStats::default());
        assert_eq!(normalize_character_stats(&json!([1, 2])), CharacterStats::default());
        assert_eq!(
            normalize_character_stats(&json!({ "level": "abc", "xp": -40 })),
            CharacterStats::default()
        );
        assert_eq!(
            normalize_character_stats(&json!({ "level": 0, "xp": 50 })),
            stats(1, 50)
        );
    }

    #[test]
    fn numeric_strings_and_fractions_are_accepted() {
        assert_eq!(
            normalize_character_stats(&json!({ "level": "2.7", "xp": "10.2" })),
            stats(2, 10)
        );
    }

    #[test]
    fn normalized_stats_always_hold_invariant() {
        for level in 1..20u32 {
            for xp in (0..5000u64).step_by(37) {
                let s = stats(level, xp).normalized();
                assert!(s.level >= 1);
                assert!(s.xp < xp_required_for_level(s.level));
            }
        }
    }

    #[test]
    fn parse_handles_missing_and_malformed_text() {
        assert_eq!(parse_character_stats(None), CharacterStats::default());
        assert_eq!(parse_character_stats(Some("{not json")), CharacterStats::default());
        assert_eq!(
            parse_character_stats(Some(r#"{"level":5,"xp":20}"#)),
            stats(5, 20)
        );
    }

    #[test]
    fn progress_helpers() {
        let s = stats(2, 50);
        assert_eq!(s.xp_to_next_level(), 150);
        assert!((s.progress_fraction() - 0.25).abs() < f32::EPSILON);
    }
}
