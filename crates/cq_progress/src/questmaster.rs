//! Daily quest completion, reward claims and the claim streak.
//!
//! Completion is tracked per calendar date. A save whose `date` is not
//! today carries no completions forward, but the streak, lifetime XP and
//! last claim date survive. Dates are local `YYYY-MM-DD` strings.

use std::collections::BTreeSet;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coerce::non_negative_int;
use crate::quests::DailyQuestSet;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestmasterSave {
    /// Date the completion set belongs to.
    pub date: String,
    pub streak: u32,
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
    pub last_claimed_date: Option<String>,
    pub completed_base_ids: BTreeSet<String>,
}

impl QuestmasterSave {
    pub fn new(today: &str) -> Self {
        Self {
            date: today.to_string(),
            streak: 0,
            total_xp: 0,
            last_claimed_date: None,
            completed_base_ids: BTreeSet::new(),
        }
    }

    pub fn has_claimed(&self, date: &str) -> bool {
        self.last_claimed_date.as_deref() == Some(date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub save: QuestmasterSave,
    pub xp_awarded: u64,
    pub streak_continued: bool,
}

pub fn today_local() -> String {
    Local::now().date_naive().format(DATE_FORMAT).to_string()
}

pub fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).ok()
}

/// The calendar day before `date`, or `None` if `date` is not a valid date.
pub fn previous_day(date: &str) -> Option<String> {
    parse_date(date)?
        .pred_opt()
        .map(|day| day.format(DATE_FORMAT).to_string())
}

/// Move a save onto `today`. Same day: unchanged. Different day:
/// completions are dropped, everything else is kept.
pub fn reconcile_to_date(save: &QuestmasterSave, today: &str) -> QuestmasterSave {
    if save.date == today {
        return save.clone();
    }
    if !save.completed_base_ids.is_empty() {
        log::info!(
            "Quest board rolled over from {} to {}, clearing {} completions",
            save.date,
            today,
            save.completed_base_ids.len()
        );
    }
    QuestmasterSave {
        date: today.to_string(),
        completed_base_ids: BTreeSet::new(),
        ..save.clone()
    }
}

/// Coerce an arbitrary persisted value into a valid save for `today`.
pub fn normalize_questmaster_save(raw: &Value, today: &str) -> QuestmasterSave {
    let Some(object) = raw.as_object() else {
        return QuestmasterSave::new(today);
    };

    let normalized_date = |value: Option<&Value>| {
        value
            .and_then(Value::as_str)
            .and_then(parse_date)
            .map(|day| day.format(DATE_FORMAT).to_string())
    };

    let total_xp = object
        .get("totalXP")
        .or_else(|| object.get("totalXp"))
        .map_or(0, |value| non_negative_int(Some(value), 0));
    let completed_base_ids = object
        .get("completedBaseIds")
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let stored = QuestmasterSave {
        date: normalized_date(object.get("date")).unwrap_or_default(),
        streak: non_negative_int(object.get("streak"), 0).min(u64::from(u32::MAX)) as u32,
        total_xp,
        last_claimed_date: normalized_date(object.get("lastClaimedDate")),
        completed_base_ids,
    };
    reconcile_to_date(&stored, today)
}

/// Parse stored text for `today`. Missing or malformed text yields a fresh
/// save.
pub fn parse_questmaster_save(text: Option<&str>, today: &str) -> QuestmasterSave {
    let Some(text) = text else {
        return QuestmasterSave::new(today);
    };
    match serde_json::from_str::<Value>(text) {
        Ok(raw) => normalize_questmaster_save(&raw, today),
        Err(err) => {
            log::warn!("Discarding unreadable quest save: {err}");
            QuestmasterSave::new(today)
        }
    }
}

pub fn is_quest_completed(save: &QuestmasterSave, set: &DailyQuestSet, base_id: &str) -> bool {
    save.date == set.date && save.completed_base_ids.contains(base_id)
}

/// Flip one of today's quests between complete and incomplete. Ids that
/// are not on today's board leave the save unchanged.
pub fn toggle_quest(save: &QuestmasterSave, set: &DailyQuestSet, base_id: &str) -> QuestmasterSave {
    let mut next = reconcile_to_date(save, &set.date);
    if !set.contains(base_id) {
        log::debug!("Ignoring toggle for '{}', not on the {} board", base_id, set.date);
        return next;
    }
    if !next.completed_base_ids.remove(base_id) {
        next.completed_base_ids.insert(base_id.to_string());
    }
    next
}

pub fn can_claim_daily_reward(save: &QuestmasterSave, set: &DailyQuestSet) -> bool {
    !set.quests.is_empty()
        && set
            .base_ids()
            .all(|base_id| is_quest_completed(save, set, base_id))
        && !save.has_claimed(&set.date)
}

/// Claim today's reward. `None` when the board is incomplete or today was
/// already claimed. The streak continues only when the previous claim was
/// exactly one calendar day earlier.
pub fn claim_daily_reward(save: &QuestmasterSave, set: &DailyQuestSet) -> Option<ClaimOutcome> {
    if !can_claim_daily_reward(save, set) {
        return None;
    }
    let xp_awarded = set.total_xp();
    let streak_continued = match (&save.last_claimed_date, previous_day(&set.date)) {
        (Some(last), Some(yesterday)) => *last == yesterday,
        _ => false,
    };
    let streak = if streak_continued {
        save.streak.saturating_add(1)
    } else {
        1
    };

    let mut next = reconcile_to_date(save, &set.date);
    next.streak = streak;
    next.total_xp = next.total_xp.saturating_add(xp_awarded);
    next.last_claimed_date = Some(set.date.clone());
    log::info!(
        "Daily reward claimed for {}: {} xp, streak {}",
        set.date,
        xp_awarded,
        streak
    );
    Some(ClaimOutcome {
        save: next,
        xp_awarded,
        streak_continued,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quests::daily_quest_set;
    use serde_json::json;

    fn complete_all(save: &QuestmasterSave, set: &DailyQuestSet) -> QuestmasterSave {
        set.base_ids()
            .fold(save.clone(), |acc, base_id| toggle_quest(&acc, set, base_id))
    }

    fn claim_on(save: &QuestmasterSave, date: &str) -> QuestmasterSave {
        let set = daily_quest_set(date);
        let ready = complete_all(save, &set);
        claim_daily_reward(&ready, &set)
            .expect("claim should succeed")
            .save
    }

    #[test]
    fn claim_requires_every_quest() {
        let set = daily_quest_set("2024-06-10");
        let mut save = QuestmasterSave::new("2024-06-10");
        assert!(!can_claim_daily_reward(&save, &set));

        let ids: Vec<_> = set.base_ids().collect();
        for base_id in &ids[..ids.len() - 1] {
            save = toggle_quest(&save, &set, base_id);
        }
        assert!(!can_claim_daily_reward(&save, &set));
        assert!(claim_daily_reward(&save, &set).is_none());

        save = toggle_quest(&save, &set, ids[ids.len() - 1]);
        assert!(can_claim_daily_reward(&save, &set));

        let outcome = claim_daily_reward(&save, &set).expect("claimable");
        assert_eq!(outcome.xp_awarded, set.total_xp());
        assert_eq!(outcome.save.total_xp, set.total_xp());
        assert_eq!(outcome.save.streak, 1);
        assert_eq!(outcome.save.last_claimed_date.as_deref(), Some("2024-06-10"));
        assert!(!can_claim_daily_reward(&outcome.save, &set));
        assert!(claim_daily_reward(&outcome.save, &set).is_none());
    }

    #[test]
    fn toggle_is_reversible() {
        let set = daily_quest_set("2024-06-11");
        let base_id = set.quests[0].base_id;
        let save = QuestmasterSave::new("2024-06-11");
        let done = toggle_quest(&save, &set, base_id);
        assert!(is_quest_completed(&done, &set, base_id));
        let undone = toggle_quest(&done, &set, base_id);
        assert!(!is_quest_completed(&undone, &set, base_id));
        assert_eq!(undone, save);
    }

    #[test]
    fn toggle_ignores_unknown_quest() {
        let set = daily_quest_set("2024-06-11");
        let save = QuestmasterSave::new("2024-06-11");
        assert_eq!(toggle_quest(&save, &set, "not-today"), save);
    }

    #[test]
    fn consecutive_day_claim_extends_streak() {
        let day_one = claim_on(&QuestmasterSave::new("2024-02-28"), "2024-02-28");
        let day_two = claim_on(&day_one, "2024-02-29");
        assert_eq!(day_two.streak, 2);
        let day_three = claim_on(&day_two, "2024-03-01");
        assert_eq!(day_three.streak, 3);
    }

    #[test]
    fn skipped_day_resets_streak() {
        let day_one = claim_on(&QuestmasterSave::new("2024-06-01"), "2024-06-01");
        let day_two = claim_on(&day_one, "2024-06-02");
        assert_eq!(day_two.streak, 2);
        let after_gap = claim_on(&day_two, "2024-06-04");
        assert_eq!(after_gap.streak, 1);
        assert_eq!(
            after_gap.total_xp,
            daily_quest_set("2024-06-01").total_xp()
                + daily_quest_set("2024-06-02").total_xp()
                + daily_quest_set("2024-06-04").total_xp()
        );
    }

    #[test]
    fn streak_crosses_year_boundary() {
        let eve = claim_on(&QuestmasterSave::new("2023-12-31"), "2023-12-31");
        let new_year = claim_on(&eve, "2024-01-01");
        assert_eq!(new_year.streak, 2);
    }

    #[test]
    fn previous_day_handles_calendar_edges() {
        assert_eq!(previous_day("2024-03-01").as_deref(), Some("2024-02-29"));
        assert_eq!(previous_day("2023-03-01").as_deref(), Some("2023-02-28"));
        assert_eq!(previous_day("2024-01-01").as_deref(), Some("2023-12-31"));
        assert_eq!(previous_day("garbage"), None);
    }

    #[test]
    fn stale_save_drops_completions_but_keeps_progress() {
        let raw = json!({
            "date": "2024-06-01",
            "streak": 4,
            "totalXP": 900,
            "lastClaimedDate": "2024-06-01",
            "completedBaseIds": ["loops-1", "arrays-1"]
        });
        let save = normalize_questmaster_save(&raw, "2024-06-02");
        assert_eq!(save.date, "2024-06-02");
        assert!(save.completed_base_ids.is_empty());
        assert_eq!(save.streak, 4);
        assert_eq!(save.total_xp, 900);
        assert_eq!(save.last_claimed_date.as_deref(), Some("2024-06-01"));
    }

    #[test]
    fn same_day_save_keeps_completions() {
        let raw = json!({
            "date": "2024-06-02",
            "completedBaseIds": ["loops-1", "loops-1", 7]
        });
        let save = normalize_questmaster_save(&raw, "2024-06-02");
        assert_eq!(save.completed_base_ids.len(), 1);
        assert!(save.completed_base_ids.contains("loops-1"));
    }

    #[test]
    fn malformed_saves_normalize_to_fresh() {
        let today = "2024-06-02";
        assert_eq!(normalize_questmaster_save(&json!("oops"), today), QuestmasterSave::new(today));
        assert_eq!(parse_questmaster_save(None, today), QuestmasterSave::new(today));
        assert_eq!(parse_questmaster_save(Some("]["), today), QuestmasterSave::new(today));

        let save = normalize_questmaster_save(
            &json!({ "streak": -3, "totalXP": "lots", "lastClaimedDate": "yesterday" }),
            today,
        );
        assert_eq!(save, QuestmasterSave::new(today));
    }

    #[test]
    fn serialized_save_uses_camel_case_and_round_trips() {
        let set = daily_quest_set("2024-06-05");
        let save = claim_on(&QuestmasterSave::new("2024-06-05"), "2024-06-05");
        let text = serde_json::to_string(&save).expect("serialize");
        assert!(text.contains("\"totalXP\""));
        assert!(text.contains("\"lastClaimedDate\""));
        assert!(text.contains("\"completedBaseIds\""));
        let loaded = parse_questmaster_save(Some(&text), "2024-06-05");
        assert_eq!(loaded, save);
        assert!(!can_claim_daily_reward(&loaded, &set));
    }

    #[test]
    fn completions_from_another_day_do_not_count() {
        let yesterday = daily_quest_set("2024-06-05");
        let done = complete_all(&QuestmasterSave::new("2024-06-05"), &yesterday);
        let today = daily_quest_set("2024-06-06");
        assert!(!can_claim_daily_reward(&done, &today));
    }
}
